//! Full hierarchy conversion against a real database

use corpus_convert::db::entities::{item, unit, unit_hier, unit_item};
use corpus_convert::db::Database;
use corpus_convert::hierarchy::{parse_hierarchy, sync_full};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};

const TREE: &str = r#"
    <hierarchy>
        <unit id="root" type="root" name="Repository" status="active">
            <unit id="ucb" type="campus" name="Berkeley" status="active">
                <unit id="ucb_law" type="oru" name="Law" status="active">
                    <unit id="ucb_law_wp" type="series" name="Working Papers" status="active"/>
                </unit>
            </unit>
            <unit id="ucla" type="campus" name="UCLA" status="active">
                <ref id="ucb_law_wp"/>
            </unit>
        </unit>
    </hierarchy>"#;

async fn fresh_db() -> Database {
    let db = Database::memory().await.unwrap();
    db.migrate().await.unwrap();
    db
}

#[tokio::test]
async fn closure_table_has_one_row_per_reachable_pair() {
    let db = fresh_db().await;
    let src = parse_hierarchy(TREE).unwrap();
    let stats = sync_full(db.conn(), &src).await.unwrap();
    assert_eq!(stats.units, 5);

    let rows = unit_hier::Entity::find().all(db.conn()).await.unwrap();
    assert_eq!(rows.len(), 8);

    let direct: Vec<_> = rows.iter().filter(|r| r.is_direct).collect();
    assert!(direct.iter().all(|r| r.ordering.is_some()));
    let indirect: Vec<_> = rows.iter().filter(|r| !r.is_direct).collect();
    assert!(indirect.iter().all(|r| r.ordering.is_none()));

    // Cross-listed series: one row per ancestor, both parents direct
    let wp_ancestors: Vec<_> = rows
        .iter()
        .filter(|r| r.unit_id == "ucb_law_wp")
        .collect();
    assert_eq!(wp_ancestors.len(), 4);
    assert!(wp_ancestors
        .iter()
        .find(|r| r.ancestor_unit == "ucla")
        .unwrap()
        .is_direct);
}

#[tokio::test]
async fn reconversion_is_idempotent() {
    let db = fresh_db().await;
    let src = parse_hierarchy(TREE).unwrap();
    sync_full(db.conn(), &src).await.unwrap();
    let first = unit_hier::Entity::find().all(db.conn()).await.unwrap();

    sync_full(db.conn(), &src).await.unwrap();
    let second = unit_hier::Entity::find().all(db.conn()).await.unwrap();

    assert_eq!(first.len(), second.len());
    assert_eq!(unit::Entity::find().all(db.conn()).await.unwrap().len(), 5);
}

#[tokio::test]
async fn removed_unit_cascades_and_strands_items() {
    let db = fresh_db().await;
    let src = parse_hierarchy(TREE).unwrap();
    sync_full(db.conn(), &src).await.unwrap();

    // An item living only under the series
    item::ActiveModel {
        id: Set("qt0000001".to_string()),
        source: Set("subi".to_string()),
        status: Set("published".to_string()),
        genre: Set("article".to_string()),
        attrs: Set(serde_json::json!({})),
        ..Default::default()
    }
    .insert(db.conn())
    .await
    .unwrap();
    unit_item::ActiveModel {
        unit_id: Set("ucb_law_wp".to_string()),
        item_id: Set("qt0000001".to_string()),
        ordering_of_units: Set(0),
        is_direct: Set(true),
    }
    .insert(db.conn())
    .await
    .unwrap();

    // Reconvert without the law subtree
    let pruned = r#"
        <hierarchy>
            <unit id="root" type="root" name="Repository" status="active">
                <unit id="ucb" type="campus" name="Berkeley" status="active"/>
                <unit id="ucla" type="campus" name="UCLA" status="active"/>
            </unit>
        </hierarchy>"#;
    let stats = sync_full(db.conn(), &parse_hierarchy(pruned).unwrap())
        .await
        .unwrap();

    assert_eq!(stats.removed_units, 2);
    assert_eq!(stats.removed_items, 1);
    assert!(unit::Entity::find_by_id("ucb_law_wp".to_string())
        .one(db.conn())
        .await
        .unwrap()
        .is_none());
    assert!(item::Entity::find_by_id("qt0000001".to_string())
        .one(db.conn())
        .await
        .unwrap()
        .is_none());
    assert_eq!(
        unit_item::Entity::find()
            .filter(unit_item::Column::ItemId.eq("qt0000001"))
            .all(db.conn())
            .await
            .unwrap()
            .len(),
        0
    );
}
