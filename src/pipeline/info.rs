//! Informational-page index rebuild
//!
//! Units and their static pages are searchable too, flagged `is_info` so
//! result ranking can keep them apart from content items. The rebuild
//! re-emits every unit and page document through the same batch machinery
//! items use; it never writes relational rows.

use crate::config::{BatchConfig, RetryConfig};
use crate::db::entities::unit;
use crate::error::Result;
use crate::pipeline::batch::{fit_record, BatchBuilder, TryAdd};
use crate::pipeline::context::RunContext;
use crate::pipeline::submit::Submitter;
use crate::search::{page_doc_id, unit_doc_id, SearchBackend, SearchFields, SearchOp};
use sea_orm::{DatabaseConnection, EntityTrait};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct InfoStats {
    pub units: u64,
    pub pages: u64,
}

pub async fn rebuild_info_index(
    db: &DatabaseConnection,
    backend: Arc<dyn SearchBackend>,
    batch_caps: &BatchConfig,
    retry: &RetryConfig,
) -> Result<InfoStats> {
    let ctx = RunContext::load(db).await?;
    let submitter = Submitter::new(backend, retry.clone());
    let mut builder = BatchBuilder::new(batch_caps.clone());
    let mut stats = InfoStats::default();

    for u in unit::Entity::find().all(db).await? {
        let unit_op = unit_document(&ctx, &u);
        stats.units += 1;
        ship(&submitter, &mut builder, unit_op, batch_caps).await?;

        for page_op in page_documents(&u) {
            stats.pages += 1;
            ship(&submitter, &mut builder, page_op, batch_caps).await?;
        }
    }

    if let Some(last) = builder.finish() {
        submitter.submit(&last.ops).await?;
    }
    info!(units = stats.units, pages = stats.pages, "Rebuilt informational index");
    Ok(stats)
}

async fn ship(
    submitter: &Submitter,
    builder: &mut BatchBuilder,
    op: SearchOp,
    caps: &BatchConfig,
) -> Result<()> {
    let op = fit_record(op, caps.max_doc_bytes)?;
    if let TryAdd::WouldOverflow(closed) = builder.try_add(op, None) {
        submitter.submit(&closed.ops).await?;
    }
    Ok(())
}

fn unit_document(ctx: &RunContext, u: &unit::Model) -> SearchOp {
    let mut fields = SearchFields {
        title: Some(u.name.clone()),
        is_info: 1,
        ..Default::default()
    };
    // Facet under the unit itself and everything above it
    let mut scope = vec![u.id.clone()];
    scope.extend(ctx.ancestors_of(&u.id).iter().cloned());
    ctx.apply_facets(&mut fields, &scope);
    if let Some(about) = u.attrs.get("about").and_then(|v| v.as_str()) {
        fields.text = Some(about.to_string());
    }
    SearchOp::Add {
        id: unit_doc_id(&u.id),
        fields,
    }
}

fn page_documents(u: &unit::Model) -> Vec<SearchOp> {
    let Some(pages) = u.attrs.get("pages").and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    pages
        .iter()
        .filter_map(|p| {
            let slug = p.get("slug").and_then(|v| v.as_str())?;
            let fields = SearchFields {
                title: p
                    .get("title")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                text: p.get("text").and_then(|v| v.as_str()).map(str::to_string),
                is_info: 1,
                ..Default::default()
            };
            Some(SearchOp::Add {
                id: page_doc_id(&u.id, slug),
                fields,
            })
        })
        .collect()
}
