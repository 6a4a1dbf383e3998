//! Incremental item conversion pipeline
//!
//! The pipeline walks a set of work items, normalizes their metadata,
//! decides per item whether anything changed, and assembles search and
//! relational work into bounded batches. Batches flow through a depth-one
//! queue to a single submission worker that ships the search payload first
//! and commits the relational rows only after the backend accepted it.

pub mod batch;
pub mod commit;
pub mod context;
pub mod decision;
pub mod info;
pub mod submit;
pub mod sweep;

use crate::config::RunConfig;
use crate::db::entities::item;
use crate::domain::{digest_of, Digests, ItemRecord};
use crate::error::{ConvertError, Result};
use crate::metadata::{authors::indexed_author_names, Dialect, Normalizer};
use crate::pipeline::batch::{fit_record, Batch, BatchBuilder, ItemCommit, TryAdd};
use crate::pipeline::commit::Committer;
use crate::pipeline::context::RunContext;
use crate::pipeline::decision::{classify, IndexAction, StoredDigests};
use crate::pipeline::submit::Submitter;
use crate::search::{item_doc_id, SearchBackend, SearchFields, SearchOp};
use crate::source::SourceLayout;
use chrono::Datelike;
use sea_orm::{DatabaseConnection, EntityTrait};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// One item to convert: its id plus the source-side last-modified time
/// reported by whatever enumerated the work list.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: String,
    pub dialect: Dialect,
    pub mtime: Option<chrono::DateTime<chrono::Utc>>,
}

/// Per-run outcome counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub processed: u64,
    pub indexed: u64,
    pub db_only: u64,
    pub skipped: u64,
    pub deleted: u64,
    pub failed: u64,
}

/// Messages on the batch queue. The queue has depth one so the producer
/// can assemble at most one batch ahead of the submission worker.
enum BatchMsg {
    Ship(Box<Batch>),
    Flush,
}

/// Convert a set of items end to end
pub async fn convert_items(
    db: &DatabaseConnection,
    config: &RunConfig,
    backend: Option<Arc<dyn SearchBackend>>,
    normalizer: &Normalizer,
    work: Vec<WorkItem>,
) -> Result<RunStats> {
    let ctx = Arc::new(RunContext::load(db).await?);
    let layout = SourceLayout::new(&config.source_root);

    let (tx, rx) = mpsc::channel::<BatchMsg>(1);
    let worker = spawn_worker(
        db.clone(),
        ctx.clone(),
        backend.map(|b| Submitter::new(b, config.retry)),
        config.sweep_every_batches,
        rx,
    );

    let mut builder = BatchBuilder::new(config.batch);
    let mut stats = RunStats::default();
    let total = work.len();
    let mut run_err: Option<ConvertError> = None;

    for work_item in work {
        stats.processed += 1;
        match prepare_item(db, &ctx, &layout, normalizer, config, &work_item).await {
            Ok(prepared) => {
                if let Err(err) = route(&mut builder, prepared, &mut stats, &tx).await {
                    run_err = Some(err);
                    break;
                }
            }
            Err(err) if err.is_item_local() => {
                warn!(item = %work_item.id, %err, "Skipping item");
                stats.failed += 1;
            }
            Err(err) => {
                error!(item = %work_item.id, %err, "Fatal pipeline error");
                run_err = Some(err);
                break;
            }
        }
    }

    if run_err.is_none() {
        if let Some(last) = builder.finish() {
            if let Err(err) = send(&tx, BatchMsg::Ship(Box::new(last))).await {
                run_err = Some(err);
            }
        }
    }
    if run_err.is_none() {
        if let Err(err) = send(&tx, BatchMsg::Flush).await {
            run_err = Some(err);
        }
    }
    drop(tx);

    // The worker's own failure is the root cause when the queue closed early
    let worker_result = worker
        .await
        .map_err(|e| ConvertError::Configuration(format!("submission worker panicked: {}", e)))?;
    worker_result?;
    if let Some(err) = run_err {
        return Err(err);
    }

    info!(
        total,
        indexed = stats.indexed,
        db_only = stats.db_only,
        skipped = stats.skipped,
        deleted = stats.deleted,
        failed = stats.failed,
        "Item conversion finished"
    );
    Ok(stats)
}

/// Everything the routing step needs for one item
struct PreparedItem {
    op: SearchOp,
    commit: ItemCommit,
    action: IndexAction,
}

async fn prepare_item(
    db: &DatabaseConnection,
    ctx: &RunContext,
    layout: &SourceLayout,
    normalizer: &Normalizer,
    config: &RunConfig,
    work_item: &WorkItem,
) -> Result<PreparedItem> {
    let id = &work_item.id;
    let xml = std::fs::read_to_string(layout.metadata_path(id)).map_err(|e| {
        ConvertError::MalformedMetadata {
            item: id.clone(),
            reason: format!("cannot read metadata: {}", e),
        }
    })?;

    let mut record = normalizer.normalize(id, work_item.dialect, &xml, layout.has_primary(id))?;
    if record.updated.is_none() {
        // Fall back to the work list's source-side timestamp
        record.updated = work_item.mtime.map(|t| t.date_naive());
    }
    if !record.suppressed {
        record.text = std::fs::read_to_string(layout.text_path(id)).ok();
    }

    let op = if record.suppressed {
        SearchOp::Delete {
            id: item_doc_id(id),
        }
    } else {
        // Resolve issue-overridden rights up front so the search document
        // matches what the committer will store
        let rights = commit::effective_rights(db, ctx, &record).await?;
        SearchOp::Add {
            id: item_doc_id(id),
            fields: build_search_fields(ctx, &record, rights),
        }
    };
    // Digest the fitted operation so truncated submissions re-hash stably
    let op = fit_record(op, config.batch.max_doc_bytes)?;
    let digests = Digests {
        index_digest: digest_of(&op),
        data_digest: data_digest(&record),
    };

    let prior = item::Entity::find_by_id(id.clone())
        .one(db)
        .await?
        .map(|row| StoredDigests {
            index_digest: row.index_digest,
            data_digest: row.data_digest,
        });

    let (state, action) = classify(prior.as_ref(), &digests, record.suppressed);
    debug!(item = %id, ?state, "Classified item");

    Ok(PreparedItem {
        op,
        commit: ItemCommit { record, digests },
        action,
    })
}

async fn route(
    builder: &mut BatchBuilder,
    prepared: PreparedItem,
    stats: &mut RunStats,
    tx: &mpsc::Sender<BatchMsg>,
) -> Result<()> {
    match prepared.action {
        IndexAction::SkipTouch => {
            builder.add_touch(prepared.commit.record.id.clone());
            stats.skipped += 1;
        }
        IndexAction::CommitOnly => {
            builder.add_commit_only(prepared.commit);
            stats.db_only += 1;
        }
        IndexAction::IndexAndCommit | IndexAction::DeleteAndCommit => {
            if prepared.action == IndexAction::DeleteAndCommit {
                stats.deleted += 1;
            } else {
                stats.indexed += 1;
            }
            if let TryAdd::WouldOverflow(closed) =
                builder.try_add(prepared.op, Some(prepared.commit))
            {
                send(tx, BatchMsg::Ship(closed)).await?;
            }
        }
    }
    Ok(())
}

/// Assemble the search document for a non-suppressed item
fn build_search_fields(
    ctx: &RunContext,
    record: &ItemRecord,
    rights: Option<String>,
) -> SearchFields {
    let mut fields = SearchFields {
        title: record.title.clone(),
        text: record.text.clone(),
        authors: indexed_author_names(&record.authors),
        disciplines: record.disciplines.clone(),
        rights,
        genre: Some(record.genre.clone()),
        pub_year: record.published.map(|d| d.year()),
        is_info: 0,
        ..Default::default()
    };
    let (direct, inherited) = ctx.expand_units(&record.units);
    let mut scope = direct;
    scope.extend(inherited);
    ctx.apply_facets(&mut fields, &scope);
    fields
}

/// Relational fingerprint: the full record minus the free text, which only
/// the search index cares about.
fn data_digest(record: &ItemRecord) -> String {
    let mut sans_text = record.clone();
    sans_text.text = None;
    digest_of(&sans_text)
}

async fn send(tx: &mpsc::Sender<BatchMsg>, msg: BatchMsg) -> Result<()> {
    tx.send(msg).await.map_err(|_| {
        ConvertError::Configuration("submission worker stopped unexpectedly".to_string())
    })
}

fn spawn_worker(
    db: DatabaseConnection,
    ctx: Arc<RunContext>,
    submitter: Option<Submitter>,
    sweep_every: u32,
    mut rx: mpsc::Receiver<BatchMsg>,
) -> tokio::task::JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let committer = Committer::new();
        let mut committed: u32 = 0;
        while let Some(msg) = rx.recv().await {
            let batch = match msg {
                BatchMsg::Ship(batch) => batch,
                BatchMsg::Flush => break,
            };
            if let Some(submitter) = &submitter {
                submitter.submit(&batch.ops).await?;
            }
            committer.apply(&db, &ctx, &batch).await?;
            committed += 1;
            if sweep_every > 0 && committed % sweep_every == 0 {
                sweep::sweep_orphans(&db).await?;
            }
        }
        if committed > 0 {
            sweep::sweep_orphans(&db).await?;
        }
        Ok(())
    })
}
