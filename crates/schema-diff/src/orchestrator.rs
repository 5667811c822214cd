//! Comparison orchestration.
//!
//! Owns the full pipeline for one comparison: two concurrent catalog loads,
//! normalization, diff. Each loader's pool is private to the call and is
//! released before the function returns, on every exit path.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ConnectionRef;
use crate::diff::{compute_diff, DiffResult};
use crate::error::Result;
use crate::loader::load_schema;
use crate::normalize::{normalize_schema, NormalizeOptions};

/// Load both schemas concurrently, normalize, and diff.
///
/// The two loads share nothing but the cancellation token; either failure
/// aborts the comparison and no partial result escapes.
pub async fn compare_refs(
    from: &ConnectionRef,
    to: &ConnectionRef,
    options: &NormalizeOptions,
    cancel: &CancellationToken,
) -> Result<DiffResult> {
    let (a, b) = tokio::try_join!(load_schema(from, cancel), load_schema(to, cancel))?;

    let a = normalize_schema(&a, options);
    let b = normalize_schema(&b, options);
    let diff = compute_diff(&a, &b);

    let summary = diff.summary();
    info!(
        "Comparison complete: tables +{}/-{}/~{}, views +{}/-{}/~{}, routines +{}/-{}/~{}, triggers +{}/-{}/~{}",
        summary.tables.added,
        summary.tables.removed,
        summary.tables.changed,
        summary.views.added,
        summary.views.removed,
        summary.views.changed,
        summary.routines.added,
        summary.routines.removed,
        summary.routines.changed,
        summary.triggers.added,
        summary.triggers.removed,
        summary.triggers.changed,
    );

    Ok(diff)
}
