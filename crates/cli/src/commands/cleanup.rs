//! Reconciliation for partially written uploads.
//!
//! Uploads and their images are written in one transaction, so new rows are
//! never left without images. Rows that predate that (or were emptied by
//! per-image edits made directly in the database) are removed here.

use gallery_flow_app::db::UploadRepository;

use super::{CommandError, connect};

/// Delete uploads with no images, or only count them when `dry_run` is set.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the query fails.
pub async fn run(dry_run: bool) -> Result<u64, CommandError> {
    let pool = connect().await?;

    if dry_run {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM gallery.gallery_upload u
            WHERE NOT EXISTS (SELECT 1 FROM gallery.image i WHERE i.gallery_id = u.id)
            ",
        )
        .fetch_one(&pool)
        .await?;

        let count = u64::try_from(count).unwrap_or_default();
        tracing::info!(count, "Uploads without images (dry run, nothing deleted)");
        return Ok(count);
    }

    let removed = UploadRepository::new(&pool).delete_empty().await?;
    tracing::info!(removed, "Removed uploads without images");
    Ok(removed)
}
