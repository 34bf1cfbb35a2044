//! `runs` command: read-only view of the sync history.

/// Prints the most recent runs as a markdown table, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub(crate) async fn list_runs(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = dekk_db::list_sync_runs(pool, limit).await?;
    if runs.is_empty() {
        println!("no sync runs recorded");
        return Ok(());
    }

    println!("| started | status | fetched | created | updated | skipped | errors | obsolete |");
    println!("|---|---|---|---|---|---|---|---|");
    for run in &runs {
        let status = if run.dry_run {
            format!("{} (dry)", run.status)
        } else {
            run.status.clone()
        };
        println!(
            "| {} | {status} | {} | {} | {} | {} | {} | {}/{} |",
            run.started_at.format("%Y-%m-%d %H:%M"),
            run.fetched,
            run.created,
            run.updated,
            run.skipped,
            run.errors,
            run.obsolete_deactivated,
            run.obsolete_found,
        );
    }

    Ok(())
}
