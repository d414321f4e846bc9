/// Print locations whose name contains `substring`, case-insensitively.
///
/// # Errors
///
/// Returns an error if the substring is blank or the query fails.
pub(crate) async fn run_search(pool: sqlx::PgPool, substring: &str) -> anyhow::Result<()> {
    let substring = substring.trim();
    if substring.is_empty() {
        anyhow::bail!("search text must not be blank");
    }

    let rows = fieldvisit_db::search_locations_by_name(&pool, substring).await?;
    if rows.is_empty() {
        println!("no locations match '{substring}'");
        return Ok(());
    }

    println!("{:<38}{:<34}ADDRESS", "ID", "NAME");
    for row in &rows {
        println!(
            "{:<38}{:<34}{}",
            row.id,
            crate::customers::fmt_name(row.name.as_deref().unwrap_or("")),
            row.address.as_deref().unwrap_or("\u{2014}")
        );
    }
    if i64::try_from(rows.len()).ok() == Some(fieldvisit_db::LOCATION_SEARCH_LIMIT) {
        println!("(showing the first {} matches)", rows.len());
    }

    Ok(())
}
