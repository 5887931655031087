//! Per-user storage report - collections with count, size and last change.

use weavestore::Storage;

use crate::backend::{backend_label, open_storage};
use crate::cli::InfoArgs;
use crate::output::{OutputFormat, print_table};

/// Run the info command
pub async fn run(args: &InfoArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(&args.backend_config).await?;
    report(&storage, &args.user, &backend_label(&args.backend_config), format).await
}

async fn report(
    storage: &Storage,
    username: &str,
    backend: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = storage
        .find_user(username)
        .await?
        .ok_or_else(|| format!("No such user: {username}"))?;

    // One horizon for every figure in the report
    let as_of = storage.now();
    let summaries = storage.collection_summaries(&user, as_of).await?;
    let total_kib = storage.total_size(&user, as_of).await?;

    match format {
        OutputFormat::Human => {
            println!("User:        {} ({})", user.username, user.id);
            println!("Backend:     {backend}");
            println!("Collections: {}", summaries.len());
            println!("Total size:  {total_kib} KiB");
            if !summaries.is_empty() {
                println!();
                let rows: Vec<Vec<String>> = summaries
                    .iter()
                    .map(|s| {
                        vec![
                            s.name.clone(),
                            s.stats.count.to_string(),
                            s.stats.size_kib.to_string(),
                            if s.stats.last_modified.is_zero() {
                                "-".to_string()
                            } else {
                                s.stats.last_modified.to_rfc3339()
                            },
                        ]
                    })
                    .collect();
                print_table(&["COLLECTION", "OBJECTS", "KIB", "LAST MODIFIED"], &rows);
            }
        }
        OutputFormat::Json => {
            let collections: Vec<_> = summaries
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "name": s.name,
                        "count": s.stats.count,
                        "size_kib": s.stats.size_kib,
                        "last_modified": s.stats.last_modified.to_string(),
                    })
                })
                .collect();
            let value = serde_json::json!({
                "user": user.username,
                "backend": backend,
                "total_size_kib": total_kib,
                "collections": collections,
            });
            println!("{}", serde_json::to_string(&value)?);
        }
    }

    Ok(())
}
