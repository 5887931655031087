//! User account management commands.

use weavestore::NewUser;

use crate::backend::{json_path, open_storage, persist};
use crate::cli::{UserAddArgs, UserListArgs, UserRemoveArgs};
use crate::output::{OutputFormat, print_table};

/// Run the `user add` command
pub async fn add(args: &UserAddArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(&args.backend_config).await?;
    let user = storage
        .create_user(NewUser::new(&args.name, &args.password, &args.email))
        .await?;
    persist(&storage, &json_path(&args.backend_config)).await?;

    match format {
        OutputFormat::Human => println!("Created user {} ({})", user.username, user.id),
        OutputFormat::Json => {
            let value = serde_json::json!({ "id": user.id.get(), "username": user.username });
            println!("{}", serde_json::to_string(&value)?);
        }
    }
    Ok(())
}

/// Run the `user remove` command
pub async fn remove(
    args: &UserRemoveArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(&args.backend_config).await?;
    storage.delete_user(&args.name).await?;
    persist(&storage, &json_path(&args.backend_config)).await?;

    match format {
        OutputFormat::Human => println!("Removed user {}", args.name),
        OutputFormat::Json => {
            let value = serde_json::json!({ "removed": args.name });
            println!("{}", serde_json::to_string(&value)?);
        }
    }
    Ok(())
}

/// Run the `user list` command
pub async fn list(
    args: &UserListArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(&args.backend_config).await?;
    let users = storage.list_users().await?;

    match format {
        OutputFormat::Human => {
            if users.is_empty() {
                println!("No users found.");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = users
                .iter()
                .map(|u| vec![u.id.to_string(), u.username.clone(), u.email.clone()])
                .collect();
            print_table(&["ID", "USERNAME", "EMAIL"], &rows);
        }
        OutputFormat::Json => {
            let entries: Vec<_> = users
                .iter()
                .map(|u| {
                    serde_json::json!({
                        "id": u.id.get(),
                        "username": u.username,
                        "email": u.email,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string(&entries)?);
        }
    }
    Ok(())
}
