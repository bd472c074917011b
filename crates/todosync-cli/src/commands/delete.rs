use std::path::Path;

use crate::commands::common::{load_profile, normalize_task_id, open_coordinator};
use crate::error::CliError;

pub async fn run_delete(id: &str, profile: Option<&str>, db_path: &Path) -> Result<(), CliError> {
    let id = normalize_task_id(id)?;
    let profile = load_profile(profile)?;
    let (coordinator, user_id) = open_coordinator(&profile, db_path).await?;

    coordinator.delete_task(&user_id, &id).await?;
    println!("{id}");
    Ok(())
}
