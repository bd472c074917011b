use std::path::Path;

use todosync_core::db::{CacheLocation, LocalCache};
use todosync_core::Task;

use crate::commands::common::{
    format_task_lines, load_profile, open_coordinator, task_to_list_item, TaskListItem,
};
use crate::error::CliError;
use crate::session_store::load_stored_session;

pub async fn run_list(
    offline: bool,
    as_json: bool,
    profile: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let profile = load_profile(profile)?;
    let tasks = if offline {
        list_cached(&profile.name, db_path).await?
    } else {
        let (coordinator, user_id) = open_coordinator(&profile, db_path).await?;
        coordinator.bootstrap(&user_id).await?;
        coordinator.store().todos()
    };

    if as_json {
        let json_items = tasks
            .iter()
            .map(task_to_list_item)
            .collect::<Vec<TaskListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_task_lines(&tasks) {
            println!("{line}");
        }
    }

    Ok(())
}

/// Read the cache only; the stored session supplies the user id even if expired.
pub async fn list_cached(profile_name: &str, db_path: &Path) -> Result<Vec<Task>, CliError> {
    let session = load_stored_session(profile_name)?
        .ok_or_else(|| CliError::NotSignedIn(profile_name.to_string()))?;
    let cache = LocalCache::open(&CacheLocation::file(db_path))?;
    Ok(cache.fetch_all(&session.user_id()?).await?)
}
