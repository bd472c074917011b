use std::path::Path;

use chrono::Local;
use serde::Serialize;
use todosync_core::auth::AuthSession;
use todosync_core::config::ClientConfig;
use todosync_core::db::CacheLocation;
use todosync_core::remote::FirestoreStore;
use todosync_core::util::format_timestamp;
use todosync_core::{SyncCoordinator, SyncState, Task, TaskId, TodosStore, UserId};

use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;
use crate::session_store::auth_client;

/// Resolved profile name with its effective configuration.
#[derive(Debug, Clone)]
pub struct ProfileContext {
    pub name: String,
    pub config: ClientConfig,
}

#[derive(Debug, Serialize)]
pub struct TaskListItem {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub created_at: String,
}

pub fn load_profile(explicit: Option<&str>) -> Result<ProfileContext, CliError> {
    let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
    let name = profiles.resolve_profile_name(explicit);
    let config = profiles.client_config(&name).map_err(CliError::Config)?;
    Ok(ProfileContext { name, config })
}

/// Restore the profile's session, refreshing it when needed.
pub async fn require_session(profile: &ProfileContext) -> Result<AuthSession, CliError> {
    auth_client(&profile.name, &profile.config)?
        .restore_session()
        .await?
        .ok_or_else(|| CliError::NotSignedIn(profile.name.clone()))
}

/// Coordinator over Firestore and the on-disk cache for the signed-in user.
pub async fn open_coordinator(
    profile: &ProfileContext,
    db_path: &Path,
) -> Result<(SyncCoordinator<FirestoreStore>, UserId), CliError> {
    let session = require_session(profile).await?;
    let user_id = session.user_id()?;
    let remote = FirestoreStore::new(profile.config.firestore_config()?, session.id_token)?;
    tracing::debug!(profile = %profile.name, user = %user_id, "opening coordinator");

    let coordinator =
        SyncCoordinator::new(remote, TodosStore::new(), CacheLocation::file(db_path));
    Ok((coordinator, user_id))
}

pub fn sync_summary(count: usize, state: SyncState) -> String {
    format!("Synced {count} tasks ({})", state.label())
}

pub fn join_title(parts: &[String]) -> String {
    parts.join(" ")
}

pub fn normalize_task_id(raw: &str) -> Result<TaskId, CliError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyTaskId);
    }
    Ok(TaskId::from(trimmed))
}

pub fn task_to_list_item(task: &Task) -> TaskListItem {
    TaskListItem {
        id: task.id.to_string(),
        title: task.title.clone(),
        completed: task.completed,
        created_at: format_timestamp(&task.created_at),
    }
}

pub fn format_task_lines(tasks: &[Task]) -> Vec<String> {
    if tasks.is_empty() {
        return vec!["No tasks.".to_string()];
    }

    tasks
        .iter()
        .map(|task| {
            let mark = if task.completed { 'x' } else { ' ' };
            format!(
                "[{mark}] {}  {}  {}",
                task.id,
                task.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                task.title
            )
        })
        .collect()
}
