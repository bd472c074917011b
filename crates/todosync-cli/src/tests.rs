use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use clap::Parser;
use pretty_assertions::assert_eq;
use todosync_core::auth::{AuthSession, AuthUser, SessionPersistence};
use todosync_core::config::ClientConfig;
use todosync_core::db::{CacheLocation, LocalCache};
use todosync_core::{SyncState, Task, TaskId, UserId};

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::sign_out_profile;
use crate::commands::common::{
    format_task_lines, join_title, normalize_task_id, sync_summary, task_to_list_item,
    ProfileContext,
};
use crate::commands::delete::run_delete;
use crate::commands::list::list_cached;
use crate::error::CliError;
use crate::resolve_db_path;
use crate::session_store::{load_stored_session, SessionStore};

fn task(id: &str, title: &str) -> Task {
    Task {
        id: TaskId::from(id),
        title: title.to_string(),
        completed: false,
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
        user_id: UserId::new("uid-1").unwrap(),
    }
}

#[test]
fn add_joins_title_words() {
    let cli = Cli::try_parse_from(["todosync", "add", "Buy", "oat", "milk"]).unwrap();
    let Commands::Add { title } = cli.command else {
        panic!("expected add command");
    };
    assert_eq!(join_title(&title), "Buy oat milk");
}

#[test]
fn add_requires_a_title() {
    assert!(Cli::try_parse_from(["todosync", "add"]).is_err());
}

#[test]
fn global_flags_parse_after_subcommand() {
    let cli = Cli::try_parse_from([
        "todosync",
        "list",
        "--offline",
        "--json",
        "--profile",
        "work",
        "--db-path",
        "/tmp/todos.db",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::List {
            offline: true,
            json: true
        }
    ));
    assert_eq!(cli.profile.as_deref(), Some("work"));
    assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/todos.db")));
}

#[test]
fn login_accepts_sign_up_flag() {
    let cli = Cli::try_parse_from([
        "todosync",
        "login",
        "--email",
        "user@example.com",
        "--password",
        "hunter22",
        "--sign-up",
    ])
    .unwrap();
    assert!(matches!(cli.command, Commands::Login { sign_up: true, .. }));
}

#[test]
fn explicit_db_path_wins() {
    let path = PathBuf::from("/tmp/explicit.db");
    assert_eq!(resolve_db_path(Some(path.clone())), path);
}

#[test]
fn normalize_task_id_trims_and_rejects_blank() {
    assert_eq!(normalize_task_id("  abc ").unwrap(), TaskId::from("abc"));
    assert!(matches!(normalize_task_id("   "), Err(CliError::EmptyTaskId)));
}

#[test]
fn format_task_lines_include_id_and_title() {
    let lines = format_task_lines(&[task("abc", "Walk dog")]);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("[ ] abc"));
    assert!(lines[0].ends_with("Walk dog"));
}

#[test]
fn format_task_lines_handles_empty_list() {
    assert_eq!(format_task_lines(&[]), vec!["No tasks.".to_string()]);
}

#[test]
fn list_item_uses_canonical_timestamp() {
    let item = task_to_list_item(&task("abc", "Walk dog"));
    assert_eq!(item.created_at, "2024-03-01T12:30:00.000Z");
    let json = serde_json::to_value(&item).unwrap();
    assert_eq!(json["id"], "abc");
    assert_eq!(json["completed"], false);
}

#[tokio::test]
async fn delete_rejects_blank_id_before_any_io() {
    let dir = tempfile::tempdir().unwrap();
    let error = run_delete(" ", None, &dir.path().join("todos.db"))
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::EmptyTaskId));
}

#[tokio::test]
async fn offline_list_reads_cache_for_stored_user() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("todos.db");
    let cache = LocalCache::open(&CacheLocation::file(&db_path)).unwrap();
    cache.upsert(&task("abc", "Walk dog")).await.unwrap();
    let mut other = task("xyz", "Not mine");
    other.user_id = UserId::new("uid-2").unwrap();
    cache.upsert(&other).await.unwrap();

    SessionStore::new("offline-list-test")
        .save_session(&stored_session("uid-1"))
        .unwrap();

    let tasks = list_cached("offline-list-test", &db_path).await.unwrap();
    assert_eq!(tasks, vec![task("abc", "Walk dog")]);
}

#[tokio::test]
async fn offline_list_requires_stored_session() {
    let dir = tempfile::tempdir().unwrap();
    let error = list_cached("offline-list-nobody", &dir.path().join("todos.db"))
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::NotSignedIn(_)));
}

fn stored_session(user: &str) -> AuthSession {
    AuthSession {
        id_token: "id".to_string(),
        refresh_token: "refresh".to_string(),
        expires_at: 0,
        user: AuthUser {
            id: user.to_string(),
            email: None,
        },
    }
}

#[test]
fn sync_summary_reports_state() {
    assert_eq!(sync_summary(2, SyncState::Ready), "Synced 2 tasks (ready)");
}

#[test]
fn sign_out_clears_session_through_auth_client() {
    SessionStore::new("logout-configured")
        .save_session(&stored_session("uid-1"))
        .unwrap();
    let profile = ProfileContext {
        name: "logout-configured".to_string(),
        config: ClientConfig {
            firebase_api_key: Some("web-key".to_string()),
            ..ClientConfig::default()
        },
    };

    sign_out_profile(&profile).unwrap();
    assert_eq!(load_stored_session("logout-configured").unwrap(), None);
}

#[test]
fn sign_out_without_api_key_still_clears_session() {
    SessionStore::new("logout-unconfigured")
        .save_session(&stored_session("uid-1"))
        .unwrap();
    let profile = ProfileContext {
        name: "logout-unconfigured".to_string(),
        config: ClientConfig::default(),
    };

    sign_out_profile(&profile).unwrap();
    assert_eq!(load_stored_session("logout-unconfigured").unwrap(), None);
}
