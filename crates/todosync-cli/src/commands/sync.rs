use std::path::Path;

use crate::commands::common::{load_profile, open_coordinator, sync_summary};
use crate::error::CliError;

pub async fn run_sync(profile: Option<&str>, db_path: &Path) -> Result<(), CliError> {
    let profile = load_profile(profile)?;
    let (coordinator, user_id) = open_coordinator(&profile, db_path).await?;

    coordinator.bootstrap(&user_id).await?;
    println!(
        "{}",
        sync_summary(coordinator.store().todos().len(), coordinator.state())
    );
    Ok(())
}
