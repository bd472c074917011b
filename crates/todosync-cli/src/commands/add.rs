use std::path::Path;

use crate::commands::common::{join_title, load_profile, open_coordinator};
use crate::error::CliError;

pub async fn run_add(
    title_parts: &[String],
    profile: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let title = join_title(title_parts);
    let profile = load_profile(profile)?;
    let (coordinator, user_id) = open_coordinator(&profile, db_path).await?;

    let task = coordinator.create_task(&user_id, &title).await?;
    println!("{}", task.id);
    Ok(())
}
