use crate::commands::common::{load_profile, ProfileContext};
use crate::error::CliError;
use crate::session_store::{auth_client, clear_stored_session};

pub async fn run_login(
    email: &str,
    password: &str,
    sign_up: bool,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let profile = load_profile(profile)?;
    let client = auth_client(&profile.name, &profile.config)?;

    let session = if sign_up {
        client.sign_up(email, password).await?
    } else {
        client.sign_in(email, password).await?
    };

    let email_label = session.user.email.as_deref().unwrap_or(email);
    let verb = if sign_up { "Signed up" } else { "Signed in" };
    println!("{verb} profile '{}' as {email_label}", profile.name);
    Ok(())
}

pub async fn run_status(profile: Option<&str>) -> Result<(), CliError> {
    let profile = load_profile(profile)?;
    let session = auth_client(&profile.name, &profile.config)?
        .restore_session()
        .await?;

    if let Some(session) = session {
        let email_label = session.user.email.as_deref().unwrap_or("(no email)");
        println!(
            "Profile '{}' is signed in as {} (user={}, expires_at={})",
            profile.name, email_label, session.user.id, session.expires_at
        );
    } else {
        println!("Profile '{}' is not signed in.", profile.name);
    }
    Ok(())
}

pub fn run_logout(profile: Option<&str>) -> Result<(), CliError> {
    let profile = load_profile(profile)?;
    sign_out_profile(&profile)?;
    println!("Signed out profile '{}'", profile.name);
    Ok(())
}

/// Sign out through the auth client; a profile without an API key only has
/// its keychain entry cleared.
pub fn sign_out_profile(profile: &ProfileContext) -> Result<(), CliError> {
    if profile.config.firebase_api_key.is_some() {
        auth_client(&profile.name, &profile.config)?.sign_out()?;
    } else {
        clear_stored_session(&profile.name)?;
    }
    Ok(())
}
