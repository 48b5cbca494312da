use anyhow::{Context, Result};
use taskdesk_infrastructure::ConfigService;

use super::utils::open_signed_in;

pub async fn list(config_service: &ConfigService) -> Result<()> {
    let app = open_signed_in(config_service).await?;
    let users = app
        .users()
        .organisation_users()
        .await
        .context("Failed to list organisation users")?;

    if users.is_empty() {
        println!("No users.");
    }
    for user in users {
        let role = user.role.as_deref().unwrap_or("-");
        let inactive = if user.active { "" } else { " (inactive)" };
        println!("#{:<5} {:<24} {:<10} {}{inactive}", user.id, user.display_name(), role, user.email);
    }
    Ok(())
}
