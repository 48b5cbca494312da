use anyhow::{Context, Result};
use taskdesk_application::Taskdesk;
use taskdesk_infrastructure::ConfigService;

/// Opens the client and restores the stored session.
pub async fn open(config_service: &ConfigService) -> Result<Taskdesk> {
    let app = Taskdesk::open(config_service).context("Failed to initialise Taskdesk")?;
    app.session()
        .start()
        .await
        .context("Failed to restore the stored session")?;
    Ok(app)
}

/// Like [`open`], but fails unless a user is signed in afterwards.
pub async fn open_signed_in(config_service: &ConfigService) -> Result<Taskdesk> {
    let app = open(config_service).await?;
    if !app.session().is_authenticated() {
        anyhow::bail!("Not signed in. Run `taskdesk login --email <EMAIL>` first.");
    }
    Ok(app)
}
