use anyhow::{Context, Result};
use taskdesk_application::Taskdesk;
use taskdesk_infrastructure::ConfigService;

use super::utils::open;

const ENV_PASSWORD: &str = "TASKDESK_PASSWORD";

pub async fn login(
    config_service: &ConfigService,
    email: &str,
    password: Option<String>,
) -> Result<()> {
    let password = match password.or_else(|| std::env::var(ENV_PASSWORD).ok()) {
        Some(password) => password,
        None => prompt_password()?,
    };

    let app = Taskdesk::open(config_service).context("Failed to initialise Taskdesk")?;
    let session = app
        .session()
        .sign_in(email, &password)
        .await
        .context("Login failed")?;

    if let Some(user) = &session.current_user {
        println!("✅ Logged in as {} <{}>", user.name, user.email);
        if user.first_time_login {
            println!("👋 Welcome! This is your first login.");
            app.session().mark_first_login_complete().await?;
        }
    }
    Ok(())
}

pub async fn logout(config_service: &ConfigService) -> Result<()> {
    // No restore first: logout notifies the server with whatever token is stored.
    let app = Taskdesk::open(config_service).context("Failed to initialise Taskdesk")?;
    app.session().logout().await.context("Logout failed")?;
    println!("✅ Logged out");
    Ok(())
}

pub async fn status(config_service: &ConfigService) -> Result<()> {
    let app = open(config_service).await?;
    let session = app.session().session();

    println!("Backend: {}", app.config().base_url());
    println!("Session: {}", session.state);
    if let Some(user) = &session.current_user {
        println!("User:    {} <{}> (id {})", user.name, user.email, user.id);
        if let Some(org) = user.organisation_id {
            println!("Org:     {org}");
        }
    }
    Ok(())
}

fn prompt_password() -> Result<String> {
    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;
    if password.is_empty() {
        anyhow::bail!("Password must not be empty");
    }
    Ok(password)
}
