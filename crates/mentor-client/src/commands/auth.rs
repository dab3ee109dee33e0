//! Login, logout and whoami commands.

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn login(config_path: &str, email: &str, password: Option<String>) -> Result<()> {
    let client = super::load_client(config_path).await?;

    let password = match password {
        Some(password) => password,
        None => {
            eprint!("Password: ");
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            lines.next_line().await?.unwrap_or_default().trim().to_string()
        }
    };
    if password.is_empty() {
        bail!("No password provided. Aborting.");
    }

    let user = client
        .login(email, &password)
        .await
        .context("Login failed")?;

    println!("Logged in as {} <{}>", user.full_name, user.email);
    Ok(())
}

pub async fn logout(config_path: &str) -> Result<()> {
    let client = super::load_client(config_path).await?;
    client.logout().await;
    println!("Logged out.");
    Ok(())
}

pub async fn whoami(config_path: &str) -> Result<()> {
    let client = super::load_client(config_path).await?;
    super::require_login(&client).await?;

    let user = client.me().await.context("Failed to fetch user")?;
    client.session().set_user(Some(user.clone())).await;

    println!("{} <{}>", user.full_name, user.email);
    println!("Tier: {}", user.tier);
    if !user.preferred_ai_provider.is_empty() {
        println!("Provider: {}", user.preferred_ai_provider);
    }
    if user.is_admin {
        println!("Admin: yes");
    }
    Ok(())
}
