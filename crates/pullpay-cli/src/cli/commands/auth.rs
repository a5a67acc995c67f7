//! Auth command handlers.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};
use pullpay_core::auth::{INVALID_CREDENTIALS_MESSAGE, REGISTRATION_FAILED_MESSAGE};
use pullpay_core::models::{Credentials, Identity, Registration};
use pullpay_core::session::mask_token;
use pullpay_core::views::Dashboard;

pub struct RegisterOptions {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: Option<String>,
    pub login: bool,
}

pub async fn login(
    dashboard: &Dashboard,
    identity: Identity,
    password: Option<String>,
) -> Result<()> {
    let password = resolve_password(password)?;
    let credentials = Credentials { identity, password };

    let route = dashboard
        .auth()
        .login(&credentials)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message_or(INVALID_CREDENTIALS_MESSAGE)))?;

    let tokens = dashboard.client().tokens();
    let token = tokens.access_token().unwrap_or_default();
    println!("✓ Logged in (token: {})", mask_token(&token));
    if let Some(path) = tokens.path() {
        println!("  Session saved to: {}", path.display());
    }
    println!("→ {route}");
    Ok(())
}

pub async fn register(dashboard: &Dashboard, options: RegisterOptions) -> Result<()> {
    let registration = Registration {
        first_name: options.first_name,
        last_name: options.last_name,
        email: options.email,
        password: resolve_password(options.password)?,
    };

    let auth = dashboard.auth();
    let failed = |e: pullpay_core::auth::AuthError| {
        anyhow::anyhow!(e.user_message_or(REGISTRATION_FAILED_MESSAGE))
    };

    if options.login {
        let route = auth.register_and_login(&registration).await.map_err(failed)?;
        println!("✓ Account created for {}", registration.email);
        println!("✓ Logged in");
        println!("→ {route}");
    } else {
        auth.register(&registration).await.map_err(failed)?;
        println!("✓ Account created for {}", registration.email);
        println!("Run `pullpay login --email {}` to sign in.", registration.email);
    }
    Ok(())
}

pub fn logout(dashboard: &Dashboard) -> Result<()> {
    let auth = dashboard.auth();
    let was_logged_in = auth.is_authenticated();
    let route = auth.logout().map_err(|e| anyhow::anyhow!("{e}"))?;

    if was_logged_in {
        println!("✓ Logged out");
    } else {
        println!("Not logged in (no session found).");
    }
    println!("→ {route}");
    Ok(())
}

/// Uses the given password, or reads one line from stdin.
fn resolve_password(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    if io::stdin().is_terminal() {
        eprint!("Password: ");
        io::stderr().flush()?;
    }
    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .context("read password from stdin")?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}
