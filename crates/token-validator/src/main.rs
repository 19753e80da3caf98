//! validate-token
//!
//! Validates one identity token against the configured issuer and prints
//! its claims as JSON. The token is taken from the first argument, or from
//! stdin when no argument is given.
//!
//! Exit codes: 0 valid, 2 token rejected, 1 anything else (configuration,
//! issuer unreachable, malformed key set).

use anyhow::Context;
use std::process::ExitCode;
use token_validator::{TokenValidator, ValidatorConfig};
use tokio::io::AsyncReadExt;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EXIT_TOKEN_REJECTED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only the claims
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "token_validator=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let config = ValidatorConfig::from_env().context("Failed to load configuration")?;

    info!(
        region = %config.region,
        user_pool_id = %config.user_pool_id,
        caching_enabled = config.cache.enabled,
        "Configuration loaded successfully"
    );

    let validator = TokenValidator::from_config(&config)
        .await
        .context("Failed to build token validator")?;

    let token = read_token().await?;

    match validator.validate(&token).await {
        Ok(claims) => {
            let rendered =
                serde_json::to_string_pretty(&claims).context("Failed to render claims")?;
            println!("{rendered}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_token_error() => {
            error!(reason = %e.reason(), "Token rejected");
            Ok(ExitCode::from(EXIT_TOKEN_REJECTED))
        }
        Err(e) => Err(anyhow::Error::new(e).context("Token could not be checked")),
    }
}

async fn read_token() -> anyhow::Result<String> {
    if let Some(token) = std::env::args().nth(1) {
        return Ok(token.trim().to_string());
    }

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read token from stdin")?;

    let token = input.trim();
    if token.is_empty() {
        anyhow::bail!("No token given: pass it as the first argument or on stdin");
    }
    Ok(token.to_string())
}
