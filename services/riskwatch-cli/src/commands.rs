//! Subcommand implementations

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::NaiveDateTime;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use riskwatch_auth_core::DecodedToken;
use riskwatch_client::{HttpTransport, LoginFlow, QueryAggregator, SessionStore};
use riskwatch_types::{Credential, LoginType};

use crate::store::FileSessionStore;

/// Fetch a captcha, ask the operator to solve it, log in and save the session.
pub async fn login(
    transport: HttpTransport,
    store: Arc<FileSessionStore>,
    base_url: &str,
    username: &str,
    password: Option<String>,
    login_type: u8,
    captcha_out: &Path,
) -> anyhow::Result<()> {
    let login_type = LoginType::new(login_type)?;
    let flow = LoginFlow::new(transport, store.clone());

    let challenge = flow.fetch_captcha(base_url).await?;
    tokio::fs::write(captcha_out, &challenge.image)
        .await
        .with_context(|| format!("failed to write captcha to {}", captcha_out.display()))?;

    let password = match password {
        Some(password) => password,
        None => prompt_hidden("Password: ").await?,
    };

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let captcha = prompt(
        &mut stdin,
        &format!("Captcha saved to {}. Enter its text: ", captcha_out.display()),
    )
    .await?;

    let credential = flow
        .login(base_url, username, &password, &captcha, login_type)
        .await?;

    println!("Logged in as {}", credential.username);
    println!("Session saved to {}", store.path().display());
    if let Some(token) = credential.token() {
        print_expiry(token);
    }
    Ok(())
}

/// Count risk events over `[start, end)` with the stored session.
pub async fn query(
    transport: HttpTransport,
    store: Arc<FileSessionStore>,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> anyhow::Result<()> {
    let credential = stored_credential(&store).await?;
    if let Some(token) = credential.token() {
        match DecodedToken::decode(token) {
            Ok(decoded) if decoded.is_expired() => {
                warn!("stored session token has expired; the appliance may reject queries");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "stored session token could not be decoded"),
        }
    }

    let aggregator = QueryAggregator::over_http(transport);
    let mut batch = aggregator.launch(&credential, start, end).await?;
    println!("Querying {} window(s)", batch.windows().len());

    let canceller = batch.canceller();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; cancelling batch");
            canceller.cancel();
        }
    });

    while let Some(report) = batch.next_report().await {
        println!("  {report}");
    }
    let summary = batch.wait().await?;
    interrupt.abort();

    println!(
        "{}: total {} ({} counted, {} failed, {} cancelled of {})",
        summary.state,
        summary.total,
        summary.counted,
        summary.failed,
        summary.cancelled,
        summary.windows
    );
    Ok(())
}

/// Print the stored token's header and claims.
pub async fn token(store: Arc<FileSessionStore>) -> anyhow::Result<()> {
    let credential = stored_credential(&store).await?;
    let Some(token) = credential.token() else {
        bail!("no session token stored; run `riskwatch login` first");
    };

    let decoded = DecodedToken::decode(token)?;
    println!("{decoded}");
    print_expiry(token);
    Ok(())
}

async fn stored_credential(store: &FileSessionStore) -> anyhow::Result<Credential> {
    store.load().await?.with_context(|| {
        format!(
            "no account stored at {}; run `riskwatch login` first",
            store.path().display()
        )
    })
}

fn print_expiry(token: &str) {
    let Ok(decoded) = DecodedToken::decode(token) else {
        return;
    };
    match (decoded.expires_at(), decoded.remaining_seconds()) {
        (Some(at), Some(remaining)) if remaining > 0 => {
            println!("Token expires at {at} ({remaining}s left)");
        }
        (Some(at), _) => println!("Token expired at {at}"),
        _ => println!("Token carries no expiry"),
    }
}

async fn prompt<R>(lines: &mut tokio::io::Lines<R>, message: &str) -> anyhow::Result<String>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    print!("{message}");
    std::io::stdout().flush()?;
    let line = lines
        .next_line()
        .await?
        .context("stdin closed before input was read")?;
    require_input(&line)
}

// Reads without echo; blocks, so it runs off the async workers.
async fn prompt_hidden(message: &'static str) -> anyhow::Result<String> {
    let line = tokio::task::spawn_blocking(move || rpassword::prompt_password(message))
        .await?
        .context("failed to read password")?;
    require_input(&line)
}

fn require_input(line: &str) -> anyhow::Result<String> {
    let line = line.trim();
    if line.is_empty() {
        bail!("empty input");
    }
    Ok(line.to_string())
}
