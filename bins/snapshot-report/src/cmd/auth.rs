use std::process::Command;

use tokio::io::{AsyncBufReadExt, BufReader};

use mixin_source::{DEFAULT_SCOPE, authorize_url, exchange_code};

use crate::config::Effective;
use crate::error::ReportError;

/// Browser-based code flow: open the authorize page, read the code the user
/// pastes back, exchange it for a token.
pub async fn obtain_token(eff: &Effective, client_id: &str, client_secret: &str) -> Result<String, ReportError> {
    let url = authorize_url(&eff.oauth_base, client_id, DEFAULT_SCOPE);
    if let Err(e) = open_browser(&url) {
        tracing::warn!(error = %e, "cannot open browser");
    }
    eprintln!("Open {url} to authorize, then paste the code below.");
    eprint!("OAuth Code: ");

    let mut code = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut code)
        .await
        .map_err(|e| ReportError::Auth(format!("read code: {e}")))?;
    let code = code.trim();
    if code.is_empty() {
        return Err(ReportError::Auth("empty OAuth code".into()));
    }

    let http = reqwest::Client::builder()
        .timeout(eff.timeout)
        .build()
        .map_err(|e| ReportError::Auth(format!("build http client: {e}")))?;
    let token = exchange_code(&http, &eff.api_base, client_id, client_secret, code).await?;

    // Printed so the next run can pass --token directly.
    eprintln!("\ntoken: {token}\n");
    Ok(token)
}

fn open_browser(url: &str) -> std::io::Result<()> {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = Command::new("rundll32");
        c.args(["url.dll,FileProtocolHandler", url]);
        c
    } else if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(url);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };
    cmd.spawn().map(|_| ())
}
