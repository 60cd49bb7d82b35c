use serde::{Deserialize, Serialize};

use ledger_api::TransportError;

use crate::decode_envelope;

/// Read access to snapshots and profile, `+`-joined as the authorize page expects.
pub const DEFAULT_SCOPE: &str = "SNAPSHOTS:READ+PROFILE:READ";

/// Page the user opens in a browser to approve access and obtain a code.
pub fn authorize_url(oauth_base: &str, client_id: &str, scope: &str) -> String {
    format!(
        "{}?client_id={client_id}&scope={scope}",
        oauth_base.trim_end_matches('/')
    )
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    code_verifier: &'a str,
}

#[derive(Deserialize)]
struct TokenGrant {
    access_token: String,
    #[serde(default)]
    scope: String,
}

/// Exchange an authorization code for a bearer token.
pub async fn exchange_code(
    http: &reqwest::Client,
    api_base: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
) -> Result<String, TransportError> {
    let url = format!("{}/oauth/token", api_base.trim_end_matches('/'));
    let body = TokenRequest {
        client_id,
        client_secret,
        code: code.trim(),
        code_verifier: "",
    };

    let resp = http
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|e| TransportError::network(format!("POST {url}: {e}")))?;
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| TransportError::network(format!("read response body: {e}")))?;

    let grant: TokenGrant = decode_envelope(status, &text).map_err(|e| e.with_context("oauth token"))?;
    tracing::info!(scope = %grant.scope, "access token granted");
    Ok(grant.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_client_and_scope() {
        let url = authorize_url("https://oauth.example/", "cid", DEFAULT_SCOPE);
        assert_eq!(url, "https://oauth.example?client_id=cid&scope=SNAPSHOTS:READ+PROFILE:READ");
    }
}
