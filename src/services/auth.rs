use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::{oneshot, Mutex, Notify};

use crate::core::config::Settings;
use crate::services::extract_error_message;

const SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/spreadsheets.readonly",
    "https://www.googleapis.com/auth/forms.body",
    "https://www.googleapis.com/auth/drive",
];

/// Tokens are refreshed this many seconds before their stated expiry.
const EXPIRY_SKEW_SECONDS: i64 = 60;

const CALLBACK_PAGE: &str = "<!doctype html><html><body>\
<p>Authorization received. You can close this tab and return to the terminal.</p>\
</body></html>";

/// On-disk token record, compatible with the JSON the Google client
/// libraries write to `token.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    token_uri: String,
    client_id: String,
    client_secret: String,
    #[serde(default)]
    scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSecrets {
    installed: InstalledClient,
}

#[derive(Debug, Deserialize)]
struct InstalledClient {
    client_id: String,
    client_secret: String,
    auth_uri: String,
    token_uri: String,
}

/// Shared OAuth credential source for every Google API client.
///
/// Tokens are cached in memory and persisted to the token file, so one
/// consent round-trip serves subsequent runs until the refresh token is
/// revoked.
#[derive(Debug)]
pub(crate) struct GoogleAuth {
    client: Client,
    credentials_path: PathBuf,
    token_path: PathBuf,
    cached: Mutex<Option<StoredToken>>,
}

impl GoogleAuth {
    pub(crate) fn new(credentials_path: PathBuf, token_path: PathBuf) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build Google OAuth HTTP client")?;

        Ok(Self { client, credentials_path, token_path, cached: Mutex::new(None) })
    }

    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.google().credentials_path.clone(),
            settings.google().token_path.clone(),
        )
    }

    /// Returns a bearer token, refreshing or re-running consent as needed.
    pub(crate) async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if cached.is_none() {
            *cached = load_stored_token(&self.token_path)?;
        }

        let now = OffsetDateTime::now_utc();

        let refreshable = match cached.as_ref() {
            Some(stored) if !token_expired(stored.expiry.as_deref(), now) => {
                return Ok(stored.token.clone())
            }
            Some(stored) if stored.refresh_token.is_some() => Some(stored.clone()),
            _ => None,
        };

        let fresh = match refreshable {
            Some(stored) => self.refresh(stored).await?,
            None => {
                tracing::info!("No usable Google credentials; starting browser consent flow");
                self.run_consent_flow().await?
            }
        };

        persist_token(&self.token_path, &fresh)?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    async fn refresh(&self, stored: StoredToken) -> Result<StoredToken> {
        tracing::info!("Refreshing expired Google credentials");

        let refresh_token =
            stored.refresh_token.clone().context("Stored credentials have no refresh token")?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", stored.client_id.as_str()),
            ("client_secret", stored.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(&stored.token_uri)
            .form(&params)
            .send()
            .await
            .context("Failed to call Google token endpoint")?;

        let status = response.status();
        let payload: Value =
            response.json().await.context("Failed to parse Google token response")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Google token refresh failed (status {status}): {}",
                extract_error_message(&payload)
            ));
        }

        let mut refreshed = stored;
        apply_token_response(&mut refreshed, &payload, OffsetDateTime::now_utc())?;
        Ok(refreshed)
    }

    /// Authorization-code flow with PKCE against a loopback redirect.
    ///
    /// The authorization URL is printed rather than opened; the tool may be
    /// running on a headless machine and the operator can paste the link
    /// into any browser that can reach localhost.
    async fn run_consent_flow(&self) -> Result<StoredToken> {
        let secrets = load_client_secrets(&self.credentials_path)?;
        let installed = secrets.installed;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind local OAuth callback listener")?;
        let local_addr =
            listener.local_addr().context("Failed to read callback listener address")?;
        let redirect_uri = format!("http://{local_addr}");

        let state = random_url_safe(16);
        let verifier = random_url_safe(48);
        let challenge = code_challenge(&verifier);

        let auth_url = build_authorization_url(
            &installed.auth_uri,
            &installed.client_id,
            &redirect_uri,
            &state,
            &challenge,
        )?;

        println!("Open this link in your browser to authorize access:\n\n{auth_url}\n");
        tracing::info!(port = local_addr.port(), "Waiting for OAuth callback");

        let (sender, receiver) = oneshot::channel();
        let notify = Arc::new(Notify::new());
        let app = callback_router(CallbackState {
            slot: Arc::new(Mutex::new(Some(sender))),
            notify: notify.clone(),
        });

        let shutdown_notify = notify.clone();
        let server = async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown_notify.notified().await })
                .await
        };

        let (served, params) = tokio::join!(server, receiver);
        served.context("OAuth callback server failed")?;
        let params = params.context("OAuth callback was never delivered")?;

        if let Some(error) = params.error {
            return Err(anyhow!("Authorization was denied: {error}"));
        }
        if params.state.as_deref() != Some(state.as_str()) {
            return Err(anyhow!("OAuth state mismatch; aborting authorization"));
        }
        let code = params.code.context("OAuth callback carried no authorization code")?;

        let exchange = [
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("client_id", installed.client_id.as_str()),
            ("client_secret", installed.client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("code_verifier", verifier.as_str()),
        ];

        let response = self
            .client
            .post(&installed.token_uri)
            .form(&exchange)
            .send()
            .await
            .context("Failed to exchange authorization code")?;

        let status = response.status();
        let payload: Value =
            response.json().await.context("Failed to parse Google token response")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Authorization code exchange failed (status {status}): {}",
                extract_error_message(&payload)
            ));
        }

        let mut stored = StoredToken {
            token: String::new(),
            refresh_token: None,
            token_uri: installed.token_uri.clone(),
            client_id: installed.client_id.clone(),
            client_secret: installed.client_secret.clone(),
            scopes: SCOPES.iter().map(|scope| scope.to_string()).collect(),
            expiry: None,
        };
        apply_token_response(&mut stored, &payload, OffsetDateTime::now_utc())?;

        tracing::info!("Authorization complete");
        Ok(stored)
    }
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

#[derive(Clone)]
struct CallbackState {
    slot: Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>,
    notify: Arc<Notify>,
}

fn callback_router(state: CallbackState) -> Router {
    Router::new().route("/", get(handle_callback)).with_state(state)
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    if let Some(sender) = state.slot.lock().await.take() {
        let _ = sender.send(params);
    }
    state.notify.notify_one();
    Html(CALLBACK_PAGE)
}

fn build_authorization_url(
    auth_uri: &str,
    client_id: &str,
    redirect_uri: &str,
    state: &str,
    challenge: &str,
) -> Result<String> {
    let mut url = Url::parse(auth_uri).context("Failed to parse authorization endpoint URL")?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", &SCOPES.join(" "))
        .append_pair("state", state)
        .append_pair("code_challenge", challenge)
        .append_pair("code_challenge_method", "S256")
        .append_pair("access_type", "offline")
        .append_pair("prompt", "select_account");
    Ok(url.into())
}

fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn random_url_safe(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}

/// Expiry strings come back in RFC 3339; anything unreadable is treated as
/// already expired so the token gets replaced instead of trusted.
fn token_expired(expiry: Option<&str>, now: OffsetDateTime) -> bool {
    let Some(expiry) = expiry else {
        return false;
    };
    match OffsetDateTime::parse(expiry, &Rfc3339) {
        Ok(at) => at - time::Duration::seconds(EXPIRY_SKEW_SECONDS) <= now,
        Err(_) => true,
    }
}

fn apply_token_response(
    stored: &mut StoredToken,
    payload: &Value,
    now: OffsetDateTime,
) -> Result<()> {
    let access_token = payload
        .get("access_token")
        .and_then(Value::as_str)
        .context("Token response missing access_token")?;
    stored.token = access_token.to_string();

    if let Some(refresh_token) = payload.get("refresh_token").and_then(Value::as_str) {
        stored.refresh_token = Some(refresh_token.to_string());
    }

    stored.expiry = match payload.get("expires_in").and_then(Value::as_i64) {
        Some(expires_in) => {
            let at = now + time::Duration::seconds(expires_in);
            Some(at.format(&Rfc3339).context("Failed to format token expiry")?)
        }
        None => None,
    };

    Ok(())
}

fn load_stored_token(path: &Path) -> Result<Option<StoredToken>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(anyhow!(err)
                .context(format!("Failed to read token file {}", path.display())))
        }
    };

    let stored = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse token file {}", path.display()))?;
    Ok(Some(stored))
}

fn persist_token(path: &Path, token: &StoredToken) -> Result<()> {
    let serialized =
        serde_json::to_string_pretty(token).context("Failed to serialize credentials")?;
    std::fs::write(path, serialized)
        .with_context(|| format!("Failed to write token file {}", path.display()))?;
    tracing::info!(path = %path.display(), "Credentials saved");
    Ok(())
}

fn load_client_secrets(path: &Path) -> Result<ClientSecrets> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(anyhow!(
                "OAuth client file {} not found; download a desktop-app client JSON from the Google Cloud Console and place it there",
                path.display()
            ))
        }
        Err(err) => {
            return Err(anyhow!(err)
                .context(format!("Failed to read OAuth client file {}", path.display())))
        }
    };

    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse OAuth client file {}", path.display()))
}
