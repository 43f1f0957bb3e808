use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;

const AUTHORIZE_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

#[derive(Debug, Deserialize, Clone)]
pub struct GoogleUserInfo {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub picture: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

impl GoogleUserInfo {
    /// Lowercased address, only when Google has verified it.
    pub fn verified_email(&self) -> Option<String> {
        self.email_verified
            .then(|| self.email.trim().to_lowercase())
    }

    /// Display name, falling back to the mailbox part of the address.
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Google sign-in is not configured")]
    NotConfigured,
    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Token exchange error: {0}")]
    TokenExchange(String),
    #[error("User info error: {0}")]
    UserInfo(String),
    #[error("CSRF validation error: {0}")]
    CsrfValidation(String),
}

#[derive(Debug, Clone)]
pub struct GoogleAuthService {
    client_id: String,
    client_secret: String,
    callback_url: String,
    http: reqwest::Client,
}

impl GoogleAuthService {
    pub fn new(config: &Config) -> Self {
        if config.google_client_id.is_empty() || config.google_client_secret.is_empty() {
            tracing::warn!("GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET not set, Google sign-in disabled");
        }

        GoogleAuthService {
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            callback_url: config.google_callback_url.clone(),
            http: reqwest::Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    /// Consent screen URL; `state` round-trips through Google untouched.
    pub fn get_authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        if !self.is_configured() {
            return Err(OAuthError::NotConfigured);
        }

        Ok(format!(
            "{AUTHORIZE_ENDPOINT}?client_id={}&response_type=code&scope=openid%20email%20profile&redirect_uri={}&state={}&access_type=offline&prompt=select_account",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.callback_url),
            urlencoding::encode(state),
        ))
    }

    /// Exchanges an authorization code for Google's access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        if !self.is_configured() {
            return Err(OAuthError::NotConfigured);
        }

        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.callback_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self.http.post(TOKEN_ENDPOINT).form(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::TokenExchange(format!("HTTP {status} - {body}")));
        }

        let token_response: Value = response.json().await?;

        token_response["access_token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| OAuthError::TokenExchange("access_token missing from response".to_string()))
    }

    pub async fn get_user_info(&self, access_token: &str) -> Result<GoogleUserInfo, OAuthError> {
        let response = self
            .http
            .get(USERINFO_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::UserInfo(format!("HTTP {status} - {body}")));
        }

        let user_info: GoogleUserInfo = response.json().await?;
        if user_info.email.is_empty() {
            return Err(OAuthError::UserInfo("Google account has no email".to_string()));
        }

        Ok(user_info)
    }
}

/// Compares the returned `state` with the value kept in the state cookie.
pub fn verify_state(state: &str, expected: Option<&str>) -> Result<(), OAuthError> {
    match expected {
        Some(expected) if !state.is_empty() && expected == state => Ok(()),
        Some(_) => Err(OAuthError::CsrfValidation("State mismatch".to_string())),
        None => Err(OAuthError::CsrfValidation("Missing state cookie".to_string())),
    }
}

/// Keeps post-login redirects on the frontend: only relative paths pass.
pub fn sanitize_redirect(redirect: Option<&str>) -> String {
    match redirect.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => {
            path.trim_start_matches('/').to_string()
        }
        _ => String::new(),
    }
}
