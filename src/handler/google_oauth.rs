use std::sync::Arc;

use axum::{
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::get,
    Extension, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use oauth2::CsrfToken;
use serde::Deserialize;

use crate::{
    error::HttpError,
    handler::auth::{issue_tokens, removal_cookie, with_token_cookies},
    service::google_oauth::{sanitize_redirect, verify_state, OAuthError},
    AppState,
};

const OAUTH_STATE_COOKIE: &str = "oauth_state";
const OAUTH_REDIRECT_COOKIE: &str = "oauth_redirect";

#[derive(Debug, Deserialize)]
pub struct GoogleLoginQuery {
    pub redirect: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

pub fn oauth_handler() -> Router {
    Router::new()
        .route("/google", get(google_login))
        .route("/google/callback", get(google_callback))
}

fn oauth_error(error: OAuthError) -> HttpError {
    match error {
        OAuthError::NotConfigured => {
            HttpError::new(error.to_string(), StatusCode::SERVICE_UNAVAILABLE)
        }
        OAuthError::CsrfValidation(_) => {
            HttpError::unauthorized("Google sign-in could not be verified").with_detail(error.to_string())
        }
        _ => {
            tracing::error!("google sign-in failed: {}", error);
            HttpError::new("Google sign-in failed", StatusCode::BAD_GATEWAY)
                .with_detail(error.to_string())
        }
    }
}

fn short_lived(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .max_age(time::Duration::minutes(10))
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub async fn google_login(
    Extension(app_state): Extension<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<GoogleLoginQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let state = CsrfToken::new_random().secret().to_string();

    let auth_url = app_state
        .google_auth
        .get_authorization_url(&state)
        .map_err(oauth_error)?;

    let redirect = sanitize_redirect(query.redirect.as_deref());

    let jar = jar
        .add(short_lived(OAUTH_STATE_COOKIE, state))
        .add(short_lived(OAUTH_REDIRECT_COOKIE, redirect));

    Ok((jar, Redirect::to(&auth_url)))
}

pub async fn google_callback(
    Extension(app_state): Extension<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<GoogleCallbackQuery>,
) -> Result<impl IntoResponse, HttpError> {
    if let Some(error) = query.error {
        return Err(HttpError::unauthorized("Google sign-in was cancelled").with_detail(error));
    }

    let code = query
        .code
        .ok_or_else(|| HttpError::bad_request("Missing authorization code"))?;

    let stored_state = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    verify_state(query.state.as_deref().unwrap_or_default(), stored_state.as_deref())
        .map_err(oauth_error)?;

    let redirect = jar
        .get(OAUTH_REDIRECT_COOKIE)
        .map(|c| c.value().to_string())
        .unwrap_or_default();

    let google_token = app_state
        .google_auth
        .exchange_code(&code)
        .await
        .map_err(oauth_error)?;
    let info = app_state
        .google_auth
        .get_user_info(&google_token)
        .await
        .map_err(oauth_error)?;

    let user = app_state.user_service.login_with_google(info).await?;
    let tokens = issue_tokens(&app_state.env, &user)?;

    let jar = with_token_cookies(jar, &app_state.env, &tokens)
        .remove(removal_cookie(OAUTH_STATE_COOKIE))
        .remove(removal_cookie(OAUTH_REDIRECT_COOKIE));

    tracing::info!(user_id = %user.id, "user logged in with Google");

    let target = format!(
        "{}/{}",
        app_state.env.frontend_url.trim_end_matches('/'),
        redirect
    );

    Ok((jar, Redirect::to(&target)))
}
