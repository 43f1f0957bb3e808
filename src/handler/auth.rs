use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use validator::Validate;

use crate::{
    config::Config,
    dtos::{
        userdtos::{AccessTokenData, FilterUserDto, LoginUserDto, ResetPasswordDto, UserLoginData},
        ApiResponse,
    },
    error::{json_rejection, validation_error, HttpError},
    middleware::{auth, JWTAuthMiddeware, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
    utils::token,
    AppState,
};

pub fn auth_handler() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .route("/logout", post(logout))
        .route(
            "/reset-password",
            post(reset_password).layer(middleware::from_fn(auth)),
        )
}

/// HTTP-only cookie scoped to the whole site; cross-site in production.
pub(crate) fn build_cookie(
    config: &Config,
    name: &'static str,
    value: String,
    max_age_minutes: i64,
) -> Cookie<'static> {
    let production = !config.is_development();

    Cookie::build((name, value))
        .path("/")
        .max_age(time::Duration::minutes(max_age_minutes))
        .http_only(true)
        .secure(production)
        .same_site(if production { SameSite::None } else { SameSite::Lax })
        .build()
}

pub(crate) fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

/// Sets both token cookies for a freshly authenticated user.
pub(crate) fn with_token_cookies(
    jar: CookieJar,
    config: &Config,
    tokens: &token::UserTokens,
) -> CookieJar {
    jar.add(build_cookie(
        config,
        ACCESS_TOKEN_COOKIE,
        tokens.access_token.clone(),
        config.jwt_access_maxage,
    ))
    .add(build_cookie(
        config,
        REFRESH_TOKEN_COOKIE,
        tokens.refresh_token.clone(),
        config.jwt_refresh_maxage,
    ))
}

pub(crate) fn issue_tokens(
    config: &Config,
    user: &crate::models::usermodel::User,
) -> Result<token::UserTokens, HttpError> {
    token::create_user_tokens(
        user,
        config.jwt_access_secret.as_bytes(),
        config.jwt_access_maxage,
        config.jwt_refresh_secret.as_bytes(),
        config.jwt_refresh_maxage,
    )
    .map_err(|e| HttpError::server_error(e.to_string()))
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    jar: CookieJar,
    payload: Result<Json<LoginUserDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(body) = payload.map_err(json_rejection)?;
    body.validate().map_err(|e| validation_error(&e))?;

    let user = app_state
        .user_service
        .login(&body.email, &body.password)
        .await?;

    let tokens = issue_tokens(&app_state.env, &user)?;
    let jar = with_token_cookies(jar, &app_state.env, &tokens);

    tracing::info!(user_id = %user.id, "user logged in");

    let data = UserLoginData {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user: FilterUserDto::filter_user(&user),
    };

    Ok((
        jar,
        ApiResponse::new("User Logged In Successfully", data).send(StatusCode::OK),
    ))
}

pub async fn refresh_token(
    Extension(app_state): Extension<Arc<AppState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, HttpError> {
    let refresh = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| HttpError::bad_request("No refresh token received from cookies"))?;

    let claims = token::decode_token(refresh, app_state.env.jwt_refresh_secret.as_bytes())?;

    let user = app_state.user_service.user_for_refresh(claims.user_id).await?;

    let access_token = token::create_token(
        &user,
        app_state.env.jwt_access_secret.as_bytes(),
        app_state.env.jwt_access_maxage,
    )
    .map_err(|e| HttpError::server_error(e.to_string()))?;

    let jar = jar.add(build_cookie(
        &app_state.env,
        ACCESS_TOKEN_COOKIE,
        access_token.clone(),
        app_state.env.jwt_access_maxage,
    ));

    Ok((
        jar,
        ApiResponse::new(
            "New Access Token Retrieved Successfully",
            AccessTokenData { access_token },
        )
        .send(StatusCode::OK),
    ))
}

pub async fn logout(jar: CookieJar) -> Result<impl IntoResponse, HttpError> {
    let jar = jar
        .remove(removal_cookie(ACCESS_TOKEN_COOKIE))
        .remove(removal_cookie(REFRESH_TOKEN_COOKIE));

    Ok((
        jar,
        ApiResponse::new("User Logged Out Successfully", serde_json::Value::Null)
            .send(StatusCode::OK),
    ))
}

pub async fn reset_password(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    payload: Result<Json<ResetPasswordDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(body) = payload.map_err(json_rejection)?;
    body.validate().map_err(|e| validation_error(&e))?;

    app_state
        .user_service
        .reset_password(&user.user, &body.old_password, &body.new_password)
        .await?;

    Ok(ApiResponse::new("Password Changed Successfully", serde_json::Value::Null)
        .send(StatusCode::OK))
}
