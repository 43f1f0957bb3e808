use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query,
    },
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    dtos::{
        userdtos::{FilterUserDto, RegisterUserDto, UpdateUserDto, UserData},
        ApiResponse, Meta, RequestQueryDto,
    },
    error::{json_rejection, parse_id, query_rejection, validation_error, HttpError},
    middleware::{auth, role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    AppState,
};

pub fn users_handler() -> Router {
    let protected = Router::new()
        .route("/me", get(get_me))
        .route(
            "/all-users",
            get(get_users).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Admin, UserRole::SuperAdmin])
            })),
        )
        .route("/:id", patch(update_user))
        .route_layer(middleware::from_fn(auth));

    Router::new()
        .route("/register", post(register))
        .merge(protected)
}

pub async fn register(
    Extension(app_state): Extension<Arc<AppState>>,
    payload: Result<Json<RegisterUserDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(body) = payload.map_err(json_rejection)?;
    body.validate().map_err(|e| validation_error(&e))?;

    let user = app_state.user_service.register(body).await?;

    Ok(ApiResponse::new(
        "User Created Successfully",
        UserData {
            user: FilterUserDto::filter_user(&user),
        },
    )
    .send(StatusCode::CREATED))
}

pub async fn get_me(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let auths = app_state
        .user_service
        .get_auth_providers(user.user.id)
        .await?;

    let filtered_user = FilterUserDto::filter_user(&user.user).with_auths(auths);

    Ok(ApiResponse::new(
        "Your profile Retrieved Successfully",
        UserData {
            user: filtered_user,
        },
    )
    .send(StatusCode::OK))
}

pub async fn get_users(
    Extension(app_state): Extension<Arc<AppState>>,
    query: Result<Query<RequestQueryDto>, QueryRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Query(query_params) = query.map_err(query_rejection)?;
    query_params.validate().map_err(|e| validation_error(&e))?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let (users, total) = app_state
        .user_service
        .get_users(page, limit)
        .await?;

    Ok(ApiResponse::new(
        "All Users Retrieved Successfully",
        FilterUserDto::filter_users(&users),
    )
    .with_meta(Meta {
        total,
        page: Some(page),
        limit: Some(limit),
    })
    .send(StatusCode::OK))
}

pub async fn update_user(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let user_id = parse_id(&id)?;
    let Json(body) = payload.map_err(json_rejection)?;
    body.validate().map_err(|e| validation_error(&e))?;

    let updated = app_state
        .user_service
        .update_user(&user.user, user_id, body)
        .await?;

    Ok(ApiResponse::new(
        "User Updated Successfully",
        UserData {
            user: FilterUserDto::filter_user(&updated),
        },
    )
    .send(StatusCode::OK))
}
