use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query,
    },
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    dtos::{
        parceldtos::{CreateParcelDto, MyParcelsDto, ParcelQueryDto, TrackingDto, UpdateParcelDto},
        ApiResponse, Meta,
    },
    error::{json_rejection, parse_id, query_rejection, validation_error, HttpError},
    middleware::{auth, role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    AppState,
};

pub fn parcels_handler() -> Router {
    let protected = Router::new()
        .route(
            "/",
            get(get_all_parcels)
                .layer(middleware::from_fn(|state, req, next| {
                    role_check(state, req, next, vec![UserRole::Admin, UserRole::SuperAdmin])
                }))
                .post(create_parcel),
        )
        .route("/me", get(get_my_parcels))
        .route("/:id", patch(update_parcel))
        .route("/:id/status-log", get(get_status_logs))
        .route("/:id/confirm-delivery", patch(confirm_delivery))
        .route("/:id/cancel", patch(cancel_parcel))
        .route_layer(middleware::from_fn(auth));

    Router::new()
        .route("/track/:tracking_id", get(track_parcel))
        .merge(protected)
}

pub async fn create_parcel(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    payload: Result<Json<CreateParcelDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(body) = payload.map_err(json_rejection)?;
    body.validate_payload().map_err(|e| validation_error(&e))?;

    let receiver_id = parse_id(&body.receiver_id)?;

    let parcel = app_state
        .parcel_service
        .create_parcel(
            &user.user,
            receiver_id,
            body.weight,
            body.pickup_address,
            body.delivery_address,
        )
        .await?;

    Ok(ApiResponse::new("Parcel created", parcel).send(StatusCode::CREATED))
}

pub async fn get_all_parcels(
    Extension(app_state): Extension<Arc<AppState>>,
    query: Result<Query<ParcelQueryDto>, QueryRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Query(query_params) = query.map_err(query_rejection)?;
    query_params.validate().map_err(|e| validation_error(&e))?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let (parcels, total) = app_state
        .parcel_service
        .get_all_parcels(query_params.current_status, page, limit)
        .await?;

    Ok(ApiResponse::new("All Parcels Retrieved Successfully", parcels)
        .with_meta(Meta {
            total,
            page: Some(page),
            limit: Some(limit),
        })
        .send(StatusCode::OK))
}

pub async fn get_my_parcels(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let (sent, received) = app_state.parcel_service.get_my_parcels(user.user.id).await?;

    Ok(
        ApiResponse::new("My Parcels Retrieved Successfully", MyParcelsDto { sent, received })
            .send(StatusCode::OK),
    )
}

pub async fn get_status_logs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let parcel_id = parse_id(&id)?;

    let logs = app_state
        .parcel_service
        .get_status_logs(&user.user, parcel_id)
        .await?;

    Ok(ApiResponse::new("Parcel Status Logs Retrieved Successfully", logs).send(StatusCode::OK))
}

pub async fn update_parcel(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateParcelDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let parcel_id = parse_id(&id)?;
    let Json(body) = payload.map_err(json_rejection)?;
    body.validate_payload().map_err(|e| validation_error(&e))?;

    let parcel = app_state
        .parcel_service
        .update_parcel(&user.user, parcel_id, body.into_patch())
        .await?;

    Ok(ApiResponse::new("Parcel Updated Successfully", parcel).send(StatusCode::OK))
}

pub async fn confirm_delivery(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let parcel_id = parse_id(&id)?;

    let parcel = app_state
        .parcel_service
        .confirm_delivery(&user.user, parcel_id)
        .await?;

    Ok(ApiResponse::new("Parcel delivery confirmed", parcel).send(StatusCode::OK))
}

pub async fn cancel_parcel(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let parcel_id = parse_id(&id)?;

    let parcel = app_state
        .parcel_service
        .cancel_parcel(&user.user, parcel_id)
        .await?;

    Ok(ApiResponse::new("Parcel cancelled successfully", parcel).send(StatusCode::OK))
}

pub async fn track_parcel(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(tracking_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let parcel = app_state.parcel_service.track_parcel(tracking_id.trim()).await?;

    Ok(ApiResponse::new("Parcel Tracked Successfully", TrackingDto::from_parcel(parcel))
        .send(StatusCode::OK))
}
