use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    models::parcelmodel::{Parcel, ParcelStatus, ParcelWithParty, StatusLog, MAX_WEIGHT},
    service::parcel_policy::ParcelPatch,
};

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

fn check_id(errors: &mut ValidationErrors, field: &'static str, value: Option<&str>) {
    if let Some(raw) = value {
        if Uuid::parse_str(raw).is_err() {
            errors.add(field, field_error("invalid_id", "Must be a valid id"));
        }
    }
}

fn check_weight(errors: &mut ValidationErrors, weight: f64) {
    if !(weight.is_finite() && weight > 0.0) {
        errors.add("weight", field_error("range", "Weight must be greater than 0"));
    } else if weight > MAX_WEIGHT {
        errors.add("weight", field_error("range", "Weight must not exceed 10000"));
    }
}

fn merge(result: Result<(), ValidationErrors>) -> ValidationErrors {
    match result {
        Ok(()) => ValidationErrors::new(),
        Err(errors) => errors,
    }
}

fn finish(errors: ValidationErrors) -> Result<(), ValidationErrors> {
    if errors.errors().is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateParcelDto {
    pub receiver_id: String,

    pub weight: f64,

    #[validate(length(min = 1, message = "Pickup address is required"))]
    pub pickup_address: String,

    #[validate(length(min = 1, message = "Delivery address is required"))]
    pub delivery_address: String,
}

impl CreateParcelDto {
    /// Derived checks plus the id and weight rules.
    pub fn validate_payload(&self) -> Result<(), ValidationErrors> {
        let mut errors = merge(self.validate());

        check_id(&mut errors, "receiver_id", Some(&self.receiver_id));
        check_weight(&mut errors, self.weight);

        finish(errors)
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateParcelDto {
    #[validate(length(min = 1, message = "Tracking id must not be empty"))]
    pub tracking_id: Option<String>,

    pub sender_id: Option<String>,
    pub receiver_id: Option<String>,

    pub weight: Option<f64>,
    pub fee: Option<f64>,

    #[validate(length(min = 1, message = "Pickup address is required"))]
    pub pickup_address: Option<String>,

    #[validate(length(min = 1, message = "Delivery address is required"))]
    pub delivery_address: Option<String>,

    pub current_status: Option<ParcelStatus>,

    pub is_blocked: Option<bool>,

    /// Location recorded on the log entry of a status change.
    pub location: Option<String>,

    /// Note recorded on the log entry of a status change.
    pub note: Option<String>,
}

impl UpdateParcelDto {
    pub fn validate_payload(&self) -> Result<(), ValidationErrors> {
        let mut errors = merge(self.validate());

        check_id(&mut errors, "sender_id", self.sender_id.as_deref());
        check_id(&mut errors, "receiver_id", self.receiver_id.as_deref());
        if let Some(weight) = self.weight {
            check_weight(&mut errors, weight);
        }
        if let Some(fee) = self.fee {
            if !(fee.is_finite() && fee >= 0.0) {
                errors.add("fee", field_error("range", "Fee must be zero or positive"));
            }
        }

        finish(errors)
    }

    /// Call after `validate_payload`; malformed ids are dropped here.
    pub fn into_patch(self) -> ParcelPatch {
        ParcelPatch {
            tracking_id: self.tracking_id,
            sender_id: self.sender_id.and_then(|id| Uuid::parse_str(&id).ok()),
            receiver_id: self.receiver_id.and_then(|id| Uuid::parse_str(&id).ok()),
            weight: self.weight,
            fee: self.fee,
            pickup_address: self.pickup_address,
            delivery_address: self.delivery_address,
            current_status: self.current_status,
            is_blocked: self.is_blocked,
            location: self.location,
            note: self.note,
        }
    }
}

#[derive(Serialize, Deserialize, Validate, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ParcelQueryDto {
    pub current_status: Option<ParcelStatus>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MyParcelsDto {
    pub sent: Vec<ParcelWithParty>,
    pub received: Vec<ParcelWithParty>,
}

/// Public view of a parcel looked up by tracking id.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingDto {
    pub tracking_id: String,
    pub current_status: ParcelStatus,
    pub pickup_address: String,
    pub delivery_address: String,
    pub weight: f64,
    pub fee: f64,
    pub status_logs: Vec<StatusLog>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackingDto {
    pub fn from_parcel(parcel: Parcel) -> Self {
        TrackingDto {
            tracking_id: parcel.tracking_id,
            current_status: parcel.current_status,
            pickup_address: parcel.pickup_address,
            delivery_address: parcel.delivery_address,
            weight: parcel.weight,
            fee: parcel.fee,
            status_logs: parcel.status_logs.0,
            created_at: parcel.created_at,
            updated_at: parcel.updated_at,
        }
    }
}
