use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

/// Flat charge per unit of weight.
pub const FEE_PER_UNIT_WEIGHT: f64 = 50.0;

/// Heaviest parcel accepted, in the same unit as `weight`.
pub const MAX_WEIGHT: f64 = 10_000.0;

pub fn calculate_fee(weight: f64) -> f64 {
    weight * FEE_PER_UNIT_WEIGHT
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "parcel_status")]
pub enum ParcelStatus {
    Requested,
    Approved,
    Dispatched,
    #[sqlx(rename = "In Transit")]
    #[serde(rename = "In Transit")]
    InTransit,
    Delivered,
    Cancelled,
}

impl ParcelStatus {
    pub fn to_str(&self) -> &str {
        match self {
            ParcelStatus::Requested => "Requested",
            ParcelStatus::Approved => "Approved",
            ParcelStatus::Dispatched => "Dispatched",
            ParcelStatus::InTransit => "In Transit",
            ParcelStatus::Delivered => "Delivered",
            ParcelStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for ParcelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StatusLog {
    pub status: ParcelStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "updatedBy", skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Parcel {
    pub id: Uuid,
    #[serde(rename = "trackingId")]
    pub tracking_id: String,
    #[serde(rename = "senderId")]
    pub sender_id: Uuid,
    #[serde(rename = "receiverId")]
    pub receiver_id: Uuid,
    pub weight: f64,
    pub fee: f64,
    #[serde(rename = "pickupAddress")]
    pub pickup_address: String,
    #[serde(rename = "deliveryAddress")]
    pub delivery_address: String,
    #[serde(rename = "currentStatus")]
    pub current_status: ParcelStatus,
    #[serde(rename = "statusLogs")]
    pub status_logs: Json<Vec<StatusLog>>,
    #[serde(rename = "isBlocked")]
    pub is_blocked: bool,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Input for a freshly requested parcel; the sender comes from the session.
#[derive(Debug, Clone)]
pub struct NewParcel {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub weight: f64,
    pub pickup_address: String,
    pub delivery_address: String,
}

impl Parcel {
    /// Builds a parcel in `Requested` with its fee and first log entry.
    pub fn request(new: NewParcel, tracking_id: String, now: DateTime<Utc>) -> Self {
        let first_log = StatusLog {
            status: ParcelStatus::Requested,
            timestamp: now,
            updated_by: Some(new.sender_id),
            location: Some(new.pickup_address.clone()),
            note: Some("Parcel created".to_string()),
        };

        Parcel {
            id: Uuid::new_v4(),
            tracking_id,
            sender_id: new.sender_id,
            receiver_id: new.receiver_id,
            weight: new.weight,
            fee: calculate_fee(new.weight),
            pickup_address: new.pickup_address,
            delivery_address: new.delivery_address,
            current_status: ParcelStatus::Requested,
            status_logs: Json(vec![first_log]),
            is_blocked: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends a log entry and moves `current_status` along with it.
    pub fn push_status(&mut self, log: StatusLog) {
        self.current_status = log.status;
        self.status_logs.0.push(log);
    }

    pub fn latest_log(&self) -> Option<&StatusLog> {
        self.status_logs.0.last()
    }

    pub fn is_sender(&self, user_id: Uuid) -> bool {
        self.sender_id == user_id
    }

    pub fn is_receiver(&self, user_id: Uuid) -> bool {
        self.receiver_id == user_id
    }
}

/// Parcel joined with the name and email of the other party.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct ParcelWithParty {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub parcel: Parcel,
    #[serde(rename = "counterpartName")]
    pub counterpart_name: String,
    #[serde(rename = "counterpartEmail")]
    pub counterpart_email: String,
}
