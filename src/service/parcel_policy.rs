//! Who may change a parcel, and how a status change is recorded.
//!
//! Everything here is pure: functions take the acting user and the loaded
//! parcel, mutate the parcel in memory and report what else has to happen.
//! Persisting the result is the caller's job.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    models::{
        parcelmodel::{calculate_fee, Parcel, ParcelStatus, StatusLog},
        usermodel::{User, UserRole},
    },
    service::error::ServiceError,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub user_id: Uuid,
    pub roles: Vec<UserRole>,
}

impl Actor {
    pub fn new(user_id: Uuid, roles: Vec<UserRole>) -> Self {
        Actor { user_id, roles }
    }

    pub fn from_user(user: &User) -> Self {
        Actor::new(user.id, user.roles.clone())
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(UserRole::is_privileged)
    }
}

/// Requested field changes on an existing parcel.
#[derive(Debug, Clone, Default)]
pub struct ParcelPatch {
    pub tracking_id: Option<String>,
    pub sender_id: Option<Uuid>,
    pub receiver_id: Option<Uuid>,
    pub weight: Option<f64>,
    pub fee: Option<f64>,
    pub pickup_address: Option<String>,
    pub delivery_address: Option<String>,
    pub current_status: Option<ParcelStatus>,
    pub is_blocked: Option<bool>,
    pub location: Option<String>,
    pub note: Option<String>,
}

impl ParcelPatch {
    pub fn is_empty(&self) -> bool {
        self.tracking_id.is_none()
            && self.sender_id.is_none()
            && self.receiver_id.is_none()
            && self.weight.is_none()
            && self.fee.is_none()
            && self.pickup_address.is_none()
            && self.delivery_address.is_none()
            && self.current_status.is_none()
            && self.is_blocked.is_none()
            && self.location.is_none()
            && self.note.is_none()
    }

    /// Fields a sender is never allowed to set.
    fn touches_restricted_fields(&self) -> bool {
        self.tracking_id.is_some()
            || self.sender_id.is_some()
            || self.receiver_id.is_some()
            || self.fee.is_some()
            || self.current_status.is_some()
            || self.is_blocked.is_some()
            || self.location.is_some()
            || self.note.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// A log entry was appended; the receiver must hold the receiver role.
    pub status_changed: bool,
    /// The receiver reference moved to another user.
    pub receiver_changed: bool,
}

impl UpdateOutcome {
    pub fn grants_receiver_role(&self) -> bool {
        self.status_changed || self.receiver_changed
    }
}

/// Statuses from which a sender may no longer cancel.
const NON_CANCELLABLE: [ParcelStatus; 3] = [
    ParcelStatus::Dispatched,
    ParcelStatus::InTransit,
    ParcelStatus::Delivered,
];

pub fn check_new_parcel(sender_id: Uuid, receiver_id: Uuid) -> Result<(), ServiceError> {
    if sender_id == receiver_id {
        return Err(ServiceError::bad_request(
            "Sender and receiver must be different users",
        ));
    }
    Ok(())
}

/// Generic field update (`PATCH /parcels/:id`).
pub fn apply_update(
    actor: &Actor,
    parcel: &mut Parcel,
    patch: ParcelPatch,
    now: DateTime<Utc>,
) -> Result<UpdateOutcome, ServiceError> {
    if actor.is_admin() {
        if patch.is_empty() {
            return Err(ServiceError::bad_request("Nothing to update"));
        }
        if patch.current_status.is_none() && (patch.location.is_some() || patch.note.is_some()) {
            return Err(ServiceError::bad_request(
                "Location and note can only be set together with currentStatus",
            ));
        }
        return Ok(apply_admin_update(actor, parcel, patch, now));
    }

    let is_own_parcel = parcel.is_sender(actor.user_id) && actor.has_role(UserRole::Sender);

    if is_own_parcel {
        if parcel.is_blocked {
            return Err(ServiceError::forbidden("This parcel is blocked"));
        }
        if parcel.current_status != ParcelStatus::Requested {
            return Err(ServiceError::forbidden(
                "You can only edit parcels in 'Requested' status",
            ));
        }
        if patch.touches_restricted_fields() {
            return Err(ServiceError::forbidden(
                "You are not authorized to change these fields",
            ));
        }
        if patch.is_empty() {
            return Err(ServiceError::bad_request("Nothing to update"));
        }

        if let Some(weight) = patch.weight {
            parcel.weight = weight;
            parcel.fee = calculate_fee(weight);
        }
        if let Some(pickup_address) = patch.pickup_address {
            parcel.pickup_address = pickup_address;
        }
        if let Some(delivery_address) = patch.delivery_address {
            parcel.delivery_address = delivery_address;
        }
        return Ok(UpdateOutcome::default());
    }

    let receiver_only = actor.has_role(UserRole::Receiver) && !actor.has_role(UserRole::Sender);
    if parcel.is_receiver(actor.user_id) || receiver_only {
        return Err(ServiceError::forbidden(
            "Receivers are not allowed to update parcel",
        ));
    }

    if actor.has_role(UserRole::Sender) {
        return Err(ServiceError::forbidden(
            "You are not authorized to update this parcel",
        ));
    }

    Err(ServiceError::forbidden("You are not authorized to update parcel"))
}

fn apply_admin_update(
    actor: &Actor,
    parcel: &mut Parcel,
    patch: ParcelPatch,
    now: DateTime<Utc>,
) -> UpdateOutcome {
    let mut outcome = UpdateOutcome::default();

    if let Some(tracking_id) = patch.tracking_id {
        parcel.tracking_id = tracking_id;
    }
    if let Some(sender_id) = patch.sender_id {
        parcel.sender_id = sender_id;
    }
    if let Some(receiver_id) = patch.receiver_id {
        outcome.receiver_changed = receiver_id != parcel.receiver_id;
        parcel.receiver_id = receiver_id;
    }
    if let Some(weight) = patch.weight {
        parcel.weight = weight;
        parcel.fee = calculate_fee(weight);
    }
    if let Some(fee) = patch.fee {
        parcel.fee = fee;
    }
    if let Some(pickup_address) = patch.pickup_address {
        parcel.pickup_address = pickup_address;
    }
    if let Some(delivery_address) = patch.delivery_address {
        parcel.delivery_address = delivery_address;
    }
    if let Some(is_blocked) = patch.is_blocked {
        parcel.is_blocked = is_blocked;
    }

    if let Some(status) = patch.current_status {
        if status != parcel.current_status {
            let log = StatusLog {
                status,
                timestamp: now,
                updated_by: Some(actor.user_id),
                location: patch
                    .location
                    .or_else(|| Some(parcel.delivery_address.clone())),
                note: patch
                    .note
                    .or_else(|| Some(format!("Status changed to {}", status))),
            };
            parcel.push_status(log);
            outcome.status_changed = true;
        }
    }

    outcome
}

/// Receiver marks an in-transit parcel as delivered.
pub fn confirm_delivery(
    actor: &Actor,
    parcel: &mut Parcel,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    if !parcel.is_receiver(actor.user_id) {
        return Err(ServiceError::forbidden(
            "Only the receiver can confirm delivery",
        ));
    }
    if parcel.is_blocked {
        return Err(ServiceError::forbidden("This parcel is blocked"));
    }
    if parcel.current_status != ParcelStatus::InTransit {
        return Err(ServiceError::bad_request(format!(
            "Cannot confirm delivery. Parcel must be \"In Transit\" but current status is \"{}\"",
            parcel.current_status
        )));
    }

    let location = Some(parcel.delivery_address.clone());
    parcel.push_status(StatusLog {
        status: ParcelStatus::Delivered,
        timestamp: now,
        updated_by: Some(actor.user_id),
        location,
        note: Some("Delivery confirmed by receiver".to_string()),
    });

    Ok(())
}

/// Sender withdraws a parcel that has not left yet.
pub fn cancel(actor: &Actor, parcel: &mut Parcel, now: DateTime<Utc>) -> Result<(), ServiceError> {
    if !parcel.is_sender(actor.user_id) {
        return Err(ServiceError::forbidden(
            "Only the sender can cancel this parcel",
        ));
    }
    if parcel.is_blocked {
        return Err(ServiceError::forbidden("This parcel is blocked"));
    }
    if NON_CANCELLABLE.contains(&parcel.current_status) {
        return Err(ServiceError::bad_request(format!(
            "Cannot cancel parcel after it has been {}",
            parcel.current_status.to_str().to_lowercase()
        )));
    }
    if parcel.current_status == ParcelStatus::Cancelled {
        return Err(ServiceError::bad_request("Parcel is already cancelled"));
    }

    let location = Some(parcel.pickup_address.clone());
    parcel.push_status(StatusLog {
        status: ParcelStatus::Cancelled,
        timestamp: now,
        updated_by: Some(actor.user_id),
        location,
        note: Some("Parcel cancelled by sender".to_string()),
    });

    Ok(())
}

pub fn can_view_status_log(actor: &Actor, parcel: &Parcel) -> Result<(), ServiceError> {
    if actor.is_admin() || parcel.is_sender(actor.user_id) || parcel.is_receiver(actor.user_id) {
        return Ok(());
    }
    Err(ServiceError::forbidden(
        "You are not authorized to see this parcel's status log",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parcelmodel::NewParcel;
    use axum::http::StatusCode;

    struct Fixture {
        sender: Actor,
        receiver: Actor,
        admin: Actor,
        parcel: Parcel,
    }

    fn fixture(weight: f64) -> Fixture {
        let sender = Actor::new(Uuid::new_v4(), vec![UserRole::Sender, UserRole::Receiver]);
        let receiver = Actor::new(Uuid::new_v4(), vec![UserRole::Sender, UserRole::Receiver]);
        let admin = Actor::new(Uuid::new_v4(), vec![UserRole::Admin]);
        let parcel = Parcel::request(
            NewParcel {
                sender_id: sender.user_id,
                receiver_id: receiver.user_id,
                weight,
                pickup_address: "7 Mill Lane".to_string(),
                delivery_address: "21 Quay Street".to_string(),
            },
            "TRK0123456789abcdef0123456789abcdef".to_string(),
            Utc::now(),
        );
        Fixture { sender, receiver, admin, parcel }
    }

    fn status_patch(status: ParcelStatus) -> ParcelPatch {
        ParcelPatch {
            current_status: Some(status),
            ..Default::default()
        }
    }

    fn assert_log_in_sync(parcel: &Parcel) {
        assert_eq!(parcel.latest_log().unwrap().status, parcel.current_status);
    }

    #[test]
    fn delivery_lifecycle() {
        let mut f = fixture(2.0);
        assert_eq!(f.parcel.fee, 100.0);
        assert_eq!(f.parcel.status_logs.len(), 1);

        let err = confirm_delivery(&f.receiver, &mut f.parcel, Utc::now()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(f.parcel.current_status, ParcelStatus::Requested);
        assert_eq!(f.parcel.status_logs.len(), 1);

        let outcome = apply_update(
            &f.admin,
            &mut f.parcel,
            status_patch(ParcelStatus::InTransit),
            Utc::now(),
        )
        .unwrap();
        assert!(outcome.status_changed);
        assert_eq!(f.parcel.status_logs.len(), 2);
        assert_log_in_sync(&f.parcel);

        confirm_delivery(&f.receiver, &mut f.parcel, Utc::now()).unwrap();
        assert_eq!(f.parcel.current_status, ParcelStatus::Delivered);
        assert_eq!(f.parcel.status_logs.len(), 3);
        let last = f.parcel.latest_log().unwrap();
        assert_eq!(last.updated_by, Some(f.receiver.user_id));
        assert_eq!(last.note.as_deref(), Some("Delivery confirmed by receiver"));
    }

    #[test]
    fn status_change_log_defaults_to_delivery_address() {
        let mut f = fixture(1.0);
        apply_update(&f.admin, &mut f.parcel, status_patch(ParcelStatus::Approved), Utc::now())
            .unwrap();

        let log = f.parcel.latest_log().unwrap();
        assert_eq!(log.status, ParcelStatus::Approved);
        assert_eq!(log.location.as_deref(), Some("21 Quay Street"));
        assert_eq!(log.note.as_deref(), Some("Status changed to Approved"));
        assert_eq!(log.updated_by, Some(f.admin.user_id));
    }

    #[test]
    fn status_change_log_uses_supplied_location_and_note() {
        let mut f = fixture(1.0);
        let patch = ParcelPatch {
            current_status: Some(ParcelStatus::Dispatched),
            location: Some("Hub 3".to_string()),
            note: Some("Left the hub".to_string()),
            ..Default::default()
        };
        apply_update(&f.admin, &mut f.parcel, patch, Utc::now()).unwrap();

        let log = f.parcel.latest_log().unwrap();
        assert_eq!(log.location.as_deref(), Some("Hub 3"));
        assert_eq!(log.note.as_deref(), Some("Left the hub"));
    }

    #[test]
    fn same_status_does_not_append() {
        let mut f = fixture(1.0);
        let patch = ParcelPatch {
            current_status: Some(ParcelStatus::Requested),
            pickup_address: Some("8 Mill Lane".to_string()),
            ..Default::default()
        };
        let outcome = apply_update(&f.admin, &mut f.parcel, patch, Utc::now()).unwrap();
        assert!(!outcome.status_changed);
        assert_eq!(f.parcel.status_logs.len(), 1);
        assert_eq!(f.parcel.pickup_address, "8 Mill Lane");
    }

    #[test]
    fn location_or_note_without_status_is_rejected() {
        let mut f = fixture(1.0);
        let before = f.parcel.clone();
        let patch = ParcelPatch {
            location: Some("Hub 3".to_string()),
            note: Some("Arrived".to_string()),
            ..Default::default()
        };
        let err = apply_update(&f.admin, &mut f.parcel, patch, Utc::now()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(f.parcel.status_logs.len(), before.status_logs.len());
        assert_eq!(f.parcel.updated_at, before.updated_at);
    }

    #[test]
    fn receiver_role_is_granted_on_status_or_receiver_change() {
        let mut f = fixture(1.0);

        let outcome = apply_update(
            &f.admin,
            &mut f.parcel,
            ParcelPatch {
                weight: Some(2.0),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert!(!outcome.grants_receiver_role());

        let patch = ParcelPatch {
            receiver_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        let outcome = apply_update(&f.admin, &mut f.parcel, patch, Utc::now()).unwrap();
        assert!(outcome.receiver_changed);
        assert!(outcome.grants_receiver_role());

        let same_receiver = ParcelPatch {
            receiver_id: Some(f.parcel.receiver_id),
            ..Default::default()
        };
        let outcome = apply_update(&f.admin, &mut f.parcel, same_receiver, Utc::now()).unwrap();
        assert!(!outcome.grants_receiver_role());

        let outcome = apply_update(
            &f.admin,
            &mut f.parcel,
            status_patch(ParcelStatus::Approved),
            Utc::now(),
        )
        .unwrap();
        assert!(outcome.grants_receiver_role());
    }

    #[test]
    fn admin_may_set_fee_and_reassign_receiver() {
        let mut f = fixture(2.0);
        let new_receiver = Uuid::new_v4();
        let patch = ParcelPatch {
            weight: Some(4.0),
            fee: Some(120.0),
            receiver_id: Some(new_receiver),
            is_blocked: Some(true),
            ..Default::default()
        };
        let outcome = apply_update(&f.admin, &mut f.parcel, patch, Utc::now()).unwrap();
        assert!(outcome.receiver_changed);
        assert_eq!(f.parcel.fee, 120.0);
        assert_eq!(f.parcel.weight, 4.0);
        assert_eq!(f.parcel.receiver_id, new_receiver);
        assert!(f.parcel.is_blocked);
    }

    #[test]
    fn sender_edits_only_while_requested() {
        let mut f = fixture(2.0);
        let patch = ParcelPatch {
            weight: Some(3.0),
            delivery_address: Some("22 Quay Street".to_string()),
            ..Default::default()
        };
        apply_update(&f.sender, &mut f.parcel, patch.clone(), Utc::now()).unwrap();
        assert_eq!(f.parcel.fee, 150.0);
        assert_eq!(f.parcel.delivery_address, "22 Quay Street");

        apply_update(&f.admin, &mut f.parcel, status_patch(ParcelStatus::Approved), Utc::now())
            .unwrap();
        let err = apply_update(&f.sender, &mut f.parcel, patch, Utc::now()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(f.parcel.weight, 3.0);
    }

    #[test]
    fn sender_cannot_touch_restricted_fields() {
        let restricted = [
            status_patch(ParcelStatus::Approved),
            ParcelPatch { fee: Some(1.0), ..Default::default() },
            ParcelPatch { receiver_id: Some(Uuid::new_v4()), ..Default::default() },
            ParcelPatch { sender_id: Some(Uuid::new_v4()), ..Default::default() },
            ParcelPatch { tracking_id: Some("TRKx".into()), ..Default::default() },
            ParcelPatch { is_blocked: Some(false), ..Default::default() },
            ParcelPatch { note: Some("hi".into()), ..Default::default() },
        ];

        for patch in restricted {
            let mut f = fixture(1.0);
            let before = f.parcel.clone();
            let err = apply_update(&f.sender, &mut f.parcel, patch, Utc::now()).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
            assert_eq!(f.parcel.fee, before.fee);
            assert_eq!(f.parcel.current_status, before.current_status);
        }
    }

    #[test]
    fn other_senders_and_receivers_are_refused() {
        let mut f = fixture(1.0);
        let stranger = Actor::new(Uuid::new_v4(), vec![UserRole::Sender]);
        let patch = ParcelPatch { weight: Some(2.0), ..Default::default() };
        let err = apply_update(&stranger, &mut f.parcel, patch.clone(), Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "You are not authorized to update this parcel");

        let receiver_only = Actor::new(Uuid::new_v4(), vec![UserRole::Receiver]);
        let err = apply_update(&receiver_only, &mut f.parcel, patch.clone(), Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "Receivers are not allowed to update parcel");

        let err = apply_update(&f.receiver, &mut f.parcel, patch.clone(), Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "Receivers are not allowed to update parcel");

        let nobody = Actor::new(Uuid::new_v4(), vec![]);
        let err = apply_update(&nobody, &mut f.parcel, patch, Utc::now()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn empty_patch_is_rejected() {
        let mut f = fixture(1.0);
        let err = apply_update(&f.admin, &mut f.parcel, ParcelPatch::default(), Utc::now())
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn receiver_cannot_confirm_from_ineligible_states() {
        for status in [
            ParcelStatus::Requested,
            ParcelStatus::Approved,
            ParcelStatus::Dispatched,
            ParcelStatus::Delivered,
            ParcelStatus::Cancelled,
        ] {
            let mut f = fixture(1.0);
            if status != ParcelStatus::Requested {
                apply_update(&f.admin, &mut f.parcel, status_patch(status), Utc::now()).unwrap();
            }
            let logs_before = f.parcel.status_logs.len();
            let err = confirm_delivery(&f.receiver, &mut f.parcel, Utc::now()).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "{status}");
            assert_eq!(f.parcel.status_logs.len(), logs_before);
        }
    }

    #[test]
    fn only_the_receiver_confirms() {
        let mut f = fixture(1.0);
        apply_update(&f.admin, &mut f.parcel, status_patch(ParcelStatus::InTransit), Utc::now())
            .unwrap();
        let err = confirm_delivery(&f.sender, &mut f.parcel, Utc::now()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn sender_cancels_before_dispatch() {
        let mut f = fixture(1.0);
        apply_update(&f.admin, &mut f.parcel, status_patch(ParcelStatus::Approved), Utc::now())
            .unwrap();
        cancel(&f.sender, &mut f.parcel, Utc::now()).unwrap();
        assert_eq!(f.parcel.current_status, ParcelStatus::Cancelled);
        assert_eq!(f.parcel.status_logs.len(), 3);
        assert_log_in_sync(&f.parcel);

        let err = cancel(&f.sender, &mut f.parcel, Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "Parcel is already cancelled");
    }

    #[test]
    fn sender_cannot_cancel_after_dispatch() {
        for status in [
            ParcelStatus::Dispatched,
            ParcelStatus::InTransit,
            ParcelStatus::Delivered,
        ] {
            let mut f = fixture(1.0);
            apply_update(&f.admin, &mut f.parcel, status_patch(status), Utc::now()).unwrap();
            let err = cancel(&f.sender, &mut f.parcel, Utc::now()).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
            assert_eq!(
                err.to_string(),
                format!("Cannot cancel parcel after it has been {}", status.to_str().to_lowercase())
            );
            assert_eq!(f.parcel.current_status, status);
        }
    }

    #[test]
    fn only_the_sender_cancels() {
        let mut f = fixture(1.0);
        let err = cancel(&f.receiver, &mut f.parcel, Utc::now()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        let err = cancel(&f.admin, &mut f.parcel, Utc::now()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn blocked_parcels_refuse_party_actions() {
        let mut f = fixture(1.0);
        apply_update(
            &f.admin,
            &mut f.parcel,
            ParcelPatch { is_blocked: Some(true), ..Default::default() },
            Utc::now(),
        )
        .unwrap();

        assert!(cancel(&f.sender, &mut f.parcel, Utc::now()).is_err());
        let patch = ParcelPatch { weight: Some(2.0), ..Default::default() };
        assert!(apply_update(&f.sender, &mut f.parcel, patch, Utc::now()).is_err());
        assert_eq!(f.parcel.status_logs.len(), 1);
    }

    #[test]
    fn status_log_visibility() {
        let f = fixture(1.0);
        assert!(can_view_status_log(&f.sender, &f.parcel).is_ok());
        assert!(can_view_status_log(&f.receiver, &f.parcel).is_ok());
        assert!(can_view_status_log(&f.admin, &f.parcel).is_ok());

        let stranger = Actor::new(Uuid::new_v4(), vec![UserRole::Sender, UserRole::Receiver]);
        assert!(can_view_status_log(&stranger, &f.parcel).is_err());
    }

    #[test]
    fn log_grows_by_one_per_change() {
        let mut f = fixture(1.0);
        let mut previous = f.parcel.status_logs.0.clone();
        for status in [
            ParcelStatus::Approved,
            ParcelStatus::Dispatched,
            ParcelStatus::InTransit,
        ] {
            apply_update(&f.admin, &mut f.parcel, status_patch(status), Utc::now()).unwrap();
            assert_eq!(f.parcel.status_logs.len(), previous.len() + 1);
            assert_eq!(&f.parcel.status_logs[..previous.len()], &previous[..]);
            previous = f.parcel.status_logs.0.clone();
        }
    }

    #[test]
    fn self_addressed_parcels_are_rejected() {
        let id = Uuid::new_v4();
        assert!(check_new_parcel(id, id).is_err());
        assert!(check_new_parcel(id, Uuid::new_v4()).is_ok());
    }
}
