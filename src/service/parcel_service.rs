// service/parcel_service.rs
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::{DBClient, ParcelExt, UserExt},
    models::{
        parcelmodel::{NewParcel, Parcel, ParcelStatus, ParcelWithParty, StatusLog},
        usermodel::User,
    },
    service::{
        error::ServiceError,
        parcel_policy::{self, Actor, ParcelPatch},
    },
    utils::tracking::generate_tracking_id,
};

/// Fresh tracking ids are random; a clash only costs one more insert.
const TRACKING_ID_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct ParcelService {
    db_client: Arc<DBClient>,
}

impl ParcelService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub async fn create_parcel(
        &self,
        sender: &User,
        receiver_id: Uuid,
        weight: f64,
        pickup_address: String,
        delivery_address: String,
    ) -> Result<Parcel, ServiceError> {
        parcel_policy::check_new_parcel(sender.id, receiver_id)?;
        self.ensure_user_exists(receiver_id, "Receiver does not exist")
            .await?;

        let new_parcel = NewParcel {
            sender_id: sender.id,
            receiver_id,
            weight,
            pickup_address,
            delivery_address,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let parcel = Parcel::request(new_parcel.clone(), generate_tracking_id(), Utc::now());

            match self.db_client.save_parcel(&parcel).await {
                Ok(saved) => {
                    tracing::info!(
                        parcel_id = %saved.id,
                        tracking_id = %saved.tracking_id,
                        sender_id = %saved.sender_id,
                        "parcel requested"
                    );
                    return Ok(saved);
                }
                Err(sqlx::Error::Database(db))
                    if db.constraint() == Some("parcels_tracking_id_key")
                        && attempt < TRACKING_ID_ATTEMPTS =>
                {
                    tracing::warn!(attempt, "tracking id collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn get_all_parcels(
        &self,
        status: Option<ParcelStatus>,
        page: u32,
        limit: usize,
    ) -> Result<(Vec<Parcel>, i64), ServiceError> {
        let parcels = self.db_client.get_parcels(status, page, limit).await?;
        let total = self.db_client.get_parcel_count(status).await?;
        Ok((parcels, total))
    }

    pub async fn get_my_parcels(
        &self,
        user_id: Uuid,
    ) -> Result<(Vec<ParcelWithParty>, Vec<ParcelWithParty>), ServiceError> {
        let sent = self.db_client.get_sent_parcels(user_id).await?;
        let received = self.db_client.get_received_parcels(user_id).await?;
        Ok((sent, received))
    }

    pub async fn get_status_logs(
        &self,
        actor: &User,
        parcel_id: Uuid,
    ) -> Result<Vec<StatusLog>, ServiceError> {
        let parcel = self.load(parcel_id).await?;
        parcel_policy::can_view_status_log(&Actor::from_user(actor), &parcel)?;
        Ok(parcel.status_logs.0)
    }

    /// Public lookup by tracking id.
    pub async fn track_parcel(&self, tracking_id: &str) -> Result<Parcel, ServiceError> {
        self.db_client
            .get_parcel_by_tracking_id(tracking_id)
            .await?
            .ok_or_else(|| ServiceError::TrackingIdNotFound(tracking_id.to_string()))
    }

    pub async fn update_parcel(
        &self,
        actor: &User,
        parcel_id: Uuid,
        patch: ParcelPatch,
    ) -> Result<Parcel, ServiceError> {
        if let Some(receiver_id) = patch.receiver_id {
            self.ensure_user_exists(receiver_id, "Receiver does not exist")
                .await?;
        }
        if let Some(sender_id) = patch.sender_id {
            self.ensure_user_exists(sender_id, "Sender does not exist")
                .await?;
        }

        let mut parcel = self.load(parcel_id).await?;
        let read_at = parcel.updated_at;

        let outcome =
            parcel_policy::apply_update(&Actor::from_user(actor), &mut parcel, patch, Utc::now())?;

        if parcel.sender_id == parcel.receiver_id {
            return Err(ServiceError::bad_request(
                "Sender and receiver must be different users",
            ));
        }

        let saved = self
            .store(&parcel, read_at, outcome.grants_receiver_role())
            .await?;

        if outcome.status_changed {
            tracing::info!(
                parcel_id = %saved.id,
                status = %saved.current_status,
                updated_by = %actor.id,
                note = saved.latest_log().and_then(|log| log.note.as_deref()),
                "parcel status changed"
            );
        }

        Ok(saved)
    }

    pub async fn confirm_delivery(
        &self,
        actor: &User,
        parcel_id: Uuid,
    ) -> Result<Parcel, ServiceError> {
        let mut parcel = self.load(parcel_id).await?;
        let read_at = parcel.updated_at;

        parcel_policy::confirm_delivery(&Actor::from_user(actor), &mut parcel, Utc::now())?;

        let saved = self.store(&parcel, read_at, false).await?;
        tracing::info!(parcel_id = %saved.id, receiver_id = %actor.id, "delivery confirmed");
        Ok(saved)
    }

    pub async fn cancel_parcel(&self, actor: &User, parcel_id: Uuid) -> Result<Parcel, ServiceError> {
        let mut parcel = self.load(parcel_id).await?;
        let read_at = parcel.updated_at;

        parcel_policy::cancel(&Actor::from_user(actor), &mut parcel, Utc::now())?;

        let saved = self.store(&parcel, read_at, false).await?;
        tracing::info!(parcel_id = %saved.id, sender_id = %actor.id, "parcel cancelled");
        Ok(saved)
    }

    async fn load(&self, parcel_id: Uuid) -> Result<Parcel, ServiceError> {
        self.db_client
            .get_parcel(parcel_id)
            .await?
            .ok_or(ServiceError::ParcelNotFound(parcel_id))
    }

    /// Writes back only if the row is unchanged since it was read.
    async fn store(
        &self,
        parcel: &Parcel,
        read_at: chrono::DateTime<Utc>,
        grant_receiver_role: bool,
    ) -> Result<Parcel, ServiceError> {
        match self
            .db_client
            .update_parcel(parcel, read_at, grant_receiver_role)
            .await?
        {
            Some(saved) => Ok(saved),
            None => {
                tracing::warn!(parcel_id = %parcel.id, "concurrent parcel update rejected");
                Err(ServiceError::Conflict(parcel.id))
            }
        }
    }

    async fn ensure_user_exists(&self, user_id: Uuid, message: &str) -> Result<(), ServiceError> {
        match self.db_client.get_user(Some(user_id), None).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::bad_request(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::userdb::NewUser,
        models::usermodel::{AuthProviderKind, UserRole},
    };
    use sqlx::postgres::PgPoolOptions;

    // Run with `cargo test -- --ignored` against a scratch database.
    async fn db_client() -> Arc<DBClient> {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        Arc::new(DBClient::new(pool))
    }

    async fn create_user(db: &DBClient, roles: Vec<UserRole>) -> User {
        let email = format!("{}@parcels.test", Uuid::new_v4());
        db.save_user(NewUser {
            name: "Test User".to_string(),
            email: email.clone(),
            password: None,
            phone: None,
            picture: None,
            address: None,
            roles,
            is_verified: true,
            provider: AuthProviderKind::Credentials,
            provider_id: email,
        })
        .await
        .unwrap()
    }

    async fn receiver_role_count(db: &DBClient, user_id: Uuid) -> usize {
        let user = db.get_user(Some(user_id), None).await.unwrap().unwrap();
        user.roles
            .iter()
            .filter(|role| **role == UserRole::Receiver)
            .count()
    }

    fn status_patch(status: ParcelStatus) -> ParcelPatch {
        ParcelPatch {
            current_status: Some(status),
            ..Default::default()
        }
    }

    #[tokio::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn status_change_grants_receiver_role_once() {
        let db = db_client().await;
        let service = ParcelService::new(db.clone());
        let sender = create_user(&db, vec![UserRole::Sender]).await;
        let receiver = create_user(&db, vec![UserRole::Sender]).await;
        let admin = create_user(&db, vec![UserRole::Admin]).await;

        let parcel = service
            .create_parcel(&sender, receiver.id, 2.0, "1 Dock St".into(), "9 Hill Rd".into())
            .await
            .unwrap();
        assert_eq!(receiver_role_count(&db, receiver.id).await, 0);

        service
            .update_parcel(&admin, parcel.id, status_patch(ParcelStatus::Approved))
            .await
            .unwrap();
        assert_eq!(receiver_role_count(&db, receiver.id).await, 1);

        let updated = service
            .update_parcel(&admin, parcel.id, status_patch(ParcelStatus::Dispatched))
            .await
            .unwrap();
        assert_eq!(updated.status_logs.len(), 3);
        assert_eq!(receiver_role_count(&db, receiver.id).await, 1);
    }

    #[tokio::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn reassigned_receiver_gets_the_role() {
        let db = db_client().await;
        let service = ParcelService::new(db.clone());
        let sender = create_user(&db, vec![UserRole::Sender]).await;
        let receiver = create_user(&db, vec![UserRole::Sender]).await;
        let new_receiver = create_user(&db, vec![UserRole::Sender]).await;
        let admin = create_user(&db, vec![UserRole::Admin]).await;

        let parcel = service
            .create_parcel(&sender, receiver.id, 1.0, "1 Dock St".into(), "9 Hill Rd".into())
            .await
            .unwrap();

        let patch = ParcelPatch {
            receiver_id: Some(new_receiver.id),
            ..Default::default()
        };
        let updated = service.update_parcel(&admin, parcel.id, patch).await.unwrap();
        assert_eq!(updated.receiver_id, new_receiver.id);
        assert_eq!(receiver_role_count(&db, new_receiver.id).await, 1);
        assert_eq!(receiver_role_count(&db, receiver.id).await, 0);
    }

    #[tokio::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn stale_write_saves_nothing_and_grants_nothing() {
        let db = db_client().await;
        let service = ParcelService::new(db.clone());
        let sender = create_user(&db, vec![UserRole::Sender]).await;
        let receiver = create_user(&db, vec![UserRole::Sender]).await;

        let mut parcel = service
            .create_parcel(&sender, receiver.id, 1.0, "1 Dock St".into(), "9 Hill Rd".into())
            .await
            .unwrap();
        let stale = parcel.updated_at - chrono::Duration::seconds(1);
        parcel.current_status = ParcelStatus::Approved;

        let result = db.update_parcel(&parcel, stale, true).await.unwrap();
        assert!(result.is_none());

        let stored = service.load(parcel.id).await.unwrap();
        assert_eq!(stored.current_status, ParcelStatus::Requested);
        assert_eq!(receiver_role_count(&db, receiver.id).await, 0);
    }
}
