// db/parceldb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{userdb::grant_role_with, DBClient};

use crate::models::{
    parcelmodel::{Parcel, ParcelStatus, ParcelWithParty},
    usermodel::UserRole,
};

const PARCEL_COLUMNS: &str = r#"
    p.id, p.tracking_id, p.sender_id, p.receiver_id, p.weight, p.fee,
    p.pickup_address, p.delivery_address, p.current_status, p.status_logs,
    p.is_blocked, p.created_at, p.updated_at
"#;

#[async_trait]
pub trait ParcelExt {
    async fn save_parcel(&self, parcel: &Parcel) -> Result<Parcel, sqlx::Error>;

    async fn get_parcel(&self, parcel_id: Uuid) -> Result<Option<Parcel>, sqlx::Error>;

    async fn get_parcel_by_tracking_id(
        &self,
        tracking_id: &str,
    ) -> Result<Option<Parcel>, sqlx::Error>;

    async fn get_parcels(
        &self,
        status: Option<ParcelStatus>,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Parcel>, sqlx::Error>;

    async fn get_parcel_count(&self, status: Option<ParcelStatus>) -> Result<i64, sqlx::Error>;

    /// Parcels sent by the user, newest first, with the receiver's contact.
    async fn get_sent_parcels(&self, sender_id: Uuid) -> Result<Vec<ParcelWithParty>, sqlx::Error>;

    /// Parcels addressed to the user, newest first, with the sender's contact.
    async fn get_received_parcels(
        &self,
        receiver_id: Uuid,
    ) -> Result<Vec<ParcelWithParty>, sqlx::Error>;

    /// Writes the parcel back if nobody else touched it since `read_at`.
    /// Returns `None` when the row changed in between. With
    /// `grant_receiver_role` the parcel's receiver gets the receiver role in
    /// the same transaction.
    async fn update_parcel(
        &self,
        parcel: &Parcel,
        read_at: DateTime<Utc>,
        grant_receiver_role: bool,
    ) -> Result<Option<Parcel>, sqlx::Error>;
}

#[async_trait]
impl ParcelExt for DBClient {
    async fn save_parcel(&self, parcel: &Parcel) -> Result<Parcel, sqlx::Error> {
        sqlx::query_as::<_, Parcel>(&format!(
            r#"
            INSERT INTO parcels AS p (
                id, tracking_id, sender_id, receiver_id, weight, fee,
                pickup_address, delivery_address, current_status, status_logs,
                is_blocked, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {PARCEL_COLUMNS}
            "#
        ))
        .bind(parcel.id)
        .bind(&parcel.tracking_id)
        .bind(parcel.sender_id)
        .bind(parcel.receiver_id)
        .bind(parcel.weight)
        .bind(parcel.fee)
        .bind(&parcel.pickup_address)
        .bind(&parcel.delivery_address)
        .bind(parcel.current_status)
        .bind(&parcel.status_logs)
        .bind(parcel.is_blocked)
        .bind(parcel.created_at)
        .bind(parcel.updated_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_parcel(&self, parcel_id: Uuid) -> Result<Option<Parcel>, sqlx::Error> {
        sqlx::query_as::<_, Parcel>(&format!(
            "SELECT {PARCEL_COLUMNS} FROM parcels p WHERE p.id = $1"
        ))
        .bind(parcel_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_parcel_by_tracking_id(
        &self,
        tracking_id: &str,
    ) -> Result<Option<Parcel>, sqlx::Error> {
        sqlx::query_as::<_, Parcel>(&format!(
            "SELECT {PARCEL_COLUMNS} FROM parcels p WHERE p.tracking_id = $1"
        ))
        .bind(tracking_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_parcels(
        &self,
        status: Option<ParcelStatus>,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Parcel>, sqlx::Error> {
        let offset = (page.saturating_sub(1)) as i64 * limit as i64;

        sqlx::query_as::<_, Parcel>(&format!(
            r#"
            SELECT {PARCEL_COLUMNS}
            FROM parcels p
            WHERE ($1::parcel_status IS NULL OR p.current_status = $1)
            ORDER BY p.created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_parcel_count(&self, status: Option<ParcelStatus>) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM parcels
            WHERE ($1::parcel_status IS NULL OR current_status = $1)
            "#,
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn get_sent_parcels(&self, sender_id: Uuid) -> Result<Vec<ParcelWithParty>, sqlx::Error> {
        sqlx::query_as::<_, ParcelWithParty>(&format!(
            r#"
            SELECT {PARCEL_COLUMNS},
                u.name AS counterpart_name, u.email AS counterpart_email
            FROM parcels p
            JOIN users u ON u.id = p.receiver_id
            WHERE p.sender_id = $1
            ORDER BY p.created_at DESC
            "#
        ))
        .bind(sender_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_received_parcels(
        &self,
        receiver_id: Uuid,
    ) -> Result<Vec<ParcelWithParty>, sqlx::Error> {
        sqlx::query_as::<_, ParcelWithParty>(&format!(
            r#"
            SELECT {PARCEL_COLUMNS},
                u.name AS counterpart_name, u.email AS counterpart_email
            FROM parcels p
            JOIN users u ON u.id = p.sender_id
            WHERE p.receiver_id = $1
            ORDER BY p.created_at DESC
            "#
        ))
        .bind(receiver_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_parcel(
        &self,
        parcel: &Parcel,
        read_at: DateTime<Utc>,
        grant_receiver_role: bool,
    ) -> Result<Option<Parcel>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let saved = sqlx::query_as::<_, Parcel>(&format!(
            r#"
            UPDATE parcels AS p
            SET tracking_id = $2,
                sender_id = $3,
                receiver_id = $4,
                weight = $5,
                fee = $6,
                pickup_address = $7,
                delivery_address = $8,
                current_status = $9,
                status_logs = $10,
                is_blocked = $11,
                updated_at = NOW()
            WHERE p.id = $1 AND p.updated_at = $12
            RETURNING {PARCEL_COLUMNS}
            "#
        ))
        .bind(parcel.id)
        .bind(&parcel.tracking_id)
        .bind(parcel.sender_id)
        .bind(parcel.receiver_id)
        .bind(parcel.weight)
        .bind(parcel.fee)
        .bind(&parcel.pickup_address)
        .bind(&parcel.delivery_address)
        .bind(parcel.current_status)
        .bind(&parcel.status_logs)
        .bind(parcel.is_blocked)
        .bind(read_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(saved) = saved else {
            tx.rollback().await?;
            return Ok(None);
        };

        if grant_receiver_role {
            grant_role_with(&mut *tx, saved.receiver_id, UserRole::Receiver).await?;
        }

        tx.commit().await?;

        Ok(Some(saved))
    }
}
