// db/userdb.rs
use async_trait::async_trait;
use sqlx::PgExecutor;
use uuid::Uuid;

use super::DBClient;

use crate::models::usermodel::{AuthProvider, AuthProviderKind, IsActive, User, UserRole};

const USER_COLUMNS: &str = r#"
    id, name, email, password, phone, picture, address,
    roles, is_active, is_verified, is_deleted,
    created_at, updated_at
"#;

/// Everything needed to insert a user together with its first auth provider.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub picture: Option<String>,
    pub address: Option<String>,
    pub roles: Vec<UserRole>,
    pub is_verified: bool,
    pub provider: AuthProviderKind,
    pub provider_id: String,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub picture: Option<String>,
    pub address: Option<String>,
    pub password: Option<String>,
    pub roles: Option<Vec<UserRole>>,
    pub is_active: Option<IsActive>,
    pub is_verified: Option<bool>,
    pub is_deleted: Option<bool>,
}

#[async_trait]
pub trait UserExt {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    async fn get_users(
        &self,
        page: u32,
        limit: usize,
    ) -> Result<Vec<User>, sqlx::Error>;

    async fn get_user_count(&self) -> Result<i64, sqlx::Error>;

    async fn save_user(&self, new_user: NewUser) -> Result<User, sqlx::Error>;

    async fn get_auth_providers(&self, user_id: Uuid) -> Result<Vec<AuthProvider>, sqlx::Error>;

    async fn add_auth_provider(
        &self,
        user_id: Uuid,
        provider: AuthProviderKind,
        provider_id: &str,
    ) -> Result<(), sqlx::Error>;

    async fn update_user(&self, user_id: Uuid, patch: UserPatch) -> Result<User, sqlx::Error>;

    async fn update_user_password(
        &self,
        user_id: Uuid,
        password: String,
    ) -> Result<User, sqlx::Error>;
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
            ))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(email) = email {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
            ))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        }

        Ok(user)
    }

    async fn get_users(
        &self,
        page: u32,
        limit: usize,
    ) -> Result<Vec<User>, sqlx::Error> {
        let offset = (page.saturating_sub(1)) as i64 * limit as i64;

        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_user_count(&self) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM users"#)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn save_user(&self, new_user: NewUser) -> Result<User, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password, phone, picture, address, roles, is_verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new_user.name)
        .bind(new_user.email)
        .bind(new_user.password)
        .bind(new_user.phone)
        .bind(new_user.picture)
        .bind(new_user.address)
        .bind(new_user.roles)
        .bind(new_user.is_verified)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO auth_providers (user_id, provider, provider_id)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user.id)
        .bind(new_user.provider)
        .bind(new_user.provider_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(user)
    }

    async fn get_auth_providers(&self, user_id: Uuid) -> Result<Vec<AuthProvider>, sqlx::Error> {
        sqlx::query_as::<_, AuthProvider>(
            r#"
            SELECT provider, provider_id
            FROM auth_providers
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn add_auth_provider(
        &self,
        user_id: Uuid,
        provider: AuthProviderKind,
        provider_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO auth_providers (user_id, provider, provider_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, provider) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(provider)
        .bind(provider_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_user(&self, user_id: Uuid, patch: UserPatch) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                picture = COALESCE($4, picture),
                address = COALESCE($5, address),
                password = COALESCE($6, password),
                roles = COALESCE($7, roles),
                is_active = COALESCE($8, is_active),
                is_verified = COALESCE($9, is_verified),
                is_deleted = COALESCE($10, is_deleted),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(patch.name)
        .bind(patch.phone)
        .bind(patch.picture)
        .bind(patch.address)
        .bind(patch.password)
        .bind(patch.roles)
        .bind(patch.is_active)
        .bind(patch.is_verified)
        .bind(patch.is_deleted)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_user_password(
        &self,
        user_id: Uuid,
        password: String,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET password = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(password)
        .fetch_one(&self.pool)
        .await
    }
}

/// Appends `role` unless the user already holds it. Runs on a pool or
/// inside a caller's transaction.
pub(crate) async fn grant_role_with<'e, E>(
    executor: E,
    user_id: Uuid,
    role: UserRole,
) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        UPDATE users
        SET roles = array_append(roles, $2), updated_at = NOW()
        WHERE id = $1 AND NOT ($2 = ANY(roles))
        "#,
    )
    .bind(user_id)
    .bind(role)
    .execute(executor)
    .await?;

    Ok(())
}
