// service/user_service.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{
        userdb::{NewUser, UserPatch},
        DBClient, UserExt,
    },
    dtos::userdtos::{RegisterUserDto, UpdateUserDto},
    error::ErrorMessage,
    models::usermodel::{AuthProvider, AuthProviderKind, User, UserRole},
    service::{error::ServiceError, google_oauth::GoogleUserInfo},
    utils::password,
};

const GOOGLE_ONLY_ACCOUNT: &str = "You Have Authenticated Through Google Login, if you want to login with credentials then try login with google and set a password";

#[derive(Debug, Clone)]
pub struct UserService {
    db_client: Arc<DBClient>,
}

impl UserService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub async fn register(&self, body: RegisterUserDto) -> Result<User, ServiceError> {
        let email = body.email.trim().to_lowercase();

        if self.db_client.get_user(None, Some(&email)).await?.is_some() {
            return Err(ServiceError::bad_request(ErrorMessage::EmailExist.to_string()));
        }

        let hashed_password = password::hash(&body.password)?;

        let user = self
            .db_client
            .save_user(NewUser {
                name: body.name,
                email: email.clone(),
                password: Some(hashed_password),
                phone: body.phone,
                picture: None,
                address: body.address,
                roles: vec![UserRole::Sender, UserRole::Receiver],
                is_verified: false,
                provider: AuthProviderKind::Credentials,
                provider_id: email,
            })
            .await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Checks an email/password pair and returns the account it belongs to.
    pub async fn login(&self, email: &str, candidate: &str) -> Result<User, ServiceError> {
        let email = email.trim().to_lowercase();
        let user = self
            .db_client
            .get_user(None, Some(&email))
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("User Doesn't Exist".to_string()))?;

        let Some(hash) = user.password.as_deref() else {
            return Err(ServiceError::Unauthorized(GOOGLE_ONLY_ACCOUNT.to_string()));
        };

        if !password::compare(candidate, hash)? {
            return Err(ServiceError::Unauthorized(
                "Password Doesn't Match".to_string(),
            ));
        }

        if let Some(reason) = user.blocked_reason() {
            return Err(ServiceError::bad_request(reason));
        }

        Ok(user)
    }

    /// Looks up the owner of a refresh token; they must still be allowed in.
    pub async fn user_for_refresh(&self, user_id: Uuid) -> Result<User, ServiceError> {
        let user = self
            .db_client
            .get_user(Some(user_id), None)
            .await?
            .ok_or_else(|| ServiceError::bad_request("User Doesn't Exist"))?;

        if let Some(reason) = user.blocked_reason() {
            return Err(ServiceError::bad_request(reason));
        }

        Ok(user)
    }

    pub async fn reset_password(
        &self,
        user: &User,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        let Some(hash) = user.password.as_deref() else {
            return Err(ServiceError::Unauthorized(GOOGLE_ONLY_ACCOUNT.to_string()));
        };

        if !password::compare(old_password, hash)? {
            return Err(ServiceError::Unauthorized(
                "Old Password does not match".to_string(),
            ));
        }

        let hashed_password = password::hash(new_password)?;
        self.db_client
            .update_user_password(user.id, hashed_password)
            .await?;
        self.db_client
            .add_auth_provider(user.id, AuthProviderKind::Credentials, &user.email)
            .await?;

        tracing::info!(user_id = %user.id, "password changed");
        Ok(())
    }

    /// Finds or creates the account for a Google identity.
    pub async fn login_with_google(&self, info: GoogleUserInfo) -> Result<User, ServiceError> {
        let email = info.verified_email().ok_or_else(|| {
            ServiceError::Unauthorized("Google account email is not verified".to_string())
        })?;

        if let Some(user) = self.db_client.get_user(None, Some(&email)).await? {
            if let Some(reason) = user.blocked_reason() {
                return Err(ServiceError::forbidden(reason));
            }
            self.db_client
                .add_auth_provider(user.id, AuthProviderKind::Google, &info.sub)
                .await?;
            return Ok(user);
        }

        let user = self
            .db_client
            .save_user(NewUser {
                name: info.display_name(),
                email,
                password: None,
                phone: None,
                picture: info.picture,
                address: None,
                roles: vec![UserRole::Sender],
                is_verified: true,
                provider: AuthProviderKind::Google,
                provider_id: info.sub,
            })
            .await?;

        tracing::info!(user_id = %user.id, "user created from Google sign-in");
        Ok(user)
    }

    pub async fn get_auth_providers(&self, user_id: Uuid) -> Result<Vec<AuthProvider>, ServiceError> {
        Ok(self.db_client.get_auth_providers(user_id).await?)
    }

    pub async fn get_users(&self, page: u32, limit: usize) -> Result<(Vec<User>, i64), ServiceError> {
        let users = self.db_client.get_users(page, limit).await?;
        let total = self.db_client.get_user_count().await?;
        Ok((users, total))
    }

    pub async fn update_user(
        &self,
        actor: &User,
        user_id: Uuid,
        body: UpdateUserDto,
    ) -> Result<User, ServiceError> {
        authorize_update(actor, user_id, &body)?;

        if self.db_client.get_user(Some(user_id), None).await?.is_none() {
            return Err(ServiceError::UserNotFound(user_id));
        }

        let password = match body.password {
            Some(plain) => Some(password::hash(plain)?),
            None => None,
        };

        let user = self
            .db_client
            .update_user(
                user_id,
                UserPatch {
                    name: body.name,
                    phone: body.phone,
                    picture: body.picture,
                    address: body.address,
                    password,
                    roles: body.roles,
                    is_active: body.is_active,
                    is_verified: body.is_verified,
                    is_deleted: body.is_deleted,
                },
            )
            .await?;

        tracing::info!(user_id = %user.id, updated_by = %actor.id, "user updated");
        Ok(user)
    }
}

/// Field-level rules for `PATCH /user/:id`.
pub fn authorize_update(actor: &User, user_id: Uuid, body: &UpdateUserDto) -> Result<(), ServiceError> {
    let is_admin = actor.is_admin();

    if !is_admin && actor.id != user_id {
        return Err(ServiceError::forbidden(
            "You are not authorized to update this user",
        ));
    }

    if let Some(roles) = &body.roles {
        if !is_admin {
            return Err(ServiceError::forbidden(
                "You are not authorized to change roles",
            ));
        }
        if roles.contains(&UserRole::SuperAdmin) && !actor.has_role(UserRole::SuperAdmin) {
            return Err(ServiceError::forbidden(
                "Only Super Admin can assign SUPER_ADMIN role",
            ));
        }
    }

    if body.touches_account_flags() && !is_admin {
        return Err(ServiceError::forbidden(
            "You are not authorized to update these fields",
        ));
    }

    if body.is_empty() {
        return Err(ServiceError::bad_request("Nothing to update"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::usermodel::IsActive;
    use axum::http::StatusCode;
    use chrono::Utc;

    fn user(roles: Vec<UserRole>) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ola".to_string(),
            email: "ola@example.com".to_string(),
            password: None,
            phone: None,
            picture: None,
            address: None,
            roles,
            is_active: IsActive::Active,
            is_verified: true,
            is_deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn status_of(result: Result<(), ServiceError>) -> Option<StatusCode> {
        result.err().map(|e| e.status_code())
    }

    #[test]
    fn users_edit_their_own_profile() {
        let me = user(vec![UserRole::Sender, UserRole::Receiver]);
        let body = UpdateUserDto {
            name: Some("Ola B".into()),
            ..Default::default()
        };
        assert!(authorize_update(&me, me.id, &body).is_ok());
        assert_eq!(
            status_of(authorize_update(&me, Uuid::new_v4(), &body)),
            Some(StatusCode::FORBIDDEN)
        );
    }

    #[test]
    fn roles_and_flags_need_an_admin() {
        let me = user(vec![UserRole::Sender]);
        let roles = UpdateUserDto {
            roles: Some(vec![UserRole::Admin]),
            ..Default::default()
        };
        let err = authorize_update(&me, me.id, &roles).unwrap_err();
        assert_eq!(err.to_string(), "You are not authorized to change roles");

        let flags = UpdateUserDto {
            is_verified: Some(true),
            ..Default::default()
        };
        assert_eq!(
            status_of(authorize_update(&me, me.id, &flags)),
            Some(StatusCode::FORBIDDEN)
        );

        let admin = user(vec![UserRole::Admin]);
        assert!(authorize_update(&admin, me.id, &roles).is_ok());
        assert!(authorize_update(&admin, me.id, &flags).is_ok());
    }

    #[test]
    fn only_super_admins_grant_super_admin() {
        let target = Uuid::new_v4();
        let body = UpdateUserDto {
            roles: Some(vec![UserRole::SuperAdmin]),
            ..Default::default()
        };

        let admin = user(vec![UserRole::Admin]);
        let err = authorize_update(&admin, target, &body).unwrap_err();
        assert_eq!(err.to_string(), "Only Super Admin can assign SUPER_ADMIN role");

        let root = user(vec![UserRole::SuperAdmin]);
        assert!(authorize_update(&root, target, &body).is_ok());
    }

    #[test]
    fn empty_update_is_a_bad_request() {
        let me = user(vec![UserRole::Sender]);
        assert_eq!(
            status_of(authorize_update(&me, me.id, &UpdateUserDto::default())),
            Some(StatusCode::BAD_REQUEST)
        );
    }
}
