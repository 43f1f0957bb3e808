use crate::{
    config::Config,
    db::{userdb::NewUser, DBClient, UserExt},
    models::usermodel::{AuthProviderKind, UserRole},
    service::error::ServiceError,
    utils::password,
};

/// Creates the configured super admin unless that email is already taken.
/// Returns whether an account was created.
pub async fn seed_super_admin(db_client: &DBClient, config: &Config) -> Result<bool, ServiceError> {
    let email = config.super_admin_email.trim().to_lowercase();

    if db_client.get_user(None, Some(&email)).await?.is_some() {
        tracing::info!("super admin already exists");
        return Ok(false);
    }

    let hashed_password = password::hash(&config.super_admin_password)?;

    let user = db_client
        .save_user(NewUser {
            name: "Super admin".to_string(),
            email: email.clone(),
            password: Some(hashed_password),
            phone: None,
            picture: None,
            address: None,
            roles: vec![UserRole::SuperAdmin],
            is_verified: true,
            provider: AuthProviderKind::Credentials,
            provider_id: email,
        })
        .await?;

    tracing::info!(user_id = %user.id, "super admin created");
    Ok(true)
}
