use chrono::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Sender,
    Receiver,
    Admin,
    SuperAdmin,
}

impl UserRole {
    pub fn is_privileged(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::SuperAdmin)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "is_active")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IsActive {
    #[sqlx(rename = "ACTIVE")]
    Active,
    #[sqlx(rename = "INACTIVE")]
    Inactive,
    #[sqlx(rename = "BLOCKED")]
    Blocked,
}

impl IsActive {
    pub fn to_str(&self) -> &str {
        match self {
            IsActive::Active => "ACTIVE",
            IsActive::Inactive => "INACTIVE",
            IsActive::Blocked => "BLOCKED",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "auth_provider_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuthProviderKind {
    Credentials,
    Google,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct AuthProvider {
    pub provider: AuthProviderKind,
    #[serde(rename = "providerId")]
    pub provider_id: String,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: uuid::Uuid,
    pub name: String,
    pub email: String,

    #[serde(skip_serializing)]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    pub roles: Vec<UserRole>,

    #[serde(rename = "isActive")]
    pub is_active: IsActive,
    #[serde(rename = "isVerified")]
    pub is_verified: bool,
    #[serde(rename = "isDeleted")]
    pub is_deleted: bool,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(UserRole::is_privileged)
    }

    /// Returns the reason a user may not act, if any.
    pub fn blocked_reason(&self) -> Option<String> {
        if self.is_deleted {
            return Some("User is Deleted".to_string());
        }
        match self.is_active {
            IsActive::Active => None,
            other => Some(format!("User is {}", other.to_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(roles: Vec<UserRole>) -> User {
        User {
            id: uuid::Uuid::new_v4(),
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
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

    #[test]
    fn admin_roles_are_privileged() {
        assert!(user(vec![UserRole::Admin]).is_admin());
        assert!(user(vec![UserRole::Sender, UserRole::SuperAdmin]).is_admin());
        assert!(!user(vec![UserRole::Sender, UserRole::Receiver]).is_admin());
    }

    #[test]
    fn blocked_and_deleted_users_have_a_reason() {
        let mut u = user(vec![UserRole::Sender]);
        assert_eq!(u.blocked_reason(), None);

        u.is_active = IsActive::Blocked;
        assert_eq!(u.blocked_reason().as_deref(), Some("User is BLOCKED"));

        u.is_active = IsActive::Active;
        u.is_deleted = true;
        assert_eq!(u.blocked_reason().as_deref(), Some("User is Deleted"));
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let mut u = user(vec![UserRole::Sender]);
        u.password = Some("$argon2id$hash".to_string());
        let json = serde_json::to_value(&u).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["roles"][0], "SENDER");
        assert_eq!(json["isActive"], "ACTIVE");
    }
}
