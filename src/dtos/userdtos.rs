use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::usermodel::{AuthProvider, IsActive, User, UserRole};

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserDto {
    #[validate(
        length(min = 2, message = "Name must be at least 2 characters long."),
        length(max = 50, message = "Name cannot exceed 50 characters.")
    )]
    pub name: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(
        length(min = 1, message = "Password is required"),
        length(min = 8, message = "Password must be at least 8 characters long."),
        length(max = 64, message = "Password cannot exceed 64 characters.")
    )]
    pub password: String,

    #[validate(length(min = 7, max = 20, message = "Phone number is invalid"))]
    pub phone: Option<String>,

    #[validate(length(max = 200, message = "Address cannot exceed 200 characters."))]
    pub address: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(length(min = 1, message = "Email is required"), email(message = "Email is invalid"))]
    pub email: String,
    #[validate(
        length(min = 1, message = "Password is required"),
        length(max = 64, message = "Password cannot exceed 64 characters.")
    )]
    pub password: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordDto {
    #[validate(
        length(min = 1, message = "Old password is required."),
        length(max = 64, message = "Old password cannot exceed 64 characters.")
    )]
    pub old_password: String,

    #[validate(
        length(min = 1, message = "New password is required."),
        length(min = 8, message = "New password must be at least 8 characters long."),
        length(max = 64, message = "New password cannot exceed 64 characters.")
    )]
    pub new_password: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserDto {
    #[validate(
        length(min = 2, message = "Name must be at least 2 characters long."),
        length(max = 50, message = "Name cannot exceed 50 characters.")
    )]
    pub name: Option<String>,

    #[validate(
        length(min = 8, message = "Password must be at least 8 characters long."),
        length(max = 64, message = "Password cannot exceed 64 characters.")
    )]
    pub password: Option<String>,

    #[validate(length(min = 7, max = 20, message = "Phone number is invalid"))]
    pub phone: Option<String>,

    pub picture: Option<String>,

    #[validate(length(max = 200, message = "Address cannot exceed 200 characters."))]
    pub address: Option<String>,

    #[validate(length(min = 1, message = "A user needs at least one role"))]
    pub roles: Option<Vec<UserRole>>,

    pub is_active: Option<IsActive>,
    pub is_deleted: Option<bool>,
    pub is_verified: Option<bool>,
}

impl UpdateUserDto {
    pub fn touches_account_flags(&self) -> bool {
        self.is_active.is_some() || self.is_deleted.is_some() || self.is_verified.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.password.is_none()
            && self.phone.is_none()
            && self.picture.is_none()
            && self.address.is_none()
            && self.roles.is_none()
            && !self.touches_account_flags()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub picture: Option<String>,
    pub address: Option<String>,
    pub roles: Vec<UserRole>,
    #[serde(rename = "isActive")]
    pub is_active: IsActive,
    #[serde(rename = "isVerified")]
    pub is_verified: bool,
    #[serde(rename = "isDeleted")]
    pub is_deleted: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub auths: Vec<AuthProvider>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            name: user.name.to_owned(),
            email: user.email.to_owned(),
            phone: user.phone.clone(),
            picture: user.picture.clone(),
            address: user.address.clone(),
            roles: user.roles.clone(),
            is_active: user.is_active,
            is_verified: user.is_verified,
            is_deleted: user.is_deleted,
            auths: Vec::new(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }

    pub fn with_auths(mut self, auths: Vec<AuthProvider>) -> Self {
        self.auths = auths;
        self
    }

    pub fn filter_users(user: &[User]) -> Vec<FilterUserDto> {
        user.iter().map(FilterUserDto::filter_user).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserData {
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginData {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessTokenData {
    #[serde(rename = "accessToken")]
    pub access_token: String,
}
