use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::User;
use crate::db::types::{SubscriptionStatus, UserRole};
use crate::schemas::{deserialize_nullable_datetime, deserialize_option_trimmed};

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) avatar_url: Option<String>,
    pub(crate) subscription_status: SubscriptionStatus,
    pub(crate) subscription_expires_at: Option<String>,
    pub(crate) created_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            is_active: user.is_active,
            avatar_url: user.avatar_url,
            subscription_status: user.subscription_status,
            subscription_expires_at: user.subscription_expires_at.map(format_primitive),
            created_at: format_primitive(user.created_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ProfileUpdate {
    #[serde(default, alias = "fullName", deserialize_with = "deserialize_option_trimmed")]
    #[validate(length(min = 2, message = "El nombre debe tener al menos 2 caracteres"))]
    pub(crate) full_name: Option<String>,
    #[serde(default, alias = "avatarUrl")]
    #[validate(url(message = "La URL del avatar no es válida"))]
    pub(crate) avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdminUserUpdate {
    #[serde(default)]
    pub(crate) role: Option<UserRole>,
    #[serde(default, alias = "isActive")]
    pub(crate) is_active: Option<bool>,
    #[serde(default, alias = "subscriptionStatus")]
    pub(crate) subscription_status: Option<SubscriptionStatus>,
    #[serde(
        default,
        alias = "subscriptionExpiresAt",
        deserialize_with = "deserialize_nullable_datetime"
    )]
    pub(crate) subscription_expires_at: Option<Option<time::PrimitiveDateTime>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserListQuery {
    #[serde(default)]
    pub(crate) role: Option<UserRole>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubscriptionResponse {
    pub(crate) status: SubscriptionStatus,
    pub(crate) expires_at: Option<String>,
    pub(crate) active: bool,
}

