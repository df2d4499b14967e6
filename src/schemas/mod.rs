use std::collections::HashMap;

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::core::time::parse_flexible_utc;

pub(crate) mod activity;
pub(crate) mod auth;
pub(crate) mod contact;
pub(crate) mod course;
pub(crate) mod dashboard;
pub(crate) mod forum;
pub(crate) mod navigation;
pub(crate) mod recording;
pub(crate) mod user;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) api_prefix: String,
}

/// Public settings the web client reads on boot.
#[derive(Debug, Serialize)]
pub(crate) struct ClientConfigResponse {
    pub(crate) project_name: String,
    pub(crate) version: String,
    pub(crate) api_prefix: String,
    pub(crate) contact_email: String,
    pub(crate) whatsapp_number: String,
}

pub(crate) fn deserialize_datetime<'de, D>(deserializer: D) -> Result<PrimitiveDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flexible_utc(&raw).ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}

pub(crate) fn deserialize_option_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<PrimitiveDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_flexible_utc(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
            .map(Some),
        None => Ok(None),
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in PATCH bodies.
pub(crate) fn deserialize_nullable_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<Option<PrimitiveDateTime>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_option_datetime(deserializer).map(Some)
}

/// Trims surrounding whitespace so length rules see what will be stored.
pub(crate) fn deserialize_trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(trim_owned(raw))
}

pub(crate) fn deserialize_option_trimmed<'de, D>(
    deserializer: D,
) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(trim_owned))
}

fn trim_owned(raw: String) -> String {
    let trimmed = raw.trim();
    if trimmed.len() == raw.len() {
        raw
    } else {
        trimmed.to_string()
    }
}
