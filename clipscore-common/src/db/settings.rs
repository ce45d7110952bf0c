//! Settings table access
//!
//! Policy values are required configuration: a missing, NULL or
//! unparseable key is a [`Error::Config`], never a silent default.

use std::str::FromStr;

use sqlx::SqlitePool;

use crate::{Error, Result};

/// Read a raw setting value
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.flatten())
}

/// Insert or replace a setting value
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove a setting
pub async fn delete_setting(pool: &SqlitePool, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM settings WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;

    Ok(())
}

/// Read and parse a required setting
pub async fn require_setting<T>(pool: &SqlitePool, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_setting(pool, key)
        .await?
        .ok_or_else(|| Error::Config(format!("Required setting '{}' is not configured", key)))?;

    raw.trim().parse::<T>().map_err(|e| {
        Error::Config(format!("Setting '{}' has invalid value '{}': {}", key, raw, e))
    })
}
