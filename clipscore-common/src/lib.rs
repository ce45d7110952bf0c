//! # ClipScore Common Library
//!
//! Shared code for ClipScore services:
//! - Error type
//! - Bootstrap configuration loading and root folder resolution
//! - Database initialization, schema and policy settings
//! - Content hashing for duplicate detection
//! - Timestamp and UUID helpers

pub mod config;
pub mod content_hash;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
