//! Utility modules for clipscore-ev

pub mod db_retry;

pub use db_retry::retry_on_lock;
