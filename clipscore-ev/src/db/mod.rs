//! Persistence for clipscore-ev
//!
//! Single-statement functions take any `SqliteExecutor` so they run against
//! the pool or inside a transaction. Functions issuing several statements
//! take `&mut SqliteConnection`.

pub mod evaluations;
pub mod ledger;
pub mod missions;
pub mod payments;
pub mod sessions;
pub mod users;
pub mod videos;
