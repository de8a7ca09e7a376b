//! Mixdown domain logic.
//!
//! Dependency-light crate shared by the database, storage, and API layers:
//! common type aliases, the domain error enum, audio content-type policy,
//! upload key/descriptor logic, and the player state controller.

pub mod audio;
pub mod error;
pub mod player;
pub mod types;
pub mod upload;
