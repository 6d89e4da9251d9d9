//! snapsync backs up sandbox projects to GitHub, one commit per snapshot,
//! and restores any recorded snapshot into a fresh sandbox.

pub mod app;
pub mod config;
pub mod error;
pub mod gateway;
pub mod github;
pub mod observability;
pub mod restore;
pub mod sandbox;
pub mod store;
pub mod sync;
pub mod workflow;

pub use app::App;
pub use config::Config;
