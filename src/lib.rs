//! Pick-three-against-the-spread competition core.
//!
//! Players pick three games a week against frozen spreads inside a fixed
//! weekly window; finished games grade against the spread each pick was
//! stamped with, standings aggregate graded picks, and users who sit out a
//! finished week are backfilled with a synthetic 0-for-3 set.

pub mod clock;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod feed;
pub mod models;
pub mod notify;
pub mod service;
pub mod store;

pub use clock::*;
pub use config::*;
pub use data::*;
pub use engine::*;
pub use error::*;
pub use feed::*;
pub use models::*;
pub use notify::*;
pub use service::*;
pub use store::*;

use tracing::info;

/// Shared binary startup: read the environment, build the service, and
/// load the saved season state if there is one.
pub fn bootstrap() -> anyhow::Result<(config::AppConfig, service::PickemService)> {
    dotenv::dotenv().ok();
    let config = config::AppConfig::from_env()?;
    let service = service::PickemService::from_config(&config)?;
    if data::load_state(&service, &config.state_file)? {
        info!("season state loaded from {}", config.state_file.display());
    } else {
        info!("no saved state at {}, starting fresh", config.state_file.display());
    }
    Ok((config, service))
}
