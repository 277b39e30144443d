//! Tenant integrity and account retention service.
//!
//! Keeps multi-tenant referential integrity correct when duplicate tenant
//! records are merged, and manages the timed lifecycle of deleted user
//! accounts, over a relational store that offers no cross-table
//! transactions.

pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod merge;
pub mod models;
pub mod retention;
pub mod routes;
pub mod store;
pub mod validate;

pub use config::Config;
pub use error::{AppError, Result};

use std::sync::Arc;

use identity::IdentityProvider;
use retention::SweepScheduler;
use store::RowStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RowStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub sweeper: Arc<SweepScheduler>,
    pub config: Config,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RowStore>,
        identity: Arc<dyn IdentityProvider>,
        sweeper: Arc<SweepScheduler>,
        config: Config,
    ) -> Self {
        Self {
            store,
            identity,
            sweeper,
            config,
        }
    }
}
