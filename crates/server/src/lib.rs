pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

use topology_engine::{EngineConfig, TopologyError, TopologyService};

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub service: TopologyService,
}

impl AppState {
    pub fn new(engine: EngineConfig) -> Result<Self, TopologyError> {
        Ok(Self {
            service: TopologyService::new(engine)?,
        })
    }
}
