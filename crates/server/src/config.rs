//! Process configuration: listen address plus engine settings
//!
//! Engine settings start from their defaults, are replaced by the TOML file
//! named in `TOPOLOGY_CONFIG` when set, and finally take individual
//! `TOPOLOGY_*` overrides from the environment.

use std::{path::Path, str::FromStr};

use anyhow::{Context, Result, anyhow};
use topology_engine::{EngineConfig, ImpactLinkMode};

pub const CONFIG_PATH_VAR: &str = "TOPOLOGY_CONFIG";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    /// 0 lets the OS pick a free port
    pub port: u16,
    pub engine: EngineConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match lookup("BACKEND_PORT").or_else(|| lookup("PORT")) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("invalid port {raw:?}"))?,
            None => {
                tracing::info!("No PORT environment variable set, using port 0 for auto-assignment");
                0
            }
        };

        let mut engine = match lookup(CONFIG_PATH_VAR) {
            Some(path) => load_engine_config(Path::new(&path))?,
            None => EngineConfig::default(),
        };
        apply_overrides(&mut engine, &lookup)?;
        engine
            .validate()
            .map_err(|e| anyhow!("invalid engine configuration: {e}"))?;

        Ok(Self { host, port, engine })
    }
}

pub fn load_engine_config(path: &Path) -> Result<EngineConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_engine_config(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_engine_config(raw: &str) -> Result<EngineConfig> {
    Ok(toml::from_str(raw)?)
}

fn apply_overrides(engine: &mut EngineConfig, lookup: &impl Fn(&str) -> Option<String>) -> Result<()> {
    fn set<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T) -> Result<()>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        if let Some(raw) = lookup(key) {
            *target = raw
                .trim()
                .parse()
                .map_err(|e| anyhow!("invalid value {raw:?} for {key}: {e}"))?;
        }
        Ok(())
    }

    set(lookup, "TOPOLOGY_DEFAULT_PAGE_SIZE", &mut engine.store.default_page_size)?;
    set(lookup, "TOPOLOGY_MAX_PAGE_SIZE", &mut engine.store.max_page_size)?;
    set(lookup, "TOPOLOGY_ALLOW_PARALLEL_LINKS", &mut engine.store.allow_parallel_links)?;
    set(lookup, "TOPOLOGY_SNAPSHOT_BEFORE_RESTORE", &mut engine.store.snapshot_before_restore)?;
    set(lookup, "TOPOLOGY_LAYOUT_MAX_ITERATIONS", &mut engine.layout.max_iterations)?;
    set(lookup, "TOPOLOGY_LAYOUT_SEED", &mut engine.layout.seed)?;
    set(lookup, "TOPOLOGY_LAYOUT_TIME_BUDGET_MS", &mut engine.layout.time_budget_ms)?;
    set(lookup, "TOPOLOGY_MAX_PATHS", &mut engine.paths.max_paths)?;
    set(lookup, "TOPOLOGY_MAX_PATH_DEPTH", &mut engine.paths.max_depth)?;
    set(lookup, "TOPOLOGY_TRAVERSE_UNKNOWN_LINKS", &mut engine.paths.traverse_unknown_links)?;
    set(lookup, "TOPOLOGY_IMPACT_HIGH_THRESHOLD", &mut engine.impact.high_threshold)?;
    set(lookup, "TOPOLOGY_IMPACT_RESPECT_LINK_STATUS", &mut engine.impact.respect_link_status)?;

    if let Some(raw) = lookup("TOPOLOGY_IMPACT_LINK_MODE") {
        engine.impact.link_mode = serde_json::from_value::<ImpactLinkMode>(serde_json::Value::String(
            raw.trim().to_lowercase(),
        ))
        .map_err(|_| anyhow!("invalid value {raw:?} for TOPOLOGY_IMPACT_LINK_MODE"))?;
    }
    Ok(())
}
