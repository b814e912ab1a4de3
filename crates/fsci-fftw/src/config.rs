//! Process-wide planner settings.

use std::path::Path;
use std::sync::{OnceLock, RwLock};

use serde::{Deserialize, Serialize};

use crate::engine::EngineKind;
use crate::error::ConfigError;

/// Operational mode for plan execution.
///
/// - **Strict**: run whatever the caller hands over, like the raw engine.
/// - **Hardened**: reject non-finite input before it reaches the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RuntimeMode {
    #[default]
    Strict,
    Hardened,
}

impl RuntimeMode {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Hardened => "hardened",
        }
    }
}

pub const DEFAULT_TRACE_CAPACITY: usize = 4096;

/// Settings every plan snapshots at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub mode: RuntimeMode,
    pub engine: EngineKind,
    /// Upper bound on time spent measuring candidates for one plan.
    /// `None` lets the planner finish every candidate its rigor asks for.
    pub time_limit_ms: Option<u64>,
    /// Trace records kept before the oldest are discarded.
    pub trace_capacity: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            mode: RuntimeMode::Strict,
            engine: EngineKind::Reference,
            time_limit_ms: None,
            trace_capacity: DEFAULT_TRACE_CAPACITY,
        }
    }
}

impl PlannerConfig {
    #[must_use]
    pub fn with_mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_engine(mut self, engine: EngineKind) -> Self {
        self.engine = engine;
        self
    }

    #[must_use]
    pub fn with_time_limit_ms(mut self, limit: Option<u64>) -> Self {
        self.time_limit_ms = limit;
        self
    }

    #[must_use]
    pub fn with_trace_capacity(mut self, capacity: usize) -> Self {
        self.trace_capacity = capacity;
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|source| ConfigError::Parse { source })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

static PLANNER_CONFIG: OnceLock<RwLock<PlannerConfig>> = OnceLock::new();

fn config_cell() -> &'static RwLock<PlannerConfig> {
    PLANNER_CONFIG.get_or_init(|| RwLock::new(PlannerConfig::default()))
}

/// Replace the process-wide planner settings. Existing plans keep theirs.
pub fn set_planner_config(config: PlannerConfig) {
    tracing::debug!(?config, "planner config replaced");
    match config_cell().write() {
        Ok(mut guard) => *guard = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

#[must_use]
pub fn planner_config() -> PlannerConfig {
    match config_cell().read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}
