//! In-process structured log of planning, execution and wisdom events.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};

use crate::config::planner_config;
use crate::engine::{Algorithm, TransformKind};
use crate::options::Flag;
use crate::scalar::Precision;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanEvent {
    Build,
    Null,
    Execute,
    Release,
    WisdomImport,
    WisdomExport,
    WisdomForget,
    WisdomGenerate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTrace {
    pub operation_id: String,
    pub event: PlanEvent,
    pub precision: Option<Precision>,
    pub transform: Option<TransformKind>,
    pub shape: Vec<usize>,
    pub how_many: usize,
    pub flag: Flag,
    pub wisdom_hit: bool,
    pub recipe: Vec<Algorithm>,
    pub timing_ns: u64,
}

impl PlanTrace {
    /// Empty record for `event` with a fresh operation id.
    #[must_use]
    pub fn new(event: PlanEvent) -> Self {
        Self {
            operation_id: next_operation_id(),
            event,
            precision: None,
            transform: None,
            shape: Vec::new(),
            how_many: 0,
            flag: Flag::MEASURE,
            wisdom_hit: false,
            recipe: Vec::new(),
            timing_ns: 0,
        }
    }

    #[must_use]
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

static TRACE_LOG: OnceLock<Mutex<VecDeque<PlanTrace>>> = OnceLock::new();
static OPERATION_COUNTER: AtomicU64 = AtomicU64::new(1);

fn trace_log() -> &'static Mutex<VecDeque<PlanTrace>> {
    TRACE_LOG.get_or_init(|| Mutex::new(VecDeque::new()))
}

fn next_operation_id() -> String {
    let next = OPERATION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("fftw-op-{next:016x}")
}

pub(crate) fn record_trace(trace: PlanTrace) {
    tracing::debug!(
        operation_id = %trace.operation_id,
        event = ?trace.event,
        shape = ?trace.shape,
        flag = %trace.flag,
        wisdom_hit = trace.wisdom_hit,
        timing_ns = trace.timing_ns,
        "fsci-fftw trace"
    );
    let capacity = planner_config().trace_capacity;
    if capacity == 0 {
        return;
    }
    if let Ok(mut log) = trace_log().lock() {
        while log.len() >= capacity {
            log.pop_front();
        }
        log.push_back(trace);
    }
}

/// Drain every record logged so far.
#[must_use]
pub fn take_plan_traces() -> Vec<PlanTrace> {
    if let Ok(mut log) = trace_log().lock() {
        return log.drain(..).collect();
    }
    Vec::new()
}
