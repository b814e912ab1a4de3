#![forbid(unsafe_code)]

//! Typed plans over an FFTW-style transform engine.
//!
//! Callers describe arrays with a [`Layout`], bind caller-owned buffers to it
//! with a [`View`], and build a [`Plan`] from an input and an output view. The
//! element types of the two views fix the precision (`f32`/`f64`) and the
//! transform family (C2C, R2C, C2R, R2R) at compile time.
//!
//! ```
//! use fsci_fftw::{Complex64, Flag, Plan, View};
//!
//! let mut signal = vec![1.0f64; 8];
//! let mut spectrum = vec![Complex64::default(); 5];
//! let mut plan = Plan::new(
//!     View::from_slice(&mut signal),
//!     View::from_slice(&mut spectrum),
//!     Flag::ESTIMATE,
//!     (),
//! );
//! plan.execute().expect("estimate plans are never null");
//! assert!((plan.output().as_slice()[0].re - 8.0).abs() < 1e-12);
//! ```
//!
//! Planning with a measuring flag records wisdom in [`WisdomStore::global`];
//! [`generate_wisdom`], [`Plan::try_wisdom`] and the import/export functions
//! manage it.

pub mod aligned;
pub mod config;
pub mod engine;
pub mod error;
mod kernels;
pub mod layout;
pub mod options;
pub mod plan;
pub mod scalar;
pub mod trace;
pub mod view;
pub mod wisdom;

pub use aligned::{AlignedVec, SIMD_ALIGNMENT, alignment_of};
pub use config::{PlannerConfig, RuntimeMode, planner_config, set_planner_config};
pub use engine::{
    Algorithm, EngineHandle, EngineKind, Problem, ReferenceEngine, TransformEngine, TransformKind,
    TransformSpec, resolve_engine,
};
pub use error::{ConfigError, PlanError, WisdomError};
pub use layout::{Layout, StorageOrder};
pub use options::{Direction, Flag, Kind, Rigor};
pub use plan::{Plan, TransformPair};
pub use scalar::{Complex32, Complex64, Domain, Element, Precision, Scalar};
pub use trace::{PlanEvent, PlanTrace, take_plan_traces};
pub use view::View;
pub use wisdom::{
    WisdomEntry, WisdomStore, export_wisdom, forget_wisdom, generate_wisdom, import_wisdom,
};
