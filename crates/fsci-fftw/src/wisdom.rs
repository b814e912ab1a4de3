//! Process-wide planner wisdom.
//!
//! Wisdom maps a [`Problem`] to the recipe a measuring planner picked for it.
//! [`WisdomStore::global`] is the store every engine consults. Its mutex is
//! held for the whole of each plan construction, so planning, import, export
//! and forget are serialized across threads; already built plans never touch
//! the store and may execute concurrently.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::aligned::AlignedVec;
use crate::config::planner_config;
use crate::engine::{Algorithm, Problem, TransformSpec, resolve_engine};
use crate::error::WisdomError;
use crate::layout::Layout;
use crate::options::{Flag, Rigor};
use crate::plan::{PlanHandle, TransformPair};
use crate::scalar::{Element, Scalar};
use crate::trace::{PlanEvent, PlanTrace, record_trace};
use crate::view::shapes_transformable;

pub const WISDOM_FORMAT: &str = "fsci-fftw-wisdom";
pub const WISDOM_VERSION: u32 = 1;

/// What a measuring planner learned about one problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WisdomEntry {
    pub rigor: Rigor,
    pub recipe: Vec<Algorithm>,
    /// Best trial time of the chosen recipe.
    pub timing_ns: u64,
}

#[derive(Debug, Default)]
pub(crate) struct WisdomDb {
    entries: HashMap<Problem, WisdomEntry>,
}

impl WisdomDb {
    /// Entry for `problem` produced at `rigor` or better.
    pub(crate) fn lookup(&self, problem: &Problem, rigor: Rigor) -> Option<&WisdomEntry> {
        self.entries
            .get(problem)
            .filter(|entry| entry.rigor >= rigor)
    }

    /// Store `entry` unless a more rigorous one is already known.
    pub(crate) fn record(&mut self, problem: Problem, entry: WisdomEntry) -> bool {
        match self.entries.get(&problem) {
            Some(existing) if existing.rigor > entry.rigor => false,
            _ => {
                self.entries.insert(problem, entry);
                true
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WisdomRecord {
    problem: Problem,
    #[serde(flatten)]
    entry: WisdomEntry,
}

#[derive(Debug, Serialize, Deserialize)]
struct WisdomDocument {
    format: String,
    version: u32,
    entries: Vec<WisdomRecord>,
}

/// Wisdom database service.
#[derive(Debug, Default)]
pub struct WisdomStore {
    db: Mutex<WisdomDb>,
}

static GLOBAL_WISDOM: OnceLock<WisdomStore> = OnceLock::new();

impl WisdomStore {
    /// Detached, empty store. Engines only consult [`WisdomStore::global`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide store, created empty on first use.
    #[must_use]
    pub fn global() -> &'static Self {
        GLOBAL_WISDOM.get_or_init(Self::new)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, WisdomDb> {
        match self.db.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Plans built earlier keep working.
    pub fn forget(&self) {
        self.lock().entries.clear();
    }

    pub fn export_to_string(&self) -> Result<String, WisdomError> {
        let db = self.lock();
        let mut entries = db
            .entries
            .iter()
            .map(|(problem, entry)| WisdomRecord {
                problem: problem.clone(),
                entry: entry.clone(),
            })
            .collect::<Vec<_>>();
        drop(db);
        entries.sort_by(|a, b| a.problem.cmp(&b.problem));
        let document = WisdomDocument {
            format: WISDOM_FORMAT.to_string(),
            version: WISDOM_VERSION,
            entries,
        };
        serde_json::to_string_pretty(&document).map_err(|source| WisdomError::Serialize { source })
    }

    /// Merge wisdom from `text`, keeping the more rigorous entry per problem.
    /// Returns the number of entries taken.
    pub fn import_from_string(&self, text: &str) -> Result<usize, WisdomError> {
        let document: WisdomDocument =
            serde_json::from_str(text).map_err(|source| WisdomError::Parse { source })?;
        if document.format != WISDOM_FORMAT || document.version != WISDOM_VERSION {
            return Err(WisdomError::Format {
                format: document.format,
                version: document.version,
            });
        }
        let mut db = self.lock();
        let mut taken = 0;
        for record in document.entries {
            if record.entry.recipe.len() != record.problem.rank() {
                tracing::warn!(
                    rank = record.problem.rank(),
                    recipe = record.entry.recipe.len(),
                    "skipping wisdom entry with mismatched recipe"
                );
                continue;
            }
            if db.record(record.problem, record.entry) {
                taken += 1;
            }
        }
        Ok(taken)
    }

    pub fn export_to_file(&self, path: impl AsRef<Path>) -> Result<(), WisdomError> {
        let path = path.as_ref();
        let text = self.export_to_string()?;
        std::fs::write(path, text).map_err(|source| WisdomError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn import_from_file(&self, path: impl AsRef<Path>) -> Result<usize, WisdomError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| WisdomError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.import_from_string(&text)
    }
}

/// Write the global wisdom to `path`.
pub fn export_wisdom(path: impl AsRef<Path>) -> Result<(), WisdomError> {
    let result = WisdomStore::global().export_to_file(path);
    let mut trace = PlanTrace::new(PlanEvent::WisdomExport);
    trace.how_many = WisdomStore::global().len();
    record_trace(trace);
    result
}

/// Merge wisdom from `path` into the global store.
pub fn import_wisdom(path: impl AsRef<Path>) -> Result<usize, WisdomError> {
    let result = WisdomStore::global().import_from_file(path);
    let mut trace = PlanTrace::new(PlanEvent::WisdomImport);
    trace.how_many = *result.as_ref().unwrap_or(&0);
    record_trace(trace);
    result
}

/// Clear the global wisdom. Plans built after this start from scratch.
pub fn forget_wisdom() {
    WisdomStore::global().forget();
    record_trace(PlanTrace::new(PlanEvent::WisdomForget));
}

/// Plan `in_layout -> out_layout` and its reverse on scratch buffers so that
/// later plans with `flag`, or with `WISDOM_ONLY`, find stored wisdom.
///
/// Does nothing at estimate rigor, which never measures.
///
/// # Panics
///
/// Panics if the layouts are not transformable for the element pair, or if
/// `args` do not fit the layout rank.
pub fn generate_wisdom<I, O>(
    in_layout: &Layout,
    out_layout: &Layout,
    flag: Flag,
    args: <(I, O) as TransformPair>::Args,
) where
    I: Element,
    O: Element<Real = I::Real>,
    (I, O): TransformPair,
{
    let spec = <(I, O)>::spec(args, in_layout.rank());
    generate_for_spec::<I, O>(in_layout, out_layout, flag, &spec);
}

pub(crate) fn generate_for_spec<I, O>(in_layout: &Layout, out_layout: &Layout, flag: Flag, spec: &TransformSpec)
where
    I: Element,
    O: Element<Real = I::Real>,
{
    if flag.rigor() == Rigor::Estimate {
        return;
    }
    assert!(
        shapes_transformable(in_layout, I::DOMAIN, out_layout, O::DOMAIN),
        "layouts {:?} -> {:?} are not transformable",
        in_layout.n(),
        out_layout.n()
    );
    let flag = flag.without_wisdom_only();
    let started = Instant::now();
    let engine = resolve_engine::<I::Real>(planner_config().engine);
    let precision = <I::Real as Scalar>::PRECISION;
    let mut input = AlignedVec::<I>::zeros(in_layout.size());
    let mut output = AlignedVec::<O>::zeros(out_layout.size());

    let forward = Problem::new(precision, spec.clone(), in_layout.clone(), out_layout.clone(), flag);
    let backward = Problem::new(precision, spec.reversed(), out_layout.clone(), in_layout.clone(), flag);
    let mut recipe = Vec::new();
    {
        let in_data: &mut [I::Real] = bytemuck::cast_slice_mut(input.as_mut_slice());
        let out_data: &mut [I::Real] = bytemuck::cast_slice_mut(output.as_mut_slice());
        let handle = PlanHandle::new(engine, engine.build(forward, flag, in_data, out_data));
        if let Some(raw) = handle.raw() {
            recipe = raw.recipe().to_vec();
        }
        let _reverse = PlanHandle::new(engine, engine.build(backward, flag, out_data, in_data));
    }

    let mut trace = PlanTrace::new(PlanEvent::WisdomGenerate);
    trace.precision = Some(precision);
    trace.transform = Some(spec.kind());
    trace.shape = in_layout.n().to_vec();
    trace.how_many = in_layout.how_many();
    trace.flag = flag;
    trace.recipe = recipe;
    trace.timing_ns = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
    record_trace(trace);
}

#[cfg(test)]
mod tests {
    use super::{WISDOM_FORMAT, WisdomDb, WisdomEntry, WisdomStore};
    use crate::engine::{Algorithm, Problem, TransformSpec};
    use crate::error::WisdomError;
    use crate::layout::Layout;
    use crate::options::{Direction, Flag, Rigor};
    use crate::scalar::Precision;

    fn problem(n: usize) -> Problem {
        Problem::new(
            Precision::Single,
            TransformSpec::C2c(Direction::Backward),
            Layout::contiguous(&[n]),
            Layout::contiguous(&[n]),
            Flag::MEASURE,
        )
    }

    fn entry(rigor: Rigor) -> WisdomEntry {
        WisdomEntry {
            rigor,
            recipe: vec![Algorithm::MixedRadix],
            timing_ns: 10,
        }
    }

    #[test]
    fn lookup_accepts_equal_or_better_rigor() {
        let mut db = WisdomDb::default();
        db.record(problem(12), entry(Rigor::Patient));
        assert!(db.lookup(&problem(12), Rigor::Measure).is_some());
        assert!(db.lookup(&problem(12), Rigor::Patient).is_some());
        assert!(db.lookup(&problem(12), Rigor::Exhaustive).is_none());
        assert!(db.lookup(&problem(13), Rigor::Estimate).is_none());
    }

    #[test]
    fn less_rigorous_entries_do_not_replace_better_ones() {
        let mut db = WisdomDb::default();
        assert!(db.record(problem(12), entry(Rigor::Exhaustive)));
        assert!(!db.record(problem(12), entry(Rigor::Measure)));
        assert_eq!(
            db.lookup(&problem(12), Rigor::Estimate).map(|e| e.rigor),
            Some(Rigor::Exhaustive)
        );
    }

    #[test]
    fn string_roundtrip_between_detached_stores() {
        let source = WisdomStore::new();
        source.lock().record(problem(20), entry(Rigor::Patient));
        source.lock().record(problem(21), entry(Rigor::Measure));
        let text = source.export_to_string().expect("export should succeed");
        assert!(text.contains(WISDOM_FORMAT));

        let target = WisdomStore::new();
        let taken = target.import_from_string(&text).expect("import should succeed");
        assert_eq!(taken, 2);
        assert_eq!(target.len(), 2);
        target.forget();
        assert!(target.is_empty());
    }

    #[test]
    fn foreign_documents_are_rejected() {
        let store = WisdomStore::new();
        let err = store
            .import_from_string(r#"{"format":"other","version":1,"entries":[]}"#)
            .expect_err("foreign format must fail");
        assert!(matches!(err, WisdomError::Format { .. }));
        let err = store
            .import_from_string("(fftw-3.3.10 fftw_wisdom)")
            .expect_err("non-json must fail");
        assert!(matches!(err, WisdomError::Parse { .. }));
    }
}
