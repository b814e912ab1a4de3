//! Engine boundary and the bundled reference engine.
//!
//! A [`TransformEngine`] builds, runs and releases plans for one precision.
//! It only ever sees flat real-scalar storage plus a [`Problem`] describing
//! how that storage is laid out; typed views and plan lifecycle live above it.

use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::aligned::alignment_of;
use crate::config::planner_config;
use crate::kernels::{self, kind_uses_dft, largest_prime_factor};
use crate::layout::Layout;
use crate::options::{Direction, Flag, Kind, Rigor};
use crate::scalar::{Domain, Precision, Scalar, scalars_per_element};
use crate::wisdom::{WisdomEntry, WisdomStore};

/// Engines that can serve plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EngineKind {
    #[default]
    Reference,
}

/// Transform family, fixed by the element types of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransformKind {
    C2c,
    R2c,
    C2r,
    R2r,
}

impl TransformKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::C2c => "c2c",
            Self::R2c => "r2c",
            Self::C2r => "c2r",
            Self::R2r => "r2r",
        }
    }
}

/// 1-D algorithm chosen for one axis of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Direct,
    MixedRadix,
}

/// What to compute, independent of where the data lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransformSpec {
    C2c(Direction),
    R2c,
    C2r,
    /// One kind per axis, already expanded to the plan rank.
    R2r(Vec<Kind>),
}

impl TransformSpec {
    #[must_use]
    pub fn kind(&self) -> TransformKind {
        match self {
            Self::C2c(_) => TransformKind::C2c,
            Self::R2c => TransformKind::R2c,
            Self::C2r => TransformKind::C2r,
            Self::R2r(_) => TransformKind::R2r,
        }
    }

    /// The transform that undoes this one up to normalization.
    #[must_use]
    pub fn reversed(&self) -> Self {
        match self {
            Self::C2c(direction) => Self::C2c(direction.reversed()),
            Self::R2c => Self::C2r,
            Self::C2r => Self::R2c,
            Self::R2r(kinds) => Self::R2r(kinds.iter().map(|kind| kind.inverse()).collect()),
        }
    }

    /// Element domains of the input and output sides.
    #[must_use]
    pub fn domains(&self) -> (Domain, Domain) {
        match self {
            Self::C2c(_) => (Domain::Complex, Domain::Complex),
            Self::R2c => (Domain::Real, Domain::Complex),
            Self::C2r => (Domain::Complex, Domain::Real),
            Self::R2r(_) => (Domain::Real, Domain::Real),
        }
    }

    /// Which axes run a DFT, and so can pick between algorithms.
    fn axis_uses_dft(&self, axis: usize) -> bool {
        match self {
            Self::R2r(kinds) => kind_uses_dft(kinds[axis]),
            _ => true,
        }
    }
}

/// A fully described transform problem; this is also the wisdom key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Problem {
    pub precision: Precision,
    pub spec: TransformSpec,
    /// Logical sizes; the real-side sizes for R2C and C2R.
    pub n: Vec<usize>,
    pub in_layout: Layout,
    pub out_layout: Layout,
    /// Flag bits that change the problem rather than the planner effort.
    pub flags: Flag,
}

impl Problem {
    #[must_use]
    pub fn new(
        precision: Precision,
        spec: TransformSpec,
        in_layout: Layout,
        out_layout: Layout,
        flag: Flag,
    ) -> Self {
        let n = match spec {
            TransformSpec::C2r => out_layout.n().to_vec(),
            _ => in_layout.n().to_vec(),
        };
        Self {
            precision,
            spec,
            n,
            in_layout,
            out_layout,
            flags: flag.problem_bits(),
        }
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.n.len()
    }

    /// Why the engine cannot plan this problem, if it cannot.
    #[must_use]
    pub fn unsupported_reason(&self) -> Option<&'static str> {
        if let TransformSpec::R2r(kinds) = &self.spec
            && kinds.iter().zip(&self.n).any(|(kind, &n)| n < kind.min_len())
        {
            return Some("redft00 needs at least two samples");
        }
        if self.spec == TransformSpec::C2r
            && self.rank() > 1
            && self.flags.contains(Flag::PRESERVE_INPUT)
        {
            return Some("no input-preserving multi-dimensional c2r algorithm");
        }
        None
    }

    /// Recipe picked without measuring.
    #[must_use]
    pub fn heuristic_recipe(&self) -> Vec<Algorithm> {
        (0..self.rank())
            .map(|axis| {
                let n = self.n[axis];
                if !self.spec.axis_uses_dft(axis) || n <= 4 || largest_prime_factor(n) > 64 {
                    Algorithm::Direct
                } else {
                    Algorithm::MixedRadix
                }
            })
            .collect()
    }

    /// Recipes worth timing at `rigor`, heuristic first.
    #[must_use]
    pub fn candidate_recipes(&self, rigor: Rigor) -> Vec<Vec<Algorithm>> {
        const MAX_CANDIDATES: usize = 256;
        let choices = (0..self.rank())
            .map(|axis| {
                if self.spec.axis_uses_dft(axis) {
                    vec![Algorithm::Direct, Algorithm::MixedRadix]
                } else {
                    vec![Algorithm::Direct]
                }
            })
            .collect::<Vec<_>>();
        let heuristic = self.heuristic_recipe();
        let mut candidates = vec![heuristic.clone()];
        let mut push = |recipe: Vec<Algorithm>| {
            if !candidates.contains(&recipe) && candidates.len() < MAX_CANDIDATES {
                candidates.push(recipe);
            }
        };
        match rigor {
            Rigor::Estimate => {}
            Rigor::Measure | Rigor::Patient => {
                for algorithm in [Algorithm::Direct, Algorithm::MixedRadix] {
                    push(
                        choices
                            .iter()
                            .map(|options| if options.contains(&algorithm) { algorithm } else { options[0] })
                            .collect(),
                    );
                }
                if rigor == Rigor::Patient {
                    for (axis, options) in choices.iter().enumerate() {
                        for &algorithm in options {
                            let mut recipe = heuristic.clone();
                            recipe[axis] = algorithm;
                            push(recipe);
                        }
                    }
                }
            }
            Rigor::Exhaustive => {
                let mut partial: Vec<Vec<Algorithm>> = vec![Vec::new()];
                for options in &choices {
                    partial = partial
                        .into_iter()
                        .flat_map(|prefix| {
                            options.iter().map(move |&algorithm| {
                                let mut next = prefix.clone();
                                next.push(algorithm);
                                next
                            })
                        })
                        .take(MAX_CANDIDATES)
                        .collect();
                }
                for recipe in partial {
                    push(recipe);
                }
            }
        }
        candidates
    }
}

/// Opaque engine plan. Exactly one owner; handed back through
/// [`TransformEngine::release`].
#[derive(Debug)]
pub struct EngineHandle {
    id: u64,
    problem: Problem,
    recipe: Vec<Algorithm>,
    alignment: [usize; 2],
    flag: Flag,
    wisdom_hit: bool,
}

impl EngineHandle {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    #[must_use]
    pub fn recipe(&self) -> &[Algorithm] {
        &self.recipe
    }

    /// Misalignment of the input and output buffers the plan was built on.
    #[must_use]
    pub fn alignment(&self) -> [usize; 2] {
        self.alignment
    }

    #[must_use]
    pub fn flag(&self) -> Flag {
        self.flag
    }

    /// Whether planning reused stored wisdom instead of choosing afresh.
    #[must_use]
    pub fn wisdom_hit(&self) -> bool {
        self.wisdom_hit
    }
}

/// Per-precision engine boundary.
///
/// Storage is passed as real scalars; complex elements occupy two
/// consecutive scalars. Slices must cover the problem layouts.
pub trait TransformEngine<T: Scalar>: Send + Sync {
    fn kind(&self) -> EngineKind;

    /// Plan `problem`. `None` is the engine's null plan.
    ///
    /// Measuring rigors run trial transforms on `input` and `output`,
    /// overwriting both.
    fn build(&self, problem: Problem, flag: Flag, input: &mut [T], output: &mut [T]) -> Option<EngineHandle>;

    /// Run a plan. `input` is left intact.
    fn execute(&self, handle: &EngineHandle, input: &mut [T], output: &mut [T]);

    /// Release a live plan.
    fn release(&self, handle: EngineHandle);
}

#[must_use]
pub fn resolve_engine<T: Scalar>(kind: EngineKind) -> &'static dyn TransformEngine<T> {
    match kind {
        EngineKind::Reference => T::reference_engine(),
    }
}

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Pure-Rust engine backed by [`crate::kernels`].
#[derive(Debug)]
pub struct ReferenceEngine<T> {
    live: Mutex<BTreeSet<u64>>,
    _precision: PhantomData<fn() -> T>,
}

impl<T> Default for ReferenceEngine<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ReferenceEngine<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            live: Mutex::new(BTreeSet::new()),
            _precision: PhantomData,
        }
    }

    fn live_set(&self) -> MutexGuard<'_, BTreeSet<u64>> {
        match self.live.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Whether handle `id` was built by this engine and not yet released.
    #[must_use]
    pub fn is_live(&self, id: u64) -> bool {
        self.live_set().contains(&id)
    }

    #[must_use]
    pub fn live_handles(&self) -> usize {
        self.live_set().len()
    }
}

impl<T: Scalar> ReferenceEngine<T> {
    /// Time every candidate recipe on the caller's buffers and keep the fastest.
    fn measure(&self, problem: &Problem, rigor: Rigor, input: &mut [T], output: &mut [T]) -> (Vec<Algorithm>, u64) {
        let limit = planner_config().time_limit_ms.map(Duration::from_millis);
        let started = Instant::now();
        let mut best: Option<(Vec<Algorithm>, Duration)> = None;
        for recipe in problem.candidate_recipes(rigor) {
            if let Some(limit) = limit
                && best.is_some()
                && started.elapsed() >= limit
            {
                tracing::debug!(?limit, "measurement time limit reached");
                break;
            }
            let mut fastest = Duration::MAX;
            for _ in 0..rigor.repetitions() {
                input.fill(T::zero());
                let trial = Instant::now();
                run(problem, &recipe, input, output);
                fastest = fastest.min(trial.elapsed());
            }
            if best.as_ref().is_none_or(|(_, time)| fastest < *time) {
                best = Some((recipe, fastest));
            }
        }
        match best {
            Some((recipe, time)) => (recipe, u64::try_from(time.as_nanos()).unwrap_or(u64::MAX)),
            None => (problem.heuristic_recipe(), 0),
        }
    }
}

impl<T: Scalar> TransformEngine<T> for ReferenceEngine<T> {
    fn kind(&self) -> EngineKind {
        EngineKind::Reference
    }

    fn build(&self, problem: Problem, flag: Flag, input: &mut [T], output: &mut [T]) -> Option<EngineHandle> {
        check_storage(&problem, input, output);
        if let Some(reason) = problem.unsupported_reason() {
            tracing::debug!(reason, "engine declined problem");
            return None;
        }
        let rigor = flag.rigor();
        let alignment = [alignment_of(input), alignment_of(output)];

        let mut wisdom = WisdomStore::global().lock();
        let (recipe, wisdom_hit) = if let Some(entry) = wisdom.lookup(&problem, rigor) {
            (entry.recipe.clone(), true)
        } else if flag.is_wisdom_only() {
            return None;
        } else if rigor == Rigor::Estimate {
            (problem.heuristic_recipe(), false)
        } else {
            let (recipe, timing_ns) = self.measure(&problem, rigor, input, output);
            wisdom.record(
                problem.clone(),
                WisdomEntry {
                    rigor,
                    recipe: recipe.clone(),
                    timing_ns,
                },
            );
            (recipe, false)
        };
        drop(wisdom);

        let id = NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed);
        self.live_set().insert(id);
        Some(EngineHandle {
            id,
            problem,
            recipe,
            alignment,
            flag,
            wisdom_hit,
        })
    }

    fn execute(&self, handle: &EngineHandle, input: &mut [T], output: &mut [T]) {
        debug_assert!(self.is_live(handle.id), "executing released handle {}", handle.id);
        check_storage(&handle.problem, input, output);
        run(&handle.problem, &handle.recipe, input, output);
    }

    fn release(&self, handle: EngineHandle) {
        let removed = self.live_set().remove(&handle.id);
        assert!(removed, "released unknown engine handle {}", handle.id);
    }
}

fn check_storage<T>(problem: &Problem, input: &[T], output: &[T]) {
    let (in_domain, out_domain) = problem.spec.domains();
    assert_eq!(
        input.len(),
        problem.in_layout.size() * scalars_per_element(in_domain),
        "input storage does not cover the planned layout"
    );
    assert_eq!(
        output.len(),
        problem.out_layout.size() * scalars_per_element(out_domain),
        "output storage does not cover the planned layout"
    );
}

fn gather_real<T: Scalar>(data: &[T], base: usize, offsets: &[usize]) -> Vec<T> {
    offsets.iter().map(|&offset| data[base + offset]).collect()
}

fn gather_complex<T: Scalar>(data: &[T], base: usize, offsets: &[usize]) -> Vec<Complex<T>> {
    offsets
        .iter()
        .map(|&offset| {
            let at = 2 * (base + offset);
            Complex::new(data[at], data[at + 1])
        })
        .collect()
}

fn scatter_real<T: Scalar>(data: &mut [T], base: usize, offsets: &[usize], values: &[T]) {
    for (&offset, &value) in offsets.iter().zip(values) {
        data[base + offset] = value;
    }
}

fn scatter_complex<T: Scalar>(data: &mut [T], base: usize, offsets: &[usize], values: &[Complex<T>]) {
    for (&offset, value) in offsets.iter().zip(values) {
        let at = 2 * (base + offset);
        data[at] = value.re;
        data[at + 1] = value.im;
    }
}

/// Execute `problem` batch by batch: gather into a dense array, transform,
/// scatter into the output layout.
fn run<T: Scalar>(problem: &Problem, recipe: &[Algorithm], input: &[T], output: &mut [T]) {
    let in_offsets = problem.in_layout.batch_offsets();
    let out_offsets = problem.out_layout.batch_offsets();
    let dims = &problem.n;
    for batch in 0..problem.in_layout.how_many() {
        let in_base = batch * problem.in_layout.dist();
        let out_base = batch * problem.out_layout.dist();
        match &problem.spec {
            TransformSpec::C2c(direction) => {
                let mut lane = gather_complex(input, in_base, &in_offsets);
                kernels::c2c(&mut lane, dims, direction.sign(), recipe);
                scatter_complex(output, out_base, &out_offsets, &lane);
            }
            TransformSpec::R2c => {
                let lane = gather_real(input, in_base, &in_offsets);
                let spectrum = kernels::r2c(&lane, dims, recipe);
                scatter_complex(output, out_base, &out_offsets, &spectrum);
            }
            TransformSpec::C2r => {
                let lane = gather_complex(input, in_base, &in_offsets);
                let signal = kernels::c2r(&lane, dims, recipe);
                scatter_real(output, out_base, &out_offsets, &signal);
            }
            TransformSpec::R2r(kinds) => {
                let mut lane = gather_real(input, in_base, &in_offsets);
                kernels::r2r(&mut lane, dims, kinds, recipe);
                scatter_real(output, out_base, &out_offsets, &lane);
            }
        }
    }
}
