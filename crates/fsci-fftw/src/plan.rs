//! Typed transform plans.
//!
//! A [`Plan`] binds an input and an output [`View`] to one engine handle. The
//! element types pick both the precision and the transform family at compile
//! time through [`TransformPair`]:
//!
//! | input        | output       | family | constructor args |
//! |--------------|--------------|--------|------------------|
//! | `Complex<T>` | `Complex<T>` | C2C    | [`Direction`]    |
//! | `T`          | `Complex<T>` | R2C    | `()`             |
//! | `Complex<T>` | `T`          | C2R    | `()`             |
//! | `T`          | `T`          | R2R    | `Vec<Kind>`      |
//!
//! Pairs that mix precisions have no `TransformPair` impl and do not compile.

use std::fmt::{Debug, Formatter};
use std::time::Instant;

use num_complex::Complex;

use crate::aligned::alignment_of;
use crate::config::{RuntimeMode, planner_config};
use crate::engine::{
    Algorithm, EngineHandle, Problem, TransformEngine, TransformKind, TransformSpec,
    resolve_engine,
};
use crate::error::PlanError;
use crate::options::{Direction, Flag, Kind, Rigor, expand_kinds};
use crate::scalar::{Element, Precision, Scalar};
use crate::trace::{PlanEvent, PlanTrace, record_trace};
use crate::view::View;
use crate::wisdom::generate_for_spec;

mod private {
    pub trait Sealed {}
}

/// Element pair a plan can transform between.
pub trait TransformPair: private::Sealed {
    /// Extra constructor input: a direction for C2C, kinds for R2R.
    type Args;

    const KIND: TransformKind;

    fn spec(args: Self::Args, rank: usize) -> TransformSpec;
}

macro_rules! impl_transform_pairs {
    ($($real:ty),*) => {$(
        impl private::Sealed for (Complex<$real>, Complex<$real>) {}
        impl TransformPair for (Complex<$real>, Complex<$real>) {
            type Args = Direction;
            const KIND: TransformKind = TransformKind::C2c;

            fn spec(direction: Direction, _rank: usize) -> TransformSpec {
                TransformSpec::C2c(direction)
            }
        }

        impl private::Sealed for ($real, Complex<$real>) {}
        impl TransformPair for ($real, Complex<$real>) {
            type Args = ();
            const KIND: TransformKind = TransformKind::R2c;

            fn spec((): (), _rank: usize) -> TransformSpec {
                TransformSpec::R2c
            }
        }

        impl private::Sealed for (Complex<$real>, $real) {}
        impl TransformPair for (Complex<$real>, $real) {
            type Args = ();
            const KIND: TransformKind = TransformKind::C2r;

            fn spec((): (), _rank: usize) -> TransformSpec {
                TransformSpec::C2r
            }
        }

        impl private::Sealed for ($real, $real) {}
        impl TransformPair for ($real, $real) {
            type Args = Vec<Kind>;
            const KIND: TransformKind = TransformKind::R2r;

            fn spec(kinds: Vec<Kind>, rank: usize) -> TransformSpec {
                TransformSpec::R2r(expand_kinds(&kinds, rank))
            }
        }
    )*};
}

impl_transform_pairs!(f32, f64);

/// Sole owner of an engine handle; releases it exactly once.
pub(crate) struct PlanHandle<T: Scalar> {
    engine: &'static dyn TransformEngine<T>,
    raw: Option<EngineHandle>,
}

impl<T: Scalar> PlanHandle<T> {
    pub(crate) fn new(engine: &'static dyn TransformEngine<T>, raw: Option<EngineHandle>) -> Self {
        Self { engine, raw }
    }

    pub(crate) fn raw(&self) -> Option<&EngineHandle> {
        self.raw.as_ref()
    }

    /// Release the handle if still held. Returns whether anything was released.
    pub(crate) fn release(&mut self) -> bool {
        let Some(raw) = self.raw.take() else {
            return false;
        };
        let mut trace = PlanTrace::new(PlanEvent::Release);
        trace.precision = Some(raw.problem().precision);
        trace.transform = Some(raw.problem().spec.kind());
        trace.shape = raw.problem().n.clone();
        trace.how_many = raw.problem().in_layout.how_many();
        trace.flag = raw.flag();
        record_trace(trace);
        self.engine.release(raw);
        true
    }
}

impl<T: Scalar> Drop for PlanHandle<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: Scalar> Debug for PlanHandle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanHandle")
            .field("engine", &self.engine.kind())
            .field("raw", &self.raw)
            .finish()
    }
}

/// An engine plan bound to one input and one output view.
///
/// Moving a plan moves its handle; the moved-from binding can no longer be
/// named. Dropping a plan releases the handle. A plan whose construction the
/// engine declined is *null*: it still owns its views but every execution
/// reports [`PlanError::NullPlan`].
#[derive(Debug)]
pub struct Plan<'a, I: Element, O: Element<Real = I::Real>> {
    input: View<'a, I>,
    output: View<'a, O>,
    flag: Flag,
    spec: TransformSpec,
    mode: RuntimeMode,
    handle: PlanHandle<I::Real>,
}

impl<'a, I, O> Plan<'a, I, O>
where
    I: Element,
    O: Element<Real = I::Real>,
    (I, O): TransformPair,
{
    /// Build a plan for `input -> output`.
    ///
    /// Measuring rigors time trial transforms on the bound buffers and leave
    /// them overwritten; fill the input after construction, or use
    /// [`Plan::try_wisdom`]. With `WISDOM_ONLY` and no stored wisdom the
    /// plan is null.
    ///
    /// # Panics
    ///
    /// Panics if the views differ in rank or batch count, if their shapes are
    /// not transformable, or if R2R kinds are empty or outnumber the axes.
    #[must_use]
    pub fn new(
        input: View<'a, I>,
        output: View<'a, O>,
        flag: Flag,
        args: <(I, O) as TransformPair>::Args,
    ) -> Self {
        let spec = <(I, O)>::spec(args, input.rank());
        Self::build(input, output, flag, spec)
    }

    /// Build reusing wisdom where possible, generating it on scratch buffers
    /// when missing. The bound buffers are never used for measurement.
    ///
    /// # Panics
    ///
    /// Same contract as [`Plan::new`].
    #[must_use]
    pub fn try_wisdom(
        input: View<'a, I>,
        output: View<'a, O>,
        flag: Flag,
        args: <(I, O) as TransformPair>::Args,
    ) -> Self {
        let spec = <(I, O)>::spec(args, input.rank());
        Self::try_wisdom_spec(input, output, flag, spec)
    }

    fn try_wisdom_spec(input: View<'a, I>, output: View<'a, O>, flag: Flag, spec: TransformSpec) -> Self {
        if flag.rigor() == Rigor::Estimate {
            return Self::build(input, output, flag, spec);
        }
        let attempt = Self::build(input, output, flag.with_wisdom_only(), spec.clone());
        if !attempt.is_null() {
            return attempt.with_flag(flag);
        }
        let (input, output) = attempt.into_views();
        generate_for_spec::<I, O>(input.layout(), output.layout(), flag, &spec);
        Self::build(input, output, flag, spec)
    }

    /// Independent plan with the same problem and options on new views.
    ///
    /// Reuses the wisdom this plan's construction produced instead of
    /// measuring again.
    ///
    /// # Panics
    ///
    /// Panics if the views do not share storage layout with this plan's.
    #[must_use]
    pub fn duplicate<'b>(&self, input: View<'b, I>, output: View<'b, O>) -> Plan<'b, I, O> {
        assert!(
            self.input.equal_storage(&input) && self.output.equal_storage(&output),
            "duplicate plan views must match the original storage layout"
        );
        Plan::try_wisdom_spec(input, output, self.flag, self.spec.clone())
    }

    fn build(mut input: View<'a, I>, mut output: View<'a, O>, flag: Flag, spec: TransformSpec) -> Self {
        assert_eq!(input.rank(), output.rank(), "input and output rank differ");
        assert_eq!(
            input.how_many(),
            output.how_many(),
            "input and output batch counts differ"
        );
        assert!(
            input.transformable(&output),
            "input shape {:?} cannot be transformed into output shape {:?}",
            input.n(),
            output.n()
        );
        debug_assert_eq!(spec.kind(), <(I, O)>::KIND);

        let config = planner_config();
        let engine = resolve_engine::<I::Real>(config.engine);
        let precision = <I::Real as Scalar>::PRECISION;
        let problem = Problem::new(
            precision,
            spec.clone(),
            input.layout().clone(),
            output.layout().clone(),
            flag,
        );
        let started = Instant::now();
        let raw = engine.build(problem, flag, input.engine_data_mut(), output.engine_data_mut());

        let mut trace = PlanTrace::new(if raw.is_some() {
            PlanEvent::Build
        } else {
            PlanEvent::Null
        });
        trace.precision = Some(precision);
        trace.transform = Some(spec.kind());
        trace.shape = input.n().to_vec();
        trace.how_many = input.how_many();
        trace.flag = flag;
        if let Some(handle) = &raw {
            trace.wisdom_hit = handle.wisdom_hit();
            trace.recipe = handle.recipe().to_vec();
        }
        trace.timing_ns = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        record_trace(trace);

        Self {
            input,
            output,
            flag,
            spec,
            mode: config.mode,
            handle: PlanHandle::new(engine, raw),
        }
    }

    fn with_flag(mut self, flag: Flag) -> Self {
        self.flag = flag;
        self
    }
}

impl<'a, I, O> Plan<'a, I, O>
where
    I: Element,
    O: Element<Real = I::Real>,
{
    /// Run the plan on the bound views.
    pub fn execute(&mut self) -> Result<(), PlanError> {
        let Some(raw) = self.handle.raw.as_ref() else {
            return Err(PlanError::NullPlan);
        };
        if self.mode == RuntimeMode::Hardened && !self.input.all_finite() {
            return Err(PlanError::NonFiniteInput);
        }
        let started = Instant::now();
        self.handle
            .engine
            .execute(raw, self.input.engine_data_mut(), self.output.engine_data_mut());
        self.trace_execute(started);
        Ok(())
    }

    /// Replay the plan on other buffers with the same layouts.
    ///
    /// Without `UNALIGNED`, the buffers must share the SIMD alignment class of
    /// the buffers the plan was built on.
    ///
    /// # Panics
    ///
    /// Panics if the views do not share storage layout with the bound views.
    pub fn execute_with(&mut self, input: &mut View<'_, I>, output: &mut View<'_, O>) -> Result<(), PlanError> {
        assert!(
            self.input.equal_storage(input) && self.output.equal_storage(output),
            "replacement views must match the planned storage layout"
        );
        assert!(input.transformable(output), "replacement views are not transformable");
        let Some(raw) = self.handle.raw.as_ref() else {
            return Err(PlanError::NullPlan);
        };
        if !self.flag.contains(Flag::UNALIGNED) {
            let supplied = [alignment_of(input.engine_data()), alignment_of(output.engine_data())];
            let planned = raw.alignment();
            if let Some(side) = (0..2).find(|&side| planned[side] != supplied[side]) {
                return Err(PlanError::AlignmentMismatch {
                    planned: planned[side],
                    supplied: supplied[side],
                });
            }
        }
        if self.mode == RuntimeMode::Hardened && !input.all_finite() {
            return Err(PlanError::NonFiniteInput);
        }
        let started = Instant::now();
        self.handle
            .engine
            .execute(raw, input.engine_data_mut(), output.engine_data_mut());
        self.trace_execute(started);
        Ok(())
    }

    fn trace_execute(&self, started: Instant) {
        let mut trace = PlanTrace::new(PlanEvent::Execute);
        trace.precision = Some(self.precision());
        trace.transform = Some(self.transform_kind());
        trace.shape = self.input.n().to_vec();
        trace.how_many = self.input.how_many();
        trace.flag = self.flag;
        if let Some(raw) = self.handle.raw() {
            trace.recipe = raw.recipe().to_vec();
        }
        trace.timing_ns = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        record_trace(trace);
    }

    /// `1 / logical size` of the transform, always taken over the output sizes.
    ///
    /// C2C, R2C and C2R use the product of the output sizes, so a R2C factor
    /// reflects the stored half spectrum. R2R multiplies each axis's
    /// [`Kind::logical_dimension`] of the output size.
    #[must_use]
    pub fn normalization(&self) -> I::Real {
        let logical: usize = match &self.spec {
            TransformSpec::C2c(_) | TransformSpec::R2c | TransformSpec::C2r => {
                self.output.n().iter().product()
            }
            TransformSpec::R2r(kinds) => kinds
                .iter()
                .zip(self.output.n())
                .map(|(kind, &n)| kind.logical_dimension(n))
                .product(),
        };
        <I::Real as Scalar>::cast(1.0 / logical as f64)
    }

    /// Scale the bound output by [`Plan::normalization`].
    pub fn normalize_output(&mut self) {
        let factor = self.normalization();
        self.output.scale(factor);
    }

    /// Release the engine handle now. Later calls do nothing.
    pub fn destroy(&mut self) {
        self.handle.release();
    }

    /// Release the handle and give the views back.
    #[must_use]
    pub fn into_views(self) -> (View<'a, I>, View<'a, O>) {
        let Self {
            input,
            output,
            mut handle,
            ..
        } = self;
        handle.release();
        (input, output)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.handle.raw.is_none()
    }

    #[must_use]
    pub fn handle_id(&self) -> Option<u64> {
        self.handle.raw().map(EngineHandle::id)
    }

    /// Whether construction reused stored wisdom.
    #[must_use]
    pub fn wisdom_hit(&self) -> bool {
        self.handle.raw().is_some_and(EngineHandle::wisdom_hit)
    }

    #[must_use]
    pub fn recipe(&self) -> Option<&[Algorithm]> {
        self.handle.raw().map(EngineHandle::recipe)
    }

    #[must_use]
    pub fn flag(&self) -> Flag {
        self.flag
    }

    #[must_use]
    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    #[must_use]
    pub fn precision(&self) -> Precision {
        <I::Real as Scalar>::PRECISION
    }

    #[must_use]
    pub fn transform_kind(&self) -> TransformKind {
        self.spec.kind()
    }

    #[must_use]
    pub fn spec(&self) -> &TransformSpec {
        &self.spec
    }

    /// Direction of a C2C plan.
    #[must_use]
    pub fn direction(&self) -> Option<Direction> {
        match self.spec {
            TransformSpec::C2c(direction) => Some(direction),
            _ => None,
        }
    }

    /// Per-axis kinds of a R2R plan.
    #[must_use]
    pub fn kinds(&self) -> Option<&[Kind]> {
        match &self.spec {
            TransformSpec::R2r(kinds) => Some(kinds),
            _ => None,
        }
    }

    #[must_use]
    pub fn input(&self) -> &View<'a, I> {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut View<'a, I> {
        &mut self.input
    }

    #[must_use]
    pub fn output(&self) -> &View<'a, O> {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut View<'a, O> {
        &mut self.output
    }
}
