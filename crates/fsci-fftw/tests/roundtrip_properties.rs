//! Property tests for fsci-fftw plan round trips.
//!
//! Convention: {family}_{precision}_{property}
//!
//! Seed replay: `PROPTEST_CASES=1000 cargo test -p fsci-fftw --test roundtrip_properties`
//! Reproduce: `PROPTEST_SEED=<seed> cargo test -p fsci-fftw --test roundtrip_properties`

use fsci_fftw::{Complex32, Complex64, Direction, Element, Flag, Kind, Plan, Scalar, View};
use proptest::prelude::*;
use proptest::sample::select;

fn tolerance<T: Scalar>(n: usize, magnitude: f64) -> f64 {
    (n.max(1) as f64) * T::EPSILON.as_f64() * 64.0 * magnitude.max(1.0)
}

/// Forward plan into `mid`, inverse plan back into a fresh buffer, normalized.
fn real_roundtrip<T>(input: &[T]) -> Vec<T>
where
    T: Scalar + Element<Real = T>,
    (T, num_complex::Complex<T>): fsci_fftw::TransformPair<Args = ()>,
    (num_complex::Complex<T>, T): fsci_fftw::TransformPair<Args = ()>,
    num_complex::Complex<T>: Element<Real = T>,
{
    let n = input.len();
    let mut source = input.to_vec();
    let mut spectrum = vec![num_complex::Complex::<T>::default(); n / 2 + 1];
    let mut restored = vec![T::zero(); n];
    let mut forward = Plan::new(
        View::from_slice(&mut source),
        View::from_slice(&mut spectrum),
        Flag::ESTIMATE,
        (),
    );
    forward.execute().expect("forward should run");
    drop(forward);
    let mut backward = Plan::new(
        View::from_slice(&mut spectrum),
        View::from_slice(&mut restored),
        Flag::ESTIMATE,
        (),
    );
    backward.execute().expect("backward should run");
    backward.normalize_output();
    drop(backward);
    restored
}

fn r2r_roundtrip(input: &[f64], dims: &[usize], kinds: Vec<Kind>) -> Vec<f64> {
    let inverse = kinds.iter().map(|kind| kind.inverse()).collect::<Vec<_>>();
    let mut source = input.to_vec();
    let mut mid = vec![0.0f64; input.len()];
    let mut restored = vec![0.0f64; input.len()];
    let mut forward = Plan::new(
        View::with_dims(&mut source, dims),
        View::with_dims(&mut mid, dims),
        Flag::ESTIMATE,
        kinds,
    );
    forward.execute().expect("forward should run");
    drop(forward);
    let mut backward = Plan::new(
        View::with_dims(&mut mid, dims),
        View::with_dims(&mut restored, dims),
        Flag::ESTIMATE,
        inverse,
    );
    backward.execute().expect("backward should run");
    backward.normalize_output();
    drop(backward);
    restored
}

fn real_signal(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    (1usize..=max_len).prop_flat_map(|n| prop::collection::vec(-10.0f64..10.0, n))
}

// ═══════════════════════════════════════════════════════════════
// Property 1: normalized C2R(R2C(x)) == x in both precisions
// ═══════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn real_f64_roundtrip_recovers_input(input in real_signal(64)) {
        let restored = real_roundtrip(&input);
        let tol = tolerance::<f64>(input.len(), 10.0);
        for (idx, (a, e)) in restored.iter().zip(&input).enumerate() {
            prop_assert!((a - e).abs() <= tol, "idx={} actual={} expected={}", idx, a, e);
        }
    }

    #[test]
    fn real_f32_roundtrip_recovers_input(input in real_signal(48)) {
        let single = input.iter().map(|&v| v as f32).collect::<Vec<_>>();
        let restored = real_roundtrip(&single);
        let tol = tolerance::<f32>(input.len(), 10.0) as f32;
        for (idx, (a, e)) in restored.iter().zip(&single).enumerate() {
            prop_assert!((a - e).abs() <= tol, "idx={} actual={} expected={}", idx, a, e);
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// Property 2: complex round trip with the direction reversed
// ═══════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn complex_f64_roundtrip_recovers_input(
        parts in (1usize..=48).prop_flat_map(|n| prop::collection::vec((-5.0f64..5.0, -5.0f64..5.0), n)),
        direction in select(vec![Direction::Forward, Direction::Backward]),
    ) {
        let input = parts.iter().map(|&(re, im)| Complex64::new(re, im)).collect::<Vec<_>>();
        let n = input.len();
        let mut source = input.clone();
        let mut mid = vec![Complex64::default(); n];
        let mut restored = vec![Complex64::default(); n];
        let mut forward = Plan::new(
            View::from_slice(&mut source),
            View::from_slice(&mut mid),
            Flag::ESTIMATE,
            direction,
        );
        forward.execute().expect("forward should run");
        drop(forward);
        let mut backward = Plan::new(
            View::from_slice(&mut mid),
            View::from_slice(&mut restored),
            Flag::ESTIMATE,
            direction.reversed(),
        );
        backward.execute().expect("backward should run");
        backward.normalize_output();
        drop(backward);
        let tol = tolerance::<f64>(n, 5.0);
        for (a, e) in restored.iter().zip(&input) {
            prop_assert!((a - e).norm() <= tol, "actual={} expected={}", a, e);
        }
    }

    #[test]
    fn complex_f32_roundtrip_recovers_input(
        parts in (1usize..=32).prop_flat_map(|n| prop::collection::vec((-5.0f32..5.0, -5.0f32..5.0), n)),
    ) {
        let input = parts.iter().map(|&(re, im)| Complex32::new(re, im)).collect::<Vec<_>>();
        let n = input.len();
        let mut source = input.clone();
        let mut mid = vec![Complex32::default(); n];
        let mut restored = vec![Complex32::default(); n];
        let mut forward = Plan::new(
            View::from_slice(&mut source),
            View::from_slice(&mut mid),
            Flag::ESTIMATE,
            Direction::Forward,
        );
        forward.execute().expect("forward should run");
        drop(forward);
        let mut backward = Plan::new(
            View::from_slice(&mut mid),
            View::from_slice(&mut restored),
            Flag::ESTIMATE,
            Direction::Backward,
        );
        backward.execute().expect("backward should run");
        backward.normalize_output();
        drop(backward);
        let tol = tolerance::<f32>(n, 5.0) as f32;
        for (a, e) in restored.iter().zip(&input) {
            prop_assert!((a - e).norm() <= tol, "actual={} expected={}", a, e);
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// Property 3: every real-to-real kind is undone by its inverse kind
// ═══════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn r2r_f64_kind_roundtrip_recovers_input(
        (kind, input) in select(Kind::ALL.to_vec()).prop_flat_map(|kind| {
            (Just(kind), (kind.min_len()..=40).prop_flat_map(|n| prop::collection::vec(-10.0f64..10.0, n)))
        }),
    ) {
        let restored = r2r_roundtrip(&input, &[input.len()], vec![kind]);
        let tol = tolerance::<f64>(input.len(), 10.0);
        for (idx, (a, e)) in restored.iter().zip(&input).enumerate() {
            prop_assert!((a - e).abs() <= tol, "kind={:?} idx={} actual={} expected={}", kind, idx, a, e);
        }
    }

    #[test]
    fn r2r_f64_two_axis_roundtrip_recovers_input(
        first in select(Kind::ALL.to_vec()),
        second in select(Kind::ALL.to_vec()),
        rows in 2usize..=6,
        cols in 2usize..=6,
        seed in any::<u64>(),
    ) {
        let input = (0..rows * cols)
            .map(|i| ((seed.wrapping_add(i as u64 * 2_654_435_761) % 2000) as f64) / 100.0 - 10.0)
            .collect::<Vec<_>>();
        let restored = r2r_roundtrip(&input, &[rows, cols], vec![first, second]);
        let tol = tolerance::<f64>(rows * cols, 10.0);
        for (a, e) in restored.iter().zip(&input) {
            prop_assert!((a - e).abs() <= tol, "kinds={:?}/{:?} actual={} expected={}", first, second, a, e);
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// Property 4: kind tables and the R2C size relation
// ═══════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn kind_tables_are_consistent(kind in select(Kind::ALL.to_vec()), n in 2usize..500) {
        prop_assert_eq!(kind.inverse().inverse(), kind);
        let expected = match kind {
            Kind::R2hc | Kind::Hc2r | Kind::Dht => n,
            Kind::DctI => 2 * (n - 1),
            Kind::DstI => 2 * (n + 1),
            _ => 2 * n,
        };
        prop_assert_eq!(kind.logical_dimension(n), expected);
        prop_assert_eq!(kind.inverse().logical_dimension(n), expected);
    }

    #[test]
    fn r2c_output_axis_is_half_plus_one(n in 1usize..200, batch in 1usize..4) {
        let mut real = vec![0.0f64; n * batch];
        let mut half = vec![Complex64::default(); (n / 2 + 1) * batch];
        let mut wider = vec![Complex64::default(); (n / 2 + 2) * batch];
        let real = View::new(&mut real, fsci_fftw::Layout::batched(&[n], batch));
        let half = View::new(&mut half, fsci_fftw::Layout::batched(&[n / 2 + 1], batch));
        let wider = View::new(&mut wider, fsci_fftw::Layout::batched(&[n / 2 + 2], batch));
        prop_assert!(real.transformable(&half));
        prop_assert!(half.transformable(&real));
        prop_assert!(!real.transformable(&wider));
    }
}
