//! Reference transform kernels used by the bundled engine.
//!
//! All transforms are unnormalized, matching the engine convention: a forward
//! transform followed by its inverse scales the data by the logical size.
//! Twiddle angles are evaluated in `f64` and cast to the plan precision.

use std::f64::consts::PI;

use num_complex::Complex;

use crate::engine::Algorithm;
use crate::options::Kind;
use crate::scalar::Scalar;

fn twiddle<T: Scalar>(sign: i32, numerator: usize, denominator: usize) -> Complex<T> {
    let angle = f64::from(sign) * 2.0 * PI * (numerator as f64) / (denominator as f64);
    Complex::new(T::cast(angle.cos()), T::cast(angle.sin()))
}

/// O(n^2) DFT with exponent sign `sign`.
pub(crate) fn dft_direct<T: Scalar>(input: &[Complex<T>], sign: i32) -> Vec<Complex<T>> {
    let n = input.len();
    if n <= 1 {
        return input.to_vec();
    }
    let table = (0..n).map(|i| twiddle::<T>(sign, i, n)).collect::<Vec<_>>();
    (0..n)
        .map(|k| {
            input
                .iter()
                .enumerate()
                .fold(Complex::new(T::zero(), T::zero()), |acc, (t, &value)| {
                    acc + value * table[(k * t) % n]
                })
        })
        .collect()
}

/// Recursive decimation-in-time split on the smallest prime factor.
pub(crate) fn dft_mixed_radix<T: Scalar>(input: &[Complex<T>], sign: i32) -> Vec<Complex<T>> {
    let n = input.len();
    if n <= 1 {
        return input.to_vec();
    }
    let p = smallest_prime_factor(n);
    if p == n {
        return dft_direct(input, sign);
    }
    let m = n / p;
    let subs = (0..p)
        .map(|r| {
            let lane = (0..m).map(|j| input[r + p * j]).collect::<Vec<_>>();
            dft_mixed_radix(&lane, sign)
        })
        .collect::<Vec<_>>();
    (0..n)
        .map(|k| {
            subs.iter()
                .enumerate()
                .fold(Complex::new(T::zero(), T::zero()), |acc, (r, sub)| {
                    acc + sub[k % m] * twiddle::<T>(sign, (r * k) % n, n)
                })
        })
        .collect()
}

pub(crate) fn dft<T: Scalar>(input: &[Complex<T>], sign: i32, algorithm: Algorithm) -> Vec<Complex<T>> {
    match algorithm {
        Algorithm::Direct => dft_direct(input, sign),
        Algorithm::MixedRadix => dft_mixed_radix(input, sign),
    }
}

pub(crate) fn smallest_prime_factor(n: usize) -> usize {
    if n.is_multiple_of(2) {
        return 2;
    }
    let mut p = 3usize;
    while p * p <= n {
        if n.is_multiple_of(p) {
            return p;
        }
        p += 2;
    }
    n
}

pub(crate) fn largest_prime_factor(mut n: usize) -> usize {
    let mut largest = 1;
    while n > 1 {
        let p = smallest_prime_factor(n);
        largest = p;
        while n.is_multiple_of(p) {
            n /= p;
        }
    }
    largest
}

fn to_complex<T: Scalar>(input: &[T]) -> Vec<Complex<T>> {
    input.iter().map(|&re| Complex::new(re, T::zero())).collect()
}

/// One real-to-real transform of kind `kind` over a contiguous lane.
pub(crate) fn r2r_1d<T: Scalar>(kind: Kind, input: &[T], algorithm: Algorithm) -> Vec<T> {
    let n = input.len();
    match kind {
        Kind::R2hc => {
            let spectrum = dft(&to_complex(input), -1, algorithm);
            let mut out = vec![T::zero(); n];
            for k in 0..=n / 2 {
                out[k] = spectrum[k].re;
                if k > 0 && k < n - k {
                    out[n - k] = spectrum[k].im;
                }
            }
            out
        }
        Kind::Hc2r => {
            let mut spectrum = vec![Complex::new(T::zero(), T::zero()); n];
            for k in 0..=n / 2 {
                let im = if k > 0 && k < n - k { input[n - k] } else { T::zero() };
                spectrum[k] = Complex::new(input[k], im);
                if k > 0 && k < n - k {
                    spectrum[n - k] = Complex::new(input[k], -im);
                }
            }
            dft(&spectrum, 1, algorithm).into_iter().map(|z| z.re).collect()
        }
        Kind::Dht => dft(&to_complex(input), -1, algorithm)
            .into_iter()
            .map(|z| z.re - z.im)
            .collect(),
        _ => trig_1d(kind, input),
    }
}

/// Direct evaluation of the eight DCT/DST variants.
fn trig_1d<T: Scalar>(kind: Kind, input: &[T]) -> Vec<T> {
    let n = input.len();
    let two = T::cast(2.0);
    let nf = n as f64;
    let cos = |angle: f64| T::cast(angle.cos());
    let sin = |angle: f64| T::cast(angle.sin());
    let alternate = |k: usize| if k.is_multiple_of(2) { T::one() } else { -T::one() };
    (0..n)
        .map(|k| {
            let kf = k as f64;
            match kind {
                Kind::DctI => {
                    let inner: T = (1..n - 1)
                        .map(|j| input[j] * cos(PI * j as f64 * kf / (nf - 1.0)))
                        .sum();
                    input[0] + alternate(k) * input[n - 1] + two * inner
                }
                Kind::DctII => {
                    two * (0..n)
                        .map(|j| input[j] * cos(PI * (j as f64 + 0.5) * kf / nf))
                        .sum::<T>()
                }
                Kind::DctIII => {
                    let inner: T = (1..n)
                        .map(|j| input[j] * cos(PI * j as f64 * (kf + 0.5) / nf))
                        .sum();
                    input[0] + two * inner
                }
                Kind::DctIV => {
                    two * (0..n)
                        .map(|j| input[j] * cos(PI * (j as f64 + 0.5) * (kf + 0.5) / nf))
                        .sum::<T>()
                }
                Kind::DstI => {
                    two * (0..n)
                        .map(|j| input[j] * sin(PI * (j as f64 + 1.0) * (kf + 1.0) / (nf + 1.0)))
                        .sum::<T>()
                }
                Kind::DstII => {
                    two * (0..n)
                        .map(|j| input[j] * sin(PI * (j as f64 + 0.5) * (kf + 1.0) / nf))
                        .sum::<T>()
                }
                Kind::DstIII => {
                    let inner: T = (0..n - 1)
                        .map(|j| input[j] * sin(PI * (j as f64 + 1.0) * (kf + 0.5) / nf))
                        .sum();
                    alternate(k) * input[n - 1] + two * inner
                }
                Kind::DstIV => {
                    two * (0..n)
                        .map(|j| input[j] * sin(PI * (j as f64 + 0.5) * (kf + 0.5) / nf))
                        .sum::<T>()
                }
                Kind::R2hc | Kind::Hc2r | Kind::Dht => T::zero(),
            }
        })
        .collect()
}

/// Whether `algorithm` changes how `kind` is computed.
pub(crate) fn kind_uses_dft(kind: Kind) -> bool {
    matches!(kind, Kind::R2hc | Kind::Hc2r | Kind::Dht)
}

/// Run `transform` over every lane of `axis` in a dense row-major array.
fn apply_axis<E: Copy>(
    data: &mut [E],
    shape: &[usize],
    axis: usize,
    mut transform: impl FnMut(&[E]) -> Vec<E>,
) {
    let axis_len = shape[axis];
    let stride = shape[axis + 1..].iter().product::<usize>().max(1);
    let repeats = shape[..axis].iter().product::<usize>().max(1);
    let block = axis_len * stride;

    let mut scratch = Vec::with_capacity(axis_len);
    for outer in 0..repeats {
        let outer_base = outer * block;
        for offset in 0..stride {
            scratch.clear();
            scratch.extend((0..axis_len).map(|index| data[outer_base + index * stride + offset]));
            let transformed = transform(&scratch);
            for (index, &value) in transformed.iter().enumerate() {
                data[outer_base + index * stride + offset] = value;
            }
        }
    }
}

/// Complex-to-complex transform of one dense row-major array.
pub(crate) fn c2c<T: Scalar>(data: &mut [Complex<T>], dims: &[usize], sign: i32, recipe: &[Algorithm]) {
    for (axis, &algorithm) in recipe.iter().enumerate().take(dims.len()) {
        apply_axis(data, dims, axis, |lane| dft(lane, sign, algorithm));
    }
}

/// Real-to-complex forward transform; `dims` are the real logical sizes.
pub(crate) fn r2c<T: Scalar>(input: &[T], dims: &[usize], recipe: &[Algorithm]) -> Vec<Complex<T>> {
    let rank = dims.len();
    let last = dims[rank - 1];
    let half = last / 2 + 1;
    let mut out = Vec::with_capacity(input.len() / last * half);
    for row in input.chunks_exact(last) {
        let spectrum = dft(&to_complex(row), -1, recipe[rank - 1]);
        out.extend_from_slice(&spectrum[..half]);
    }
    let mut half_dims = dims.to_vec();
    half_dims[rank - 1] = half;
    for (axis, &algorithm) in recipe.iter().enumerate().take(rank - 1) {
        apply_axis(&mut out, &half_dims, axis, |lane| dft(lane, -1, algorithm));
    }
    out
}

/// Complex-to-real backward transform; `dims` are the real logical sizes.
///
/// Only the stored half spectrum is read; the rest is implied by Hermitian
/// symmetry along the last axis.
pub(crate) fn c2r<T: Scalar>(input: &[Complex<T>], dims: &[usize], recipe: &[Algorithm]) -> Vec<T> {
    let rank = dims.len();
    let last = dims[rank - 1];
    let half = last / 2 + 1;
    let mut work = input.to_vec();
    let mut half_dims = dims.to_vec();
    half_dims[rank - 1] = half;
    for (axis, &algorithm) in recipe.iter().enumerate().take(rank - 1) {
        apply_axis(&mut work, &half_dims, axis, |lane| dft(lane, 1, algorithm));
    }
    let mut out = Vec::with_capacity(work.len() / half * last);
    for row in work.chunks_exact(half) {
        let full = rebuild_hermitian(row, last);
        out.extend(dft(&full, 1, recipe[rank - 1]).into_iter().map(|z| z.re));
    }
    out
}

/// Real-to-real transform with one kind per axis.
pub(crate) fn r2r<T: Scalar>(data: &mut [T], dims: &[usize], kinds: &[Kind], recipe: &[Algorithm]) {
    for (axis, (&kind, &algorithm)) in kinds.iter().zip(recipe).enumerate().take(dims.len()) {
        apply_axis(data, dims, axis, |lane| r2r_1d(kind, lane, algorithm));
    }
}

fn rebuild_hermitian<T: Scalar>(half: &[Complex<T>], n: usize) -> Vec<Complex<T>> {
    let mut full = vec![Complex::new(T::zero(), T::zero()); n];
    full[0] = half[0];
    for (k, &value) in half.iter().enumerate().skip(1).take(n.saturating_sub(1)) {
        full[k] = value;
    }
    for k in half.len()..n {
        full[k] = full[n - k].conj();
    }
    if n.is_multiple_of(2) && n / 2 < full.len() {
        full[n / 2].im = T::zero();
    }
    full[0].im = T::zero();
    full
}
