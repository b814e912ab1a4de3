#![no_main]

use arbitrary::Arbitrary;
use fsci_fftw::{Flag, Kind, Layout, Plan, View};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct StridedInput {
    n: u8,
    how_many: u8,
    pad: u8,
    column_major: bool,
    kind: u8,
    samples: Vec<f64>,
}

fuzz_target!(|input: StridedInput| {
    let n = usize::from(input.n % 32) + 2;
    let how_many = usize::from(input.how_many % 4) + 1;
    let embed = n + usize::from(input.pad % 3);
    let layout = if input.column_major {
        Layout::new(1, &[n], how_many, &[embed], how_many, 1)
    } else {
        Layout::new(1, &[n], how_many, &[embed], 1, embed)
    };
    let kind = Kind::ALL[usize::from(input.kind) % Kind::ALL.len()];

    let mut source = vec![0.0f64; layout.size()];
    for (slot, value) in source.iter_mut().zip(&input.samples) {
        if value.is_finite() {
            *slot = value.clamp(-1e6, 1e6);
        }
    }
    let mut output = vec![0.0f64; layout.size()];
    let mut plan = Plan::new(
        View::new(&mut source, layout.clone()),
        View::new(&mut output, layout),
        Flag::ESTIMATE,
        vec![kind],
    );
    plan.execute().expect("estimate plan over a valid layout must run");
    assert!(plan.output().all_finite());
});
