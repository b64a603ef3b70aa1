use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ffdot::{ffdot_plane, kernel, Accuracy, Correlator, PlaneRequest};
use num_complex::Complex;
use rand::prelude::*;

const BENCH_SPECTRUM_BINS: usize = 1 << 16;

fn noise_spectrum(len: usize) -> Vec<Complex<f32>> {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| Complex::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
        .collect()
}

pub fn gen_response(c: &mut Criterion) {
    c.bench_function("gen_response", |b| {
        b.iter(|| kernel::gen_response(black_box(8), black_box(20), black_box(40.0)))
    });
}

pub fn correlate_row(c: &mut Criterion) {
    let spectrum = noise_spectrum(BENCH_SPECTRUM_BINS);
    let corr = Correlator::<f32>::new(1024, 8, 20).unwrap();
    c.bench_function("correlate_row", |b| {
        b.iter(|| {
            corr.correlate(black_box(&spectrum), black_box(30000), black_box(12.5), 512)
                .unwrap()
        })
    });
}

pub fn build_plane(c: &mut Criterion) {
    let spectrum = noise_spectrum(BENCH_SPECTRUM_BINS);
    let request = PlaneRequest {
        r: 30000.0,
        dr: 0.125,
        numr: 128,
        z: 0.0,
        dz: 0.5,
        numz: 64,
    };
    c.bench_function("build_plane", |b| {
        b.iter(|| ffdot_plane(black_box(&spectrum), black_box(&request), Accuracy::Low).unwrap())
    });
}

criterion_group!(benches, gen_response, correlate_row, build_plane);
criterion_main!(benches);
