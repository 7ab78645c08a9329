//! Feature extraction benchmarks
//!
//! Run with: cargo bench --bench features

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::Rng;
use voxguard_neural::constants::{SAMPLE_RATE, TARGET_SAMPLES};
use voxguard_neural::resampler::resample;
use voxguard_neural::{FeatureTensor, MelExtractor, Waveform};

fn random_audio(len: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen::<f32>() - 0.5).collect()
}

fn bench_mel(c: &mut Criterion) {
    let extractor = MelExtractor::new();
    let waveform = Waveform::frame(random_audio(TARGET_SAMPLES));

    let mut group = c.benchmark_group("mel_spectrogram");
    group.throughput(Throughput::Elements(TARGET_SAMPLES as u64));

    group.bench_function("extract_4s", |bencher| {
        bencher.iter(|| extractor.extract(black_box(&waveform)))
    });
    group.bench_function("extract_and_package_4s", |bencher| {
        bencher.iter(|| FeatureTensor::from_spectrogram(extractor.extract(black_box(&waveform))))
    });

    group.finish();
}

fn bench_resample(c: &mut Criterion) {
    let rates = [8_000u32, 22_050, 44_100, 48_000];

    let mut group = c.benchmark_group("resample_to_16k");

    for rate in rates {
        let audio = random_audio(rate as usize * 4);
        group.throughput(Throughput::Elements(audio.len() as u64));

        group.bench_function(format!("from_{}", rate), |bencher| {
            bencher.iter(|| resample(black_box(&audio), rate, SAMPLE_RATE))
        });
    }

    group.finish();
}

fn bench_frame(c: &mut Criterion) {
    let long = random_audio(TARGET_SAMPLES * 3);

    c.bench_function("frame_12s_clip", |bencher| {
        bencher.iter(|| Waveform::frame(black_box(long.clone())))
    });
}

criterion_group!(benches, bench_mel, bench_resample, bench_frame);
criterion_main!(benches);
