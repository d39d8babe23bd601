//! Benchmarks for packet routing, analysis and seeking.
//!
//! Run with: cargo bench
//!
//! The in-memory benchmarks always run; the FFmpeg ones require fixture
//! files from `tests/fixtures/generate_fixtures.sh`.

#[path = "../tests/support/mod.rs"]
mod support;

use std::path::Path;

use avdemux::{AnalyseLevel, AnalyseOptions, FfmpegLogLevel, InputFile};
use criterion::{BatchSize, Criterion};

use support::interleaved;

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

fn benchmark_routing(criterion: &mut Criterion) {
    criterion.bench_function("route 10k packets (one buffered stream)", |bencher| {
        bencher.iter_batched(
            || {
                let mut file = InputFile::from_container("bench.mkv", interleaved(5_000, 50))
                    .expect("open");
                file.set_stream_buffered(0, true).expect("buffer");
                file
            },
            |mut file| {
                while file.read_next_packet(0).expect("read") {
                    while file.pop_packet(0).expect("pop").is_some() {}
                }
            },
            BatchSize::SmallInput,
        );
    });

    criterion.bench_function("route 10k packets (all streams buffered)", |bencher| {
        bencher.iter_batched(
            || {
                let mut file = InputFile::from_container("bench.mkv", interleaved(5_000, 50))
                    .expect("open");
                file.set_stream_buffered(0, true).expect("buffer");
                file.set_stream_buffered(1, true).expect("buffer");
                file
            },
            |mut file| {
                while file.read_next_packet(0).expect("read") {
                    while file.pop_packet(0).expect("pop").is_some() {}
                    while file.pop_packet(1).expect("pop").is_some() {}
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn benchmark_analysis(criterion: &mut Criterion) {
    let options = AnalyseOptions::new().with_batch_size(256);

    for level in [AnalyseLevel::FirstGop, AnalyseLevel::Full] {
        criterion.bench_function(&format!("analyse 10k packets ({level:?})"), |bencher| {
            bencher.iter_batched(
                || InputFile::from_container("bench.mkv", interleaved(5_000, 50)).expect("open"),
                |mut file| {
                    file.analyse(&options, level).expect("analyse");
                },
                BatchSize::SmallInput,
            );
        });
    }
}

fn benchmark_seeking(criterion: &mut Criterion) {
    let mut file = InputFile::from_container("bench.mkv", interleaved(5_000, 50)).expect("open");
    file.set_stream_buffered(0, true).expect("buffer");

    criterion.bench_function("seek and read one packet", |bencher| {
        let mut frame = 0;
        bencher.iter(|| {
            frame = (frame + 997) % 5_000;
            file.seek_at_frame(frame).expect("seek");
            file.read_next_packet(0).expect("read");
        });
    });
}

fn benchmark_ffmpeg(criterion: &mut Criterion) {
    if !Path::new(SAMPLE_VIDEO).exists() {
        eprintln!("Skipping FFmpeg benchmarks: fixture not found");
        return;
    }
    avdemux::initialize().expect("initialize");
    avdemux::set_ffmpeg_log_level(FfmpegLogLevel::Error);

    criterion.bench_function("ffmpeg full analysis", |bencher| {
        bencher.iter(|| {
            InputFile::analyse_file(SAMPLE_VIDEO, &AnalyseOptions::new(), AnalyseLevel::Full)
                .expect("analyse")
        });
    });

    criterion.bench_function("ffmpeg read video stream", |bencher| {
        bencher.iter(|| {
            let mut file = InputFile::open(SAMPLE_VIDEO).expect("open");
            file.set_stream_buffered(0, true).expect("buffer");
            while file.read_next_packet(0).expect("read") {
                while file.pop_packet(0).expect("pop").is_some() {}
            }
        });
    });
}

criterion::criterion_group!(
    benches,
    benchmark_routing,
    benchmark_analysis,
    benchmark_seeking,
    benchmark_ffmpeg,
);
criterion::criterion_main!(benches);
