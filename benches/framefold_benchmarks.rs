//! Benchmarks for index lookup, sampling, collation and the decode cache.
//!
//! Run with: cargo bench
//!
//! The in-memory benchmarks need no fixtures. The FFmpeg-backed ones require
//! fixture files from `tests/fixtures/generate_fixtures.sh`.

use std::hint::black_box;
use std::path::{Path, PathBuf};

use criterion::Criterion;
use ffmpeg_next::util::log::Level as LogLevel;
use framefold::{
    BatchSampler, FrameSource, FramefoldError, SequentialDecoder, VideoCollate, VideoFolder,
    VideoIndex,
};
use ndarray::{Array1, Array3};

const DATASET_ROOT: &str = "tests/fixtures/dataset";

/// Every video is `length` frames of a one-element counter.
#[derive(Clone)]
struct CounterDecoder {
    length: u64,
}

struct CounterSource {
    next: u64,
    length: u64,
}

impl FrameSource for CounterSource {
    type Frame = Array1<u64>;

    fn next_frame(&mut self) -> Result<Option<Array1<u64>>, FramefoldError> {
        if self.next >= self.length {
            return Ok(None);
        }
        self.next += 1;
        Ok(Some(Array1::from_elem(1, self.next - 1)))
    }
}

impl SequentialDecoder for CounterDecoder {
    type Frame = Array1<u64>;
    type Source = CounterSource;

    fn open(&self, _path: &Path) -> Result<CounterSource, FramefoldError> {
        Ok(CounterSource {
            next: 0,
            length: self.length,
        })
    }
}

fn synthetic_index(videos: usize, frames_per_video: u64) -> VideoIndex {
    VideoIndex::from_entries(
        "synthetic",
        vec!["a".into(), "b".into()],
        (0..videos).map(|video| {
            (
                PathBuf::from(format!("{}/{video:06}.mp4", if video % 2 == 0 { "a" } else { "b" })),
                video % 2,
                frames_per_video,
            )
        }),
    )
    .unwrap()
}

fn benchmark_locate(criterion: &mut Criterion) {
    let index = synthetic_index(100_000, 300);
    let total = index.total_frames();

    criterion.bench_function("locate (100k videos)", |bencher| {
        let mut flat = 0_u64;
        bencher.iter(|| {
            flat = (flat + 7_919) % total;
            black_box(index.locate(black_box(flat)).unwrap());
        });
    });
}

fn benchmark_sampler(criterion: &mut Criterion) {
    let sampler = BatchSampler::new(1_000_000, 32).unwrap();

    criterion.bench_function("sampler full pass (1M frames, B=32)", |bencher| {
        bencher.iter(|| black_box(sampler.iter().fold(0_u64, u64::wrapping_add)));
    });
}

fn benchmark_collate(criterion: &mut Criterion) {
    let collate = VideoCollate::new(8).unwrap();

    criterion.bench_function("collate 16x8 frames of 64x64x3", |bencher| {
        bencher.iter(|| {
            let samples = (0..128).map(|i| (Array3::<u8>::zeros((64, 64, 3)), i as usize));
            black_box(collate.collate_from::<u8, _, _>(samples).unwrap());
        });
    });
}

fn benchmark_cursor_cache(criterion: &mut Criterion) {
    let index = synthetic_index(64, 500).into_shared();

    criterion.bench_function("loader epoch over cached cursors (32k frames)", |bencher| {
        bencher.iter(|| {
            let mut dataset =
                VideoFolder::from_index(index.clone(), CounterDecoder { length: 500 });
            let batches = dataset
                .loader(16, 32)
                .unwrap()
                .with_release_at_end(true)
                .map(Result::unwrap)
                .count();
            black_box(batches);
        });
    });
}

fn benchmark_ffmpeg_dataset(criterion: &mut Criterion) {
    ffmpeg_next::util::log::set_level(LogLevel::Error);

    if !Path::new(DATASET_ROOT).exists() {
        eprintln!("Skipping benchmark: fixture not found");
        return;
    }

    criterion.bench_function("index fixture dataset", |bencher| {
        bencher.iter(|| black_box(VideoFolder::open(DATASET_ROOT).unwrap().len()));
    });

    criterion.bench_function("walk fixture dataset (B=3, T=5)", |bencher| {
        bencher.iter(|| {
            let mut dataset = VideoFolder::open(DATASET_ROOT).unwrap();
            let batches = dataset.loader(3, 5).unwrap().map(Result::unwrap).count();
            dataset.release();
            black_box(batches);
        });
    });
}

criterion::criterion_group!(
    benches,
    benchmark_locate,
    benchmark_sampler,
    benchmark_collate,
    benchmark_cursor_cache,
    benchmark_ffmpeg_dataset,
);
criterion::criterion_main!(benches);
