//! Epoch iteration: sampler, dataset and collator together.

mod common;

use std::sync::{Arc, Mutex};

use framefold::{FramefoldError, OperationType, ProgressCallback, ProgressInfo, VideoLoader};
use ndarray::{Axis, IxDyn};

use common::{cats_and_dogs, layout};

#[test]
fn one_epoch_in_two_batches() {
    let fixture = cats_and_dogs();
    let mut dataset = fixture.dataset();

    // 12 frames, B = 5: rows = 3; T = 2 gives batches of 2 rows and 1 row.
    let loader = dataset.loader(5, 2).unwrap();
    assert_eq!(loader.batch_count(), 2);
    let batches: Vec<_> = loader.map(Result::unwrap).collect();
    assert_eq!(batches.len(), 2);

    let first = batches[0].clone().into_tuple().unwrap();
    assert_eq!(first[0].shape(), Some(&[2, 5, 1][..]));
    assert_eq!(first[1].shape(), Some(&[2, 5][..]));

    let last = batches[1].clone().into_tuple().unwrap();
    assert_eq!(last[0].shape(), Some(&[1, 5, 1][..]));
}

#[test]
fn frames_follow_the_sampler_with_wraparound() {
    let fixture = cats_and_dogs();
    let mut dataset = fixture.dataset();

    let batch = dataset.loader(5, 3).unwrap().next().unwrap().unwrap();
    let parts = batch.into_tuple().unwrap();
    let frames = parts[0].as_tensor().unwrap();
    let labels = parts[1].as_scalars().unwrap();

    // Row 0 of the sampler is 0 3 6 9 12, and 12 wraps to 0.
    let row: Vec<u64> = frames
        .index_axis(Axis(0), 0)
        .index_axis(Axis(1), 0)
        .iter()
        .copied()
        .collect();
    assert_eq!(row, vec![0, 3, 6, 9, 0]);
    assert_eq!(labels.row(0).to_vec(), vec![0, 0, 1, 1, 0]);
    assert_eq!(frames[IxDyn(&[2, 4, 0])], 2);
}

#[test]
fn each_stream_keeps_a_single_session_busy() {
    let fixture = layout(&[("cat/long.mp4", 40)]);
    let stats = fixture.stats();
    let mut dataset = fixture.dataset();

    let mut loader = dataset.loader(4, 5).unwrap();
    while let Some(batch) = loader.next() {
        batch.unwrap();
        assert!(loader.dataset().open_cursor_count() <= 4);
    }
    drop(loader);

    assert_eq!(stats.opened(), 4);
    // 0 + 10 + 20 + 30 frames skipped, 40 read.
    assert_eq!(stats.decoded(), 100);
}

#[test]
fn release_at_end_closes_sessions() {
    let fixture = layout(&[("cat/long.mp4", 40)]);
    let stats = fixture.stats();
    let mut dataset = fixture.dataset();

    let count = dataset
        .loader(3, 4)
        .unwrap()
        .with_release_at_end(true)
        .map(Result::unwrap)
        .count();
    assert_eq!(count, 4);
    assert_eq!(dataset.open_cursor_count(), 0);
    assert_eq!(stats.live(), 0);
}

#[test]
fn empty_dataset_yields_no_batches() {
    let dir = tempfile::tempdir().unwrap();
    let mut dataset = framefold::VideoFolder::build(
        dir.path(),
        &framefold::FolderOptions::new(),
        &common::MockProbe::default(),
        common::MockDecoder::default(),
    )
    .unwrap();
    assert_eq!(dataset.loader(2, 2).unwrap().count(), 0);
}

#[test]
fn zero_arguments_are_rejected() {
    let fixture = cats_and_dogs();
    let mut dataset = fixture.dataset();
    assert!(matches!(
        VideoLoader::new(&mut dataset, 0, 4).err(),
        Some(FramefoldError::InvalidBatchSize)
    ));
    assert!(matches!(
        VideoLoader::new(&mut dataset, 4, 0).err(),
        Some(FramefoldError::InvalidBatchSize)
    ));
}

#[test]
fn decode_error_ends_the_epoch() {
    let mut fixture = cats_and_dogs();
    fixture
        .decoder
        .videos
        .insert("dog/c.mp4".to_string(), (8, 1));
    let mut dataset = fixture.dataset();

    let results: Vec<_> = dataset.loader(4, 3).unwrap().collect();
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(FramefoldError::Decode { .. })));
}

struct Recorder {
    updates: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for Recorder {
    fn on_progress(&self, info: &ProgressInfo) {
        self.updates.lock().unwrap().push(info.clone());
    }
}

#[test]
fn loading_reports_one_update_per_batch() {
    let fixture = cats_and_dogs();
    let mut dataset = fixture.dataset();
    let recorder = Arc::new(Recorder {
        updates: Mutex::new(Vec::new()),
    });

    let count = dataset
        .loader(2, 2)
        .unwrap()
        .with_progress(recorder.clone())
        .map(Result::unwrap)
        .count();
    assert_eq!(count, 3);

    let updates = recorder.updates.lock().unwrap();
    let last = updates.last().unwrap();
    assert_eq!(last.operation, OperationType::Loading);
    assert_eq!(last.current, 3);
    assert_eq!(last.total, Some(3));
    assert_eq!(last.frames, 12);
}
