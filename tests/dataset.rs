//! Facade reads and the decode session cache behind them.

mod common;

use std::fs;
use std::path::PathBuf;

use framefold::{FolderOptions, FramefoldError, VideoFolder, VideoIndex};

use common::{cats_and_dogs, flat_of, layout};

// ── Reads ──────────────────────────────────────────────────────────

#[test]
fn every_flat_index_returns_its_own_frame_and_label() {
    let fixture = cats_and_dogs();
    let mut dataset = fixture.dataset();

    for flat in 0..dataset.len() {
        let (frame, label) = dataset.get(flat).unwrap();
        assert_eq!(flat_of(&frame), flat);
        assert_eq!(label, if flat < 5 { 0 } else { 1 });
    }
}

#[test]
fn indices_wrap_modulo_the_total() {
    let fixture = cats_and_dogs();
    let mut dataset = fixture.dataset();
    assert_eq!(dataset.len(), 12);

    let (frame, label) = dataset.get(12 + 7).unwrap();
    assert_eq!(flat_of(&frame), 7);
    assert_eq!(label, 1);

    let (frame, _) = dataset.get(3 * 12).unwrap();
    assert_eq!(flat_of(&frame), 0);
}

#[test]
fn empty_dataset_read_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let decoder = common::MockDecoder::default();
    let mut dataset = VideoFolder::build(
        dir.path(),
        &FolderOptions::new(),
        &common::MockProbe::default(),
        decoder,
    )
    .unwrap();

    assert!(dataset.is_empty());
    assert!(matches!(dataset.get(0), Err(FramefoldError::EmptyDataset)));
}

#[test]
fn transforms_apply_to_frames_and_labels() {
    let fixture = cats_and_dogs();
    let mut dataset = fixture
        .dataset()
        .with_transform(|frame| frame * 10)
        .with_target_transform(|label| label + 100);

    let (frame, label) = dataset.get(6).unwrap();
    assert_eq!(flat_of(&frame), 60);
    assert_eq!(label, 101);
}

// ── Session reuse ──────────────────────────────────────────────────

#[test]
fn sequential_walk_decodes_each_frame_once() {
    let fixture = cats_and_dogs();
    let stats = fixture.stats();
    let mut dataset = fixture.dataset();

    for flat in 0..12 {
        dataset.get(flat).unwrap();
    }

    assert_eq!(stats.opened(), 3);
    assert_eq!(stats.decoded(), 12);
}

#[test]
fn cursor_offsets_advance_by_one() {
    let fixture = cats_and_dogs();
    let mut dataset = fixture.dataset();

    dataset.get(0).unwrap();
    assert_eq!(dataset.cursor_offsets(0), vec![1]);
    dataset.get(1).unwrap();
    assert_eq!(dataset.cursor_offsets(0), vec![2]);
    dataset.get(2).unwrap();
    assert_eq!(dataset.cursor_offsets(0), vec![3]);
}

#[test]
fn interleaved_walks_keep_one_session_each() {
    let fixture = layout(&[("cat/long.mp4", 20)]);
    let stats = fixture.stats();
    let mut dataset = fixture.dataset();

    // Two streams, starting at 0 and 10, advancing in lock step.
    for step in 0..5 {
        dataset.get(step).unwrap();
        dataset.get(10 + step).unwrap();
    }

    assert_eq!(stats.opened(), 2);
    assert_eq!(dataset.cursor_offsets(0), vec![5, 15]);
    // 5 reads from the first stream, 10 skipped plus 5 read from the second.
    assert_eq!(stats.decoded(), 20);
}

#[test]
fn out_of_order_read_opens_a_fresh_session() {
    let fixture = layout(&[("cat/a.mp4", 10)]);
    let stats = fixture.stats();
    let mut dataset = fixture.dataset();

    dataset.get(4).unwrap();
    let (frame, _) = dataset.get(2).unwrap();

    assert_eq!(flat_of(&frame), 2);
    assert_eq!(stats.opened(), 2);
    assert_eq!(dataset.cursor_offsets(0), vec![3, 5]);
}

#[test]
fn cursor_is_pooled_until_its_last_frame() {
    let fixture = cats_and_dogs();
    let stats = fixture.stats();
    let mut dataset = fixture.dataset();

    for flat in 5..7 {
        dataset.get(flat).unwrap();
    }
    assert_eq!(dataset.cursor_offsets(1), vec![2]);
    assert_eq!(dataset.open_cursor_count(), 1);

    dataset.get(7).unwrap();
    assert!(dataset.cursor_offsets(1).is_empty());
    assert_eq!(dataset.open_cursor_count(), 0);
    assert_eq!(stats.live(), 0);
}

#[test]
fn single_frame_video_never_pools() {
    let fixture = layout(&[("cat/still.mp4", 1), ("dog/clip.mp4", 3)]);
    let stats = fixture.stats();
    let mut dataset = fixture.dataset();

    dataset.get(0).unwrap();
    dataset.get(0).unwrap();
    assert_eq!(dataset.open_cursor_count(), 0);
    assert_eq!(stats.opened(), 2);
    assert_eq!(stats.closed(), 2);
}

// ── Release ────────────────────────────────────────────────────────

#[test]
fn release_closes_everything_and_later_reads_reopen() {
    let fixture = cats_and_dogs();
    let stats = fixture.stats();
    let mut dataset = fixture.dataset();

    dataset.get(0).unwrap();
    dataset.get(5).unwrap();
    dataset.get(9).unwrap();
    assert_eq!(dataset.open_cursor_count(), 3);

    assert_eq!(dataset.release(), 3);
    assert_eq!(dataset.open_cursor_count(), 0);
    assert_eq!(stats.live(), 0);

    let (frame, _) = dataset.get(1).unwrap();
    assert_eq!(flat_of(&frame), 1);
    assert_eq!(stats.opened(), 4);
}

#[test]
fn release_on_a_fresh_dataset_is_a_no_op() {
    let fixture = cats_and_dogs();
    let mut dataset = fixture.dataset();
    assert_eq!(dataset.release(), 0);
}

// ── Decode failures ────────────────────────────────────────────────

#[test]
fn video_shorter_than_its_metadata_is_a_decode_error() {
    let mut fixture = cats_and_dogs();
    // Metadata says 4 frames, but only 2 decode.
    fixture
        .decoder
        .videos
        .insert("dog/c.mp4".to_string(), (8, 2));
    let stats = fixture.stats();
    let mut dataset = fixture.dataset();

    let result = dataset.get(10);
    match result {
        Err(FramefoldError::Decode { path, offset, .. }) => {
            assert!(path.ends_with("dog/c.mp4"));
            assert_eq!(offset, 2);
        }
        other => panic!("expected a decode error, got {other:?}"),
    }
    assert_eq!(dataset.open_cursor_count(), 0);
    assert_eq!(stats.live(), 0);
}

#[test]
fn unopenable_video_surfaces_the_decoder_error() {
    let fixture = cats_and_dogs();
    fs::write(fixture.root().join("cat/b.mp4"), b"").unwrap();
    let mut probe = fixture.probe.clone();
    probe.counts.insert("cat/b.mp4".to_string(), Some(2));

    let mut dataset =
        VideoFolder::build(fixture.root(), &FolderOptions::new(), &probe, fixture.decoder.clone())
            .unwrap();
    assert!(matches!(
        dataset.get(5),
        Err(FramefoldError::FileOpen { .. })
    ));
}

// ── Sharing ────────────────────────────────────────────────────────

#[test]
fn fork_shares_the_index_but_not_the_sessions() {
    let fixture = cats_and_dogs();
    let mut dataset = fixture.dataset();
    dataset.get(0).unwrap();

    let mut fork = dataset.fork();
    assert!(std::sync::Arc::ptr_eq(dataset.index(), fork.index()));
    assert_eq!(fork.open_cursor_count(), 0);

    let (frame, _) = fork.get(0).unwrap();
    assert_eq!(flat_of(&frame), 0);
    assert_eq!(dataset.cursor_offsets(0), vec![1]);
}

#[test]
fn from_index_accepts_a_prebuilt_index() {
    let fixture = cats_and_dogs();
    let index = VideoIndex::from_entries(
        fixture.root(),
        vec!["cat".into(), "dog".into()],
        [
            (PathBuf::from("cat/a.mp4"), 0, 5),
            (PathBuf::from("dog/b.mp4"), 1, 3),
            (PathBuf::from("dog/c.mp4"), 1, 4),
        ],
    )
    .unwrap();

    let mut dataset = VideoFolder::from_index(index, fixture.decoder.clone());
    assert_eq!(dataset.classes(), ["cat".to_string(), "dog".to_string()]);
    assert_eq!(flat_of(&dataset.get(11).unwrap().0), 11);
}
