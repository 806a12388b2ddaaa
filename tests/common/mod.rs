//! In-memory probe and decoder shared by the integration tests.
//!
//! Videos are empty files in a temporary directory. The probe answers from
//! a table keyed by `class/file`, and the decoder produces one-element
//! frames holding each frame's flat index, so a test can check exactly
//! which frame a read returned.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use framefold::{FolderOptions, FrameSource, FramefoldError, SequentialDecoder, VideoFolder};
use ndarray::{Array1, array};
use tempfile::TempDir;

/// `class/file` of a path, the key used by the mock tables.
pub fn key(path: &Path) -> String {
    let file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let class = path
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{class}/{file}")
}

#[derive(Debug, Clone, Default)]
pub struct MockProbe {
    pub counts: HashMap<String, Option<u64>>,
    pub calls: Arc<AtomicUsize>,
}

impl framefold::FrameCountProbe for MockProbe {
    fn frame_count(&self, path: &Path) -> Result<Option<u64>, FramefoldError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.counts.get(&key(path)).copied().flatten())
    }
}

#[derive(Debug, Default)]
pub struct DecodeStats {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub decoded: AtomicU64,
}

impl DecodeStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn decoded(&self) -> u64 {
        self.decoded.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.opened() - self.closed()
    }
}

/// Decoder over `class/file -> (first flat index, real frame count)`.
#[derive(Debug, Clone, Default)]
pub struct MockDecoder {
    pub videos: HashMap<String, (u64, u64)>,
    pub stats: Arc<DecodeStats>,
}

pub struct MockSource {
    base: u64,
    length: u64,
    next: u64,
    stats: Arc<DecodeStats>,
}

impl FrameSource for MockSource {
    type Frame = Array1<u64>;

    fn next_frame(&mut self) -> Result<Option<Array1<u64>>, FramefoldError> {
        if self.next >= self.length {
            return Ok(None);
        }
        self.stats.decoded.fetch_add(1, Ordering::SeqCst);
        let frame = array![self.base + self.next];
        self.next += 1;
        Ok(Some(frame))
    }

    fn close(self) {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl SequentialDecoder for MockDecoder {
    type Frame = Array1<u64>;
    type Source = MockSource;

    fn open(&self, path: &Path) -> Result<MockSource, FramefoldError> {
        let (base, length) =
            self.videos
                .get(&key(path))
                .copied()
                .ok_or_else(|| FramefoldError::FileOpen {
                    path: path.to_path_buf(),
                    reason: "unknown mock video".to_string(),
                })?;
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockSource {
            base,
            length,
            next: 0,
            stats: Arc::clone(&self.stats),
        })
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub probe: MockProbe,
    pub decoder: MockDecoder,
}

impl Fixture {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn stats(&self) -> Arc<DecodeStats> {
        Arc::clone(&self.decoder.stats)
    }

    pub fn dataset(&self) -> VideoFolder<MockDecoder> {
        self.dataset_with(&FolderOptions::new())
    }

    pub fn dataset_with(&self, options: &FolderOptions) -> VideoFolder<MockDecoder> {
        VideoFolder::build(self.root(), options, &self.probe, self.decoder.clone()).unwrap()
    }
}

/// Create `videos` (given as `class/file`, frame count) in index order.
pub fn layout(videos: &[(&str, u64)]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let mut probe = MockProbe::default();
    let mut decoder = MockDecoder::default();

    let mut base = 0;
    for &(name, frames) in videos {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, b"").unwrap();
        probe.counts.insert(name.to_string(), Some(frames));
        decoder.videos.insert(name.to_string(), (base, frames));
        base += frames;
    }

    Fixture {
        dir,
        probe,
        decoder,
    }
}

/// `cat/a.mp4` (5 frames), `dog/b.mp4` (3) and `dog/c.mp4` (4).
pub fn cats_and_dogs() -> Fixture {
    layout(&[("cat/a.mp4", 5), ("dog/b.mp4", 3), ("dog/c.mp4", 4)])
}

/// The flat index carried by a mock frame.
pub fn flat_of(frame: &Array1<u64>) -> u64 {
    frame[0]
}
