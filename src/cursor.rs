//! Offset-keyed cache of open decode sessions.
//!
//! Several logical streams may be walking through the same video at
//! different positions. Each of them is served by its own
//! [`DecoderCursor`], and the pool keys every cursor by the local offset it
//! will deliver next. A read at offset `k` therefore reuses whichever cursor
//! is waiting at `k`; only a miss opens a new session, which then discards
//! `k` frames before producing its first one. A cursor that has just
//! delivered its video's final frame is closed immediately.

use std::collections::HashMap;
use std::path::Path;

use crate::decoder::{FrameSource, SequentialDecoder};
use crate::error::FramefoldError;

/// A live decode session positioned at `expected_next_offset`.
///
/// The cursor exclusively owns its source; closing the cursor consumes it,
/// so a source is released exactly once.
pub(crate) struct DecoderCursor<S> {
    source: S,
    expected_next_offset: u64,
    /// Frames still to be discarded before the first read.
    pending_skip: u64,
}

impl<S: FrameSource> DecoderCursor<S> {
    fn new(source: S, offset: u64) -> Self {
        Self {
            source,
            expected_next_offset: offset,
            pending_skip: offset,
        }
    }

    fn read(&mut self, path: &Path) -> Result<S::Frame, FramefoldError> {
        let offset = self.expected_next_offset;

        if self.pending_skip > 0 {
            let wanted = self.pending_skip;
            let skipped = self.source.skip_frames(wanted)?;
            if skipped < wanted {
                return Err(FramefoldError::Decode {
                    path: path.to_path_buf(),
                    offset,
                    reason: format!("video ended after {skipped} frames while skipping to offset {wanted}"),
                });
            }
            self.pending_skip = 0;
        }

        let frame = self
            .source
            .next_frame()?
            .ok_or_else(|| FramefoldError::Decode {
                path: path.to_path_buf(),
                offset,
                reason: "video ended before the requested frame".to_string(),
            })?;

        self.expected_next_offset += 1;
        Ok(frame)
    }

    fn close(self) {
        self.source.close();
    }
}

/// One slot per video, each mapping an expected offset to its cursor.
pub(crate) struct CursorPool<S> {
    slots: Vec<HashMap<u64, DecoderCursor<S>>>,
}

impl<S: FrameSource> CursorPool<S> {
    pub(crate) fn new(video_count: usize) -> Self {
        Self {
            slots: (0..video_count).map(|_| HashMap::new()).collect(),
        }
    }

    /// Read the frame at `offset` of video `video_index`, reusing a cursor
    /// waiting at that offset or opening one through `decoder`.
    ///
    /// When `is_last` is set the cursor is closed after the read instead of
    /// being returned to the pool. A cursor whose read fails is closed too.
    pub(crate) fn read_frame<D>(
        &mut self,
        decoder: &D,
        path: &Path,
        video_index: usize,
        offset: u64,
        is_last: bool,
    ) -> Result<S::Frame, FramefoldError>
    where
        D: SequentialDecoder<Source = S, Frame = S::Frame>,
    {
        let slot = &mut self.slots[video_index];

        let mut cursor = match slot.remove(&offset) {
            Some(cursor) => {
                log::trace!("Cursor hit: {} @ {offset}", path.display());
                cursor
            }
            None => {
                log::debug!(
                    "Cursor miss: opening {} and skipping {offset} frames",
                    path.display()
                );
                DecoderCursor::new(decoder.open(path)?, offset)
            }
        };

        let frame = match cursor.read(path) {
            Ok(frame) => frame,
            Err(error) => {
                cursor.close();
                return Err(error);
            }
        };

        if is_last {
            log::debug!("Evicting cursor for {} after its last frame", path.display());
            cursor.close();
        } else {
            let next = cursor.expected_next_offset;
            if let Some(displaced) = slot.insert(next, cursor) {
                log::warn!(
                    "Two cursors reached offset {next} of {}; closing the redundant one",
                    path.display()
                );
                displaced.close();
            }
        }

        Ok(frame)
    }

    /// Close every cursor of every video. Returns how many were closed.
    pub(crate) fn release(&mut self) -> usize {
        let mut closed = 0;
        for slot in &mut self.slots {
            for (_, cursor) in slot.drain() {
                cursor.close();
                closed += 1;
            }
        }
        closed
    }

    /// Number of open cursors across all videos.
    pub(crate) fn open_count(&self) -> usize {
        self.slots.iter().map(HashMap::len).sum()
    }

    /// Expected next offsets of the open cursors of one video, ascending.
    pub(crate) fn offsets(&self, video_index: usize) -> Vec<u64> {
        let mut offsets: Vec<u64> = self
            .slots
            .get(video_index)
            .map(|slot| slot.keys().copied().collect())
            .unwrap_or_default();
        offsets.sort_unstable();
        offsets
    }
}
