// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Temporal frame grouping.
//!
//! A chronologically sorted frame sequence is cut into windows of exactly
//! `n_frames` consecutive frames where no two neighbours are more than
//! `max_time_diff` milliseconds apart. Frames that cannot complete a window
//! are dropped, so a regrouped split usually holds fewer frames than the raw
//! one.

use crate::frames::FrameHandle;

/// Default number of frames per group.
pub const DEFAULT_N_FRAMES: usize = 8;

/// Default maximum gap between consecutive frames, in milliseconds.
pub const DEFAULT_MAX_TIME_DIFF: u64 = 1000;

/// A completed window of frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Position among the retained groups, starting at zero.
    pub index: usize,
    /// Exactly `n_frames` frames in chronological order.
    pub frames: Vec<FrameHandle>,
}

impl Group {
    /// Zero padded directory name, e.g. `0007`.
    pub fn id(&self) -> String {
        group_id(self.index)
    }

    /// Timestamp of the first frame.
    pub fn start_ms(&self) -> Option<i64> {
        self.frames.first().map(|f| f.timestamp_ms)
    }
}

/// Directory name of the group at `index`.
pub fn group_id(index: usize) -> String {
    format!("{:04}", index)
}

/// Partitions frame sequences into fixed-length, time-bounded groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGrouper {
    n_frames: usize,
    max_time_diff: u64,
}

impl Default for FrameGrouper {
    fn default() -> Self {
        Self {
            n_frames: DEFAULT_N_FRAMES,
            max_time_diff: DEFAULT_MAX_TIME_DIFF,
        }
    }
}

impl FrameGrouper {
    /// Create a grouper. A group size of zero is treated as one.
    pub fn new(n_frames: usize, max_time_diff: u64) -> Self {
        Self {
            n_frames: n_frames.max(1),
            max_time_diff,
        }
    }

    /// Frames per group.
    pub fn n_frames(&self) -> usize {
        self.n_frames
    }

    /// Maximum allowed gap in milliseconds.
    pub fn max_time_diff(&self) -> u64 {
        self.max_time_diff
    }

    /// Group frame handles, numbering the retained groups densely.
    pub fn group(&self, frames: Vec<FrameHandle>) -> Vec<Group> {
        self.windows(frames, |f| f.timestamp_ms)
            .into_iter()
            .enumerate()
            .map(|(index, frames)| Group { index, frames })
            .collect()
    }

    /// Core single pass over any timestamped items.
    ///
    /// A window accepts the next item while the gap to the previous item is
    /// within `max_time_diff` and the window is not full. On a break the
    /// window is kept only if it holds exactly `n_frames` items, and the
    /// breaking item opens the next window. The open window at the end of the
    /// input follows the same rule.
    pub fn windows<T, F>(&self, items: impl IntoIterator<Item = T>, timestamp: F) -> Vec<Vec<T>>
    where
        F: Fn(&T) -> i64,
    {
        let mut completed = Vec::new();
        let mut window: Vec<T> = Vec::with_capacity(self.n_frames);
        let mut previous: Option<i64> = None;

        for item in items {
            let ts = timestamp(&item);
            let extends = match previous {
                Some(prev) => {
                    prev.abs_diff(ts) <= self.max_time_diff && window.len() < self.n_frames
                }
                None => false,
            };

            if !extends && !window.is_empty() {
                let closed = std::mem::replace(&mut window, Vec::with_capacity(self.n_frames));
                if closed.len() == self.n_frames {
                    completed.push(closed);
                }
            }

            window.push(item);
            previous = Some(ts);
        }

        if window.len() == self.n_frames {
            completed.push(window);
        }

        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Camera, Split};
    use std::path::PathBuf;

    fn frames_at(timestamps: &[i64]) -> Vec<FrameHandle> {
        timestamps
            .iter()
            .map(|&ts| FrameHandle {
                camera: Camera::Rgb,
                split: Split::new("train"),
                stem: format!("frame_{ts}"),
                timestamp_ms: ts,
                path: PathBuf::from(format!("frame_{ts}.jpg")),
            })
            .collect()
    }

    fn starts(groups: &[Group]) -> Vec<Vec<i64>> {
        groups
            .iter()
            .map(|g| g.frames.iter().map(|f| f.timestamp_ms).collect())
            .collect()
    }

    #[test]
    fn test_gap_and_size_breaks() {
        let grouper = FrameGrouper::new(2, 200);
        let groups = grouper.group(frames_at(&[0, 150, 1100, 1250, 1400]));
        assert_eq!(starts(&groups), vec![vec![0, 150], vec![1100, 1250]]);
        assert_eq!(groups[0].id(), "0000");
        assert_eq!(groups[1].id(), "0001");
    }

    #[test]
    fn test_single_frame_yields_nothing() {
        let grouper = FrameGrouper::new(8, 1000);
        assert!(grouper.group(frames_at(&[42])).is_empty());
        assert!(grouper.group(Vec::new()).is_empty());
    }

    #[test]
    fn test_short_window_is_dropped_not_carried() {
        // [0, 100] breaks at 5000 with 2 < 3 members and is discarded
        let grouper = FrameGrouper::new(3, 500);
        let groups = grouper.group(frames_at(&[0, 100, 5000, 5100, 5200, 5300]));
        assert_eq!(starts(&groups), vec![vec![5000, 5100, 5200]]);
    }

    #[test]
    fn test_full_window_commits_and_restarts() {
        let grouper = FrameGrouper::new(2, 1000);
        let groups = grouper.group(frames_at(&[0, 10, 20, 30, 40]));
        assert_eq!(starts(&groups), vec![vec![0, 10], vec![20, 30]]);
        assert_eq!(groups.iter().map(|g| g.index).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_gap_equal_to_limit_is_accepted() {
        let grouper = FrameGrouper::new(3, 200);
        let groups = grouper.group(frames_at(&[0, 200, 400]));
        assert_eq!(groups.len(), 1);
        let groups = grouper.group(frames_at(&[0, 200, 401]));
        assert!(groups.is_empty());
    }

    #[test]
    fn test_group_invariants_on_irregular_sequence() {
        let grouper = FrameGrouper::new(4, 150);
        let mut timestamps = Vec::new();
        let mut ts = 0i64;
        for i in 0..200i64 {
            // irregular spacing with periodic large holes
            ts += match i % 17 {
                0 => 900,
                5 => 151,
                _ => 40 + (i * 37) % 100,
            };
            timestamps.push(ts);
        }

        let groups = grouper.group(frames_at(&timestamps));
        assert!(!groups.is_empty());

        let mut last_start = i64::MIN;
        for (i, group) in groups.iter().enumerate() {
            assert_eq!(group.index, i);
            assert_eq!(group.frames.len(), 4);
            for pair in group.frames.windows(2) {
                assert!(pair[0].timestamp_ms.abs_diff(pair[1].timestamp_ms) <= 150);
            }
            let start = group.start_ms().unwrap();
            assert!(start >= last_start);
            last_start = start;
        }
    }

    #[test]
    fn test_zero_group_size_is_clamped() {
        let grouper = FrameGrouper::new(0, 100);
        assert_eq!(grouper.n_frames(), 1);
        assert_eq!(grouper.group(frames_at(&[0, 1000])).len(), 2);
    }

    #[test]
    fn test_defaults() {
        let grouper = FrameGrouper::default();
        assert_eq!(grouper.n_frames(), 8);
        assert_eq!(grouper.max_time_diff(), 1000);
    }
}
