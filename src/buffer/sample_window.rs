// src/buffer/sample_window.rs
//! Fixed-capacity circular store for multi-channel display samples
//!
//! One `SampleWindow` backs one scrolling plot: `capacity` frames of
//! `channels` interleaved f32 samples, written by the processing pipeline and
//! read back by the renderer. The write pointer wraps monotonically; reading
//! from the post-write pointer position and wrapping once yields the retained
//! frames in chronological order.

use crate::error::{ScopeError, ScopeResult};

/// Circular multi-channel sample store with a wrapping write pointer
#[derive(Debug, Clone)]
pub struct SampleWindow {
    /// Frame-major storage, `capacity * channels` values
    data: Vec<f32>,
    /// Capacity in frames
    capacity: usize,
    /// Samples per frame
    channels: usize,
    /// Next frame index to write, always in `[0, capacity)`
    pointer: usize,
}

/// Allocate zero-filled storage, reporting failure instead of aborting.
fn alloc_frames(capacity: usize, channels: usize) -> ScopeResult<Vec<f32>> {
    let len = capacity
        .checked_mul(channels)
        .ok_or_else(|| ScopeError::precondition("window dimensions overflow"))?;
    let mut data: Vec<f32> = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| ScopeError::AllocationFailure {
            component: "sample window",
            requested_bytes: len * std::mem::size_of::<f32>(),
        })?;
    data.resize(len, 0.0);
    Ok(data)
}

impl SampleWindow {
    /// Create a window holding `capacity` frames of `channels` samples.
    pub fn new(capacity: usize, channels: usize) -> ScopeResult<Self> {
        if capacity == 0 {
            return Err(ScopeError::precondition("window capacity must be at least 1 frame"));
        }
        let data = alloc_frames(capacity, channels)?;
        Ok(Self {
            data,
            capacity,
            channels,
            pointer: 0,
        })
    }

    /// Replace storage with a new shape, zero-filled, pointer reset to 0.
    ///
    /// All-or-nothing: the new storage is fully allocated before the old one
    /// is released, so on error the previous contents and pointer stay valid.
    pub fn reallocate(&mut self, capacity: usize, channels: usize) -> ScopeResult<()> {
        if capacity == 0 {
            return Err(ScopeError::precondition("window capacity must be at least 1 frame"));
        }
        let data = alloc_frames(capacity, channels)?;
        self.data = data;
        self.capacity = capacity;
        self.channels = channels;
        self.pointer = 0;
        Ok(())
    }

    /// Write consecutive frames starting at the pointer, wrapping at capacity.
    ///
    /// Equivalent to appending `samples` to an unbounded stream and retaining
    /// the most recent `capacity` frames. A chunk longer than the window keeps
    /// only its tail; the overwritten prefix is skipped, not copied. At most
    /// two contiguous copies are performed.
    pub fn write(&mut self, samples: &[f32]) -> ScopeResult<()> {
        if self.channels == 0 {
            return Ok(());
        }
        if samples.len() % self.channels != 0 {
            return Err(ScopeError::precondition(format!(
                "sample slice length {} is not a multiple of {} channels",
                samples.len(),
                self.channels
            )));
        }
        let frames = samples.len() / self.channels;
        if frames == 0 {
            return Ok(());
        }

        let retained = frames.min(self.capacity);
        let skipped = frames - retained;
        let src = &samples[skipped * self.channels..];

        let start = (self.pointer + skipped) % self.capacity;
        let first = retained.min(self.capacity - start);
        let second = retained - first;

        let ch = self.channels;
        self.data[start * ch..(start + first) * ch].copy_from_slice(&src[..first * ch]);
        if second > 0 {
            self.data[..second * ch].copy_from_slice(&src[first * ch..]);
        }

        self.pointer = (self.pointer + frames) % self.capacity;
        Ok(())
    }

    /// Next write position; equivalently, the oldest retained frame.
    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// Capacity in frames
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples per frame
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Raw physical storage, frame-major.
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    /// A contiguous logical range as up to two physical slices.
    ///
    /// Logical frame 0 is the oldest retained frame (at the pointer); the
    /// slices are returned in chronological order. `start + count` must not
    /// exceed the capacity.
    pub fn logical_range(&self, start: usize, count: usize) -> ScopeResult<(&[f32], &[f32])> {
        if start + count > self.capacity {
            return Err(ScopeError::precondition(format!(
                "range {}..{} exceeds window capacity {}",
                start,
                start + count,
                self.capacity
            )));
        }
        let ch = self.channels;
        let phys = (self.pointer + start) % self.capacity;
        let first = count.min(self.capacity - phys);
        let second = count - first;
        Ok((
            &self.data[phys * ch..(phys + first) * ch],
            &self.data[..second * ch],
        ))
    }

    /// Copy the full window into `out` in chronological order.
    pub fn chronological_into(&self, out: &mut Vec<f32>) {
        out.clear();
        // Infallible: the full window is always a valid range.
        let (head, tail) = self
            .logical_range(0, self.capacity)
            .unwrap_or((&[], &[]));
        out.extend_from_slice(head);
        out.extend_from_slice(tail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chronological(window: &SampleWindow) -> Vec<f32> {
        let mut out = Vec::new();
        window.chronological_into(&mut out);
        out
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(SampleWindow::new(0, 4).is_err());
        let mut window = SampleWindow::new(4, 1).unwrap();
        window.write(&[1.0, 2.0]).unwrap();
        assert!(window.reallocate(0, 1).is_err());
        // Previous configuration untouched after the failed reallocation
        assert_eq!(window.capacity(), 4);
        assert_eq!(window.pointer(), 2);
    }

    #[test]
    fn test_single_frame_writes_wrap() {
        let mut window = SampleWindow::new(4, 1).unwrap();
        for v in 1..=5 {
            window.write(&[v as f32]).unwrap();
        }
        assert_eq!(chronological(&window), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(window.pointer(), 1);
    }

    #[test]
    fn test_write_spanning_the_boundary() {
        let mut window = SampleWindow::new(5, 1).unwrap();
        window.write(&[1.0, 2.0, 3.0]).unwrap();
        window.write(&[4.0, 5.0, 6.0, 7.0]).unwrap();
        assert_eq!(window.pointer(), 2);
        assert_eq!(chronological(&window), vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_oversized_write_keeps_tail() {
        let mut window = SampleWindow::new(4, 1).unwrap();
        window.write(&[0.5]).unwrap(); // move the pointer off zero
        let chunk: Vec<f32> = (1..=11).map(|v| v as f32).collect();
        window.write(&chunk).unwrap();
        assert_eq!(chronological(&window), vec![8.0, 9.0, 10.0, 11.0]);
        // pointer advanced by the full logical chunk length
        assert_eq!(window.pointer(), (1 + 11) % 4);
    }

    #[test]
    fn test_exact_capacity_write() {
        let mut window = SampleWindow::new(3, 1).unwrap();
        window.write(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(window.pointer(), 0);
        assert_eq!(chronological(&window), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_multichannel_frames_stay_interleaved() {
        let mut window = SampleWindow::new(3, 2).unwrap();
        window.write(&[1.0, 10.0, 2.0, 20.0]).unwrap();
        window.write(&[3.0, 30.0, 4.0, 40.0]).unwrap();
        assert_eq!(
            chronological(&window),
            vec![2.0, 20.0, 3.0, 30.0, 4.0, 40.0]
        );
    }

    #[test]
    fn test_misaligned_slice_rejected() {
        let mut window = SampleWindow::new(4, 2).unwrap();
        assert!(window.write(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_logical_range_split() {
        let mut window = SampleWindow::new(4, 1).unwrap();
        for v in 1..=6 {
            window.write(&[v as f32]).unwrap();
        }
        // retained: 3,4,5,6 with pointer at 2
        let (head, tail) = window.logical_range(1, 3).unwrap();
        let collected: Vec<f32> = head.iter().chain(tail.iter()).copied().collect();
        assert_eq!(collected, vec![4.0, 5.0, 6.0]);
        assert!(window.logical_range(2, 3).is_err());
    }

    #[test]
    fn test_reallocate_resets_pointer_and_contents() {
        let mut window = SampleWindow::new(4, 1).unwrap();
        window.write(&[1.0, 2.0, 3.0]).unwrap();
        window.reallocate(6, 2).unwrap();
        assert_eq!(window.pointer(), 0);
        assert_eq!(window.capacity(), 6);
        assert_eq!(window.channels(), 2);
        assert!(window.as_flat().iter().all(|&v| v == 0.0));
    }
}
