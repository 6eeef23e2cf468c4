use anyhow::Result;

/// Fixed-capacity FIFO holding the keypoint vectors of the sequence
/// currently being recorded.
///
/// Recording stops exactly at capacity, so the buffer never evicts;
/// appending to a full buffer is a caller bug and is rejected.
pub struct SequenceBuffer {
    frames: Vec<Vec<f32>>,
    capacity: usize,
}

impl SequenceBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn append(&mut self, keypoints: Vec<f32>) -> Result<()> {
        if self.is_full() {
            anyhow::bail!(
                "Sequence buffer already holds {} frames",
                self.capacity
            );
        }
        self.frames.push(keypoints);
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ordered copy of the collected frames, oldest first.
    pub fn snapshot(&self) -> Vec<Vec<f32>> {
        self.frames.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_of(value: f32, len: usize) -> Vec<f32> {
        vec![value; len]
    }

    #[test]
    fn test_fills_to_capacity_in_order() {
        let mut buffer = SequenceBuffer::new(3);
        assert!(buffer.is_empty());

        for i in 0..3 {
            assert!(!buffer.is_full());
            buffer.append(vec_of(i as f32, 4)).unwrap();
        }

        assert!(buffer.is_full());
        assert_eq!(buffer.len(), 3);

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.len(), 3);
        // Oldest frame first
        assert_eq!(snapshot[0], vec_of(0.0, 4));
        assert_eq!(snapshot[2], vec_of(2.0, 4));
    }

    #[test]
    fn test_append_at_capacity_rejected() {
        let mut buffer = SequenceBuffer::new(2);
        buffer.append(vec_of(1.0, 2)).unwrap();
        buffer.append(vec_of(2.0, 2)).unwrap();

        assert!(buffer.append(vec_of(3.0, 2)).is_err());
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_clear_resets_partial_sequence() {
        let mut buffer = SequenceBuffer::new(4);
        buffer.append(vec_of(1.0, 2)).unwrap();
        buffer.append(vec_of(2.0, 2)).unwrap();

        buffer.clear();
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
        assert_eq!(buffer.capacity(), 4);

        // Reusable after clear
        buffer.append(vec_of(9.0, 2)).unwrap();
        assert_eq!(buffer.snapshot()[0], vec_of(9.0, 2));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut buffer = SequenceBuffer::new(2);
        buffer.append(vec_of(1.0, 2)).unwrap();

        let snapshot = buffer.snapshot();
        buffer.clear();

        assert_eq!(snapshot.len(), 1);
        assert!(buffer.is_empty());
    }
}
