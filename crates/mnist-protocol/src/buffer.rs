//! Bounded line accumulator.

/// Byte buffer with a fixed capacity chosen at construction.
///
/// [`LineBuffer::try_push`] refuses bytes once the buffer is full; it never
/// grows and never truncates silently. The caller decides what to do with a
/// full buffer (the ingestion loop discards it).
#[derive(Debug, Clone)]
pub struct LineBuffer {
    bytes: Vec<u8>,
    capacity: usize,
}

impl LineBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { bytes: Vec::with_capacity(capacity), capacity }
    }

    /// Append `byte`, returning `false` if the buffer is already full.
    pub fn try_push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.bytes.push(byte);
        true
    }

    pub fn reset(&mut self) {
        self.bytes.clear();
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.bytes.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_past_capacity() {
        let mut buf = LineBuffer::new(2);
        assert!(buf.try_push(b'a'));
        assert!(buf.try_push(b'b'));
        assert!(buf.is_full());
        assert!(!buf.try_push(b'c'));
        assert_eq!(buf.as_bytes(), b"ab");
    }

    #[test]
    fn reset_empties_but_keeps_capacity() {
        let mut buf = LineBuffer::new(4);
        buf.try_push(b'x');
        buf.reset();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 4);
    }

    #[test]
    fn zero_capacity_is_always_full() {
        let mut buf = LineBuffer::new(0);
        assert!(buf.is_full());
        assert!(!buf.try_push(b'1'));
    }
}
