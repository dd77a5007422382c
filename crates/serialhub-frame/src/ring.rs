use crate::error::{FrameError, Result};

/// Fixed-capacity FIFO with wrap-around indices.
///
/// Absorbs bursts from the transport until the scanner drains them. The
/// buffer never grows and never overwrites: `enqueue` on a full buffer and
/// `dequeue` on an empty one fail without touching any state.
///
/// Not synchronized. The link reader owns its buffer exclusively.
pub struct RingBuffer<T> {
    data: Box<[T]>,
    head: usize,
    tail: usize,
    size: usize,
}

impl<T: Clone + Default> RingBuffer<T> {
    /// Create an empty buffer holding at most `capacity` elements.
    ///
    /// A zero capacity yields a buffer that is permanently full and empty.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![T::default(); capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
            size: 0,
        }
    }

    /// Append an element at the tail.
    pub fn enqueue(&mut self, value: T) -> Result<()> {
        if self.is_full() {
            return Err(FrameError::BufferFull {
                capacity: self.capacity(),
            });
        }
        self.data[self.tail] = value;
        self.tail = (self.tail + 1) % self.capacity();
        self.size += 1;
        Ok(())
    }

    /// Remove the element at the head.
    pub fn dequeue(&mut self) -> Result<T> {
        if self.is_empty() {
            return Err(FrameError::BufferEmpty);
        }
        let value = self.data[self.head].clone();
        self.head = (self.head + 1) % self.capacity();
        self.size -= 1;
        Ok(value)
    }

    /// Copy the current contents in FIFO order.
    pub fn snapshot(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.size);
        if self.size == 0 {
            return out;
        }

        let first_run = (self.capacity() - self.head).min(self.size);
        out.extend_from_slice(&self.data[self.head..self.head + first_run]);
        out.extend_from_slice(&self.data[..self.size - first_run]);
        out
    }
}

impl<T> RingBuffer<T> {
    /// True when no element is stored.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// True when every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.size == self.data.len()
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Maximum number of stored elements.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Free slots left.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.size
    }

    /// Forget all elements. Backing storage is left as is.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.size = 0;
    }
}

impl<T> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.data.len())
            .field("len", &self.size)
            .field("head", &self.head)
            .field("tail", &self.tail)
            .finish()
    }
}
