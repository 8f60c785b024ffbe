// BUFFER COMPONENT ------------------------------------------------------------

/// Fixed-capacity buffer that overwrites its oldest element once full.
#[derive(Clone, Debug)]
pub struct RingBuffer<T> {
    buffer: Vec<T>,
    capacity: usize,
    start: usize,
    len: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Creates an empty buffer. A zero capacity is raised to one slot.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: vec![T::default(); capacity],
            capacity,
            start: 0,
            len: 0,
        }
    }

    /// Appends an element, returning the evicted oldest element when full.
    pub fn add(&mut self, element: T) -> Option<T> {
        let end = (self.start + self.len) % self.capacity;
        if self.len == self.capacity {
            let evicted = self.buffer[self.start];
            self.buffer[end] = element;
            self.start = (self.start + 1) % self.capacity;
            Some(evicted)
        } else {
            self.buffer[end] = element;
            self.len += 1;
            None
        }
    }

    /// Element at `index`, counted from the oldest.
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        Some(self.buffer[(self.start + index) % self.capacity])
    }

    pub fn latest(&self) -> Option<T> {
        self.len.checked_sub(1).and_then(|last| self.get(last))
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len).map(move |i| self.buffer[(self.start + i) % self.capacity])
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    pub fn clear(&mut self) {
        self.start = 0;
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
