//! Bucketed priority queue for small integer priorities.
//!
//! Entries form a singly linked list kept in ascending priority order. A lookup table points at
//! the last entry of every non-empty priority bucket, so both operations are O(1) in the number of
//! stored entries. Enqueueing only walks the lookup table downwards until it hits the next lower
//! occupied priority, which is cheap as long as the priority range is small.

#[derive(Debug, Clone)]
struct QueueEntry<T> {
    value: T,
    priority: u32,
    next: Option<usize>,
}

/// Priority queue with FIFO order among equal priorities.
#[derive(Debug, Clone)]
pub struct LinkedListPriorityQueue<T> {
    entries: Vec<QueueEntry<T>>,
    priority_lookup: Vec<Option<usize>>,
    first: Option<usize>,
    last: Option<usize>,
    count: usize,
}

impl<T: Copy> LinkedListPriorityQueue<T> {
    /// `max_priority` only sizes the lookup table, higher priorities grow it on demand.
    pub fn new(max_priority: u32, capacity: usize) -> Self {
        LinkedListPriorityQueue {
            entries: Vec::with_capacity(capacity),
            priority_lookup: vec![None; max_priority as usize + 1],
            first: None,
            last: None,
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Stores `value`. Older values with the same priority are dequeued first.
    pub fn enqueue(&mut self, value: T, priority: u32) {
        let bucket = priority as usize;
        if bucket >= self.priority_lookup.len() {
            self.priority_lookup.resize(bucket + 1, None);
        }
        let index = self.entries.len();
        self.entries.push(QueueEntry {
            value,
            priority,
            next: None,
        });

        match (self.first, self.last) {
            (Some(first), Some(last)) => {
                if priority < self.entries[first].priority {
                    self.entries[index].next = Some(first);
                    self.first = Some(index);
                } else if priority >= self.entries[last].priority {
                    self.entries[last].next = Some(index);
                    self.last = Some(index);
                } else {
                    // The bucket of the first entry is always occupied, so this finds a predecessor.
                    let previous = self.priority_lookup[..=bucket]
                        .iter()
                        .rev()
                        .find_map(|slot| *slot)
                        .unwrap_or(first);
                    self.entries[index].next = self.entries[previous].next;
                    self.entries[previous].next = Some(index);
                }
            }
            _ => {
                self.first = Some(index);
                self.last = Some(index);
            }
        }
        self.priority_lookup[bucket] = Some(index);
        self.count += 1;
    }

    /// Removes and returns the value with the lowest priority.
    pub fn dequeue(&mut self) -> Option<T> {
        let index = self.first?;
        self.count -= 1;
        if self.count == 0 {
            self.first = None;
            self.last = None;
            // Every entry is consumed, so the arena can be reused.
            let entry = self.entries[index].clone();
            self.entries.clear();
            self.priority_lookup[entry.priority as usize] = None;
            return Some(entry.value);
        }
        let entry = &mut self.entries[index];
        self.first = entry.next.take();
        let bucket = entry.priority as usize;
        let value = entry.value;
        if self.priority_lookup[bucket] == Some(index) {
            self.priority_lookup[bucket] = None;
        }
        Some(value)
    }

    /// Priority of the value [`dequeue`](Self::dequeue) would return next.
    pub fn peek_priority(&self) -> Option<u32> {
        self.first.map(|i| self.entries[i].priority)
    }
}

impl<T: Copy> Iterator for LinkedListPriorityQueue<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.dequeue()
    }
}
