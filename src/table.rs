use std::cmp::min;
use std::ops::Index;

use crate::utils::MyHash;

struct Entry<T> {
    value: T,
    next: usize,
}

/// Hash-consing table: every distinct value is stored exactly once.
///
/// Values live in a single vector; collisions are resolved by chaining
/// through the `next` index of each entry (0 terminates a chain, index 0
/// itself is a sentry and never holds a value).
pub struct Table<T> {
    data: Vec<Entry<T>>,
    capacity: usize,

    buckets: Vec<usize>,
    bitmask: u64,
}

impl<T> Table<T>
where
    T: Default,
{
    /// Create a new table able to hold `2^bits` values.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Storage bits should be in the range 0..=31");

        let capacity = 1 << bits;
        let mut data = Vec::with_capacity(min(capacity, 1 << 16));
        data.push(Entry {
            value: T::default(),
            next: 0,
        });

        let buckets_bits = min(bits, 16);
        let buckets_size = 1 << buckets_bits;

        Self {
            data,
            capacity,
            buckets: vec![0; buckets_size],
            bitmask: (buckets_size - 1) as u64,
        }
    }
}

impl<T> Table<T> {
    /// Get the capacity of the table.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    /// Get the number of stored values.
    pub fn size(&self) -> usize {
        self.data.len() - 1
    }

    /// Get the reference to the value at the given index.
    pub fn value(&self, index: usize) -> &T {
        assert_ne!(index, 0, "Index is 0");
        &self.data[index].value
    }

    /// Get the index of the next entry in the same bucket.
    pub fn next(&self, index: usize) -> usize {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].next
    }

    /// Add a new value to the table and return its index.
    pub fn add(&mut self, value: T) -> usize {
        let index = self.data.len();
        if index >= self.capacity {
            panic!("Storage is full");
        }
        self.data.push(Entry { value, next: 0 });
        index
    }
}

impl<T> Table<T>
where
    T: MyHash + Eq,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Put a value into the table and return its index,
    /// reusing the existing entry if an equal value is already stored.
    pub fn put(&mut self, value: T) -> usize {
        let bucket_index = self.bucket_index(&value);
        let mut index = self.buckets[bucket_index];

        if index == 0 {
            let i = self.add(value);
            self.buckets[bucket_index] = i;
            return i;
        }

        loop {
            if &value == self.value(index) {
                return index;
            }
            let next = self.next(index);
            if next == 0 {
                let i = self.add(value);
                self.data[index].next = i;
                return i;
            }
            index = next;
        }
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}
