//! The bounded, thread-safe buffer where a bridge keeps its most recent
//! samples.

use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex},
    time::{Duration, Instant},
};

/// How many samples a bridge keeps around unless told otherwise.
pub const DEFAULT_CAPACITY: usize = 500;

#[derive(Debug)]
struct Inner<T> {
    samples: VecDeque<T>,
    available: bool,
    total: u64,
}

/// A ring buffer of the newest `capacity` samples. Once full, every push
/// evicts the oldest sample.
///
/// One producer pushes while any number of readers take snapshots or clear
/// it; all three lock the same mutex. Readers can also block until the
/// producer has pushed something new.
#[derive(Debug)]
pub struct HistoryBuffer<T> {
    inner: Mutex<Inner<T>>,
    new_data: Condvar,
    capacity: usize,
}

impl<T: Clone> HistoryBuffer<T> {
    /// An empty buffer holding at most `capacity` samples. A capacity of 0
    /// keeps nothing, but pushes still signal new data.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                samples: VecDeque::with_capacity(capacity),
                available: false,
                total: 0,
            }),
            new_data: Condvar::new(),
            capacity,
        }
    }

    /// Appends `sample`, evicting the oldest samples if over capacity, and
    /// wakes every reader blocked in [`HistoryBuffer::wait_for_data`].
    pub fn push(&self, sample: T) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.samples.push_back(sample);
            while inner.samples.len() > self.capacity {
                inner.samples.pop_front();
            }
            inner.available = true;
            inner.total += 1;
        }
        self.new_data.notify_all();
    }

    /// A copy of the newest `num` samples, oldest first. `None` means all of
    /// them.
    pub fn last(&self, num: Option<usize>) -> Vec<T> {
        let inner = self.inner.lock().unwrap();
        let num = num.unwrap_or(self.capacity).min(inner.samples.len());
        inner
            .samples
            .iter()
            .skip(inner.samples.len() - num)
            .cloned()
            .collect()
    }

    /// The newest sample, if there is one.
    pub fn latest(&self) -> Option<T> {
        self.inner.lock().unwrap().samples.back().cloned()
    }

    /// Drops every stored sample and resets the new-data signal.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.samples.clear();
        inner.available = false;
    }

    /// Blocks until a sample has been pushed since the last
    /// [`HistoryBuffer::clear`], or until `timeout` runs out. Returns whether
    /// data is available.
    pub fn wait_for_data(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock().unwrap();
        while !inner.available {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            inner = self.new_data.wait_timeout(inner, deadline - now).unwrap().0;
        }
        true
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().samples.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[allow(missing_docs)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of samples ever pushed, including evicted ones.
    pub fn total_pushed(&self) -> u64 {
        self.inner.lock().unwrap().total
    }
}

impl<T: Clone> Default for HistoryBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn never_exceeds_capacity() {
        let buf = HistoryBuffer::new(3);
        for i in 0..10 {
            buf.push(i);
            assert!(buf.len() <= 3);
        }
        assert_eq!(buf.last(None), vec![7, 8, 9]);
        assert_eq!(buf.total_pushed(), 10);
    }

    #[test]
    fn evicts_oldest_first() {
        let buf = HistoryBuffer::new(2);
        buf.push("a");
        buf.push("b");
        buf.push("c");
        assert_eq!(buf.last(None), vec!["b", "c"]);
        assert_eq!(buf.latest(), Some("c"));
    }

    #[test]
    fn last_n_is_the_newest_n() {
        let buf = HistoryBuffer::new(10);
        (0..5).for_each(|i| buf.push(i));
        assert_eq!(buf.last(Some(2)), vec![3, 4]);
        assert_eq!(buf.last(Some(50)), vec![0, 1, 2, 3, 4]);
        assert!(buf.last(Some(0)).is_empty());
    }

    #[test]
    fn clear_resets_the_signal() {
        let buf = HistoryBuffer::new(4);
        buf.push(1);
        assert!(buf.wait_for_data(Duration::ZERO));
        buf.clear();
        assert!(buf.is_empty());
        assert!(!buf.wait_for_data(Duration::from_millis(10)));
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let buf = HistoryBuffer::new(0);
        buf.push(1);
        assert!(buf.is_empty());
        assert!(buf.wait_for_data(Duration::ZERO));
    }

    #[test]
    fn waiting_reader_is_woken() {
        let buf = Arc::new(HistoryBuffer::new(4));
        let reader = {
            let buf = Arc::clone(&buf);
            thread::spawn(move || buf.wait_for_data(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(20));
        buf.push(42);
        assert!(reader.join().unwrap());
    }

    #[test]
    fn concurrent_readers_see_bounded_snapshots() {
        let buf = Arc::new(HistoryBuffer::new(16));
        let producer = {
            let buf = Arc::clone(&buf);
            thread::spawn(move || (0..1000).for_each(|i| buf.push(i)))
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let buf = Arc::clone(&buf);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let snapshot = buf.last(None);
                        assert!(snapshot.len() <= 16);
                        assert!(snapshot.windows(2).all(|w| w[0] < w[1]));
                    }
                })
            })
            .collect();
        producer.join().unwrap();
        readers.into_iter().for_each(|r| r.join().unwrap());
        assert_eq!(buf.last(None), (984..1000).collect::<Vec<_>>());
    }
}
