//! Virtual-time task table driving session ticks and delayed restarts.
//!
//! The scheduler never sleeps. The owner feeds it elapsed wall time through
//! [`Scheduler::advance`] and gets back the keys of every task that came due,
//! which keeps all simulation work on the owner's thread.

use std::time::Duration;

#[derive(Debug, Clone)]
struct Task<K> {
    key: K,
    due_at: Duration,
    period: Option<Duration>,
    order: u64,
}

/// Tasks keyed by `K`, at most one per key, fired against a virtual clock.
#[derive(Debug, Clone)]
pub struct Scheduler<K> {
    now: Duration,
    tasks: Vec<Task<K>>,
    next_order: u64,
}

impl<K> Default for Scheduler<K> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            tasks: Vec::new(),
            next_order: 0,
        }
    }
}

impl<K: Copy + PartialEq> Scheduler<K> {
    /// Creates an empty scheduler at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed since the scheduler was created.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Fires `key` every `period`, first one period from now.
    /// Replaces any task already scheduled under the same key.
    pub fn schedule_repeating(&mut self, key: K, period: Duration) {
        let period = period.max(Duration::from_nanos(1));
        self.insert(key, period, Some(period));
    }

    /// Fires `key` once after `delay`. Replaces any task under the same key.
    pub fn schedule_once(&mut self, key: K, delay: Duration) {
        self.insert(key, delay, None);
    }

    /// Returns true if a task was removed.
    pub fn cancel(&mut self, key: K) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.key != key);
        self.tasks.len() != before
    }

    /// True if a task is pending under `key`.
    pub fn is_scheduled(&self, key: K) -> bool {
        self.tasks.iter().any(|task| task.key == key)
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Moves time forward and returns due keys in firing order. Ties fire in
    /// the order the tasks were scheduled. A repeating task fires once for
    /// every whole period that elapsed.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<K> {
        self.now += elapsed;
        let mut fired = Vec::new();

        while let Some(index) = self.next_due() {
            fired.push(self.tasks[index].key);
            match self.tasks[index].period {
                Some(period) => self.tasks[index].due_at += period,
                None => {
                    self.tasks.remove(index);
                }
            }
        }
        fired
    }

    fn next_due(&self) -> Option<usize> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.due_at <= self.now)
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(index, _)| index)
    }

    fn insert(&mut self, key: K, delay: Duration, period: Option<Duration>) {
        self.cancel(key);
        let order = self.next_order;
        self.next_order += 1;
        self.tasks.push(Task {
            key,
            due_at: self.now + delay,
            period,
            order,
        });
    }
}
