use std::time::{Duration, Instant};

/// Handle to a scheduled repeating task. Cancelling twice is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelToken(u64);

struct Task {
    id: u64,
    period: Duration,
    next_due: Instant,
}

/// Cooperative repeating-task scheduler. Tasks never run on their own:
/// the owning loop calls `poll` each turn and dispatches the due tokens
/// itself, so a task callback can never race a pointer event for the
/// same mutable state.
#[derive(Default)]
pub struct Scheduler {
    tasks: Vec<Task>,
    next_id: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repeating task firing every `period`, first due one
    /// period from `now`.
    pub fn schedule(&mut self, period: Duration, now: Instant) -> CancelToken {
        let id = self.next_id;
        self.next_id += 1;
        self.tasks.push(Task {
            id,
            period,
            next_due: now + period,
        });
        CancelToken(id)
    }

    /// Remove a task. Unknown or already-cancelled tokens are ignored; a
    /// task that was due but not yet polled simply never fires.
    pub fn cancel(&mut self, token: CancelToken) {
        self.tasks.retain(|t| t.id != token.0);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tokens of every task due at `now`. Each due task is rescheduled one
    /// period ahead of `now` (late polls coalesce rather than burst).
    pub fn poll(&mut self, now: Instant) -> Vec<CancelToken> {
        let mut due = Vec::new();
        for task in &mut self.tasks {
            if task.next_due <= now {
                due.push(CancelToken(task.id));
                task.next_due = now + task.period;
            }
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_fires_once_per_period() {
        let start = Instant::now();
        let mut sched = Scheduler::new();
        let token = sched.schedule(Duration::from_millis(20), start);

        assert!(sched.poll(start).is_empty());
        let due = sched.poll(start + Duration::from_millis(25));
        assert_eq!(due, vec![token]);
        // Not due again until another period elapses from the poll.
        assert!(sched.poll(start + Duration::from_millis(30)).is_empty());
        assert_eq!(
            sched.poll(start + Duration::from_millis(50)),
            vec![token]
        );
    }

    #[test]
    fn cancel_is_idempotent() {
        let start = Instant::now();
        let mut sched = Scheduler::new();
        let token = sched.schedule(Duration::from_millis(20), start);
        sched.cancel(token);
        sched.cancel(token);
        assert!(sched.is_empty());
        assert!(sched.poll(start + Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn cancelled_due_task_never_fires() {
        let start = Instant::now();
        let mut sched = Scheduler::new();
        let token = sched.schedule(Duration::from_millis(20), start);
        // The deadline has passed, but cancellation wins.
        sched.cancel(token);
        assert!(sched.poll(start + Duration::from_millis(100)).is_empty());
    }
}
