use std::time::{Duration, Instant};

struct PendingTimer<A> {
    due: Instant,
    seq: u64,
    epoch: u64,
    action: A,
}

/// Delayed actions tagged with the epoch they were scheduled in.
///
/// Bumping the epoch drops everything pending; notices carrying an older epoch are stale.
pub struct TimerQueue<A> {
    epoch: u64,
    next_seq: u64,
    pending: Vec<PendingTimer<A>>,
}

impl<A> TimerQueue<A> {
    pub fn new() -> Self {
        Self {
            epoch: 0,
            next_seq: 0,
            pending: Vec::new(),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn bump_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.pending.clear();
        self.epoch
    }

    pub fn schedule(&mut self, now: Instant, delay: Duration, action: A) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(PendingTimer {
            due: now + delay,
            seq,
            epoch: self.epoch,
            action,
        });
    }

    /// Removes and returns the actions due at `now`, earliest first.
    pub fn drain_due(&mut self, now: Instant) -> Vec<A> {
        let epoch = self.epoch;
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|timer| timer.due <= now);
        self.pending = pending;

        due.retain(|timer| timer.epoch == epoch);
        due.sort_by_key(|timer| (timer.due, timer.seq));
        due.into_iter().map(|timer| timer.action).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<A> Default for TimerQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_actions_come_out_in_order() {
        let t0 = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(t0, Duration::from_millis(30), "late");
        queue.schedule(t0, Duration::from_millis(10), "early");
        queue.schedule(t0, Duration::from_millis(10), "early-second");

        assert!(queue.drain_due(t0).is_empty());
        assert_eq!(
            queue.drain_due(t0 + Duration::from_millis(10)),
            vec!["early", "early-second"]
        );
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain_due(t0 + Duration::from_secs(1)), vec!["late"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn bumping_the_epoch_drops_pending_actions() {
        let t0 = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(t0, Duration::from_millis(5), 1);
        assert_eq!(queue.bump_epoch(), 1);

        assert!(queue.is_empty());
        assert!(queue.drain_due(t0 + Duration::from_secs(1)).is_empty());
    }
}
