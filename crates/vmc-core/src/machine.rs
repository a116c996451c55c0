//! The single-flight vend state machine.
//!
//! [`VendMachine`] owns the one mutable machine state of the
//! controller. It moves between two phases:
//!
//! ```text
//!          request_vend (admitted)
//!   Idle ---------------------------> Vending
//!    ^                                   |
//!    +-----------------------------------+
//!      completion fires / shutdown
//! ```
//!
//! [`VendMachine::shutdown`] also closes the machine for good: later
//! requests are rejected with [`VendError::Closed`] and later
//! subscribers get their snapshot and then an ended stream.
//!
//! Admission, completion and shutdown each run under one async mutex, and
//! the notification for a transition is broadcast before that mutex is
//! released. Every subscriber therefore sees `status(vending)` before the
//! matching `vend-complete`, and a subscriber attached through
//! [`VendMachine::subscribe`] gets a snapshot that is consistent with the
//! frames that follow it.
//!
//! Completion is a spawned task sleeping for the configured delay. Each
//! admitted vend gets a cycle number; a completion that does not match
//! the pending cycle, or that fires while the machine is idle, does
//! nothing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use vmc_types::{ItemId, Notification, Phase, StatusReport, VendAccepted};

use crate::error::VendError;
use crate::hub::{NotificationHub, Subscription};

/// The scheduled completion of the vend in progress.
#[derive(Debug)]
struct PendingCompletion {
    cycle: u64,
    handle: JoinHandle<()>,
}

/// Mutable state of the machine.
///
/// Idle means `items` is empty and `started_at` and `pending` are
/// unset. Vending means all three are populated. `closed` only ever goes
/// from `false` to `true`, and a closed machine is always idle.
#[derive(Debug, Default)]
struct MachineState {
    phase: Phase,
    items: Vec<ItemId>,
    started_at: Option<Instant>,
    pending: Option<PendingCompletion>,
    next_cycle: u64,
    closed: bool,
}

impl MachineState {
    fn reset(&mut self) -> Vec<ItemId> {
        self.phase = Phase::Idle;
        self.started_at = None;
        self.pending = None;
        std::mem::take(&mut self.items)
    }
}

#[derive(Debug)]
struct Inner {
    state: Mutex<MachineState>,
    hub: Arc<NotificationHub>,
    delay: Duration,
}

/// Handle to the vend state machine.
///
/// Cloning is cheap; all clones drive the same machine.
#[derive(Debug, Clone)]
pub struct VendMachine {
    inner: Arc<Inner>,
}

impl VendMachine {
    /// Create an idle machine that completes vends after `delay` and
    /// publishes transitions to `hub`.
    pub fn new(hub: Arc<NotificationHub>, delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(MachineState::default()),
                hub,
                delay,
            }),
        }
    }

    /// The hub transitions are published to.
    pub fn hub(&self) -> &Arc<NotificationHub> {
        &self.inner.hub
    }

    /// The configured vend delay.
    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// The configured vend delay in whole milliseconds.
    pub fn delay_ms(&self) -> u64 {
        u64::try_from(self.delay().as_millis()).unwrap_or(u64::MAX)
    }

    /// Ask the machine to vend `items`.
    ///
    /// On success the machine is vending, a `status(vending)` frame has
    /// been broadcast and completion is scheduled. The call returns
    /// without waiting for the vend to finish.
    ///
    /// # Errors
    ///
    /// - [`VendError::InvalidRequest`] if `items` is empty.
    /// - [`VendError::Closed`] once [`shutdown`](Self::shutdown) has run.
    /// - [`VendError::Busy`] if a vend is already in progress; the error
    ///   carries the in-progress items.
    pub async fn request_vend(&self, items: Vec<ItemId>) -> Result<VendAccepted, VendError> {
        if items.is_empty() {
            debug!("vend rejected: empty item list");
            return Err(VendError::invalid_items());
        }

        let mut state = self.inner.state.lock().await;

        if state.closed {
            debug!(requested = ?items, "vend rejected: machine closed");
            return Err(VendError::Closed);
        }

        if state.phase.is_vending() {
            debug!(current = ?state.items, requested = ?items, "vend rejected: machine busy");
            return Err(VendError::Busy {
                current_items: state.items.clone(),
            });
        }

        let cycle = state.next_cycle;
        state.next_cycle = state.next_cycle.wrapping_add(1);
        state.phase = Phase::Vending;
        state.items.clone_from(&items);
        let started_at = Instant::now();
        state.started_at = Some(started_at);

        self.inner
            .hub
            .broadcast(&Notification::vend_started(items.clone()))
            .await;

        // Deadline is fixed at admission, not when the task is first polled.
        let deadline = started_at.checked_add(self.delay()).unwrap_or(started_at);
        let machine = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            machine.complete(cycle).await;
        });
        state.pending = Some(PendingCompletion { cycle, handle });

        let delay_ms = self.delay_ms();
        info!(?items, cycle, delay_ms, "vend started");

        Ok(VendAccepted::new(items, delay_ms))
    }

    /// Finish the vend of `cycle` and return to idle.
    ///
    /// Does nothing if the machine is idle or a different cycle is pending.
    async fn complete(&self, cycle: u64) {
        let mut state = self.inner.state.lock().await;

        let is_current = state
            .pending
            .as_ref()
            .is_some_and(|pending| pending.cycle == cycle);
        if !state.phase.is_vending() || !is_current {
            debug!(cycle, phase = %state.phase, "stale completion ignored");
            return;
        }

        let vended = state.reset();
        info!(items = ?vended, cycle, "vend completed");

        self.inner
            .hub
            .broadcast(&Notification::vend_complete(vended, Utc::now()))
            .await;
    }

    /// Read the current status. Never mutates the machine.
    pub async fn status(&self) -> StatusReport {
        let state = self.inner.state.lock().await;
        match (state.phase, state.started_at) {
            (Phase::Vending, Some(started_at)) => {
                let elapsed = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
                StatusReport::vending(state.items.clone(), elapsed, Utc::now())
            }
            _ => StatusReport::idle(Utc::now()),
        }
    }

    /// The current phase.
    pub async fn phase(&self) -> Phase {
        self.inner.state.lock().await.phase
    }

    /// Attach a new push subscriber.
    ///
    /// The subscriber's first frame is a snapshot of the current phase
    /// and items, taken atomically with respect to transitions.
    pub async fn subscribe(&self) -> Subscription {
        let state = self.inner.state.lock().await;
        let snapshot = Notification::snapshot(state.phase, state.items.clone());
        self.inner.hub.attach(snapshot).await
    }

    /// Close the machine: cancel a pending completion without announcing
    /// it, refuse further vends and close the hub.
    ///
    /// The in-flight vend is abandoned and the machine returns to idle.
    /// Returns the abandoned items, or `None` if nothing was pending.
    /// Calling it again is harmless.
    pub async fn shutdown(&self) -> Option<Vec<ItemId>> {
        let mut state = self.inner.state.lock().await;
        state.closed = true;

        let abandoned = state.pending.take().map(|pending| {
            pending.handle.abort();
            let items = state.reset();
            info!(?items, cycle = pending.cycle, "pending vend cancelled");
            items
        });

        let detached = self.inner.hub.close().await;
        info!(subscribers = detached, "vend machine closed");

        abandoned
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, clippy::arithmetic_side_effects)]

    use super::*;

    const DELAY: Duration = Duration::from_millis(5000);

    fn machine() -> VendMachine {
        VendMachine::new(Arc::new(NotificationHub::default()), DELAY)
    }

    fn items(ids: &[i64]) -> Vec<ItemId> {
        ids.iter().copied().map(ItemId).collect()
    }

    /// Let spawned tasks woken by a clock advance run to completion.
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn starts_idle() {
        let m = machine();
        assert_eq!(m.phase().await, Phase::Idle);
        let status = m.status().await;
        assert_eq!(status.status, Phase::Idle);
        assert!(status.items.is_none());
        assert!(status.elapsed_time.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_vend_reports_items_and_delay() {
        let m = machine();
        let accepted = m.request_vend(items(&[1, 2, 3])).await.unwrap();
        assert!(accepted.success);
        assert_eq!(accepted.items, items(&[1, 2, 3]));
        assert_eq!(accepted.estimated_time, 5000);

        let status = m.status().await;
        assert_eq!(status.status, Phase::Vending);
        assert_eq!(status.items, Some(items(&[1, 2, 3])));
        assert_eq!(status.elapsed_time, Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_request_is_invalid_and_changes_nothing() {
        let m = machine();
        let err = m.request_vend(Vec::new()).await.unwrap_err();
        assert!(matches!(err, VendError::InvalidRequest { .. }));
        assert_eq!(m.phase().await, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn second_request_while_vending_is_busy() {
        let m = machine();
        m.request_vend(items(&[1])).await.unwrap();

        let err = m.request_vend(items(&[7, 8])).await.unwrap_err();
        assert_eq!(
            err,
            VendError::Busy {
                current_items: items(&[1])
            }
        );
        assert_eq!(m.status().await.items, Some(items(&[1])));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_request_while_vending_is_invalid_not_busy() {
        let m = machine();
        m.request_vend(items(&[1])).await.unwrap();
        let err = m.request_vend(Vec::new()).await.unwrap_err();
        assert!(matches!(err, VendError::InvalidRequest { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_time_tracks_the_clock() {
        let m = machine();
        m.request_vend(items(&[1, 2, 3])).await.unwrap();

        tokio::time::advance(Duration::from_millis(1000)).await;
        let first = m.status().await.elapsed_time.unwrap();
        assert!((1000..1100).contains(&first));

        tokio::time::advance(Duration::from_millis(500)).await;
        let second = m.status().await.elapsed_time.unwrap();
        assert!(second >= first);
        assert!((1500..1600).contains(&second));
    }

    #[tokio::test(start_paused = true)]
    async fn completes_after_delay_and_returns_to_idle() {
        let m = machine();
        m.request_vend(items(&[1, 2, 3])).await.unwrap();

        tokio::time::advance(Duration::from_millis(4999)).await;
        settle().await;
        assert_eq!(m.phase().await, Phase::Vending);

        tokio::time::advance(Duration::from_millis(2)).await;
        settle().await;
        let status = m.status().await;
        assert_eq!(status.status, Phase::Idle);
        assert!(status.items.is_none());

        // Admits a new vend once idle.
        assert!(m.request_vend(items(&[4])).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn subscriber_sees_ordered_cycle() {
        let m = machine();
        let mut sub = m.subscribe().await;
        assert_eq!(sub.recv().await, Some(Notification::snapshot(Phase::Idle, Vec::new())));

        m.request_vend(items(&[1, 2, 3])).await.unwrap();
        assert_eq!(sub.recv().await, Some(Notification::vend_started(items(&[1, 2, 3]))));

        // Paused clock auto-advances to the completion timer.
        match sub.recv().await {
            Some(Notification::VendComplete {
                status,
                vended_items,
                ..
            }) => {
                assert_eq!(status, Phase::Idle);
                assert_eq!(vended_items, items(&[1, 2, 3]));
            }
            other => panic!("expected vend-complete, got {other:?}"),
        }
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn mid_cycle_subscriber_gets_vending_snapshot_then_completion() {
        let m = machine();
        m.request_vend(items(&[5, 6])).await.unwrap();
        tokio::time::advance(Duration::from_millis(1000)).await;

        let mut late = m.subscribe().await;
        assert_eq!(
            late.recv().await,
            Some(Notification::snapshot(Phase::Vending, items(&[5, 6])))
        );
        assert!(matches!(
            late.recv().await,
            Some(Notification::VendComplete { vended_items, .. }) if vended_items == items(&[5, 6])
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn detached_subscriber_receives_nothing_further() {
        let m = machine();
        let mut sub = m.subscribe().await;
        let _ = sub.recv().await;

        m.request_vend(items(&[1])).await.unwrap();
        let _ = sub.recv().await;
        assert!(m.hub().detach(sub.id()).await);

        tokio::time::advance(DELAY).await;
        settle().await;
        assert_eq!(m.phase().await, Phase::Idle);
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_without_announcing() {
        let m = machine();
        let mut sub = m.subscribe().await;
        let _ = sub.recv().await;

        m.request_vend(items(&[9])).await.unwrap();
        let _ = sub.recv().await;

        assert_eq!(m.shutdown().await, Some(items(&[9])));
        assert_eq!(m.phase().await, Phase::Idle);

        tokio::time::advance(DELAY + Duration::from_millis(10)).await;
        settle().await;
        assert_eq!(sub.try_recv(), None);
        assert_eq!(m.phase().await, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_when_idle_is_a_no_op() {
        let m = machine();
        assert_eq!(m.shutdown().await, None);
        assert_eq!(m.phase().await, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_refuses_later_vends() {
        let m = machine();
        m.request_vend(items(&[1])).await.unwrap();
        assert_eq!(m.shutdown().await, Some(items(&[1])));

        assert_eq!(m.request_vend(items(&[2])).await, Err(VendError::Closed));
        assert_eq!(m.phase().await, Phase::Idle);
        assert!(m.status().await.items.is_none());
        assert_eq!(m.shutdown().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_ends_existing_and_later_subscriptions() {
        let m = machine();
        let mut early = m.subscribe().await;
        let _ = early.recv().await;

        m.shutdown().await;
        assert_eq!(early.recv().await, None);

        let mut late = m.subscribe().await;
        assert_eq!(
            late.recv().await,
            Some(Notification::snapshot(Phase::Idle, Vec::new()))
        );
        assert_eq!(late.recv().await, None);
        assert_eq!(m.hub().subscriber_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_completion_is_ignored() {
        let m = machine();
        let mut sub = m.subscribe().await;
        let _ = sub.recv().await;

        // Completion while idle.
        m.complete(0).await;
        assert_eq!(sub.try_recv(), None);

        m.request_vend(items(&[2])).await.unwrap();
        let _ = sub.recv().await;

        // Completion for a cycle that is not pending.
        m.complete(41).await;
        assert_eq!(m.phase().await, Phase::Vending);
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_is_idempotent() {
        let m = machine();
        let mut sub = m.subscribe().await;
        let _ = sub.recv().await;

        m.request_vend(items(&[3])).await.unwrap();
        let _ = sub.recv().await;

        m.complete(0).await;
        m.complete(0).await;
        assert!(matches!(sub.try_recv(), Some(Notification::VendComplete { .. })));
        assert_eq!(sub.try_recv(), None);
        assert_eq!(m.phase().await, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_requests_admit_exactly_one() {
        let m = machine();
        let mut handles = Vec::new();
        for n in 0..16_i64 {
            let m = m.clone();
            handles.push(tokio::spawn(async move { m.request_vend(vec![ItemId(n)]).await }));
        }

        let mut accepted = 0_usize;
        let mut busy = 0_usize;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(VendError::Busy { .. }) => busy += 1,
                Err(other) => panic!("unexpected rejection: {other}"),
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(busy, 15);
    }
}
