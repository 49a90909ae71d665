//! # Offline Desk Runtime
//!
//! Runtime for Offline Desk workflows.
//!
//! The [`Store`] owns a workflow's state, runs its reducer one action at a
//! time and executes the effects the reducer describes. Actions produced by
//! effects (collaborator responses) are broadcast to observers and fed back
//! into the reducer.
//!
//! ## Example
//!
//! ```ignore
//! use offline_desk_runtime::Store;
//!
//! let store = Store::new(ResolutionState::default(), RiderDeskReducer::new(), environment);
//!
//! // Dispatch a staff command and wait for the collaborator call to settle
//! let mut handle = store.send(RiderAction::SearchRider { mobile }).await?;
//! handle.wait().await;
//!
//! // Read state
//! let phase = store.state(ResolutionState::phase).await;
//! ```

use offline_desk_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, watch};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Effects of an action did not settle in time
        ///
        /// Returned by [`EffectHandle::wait_with_timeout`](crate::EffectHandle::wait_with_timeout).
        /// The effects keep running; their results are still applied.
        #[error("Timeout waiting for effects to settle")]
        Timeout,
    }
}

pub use error::StoreError;

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] so a caller can wait until the effects
/// spawned for one action have finished, including feeding their result
/// action back into the reducer.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(RiderAction::SendOtp).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // The OTP service answered and the reducer has seen the answer
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a new handle together with its internal tracking side
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Number of effects that are still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                // Every tracker is gone, so nothing can still be running
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all
    /// effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: tracking context carried through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements the effect counter on drop
///
/// The counter is released even if the effect panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration, Effect,
        EffectHandle, EffectTracking, Ordering, Reducer, RwLock, StoreError,
    };
    use tokio::sync::broadcast;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`; reducer calls are serialized)
    /// 2. Reducer (workflow rules)
    /// 3. Environment (injected collaborators)
    /// 4. Effect execution (with feedback loop)
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Every action produced by an effect is broadcast here before it
        /// is fed back, so a UI can re-render on collaborator responses.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// The action broadcast channel buffers 16 actions.
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            let (action_broadcast, _) = broadcast::channel(16);

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
            }
        }

        /// Number of effects currently running across all actions
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// Sets the shutdown flag (rejecting new actions) and waits for
        /// pending effects to complete.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(25);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    metrics::counter!("store.shutdown.completed").increment(1);
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(
                        pending_effects = pending,
                        "Shutdown timeout: {} effects still running", pending
                    );
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Spawns the returned effects
        ///
        /// `send()` returns once the effects are started. Wait on the returned
        /// [`EffectHandle`] to observe their completion. Effects of concurrent
        /// actions may complete in any order; reducers tag their requests when
        /// ordering matters.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("store.commands.total").increment(1);

            let (handle, tracking) = EffectHandle::new();

            let effects = {
                let mut state = self.state.write().await;

                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());
                effects
            };

            for effect in effects {
                self.execute_effect(effect, &tracking);
            }

            Ok(handle)
        }

        /// Subscribe to all actions produced by effects
        ///
        /// Only effect-produced actions are broadcast, not the commands sent
        /// through [`Store::send`].
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let rider = store.state(|s| s.resolved_rider.clone()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Execute one effect
        ///
        /// Futures run on their own tokio task. A produced action is broadcast
        /// and then sent back through the store. [`DecrementGuard`] keeps the
        /// handle's counter honest if the effect panics.
        fn execute_effect(&self, effect: Effect<A>, tracking: &EffectTracking)
        where
            R: Clone,
            E: Clone,
        {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    tracking.increment();

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                    let tracking = tracking.clone();
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = DecrementGuard(tracking);
                        let _pending_guard = pending_guard;

                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");

                            let _ = store.action_broadcast.send(action.clone());

                            if let Err(error) = store.send(action).await {
                                tracing::warn!(error = %error, "Dropped effect result");
                            }
                        } else {
                            tracing::trace!("Effect::Future completed with no action");
                        }
                    });
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;

#[cfg(test)]
mod tests {
    use super::*;
    use offline_desk_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};

    #[derive(Debug, Clone, Default)]
    struct QueueState {
        answered: Vec<u64>,
        requests: u32,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum QueueAction {
        Ask { ticket: u64, latency_ms: u64 },
        Answered { ticket: u64 },
        Noop,
    }

    #[derive(Debug, Clone)]
    struct QueueEnv;

    #[derive(Debug, Clone)]
    struct QueueReducer;

    impl Reducer for QueueReducer {
        type State = QueueState;
        type Action = QueueAction;
        type Environment = QueueEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                QueueAction::Ask { ticket, latency_ms } => {
                    state.requests += 1;
                    smallvec![Effect::Future(Box::pin(async move {
                        tokio::time::sleep(Duration::from_millis(latency_ms)).await;
                        Some(QueueAction::Answered { ticket })
                    }))]
                },
                QueueAction::Answered { ticket } => {
                    state.answered.push(ticket);
                    SmallVec::new()
                },
                QueueAction::Noop => smallvec![Effect::None],
            }
        }
    }

    fn store() -> Store<QueueState, QueueAction, QueueEnv, QueueReducer> {
        Store::new(QueueState::default(), QueueReducer, QueueEnv)
    }

    #[tokio::test]
    async fn send_runs_reducer_synchronously() {
        let store = store();

        let handle = store.send(QueueAction::Noop).await;
        assert!(handle.is_ok());
        assert_eq!(store.state(|s| s.requests).await, 0);

        let _ = store.send(QueueAction::Ask { ticket: 1, latency_ms: 0 }).await;
        assert_eq!(store.state(|s| s.requests).await, 1);
    }

    #[tokio::test]
    async fn handle_waits_for_feedback_action() {
        let store = store();

        let Ok(mut handle) = store.send(QueueAction::Ask { ticket: 7, latency_ms: 20 }).await else {
            unreachable!("store is running");
        };
        handle.wait().await;

        assert_eq!(store.state(|s| s.answered.clone()).await, vec![7]);
        assert_eq!(handle.pending(), 0);
    }

    #[tokio::test]
    async fn wait_with_timeout_reports_slow_effects() {
        let store = store();

        let Ok(mut handle) = store.send(QueueAction::Ask { ticket: 4, latency_ms: 200 }).await else {
            unreachable!("store is running");
        };
        let result = handle.wait_with_timeout(Duration::from_millis(20)).await;

        assert_eq!(result, Err(StoreError::Timeout));
        assert_eq!(handle.pending(), 1);

        // The effect keeps running and is still applied
        handle.wait().await;
        assert_eq!(store.state(|s| s.answered.clone()).await, vec![4]);
    }

    #[tokio::test]
    async fn wait_with_timeout_without_effects_returns_at_once() {
        let store = store();

        let Ok(mut handle) = store.send(QueueAction::Noop).await else {
            unreachable!("store is running");
        };

        assert_eq!(handle.wait_with_timeout(Duration::from_millis(10)).await, Ok(()));
    }

    #[tokio::test]
    async fn late_answers_arrive_after_early_ones() {
        let store = store();

        let Ok(mut slow) = store.send(QueueAction::Ask { ticket: 1, latency_ms: 60 }).await else {
            unreachable!("store is running");
        };
        let Ok(mut fast) = store.send(QueueAction::Ask { ticket: 2, latency_ms: 0 }).await else {
            unreachable!("store is running");
        };

        fast.wait().await;
        slow.wait().await;

        assert_eq!(store.state(|s| s.answered.clone()).await, vec![2, 1]);
    }

    #[tokio::test]
    async fn shutdown_rejects_new_actions() {
        let store = store();

        let _ = store.send(QueueAction::Ask { ticket: 1, latency_ms: 10 }).await;
        assert_eq!(store.shutdown(Duration::from_secs(1)).await, Ok(()));
        assert_eq!(store.pending_effects(), 0);

        let rejected = store.send(QueueAction::Noop).await;
        assert!(matches!(rejected, Err(StoreError::ShutdownInProgress)));
    }

    #[tokio::test]
    async fn shutdown_times_out_with_slow_effects() {
        let store = store();

        let _ = store.send(QueueAction::Ask { ticket: 1, latency_ms: 500 }).await;
        let result = store.shutdown(Duration::from_millis(30)).await;

        assert_eq!(result, Err(StoreError::ShutdownTimeout(1)));
    }

    #[tokio::test]
    async fn subscribers_see_effect_actions_only() {
        let store = store();
        let mut rx = store.subscribe_actions();

        let Ok(mut handle) = store.send(QueueAction::Ask { ticket: 9, latency_ms: 0 }).await else {
            unreachable!("store is running");
        };
        handle.wait().await;

        assert_eq!(rx.recv().await.ok(), Some(QueueAction::Answered { ticket: 9 }));
        assert!(rx.try_recv().is_err());
    }
}
