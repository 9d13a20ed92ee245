//! Drives a submitted activity to a terminal status.
//!
//! Before attempt `n` (1-based) the poller sleeps `base_delay * n`, so the
//! total wait over `k` attempts is `base_delay * k * (k + 1) / 2`. Each sleep
//! and the status query after it race a [`CancelSignal`] and an optional
//! deadline.

use crate::{PasskeyWalletClientError, Result};
use async_trait::async_trait;
use passkey_wallet::types::{
    activity::{Activity, ActivityStatus, StatusOutcome},
    ActivityId, OrganizationId,
};
use std::time::Duration;
use tokio::{
    sync::watch,
    time::{sleep, sleep_until, Instant},
};
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(200);

/// Source of activity status. Implemented by
/// [`CustodyClient`](crate::CustodyClient) over its own stamped channel.
#[async_trait]
pub trait ActivityStatusSource: Send + Sync {
    async fn get_activity(
        &self,
        organization_id: &OrganizationId,
        activity_id: &ActivityId,
    ) -> Result<Activity>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    max_attempts: u32,
    base_delay: Duration,
    deadline: Option<Instant>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}

impl PollOptions {
    /// At least one attempt is always made.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Sleep before the given 1-based attempt.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Creates a connected [`Canceller`] and [`CancelSignal`].
pub fn cancellation() -> (Canceller, CancelSignal) {
    let (sender, receiver) = watch::channel(false);
    (Canceller(sender), CancelSignal(receiver))
}

/// Triggers every [`CancelSignal`] cloned from its pair.
#[derive(Debug)]
pub struct Canceller(watch::Sender<bool>);

impl Canceller {
    pub fn cancel(&self) {
        let _ = self.0.send_replace(true);
    }
}

#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, receiver) = watch::channel(false);
        Self(receiver)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once cancellation is requested. Never resolves if the
    /// [`Canceller`] is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.0.borrow_and_update() {
                return;
            }
            if self.0.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// Wait for an activity to reach a terminal status.
///
/// A transport failure on a single query is logged and consumes the attempt.
/// If every attempt fails that way, the last failure is returned.
#[instrument(
    skip_all,
    err(Debug),
    fields(organization_id = %organization_id, activity_id = %activity_id)
)]
pub async fn wait_for_activity(
    source: &(impl ActivityStatusSource + ?Sized),
    organization_id: &OrganizationId,
    activity_id: &ActivityId,
    options: PollOptions,
    mut cancel: CancelSignal,
) -> Result<Activity> {
    let cancelled = |attempt| PasskeyWalletClientError::Cancelled {
        activity_id: activity_id.clone(),
        attempt,
    };

    let mut last_status: Option<ActivityStatus> = None;
    let mut last_error: Option<PasskeyWalletClientError> = None;

    for attempt in 1..=options.max_attempts {
        let query = async {
            sleep(options.delay_before(attempt)).await;
            source.get_activity(organization_id, activity_id).await
        };
        let queried = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(attempt)),
            _ = deadline_reached(options.deadline) => return Err(cancelled(attempt)),
            queried = query => queried,
        };

        let activity = match queried {
            Ok(activity) => activity,
            Err(e) if e.is_transient() => {
                warn!("Status query failed on attempt {}: {}", attempt, e);
                last_error = Some(e);
                continue;
            }
            Err(e) => return Err(e),
        };

        match activity.status.outcome() {
            StatusOutcome::Completed => {
                info!("Activity completed. attempt={}", attempt);
                return Ok(activity);
            }
            StatusOutcome::Failed(kind) => {
                return Err(PasskeyWalletClientError::ActivityTerminalFailure {
                    kind,
                    activity_id: activity_id.clone(),
                    attempt,
                })
            }
            StatusOutcome::InProgress => {
                debug!("Activity {} on attempt {}", activity.status, attempt);
                last_status = Some(activity.status);
            }
        }
    }

    match (last_status, last_error) {
        (Some(last_status), _) => Err(PasskeyWalletClientError::Timeout {
            activity_id: activity_id.clone(),
            last_status,
            attempts: options.max_attempts,
        }),
        (None, Some(error)) => Err(error),
        (None, None) => Err(PasskeyWalletClientError::Validation(
            "no polling attempts were made".to_string(),
        )),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use passkey_wallet::types::activity::{ActivityType, TerminalFailureKind};
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicU32, Ordering},
            Mutex,
        },
    };

    /// Replays a fixed sequence of statuses; the last one repeats.
    pub(crate) struct ScriptedSource {
        statuses: Mutex<VecDeque<Result<ActivityStatus>>>,
        pub(crate) queries: AtomicU32,
    }

    impl ScriptedSource {
        pub(crate) fn new(statuses: Vec<ActivityStatus>) -> Self {
            Self::with_results(statuses.into_iter().map(Ok).collect())
        }

        pub(crate) fn with_results(results: Vec<Result<ActivityStatus>>) -> Self {
            Self {
                statuses: Mutex::new(results.into()),
                queries: AtomicU32::new(0),
            }
        }

        pub(crate) fn queries(&self) -> u32 {
            self.queries.load(Ordering::SeqCst)
        }
    }

    pub(crate) fn activity(status: ActivityStatus) -> Activity {
        Activity {
            id: ActivityId::new("act-1"),
            organization_id: OrganizationId::new("org-1"),
            status,
            activity_type: ActivityType::SignTransaction,
            result: None,
        }
    }

    fn unavailable() -> PasskeyWalletClientError {
        PasskeyWalletClientError::UnexpectedStatus {
            status: 503,
            body: "unavailable".to_string(),
        }
    }

    #[async_trait]
    impl ActivityStatusSource for ScriptedSource {
        async fn get_activity(
            &self,
            _organization_id: &OrganizationId,
            _activity_id: &ActivityId,
        ) -> Result<Activity> {
            let _ = self.queries.fetch_add(1, Ordering::SeqCst);
            let mut statuses = self.statuses.lock().unwrap();
            let next = if statuses.len() > 1 {
                statuses.pop_front().unwrap()
            } else {
                match statuses.front().unwrap() {
                    Ok(status) => Ok(*status),
                    Err(_) => Err(unavailable()),
                }
            };
            next.map(activity)
        }
    }

    async fn wait(source: &ScriptedSource, options: PollOptions) -> Result<Activity> {
        wait_for_activity(
            source,
            &OrganizationId::new("org-1"),
            &ActivityId::new("act-1"),
            options,
            CancelSignal::never(),
        )
        .await
    }

    #[tokio::test(start_paused = true)]
    async fn completes_on_third_query() {
        let source = ScriptedSource::new(vec![
            ActivityStatus::Created,
            ActivityStatus::Pending,
            ActivityStatus::Completed,
        ]);

        let activity = wait(&source, PollOptions::default()).await.unwrap();
        assert_eq!(activity.status, ActivityStatus::Completed);
        assert_eq!(source.queries(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_forever_times_out() {
        let source = ScriptedSource::new(vec![ActivityStatus::Pending]);

        let error = wait(&source, PollOptions::default()).await.unwrap_err();
        assert!(matches!(
            error,
            PasskeyWalletClientError::Timeout {
                last_status: ActivityStatus::Pending,
                attempts: DEFAULT_MAX_ATTEMPTS,
                ..
            }
        ));
        assert_eq!(source.queries(), DEFAULT_MAX_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_returns_after_one_query() {
        let source = ScriptedSource::new(vec![ActivityStatus::Rejected]);

        let error = wait(&source, PollOptions::default()).await.unwrap_err();
        assert!(matches!(
            error,
            PasskeyWalletClientError::ActivityTerminalFailure {
                kind: TerminalFailureKind::Rejected,
                attempt: 1,
                ..
            }
        ));
        assert_eq!(source.queries(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_linear() {
        let source = ScriptedSource::new(vec![
            ActivityStatus::Pending,
            ActivityStatus::Pending,
            ActivityStatus::Pending,
            ActivityStatus::Pending,
            ActivityStatus::Completed,
        ]);

        let start = Instant::now();
        let _ = wait(&source, PollOptions::new(5, Duration::from_millis(200)))
            .await
            .unwrap();

        // 200 + 400 + 600 + 800 + 1000
        assert!(start.elapsed() >= Duration::from_millis(3000));
        assert_eq!(source.queries(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_consume_attempts() {
        let source = ScriptedSource::with_results(vec![
            Err(unavailable()),
            Ok(ActivityStatus::Pending),
            Ok(ActivityStatus::Completed),
        ]);

        let activity = wait(&source, PollOptions::default()).await.unwrap();
        assert_eq!(activity.status, ActivityStatus::Completed);
        assert_eq!(source.queries(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn only_transport_errors_return_last_error() {
        let source = ScriptedSource::with_results(vec![Err(unavailable())]);

        let error = wait(&source, PollOptions::new(3, DEFAULT_BASE_DELAY))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            PasskeyWalletClientError::UnexpectedStatus { status: 503, .. }
        ));
        assert_eq!(source.queries(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let source = ScriptedSource::new(vec![ActivityStatus::Pending]);
        let (canceller, signal) = cancellation();
        let organization_id = OrganizationId::new("org-1");
        let activity_id = ActivityId::new("act-1");

        let waiter = wait_for_activity(
            &source,
            &organization_id,
            &activity_id,
            PollOptions::new(5, Duration::from_secs(10)),
            signal,
        );
        let cancel = async {
            sleep(Duration::from_secs(15)).await;
            canceller.cancel();
        };

        let (result, ()) = tokio::join!(waiter, cancel);
        assert!(matches!(
            result,
            Err(PasskeyWalletClientError::Cancelled { attempt: 2, .. })
        ));
        assert_eq!(source.queries(), 1);
    }

    /// Accepts the query and never answers.
    struct StalledSource {
        queries: AtomicU32,
    }

    #[async_trait]
    impl ActivityStatusSource for StalledSource {
        async fn get_activity(
            &self,
            _organization_id: &OrganizationId,
            _activity_id: &ActivityId,
        ) -> Result<Activity> {
            let _ = self.queries.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_status_query() {
        let source = StalledSource {
            queries: AtomicU32::new(0),
        };
        let (canceller, signal) = cancellation();
        let organization_id = OrganizationId::new("org-1");
        let activity_id = ActivityId::new("act-1");

        let start = Instant::now();
        let waiter = wait_for_activity(
            &source,
            &organization_id,
            &activity_id,
            PollOptions::new(5, Duration::from_millis(200)),
            signal,
        );
        let cancel = async {
            sleep(Duration::from_secs(2)).await;
            canceller.cancel();
        };

        let (result, ()) = tokio::join!(waiter, cancel);
        assert!(matches!(
            result,
            Err(PasskeyWalletClientError::Cancelled { attempt: 1, .. })
        ));
        assert_eq!(source.queries.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_interrupts_status_query() {
        let source = StalledSource {
            queries: AtomicU32::new(0),
        };
        let options = PollOptions::new(5, Duration::from_millis(200))
            .with_deadline(Instant::now() + Duration::from_secs(1));

        let error = wait_for_activity(
            &source,
            &OrganizationId::new("org-1"),
            &ActivityId::new("act-1"),
            options,
            CancelSignal::never(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            error,
            PasskeyWalletClientError::Cancelled { attempt: 1, .. }
        ));
        assert_eq!(source.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cancels_wait() {
        let source = ScriptedSource::new(vec![ActivityStatus::Pending]);
        let options = PollOptions::new(10, Duration::from_secs(1))
            .with_deadline(Instant::now() + Duration::from_millis(3500));

        let error = wait(&source, options).await.unwrap_err();
        // Attempts 1 and 2 finish at 1s and 3s; attempt 3 would end at 6s.
        assert!(matches!(
            error,
            PasskeyWalletClientError::Cancelled { attempt: 3, .. }
        ));
        assert_eq!(source.queries(), 2);
    }

    #[test]
    fn zero_attempts_become_one() {
        assert_eq!(PollOptions::new(0, DEFAULT_BASE_DELAY).max_attempts(), 1);
    }

    proptest::proptest! {
        #[test]
        fn backoff_grows_linearly(max_attempts in 1u32..50, base_ms in 0u64..10_000) {
            let options = PollOptions::new(max_attempts, Duration::from_millis(base_ms));
            let total: Duration = (1..=options.max_attempts())
                .map(|attempt| options.delay_before(attempt))
                .sum();
            let n = u64::from(max_attempts);
            proptest::prop_assert_eq!(total, Duration::from_millis(base_ms * n * (n + 1) / 2));
        }
    }
}
