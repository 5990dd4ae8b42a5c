//! Query controller for the single location-scoped weather query.
//!
//! The reactive-query behavior (cache, bounded retry, single-flight
//! coalescing, periodic refresh) is made explicit here as a small state
//! machine, [`QueryMachine`], with no I/O of its own, plus an async driver,
//! [`QueryController`], that owns the fetcher and runs one fetch cycle per
//! trigger. The periodic timer lives in the caller's event loop and arrives
//! as [`Trigger::TimerTick`].

use chrono::Local;
use tracing::{debug, warn};

use crate::model::{LOCALTIME_FORMAT, WeatherSnapshot};
use crate::provider::{FetchError, WeatherFetch};

/// Events that may start a fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Start,
    TimerTick,
    ManualRefetch,
}

/// What a trigger resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchCommand {
    /// A new cycle begins; the caller must fetch and report back via `settle`.
    Dispatch,
    /// A cycle is already in flight; this trigger folds into it.
    Coalesced,
}

/// What a settled attempt resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    /// Attempt failed with retry budget remaining; fetch again.
    Retry,
    /// Cycle is over, optionally carrying a user-visible notice.
    Done(Option<Notice>),
}

/// One-time user-visible notification emitted on entry into a terminal
/// error state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: &'static str,
    pub detail: &'static str,
}

impl Notice {
    fn data_unavailable() -> Self {
        Self {
            title: "Weather Data Unavailable",
            detail: "Please add your WeatherAPI key to fetch live weather data. \
                     Using demo mode for now.",
        }
    }
}

/// State of the weather query.
///
/// `last_data` always holds the most recent successful snapshot, so a stale
/// success survives later failed cycles.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState {
    Idle,
    Loading { last_data: Option<WeatherSnapshot> },
    Success(WeatherSnapshot),
    Error { error: FetchError, last_data: Option<WeatherSnapshot> },
}

/// Pure query state machine: triggers and settle results in, commands out.
#[derive(Debug)]
pub struct QueryMachine {
    state: QueryState,
    max_attempts: u32,
    attempts: u32,
    settled_once: bool,
    last_cycle_errored: bool,
    fallback: Option<WeatherSnapshot>,
}

impl QueryMachine {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: QueryState::Idle,
            max_attempts: max_attempts.max(1),
            attempts: 0,
            settled_once: false,
            last_cycle_errored: false,
            fallback: None,
        }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Apply a fetch trigger. Re-entry into `Loading` coalesces: triggers
    /// arriving while a cycle is in flight start no second one.
    pub fn apply(&mut self, trigger: Trigger) -> FetchCommand {
        if matches!(self.state, QueryState::Loading { .. }) {
            debug!(?trigger, "fetch already in flight, coalescing");
            return FetchCommand::Coalesced;
        }

        let last_data = match std::mem::replace(&mut self.state, QueryState::Idle) {
            QueryState::Idle => None,
            QueryState::Success(data) => Some(data),
            QueryState::Error { last_data, .. } => last_data,
            QueryState::Loading { .. } => unreachable!("guarded above"),
        };

        self.state = QueryState::Loading { last_data };
        self.attempts = 0;
        debug!(?trigger, "dispatching fetch cycle");
        FetchCommand::Dispatch
    }

    /// Record the result of one fetch attempt.
    pub fn settle(&mut self, result: Result<WeatherSnapshot, FetchError>) -> Settled {
        self.attempts += 1;

        match result {
            Ok(snapshot) => {
                self.state = QueryState::Success(snapshot);
                self.settled_once = true;
                self.last_cycle_errored = false;
                Settled::Done(None)
            }
            Err(error) => {
                if self.attempts < self.max_attempts {
                    debug!(attempt = self.attempts, %error, "fetch attempt failed, retrying");
                    return Settled::Retry;
                }

                warn!(attempts = self.attempts, %error, "fetch cycle exhausted retry budget");

                let last_data = match std::mem::replace(&mut self.state, QueryState::Idle) {
                    QueryState::Loading { last_data } | QueryState::Error { last_data, .. } => {
                        last_data
                    }
                    QueryState::Success(data) => Some(data),
                    QueryState::Idle => None,
                };

                if self.fallback.is_none() {
                    let localtime = Local::now().format(LOCALTIME_FORMAT).to_string();
                    self.fallback = Some(WeatherSnapshot::demo(localtime));
                }

                let notice = if self.last_cycle_errored {
                    None
                } else {
                    Some(Notice::data_unavailable())
                };

                self.state = QueryState::Error { error, last_data };
                self.settled_once = true;
                self.last_cycle_errored = true;
                Settled::Done(notice)
            }
        }
    }

    /// Snapshot of the state the renderer consumes.
    pub fn view(&self) -> ViewState<'_> {
        // Before the first settle the state is Idle or Loading; both paint
        // the skeleton so the first draw never shows the unavailable card.
        let is_loading = !self.settled_once;

        let data = match &self.state {
            QueryState::Success(data) => Some(data),
            QueryState::Loading { last_data } | QueryState::Error { last_data, .. } => {
                last_data.as_ref()
            }
            QueryState::Idle => None,
        };

        let error = match &self.state {
            QueryState::Error { error, .. } => Some(error),
            _ => None,
        };

        ViewState { is_loading, data, error, fallback: self.fallback.as_ref() }
    }
}

/// Read-only view of the query handed to the renderer.
#[derive(Debug, Clone, Copy)]
pub struct ViewState<'a> {
    /// True until the very first cycle settles, never again afterwards.
    pub is_loading: bool,
    /// Last successful snapshot, if any.
    pub data: Option<&'a WeatherSnapshot>,
    /// Last terminal failure, if the query currently sits in an error state.
    pub error: Option<&'a FetchError>,
    /// Demo snapshot, synthesized once on the first terminal error.
    pub fallback: Option<&'a WeatherSnapshot>,
}

impl<'a> ViewState<'a> {
    /// The snapshot to display: real data always beats the fallback, and the
    /// fallback is offered only while a terminal error stands.
    pub fn display_snapshot(&self) -> Option<&'a WeatherSnapshot> {
        self.data.or(if self.error.is_some() { self.fallback } else { None })
    }
}

/// Async driver: owns the fetcher and the machine, runs one full cycle
/// (dispatch, fetch, settle, retry loop) per trigger.
#[derive(Debug)]
pub struct QueryController {
    fetcher: Box<dyn WeatherFetch>,
    location: String,
    machine: QueryMachine,
}

impl QueryController {
    pub fn new(fetcher: Box<dyn WeatherFetch>, location: String, max_attempts: u32) -> Self {
        Self { fetcher, location, machine: QueryMachine::new(max_attempts) }
    }

    /// Initial fetch on startup.
    pub async fn start(&mut self) -> Option<Notice> {
        self.drive(Trigger::Start).await
    }

    /// Periodic refresh from the event loop timer.
    pub async fn tick(&mut self) -> Option<Notice> {
        self.drive(Trigger::TimerTick).await
    }

    /// Manual re-fetch requested by the user.
    pub async fn refetch(&mut self) -> Option<Notice> {
        self.drive(Trigger::ManualRefetch).await
    }

    pub fn view(&self) -> ViewState<'_> {
        self.machine.view()
    }

    async fn drive(&mut self, trigger: Trigger) -> Option<Notice> {
        match self.machine.apply(trigger) {
            FetchCommand::Coalesced => None,
            FetchCommand::Dispatch => loop {
                let result = self.fetcher.fetch_current(&self.location).await;
                match self.machine.settle(result) {
                    Settled::Retry => continue,
                    Settled::Done(notice) => break notice,
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn snap(temp_c: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            location: "Colombo".to_string(),
            country: "Sri Lanka".to_string(),
            localtime: "2025-06-01 14:30".to_string(),
            temp_c,
            condition: "Sunny".to_string(),
            icon: String::new(),
            humidity: 70,
            wind_kph: 12.0,
            uv: 7.0,
            vis_km: 10.0,
        }
    }

    fn failure() -> FetchError {
        FetchError::Status { status: 401, body: "invalid key".to_string() }
    }

    /// Fetcher double that plays back a fixed script and counts calls.
    #[derive(Debug)]
    struct ScriptedFetch {
        script: Mutex<Vec<Result<WeatherSnapshot, FetchError>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedFetch {
        fn new(script: Vec<Result<WeatherSnapshot, FetchError>>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (Self { script: Mutex::new(script), calls: Arc::clone(&calls) }, calls)
        }
    }

    #[async_trait]
    impl WeatherFetch for ScriptedFetch {
        async fn fetch_current(&self, _location: &str) -> Result<WeatherSnapshot, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script.lock().unwrap().remove(0)
        }
    }

    // Machine-level tests: transitions, coalescing, lifecycle.

    #[test]
    fn triggers_coalesce_while_a_cycle_is_in_flight() {
        let mut machine = QueryMachine::new(3);

        assert_eq!(machine.apply(Trigger::Start), FetchCommand::Dispatch);
        assert_eq!(machine.apply(Trigger::ManualRefetch), FetchCommand::Coalesced);
        assert_eq!(machine.apply(Trigger::TimerTick), FetchCommand::Coalesced);

        machine.settle(Ok(snap(29.0)));
        assert_eq!(machine.apply(Trigger::ManualRefetch), FetchCommand::Dispatch);
    }

    #[test]
    fn loading_is_reported_only_before_the_first_settle() {
        let mut machine = QueryMachine::new(3);
        machine.apply(Trigger::Start);
        assert!(machine.view().is_loading);

        machine.settle(Ok(snap(29.0)));
        assert!(!machine.view().is_loading);

        // Subsequent refetches never show the loading view again.
        machine.apply(Trigger::TimerTick);
        assert!(!machine.view().is_loading);
        assert_eq!(machine.view().data, Some(&snap(29.0)));
    }

    #[test]
    fn retry_budget_allows_three_attempts_then_turns_terminal() {
        let mut machine = QueryMachine::new(3);
        machine.apply(Trigger::Start);

        assert_eq!(machine.settle(Err(failure())), Settled::Retry);
        assert_eq!(machine.settle(Err(failure())), Settled::Retry);
        match machine.settle(Err(failure())) {
            Settled::Done(Some(notice)) => {
                assert_eq!(notice.title, "Weather Data Unavailable");
            }
            other => panic!("expected terminal error with notice, got {other:?}"),
        }

        let view = machine.view();
        assert!(view.data.is_none());
        assert!(view.error.is_some());
    }

    #[test]
    fn success_mid_cycle_stops_retrying() {
        let mut machine = QueryMachine::new(3);
        machine.apply(Trigger::Start);

        assert_eq!(machine.settle(Err(failure())), Settled::Retry);
        assert_eq!(machine.settle(Ok(snap(30.2))), Settled::Done(None));
        assert_eq!(machine.view().data, Some(&snap(30.2)));
    }

    #[test]
    fn terminal_error_offers_the_demo_fallback() {
        let mut machine = QueryMachine::new(1);
        machine.apply(Trigger::Start);
        machine.settle(Err(failure()));

        let view = machine.view();
        let shown = view.display_snapshot().expect("fallback should be shown");
        assert_eq!(shown.temp_c, 29.0);
        assert_eq!(shown.condition, "Partly cloudy");
        assert_eq!(shown.humidity, 78);
        assert_eq!(shown.wind_kph, 15.0);
        assert_eq!(shown.uv, 8.0);
        assert_eq!(shown.vis_km, 10.0);
    }

    #[test]
    fn fallback_is_synthesized_once_and_reused() {
        let mut machine = QueryMachine::new(1);
        machine.apply(Trigger::Start);
        machine.settle(Err(failure()));
        let first = machine.view().fallback.cloned().expect("fallback exists");

        machine.apply(Trigger::TimerTick);
        machine.settle(Err(failure()));
        let second = machine.view().fallback.cloned().expect("fallback exists");

        assert_eq!(first, second);
    }

    #[test]
    fn stale_success_beats_the_fallback() {
        let mut machine = QueryMachine::new(1);
        machine.apply(Trigger::Start);
        machine.settle(Ok(snap(31.0)));

        machine.apply(Trigger::TimerTick);
        machine.settle(Err(failure()));

        let view = machine.view();
        assert!(view.error.is_some());
        assert_eq!(view.display_snapshot(), Some(&snap(31.0)));
    }

    #[test]
    fn notice_fires_once_per_outage_not_per_cycle() {
        let mut machine = QueryMachine::new(1);

        machine.apply(Trigger::Start);
        let first = machine.settle(Err(failure()));
        assert!(matches!(first, Settled::Done(Some(_))));

        // Still failing five minutes later: no second toast.
        machine.apply(Trigger::TimerTick);
        let second = machine.settle(Err(failure()));
        assert!(matches!(second, Settled::Done(None)));

        // Recovery then a fresh outage notifies again.
        machine.apply(Trigger::TimerTick);
        machine.settle(Ok(snap(29.0)));
        machine.apply(Trigger::TimerTick);
        let third = machine.settle(Err(failure()));
        assert!(matches!(third, Settled::Done(Some(_))));
    }

    #[test]
    fn unstarted_query_already_paints_the_skeleton() {
        let machine = QueryMachine::new(3);
        let view = machine.view();

        // The first draw happens before start(); it must be the loading
        // skeleton, not the unavailable card.
        assert!(view.is_loading);
        assert!(view.data.is_none());
        assert!(view.error.is_none());
        assert!(view.display_snapshot().is_none());
    }

    #[test]
    fn loading_holds_from_idle_through_the_first_cycle_only() {
        let mut machine = QueryMachine::new(3);
        assert!(machine.view().is_loading);

        machine.apply(Trigger::Start);
        assert!(machine.view().is_loading);

        machine.settle(Err(failure()));
        assert!(machine.view().is_loading);

        machine.settle(Ok(snap(29.0)));
        assert!(!machine.view().is_loading);
    }

    // Driver-level tests: the controller against a scripted fetcher.

    #[tokio::test]
    async fn start_fetches_exactly_once_on_success() {
        let (fetcher, calls) = ScriptedFetch::new(vec![Ok(snap(29.4))]);
        let mut controller =
            QueryController::new(Box::new(fetcher), "Colombo,Sri Lanka".to_string(), 3);

        let notice = controller.start().await;
        assert!(notice.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.view().data, Some(&snap(29.4)));
    }

    #[tokio::test]
    async fn failing_cycle_consumes_the_whole_retry_budget() {
        let (fetcher, calls) =
            ScriptedFetch::new(vec![Err(failure()), Err(failure()), Err(failure())]);
        let mut controller =
            QueryController::new(Box::new(fetcher), "Colombo,Sri Lanka".to_string(), 3);

        let notice = controller.start().await;
        assert!(notice.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let view = controller.view();
        assert!(view.data.is_none());
        assert!(view.error.is_some());
        assert_eq!(view.display_snapshot().map(|s| s.temp_c), Some(29.0));
    }

    #[tokio::test]
    async fn transient_failure_recovers_within_a_cycle() {
        let (fetcher, calls) = ScriptedFetch::new(vec![Err(failure()), Ok(snap(28.7))]);
        let mut controller =
            QueryController::new(Box::new(fetcher), "Colombo,Sri Lanka".to_string(), 3);

        let notice = controller.start().await;
        assert!(notice.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(controller.view().data, Some(&snap(28.7)));
    }

    #[tokio::test]
    async fn manual_refetch_after_error_replaces_fallback_with_data() {
        let (fetcher, _calls) = ScriptedFetch::new(vec![
            Err(failure()),
            Err(failure()),
            Err(failure()),
            Ok(snap(27.9)),
        ]);
        let mut controller =
            QueryController::new(Box::new(fetcher), "Colombo,Sri Lanka".to_string(), 3);

        controller.start().await;
        assert_eq!(controller.view().display_snapshot().map(|s| s.temp_c), Some(29.0));

        let notice = controller.refetch().await;
        assert!(notice.is_none());
        assert_eq!(controller.view().display_snapshot(), Some(&snap(27.9)));
        assert!(controller.view().error.is_none());
    }
}
