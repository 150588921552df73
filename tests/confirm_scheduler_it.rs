// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use tokio::time::{self, Instant};
// self
use oauth2_relay::{
	auth::{ContextId, TargetId},
	confirm::{ConfirmationScheduler, PollOutcome, PollSchedule, PollTarget, StatusCheck},
};

type Observation = Option<&'static str>;

/// Check that answers from `script` in order and repeats the last entry once exhausted.
fn scripted(script: &[Observation]) -> (Arc<AtomicUsize>, impl StatusCheck<&'static str>) {
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&calls);
	let script = script.to_vec();
	let check = move || {
		let call = counter.fetch_add(1, Ordering::SeqCst);
		let observed = script.get(call).or(script.last()).copied().flatten();

		async move { observed }
	};

	(calls, check)
}

fn key(target: u64, context: u64) -> PollTarget {
	PollTarget::new(target, context)
}

fn assert_elapsed(started: Instant, expected_ms: u64) {
	let elapsed = started.elapsed();

	assert!(
		elapsed >= Duration::from_millis(expected_ms)
			&& elapsed < Duration::from_millis(expected_ms + 100),
		"Expected about {expected_ms}ms to pass, got {elapsed:?}."
	);
}

fn schedule(interval_ms: u64, max_wait_ms: u64) -> PollSchedule {
	PollSchedule::from_millis(interval_ms, max_wait_ms).expect("Fixture schedule should be valid.")
}

#[tokio::test(start_paused = true)]
async fn confirms_on_the_fifth_tick_of_the_default_schedule() {
	let scheduler = ConfirmationScheduler::new();
	let (calls, check) = scripted(&[Some("off"), Some("off"), None, Some("off"), Some("on")]);
	let started = Instant::now();
	let outcome =
		scheduler.start_polling(key(1, 10), "on", PollSchedule::default(), check).await;

	assert_eq!(outcome, PollOutcome::Confirmed { observed: "on", polls: 5 });
	assert_elapsed(started, 8_000);
	assert_eq!(calls.load(Ordering::SeqCst), 5);
	assert!(scheduler.is_empty());
}

#[tokio::test(start_paused = true)]
async fn first_tick_runs_immediately() {
	let scheduler = ConfirmationScheduler::new();
	let (_, check) = scripted(&[Some("on")]);
	let started = Instant::now();
	let outcome =
		scheduler.start_polling(key(1, 10), "on", PollSchedule::default(), check).await;

	assert_eq!(outcome, PollOutcome::Confirmed { observed: "on", polls: 1 });
	assert_elapsed(started, 0);
}

#[tokio::test(start_paused = true)]
async fn times_out_after_the_tick_budget_and_stops_polling() {
	let scheduler = ConfirmationScheduler::new();
	let (calls, check) = scripted(&[Some("off")]);
	let outcome =
		scheduler.start_polling(key(1, 10), "on", PollSchedule::default(), check).await;

	assert_eq!(outcome, PollOutcome::TimedOut { last_observed: Some("off"), polls: 5 });
	assert!(scheduler.is_empty());

	time::sleep(Duration::from_millis(10_000)).await;

	assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn timeout_without_observations_has_no_last_state() {
	let scheduler = ConfirmationScheduler::new();
	let (_, check) = scripted(&[None]);
	let outcome = scheduler.start_polling(key(1, 10), "on", schedule(1_000, 2_000), check).await;

	assert_eq!(outcome, PollOutcome::TimedOut { last_observed: None, polls: 2 });
}

#[tokio::test(start_paused = true)]
async fn uneven_schedule_rounds_the_tick_count_up() {
	let scheduler = ConfirmationScheduler::new();
	let (calls, check) = scripted(&[Some("off")]);
	let started = Instant::now();
	let outcome = scheduler.start_polling(key(1, 10), "on", schedule(3_000, 10_000), check).await;

	assert_eq!(outcome, PollOutcome::TimedOut { last_observed: Some("off"), polls: 4 });
	assert_elapsed(started, 9_000);
	assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn hung_status_check_times_out_at_the_maximum_wait() {
	let scheduler = ConfirmationScheduler::new();
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&calls);
	let hangs_after_first = move || {
		let call = counter.fetch_add(1, Ordering::SeqCst);

		async move {
			if call == 0 {
				Some("off")
			} else {
				std::future::pending::<Observation>().await
			}
		}
	};
	let started = Instant::now();
	let outcome = scheduler
		.start_polling(key(1, 10), "on", PollSchedule::default(), hangs_after_first)
		.await;

	assert_eq!(outcome, PollOutcome::TimedOut { last_observed: Some("off"), polls: 2 });
	assert_elapsed(started, 10_000);
	assert_eq!(calls.load(Ordering::SeqCst), 2);
	assert!(scheduler.is_empty());

	let started = Instant::now();
	let never = || std::future::pending::<Observation>();
	let outcome = scheduler.start_polling(key(2, 10), "on", PollSchedule::default(), never).await;

	assert_eq!(outcome, PollOutcome::TimedOut { last_observed: None, polls: 1 });
	assert_elapsed(started, 10_000);
	assert!(scheduler.is_empty());
}

#[tokio::test(start_paused = true)]
async fn newer_command_supersedes_the_pending_poll() {
	let scheduler = ConfirmationScheduler::new();
	let (first_calls, first_check) = scripted(&[Some("off")]);
	let first = scheduler.start_polling(key(1, 10), "on", PollSchedule::default(), first_check);

	time::sleep(Duration::from_millis(3_000)).await;

	assert_eq!(first_calls.load(Ordering::SeqCst), 2);

	let (_, second_check) = scripted(&[Some("dim")]);
	let second = scheduler.start_polling(key(1, 10), "dim", PollSchedule::default(), second_check);

	assert_eq!(first.await, PollOutcome::Cancelled);
	assert_eq!(second.await, PollOutcome::Confirmed { observed: "dim", polls: 1 });
	assert_eq!(first_calls.load(Ordering::SeqCst), 2);
	assert!(scheduler.is_empty());
}

#[tokio::test(start_paused = true)]
async fn late_result_of_a_superseded_poll_is_discarded() {
	let scheduler = ConfirmationScheduler::new();
	let slow = || async {
		time::sleep(Duration::from_millis(1_000)).await;

		Some("on")
	};
	let first = scheduler.start_polling(key(1, 10), "on", PollSchedule::default(), slow);

	time::sleep(Duration::from_millis(500)).await;

	let (_, check) = scripted(&[Some("off")]);
	let second = scheduler.start_polling(key(1, 10), "on", schedule(2_000, 4_000), check);

	assert_eq!(first.await, PollOutcome::Cancelled);
	assert_eq!(second.await, PollOutcome::TimedOut { last_observed: Some("off"), polls: 2 });
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_a_live_poll_and_ignores_absent_keys() {
	let scheduler = ConfirmationScheduler::new();
	let (calls, check) = scripted(&[Some("off")]);
	let handle = scheduler.start_polling(key(1, 10), "on", PollSchedule::default(), check);

	time::sleep(Duration::from_millis(2_500)).await;

	let state = scheduler.state(&key(1, 10)).expect("Poll should be live.");

	assert_eq!(state.desired, "on");
	assert_eq!(state.attempts, 2);
	assert_eq!(state.schedule, PollSchedule::default());
	assert_eq!(handle.target(), &key(1, 10));
	assert!(scheduler.cancel(&key(1, 10)));
	assert!(!scheduler.cancel(&key(1, 10)));
	assert!(!scheduler.cancel(&key(9, 9)));
	assert_eq!(scheduler.cancel_context(&ContextId::from(99_u64)), 0);
	assert_eq!(handle.await, PollOutcome::Cancelled);

	time::sleep(Duration::from_millis(10_000)).await;

	assert_eq!(calls.load(Ordering::SeqCst), 2);
	assert!(scheduler.state(&key(1, 10)).is_none());
}

#[tokio::test(start_paused = true)]
async fn dropping_a_context_scope_cancels_only_its_polls() {
	let scheduler = ConfirmationScheduler::new();
	let scope = scheduler.scope(ContextId::from(10_u64));
	let (_, first_check) = scripted(&[Some("off")]);
	let (_, second_check) = scripted(&[Some("off")]);
	let (_, other_check) = scripted(&[Some("off")]);
	let first =
		scope.start_polling(TargetId::from(1_u64), "on", PollSchedule::default(), first_check);
	let second =
		scope.start_polling(TargetId::from(2_u64), "on", PollSchedule::default(), second_check);
	let other = scheduler.start_polling(key(1, 20), "on", PollSchedule::default(), other_check);

	assert_eq!(scope.context(), &ContextId::from(10_u64));
	assert_eq!(scheduler.len(), 3);

	drop(scope);

	assert_eq!(first.await, PollOutcome::Cancelled);
	assert_eq!(second.await, PollOutcome::Cancelled);
	assert_eq!(scheduler.len(), 1);
	assert!(scheduler.state(&key(1, 20)).is_some());
	assert!(scheduler.cancel(&key(1, 20)));
	assert_eq!(other.await, PollOutcome::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_every_poll() {
	let scheduler = ConfirmationScheduler::new();
	let (_, first_check) = scripted(&[Some("off")]);
	let (_, second_check) = scripted(&[Some("off")]);
	let first = scheduler.start_polling(key(1, 10), "on", PollSchedule::default(), first_check);
	let second = scheduler.start_polling(key(2, 20), "on", PollSchedule::default(), second_check);

	scheduler.shutdown();

	assert!(scheduler.is_empty());
	assert_eq!(first.await, PollOutcome::Cancelled);
	assert_eq!(second.await, PollOutcome::Cancelled);
}
