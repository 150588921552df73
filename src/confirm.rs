//! Deduplicated confirmation polling for state-changing commands.
//!
//! [`ConfirmationScheduler::start_polling`] registers one poll per [`PollTarget`] and returns a
//! [`PollHandle`] that resolves to a [`PollOutcome`]. Registering a poll for a key that already
//! has one cancels the previous poll first, so the newest command for a target always wins and
//! at most one poll per key is live. Ticks for one key run strictly in sequence inside a single
//! task; a status check that is already running when its poll is cancelled is allowed to finish,
//! but its result is discarded.

pub mod check;
pub mod schedule;
pub mod target;

pub use check::*;
pub use schedule::*;
pub use target::*;

// std
use std::{
	sync::atomic::{AtomicU64, Ordering},
	task::{Context, Poll},
};
// crates.io
use tokio::{sync::oneshot, time::Instant};
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	auth::{ContextId, TargetId},
	obs::{self, OpKind, OpSpan, trace_event},
};

/// Terminal result of a confirmation poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome<S> {
	/// The observed state matched the desired state.
	Confirmed {
		/// Observed value that matched.
		observed: S,
		/// Number of ticks that ran, including the confirming one.
		polls: u32,
	},
	/// The tick budget ran out without a match, or a status check was still running at the
	/// maximum wait.
	TimedOut {
		/// Most recent observation, if any tick produced one.
		last_observed: Option<S>,
		/// Number of ticks that ran.
		polls: u32,
	},
	/// The poll was superseded, cancelled, or shut down before resolving.
	Cancelled,
}
impl<S> PollOutcome<S> {
	/// Returns `true` for [`PollOutcome::Confirmed`].
	pub fn is_confirmed(&self) -> bool {
		matches!(self, Self::Confirmed { .. })
	}

	/// Returns a stable label suitable for span or metric fields.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Confirmed { .. } => "confirmed",
			Self::TimedOut { .. } => "timed_out",
			Self::Cancelled => "cancelled",
		}
	}
}

/// Snapshot of a live poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollState<S> {
	/// Key the poll is registered under.
	pub target: PollTarget,
	/// State the poll waits for.
	pub desired: S,
	/// Number of ticks completed so far.
	pub attempts: u32,
	/// Cadence and wait budget.
	pub schedule: PollSchedule,
}

/// Future resolving to the outcome of one registered poll.
///
/// Dropping the handle does not cancel the poll; use [`ConfirmationScheduler::cancel`].
#[derive(Debug)]
pub struct PollHandle<S> {
	target: PollTarget,
	receiver: oneshot::Receiver<PollOutcome<S>>,
}
impl<S> PollHandle<S> {
	/// Key this handle was registered under.
	pub fn target(&self) -> &PollTarget {
		&self.target
	}
}
impl<S> Future for PollHandle<S> {
	type Output = PollOutcome<S>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.receiver)
			.poll(cx)
			.map(|outcome| outcome.unwrap_or(PollOutcome::Cancelled))
	}
}

struct Entry<S> {
	generation: u64,
	desired: S,
	attempts: u32,
	schedule: PollSchedule,
	token: CancellationToken,
}

struct Shared<S> {
	entries: Mutex<HashMap<PollTarget, Entry<S>>>,
	generation: AtomicU64,
}
impl<S> Shared<S> {
	/// Records a completed tick; returns `false` when the poll is no longer the live one.
	fn record_tick(&self, target: &PollTarget, generation: u64, polls: u32) -> bool {
		match self.entries.lock().get_mut(target) {
			Some(entry) if entry.generation == generation => {
				entry.attempts = polls;

				true
			},
			_ => false,
		}
	}

	/// Removes the entry if it still belongs to `generation`.
	fn retire(&self, target: &PollTarget, generation: u64) -> bool {
		let mut entries = self.entries.lock();

		if entries.get(target).is_some_and(|entry| entry.generation == generation) {
			entries.remove(target);

			true
		} else {
			false
		}
	}
}

/// Table of in-flight confirmation polls keyed by [`PollTarget`].
///
/// Clones share the same table. Polls run as Tokio tasks, so
/// [`start_polling`](Self::start_polling) must be called from within a Tokio runtime.
pub struct ConfirmationScheduler<S> {
	shared: Arc<Shared<S>>,
}
impl<S> ConfirmationScheduler<S>
where
	S: 'static + Clone + PartialEq + Send + Sync + Debug,
{
	/// Creates an empty scheduler.
	pub fn new() -> Self {
		Self {
			shared: Arc::new(Shared {
				entries: Mutex::new(HashMap::new()),
				generation: AtomicU64::new(0),
			}),
		}
	}

	/// Registers a poll for `target`, superseding any poll already registered for it.
	pub fn start_polling<C>(
		&self,
		target: PollTarget,
		desired: S,
		schedule: PollSchedule,
		check: C,
	) -> PollHandle<S>
	where
		C: StatusCheck<S>,
	{
		let generation = self.shared.generation.fetch_add(1, Ordering::Relaxed);
		let token = CancellationToken::new();
		let (sender, receiver) = oneshot::channel();
		let entry = Entry {
			generation,
			desired: desired.clone(),
			attempts: 0,
			schedule,
			token: token.clone(),
		};

		let previous = self.shared.entries.lock().insert(target.clone(), entry);

		if let Some(previous) = previous {
			trace_event!(debug, key = %target, "Superseding in-flight confirmation poll.");
			previous.token.cancel();
		}

		let task = PollTask {
			shared: Arc::clone(&self.shared),
			target: target.clone(),
			generation,
			desired,
			schedule,
			started: Instant::now(),
			token,
		};

		tokio::spawn(async move {
			let outcome = task.run(check).await;

			obs::record_poll_outcome(outcome.as_str());

			let _ = sender.send(outcome);
		});

		PollHandle { target, receiver }
	}

	/// Cancels the poll registered for `target`; a no-op when none exists.
	///
	/// Returns `true` when a poll was cancelled.
	pub fn cancel(&self, target: &PollTarget) -> bool {
		let removed = self.shared.entries.lock().remove(target);

		match removed {
			Some(entry) => {
				entry.token.cancel();

				true
			},
			None => false,
		}
	}

	/// Cancels every poll registered under `context`, returning how many were cancelled.
	pub fn cancel_context(&self, context: &ContextId) -> usize {
		let mut cancelled = Vec::new();

		self.shared.entries.lock().retain(|target, entry| {
			if &target.context == context {
				cancelled.push(entry.token.clone());

				false
			} else {
				true
			}
		});

		for token in &cancelled {
			token.cancel();
		}

		cancelled.len()
	}

	/// Returns a guard that cancels every poll of `context` when dropped.
	pub fn scope(&self, context: ContextId) -> ContextScope<S> {
		ContextScope { scheduler: self.clone(), context }
	}

	/// Cancels every registered poll.
	pub fn shutdown(&self) {
		let drained: Vec<_> =
			self.shared.entries.lock().drain().map(|(_, entry)| entry).collect();

		for entry in drained {
			entry.token.cancel();
		}
	}

	/// Returns a snapshot of the live poll for `target`.
	pub fn state(&self, target: &PollTarget) -> Option<PollState<S>> {
		self.shared.entries.lock().get(target).map(|entry| PollState {
			target: target.clone(),
			desired: entry.desired.clone(),
			attempts: entry.attempts,
			schedule: entry.schedule,
		})
	}

	/// Number of live polls.
	pub fn len(&self) -> usize {
		self.shared.entries.lock().len()
	}

	/// Returns `true` when no poll is live.
	pub fn is_empty(&self) -> bool {
		self.shared.entries.lock().is_empty()
	}
}
impl<S> Clone for ConfirmationScheduler<S> {
	fn clone(&self) -> Self {
		Self { shared: Arc::clone(&self.shared) }
	}
}
impl<S> Default for ConfirmationScheduler<S>
where
	S: 'static + Clone + PartialEq + Send + Sync + Debug,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<S> Debug for ConfirmationScheduler<S> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let entries = self.shared.entries.lock();
		let mut targets: Vec<_> = entries.keys().collect();

		targets.sort();

		f.debug_struct("ConfirmationScheduler").field("live", &targets).finish()
	}
}

/// Guard that cancels every poll registered under one context when dropped.
///
/// Hold it for the lifetime of the surface that issued the commands.
pub struct ContextScope<S>
where
	S: 'static + Clone + PartialEq + Send + Sync + Debug,
{
	scheduler: ConfirmationScheduler<S>,
	context: ContextId,
}
impl<S> ContextScope<S>
where
	S: 'static + Clone + PartialEq + Send + Sync + Debug,
{
	/// Context covered by this scope.
	pub fn context(&self) -> &ContextId {
		&self.context
	}

	/// Registers a poll for `target` within this scope's context.
	pub fn start_polling<C>(
		&self,
		target: TargetId,
		desired: S,
		schedule: PollSchedule,
		check: C,
	) -> PollHandle<S>
	where
		C: StatusCheck<S>,
	{
		self.scheduler.start_polling(
			PollTarget { target, context: self.context.clone() },
			desired,
			schedule,
			check,
		)
	}
}
impl<S> Drop for ContextScope<S>
where
	S: 'static + Clone + PartialEq + Send + Sync + Debug,
{
	fn drop(&mut self) {
		self.scheduler.cancel_context(&self.context);
	}
}
impl<S> Debug for ContextScope<S>
where
	S: 'static + Clone + PartialEq + Send + Sync + Debug,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ContextScope").field("context", &self.context).finish()
	}
}

struct PollTask<S> {
	shared: Arc<Shared<S>>,
	target: PollTarget,
	generation: u64,
	desired: S,
	schedule: PollSchedule,
	started: Instant,
	token: CancellationToken,
}
impl<S> PollTask<S>
where
	S: 'static + Clone + PartialEq + Send + Sync + Debug,
{
	async fn run<C>(self, check: C) -> PollOutcome<S>
	where
		C: StatusCheck<S>,
	{
		let span = OpSpan::new(OpKind::Confirm, "poll");

		span.instrument(self.ticks(check)).await
	}

	async fn ticks<C>(self, check: C) -> PollOutcome<S>
	where
		C: StatusCheck<S>,
	{
		let deadline = self.started + self.schedule.max_wait();
		let mut last_observed = None;
		let mut tick = 0_u32;

		loop {
			tokio::select! {
				biased;
				_ = self.token.cancelled() => return PollOutcome::Cancelled,
				_ = tokio::time::sleep_until(self.started + self.schedule.tick_offset(tick)) => {},
			}

			// A running check is never interrupted by cancellation, only by the deadline.
			let checked = tokio::time::timeout_at(deadline, check.check()).await;
			let polls = tick + 1;

			if self.token.is_cancelled()
				|| !self.shared.record_tick(&self.target, self.generation, polls)
			{
				trace_event!(debug, key = %self.target, "Discarding status of a cancelled poll.");

				return PollOutcome::Cancelled;
			}

			let Ok(observed) = checked else {
				trace_event!(
					debug,
					key = %self.target,
					polls,
					"Status check was still pending at the poll deadline."
				);

				return self.time_out(last_observed, polls);
			};

			match observed {
				Some(observed) if observed == self.desired => {
					if !self.shared.retire(&self.target, self.generation) {
						return PollOutcome::Cancelled;
					}

					trace_event!(debug, key = %self.target, polls, "Confirmation poll confirmed.");

					return PollOutcome::Confirmed { observed, polls };
				},
				Some(observed) => last_observed = Some(observed),
				None => {},
			}
			if self.schedule.is_last_tick(tick) {
				return self.time_out(last_observed, polls);
			}

			tick += 1;
		}
	}

	fn time_out(&self, last_observed: Option<S>, polls: u32) -> PollOutcome<S> {
		if !self.shared.retire(&self.target, self.generation) {
			return PollOutcome::Cancelled;
		}

		trace_event!(debug, key = %self.target, polls, "Confirmation poll timed out.");

		PollOutcome::TimedOut { last_observed, polls }
	}
}
