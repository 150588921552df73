//! Poll cadence and tick budget for confirmation polling.

// std
use std::time::Duration;
// self
use crate::{_prelude::*, error::ConfigError};

/// Fixed-interval poll cadence bounded by a maximum wait.
///
/// Tick `n` runs `n * interval` after registration, starting with an immediate tick `0`. A tick
/// is the last one when `(n + 1) * interval >= max_wait`, so no tick is ever scheduled at or
/// after the deadline and at least one tick always runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PollSchedule {
	interval: Duration,
	max_wait: Duration,
}
impl PollSchedule {
	/// Default interval between ticks.
	pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2_000);
	/// Default overall wait budget.
	pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(10_000);

	/// Creates a schedule; both durations must be non-zero.
	pub fn new(interval: Duration, max_wait: Duration) -> Result<Self, ConfigError> {
		if interval.is_zero() || max_wait.is_zero() {
			return Err(ConfigError::InvalidPollSchedule);
		}

		Ok(Self { interval, max_wait })
	}

	/// Creates a schedule from millisecond values.
	pub fn from_millis(interval_ms: u64, max_wait_ms: u64) -> Result<Self, ConfigError> {
		Self::new(Duration::from_millis(interval_ms), Duration::from_millis(max_wait_ms))
	}

	/// Interval between consecutive ticks.
	pub fn interval(&self) -> Duration {
		self.interval
	}

	/// Overall wait budget.
	pub fn max_wait(&self) -> Duration {
		self.max_wait
	}

	/// Number of ticks a poll runs before timing out.
	pub fn tick_count(&self) -> u32 {
		let ticks = self.max_wait.as_nanos().div_ceil(self.interval.as_nanos());

		u32::try_from(ticks).unwrap_or(u32::MAX)
	}

	/// Offset of tick `tick` from the registration instant.
	pub fn tick_offset(&self, tick: u32) -> Duration {
		self.interval.saturating_mul(tick)
	}

	/// Returns `true` when `tick` is the final tick.
	pub fn is_last_tick(&self, tick: u32) -> bool {
		tick.saturating_add(1) >= self.tick_count()
	}
}
impl Default for PollSchedule {
	fn default() -> Self {
		Self { interval: Self::DEFAULT_INTERVAL, max_wait: Self::DEFAULT_MAX_WAIT }
	}
}
