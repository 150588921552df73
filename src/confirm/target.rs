//! Composite key identifying one in-flight confirmation.

// self
use crate::{
	_prelude::*,
	auth::{ContextId, TargetId},
};

/// Composite key identifying one in-flight confirmation.
///
/// The pair is compared field by field, so `(12, 3)` and `(1, 23)` never collide.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PollTarget {
	/// Entity whose state is being confirmed (for example a device).
	pub target: TargetId,
	/// Context hosting the confirmation (for example a dashboard widget).
	pub context: ContextId,
}
impl PollTarget {
	/// Builds a key from its two components.
	pub fn new(target: impl Into<TargetId>, context: impl Into<ContextId>) -> Self {
		Self { target: target.into(), context: context.into() }
	}
}
impl Debug for PollTarget {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "PollTarget({}, {})", self.target, self.context)
	}
}
impl Display for PollTarget {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}@{}", self.target, self.context)
	}
}
