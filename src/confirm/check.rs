//! Status-check seam polled by the confirmation scheduler.

// self
use crate::_prelude::*;

/// Boxed future returned by [`StatusCheck::check`].
pub type CheckFuture<'a, S> = Pin<Box<dyn Future<Output = Option<S>> + 'a + Send>>;

/// Source of the currently observed state for a poll target.
///
/// `None` means no observation is available for this tick; the poll keeps going. A check still
/// pending when the poll's maximum wait elapses is dropped and the poll times out. Closures
/// returning a `Send` future implement the trait directly.
pub trait StatusCheck<S>
where
	Self: 'static + Send + Sync,
{
	/// Reads the current state.
	fn check(&self) -> CheckFuture<'_, S>;
}
impl<S, F, Fut> StatusCheck<S> for F
where
	F: 'static + Send + Sync + Fn() -> Fut,
	Fut: 'static + Send + Future<Output = Option<S>>,
{
	fn check(&self) -> CheckFuture<'_, S> {
		Box::pin(self())
	}
}
