//! Cancellation and deadline signal threaded through every client call.
//!
//! A [`CallContext`] is cheap to clone: clones share the same cancellation token, so cancelling
//! any clone interrupts every call that received one. Child contexts created with
//! [`CallContext::with_deadline`] or [`CallContext::with_timeout`] keep the parent's token and
//! the earlier of the two deadlines.

// crates.io
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
// self
use crate::_prelude::*;

/// Cancellation token plus an optional deadline.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
	token: CancellationToken,
	deadline: Option<Instant>,
}
impl CallContext {
	/// Creates a context that never cancels on its own.
	pub fn new() -> Self {
		Self::default()
	}

	/// Wraps an existing cancellation token.
	pub fn from_token(token: CancellationToken) -> Self {
		Self { token, deadline: None }
	}

	/// Returns a copy whose deadline is the earlier of the current one and `deadline`.
	pub fn with_deadline(&self, deadline: Instant) -> Self {
		let deadline = match self.deadline {
			Some(current) if current <= deadline => current,
			_ => deadline,
		};

		Self { token: self.token.clone(), deadline: Some(deadline) }
	}

	/// Returns a copy that expires `timeout` from now.
	pub fn with_timeout(&self, timeout: StdDuration) -> Self {
		self.with_deadline(Instant::now() + timeout)
	}

	/// Cancels this context and every clone sharing its token.
	pub fn cancel(&self) {
		self.token.cancel();
	}

	/// Returns the underlying cancellation token.
	pub fn token(&self) -> &CancellationToken {
		&self.token
	}

	/// Returns the deadline, if one is set.
	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Returns the cancellation cause if the context is already done.
	pub fn err(&self) -> Option<Error> {
		if self.token.is_cancelled() {
			return Some(Error::Cancelled);
		}

		match self.deadline {
			Some(deadline) if deadline <= Instant::now() => Some(Error::DeadlineExceeded),
			_ => None,
		}
	}

	/// Resolves once the context is cancelled or its deadline passes.
	pub async fn done(&self) -> Error {
		match self.deadline {
			Some(deadline) => tokio::select! {
				biased;
				_ = self.token.cancelled() => Error::Cancelled,
				_ = tokio::time::sleep_until(deadline) => Error::DeadlineExceeded,
			},
			None => {
				self.token.cancelled().await;

				Error::Cancelled
			},
		}
	}

	/// Runs `fut` unless the context finishes first, in which case the cause is returned.
	pub async fn run<F, T>(&self, fut: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		if let Some(err) = self.err() {
			return Err(err);
		}

		tokio::select! {
			biased;
			err = self.done() => Err(err),
			result = fut => result,
		}
	}

	/// Sleeps for `duration` unless the context finishes first.
	pub async fn sleep(&self, duration: StdDuration) -> Result<()> {
		self.run(async {
			tokio::time::sleep(duration).await;

			Ok(())
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn sleep_completes_without_cancellation() {
		let ctx = CallContext::new();
		let started = Instant::now();

		ctx.sleep(StdDuration::from_millis(250)).await.expect("Sleep should complete.");

		assert!(started.elapsed() >= StdDuration::from_millis(250));
	}

	#[tokio::test(start_paused = true)]
	async fn cancellation_interrupts_sleep() {
		let ctx = CallContext::new();
		let canceller = ctx.clone();

		tokio::spawn(async move {
			tokio::time::sleep(StdDuration::from_millis(10)).await;
			canceller.cancel();
		});

		let err = ctx
			.sleep(StdDuration::from_secs(60))
			.await
			.expect_err("Cancelled sleep should report an error.");

		assert!(matches!(err, Error::Cancelled));
	}

	#[tokio::test(start_paused = true)]
	async fn deadline_interrupts_run() {
		let ctx = CallContext::new().with_timeout(StdDuration::from_millis(50));
		let err = ctx
			.run(async {
				tokio::time::sleep(StdDuration::from_secs(5)).await;

				Ok(())
			})
			.await
			.expect_err("Deadline should interrupt the future.");

		assert!(matches!(err, Error::DeadlineExceeded));
	}

	#[tokio::test(start_paused = true)]
	async fn child_keeps_earlier_deadline() {
		let parent = CallContext::new().with_timeout(StdDuration::from_millis(10));
		let child = parent.with_timeout(StdDuration::from_secs(10));

		assert_eq!(child.deadline(), parent.deadline());
	}

	#[test]
	fn cancelled_context_fails_fast() {
		let ctx = CallContext::new();

		ctx.cancel();

		assert!(matches!(ctx.err(), Some(Error::Cancelled)));
	}
}
