//! Disposable resource handles

use std::fmt;

/// A handle to a resource that is released exactly once.
///
/// The release runs on an explicit [`Disposable::dispose`] call or when the
/// handle is dropped, whichever comes first.
///
/// # Examples
///
/// ```
/// use reinhardt_relay_runtime::Disposable;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let released = Arc::new(AtomicUsize::new(0));
/// let counter = released.clone();
/// let handle = Disposable::new(move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// handle.dispose();
/// assert_eq!(released.load(Ordering::SeqCst), 1);
/// ```
#[must_use = "dropping a Disposable releases the resource immediately"]
pub struct Disposable {
	release: Option<Box<dyn FnOnce() + Send>>,
}

impl Disposable {
	/// Creates a handle that runs `release` when disposed.
	pub fn new<F>(release: F) -> Self
	where
		F: FnOnce() + Send + 'static,
	{
		Self {
			release: Some(Box::new(release)),
		}
	}

	/// Creates a handle that owns nothing.
	pub fn noop() -> Self {
		Self { release: None }
	}

	/// Releases the resource.
	pub fn dispose(mut self) {
		self.release_now();
	}

	fn release_now(&mut self) {
		if let Some(release) = self.release.take() {
			release();
		}
	}
}

impl Drop for Disposable {
	fn drop(&mut self) {
		self.release_now();
	}
}

impl fmt::Debug for Disposable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Disposable")
			.field("released", &self.release.is_none())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn counting() -> (Disposable, Arc<AtomicUsize>) {
		let count = Arc::new(AtomicUsize::new(0));
		let counter = count.clone();
		let handle = Disposable::new(move || {
			counter.fetch_add(1, Ordering::SeqCst);
		});
		(handle, count)
	}

	#[rstest]
	fn test_dispose_releases_once() {
		let (handle, count) = counting();
		handle.dispose();
		assert_eq!(count.load(Ordering::SeqCst), 1);
	}

	#[rstest]
	fn test_drop_releases() {
		let (handle, count) = counting();
		drop(handle);
		assert_eq!(count.load(Ordering::SeqCst), 1);
	}

	#[rstest]
	fn test_noop() {
		let handle = Disposable::noop();
		assert_eq!(format!("{:?}", handle), "Disposable { released: true }");
		handle.dispose();
	}
}
