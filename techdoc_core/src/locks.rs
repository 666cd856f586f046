use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

/// One async lock per consumer file.
///
/// Locks are created the first time a path is seen and live as long as the
/// registry. Waiters on the same path are served in FIFO order; different
/// paths never block each other.
#[derive(Debug, Default)]
pub struct LockRegistry {
	locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl LockRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Run `operation` once no other operation holds `path`.
	///
	/// The lock is released when `operation` finishes, whether it succeeded
	/// or not, so a failed render never blocks later ones.
	pub async fn with_exclusive_access<F, Fut, T>(&self, path: &Path, operation: F) -> T
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = T>,
	{
		let lock = self.lock_for(path);
		let _guard = lock.lock().await;
		operation().await
	}

	/// Number of paths that have been locked at least once.
	pub fn len(&self) -> usize {
		self.locks.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.locks.lock().is_empty()
	}

	fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
		self.locks
			.lock()
			.entry(path.to_path_buf())
			.or_default()
			.clone()
	}
}
