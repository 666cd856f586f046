use std::path::PathBuf;
use std::time::Duration;

use notify::Event;
use notify::EventKind;
use notify::RecommendedWatcher;
use notify::RecursiveMode;
use notify::Watcher;
use tokio::sync::mpsc;

use crate::TechDocResult;
use crate::project::Project;

/// Changed paths delivered by the filesystem watcher.
///
/// The notify watcher runs on its own thread and forwards every created or
/// modified path into a channel; [`WatchEvents::next_batch`] turns bursts of
/// events into one list of distinct paths.
pub struct WatchEvents {
	rx: mpsc::UnboundedReceiver<PathBuf>,
	debounce: Duration,
	_watcher: RecommendedWatcher,
}

impl std::fmt::Debug for WatchEvents {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WatchEvents")
			.field("debounce", &self.debounce)
			.finish_non_exhaustive()
	}
}

impl WatchEvents {
	/// Wait for the next change, then keep collecting until no event has
	/// arrived for the debounce period. Returns `None` once the watcher is
	/// gone.
	pub async fn next_batch(&mut self) -> Option<Vec<PathBuf>> {
		let first = self.rx.recv().await?;
		let mut paths = vec![first];

		while let Ok(Some(path)) = tokio::time::timeout(self.debounce, self.rx.recv()).await {
			if !paths.contains(&path) {
				paths.push(path);
			}
		}

		tracing::debug!(paths = paths.len(), "debounced watch events");
		Some(paths)
	}
}

/// Subscribe recursively to every producer and consumer directory of the
/// project.
pub fn watch_project(project: &Project) -> TechDocResult<WatchEvents> {
	let (tx, rx) = mpsc::unbounded_channel();

	let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
		match res {
			Ok(event) => {
				if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
					return;
				}
				for path in event.paths {
					let _ = tx.send(path);
				}
			}
			Err(e) => tracing::error!("file watch error: {e}"),
		}
	})?;

	let producer_dirs = project.producer_dirs();
	let consumer_dirs = project.consumer_dirs();
	for dir in producer_dirs.iter().chain(&consumer_dirs) {
		if !dir.is_dir() {
			tracing::warn!(dir = %dir.display(), "not watching missing directory");
			continue;
		}
		watcher.watch(dir, RecursiveMode::Recursive)?;
		tracing::debug!(dir = %dir.display(), "watching");
	}

	Ok(WatchEvents {
		rx,
		debounce: Duration::from_millis(project.config().debounce_ms),
		_watcher: watcher,
	})
}
