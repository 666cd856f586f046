use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use similar::ChangeTag;
use similar::TextDiff;
use tokio::task::JoinHandle;

use crate::TechDocError;
use crate::TechDocResult;
use crate::fragments::FragmentKey;
use crate::fragments::FragmentStore;
use crate::fragments::extract_fragments;
use crate::fragments::producer_id_from_path;
use crate::locks::LockRegistry;
use crate::project::FileRole;
use crate::project::Project;
use crate::references::ConsumerReferences;
use crate::references::DependencyIndex;
use crate::references::scan_references;
use crate::renderer::CaptureSet;
use crate::renderer::RenderSettings;
use crate::renderer::render;
use crate::watch::watch_project;

/// Result of re-rendering one consumer file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
	pub file: PathBuf,
	/// Whether the written text differs from what was on disk.
	pub changed: bool,
	/// Lines inserted or removed by the render.
	pub changed_lines: usize,
	/// Captures that could not be read during the render.
	pub capture_warnings: usize,
}

/// Renders scheduled by one producer pass.
///
/// The renders run as detached tasks: dropping the batch does not cancel
/// them, awaiting [`RenderBatch::join`] waits for all of them.
#[derive(Debug, Default)]
pub struct RenderBatch {
	consumers: Vec<PathBuf>,
	handles: Vec<JoinHandle<TechDocResult<RenderOutcome>>>,
}

impl RenderBatch {
	pub fn consumers(&self) -> &[PathBuf] {
		&self.consumers
	}

	pub fn len(&self) -> usize {
		self.consumers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.consumers.is_empty()
	}

	pub fn extend(&mut self, other: RenderBatch) {
		self.consumers.extend(other.consumers);
		self.handles.extend(other.handles);
	}

	/// Wait for every render in the batch.
	pub async fn join(self) -> Vec<TechDocResult<RenderOutcome>> {
		let mut results = Vec::with_capacity(self.handles.len());
		for (file, handle) in self.consumers.into_iter().zip(self.handles) {
			let result = match handle.await {
				Ok(result) => result,
				Err(e) => {
					Err(TechDocError::TaskJoin {
						file: file.display().to_string(),
						reason: e.to_string(),
					})
				}
			};
			results.push(result);
		}
		results
	}
}

/// Totals collected while scanning the project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
	pub consumers: usize,
	pub producers: usize,
	pub fragments: usize,
	pub references: usize,
	/// Files that could not be read and were skipped.
	pub failures: usize,
}

/// Totals for the first full pass over the project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColdStartReport {
	pub scan: ScanReport,
	pub renders: usize,
	pub render_failures: usize,
}

/// The sync engine: owns the fragment store, the dependency index and the
/// per-file locks for one project.
#[derive(Debug)]
pub struct DocSync {
	project: Project,
	fragments: FragmentStore,
	index: DependencyIndex,
	locks: LockRegistry,
}

impl DocSync {
	pub fn new(project: Project) -> Arc<Self> {
		Arc::new(Self {
			project,
			fragments: FragmentStore::new(),
			index: DependencyIndex::new(),
			locks: LockRegistry::new(),
		})
	}

	pub fn project(&self) -> &Project {
		&self.project
	}

	pub fn fragments(&self) -> &FragmentStore {
		&self.fragments
	}

	pub fn index(&self) -> &DependencyIndex {
		&self.index
	}

	pub fn locks(&self) -> &LockRegistry {
		&self.locks
	}

	/// Rescan a consumer file and replace its registered references.
	///
	/// This only updates the dependency index. The file is rendered the next
	/// time one of the fragments it references changes, so new references
	/// added by hand stay as written until then.
	pub async fn register_consumer(&self, path: &Path) -> TechDocResult<ConsumerReferences> {
		let content = tokio::fs::read_to_string(path).await?;
		Ok(self.register_consumer_text(path, &content))
	}

	pub fn register_consumer_text(&self, path: &Path, content: &str) -> ConsumerReferences {
		let references = scan_references(self.project.root(), content);
		self.index.register(path, references.clone());
		references
	}

	/// Re-extract a producer file and re-render every consumer that
	/// references one of its fragments.
	pub async fn register_producer(self: &Arc<Self>, path: &Path) -> TechDocResult<RenderBatch> {
		let content = tokio::fs::read_to_string(path).await?;
		Ok(self.register_producer_text(path, &content))
	}

	pub fn register_producer_text(self: &Arc<Self>, path: &Path, content: &str) -> RenderBatch {
		let dependents = self.ingest_producer_text(path, content);
		let mut batch = RenderBatch::default();
		for consumer in dependents {
			let handle = self.schedule_render(consumer.clone());
			batch.consumers.push(consumer);
			batch.handles.push(handle);
		}
		batch
	}

	/// Store the fragments of a producer and return its dependent consumers,
	/// each listed once, without rendering anything.
	pub fn ingest_producer_text(&self, path: &Path, content: &str) -> Vec<PathBuf> {
		let producer = producer_id_from_path(self.project.root(), path);
		let fragments = extract_fragments(content);
		let mut dependents: Vec<PathBuf> = Vec::new();

		for fragment in fragments {
			let key = FragmentKey::new(producer.clone(), fragment.name);
			for consumer in self.index.consumers_of(&key) {
				if !dependents.contains(&consumer) {
					dependents.push(consumer);
				}
			}
			self.fragments.insert(key, fragment.payload);
		}

		tracing::debug!(
			producer = %producer,
			dependents = dependents.len(),
			"registered producer fragments"
		);
		dependents
	}

	/// Render `path` on a background task.
	pub fn schedule_render(
		self: &Arc<Self>,
		path: PathBuf,
	) -> JoinHandle<TechDocResult<RenderOutcome>> {
		let sync = Arc::clone(self);
		tokio::spawn(async move {
			let result = sync.render_consumer(&path).await;
			match &result {
				Ok(outcome) if outcome.changed => {
					tracing::info!(
						"updated {} ({} line(s) changed)",
						sync.display_path(&path),
						outcome.changed_lines
					);
				}
				Ok(_) => {
					tracing::debug!("{} already up to date", sync.display_path(&path));
				}
				Err(e) => {
					tracing::error!("failed to render {}: {e}", sync.display_path(&path));
				}
			}
			result
		})
	}

	/// Read, render and write a consumer file while holding its lock.
	///
	/// The fragment store is read when the render runs, not when it was
	/// scheduled, so a render queued behind the lock picks up the newest
	/// payloads.
	pub async fn render_consumer(&self, path: &Path) -> TechDocResult<RenderOutcome> {
		self.locks
			.with_exclusive_access(path, || {
				async move {
					let root = self.project.root();
					let config = self.project.config();
					let content = tokio::fs::read_to_string(path).await?;
					let outputs = scan_references(root, &content).outputs;
					let captures = CaptureSet::load(root, &outputs).await;
					let settings = RenderSettings {
						language: &config.language,
						skip_token: &config.skip_token,
					};
					let rendered =
						render(path, root, &content, &self.fragments, &captures, &settings)?;
					tokio::fs::write(path, &rendered.text).await?;

					Ok::<_, TechDocError>(RenderOutcome {
						file: path.to_path_buf(),
						changed: rendered.text != content,
						changed_lines: count_changed_lines(&content, &rendered.text),
						capture_warnings: rendered.warnings.len(),
					})
				}
			})
			.await
	}

	/// Build the dependency index and fragment store from every file in the
	/// project without rendering.
	pub async fn scan(&self) -> TechDocResult<ScanReport> {
		let mut report = ScanReport::default();

		for path in self.discover(FileRole::Consumer).await? {
			match self.register_consumer(&path).await {
				Ok(_) => report.consumers += 1,
				Err(e) => {
					tracing::error!("failed to scan {}: {e}", self.display_path(&path));
					report.failures += 1;
				}
			}
		}

		for path in self.discover(FileRole::Producer).await? {
			match tokio::fs::read_to_string(&path).await {
				Ok(content) => {
					self.ingest_producer_text(&path, &content);
					report.producers += 1;
				}
				Err(e) => {
					tracing::error!("failed to read {}: {e}", self.display_path(&path));
					report.failures += 1;
				}
			}
		}

		report.fragments = self.fragments.len();
		report.references = self.index.keys().len();
		Ok(report)
	}

	/// Register every consumer, then every producer, and wait for the
	/// renders this triggers.
	pub async fn cold_start(self: &Arc<Self>) -> TechDocResult<ColdStartReport> {
		let mut report = ColdStartReport::default();

		for path in self.discover(FileRole::Consumer).await? {
			match self.register_consumer(&path).await {
				Ok(_) => report.scan.consumers += 1,
				Err(e) => {
					tracing::error!("failed to scan {}: {e}", self.display_path(&path));
					report.scan.failures += 1;
				}
			}
		}

		let mut batch = RenderBatch::default();
		for path in self.discover(FileRole::Producer).await? {
			match self.register_producer(&path).await {
				Ok(scheduled) => {
					report.scan.producers += 1;
					batch.extend(scheduled);
				}
				Err(e) => {
					tracing::error!("failed to read {}: {e}", self.display_path(&path));
					report.scan.failures += 1;
				}
			}
		}

		for result in batch.join().await {
			match result {
				Ok(_) => report.renders += 1,
				Err(_) => report.render_failures += 1,
			}
		}

		report.scan.fragments = self.fragments.len();
		report.scan.references = self.index.keys().len();
		Ok(report)
	}

	/// React to a change of a single file. Producers are re-extracted and
	/// their dependents re-rendered, consumers are rescanned. Failures are
	/// logged and swallowed.
	pub async fn handle_change(self: &Arc<Self>, path: &Path) -> Option<RenderBatch> {
		match self.project.classify(path)? {
			FileRole::Producer => {
				match self.register_producer(path).await {
					Ok(batch) => Some(batch),
					Err(e) => {
						tracing::error!("failed to read {}: {e}", self.display_path(path));
						None
					}
				}
			}
			FileRole::Consumer => {
				if let Err(e) = self.register_consumer(path).await {
					tracing::error!("failed to scan {}: {e}", self.display_path(path));
				}
				None
			}
		}
	}

	/// Subscribe to the producer and consumer directories and handle changes
	/// until the watcher shuts down.
	pub async fn watch(self: &Arc<Self>) -> TechDocResult<()> {
		let mut events = watch_project(&self.project)?;
		tracing::info!("watching for changes");

		while let Some(paths) = events.next_batch().await {
			for path in paths {
				// Renders keep running after the batch handle is dropped.
				let _ = self.handle_change(&path).await;
			}
		}

		Ok(())
	}

	/// Cold start followed by watching.
	pub async fn run(self: &Arc<Self>) -> TechDocResult<()> {
		let report = self.cold_start().await?;
		tracing::info!(
			"synced {} producer(s) with {} fragment(s) into {} consumer(s): {} render(s), {} failed",
			report.scan.producers,
			report.scan.fragments,
			report.scan.consumers,
			report.renders,
			report.render_failures
		);
		self.watch().await
	}

	/// Path relative to the project root, for log lines.
	pub fn display_path(&self, path: &Path) -> String {
		path.strip_prefix(self.project.root())
			.unwrap_or(path)
			.display()
			.to_string()
	}

	async fn discover(&self, role: FileRole) -> TechDocResult<Vec<PathBuf>> {
		let project = self.project.clone();
		tokio::task::spawn_blocking(move || {
			match role {
				FileRole::Producer => project.producer_files(),
				FileRole::Consumer => project.consumer_files(),
			}
		})
		.await
		.map_err(|e| {
			TechDocError::TaskJoin {
				file: self.project.root().display().to_string(),
				reason: e.to_string(),
			}
		})
	}
}

fn count_changed_lines(before: &str, after: &str) -> usize {
	TextDiff::from_lines(before, after)
		.iter_all_changes()
		.filter(|change| change.tag() != ChangeTag::Equal)
		.count()
}
