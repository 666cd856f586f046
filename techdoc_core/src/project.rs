use std::path::Path;
use std::path::PathBuf;

use globset::GlobSet;
use ignore::WalkBuilder;

use crate::TechDocConfig;
use crate::TechDocError;
use crate::TechDocResult;

/// What a file means to the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
	/// A code sample defining fragments.
	Producer,
	/// A markdown page referencing fragments and captures.
	Consumer,
}

/// The project root together with its resolved configuration.
#[derive(Debug, Clone)]
pub struct Project {
	root: PathBuf,
	config: TechDocConfig,
	exclude: GlobSet,
}

impl Project {
	/// Resolve `root` and build the project from `config`.
	pub fn new(root: &Path, config: TechDocConfig) -> TechDocResult<Self> {
		if !root.is_dir() {
			return Err(TechDocError::InvalidRoot(root.display().to_string()));
		}

		let root = root.canonicalize()?;
		let exclude = config.exclude_set()?;

		Ok(Self {
			root,
			config,
			exclude,
		})
	}

	/// Load `techdoc.toml` from `root` (or defaults) and build the project.
	pub fn load(root: &Path) -> TechDocResult<Self> {
		let config = TechDocConfig::load_or_default(root)?;
		Self::new(root, config)
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn config(&self) -> &TechDocConfig {
		&self.config
	}

	/// Absolute producer directories.
	pub fn producer_dirs(&self) -> Vec<PathBuf> {
		self.config
			.producers
			.iter()
			.map(|dir| self.root.join(dir))
			.collect()
	}

	/// Absolute consumer directories.
	pub fn consumer_dirs(&self) -> Vec<PathBuf> {
		self.config
			.consumers
			.iter()
			.map(|dir| self.root.join(dir))
			.collect()
	}

	/// Decide whether a changed or discovered path is a producer, a consumer
	/// or neither. Hidden files and anything inside a hidden directory below
	/// the configured directories are neither.
	pub fn classify(&self, path: &Path) -> Option<FileRole> {
		if self.is_excluded(path) {
			return None;
		}

		let under = |dirs: Vec<PathBuf>| {
			dirs.iter().any(|dir| {
				path.strip_prefix(dir)
					.is_ok_and(|relative| !is_hidden(relative))
			})
		};

		if self.config.is_producer_file(path) && under(self.producer_dirs()) {
			Some(FileRole::Producer)
		} else if self.config.is_consumer_file(path) && under(self.consumer_dirs()) {
			Some(FileRole::Consumer)
		} else {
			None
		}
	}

	/// Whether `path` matches one of the `exclude` patterns.
	pub fn is_excluded(&self, path: &Path) -> bool {
		let relative = path.strip_prefix(&self.root).unwrap_or(path);
		self.exclude.is_match(relative)
	}

	/// Every producer file below the producer directories.
	pub fn producer_files(&self) -> Vec<PathBuf> {
		self.walk(&self.producer_dirs(), FileRole::Producer)
	}

	/// Every consumer file below the consumer directories.
	pub fn consumer_files(&self) -> Vec<PathBuf> {
		self.walk(&self.consumer_dirs(), FileRole::Consumer)
	}

	fn walk(&self, dirs: &[PathBuf], role: FileRole) -> Vec<PathBuf> {
		let mut files = Vec::new();

		for dir in dirs {
			if !dir.is_dir() {
				tracing::warn!(dir = %dir.display(), "configured directory does not exist");
				continue;
			}

			let walker = WalkBuilder::new(dir)
				.hidden(false)
				.parents(!self.config.disable_gitignore)
				.git_ignore(!self.config.disable_gitignore)
				.git_global(!self.config.disable_gitignore)
				.git_exclude(!self.config.disable_gitignore)
				.build();

			for entry in walker {
				let entry = match entry {
					Ok(entry) => entry,
					Err(e) => {
						tracing::warn!("failed to read directory entry: {e}");
						continue;
					}
				};

				if !entry.file_type().is_some_and(|file_type| file_type.is_file()) {
					continue;
				}

				let path = entry.into_path();
				if self.classify(&path) == Some(role) {
					files.push(path);
				}
			}
		}

		files
	}
}

fn is_hidden(relative: &Path) -> bool {
	relative.components().any(|component| {
		component
			.as_os_str()
			.to_str()
			.is_some_and(|name| name.starts_with('.'))
	})
}
