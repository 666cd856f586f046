use std::path::Path;
use std::path::PathBuf;

use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use serde::Deserialize;

use crate::TechDocError;
use crate::TechDocResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["techdoc.toml", ".techdoc.toml", ".config/techdoc.toml"];

/// Default quiet period for coalescing watch events on the same path.
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Configuration loaded from a `techdoc.toml` file.
///
/// ```toml
/// producers = ["code-samples"]
/// consumers = ["docs", "sdk"]
/// extensions = ["ts", "mts", "js", "mjs"]
/// language = "typescript"
/// skip_token = "// skip-doc"
/// debounce_ms = 200
/// exclude = ["**/node_modules/**"]
/// disable_gitignore = false
/// ```
///
/// Every key is optional. Paths are relative to the project root, which is
/// also the base directory that `file://` and `output://` references are
/// resolved against.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TechDocConfig {
	/// Directories holding code samples that define fragments.
	pub producers: Vec<PathBuf>,
	/// Directories holding markdown files that reference fragments.
	pub consumers: Vec<PathBuf>,
	/// Source file extensions scanned for fragment markers.
	pub extensions: Vec<String>,
	/// Extension of consumer files.
	pub markdown_extension: String,
	/// Language tag written on injected code fences.
	pub language: String,
	/// Lines of a fragment ending with this token never reach the docs.
	pub skip_token: String,
	/// Milliseconds a path must stay quiet before a watch event is handled.
	pub debounce_ms: u64,
	/// Glob patterns (relative to the root) that are never scanned or watched.
	pub exclude: Vec<String>,
	/// When true, `.gitignore` files are not used to filter discovery.
	pub disable_gitignore: bool,
}

impl Default for TechDocConfig {
	fn default() -> Self {
		Self {
			producers: vec![PathBuf::from("code-samples")],
			consumers: vec![PathBuf::from("docs")],
			extensions: ["ts", "mts", "js", "mjs"].map(String::from).to_vec(),
			markdown_extension: "md".to_string(),
			language: "typescript".to_string(),
			skip_token: "// skip-doc".to_string(),
			debounce_ms: DEFAULT_DEBOUNCE_MS,
			exclude: vec!["**/node_modules/**".to_string()],
			disable_gitignore: false,
		}
	}
}

impl TechDocConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if there is no config file.
	pub fn load(root: &Path) -> TechDocResult<Option<TechDocConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::parse(&content)?;

		Ok(Some(config))
	}

	/// Load the config at `root`, falling back to defaults when absent.
	pub fn load_or_default(root: &Path) -> TechDocResult<TechDocConfig> {
		Ok(Self::load(root)?.unwrap_or_default())
	}

	/// Parse config file contents.
	pub fn parse(content: &str) -> TechDocResult<TechDocConfig> {
		toml::from_str(content).map_err(|e| TechDocError::ConfigParse(e.to_string()))
	}

	/// Whether `path` carries one of the producer source extensions.
	pub fn is_producer_file(&self, path: &Path) -> bool {
		has_extension(path, &self.extensions)
	}

	/// Whether `path` carries the markdown extension.
	pub fn is_consumer_file(&self, path: &Path) -> bool {
		has_extension(path, std::slice::from_ref(&self.markdown_extension))
	}

	/// Build the glob set for the `exclude` patterns.
	pub fn exclude_set(&self) -> TechDocResult<GlobSet> {
		let mut builder = GlobSetBuilder::new();
		for pattern in &self.exclude {
			let glob = Glob::new(pattern).map_err(|e| {
				TechDocError::InvalidExclude {
					pattern: pattern.clone(),
					reason: e.to_string(),
				}
			})?;
			builder.add(glob);
		}

		builder.build().map_err(|e| {
			TechDocError::InvalidExclude {
				pattern: self.exclude.join(", "),
				reason: e.to_string(),
			}
		})
	}
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
	let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
		return false;
	};

	extensions.iter().any(|extension| {
		name.strip_suffix(extension.as_str())
			.is_some_and(|stem| stem.len() > 1 && stem.ends_with('.'))
	})
}
