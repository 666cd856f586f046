use miette::Diagnostic;
use thiserror::Error;

/// The injected section that was left open when a consumer file ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
	/// A fenced code block following a `file://` reference.
	Code,
	/// A `<details>` disclosure following an `output://` reference.
	Output,
}

impl std::fmt::Display for BlockKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Code => write!(f, "code block"),
			Self::Output => write!(f, "output block"),
		}
	}
}

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum TechDocError {
	#[error(transparent)]
	#[diagnostic(code(techdoc::io_error))]
	Io(#[from] std::io::Error),

	#[error("unclosed injected {block} in `{file}`")]
	#[diagnostic(
		code(techdoc::unclosed_block),
		help(
			"the section after a snippet marker must end with a closing ``` fence, and the \
			 section after an output marker with `</details>`"
		)
	)]
	UnclosedBlock { file: String, block: BlockKind },

	#[error("failed to read output capture `{path}`: {reason}")]
	#[diagnostic(
		code(techdoc::capture_read),
		help("run the samples to regenerate their captured output")
	)]
	CaptureRead { path: String, reason: String },

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(techdoc::config_parse),
		help("check that techdoc.toml is valid TOML")
	)]
	ConfigParse(String),

	#[error("invalid exclude pattern `{pattern}`: {reason}")]
	#[diagnostic(code(techdoc::invalid_exclude))]
	InvalidExclude { pattern: String, reason: String },

	#[error("project root `{0}` is not a directory")]
	#[diagnostic(code(techdoc::invalid_root))]
	InvalidRoot(String),

	#[error("file watcher failed: {0}")]
	#[diagnostic(code(techdoc::watch))]
	Watch(#[from] notify::Error),

	#[error("render task for `{file}` did not complete: {reason}")]
	#[diagnostic(code(techdoc::task_join))]
	TaskJoin { file: String, reason: String },
}

pub type TechDocResult<T> = Result<T, TechDocError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
