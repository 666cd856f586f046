use std::collections::HashMap;
use std::path::Path;

use crate::BlockKind;
use crate::TechDocError;
use crate::TechDocResult;
use crate::fragments::FragmentKey;
use crate::fragments::FragmentStore;
use crate::fragments::producer_id_from_reference;
use crate::markers::collapse_trailing_blank_lines;
use crate::markers::is_closing_fence;
use crate::markers::is_details_close;
use crate::markers::is_skipped_line;
use crate::markers::line_break;
use crate::markers::output_marker;
use crate::markers::snippet_marker;
use crate::markers::truncate_literals;
use crate::references::OutputReference;

/// Settings that shape injected blocks.
#[derive(Debug, Clone, Copy)]
pub struct RenderSettings<'a> {
	/// Language tag on injected code fences.
	pub language: &'a str,
	/// Trailing token marking fragment lines that never reach the docs.
	pub skip_token: &'a str,
}

/// Captured outputs read from disk for a single render, keyed by the path as
/// written in the `output://` marker.
#[derive(Debug, Default)]
pub struct CaptureSet {
	captures: HashMap<String, Result<String, String>>,
}

impl CaptureSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Read every referenced capture relative to `root`. Failures are kept
	/// and surface as warnings when rendering.
	pub async fn load(root: &Path, outputs: &[OutputReference]) -> Self {
		let mut set = Self::new();
		for output in outputs {
			if set.captures.contains_key(&output.path) {
				continue;
			}
			let result = tokio::fs::read_to_string(root.join(&output.path))
				.await
				.map_err(|e| e.to_string());
			set.captures.insert(output.path.clone(), result);
		}
		set
	}

	pub fn insert(&mut self, path: impl Into<String>, content: Result<String, String>) {
		self.captures.insert(path.into(), content);
	}

	fn read(&self, path: &str) -> Result<&str, TechDocError> {
		match self.captures.get(path) {
			Some(Ok(content)) => Ok(content.as_str()),
			Some(Err(reason)) => {
				Err(TechDocError::CaptureRead {
					path: path.to_string(),
					reason: reason.clone(),
				})
			}
			None => {
				Err(TechDocError::CaptureRead {
					path: path.to_string(),
					reason: "capture was not loaded".to_string(),
				})
			}
		}
	}
}

/// The re-rendered text of a consumer file.
#[derive(Debug)]
pub struct Rendered {
	pub text: String,
	/// Non-fatal problems, currently only unreadable captures. Each one left
	/// the section after its marker untouched.
	pub warnings: Vec<TechDocError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
	Passthrough,
	InsideCode,
	InsideOutput,
}

/// Refresh every injected block of a consumer file.
///
/// A single pass copies lines through until a reference marker. After a
/// `file://` marker whose fragment is known, a fresh fence is written and the
/// old block is dropped up to its closing fence. After an `output://` marker
/// whose capture could be read, a fresh `<details>` block is written and the
/// old one is dropped up to `</details>`. Unknown fragments and unreadable
/// captures leave whatever follows the marker as it is.
///
/// Injected lines use the line break of `content`, so pages saved with
/// `\r\n` stay `\r\n` throughout.
pub fn render(
	file: &Path,
	root: &Path,
	content: &str,
	fragments: &FragmentStore,
	captures: &CaptureSet,
	settings: &RenderSettings<'_>,
) -> TechDocResult<Rendered> {
	let mut text = String::with_capacity(content.len());
	let mut warnings = Vec::new();
	let mut mode = Mode::Passthrough;
	let newline = line_break(content);

	for line in content.split_inclusive('\n') {
		let bare = line.trim_end_matches(['\n', '\r']);

		match mode {
			Mode::InsideCode => {
				if is_closing_fence(bare) {
					mode = Mode::Passthrough;
				}
				continue;
			}
			Mode::InsideOutput => {
				if is_details_close(bare) {
					mode = Mode::Passthrough;
				}
				continue;
			}
			Mode::Passthrough => {}
		}

		push_line(&mut text, line, newline);

		if let Some(marker) = snippet_marker(bare) {
			let producer = producer_id_from_reference(root, marker.producer);
			let key = FragmentKey::new(producer, marker.name);
			let Some(payload) = fragments.get(&key) else {
				tracing::debug!(
					file = %file.display(),
					fragment = %key,
					"fragment not defined yet"
				);
				continue;
			};

			let body = process_fragment(&payload, settings.skip_token);
			text.push_str(&format!("```{}{newline}", settings.language));
			push_block(&mut text, &body, newline);
			text.push_str(&format!("```{newline}"));
			mode = Mode::InsideCode;
		} else if let Some(marker) = output_marker(bare) {
			let capture = match captures.read(marker.path) {
				Ok(capture) => capture,
				Err(error) => {
					tracing::warn!(file = %file.display(), "{error}");
					warnings.push(error);
					continue;
				}
			};

			let capture = collapse_trailing_blank_lines(capture);
			let fence = if capture.starts_with('{') { "json" } else { "text" };
			text.push_str(&format!(
				"<details>{newline}<summary>{}</summary>{newline}{newline}```{fence}{newline}",
				marker.title
			));
			push_block(&mut text, capture, newline);
			text.push_str(&format!("```{newline}{newline}</details>{newline}"));
			mode = Mode::InsideOutput;
		}
	}

	match mode {
		Mode::Passthrough => {}
		Mode::InsideCode => {
			return Err(TechDocError::UnclosedBlock {
				file: file.display().to_string(),
				block: BlockKind::Code,
			});
		}
		Mode::InsideOutput => {
			return Err(TechDocError::UnclosedBlock {
				file: file.display().to_string(),
				block: BlockKind::Output,
			});
		}
	}

	let text = collapse_trailing_blank_lines(&text).to_string();
	Ok(Rendered { text, warnings })
}

/// Prepare a fragment payload for publication: trailing blank lines are
/// collapsed, `/* truncate */` literals abbreviated and skip-token lines
/// removed.
pub fn process_fragment(payload: &str, skip_token: &str) -> String {
	let trimmed = collapse_trailing_blank_lines(payload);
	let truncated = truncate_literals(trimmed);

	truncated
		.split_inclusive('\n')
		.filter(|line| !is_skipped_line(line, skip_token))
		.collect()
}

fn push_line(text: &mut String, line: &str, newline: &str) {
	text.push_str(line);
	if !line.ends_with('\n') {
		text.push_str(newline);
	}
}

/// Push every line of `body` terminated by `newline`, whatever break it had.
fn push_block(text: &mut String, body: &str, newline: &str) {
	for line in body.lines() {
		text.push_str(line);
		text.push_str(newline);
	}
}
