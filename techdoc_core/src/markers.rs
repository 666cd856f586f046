//! Line-oriented matchers for the marker grammar shared by samples and
//! documentation pages.
//!
//! Producer files mark fragments with `//tech-doc: <name>`. Consumer files
//! reference them with HTML comments:
//!
//! ```text
//! <!-- file://code-samples/how-to/patients/index.mts snippet:create a patient -->
//! <!-- output://code-samples/how-to/patients/output/create.txt -->
//! ```
//!
//! Everything here is pure string matching so it can be tested without any
//! file I/O.

use std::sync::LazyLock;

use regex::Captures;
use regex::Regex;

/// Token that opens a fragment in a producer file.
pub const FRAGMENT_TOKEN: &str = "//tech-doc:";

/// Line that closes an injected code block.
pub const CLOSING_FENCE: &str = "```";

/// Line that closes an injected output block.
pub const DETAILS_CLOSE: &str = "</details>";

static SNIPPET_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^\s*<!--\s*file://(\S+)\s+snippet:\s*(.*?)\s*-->\s*$")
		.unwrap_or_else(|e| panic!("invalid snippet reference pattern: {e}"))
});

static OUTPUT_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^\s*<!--\s*output://(\S+\.txt)\s*-->\s*$")
		.unwrap_or_else(|e| panic!("invalid output reference pattern: {e}"))
});

static TRUNCATED_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"/\*\s*truncate\s*\*/\s*(?:"([^"\n]*)"|'([^'\n]*)')"#)
		.unwrap_or_else(|e| panic!("invalid truncation pattern: {e}"))
});

/// Number of characters kept at each end of a truncated literal.
const TRUNCATE_KEEP: usize = 10;

/// A `file://... snippet:...` marker, as written in the markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetMarker<'a> {
	pub producer: &'a str,
	pub name: &'a str,
}

/// An `output://....txt` marker, as written in the markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMarker<'a> {
	pub path: &'a str,
	/// File name without the `.txt` extension, shown as the disclosure
	/// summary.
	pub title: &'a str,
}

/// Return the fragment name when `line` opens a fragment.
pub fn fragment_name(line: &str) -> Option<&str> {
	line.find(FRAGMENT_TOKEN)
		.map(|index| line[index + FRAGMENT_TOKEN.len()..].trim())
}

pub fn snippet_marker(line: &str) -> Option<SnippetMarker<'_>> {
	let captures = SNIPPET_REFERENCE.captures(line)?;
	let producer = captures.get(1)?.as_str();
	let name = captures.get(2)?.as_str();
	if name.is_empty() {
		return None;
	}

	Some(SnippetMarker { producer, name })
}

pub fn output_marker(line: &str) -> Option<OutputMarker<'_>> {
	let captures = OUTPUT_REFERENCE.captures(line)?;
	let path = captures.get(1)?.as_str();
	let file_name = path.rsplit('/').next().unwrap_or(path);
	let title = file_name.strip_suffix(".txt").unwrap_or(file_name);

	Some(OutputMarker { path, title })
}

/// Whether `line` terminates an injected code block.
pub fn is_closing_fence(line: &str) -> bool {
	line.trim_end() == CLOSING_FENCE
}

/// Whether `line` terminates an injected output block.
pub fn is_details_close(line: &str) -> bool {
	line.trim() == DETAILS_CLOSE
}

/// Whether a fragment line is meant for tests only.
pub fn is_skipped_line(line: &str, skip_token: &str) -> bool {
	!skip_token.is_empty() && line.trim_end().ends_with(skip_token)
}

/// Rewrite every `/* truncate */"..."` literal to its first and last ten
/// characters joined by `...`, keeping the original quote character.
pub fn truncate_literals(text: &str) -> String {
	TRUNCATED_LITERAL
		.replace_all(text, |captures: &Captures<'_>| {
			let (quote, content) = match (captures.get(1), captures.get(2)) {
				(Some(double), _) => ('"', double.as_str()),
				(None, Some(single)) => ('\'', single.as_str()),
				(None, None) => return captures[0].to_string(),
			};

			format!("{quote}{}{quote}", abbreviate(content))
		})
		.into_owned()
}

fn abbreviate(content: &str) -> String {
	let chars: Vec<char> = content.chars().collect();
	let head: String = chars.iter().take(TRUNCATE_KEEP).collect();
	let tail: String = chars[chars.len().saturating_sub(TRUNCATE_KEEP)..]
		.iter()
		.collect();

	format!("{head}...{tail}")
}

/// Drop blank lines at the end of `text` until it ends with at most one
/// line break. `\r\n` counts as a single line break.
pub fn collapse_trailing_blank_lines(text: &str) -> &str {
	let mut result = text;
	while let Some(rest) = strip_line_break(result) {
		if strip_line_break(rest).is_none() {
			break;
		}
		result = rest;
	}
	result
}

/// The line break used by `text`, `\r\n` when any line ends with one.
pub fn line_break(text: &str) -> &'static str {
	if text.contains("\r\n") { "\r\n" } else { "\n" }
}

fn strip_line_break(text: &str) -> Option<&str> {
	text.strip_suffix("\r\n")
		.or_else(|| text.strip_suffix('\n'))
}
