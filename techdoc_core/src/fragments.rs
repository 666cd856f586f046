use std::collections::HashMap;
use std::fmt;
use std::path::Component;
use std::path::Path;

use parking_lot::RwLock;

use crate::markers::fragment_name;

/// Identity of a fragment: the normalized producer path plus the name written
/// after its marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentKey {
	/// Forward-slash path of the producer relative to the project root.
	pub producer: String,
	pub name: String,
}

impl FragmentKey {
	pub fn new(producer: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			producer: producer.into(),
			name: name.into(),
		}
	}
}

impl fmt::Display for FragmentKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} snippet:{}", self.producer, self.name)
	}
}

/// A fragment extracted from a producer file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
	pub name: String,
	pub payload: String,
}

/// Split a producer file into its fragments, in file order.
///
/// Each `//tech-doc: <name>` line opens a fragment whose payload is every
/// following line up to the next marker or the end of the file. Text before
/// the first marker belongs to no fragment. Duplicate names are returned as
/// found; storing them in order makes the last definition win.
pub fn extract_fragments(content: &str) -> Vec<Fragment> {
	let mut fragments = Vec::new();
	let mut current: Option<Fragment> = None;

	for line in content.split_inclusive('\n') {
		if let Some(name) = fragment_name(line) {
			fragments.extend(current.take());
			current = Some(Fragment {
				name: name.to_string(),
				payload: String::new(),
			});
			continue;
		}

		if let Some(fragment) = current.as_mut() {
			fragment.payload.push_str(line);
			if !line.ends_with('\n') {
				fragment.payload.push('\n');
			}
		}
	}

	fragments.extend(current);
	fragments
}

/// Producer identity for a file discovered on disk.
pub fn producer_id_from_path(root: &Path, path: &Path) -> String {
	let relative = path.strip_prefix(root).unwrap_or(path);
	join_components(relative)
}

/// Producer identity for a path written in a `file://` marker.
///
/// Absolute forms under `root` lose the root prefix, relative forms lose any
/// leading `./` and `../` segments, so both sides agree on one identity per
/// logical file.
pub fn producer_id_from_reference(root: &Path, written: &str) -> String {
	let written = written.replace('\\', "/");
	let path = Path::new(&written);

	if path.is_absolute() {
		return producer_id_from_path(root, path);
	}

	let relative: std::path::PathBuf = path
		.components()
		.skip_while(|component| matches!(component, Component::CurDir | Component::ParentDir))
		.collect();
	join_components(&relative)
}

fn join_components(path: &Path) -> String {
	path.components()
		.filter_map(|component| {
			match component {
				Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
				Component::RootDir => Some(String::new()),
				_ => None,
			}
		})
		.collect::<Vec<_>>()
		.join("/")
}

/// Latest payload of every known fragment.
///
/// Writes replace whatever was stored under the same key; nothing is ever
/// removed, so fragments deleted from a producer keep their last payload.
/// Two quick edits to the same fragment race, and the render that runs last
/// sees the newest payload.
#[derive(Debug, Default)]
pub struct FragmentStore {
	fragments: RwLock<HashMap<FragmentKey, String>>,
}

impl FragmentStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&self, key: FragmentKey, payload: String) {
		self.fragments.write().insert(key, payload);
	}

	pub fn get(&self, key: &FragmentKey) -> Option<String> {
		self.fragments.read().get(key).cloned()
	}

	pub fn contains(&self, key: &FragmentKey) -> bool {
		self.fragments.read().contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.fragments.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.fragments.read().is_empty()
	}
}
