use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use parking_lot::RwLock;

use crate::fragments::FragmentKey;
use crate::fragments::producer_id_from_reference;
use crate::markers::output_marker;
use crate::markers::snippet_marker;

/// A captured output referenced by an `output://` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputReference {
	/// Path as written in the marker, relative to the project root.
	pub path: String,
	/// Label shown in the disclosure summary.
	pub title: String,
}

/// Everything a consumer file references, in line order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerReferences {
	pub snippets: Vec<FragmentKey>,
	pub outputs: Vec<OutputReference>,
}

impl ConsumerReferences {
	pub fn is_empty(&self) -> bool {
		self.snippets.is_empty() && self.outputs.is_empty()
	}
}

/// Find the fragment and output references of a markdown file.
pub fn scan_references(root: &Path, content: &str) -> ConsumerReferences {
	let mut references = ConsumerReferences::default();

	for line in content.lines() {
		if let Some(marker) = snippet_marker(line) {
			references.snippets.push(FragmentKey::new(
				producer_id_from_reference(root, marker.producer),
				marker.name,
			));
		} else if let Some(marker) = output_marker(line) {
			references.outputs.push(OutputReference {
				path: marker.path.to_string(),
				title: marker.title.to_string(),
			});
		}
	}

	references
}

#[derive(Debug, Default)]
struct IndexState {
	consumers_by_key: BTreeMap<FragmentKey, Vec<PathBuf>>,
	references_by_consumer: HashMap<PathBuf, ConsumerReferences>,
}

/// Which consumer files reference each fragment.
///
/// Each key maps to its consumers in registration order, and a consumer
/// appears at most once per key.
#[derive(Debug, Default)]
pub struct DependencyIndex {
	state: RwLock<IndexState>,
}

impl DependencyIndex {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replace everything previously registered for `consumer` with
	/// `references`.
	///
	/// Registering the same references twice leaves the index unchanged, and
	/// references dropped from the file stop pointing at it.
	pub fn register(&self, consumer: &Path, references: ConsumerReferences) {
		let mut state = self.state.write();

		if let Some(previous) = state.references_by_consumer.remove(consumer) {
			for key in &previous.snippets {
				let Some(consumers) = state.consumers_by_key.get_mut(key) else {
					continue;
				};
				consumers.retain(|path| path != consumer);
				if consumers.is_empty() {
					state.consumers_by_key.remove(key);
				}
			}
		}

		for key in &references.snippets {
			let consumers = state.consumers_by_key.entry(key.clone()).or_default();
			if !consumers.iter().any(|path| path == consumer) {
				consumers.push(consumer.to_path_buf());
			}
		}

		tracing::debug!(
			consumer = %consumer.display(),
			snippets = references.snippets.len(),
			outputs = references.outputs.len(),
			"registered consumer references"
		);
		state
			.references_by_consumer
			.insert(consumer.to_path_buf(), references);
	}

	/// Consumers currently referencing `key`.
	pub fn consumers_of(&self, key: &FragmentKey) -> Vec<PathBuf> {
		self.state
			.read()
			.consumers_by_key
			.get(key)
			.cloned()
			.unwrap_or_default()
	}

	/// What `consumer` referenced when it was last registered.
	pub fn references_of(&self, consumer: &Path) -> Option<ConsumerReferences> {
		self.state
			.read()
			.references_by_consumer
			.get(consumer)
			.cloned()
	}

	/// All referenced fragment keys, sorted.
	pub fn keys(&self) -> Vec<FragmentKey> {
		self.state.read().consumers_by_key.keys().cloned().collect()
	}

	/// Registered consumer files, sorted.
	pub fn consumers(&self) -> Vec<PathBuf> {
		let mut consumers: Vec<_> = self
			.state
			.read()
			.references_by_consumer
			.keys()
			.cloned()
			.collect();
		consumers.sort();
		consumers
	}
}
