//! `techdoc_core` keeps the code snippets and captured outputs embedded in
//! markdown documentation in sync with the code samples they come from.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Code sample (*.ts, *.mts, *.js, *.mjs)
//!   → Fragment extractor (`//tech-doc: <name>` opens a fragment)
//!   → Fragment store (latest payload per producer path + name)
//!   → Dependency index (which markdown files reference each fragment)
//!   → Renderer (refreshes the fenced block after each reference marker)
//!   → Per-file lock (one render + write per markdown file at a time)
//! ```
//!
//! Markdown pages reference fragments and captured outputs with HTML
//! comments:
//!
//! ```markdown
//! <!-- file://code-samples/how-to/patients/index.mts snippet:create a patient -->
//! <!-- output://code-samples/how-to/patients/output/create.txt -->
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from `techdoc.toml`.
//! - [`markers`]: Line matchers for the marker grammar.
//! - [`fragments`]: Fragment extraction, producer identities and the
//!   fragment store.
//! - [`references`]: Reference scanning and the dependency index.
//! - [`renderer`]: Re-rendering a markdown file from the current fragments.
//! - [`locks`]: Per-file async locks serializing renders.
//! - [`project`]: Discovery of producer and consumer files.
//! - [`sync`]: [`DocSync`], which ties everything together: cold start,
//!   incremental registration and watching.
//! - [`watch`]: Debounced filesystem events for the watched directories.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use techdoc_core::DocSync;
//! use techdoc_core::Project;
//!
//! # async fn run() -> techdoc_core::TechDocResult<()> {
//! let project = Project::load(Path::new("."))?;
//! let sync = DocSync::new(project);
//! let report = sync.cold_start().await?;
//! println!("{} render(s)", report.renders);
//! sync.watch().await?;
//! # Ok(())
//! # }
//! ```

pub use config::*;
pub use error::*;
pub use fragments::*;
pub use locks::*;
pub use project::*;
pub use references::*;
pub use renderer::*;
pub use sync::*;
pub use watch::*;

pub mod config;
mod error;
pub mod fragments;
pub mod locks;
pub mod markers;
pub mod project;
pub mod references;
pub mod renderer;
pub mod sync;
pub mod watch;
