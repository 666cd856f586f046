use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Keep documentation snippets in sync with the code samples they come from.",
	long_about = "techdoc watches a directory of code samples and a directory of markdown \
	              documentation.\n\nSamples mark fragments with `//tech-doc: <name>` comments. \
	              Markdown pages reference them with `<!-- file://<sample> snippet:<name> -->` \
	              and captured program output with `<!-- output://<capture>.txt -->`. Whenever a \
	              sample changes, every page referencing one of its fragments is re-rendered.\n\n\
	              Quick start:\n  techdoc watch  Sync everything, then keep watching\n  techdoc \
	              list   Show which pages reference which fragments"
)]
pub struct TechDocCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable debug logging.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Sync every page once, then watch for changes.
	///
	/// Registers every markdown page below the consumer directories and every
	/// sample below the producer directories, re-renders the pages that
	/// reference a known fragment and keeps running. Saving a sample
	/// re-renders its dependent pages. Saving a page only refreshes which
	/// fragments it depends on. This is the default command.
	Watch,
	/// List every referenced fragment and the pages that depend on it.
	///
	/// Scans the project without writing anything. References to fragments
	/// that no sample defines yet are marked as pending.
	List {
		/// Output format. Use `text` for human-readable output or `json` for
		/// programmatic consumption.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
