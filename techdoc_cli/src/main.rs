use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use owo_colors::OwoColorize;
use techdoc_cli::Commands;
use techdoc_cli::OutputFormat;
use techdoc_cli::TechDocCli;
use techdoc_core::DocSync;
use techdoc_core::FragmentKey;
use techdoc_core::Project;
use techdoc_core::ScanReport;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = TechDocCli::parse();

	// Plain output when asked for or when stdout cannot show color.
	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stdout).is_some();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	let result = match args.command {
		Some(Commands::Watch) | None => run_watch(&args),
		Some(Commands::List { format }) => run_list(&args, format),
	};

	if let Err(e) = result {
		match e.downcast::<techdoc_core::TechDocError>() {
			Ok(techdoc_err) => {
				let report: miette::Report = (*techdoc_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_directives = if verbose {
		"techdoc=debug,techdoc_core=debug"
	} else {
		"techdoc=info,techdoc_core=info"
	};
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(default_directives));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(verbose)
		.init();
}

fn resolve_root(args: &TechDocCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
	tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
}

fn load_sync(args: &TechDocCli) -> Result<Arc<DocSync>, Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let project = Project::load(&root)?;
	tracing::debug!(root = %project.root().display(), "loaded project");
	Ok(DocSync::new(project))
}

fn run_watch(args: &TechDocCli) -> Result<(), Box<dyn std::error::Error>> {
	let sync = load_sync(args)?;
	runtime()?.block_on(sync.run())?;
	Ok(())
}

/// One referenced fragment and the pages depending on it.
struct ListedReference {
	key: FragmentKey,
	defined: bool,
	consumers: Vec<String>,
}

/// One captured output referenced by a page.
struct ListedOutput {
	consumer: String,
	path: String,
	exists: bool,
}

fn run_list(args: &TechDocCli, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
	let sync = load_sync(args)?;
	let report = runtime()?.block_on(sync.scan())?;

	let references: Vec<ListedReference> = sync
		.index()
		.keys()
		.into_iter()
		.map(|key| {
			ListedReference {
				defined: sync.fragments().contains(&key),
				consumers: sync
					.index()
					.consumers_of(&key)
					.iter()
					.map(|path| sync.display_path(path))
					.collect(),
				key,
			}
		})
		.collect();

	let mut outputs = Vec::new();
	for consumer in sync.index().consumers() {
		let Some(consumer_refs) = sync.index().references_of(&consumer) else {
			continue;
		};
		for output in consumer_refs.outputs {
			outputs.push(ListedOutput {
				consumer: sync.display_path(&consumer),
				exists: sync.project().root().join(&output.path).is_file(),
				path: output.path,
			});
		}
	}

	match format {
		OutputFormat::Json => print_list_json(&sync, &report, &references, &outputs)?,
		OutputFormat::Text => print_list_text(&report, &references, &outputs),
	}

	Ok(())
}

fn print_list_text(report: &ScanReport, references: &[ListedReference], outputs: &[ListedOutput]) {
	if references.is_empty() && outputs.is_empty() {
		println!("No fragment or output references found.");
	}

	if !references.is_empty() {
		println!("{}", colored!("Fragments:", bold));
		for reference in references {
			let status = if reference.defined {
				String::new()
			} else {
				format!(" {}", colored!("[pending]", yellow))
			};
			println!(
				"  {} ({} consumer(s)){status}",
				reference.key,
				reference.consumers.len()
			);
			for consumer in &reference.consumers {
				println!("    {consumer}");
			}
		}
	}

	if !outputs.is_empty() {
		if !references.is_empty() {
			println!();
		}
		println!("{}", colored!("Outputs:", bold));
		for output in outputs {
			let status = if output.exists {
				String::new()
			} else {
				format!(" {}", colored!("[missing]", yellow))
			};
			println!("  {} {}{status}", output.path, output.consumer);
		}
	}

	println!(
		"\n{} producer(s), {} fragment(s), {} consumer(s), {} reference(s)",
		report.producers, report.fragments, report.consumers, report.references
	);
}

fn print_list_json(
	sync: &DocSync,
	report: &ScanReport,
	references: &[ListedReference],
	outputs: &[ListedOutput],
) -> Result<(), Box<dyn std::error::Error>> {
	let references: Vec<serde_json::Value> = references
		.iter()
		.map(|reference| {
			serde_json::json!({
				"producer": reference.key.producer,
				"name": reference.key.name,
				"defined": reference.defined,
				"consumers": reference.consumers,
			})
		})
		.collect();
	let outputs: Vec<serde_json::Value> = outputs
		.iter()
		.map(|output| {
			serde_json::json!({
				"consumer": output.consumer,
				"path": output.path,
				"exists": output.exists,
			})
		})
		.collect();

	let value = serde_json::json!({
		"root": sync.project().root().display().to_string(),
		"producers": report.producers,
		"fragments": report.fragments,
		"consumers": report.consumers,
		"failures": report.failures,
		"references": references,
		"outputs": outputs,
	});
	println!("{}", serde_json::to_string_pretty(&value)?);

	Ok(())
}
