use std::path::Path;

use assert_cmd::Command;

pub fn techdoc_cmd() -> Command {
	let mut cmd =
		Command::cargo_bin("techdoc").unwrap_or_else(|e| panic!("techdoc binary missing: {e}"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("RUST_LOG");
	cmd
}

/// Write `content` to `root/relative`, creating parent directories.
pub fn write(root: &Path, relative: &str, content: &str) -> std::io::Result<()> {
	let path = root.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(path, content)
}
