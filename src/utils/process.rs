use std::path::Path;
use std::process::{Command, Stdio};

/// True when `program <version_arg>` runs and exits successfully.
pub fn tool_responds(program: &Path, version_arg: &str) -> bool {
    Command::new(program)
        .arg(version_arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
