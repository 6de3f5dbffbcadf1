//! Subprocess primitive for sources that shell out to an external tool.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use anyhow::Context;
use log::debug;

use crate::error::{Attempt, Maybe};

fn describe<S: AsRef<OsStr>>(program: &str, args: &[S]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.as_ref().to_string_lossy());
    }
    line
}

/// Run a program to completion, treating any non-zero exit status as an
/// error that names the program and the status.
pub fn run_checked<S: AsRef<OsStr>>(program: &str, args: &[S], cwd: Option<&Path>) -> Attempt {
    debug!("running: {}", describe(program, args));

    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let status = command
        .status()
        .with_context(|| format!("could not launch {program}"))?;

    if status.success() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("{program} exited with {status}"))
    }
}

/// Run a program and capture its trimmed standard output. Stderr is folded
/// into the error on failure.
pub fn run_capture<S: AsRef<OsStr>>(
    program: &str,
    args: &[S],
    cwd: Option<&Path>,
) -> Maybe<String> {
    debug!("running: {}", describe(program, args));

    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let output = command
        .output()
        .with_context(|| format!("could not launch {program}"))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        Err(anyhow::anyhow!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_exit_is_ok() {
        run_checked("sh", &["-c", "exit 0"], None).unwrap();
    }

    #[test]
    fn nonzero_exit_reports_status() {
        let err = run_checked("sh", &["-c", "exit 7"], None).unwrap_err();
        assert!(err.to_string().contains('7'), "got: {err}");
    }

    #[test]
    fn capture_trims_stdout() {
        let out = run_capture("sh", &["-c", "echo '  hello  '"], None).unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn capture_failure_includes_stderr() {
        let err = run_capture("sh", &["-c", "echo broken >&2; exit 1"], None).unwrap_err();
        assert!(err.to_string().contains("broken"), "got: {err}");
    }

    #[test]
    fn cwd_is_honored() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_capture("pwd", &[] as &[&str], Some(dir.path())).unwrap();
        assert_eq!(
            std::fs::canonicalize(out).unwrap(),
            std::fs::canonicalize(dir.path()).unwrap()
        );
    }
}
