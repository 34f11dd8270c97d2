use std::path::Path;
use std::process::{Command, Output, Stdio};

use crate::error::{ReleaseError, ReleaseResult};

/// Run a command and capture its output. Fails if the command
/// returns a non-zero exit code.
pub fn run(program: &str, args: &[&str]) -> ReleaseResult<String> {
    capture(None, program, args)
}

/// Like [`run`], with an explicit working directory.
///
/// Location-dependent collaborators (git, npm) always receive their
/// directory this way; the process-wide cwd is never mutated.
pub fn run_in(dir: &Path, program: &str, args: &[&str]) -> ReleaseResult<String> {
    capture(Some(dir), program, args)
}

/// Run a command with stdin/stdout/stderr inherited so its progress
/// streams to the terminal.
pub fn run_interactive(program: &str, args: &[&str]) -> ReleaseResult<()> {
    interactive(None, program, args)
}

/// Like [`run_interactive`], with an explicit working directory.
pub fn run_interactive_in(dir: &Path, program: &str, args: &[&str]) -> ReleaseResult<()> {
    interactive(Some(dir), program, args)
}

/// Run a command that pipes its stdin from a byte slice.
pub fn run_with_stdin(program: &str, args: &[&str], stdin_data: &[u8]) -> ReleaseResult<String> {
    use std::io::Write;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| not_found(program, e))?;

    if let Some(stdin) = &mut child.stdin {
        stdin.write_all(stdin_data)?;
    }
    drop(child.stdin.take());

    let output = child.wait_with_output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        eprintln!("stderr: {stderr}");
        Err(ReleaseError::CommandFailed {
            command: format_command(program, args),
            status: output.status,
        })
    }
}

fn capture(dir: Option<&Path>, program: &str, args: &[&str]) -> ReleaseResult<String> {
    let output = spawn(dir, program, args)?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        eprintln!("stderr: {stderr}");
        Err(ReleaseError::CommandFailed {
            command: format_command(program, args),
            status: output.status,
        })
    }
}

fn interactive(dir: Option<&Path>, program: &str, args: &[&str]) -> ReleaseResult<()> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    if let Some(dir) = dir {
        command.current_dir(dir);
    }

    let status = command.status().map_err(|e| not_found(program, e))?;

    if status.success() {
        Ok(())
    } else {
        Err(ReleaseError::CommandFailed {
            command: format_command(program, args),
            status,
        })
    }
}

fn spawn(dir: Option<&Path>, program: &str, args: &[&str]) -> ReleaseResult<Output> {
    let mut command = Command::new(program);
    command.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
    if let Some(dir) = dir {
        command.current_dir(dir);
    }
    command.output().map_err(|e| not_found(program, e))
}

fn not_found(program: &str, e: std::io::Error) -> ReleaseError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ReleaseError::CommandNotFound(program.to_string())
    } else {
        ReleaseError::Io(e)
    }
}

fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| (*a).to_string()));
    parts.join(" ")
}
