//! [`Launcher`] that starts detached child processes.
//!
//! Every child runs in its own process group with stdin and stdout closed,
//! so it does not receive terminal signals aimed at the manager and cannot
//! write into the status feed.  A small reaper thread per child waits for
//! it, keeping the event loop free of zombie handling.

use crate::traits::Launcher;
use log::{debug, info, warn};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::thread;

/// Errors that can occur when starting a program.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("cannot launch an empty command")]
    EmptyCommand,

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Spawns programs with [`std::process::Command`].
#[derive(Debug, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    pub fn new() -> Self {
        Self
    }
}

/// Start `argv` detached from the manager's stdin and stdout.
fn start(argv: &[String]) -> Result<Child, LaunchError> {
    let (program, args) = argv.split_first().ok_or(LaunchError::EmptyCommand)?;
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        // stdout carries the status feed.
        .stdout(Stdio::null())
        .process_group(0)
        .spawn()
        .map_err(|source| LaunchError::Spawn {
            program: program.clone(),
            source,
        })
}

impl Launcher for ProcessLauncher {
    type Error = LaunchError;

    fn spawn(&self, argv: &[String]) -> Result<(), LaunchError> {
        let mut child = start(argv)?;

        let pid = child.id();
        info!("launched {} (pid {})", argv[0], pid);
        let reaper = thread::Builder::new()
            .name(format!("reap-{}", pid))
            .spawn(move || match child.wait() {
                Ok(status) => debug!("pid {} exited: {}", pid, status),
                Err(e) => warn!("waiting for pid {} failed: {}", pid, e),
            });
        if let Err(e) = reaper {
            // The child keeps running; it is reaped when the manager exits.
            warn!("no reaper thread for pid {}: {}", pid, e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_is_rejected() {
        assert!(matches!(
            ProcessLauncher::new().spawn(&[]),
            Err(LaunchError::EmptyCommand)
        ));
    }

    #[test]
    fn missing_program_reports_its_name() {
        let err = ProcessLauncher::new()
            .spawn(&["/nonexistent/maxwm-test-program".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/maxwm-test-program"));
    }

    #[test]
    fn child_output_does_not_reach_stdout() {
        let mut child = start(&["sleep".to_string(), "5".to_string()]).unwrap();
        let stdin = std::fs::read_link(format!("/proc/{}/fd/0", child.id())).unwrap();
        let stdout = std::fs::read_link(format!("/proc/{}/fd/1", child.id())).unwrap();
        child.kill().unwrap();
        child.wait().unwrap();
        assert_eq!(stdin, std::path::Path::new("/dev/null"));
        assert_eq!(stdout, std::path::Path::new("/dev/null"));
    }

    #[test]
    fn spawns_real_program() {
        ProcessLauncher::new()
            .spawn(&["true".to_string()])
            .unwrap();
    }
}
