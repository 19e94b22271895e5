//! Synchronous process spawning with checked exit status.
//!
//! Every external invocation in the orchestrator funnels through
//! [`CommandRunner`], so recipes can be driven against a fake and so no
//! failure is ever silently swallowed: a child that cannot be spawned or
//! exits non-zero becomes an error the recipe driver must handle.
//!
//! Execution is deliberately blocking, one child at a time, stdio inherited.
//! There is no timeout; a hung tool hangs the build.

use std::cell::RefCell;
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

/// Errors from running an external command.
#[derive(Debug, Error)]
pub enum RunError {
  /// An empty argv slipped through; nothing to spawn.
  #[error("empty command")]
  EmptyCommand,

  /// The child process could not be started at all.
  #[error("failed to spawn '{cmd}': {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  /// The child ran and exited non-zero (or was killed by a signal).
  #[error("command failed with exit code {code:?}: {cmd}")]
  CommandFailed { cmd: String, code: Option<i32> },
}

/// The process-spawning capability handed to the orchestrator.
pub trait CommandRunner {
  /// Run `argv[0]` with the remaining arguments, blocking until exit.
  fn run(&self, argv: &[String]) -> Result<(), RunError>;

  /// Run a command line through the system shell.
  ///
  /// Needed for steps that use shell redirection (asset embedding writes its
  /// header via `>`), which plain argv spawning cannot express.
  fn run_shell(&self, command: &str) -> Result<(), RunError>;
}

/// The real runner: `std::process::Command`, stdio inherited.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
  pub fn new() -> Self {
    Self
  }
}

impl CommandRunner for SystemRunner {
  fn run(&self, argv: &[String]) -> Result<(), RunError> {
    let (program, args) = argv.split_first().ok_or(RunError::EmptyCommand)?;
    let cmd = argv.join(" ");
    info!(%cmd, "running");

    let status = Command::new(program).args(args).status().map_err(|source| RunError::Spawn {
      cmd: cmd.clone(),
      source,
    })?;

    if !status.success() {
      return Err(RunError::CommandFailed {
        cmd,
        code: status.code(),
      });
    }
    debug!(%program, "done");
    Ok(())
  }

  fn run_shell(&self, command: &str) -> Result<(), RunError> {
    let (shell, flag) = shell_invocation();
    self.run(&[shell.to_string(), flag.to_string(), command.to_string()])
  }
}

/// The system shell and its command flag.
///
/// Always `/bin/sh` on Unix rather than `$SHELL`: interactive shells source
/// profile files that can change the environment under the build.
fn shell_invocation() -> (&'static str, &'static str) {
  #[cfg(unix)]
  {
    ("/bin/sh", "-c")
  }
  #[cfg(windows)]
  {
    ("cmd.exe", "/C")
  }
}

/// One invocation observed by [`RecordingRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCommand {
  Argv(Vec<String>),
  Shell(String),
}

/// A test double that records invocations instead of spawning.
///
/// An optional effect closure runs per invocation so tests can simulate the
/// filesystem side effects of a real tool (for instance, creating the output
/// file a compile would have produced).
#[derive(Default)]
pub struct RecordingRunner {
  commands: RefCell<Vec<RecordedCommand>>,
  effect: Option<Box<dyn Fn(&RecordedCommand)>>,
}

impl RecordingRunner {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_effect(effect: impl Fn(&RecordedCommand) + 'static) -> Self {
    Self {
      commands: RefCell::new(Vec::new()),
      effect: Some(Box::new(effect)),
    }
  }

  /// Every invocation seen so far, in order.
  pub fn commands(&self) -> Vec<RecordedCommand> {
    self.commands.borrow().clone()
  }

  pub fn spawn_count(&self) -> usize {
    self.commands.borrow().len()
  }

  fn record(&self, command: RecordedCommand) -> Result<(), RunError> {
    if let Some(effect) = &self.effect {
      effect(&command);
    }
    self.commands.borrow_mut().push(command);
    Ok(())
  }
}

impl CommandRunner for RecordingRunner {
  fn run(&self, argv: &[String]) -> Result<(), RunError> {
    if argv.is_empty() {
      return Err(RunError::EmptyCommand);
    }
    self.record(RecordedCommand::Argv(argv.to_vec()))
  }

  fn run_shell(&self, command: &str) -> Result<(), RunError> {
    self.record(RecordedCommand::Shell(command.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn empty_argv_is_an_error() {
    let runner = SystemRunner::new();
    assert!(matches!(runner.run(&[]), Err(RunError::EmptyCommand)));
  }

  #[test]
  #[cfg(unix)]
  fn successful_command_returns_ok() {
    let runner = SystemRunner::new();
    runner.run(&argv(&["true"])).unwrap();
  }

  #[test]
  #[cfg(unix)]
  fn failing_command_carries_its_exit_code() {
    let runner = SystemRunner::new();
    let err = runner.run_shell("exit 3").unwrap_err();
    assert!(matches!(err, RunError::CommandFailed { code: Some(3), .. }));
  }

  #[test]
  fn unspawnable_command_reports_spawn_error() {
    let runner = SystemRunner::new();
    let err = runner.run(&argv(&["smelt-test-no-such-binary"])).unwrap_err();
    assert!(matches!(err, RunError::Spawn { .. }));
  }

  #[test]
  fn recording_runner_keeps_order() {
    let runner = RecordingRunner::new();
    runner.run(&argv(&["gcc", "-c", "a.c"])).unwrap();
    runner.run_shell("xxd -i a.png > a.h").unwrap();

    assert_eq!(
      runner.commands(),
      vec![
        RecordedCommand::Argv(argv(&["gcc", "-c", "a.c"])),
        RecordedCommand::Shell("xxd -i a.png > a.h".to_string()),
      ]
    );
  }

  #[test]
  fn recording_runner_applies_effects() {
    let temp = tempfile::TempDir::new().unwrap();
    let marker = temp.path().join("ran");
    let marker_for_effect = marker.clone();
    let runner = RecordingRunner::with_effect(move |_| {
      std::fs::write(&marker_for_effect, "x").unwrap();
    });

    runner.run(&argv(&["anything"])).unwrap();
    assert!(marker.exists());
  }
}
