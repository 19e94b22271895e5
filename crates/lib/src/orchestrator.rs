//! The capability bundle recipes are written against.
//!
//! An [`Orchestrator`] owns the selected toolchain and the command runner and
//! exposes the two orchestration verbs (`build`, `fetch_git`) plus raw runner
//! access for steps that are external commands with no flag rendering (cmake,
//! asset embedding). Constructing it explicitly, rather than populating a
//! process-wide table, is what lets tests substitute a recording runner.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::runner::{CommandRunner, RunError, SystemRunner};
use crate::stale::needs_rebuild;
use crate::synth::synthesize;
use crate::toolchain::Toolchain;
use crate::types::{BuildOutcome, BuildTarget};

/// Errors from a synthesized build step.
#[derive(Debug, Error)]
pub enum BuildError {
  /// The compiler invocation failed to spawn or exited non-zero.
  #[error(transparent)]
  Run(#[from] RunError),
}

/// Errors from fetching an external dependency.
#[derive(Debug, Error)]
pub enum FetchError {
  /// The dependency root could not be created.
  #[error("failed to create dependency root '{0}': {1}")]
  CreateDepsDir(PathBuf, #[source] io::Error),

  /// The clone command failed. Cloning into an existing checkout is one such
  /// visible failure; this component makes no idempotency promise, callers
  /// check for the checkout first if they need one.
  #[error(transparent)]
  Run(#[from] RunError),
}

/// Toolchain + runner + dependency root, passed to the recipe.
pub struct Orchestrator {
  toolchain: Toolchain,
  runner: Box<dyn CommandRunner>,
  deps_dir: PathBuf,
}

impl Orchestrator {
  /// Bundle with the real system runner and the conventional `./deps` root.
  pub fn new(toolchain: Toolchain) -> Self {
    Self::with_runner(toolchain, Box::new(SystemRunner::new()), "deps")
  }

  /// Bundle with an explicit runner and dependency root, for tests and for
  /// recipes that relocate their tree.
  pub fn with_runner(toolchain: Toolchain, runner: Box<dyn CommandRunner>, deps_dir: impl Into<PathBuf>) -> Self {
    Self {
      toolchain,
      runner,
      deps_dir: deps_dir.into(),
    }
  }

  pub fn toolchain(&self) -> Toolchain {
    self.toolchain
  }

  pub fn deps_dir(&self) -> &Path {
    &self.deps_dir
  }

  /// Run an argv through the bundled runner.
  pub fn run(&self, argv: &[String]) -> Result<(), RunError> {
    self.runner.run(argv)
  }

  /// Run a shell command line through the bundled runner.
  pub fn run_shell(&self, command: &str) -> Result<(), RunError> {
    self.runner.run_shell(command)
  }

  /// Build one target: staleness gate, then one synthesized compiler spawn.
  ///
  /// A fresh target logs a skip notice and does nothing. A failing compile
  /// surfaces as an error so the recipe stops instead of limping into a
  /// confusing downstream failure.
  pub fn build(&self, target: &BuildTarget) -> Result<BuildOutcome, BuildError> {
    if !needs_rebuild(&target.output, &target.inputs) {
      info!(output = %target.output.display(), "not rebuilding, up to date");
      return Ok(BuildOutcome::Fresh);
    }

    let argv = synthesize(self.toolchain, target);
    self.runner.run(&argv)?;
    Ok(BuildOutcome::Built)
  }

  /// Shallow-clone `url` into the dependency root.
  ///
  /// History is never needed, so the clone is depth-1, single-branch. The
  /// `build` parameter is accepted but reserved; it has no effect.
  pub fn fetch_git(&self, url: &str, _build: bool) -> Result<(), FetchError> {
    if !self.deps_dir.exists() {
      std::fs::create_dir_all(&self.deps_dir)
        .map_err(|e| FetchError::CreateDepsDir(self.deps_dir.clone(), e))?;
    }
    info!(%url, "fetching");

    let argv = vec![
      "git".to_string(),
      "-C".to_string(),
      self.deps_dir.display().to_string(),
      "clone".to_string(),
      "--depth=1".to_string(),
      "--single-branch".to_string(),
      url.to_string(),
    ];
    self.runner.run(&argv)?;
    Ok(())
  }
}
