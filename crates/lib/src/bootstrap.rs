//! Self-rebuild and process hand-off.
//!
//! Before any recipe step runs, the supervisor asks whether the orchestrator
//! binary itself is stale relative to its own declared sources. If it is, the
//! binary is rebuilt under a temporary name (a running executable cannot be
//! replaced in place everywhere), renamed over the original path, and control
//! transfers to the fresh binary with the same arguments. The original
//! process never executes a stale recipe after detecting staleness.
//!
//! Which generation a process belongs to travels in the `SMELT_GENERATION`
//! environment variable set during hand-off, so the state machine is explicit
//! and observable rather than encoded in binary naming.

use std::convert::Infallible;
use std::env;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fsx;
use crate::orchestrator::{BuildError, Orchestrator};
use crate::runner::RunError;
use crate::stale::needs_rebuild;
use crate::types::{BuildTarget, Flag};

/// Environment variable carrying the generation marker across the hand-off.
pub const GENERATION_ENV: &str = "SMELT_GENERATION";

/// Pause between finishing the rebuild and renaming over the running binary.
///
/// A crude guard against the old process still holding its executable open
/// when the replacement lands; a heuristic, not a lock.
pub const HANDOFF_DELAY: Duration = Duration::from_secs(1);

/// Which incarnation of the orchestrator this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
  /// The binary the user invoked.
  Original,
  /// The freshly built binary exec'd during hand-off.
  Replacement,
}

impl Generation {
  /// Read the marker set by a hand-off; absence means `Original`.
  pub fn from_env() -> Self {
    match env::var(GENERATION_ENV) {
      Ok(value) if value == "replacement" => Generation::Replacement,
      _ => Generation::Original,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Generation::Original => "original",
      Generation::Replacement => "replacement",
    }
  }
}

impl fmt::Display for Generation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// How the orchestrator compiles itself.
pub enum Rebuild {
  /// Synthesize a compile of the declared sources straight to the temporary
  /// binary with the active toolchain.
  Toolchain(Vec<Flag>),
  /// Run an arbitrary build command, then stage its artifact under the
  /// temporary name. Used when the orchestrator's own sources are built by a
  /// tool the synthesizer does not speak (cargo, for this binary).
  Command { argv: Vec<String>, artifact: PathBuf },
}

/// The orchestrator's description of its own build.
pub struct SelfSpec {
  /// Path of the currently deployed orchestrator binary.
  pub binary: PathBuf,
  /// Source files whose mtimes gate the self-rebuild.
  pub sources: Vec<PathBuf>,
  pub rebuild: Rebuild,
}

/// Outcome of the staleness-and-rebuild phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
  /// The binary is current; continue straight into the recipe.
  Fresh,
  /// A replacement was built under `temp` and a hand-off is required.
  Rebuilt { temp: PathBuf },
}

/// Errors from the bootstrap phase.
#[derive(Debug, Error)]
pub enum BootstrapError {
  #[error(transparent)]
  Build(#[from] BuildError),

  #[error(transparent)]
  Run(#[from] RunError),

  /// Copying the build artifact to the temporary name failed.
  #[error("failed to stage rebuilt binary at '{0}': {1}")]
  Stage(PathBuf, #[source] io::Error),

  /// Renaming the temporary over the deployed binary failed.
  #[error("failed to promote rebuilt binary over '{0}': {1}")]
  Promote(PathBuf, #[source] io::Error),

  /// Transferring control to the replacement failed.
  #[error("failed to launch replacement binary '{0}': {1}")]
  Exec(PathBuf, #[source] io::Error),
}

/// The temporary name a replacement is built under: `build` becomes
/// `build.new`, `build.exe` becomes `build.new.exe`.
pub fn temp_name(binary: &Path) -> PathBuf {
  match binary.extension().and_then(|e| e.to_str()) {
    Some("exe") => binary.with_extension("new.exe"),
    _ => {
      let mut name = binary.as_os_str().to_os_string();
      name.push(".new");
      PathBuf::from(name)
    }
  }
}

/// Check staleness and, if needed, build the replacement binary.
///
/// Never touches the deployed binary; the replacement lands under
/// [`temp_name`]. In the `Replacement` generation a still-stale verdict is
/// downgraded to a warning rather than another rebuild: a correct staleness
/// comparison makes the post-hand-off pass a no-op, so staleness here means
/// the sources are not visible to this process, and re-entering the rebuild
/// would loop forever.
pub fn prepare(orch: &Orchestrator, spec: &SelfSpec) -> Result<Verdict, BootstrapError> {
  let generation = Generation::from_env();
  debug!(%generation, binary = %spec.binary.display(), "bootstrap check");

  if !needs_rebuild(&spec.binary, &spec.sources) {
    info!("orchestrator up to date");
    return Ok(Verdict::Fresh);
  }

  if generation == Generation::Replacement {
    warn!("orchestrator still stale after hand-off; continuing without rebuilding");
    return Ok(Verdict::Fresh);
  }

  let temp = temp_name(&spec.binary);
  info!(temp = %temp.display(), "rebuilding orchestrator");

  match &spec.rebuild {
    Rebuild::Toolchain(flags) => {
      let target = BuildTarget::new(&temp, spec.sources.clone(), flags.clone());
      orch.build(&target)?;
    }
    Rebuild::Command { argv, artifact } => {
      orch.run(argv)?;
      fsx::copy(artifact, &temp).map_err(|e| BootstrapError::Stage(temp.clone(), e))?;
    }
  }

  Ok(Verdict::Rebuilt { temp })
}

/// Rename the replacement over the deployed binary after a settle delay.
pub fn promote(temp: &Path, binary: &Path, delay: Duration) -> Result<(), BootstrapError> {
  std::thread::sleep(delay);
  fsx::rename_overwrite(temp, binary).map_err(|e| BootstrapError::Promote(binary.to_path_buf(), e))
}

/// Transfer control to the freshly built binary. Does not return on success.
///
/// Unix: promote in-process (renaming a running executable is allowed), then
/// replace the process image via `exec` with the original arguments and the
/// replacement marker set.
#[cfg(unix)]
pub fn handoff(binary: &Path, temp: &Path) -> Result<Infallible, BootstrapError> {
  use std::os::unix::process::CommandExt;

  promote(temp, binary, HANDOFF_DELAY)?;

  info!(binary = %binary.display(), "handing off to replacement");
  let err = std::process::Command::new(binary)
    .args(env::args().skip(1))
    .env(GENERATION_ENV, Generation::Replacement.as_str())
    .exec();
  Err(BootstrapError::Exec(binary.to_path_buf(), err))
}

/// Transfer control to the freshly built binary. Does not return on success.
///
/// Windows: a running executable cannot be renamed over, so a detached shell
/// waits for this process to exit, performs the move, and relaunches.
#[cfg(windows)]
pub fn handoff(binary: &Path, temp: &Path) -> Result<Infallible, BootstrapError> {
  let mut relaunch = binary.display().to_string();
  for arg in env::args().skip(1) {
    relaunch.push(' ');
    relaunch.push_str(&arg);
  }
  let script = format!(
    "timeout /t 1 >nul && move /Y \"{}\" \"{}\" && {}",
    temp.display(),
    binary.display(),
    relaunch
  );

  info!(binary = %binary.display(), "handing off to replacement");
  std::process::Command::new("cmd")
    .args(["/C", &script])
    .env(GENERATION_ENV, Generation::Replacement.as_str())
    .spawn()
    .map_err(|e| BootstrapError::Exec(binary.to_path_buf(), e))?;
  std::process::exit(0);
}

/// The full supervisor: check, rebuild if stale, hand off.
///
/// Returns `Ok(())` when the binary was already fresh and the caller should
/// continue into the recipe. When a rebuild happened this function does not
/// return except to report a hand-off failure.
pub fn run(orch: &Orchestrator, spec: &SelfSpec) -> Result<(), BootstrapError> {
  match prepare(orch, spec)? {
    Verdict::Fresh => Ok(()),
    Verdict::Rebuilt { temp } => match handoff(&spec.binary, &temp) {
      Ok(never) => match never {},
      Err(e) => Err(e),
    },
  }
}
