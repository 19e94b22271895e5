//! Core types shared by the synthesizer, orchestrator, and bootstrap.

use std::path::PathBuf;

/// Warning verbosity, named after the MSVC levels the gcc table approximates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarnLevel {
  Three,
  Four,
}

/// A toolchain-neutral build intent.
///
/// Every variant except `Raw` renders portably across the supported compiler
/// families. `Raw` passes a token through verbatim and is not portable; it is
/// reserved for platform-specific link libraries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flag {
  OptimizeSpeed,
  OptimizeSize,
  Debug,
  Warnings(WarnLevel),
  IncludePath(String),
  DefineMacro(String),
  /// Produce an object file instead of linking an executable.
  CompileOnly,
  LanguageStandard(String),
  Raw(String),
}

/// One build step: an output, its declared inputs, and abstract flags.
///
/// Constructed inline at each call site and consumed synchronously; nothing
/// retains a target across steps. Inputs ending in a header suffix participate
/// in staleness comparison but are excluded from the literal source list.
#[derive(Debug, Clone)]
pub struct BuildTarget {
  pub output: PathBuf,
  pub inputs: Vec<PathBuf>,
  pub flags: Vec<Flag>,
}

impl BuildTarget {
  /// Panics if `output` is empty; an empty output path is a recipe bug, not a
  /// runtime condition.
  pub fn new(
    output: impl Into<PathBuf>,
    inputs: impl IntoIterator<Item = impl Into<PathBuf>>,
    flags: impl IntoIterator<Item = Flag>,
  ) -> Self {
    let output = output.into();
    assert!(!output.as_os_str().is_empty(), "build target output path is empty");
    Self {
      output,
      inputs: inputs.into_iter().map(Into::into).collect(),
      flags: flags.into_iter().collect(),
    }
  }
}

/// What a `build` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
  /// The output was up to date; nothing was spawned.
  Fresh,
  /// The synthesized command ran to a successful exit.
  Built,
}
