//! Compiler family selection and flag rendering.
//!
//! The toolchain is picked once at program start, either by explicit name or
//! by probing the PATH, and then acts as the strategy for everything
//! compiler-shaped: how each abstract flag spells itself, how the output flag
//! is written, and which suffixes objects and executables carry.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::{Flag, WarnLevel};

/// Errors from toolchain selection.
#[derive(Debug, Error)]
pub enum ToolchainError {
  /// No supported compiler was found or named. Fatal: the synthesizer must
  /// never guess a command syntax.
  #[error("unknown toolchain '{0}' (supported: gcc, clang, cl)")]
  Unknown(String),

  /// PATH probing found none of the supported compiler families.
  #[error("no supported compiler found on PATH (looked for cl, gcc, clang)")]
  NotDetected,
}

/// The active compiler family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toolchain {
  Gcc,
  Clang,
  Msvc,
}

impl Toolchain {
  /// Select a toolchain by explicit name.
  pub fn from_name(name: &str) -> Result<Self, ToolchainError> {
    match name {
      "gcc" => Ok(Toolchain::Gcc),
      "clang" => Ok(Toolchain::Clang),
      "cl" | "msvc" => Ok(Toolchain::Msvc),
      other => Err(ToolchainError::Unknown(other.to_string())),
    }
  }

  /// Probe the PATH for a supported compiler.
  ///
  /// On Windows `cl` wins if present; otherwise the first of `gcc`, `clang`
  /// found is used.
  pub fn detect() -> Result<Self, ToolchainError> {
    if cfg!(windows) && find_in_path("cl").is_some() {
      return Ok(Toolchain::Msvc);
    }
    if find_in_path("gcc").is_some() {
      return Ok(Toolchain::Gcc);
    }
    if find_in_path("clang").is_some() {
      return Ok(Toolchain::Clang);
    }
    Err(ToolchainError::NotDetected)
  }

  /// The compiler driver to invoke.
  pub fn command(&self) -> &'static str {
    match self {
      Toolchain::Gcc => "gcc",
      Toolchain::Clang => "clang",
      Toolchain::Msvc => "cl",
    }
  }

  /// Render one abstract flag into zero or more literal tokens.
  ///
  /// The gcc and clang drivers share a spelling. MSVC folds flag arguments
  /// into a single token (`/Ipath`), and recognizes only the `c11`/`c17`
  /// language standards; anything else renders to no token at all, an
  /// intentional gap rather than an error.
  pub fn render(&self, flag: &Flag) -> Vec<String> {
    match self {
      Toolchain::Gcc | Toolchain::Clang => render_gnu(flag),
      Toolchain::Msvc => render_msvc(flag),
    }
  }

  /// Tokens naming the output, appended after the source list.
  ///
  /// MSVC spells the output flag differently when compiling to an object
  /// (`/Fo`) versus linking an executable (`/Fe`); the gcc family uses `-o`
  /// for both.
  pub fn output_args(&self, output: &Path, compile_only: bool) -> Vec<String> {
    match self {
      Toolchain::Gcc | Toolchain::Clang => {
        vec!["-o".to_string(), output.display().to_string()]
      }
      Toolchain::Msvc => {
        let prefix = if compile_only { "/Fo" } else { "/Fe" };
        vec![format!("{prefix}{}", output.display())]
      }
    }
  }

  /// Object file suffix for this family's naming convention.
  pub fn object_suffix(&self) -> &'static str {
    match self {
      Toolchain::Gcc | Toolchain::Clang => ".o",
      Toolchain::Msvc => ".obj",
    }
  }

  /// Executable suffix for this family's naming convention.
  pub fn executable_suffix(&self) -> &'static str {
    match self {
      Toolchain::Gcc | Toolchain::Clang => "",
      Toolchain::Msvc => ".exe",
    }
  }

  /// Append the object suffix to a base name.
  pub fn object(&self, base: &str) -> PathBuf {
    PathBuf::from(format!("{base}{}", self.object_suffix()))
  }

  /// Append the executable suffix to a base name.
  pub fn executable(&self, base: &str) -> PathBuf {
    PathBuf::from(format!("{base}{}", self.executable_suffix()))
  }
}

impl fmt::Display for Toolchain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.command())
  }
}

fn render_gnu(flag: &Flag) -> Vec<String> {
  let s = |t: &str| t.to_string();
  match flag {
    Flag::OptimizeSpeed => vec![s("-O2")],
    Flag::OptimizeSize => vec![s("-Os")],
    Flag::Debug => vec![s("-g")],
    Flag::Warnings(WarnLevel::Three) => vec![s("-Wall")],
    Flag::Warnings(WarnLevel::Four) => vec![s("-Wall"), s("-Wextra")],
    Flag::IncludePath(path) => vec![s("-I"), path.clone()],
    Flag::DefineMacro(def) => vec![s("-D"), def.clone()],
    Flag::CompileOnly => vec![s("-c")],
    Flag::LanguageStandard(std) => vec![s("-std"), std.clone()],
    Flag::Raw(raw) => vec![raw.clone()],
  }
}

fn render_msvc(flag: &Flag) -> Vec<String> {
  let s = |t: &str| t.to_string();
  match flag {
    Flag::OptimizeSpeed => vec![s("/O2")],
    Flag::OptimizeSize => vec![s("/O1")],
    Flag::Debug => vec![s("/Zi")],
    Flag::Warnings(WarnLevel::Three) => vec![s("/W3")],
    Flag::Warnings(WarnLevel::Four) => vec![s("/W4")],
    Flag::IncludePath(path) => vec![format!("/I{path}")],
    Flag::DefineMacro(def) => vec![format!("/D{def}")],
    Flag::CompileOnly => vec![s("/c")],
    Flag::LanguageStandard(std) => match std.as_str() {
      "c11" => vec![s("/std:c11")],
      "c17" => vec![s("/std:c17")],
      _ => vec![],
    },
    Flag::Raw(raw) => vec![raw.clone()],
  }
}

/// Look for an executable named `name` in the PATH directories.
fn find_in_path(name: &str) -> Option<PathBuf> {
  let path = env::var_os("PATH")?;
  for dir in env::split_paths(&path) {
    let candidate = dir.join(name);
    if candidate.is_file() {
      return Some(candidate);
    }
    if cfg!(windows) {
      let exe = dir.join(format!("{name}.exe"));
      if exe.is_file() {
        return Some(exe);
      }
    }
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn from_name_round_trip() {
    assert_eq!(Toolchain::from_name("gcc").unwrap(), Toolchain::Gcc);
    assert_eq!(Toolchain::from_name("clang").unwrap(), Toolchain::Clang);
    assert_eq!(Toolchain::from_name("cl").unwrap(), Toolchain::Msvc);
    assert_eq!(Toolchain::from_name("msvc").unwrap(), Toolchain::Msvc);
    assert!(matches!(
      Toolchain::from_name("tcc"),
      Err(ToolchainError::Unknown(_))
    ));
  }

  #[test]
  fn include_path_renders_as_two_tokens_in_order() {
    let tokens = Toolchain::Gcc.render(&Flag::IncludePath("/x".into()));
    assert_eq!(tokens, vec!["-I", "/x"]);
  }

  #[test]
  fn warnings_level_four_expands() {
    let tokens = Toolchain::Gcc.render(&Flag::Warnings(WarnLevel::Four));
    assert_eq!(tokens, vec!["-Wall", "-Wextra"]);
  }

  #[test]
  fn clang_shares_the_gnu_spelling() {
    for flag in [Flag::OptimizeSpeed, Flag::Debug, Flag::CompileOnly] {
      assert_eq!(Toolchain::Clang.render(&flag), Toolchain::Gcc.render(&flag));
    }
  }

  #[test]
  fn msvc_folds_flag_arguments_into_one_token() {
    assert_eq!(
      Toolchain::Msvc.render(&Flag::IncludePath("deps/include".into())),
      vec!["/Ideps/include"]
    );
    assert_eq!(Toolchain::Msvc.render(&Flag::DefineMacro("NDEBUG".into())), vec!["/DNDEBUG"]);
  }

  #[test]
  fn msvc_ignores_unrecognized_language_standard() {
    assert_eq!(
      Toolchain::Msvc.render(&Flag::LanguageStandard("c11".into())),
      vec!["/std:c11"]
    );
    assert!(Toolchain::Msvc.render(&Flag::LanguageStandard("gnu99".into())).is_empty());
  }

  #[test]
  fn output_args_switch_on_compile_only_for_msvc() {
    let out = Path::new("main.obj");
    assert_eq!(Toolchain::Msvc.output_args(out, true), vec!["/Fomain.obj"]);
    assert_eq!(Toolchain::Msvc.output_args(out, false), vec!["/Femain.obj"]);
    assert_eq!(Toolchain::Gcc.output_args(Path::new("main"), false), vec!["-o", "main"]);
  }

  #[test]
  fn naming_conventions_follow_the_family() {
    assert_eq!(Toolchain::Gcc.object("build/main"), PathBuf::from("build/main.o"));
    assert_eq!(Toolchain::Msvc.object("build/main"), PathBuf::from("build/main.obj"));
    assert_eq!(Toolchain::Gcc.executable("smelt"), PathBuf::from("smelt"));
    assert_eq!(Toolchain::Msvc.executable("smelt"), PathBuf::from("smelt.exe"));
  }
}
