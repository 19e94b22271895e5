//! smelt: a self-hosting build orchestrator.
//!
//! There is no command-line surface. Running the binary from a project
//! checkout does exactly two things, in order: the bootstrap supervisor
//! rebuilds and replaces this binary if its own sources changed, then the
//! recipe drives the project build. Arguments are carried through a hand-off
//! untouched but otherwise ignored.

mod recipe;

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};
use tracing_subscriber::EnvFilter;

use smelt_lib::bootstrap::{self, Rebuild, SelfSpec};
use smelt_lib::{Orchestrator, Toolchain};

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .init();

  if let Err(e) = run() {
    eprintln!(
      "{} {:#}",
      "error:".if_supports_color(Stream::Stderr, |s| s.red()),
      e
    );
    std::process::exit(1);
  }
}

fn run() -> Result<()> {
  let toolchain = Toolchain::detect().context("selecting a toolchain")?;
  let root = Path::new(".");
  let orch = Orchestrator::new(toolchain);

  bootstrap::run(&orch, &self_spec()?).context("bootstrapping")?;
  recipe::run(&orch, root)
}

/// The cargo target directory the self-rebuild compiles into.
///
/// Kept separate from the default `target/` on purpose: the deployed binary
/// is usually `target/release/smelt` itself, and building there would
/// overwrite the running executable in place instead of staging under the
/// temporary name.
const BOOTSTRAP_TARGET_DIR: &str = "target/bootstrap";

/// Every source file whose change must trigger a self-rebuild: the recipe
/// binary, the whole orchestrator library, and the manifests.
fn self_sources() -> Vec<PathBuf> {
  [
    "Cargo.toml",
    "crates/cli/Cargo.toml",
    "crates/cli/src/main.rs",
    "crates/cli/src/recipe.rs",
    "crates/lib/Cargo.toml",
    "crates/lib/src/bootstrap.rs",
    "crates/lib/src/fsx.rs",
    "crates/lib/src/lib.rs",
    "crates/lib/src/orchestrator.rs",
    "crates/lib/src/runner.rs",
    "crates/lib/src/stale.rs",
    "crates/lib/src/synth.rs",
    "crates/lib/src/toolchain.rs",
    "crates/lib/src/types.rs",
  ]
  .map(PathBuf::from)
  .to_vec()
}

/// The orchestrator's description of its own build.
///
/// The staleness gate watches every file the binary is compiled from,
/// mirroring how the recipe watches the project's sources. The rebuild goes
/// through cargo rather than the command synthesizer because cargo is the
/// compiler for this binary; it lands in its own target directory so the
/// artifact can never alias the running executable, then gets staged under
/// the temporary name and handed off like any other self-build.
fn self_spec() -> Result<SelfSpec> {
  let binary = env::current_exe().context("locating the running binary")?;
  let artifact = Path::new(BOOTSTRAP_TARGET_DIR)
    .join("release")
    .join(format!("smelt{}", env::consts::EXE_SUFFIX));
  Ok(SelfSpec {
    binary,
    sources: self_sources(),
    rebuild: Rebuild::Command {
      argv: vec![
        "cargo".to_string(),
        "build".to_string(),
        "--release".to_string(),
        "-p".to_string(),
        "smelt-cli".to_string(),
        "--target-dir".to_string(),
        BOOTSTRAP_TARGET_DIR.to_string(),
      ],
      artifact,
    },
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn self_sources_cover_the_whole_implementation() {
    let sources = self_sources();

    // Editing the library must make the deployed binary stale, not just
    // editing the recipe.
    for file in ["stale", "toolchain", "bootstrap", "synth", "runner"] {
      let path = PathBuf::from(format!("crates/lib/src/{file}.rs"));
      assert!(sources.contains(&path), "missing {}", path.display());
    }
    assert!(sources.contains(&PathBuf::from("crates/cli/src/main.rs")));
    assert!(sources.contains(&PathBuf::from("Cargo.toml")));
  }

  #[test]
  fn self_rebuild_cannot_alias_the_running_binary() {
    let spec = self_spec().unwrap();
    let Rebuild::Command { argv, artifact } = &spec.rebuild else {
      panic!("self-rebuild should go through cargo");
    };

    // The build is steered away from the default target dir, so the artifact
    // is never the deployed `target/release/smelt`.
    let target_dir = argv.iter().position(|a| a == "--target-dir").map(|i| &argv[i + 1]);
    assert_eq!(target_dir, Some(&BOOTSTRAP_TARGET_DIR.to_string()));
    assert!(artifact.starts_with(BOOTSTRAP_TARGET_DIR));
    assert!(!artifact.starts_with("target/release"));
  }
}
