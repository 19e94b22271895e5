//! The recipe: a fixed, linear description of one project's build.
//!
//! This is the whole "API surface" of the orchestrator: no command-line
//! flags, just an ordered sequence of fetches, CMake sub-builds, asset
//! conversions, compiles, and a final link. Every step is staleness- or
//! existence-gated, so rerunning the binary only redoes what changed, and any
//! failing step aborts the rest.
//!
//! Paths are relative to `root` (the project checkout) rather than hardcoded
//! to the working directory, so tests can drive the recipe inside a temporary
//! tree.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use smelt_lib::fsx;
use smelt_lib::stale::needs_rebuild;
use smelt_lib::{BuildTarget, Flag, Orchestrator};

/// Run the full build sequence for the project at `root`.
pub fn run(orch: &Orchestrator, root: &Path) -> Result<()> {
  fsx::mkdir(&root.join("target")).context("creating output root")?;

  make_assets(orch, root)?;

  fetch_dep(orch, "glfw", "https://github.com/glfw/glfw.git")?;
  compile_cmake(orch, "glfw", &[])?;
  fetch_dep(orch, "cglm", "https://github.com/recp/cglm.git")?;
  compile_cmake(orch, "cglm", &["-DCGLM_SHARED=OFF", "-DCGLM_STATIC=ON"])?;
  fetch_dep(orch, "stb", "https://github.com/nothings/stb.git")?;

  let toolchain = orch.toolchain();
  let glad_obj = root.join(toolchain.object("target/glad"));
  let main_obj = root.join(toolchain.object("target/main"));
  let main_exe = root.join(toolchain.executable("main"));
  let deps = orch.deps_dir();

  orch
    .build(&BuildTarget::new(
      &glad_obj,
      [root.join("glad/src/gl.c")],
      [
        Flag::CompileOnly,
        Flag::IncludePath(path_str(&root.join("glad/include"))),
      ],
    ))
    .context("compiling glad")?;

  orch
    .build(&BuildTarget::new(
      &main_obj,
      [
        root.join("main.c"),
        root.join("target/assets/shaders/frag.h"),
        root.join("target/assets/shaders/vert.h"),
        root.join("target/assets/shaders/geo.h"),
        root.join("target/assets/textures/cobbled_stone.h"),
        root.join("target/assets/textures/grass.h"),
      ],
      [
        Flag::CompileOnly,
        Flag::IncludePath(path_str(&deps.join("glfw/include"))),
        Flag::IncludePath(path_str(&root.join("glad/include"))),
        Flag::IncludePath(path_str(&root.join("target"))),
        Flag::IncludePath(path_str(&deps.join("cglm/include"))),
        Flag::IncludePath(path_str(&deps.join("stb"))),
      ],
    ))
    .context("compiling main")?;

  // Raw flags are platform link libraries; not portable, by design.
  orch
    .build(&BuildTarget::new(
      &main_exe,
      [
        main_obj,
        deps.join("glfw/build/src/libglfw3.a"),
        glad_obj,
        deps.join("cglm/build/libcglm.a"),
      ],
      [
        Flag::Raw("-lwayland-client".into()),
        Flag::Raw("-lwayland-cursor".into()),
        Flag::Raw("-lwayland-egl".into()),
        Flag::Raw("-lEGL".into()),
        Flag::Raw("-lGL".into()),
        Flag::Raw("-lm".into()),
        Flag::Raw("-lpthread".into()),
        Flag::Raw("-ldl".into()),
      ],
    ))
    .context("linking main")?;

  Ok(())
}

/// Shallow-fetch a dependency unless its checkout already exists.
///
/// The fetcher itself makes no idempotency promise (a clone into an existing
/// checkout is a visible git error), so the gate lives here.
fn fetch_dep(orch: &Orchestrator, name: &str, url: &str) -> Result<()> {
  let checkout = orch.deps_dir().join(name);
  if fsx::exists(&checkout) {
    info!(%name, "not fetching, checkout exists");
    return Ok(());
  }
  orch.fetch_git(url, false).with_context(|| format!("fetching {name}"))?;
  Ok(())
}

/// Configure and build a CMake sub-project under `deps/<name>/build/`.
///
/// Gated on the build directory's existence rather than mtimes: a configured
/// CMake tree rebuilds itself incrementally, so one configure per checkout is
/// enough.
fn compile_cmake(orch: &Orchestrator, name: &str, defines: &[&str]) -> Result<()> {
  let source_dir = orch.deps_dir().join(name);
  let build_dir = source_dir.join("build");
  if fsx::exists(&build_dir) {
    info!(%name, "not rebuilding, build directory exists");
    return Ok(());
  }
  fsx::mkdir(&build_dir).with_context(|| format!("creating {}", build_dir.display()))?;

  let mut configure = vec![
    "cmake".to_string(),
    "-S".to_string(),
    path_str(&source_dir),
    "-B".to_string(),
    path_str(&build_dir),
  ];
  configure.extend(defines.iter().map(|d| d.to_string()));
  orch.run(&configure).with_context(|| format!("configuring {name}"))?;

  let build = vec!["cmake".to_string(), "--build".to_string(), path_str(&build_dir)];
  orch.run(&build).with_context(|| format!("building {name}"))?;
  Ok(())
}

/// Convert one asset into a C header embedding its bytes, if stale.
///
/// The conversion is an external collaborator (`xxd -i`); it derives the
/// byte-array and `_len` symbol names from the sanitized input path. We only
/// gate it on staleness and never parse the generated header.
fn compile_asset(orch: &Orchestrator, input: &Path, output: &Path) -> Result<()> {
  if !needs_rebuild(output, &[input]) {
    info!(output = %output.display(), "not rebuilding, up to date");
    return Ok(());
  }
  let cmd = format!("xxd -i {} > {}", input.display(), output.display());
  orch
    .run_shell(&cmd)
    .with_context(|| format!("embedding {}", input.display()))?;
  Ok(())
}

fn make_assets(orch: &Orchestrator, root: &Path) -> Result<()> {
  let shaders = root.join("target/assets/shaders");
  let textures = root.join("target/assets/textures");
  fsx::mkdir(&shaders).context("creating shader output dir")?;
  fsx::mkdir(&textures).context("creating texture output dir")?;

  for name in ["frag", "vert", "geo"] {
    compile_asset(
      orch,
      &root.join(format!("assets/shaders/{name}.glsl")),
      &shaders.join(format!("{name}.h")),
    )?;
  }
  for name in ["cobbled_stone", "grass"] {
    compile_asset(
      orch,
      &root.join(format!("assets/textures/{name}.png")),
      &textures.join(format!("{name}.h")),
    )?;
  }
  Ok(())
}

fn path_str(path: &PathBuf) -> String {
  path.display().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use smelt_lib::Toolchain;
  use smelt_lib::runner::{CommandRunner, RecordedCommand, RecordingRunner, RunError};
  use std::fs;
  use std::rc::Rc;
  use tempfile::TempDir;

  struct SharedRunner(Rc<RecordingRunner>);

  impl CommandRunner for SharedRunner {
    fn run(&self, argv: &[String]) -> Result<(), RunError> {
      self.0.run(argv)
    }

    fn run_shell(&self, command: &str) -> Result<(), RunError> {
      self.0.run_shell(command)
    }
  }

  fn orch_in(root: &Path, runner: Rc<RecordingRunner>) -> Orchestrator {
    Orchestrator::with_runner(Toolchain::Gcc, Box::new(SharedRunner(runner)), root.join("deps"))
  }

  #[test]
  fn cold_tree_runs_every_step_in_order() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let runner = Rc::new(RecordingRunner::new());

    run(&orch_in(root, runner.clone()), root).unwrap();

    let commands = runner.commands();
    // 5 asset embeds via the shell, then 3 clones, 2x(configure+build), 3 compiles.
    let shells = commands
      .iter()
      .filter(|c| matches!(c, RecordedCommand::Shell(_)))
      .count();
    assert_eq!(shells, 5);
    assert_eq!(commands.len(), 15);

    let first_argv = commands
      .iter()
      .find_map(|c| match c {
        RecordedCommand::Argv(argv) => Some(argv.clone()),
        _ => None,
      })
      .unwrap();
    assert_eq!(first_argv[0], "git");
    assert!(first_argv.contains(&"--depth=1".to_string()));

    // Output tree was laid out before anything ran.
    assert!(root.join("target/assets/shaders").is_dir());
    assert!(root.join("target/assets/textures").is_dir());
    assert!(root.join("deps").is_dir());
  }

  #[test]
  fn existing_checkouts_and_build_dirs_are_skipped() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    for dep in ["glfw", "cglm", "stb"] {
      fs::create_dir_all(root.join("deps").join(dep).join("build")).unwrap();
    }
    let runner = Rc::new(RecordingRunner::new());

    run(&orch_in(root, runner.clone()), root).unwrap();

    let commands = runner.commands();
    assert!(!commands.iter().any(|c| match c {
      RecordedCommand::Argv(argv) => argv[0] == "git" || argv[0] == "cmake",
      RecordedCommand::Shell(_) => false,
    }));
  }

  #[test]
  fn link_step_sees_objects_and_static_libs_but_compiles_skip_headers() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let runner = Rc::new(RecordingRunner::new());

    run(&orch_in(root, runner.clone()), root).unwrap();

    let argvs: Vec<Vec<String>> = runner
      .commands()
      .into_iter()
      .filter_map(|c| match c {
        RecordedCommand::Argv(argv) if argv[0] == "gcc" => Some(argv),
        _ => None,
      })
      .collect();
    assert_eq!(argvs.len(), 3);

    // main.o compile lists only main.c; the asset headers stay staleness-only.
    let main_compile = &argvs[1];
    assert!(main_compile.iter().any(|a| a.ends_with("main.c")));
    assert!(!main_compile.iter().any(|a| a.ends_with(".h")));

    // Link carries the raw platform libraries and both objects.
    let link = &argvs[2];
    assert!(link.contains(&"-lwayland-client".to_string()));
    assert!(link.iter().any(|a| a.ends_with("libglfw3.a")));
    assert!(link.iter().any(|a| a.ends_with("glad.o")));
  }
}
