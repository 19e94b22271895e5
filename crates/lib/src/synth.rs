//! Command synthesis: from an abstract build target to a literal argv.
//!
//! Pure token manipulation, no filesystem access and no spawning; the
//! orchestrator wraps this with the staleness gate and the runner.

use std::path::Path;

use crate::toolchain::Toolchain;
use crate::types::{BuildTarget, Flag};

/// Header suffixes excluded from the literal source list.
///
/// Headers still count as staleness inputs; they are only kept out of the
/// argument list handed to the compiler.
const HEADER_SUFFIXES: [&str; 2] = [".h", ".hpp"];

/// Render `target` into a complete compiler invocation for `toolchain`.
///
/// Token order: driver, flags (in declaration order), non-header sources,
/// output flag(s) last.
pub fn synthesize(toolchain: Toolchain, target: &BuildTarget) -> Vec<String> {
  let compile_only = target.flags.contains(&Flag::CompileOnly);

  let mut argv = vec![toolchain.command().to_string()];
  for flag in &target.flags {
    argv.extend(toolchain.render(flag));
  }
  for input in &target.inputs {
    if is_header_like(input) {
      continue;
    }
    argv.push(input.display().to_string());
  }
  argv.extend(toolchain.output_args(&target.output, compile_only));
  argv
}

fn is_header_like(path: &Path) -> bool {
  let name = path.to_string_lossy();
  HEADER_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}
