//! Mtime-based staleness decisions.
//!
//! The whole engine is one query over filesystem metadata: no caching, no
//! persisted state, recomputed on every call. Ambiguity always resolves toward
//! rebuilding: a missing output, a missing input, or an unreadable timestamp
//! all count as stale. Whether a truly required input exists is the command
//! synthesizer's problem, not ours.

use std::path::Path;
use std::time::SystemTime;

use tracing::debug;

/// Decide whether `output` must be regenerated from `inputs`.
///
/// Returns true when the output is missing, when any input is missing, or when
/// any input's modification time is not strictly older than the output's.
/// Equal timestamps count as stale: coarse filesystem clocks make a tie
/// indistinguishable from "written in the same instant", and a spurious
/// rebuild is cheaper than a silently skipped one.
///
/// With zero inputs the output is fresh as long as it exists.
pub fn needs_rebuild(output: &Path, inputs: &[impl AsRef<Path>]) -> bool {
  let Some(out_time) = mtime(output) else {
    debug!(output = %output.display(), "output missing, rebuild");
    return true;
  };

  for input in inputs {
    let input = input.as_ref();
    let Some(in_time) = mtime(input) else {
      debug!(input = %input.display(), "input missing, rebuild");
      return true;
    };
    if in_time >= out_time {
      debug!(input = %input.display(), output = %output.display(), "input not older than output, rebuild");
      return true;
    }
  }

  false
}

fn mtime(path: &Path) -> Option<SystemTime> {
  std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs::{self, File};
  use std::path::PathBuf;
  use std::time::{Duration, SystemTime};
  use tempfile::TempDir;

  fn write_with_mtime(dir: &TempDir, name: &str, mtime: SystemTime) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, name).unwrap();
    File::options()
      .write(true)
      .open(&path)
      .unwrap()
      .set_modified(mtime)
      .unwrap();
    path
  }

  #[test]
  fn missing_output_is_always_stale() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("out");
    let input = write_with_mtime(&temp, "in", SystemTime::now());

    assert!(needs_rebuild(&output, &[&input]));
    assert!(needs_rebuild(&output, &[] as &[&PathBuf]));
  }

  #[test]
  fn missing_input_is_stale() {
    let temp = TempDir::new().unwrap();
    let output = write_with_mtime(&temp, "out", SystemTime::now());
    let input = temp.path().join("never-written");

    assert!(needs_rebuild(&output, &[&input]));
  }

  #[test]
  fn output_strictly_newer_is_fresh() {
    let temp = TempDir::new().unwrap();
    let base = SystemTime::now();
    let input = write_with_mtime(&temp, "in", base);
    let older = write_with_mtime(&temp, "in2", base - Duration::from_secs(60));
    let output = write_with_mtime(&temp, "out", base + Duration::from_secs(5));

    assert!(!needs_rebuild(&output, &[&input, &older]));
  }

  #[test]
  fn equal_timestamps_are_stale() {
    let temp = TempDir::new().unwrap();
    let base = SystemTime::now();
    let input = write_with_mtime(&temp, "in", base);
    let output = write_with_mtime(&temp, "out", base);

    assert!(needs_rebuild(&output, &[&input]));
  }

  #[test]
  fn newer_input_is_stale() {
    let temp = TempDir::new().unwrap();
    let base = SystemTime::now();
    let output = write_with_mtime(&temp, "out", base);
    let input = write_with_mtime(&temp, "in", base + Duration::from_secs(5));

    assert!(needs_rebuild(&output, &[&input]));
  }

  #[test]
  fn zero_inputs_fresh_when_output_exists() {
    let temp = TempDir::new().unwrap();
    let output = write_with_mtime(&temp, "out", SystemTime::now());

    assert!(!needs_rebuild(&output, &[] as &[&PathBuf]));
  }
}
