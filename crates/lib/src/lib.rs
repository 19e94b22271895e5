//! smelt-lib: core components of the smelt build orchestrator
//!
//! This crate provides the pieces a recipe binary composes into a build:
//! - `stale`: mtime-based rebuild decisions
//! - `synth`: rendering abstract build flags into concrete compiler commands
//! - `toolchain`: the runtime-selected compiler profile (gcc/clang/msvc)
//! - `runner`: synchronous process spawning with checked exit status
//! - `orchestrator`: the capability bundle recipes drive (`build`, `fetch_git`)
//! - `bootstrap`: self-rebuild and process hand-off for the orchestrator binary
//! - `fsx`: thin filesystem wrappers with the exact semantics the above rely on

pub mod bootstrap;
pub mod fsx;
pub mod orchestrator;
pub mod runner;
pub mod stale;
pub mod synth;
pub mod toolchain;
pub mod types;

pub use orchestrator::{BuildError, FetchError, Orchestrator};
pub use runner::{CommandRunner, RunError, SystemRunner};
pub use toolchain::{Toolchain, ToolchainError};
pub use types::{BuildOutcome, BuildTarget, Flag, WarnLevel};
