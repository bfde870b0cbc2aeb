//! Isolated environment: what to build (`spec`) and the commands that build it (`builder`).
//!
//! Environments are never cached; each invocation builds its own inside its
//! workspace and loses it when the workspace is released.

pub mod builder;
pub mod spec;
