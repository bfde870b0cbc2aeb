//! Execute a Python function inside a disposable virtualenv.
//!
//! The function travels as source text, arguments and the result travel as
//! pickles through files in a per-invocation workspace.

pub mod args;
pub mod callable;
pub mod codec;
pub mod common;
pub mod env;
pub mod error;
pub mod executor;
pub mod log;
pub mod runner;
pub mod script;
pub mod workspace;

pub use args::InvocationArgs;
pub use callable::CallableSpec;
pub use codec::ExecutionResult;
pub use env::spec::EnvironmentSpec;
pub use error::{ConfigError, VenvError};
pub use executor::VirtualenvExecutor;
pub use runner::{CommandRunner, SubprocessRunner};
