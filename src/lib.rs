//! A small line-oriented interpreter for Am scripts.
//!
//! Each script line is classified on its own (see [`lexer`]): native lines are
//! parsed into a [`Statement`] and executed against an in-memory variable and
//! function store, lines tagged with another language (`python: ...`,
//! `node: ...`) and `tag.import module;` directives are handed to an
//! [`ExternalBridge`].
//!
//! The main entry point is [`Interpreter`]. [`ProcessBridge`] is the bridge that
//! spawns real toolchains; tests and embedders can supply their own.

pub mod command;
pub mod config;
pub mod env;
mod error;
pub mod external;
mod interpreter;
mod io_adapters;
pub mod lexer;
pub mod parser;

pub use command::{ExitCode, ExternalBridge};
pub use config::{Cli, Config};
pub use env::Environment;
pub use error::ExecError;
pub use external::{ExternalError, Invocation, PackageManager, ProcessBridge, Runtime};
pub use interpreter::Interpreter;
pub use io_adapters::MemWriter;
pub use lexer::{Line, classify};
pub use parser::{ParsingError, Statement, parse_statement};
