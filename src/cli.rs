//! CLI domain: argument parsing and run dispatch only.

mod parse;
mod route;

pub use parse::Cli;
pub use route::RunContext;
