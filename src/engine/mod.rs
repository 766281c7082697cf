//! Engine module: CLI surface and path helpers

pub mod arg_parser;
pub mod cli;
pub mod tools;

pub use arg_parser::Cli;
pub use cli::handle_run;
pub use tools::{cache_path, check_root_and_canonicalize, is_in_progress, path_to_db_string};
