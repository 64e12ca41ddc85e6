pub mod toml_loader;

pub use toml_loader::{load_checks, load_checks_file, parse_checks};
