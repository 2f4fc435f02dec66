// ABOUTME: Command implementations for the CLI
// ABOUTME: Exports the run and check-config commands

pub mod check_config;
pub mod run;

pub use check_config::CheckConfigArgs;
pub use run::RunArgs;
