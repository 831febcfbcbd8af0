/*!
# CLI module
Command line interface functionality that is specific to jointcall.
*/

/// The main CLI module that contains the top-level CLI parser and help text
pub mod core;
/// The inspect CLI subcommand
pub mod inspect;
/// The metrics CLI subcommand
pub mod metrics;
/// The run CLI subcommand
pub mod run;
