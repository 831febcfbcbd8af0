
/// Command line interface functionality
pub mod cli;
/// Contains various shared data types
pub mod data_types;
/// Tooling for parsing input files into meaningful structs / data
pub mod parsing;
/// Runs the selected stages in order and records what happened
pub mod pipeline;
/// Command construction and execution of external tools
pub mod runner;
/// One module per pipeline stage
pub mod stages;
/// Launchers for GATK and the object-store client
pub mod toolkit;
/// Various utility functions that tend to be very generic
pub mod util;
/// All output writers
pub mod writers;
