/*!
# Parsing module
Contains the logic for parsing input files into meaningful structs / data.
*/
/// Helper functions for noodles
pub mod noodles_helper;
/// Parser for the text tables written by the metrics collector
pub mod picard_metrics;
