/*!
# Writers module
Contains the logic for writing the tabular outputs of the pipeline.
*/
/// Generates the combined calling metrics summary
pub mod metrics_summary;
