
/// Per-sample variant calling metrics parsed from the metrics collector
pub mod calling_metrics;
/// The cohort configuration: samples, resources, staging, and refinement profiles
pub mod cohort;
/// Record-level summary of a GVCF
pub mod gvcf_summary;
/// Genomic intervals in "contig:start-end" form
pub mod interval;
/// Local or remote storage locations
pub mod location;
/// PED pedigree parsing and trio derivation
pub mod pedigree;
/// Pipeline stages and their per-run reports
pub mod stage;
/// Deterministic workspace layout
pub mod workspace;
