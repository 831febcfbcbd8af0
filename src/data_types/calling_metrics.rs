
use serde::{Deserialize, Serialize};

/// Suffix the metrics collector appends to the output prefix for the per-sample table
pub const DETAIL_METRICS_SUFFIX: &str = ".variant_calling_detail_metrics";

/// The subset of the per-sample variant calling metrics that we track.
/// Column names follow the collector's header, so the table can be parsed by name rather than position.
/// Ratios can be reported as "?" when undefined, which become `None`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CallingMetrics {
    #[serde(rename = "SAMPLE_ALIAS")]
    pub sample_alias: String,
    #[serde(rename = "HET_HOMVAR_RATIO", deserialize_with = "csv::invalid_option")]
    pub het_homvar_ratio: Option<f64>,
    #[serde(rename = "TOTAL_SNPS")]
    pub total_snps: u64,
    #[serde(rename = "NUM_IN_DB_SNP")]
    pub num_in_dbsnp: u64,
    #[serde(rename = "NOVEL_SNPS")]
    pub novel_snps: u64,
    #[serde(rename = "DBSNP_TITV", deserialize_with = "csv::invalid_option")]
    pub dbsnp_titv: Option<f64>,
    #[serde(rename = "NOVEL_TITV", deserialize_with = "csv::invalid_option")]
    pub novel_titv: Option<f64>,
    #[serde(rename = "TOTAL_INDELS")]
    pub total_indels: u64,
    #[serde(rename = "DBSNP_INS_DEL_RATIO", deserialize_with = "csv::invalid_option")]
    pub dbsnp_ins_del_ratio: Option<f64>
}

/// Metrics for one callset, e.g. the raw joint calls or one refined output
#[derive(Clone, Debug, PartialEq)]
pub struct CallsetMetrics {
    /// Label for the callset, usually the VCF file stem
    pub callset: String,
    /// One entry per sample, in file order
    pub samples: Vec<CallingMetrics>
}
