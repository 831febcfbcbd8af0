
use anyhow::{Context, anyhow};
use log::debug;
use std::path::Path;

use crate::data_types::calling_metrics::CallingMetrics;

/// Marker for the start of a metrics table in the collector output
const METRICS_CLASS_MARKER: &str = "## METRICS CLASS";

/// Extracts the first metrics table from a metrics file.
/// The table starts on the line after "## METRICS CLASS" and ends at the first blank line.
/// # Arguments
/// * `contents` - the full text of the metrics file
fn extract_metrics_table(contents: &str) -> Option<String> {
    let mut lines = contents.lines()
        .skip_while(|l| !l.starts_with(METRICS_CLASS_MARKER));

    // skip the marker itself
    lines.next()?;

    let table: Vec<&str> = lines
        .take_while(|l| !l.trim().is_empty())
        .collect();
    if table.is_empty() {
        None
    } else {
        Some(table.join("\n"))
    }
}

/// Parses the per-sample metrics table from the text of a detail metrics file.
/// # Arguments
/// * `contents` - the full text of the metrics file
/// # Errors
/// * if there is no metrics table
/// * if a required column is missing or a count cannot be parsed
pub fn parse_detail_metrics(contents: &str) -> anyhow::Result<Vec<CallingMetrics>> {
    let table = extract_metrics_table(contents)
        .ok_or(anyhow!("No metrics table found"))?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(table.as_bytes());

    let mut ret = vec![];
    for result in csv_reader.deserialize() {
        let row: CallingMetrics = result.context("Error while parsing metrics row")?;
        debug!("\tParsed metrics for {:?}", row.sample_alias);
        ret.push(row);
    }
    Ok(ret)
}

/// Loads a detail metrics file from disk
/// # Arguments
/// * `filename` - path to the `.variant_calling_detail_metrics` file
pub fn load_detail_metrics(filename: &Path) -> anyhow::Result<Vec<CallingMetrics>> {
    debug!("Loading metrics from {filename:?}...");
    let contents = std::fs::read_to_string(filename)
        .with_context(|| format!("Error while reading {filename:?}:"))?;
    parse_detail_metrics(&contents)
        .with_context(|| format!("Error while parsing {filename:?}:"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;
    use std::path::PathBuf;

    #[test]
    fn test_load_detail_metrics() {
        let metrics = load_detail_metrics(&PathBuf::from("test_data/metrics/trioGGVCF_metrics.variant_calling_detail_metrics")).unwrap();
        assert_eq!(metrics.len(), 3);

        let names: Vec<&str> = metrics.iter().map(|m| m.sample_alias.as_str()).collect();
        assert_eq!(names, vec!["father", "mother", "son"]);

        let son = &metrics[2];
        assert_eq!(son.total_snps, 233);
        assert_eq!(son.total_indels, 35);
        assert_approx_eq!(son.dbsnp_titv.unwrap(), 2.191781);
        assert_approx_eq!(son.dbsnp_ins_del_ratio.unwrap(), 0.75);
        assert_approx_eq!(son.het_homvar_ratio.unwrap(), 1.588235);

        // "?" ratios become None
        assert_eq!(metrics[0].novel_titv, None);
    }

    #[test]
    fn test_no_table() {
        assert!(parse_detail_metrics("## htsjdk.samtools.metrics.StringHeader\n# nothing\n").is_err());
        assert!(parse_detail_metrics("## METRICS CLASS\tfoo\n\n").is_err());
    }

    #[test]
    fn test_missing_column() {
        let text = "## METRICS CLASS\tpicard.vcf.CollectVariantCallingMetrics$VariantCallingDetailMetrics\nSAMPLE_ALIAS\tTOTAL_SNPS\nson\t5\n";
        assert!(parse_detail_metrics(text).is_err());
    }

    #[test]
    fn test_columns_by_name() {
        // reordered columns plus one the parser does not know about
        let text = "## METRICS CLASS\tpicard.vcf.CollectVariantCallingMetrics$VariantCallingDetailMetrics
TOTAL_INDELS\tEXTRA_COLUMN\tDBSNP_INS_DEL_RATIO\tSAMPLE_ALIAS\tNOVEL_TITV\tDBSNP_TITV\tNOVEL_SNPS\tNUM_IN_DB_SNP\tTOTAL_SNPS\tHET_HOMVAR_RATIO
35\tignored\t0.75\tson\t?\t2.191781\t5\t228\t233\t1.588235

## HISTOGRAM\tjava.lang.Integer
";
        let metrics = parse_detail_metrics(text).unwrap();
        assert_eq!(metrics.len(), 1);
        let son = &metrics[0];
        assert_eq!(son.sample_alias, "son");
        assert_eq!(son.total_indels, 35);
        assert_eq!(son.total_snps, 233);
        assert_eq!(son.num_in_dbsnp, 228);
        assert_eq!(son.novel_snps, 5);
        assert_eq!(son.novel_titv, None);
        assert_approx_eq!(son.dbsnp_titv.unwrap(), 2.191781);
        assert_approx_eq!(son.dbsnp_ins_del_ratio.unwrap(), 0.75);
        assert_approx_eq!(son.het_homvar_ratio.unwrap(), 1.588235);
    }
}
