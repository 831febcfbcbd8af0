
use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::data_types::calling_metrics::CallsetMetrics;

/// Contains all the data written to each row of the metrics summary
#[derive(Debug, PartialEq, Serialize)]
pub struct MetricsSummaryRow {
    /// The callset label
    callset: String,
    /// The sample in that callset
    sample: String,
    /// Heterozygous to homozygous-variant ratio
    het_homvar_ratio: Option<f64>,
    /// Number of SNPs
    total_snps: u64,
    /// Transition/transversion ratio of SNPs in dbSNP
    dbsnp_titv: Option<f64>,
    /// Number of indels
    total_indels: u64,
    /// Insertion/deletion ratio of indels in dbSNP
    dbsnp_ins_del_ratio: Option<f64>
}

impl MetricsSummaryRow {
    /// Renders the row for a log line
    pub fn log_line(&self) -> String {
        let fmt_ratio = |v: Option<f64>| v.map(|r| format!("{r:.3}")).unwrap_or("?".to_string());
        format!(
            "{}\t{}\tsnps={}\ttitv={}\tindels={}\tins_del={}\thet_homvar={}",
            self.callset, self.sample, self.total_snps, fmt_ratio(self.dbsnp_titv),
            self.total_indels, fmt_ratio(self.dbsnp_ins_del_ratio), fmt_ratio(self.het_homvar_ratio)
        )
    }
}

/// Accumulates metrics across callsets and writes them as one table
#[derive(Default)]
pub struct MetricsSummaryWriter {
    /// One row per (callset, sample), in insertion order
    rows: Vec<MetricsSummaryRow>
}

impl MetricsSummaryWriter {
    /// Adds every sample from a callset
    /// # Arguments
    /// * `metrics` - the parsed metrics for one callset
    pub fn add_callset(&mut self, metrics: &CallsetMetrics) {
        for sample in metrics.samples.iter() {
            self.rows.push(MetricsSummaryRow {
                callset: metrics.callset.clone(),
                sample: sample.sample_alias.clone(),
                het_homvar_ratio: sample.het_homvar_ratio,
                total_snps: sample.total_snps,
                dbsnp_titv: sample.dbsnp_titv,
                total_indels: sample.total_indels,
                dbsnp_ins_del_ratio: sample.dbsnp_ins_del_ratio
            });
        }
    }

    /// Will write the summary out to the given file path
    /// # Arguments
    /// * `filename` - the filename for the output (tsv/csv)
    pub fn write_summary(&self, filename: &Path) -> csv::Result<()> {
        // modify the delimiter to "," if it ends with .csv
        let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
        let delimiter: u8 = if is_csv { b',' } else { b'\t' };
        let mut csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(filename)?;

        for row in self.rows.iter() {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    // getters
    pub fn rows(&self) -> &[MetricsSummaryRow] {
        &self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::picard_metrics::load_detail_metrics;

    fn joint_metrics() -> CallsetMetrics {
        CallsetMetrics {
            callset: "trioGGVCF".to_string(),
            samples: load_detail_metrics(Path::new("test_data/metrics/trioGGVCF_metrics.variant_calling_detail_metrics")).unwrap()
        }
    }

    #[test]
    fn test_write_summary() {
        let mut writer = MetricsSummaryWriter::default();
        writer.add_callset(&joint_metrics());
        assert_eq!(writer.rows().len(), 3);

        let temp = tempfile::tempdir().unwrap();
        let out_fn = temp.path().join("summary.tsv");
        writer.write_summary(&out_fn).unwrap();

        let contents = std::fs::read_to_string(&out_fn).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "callset\tsample\thet_homvar_ratio\ttotal_snps\tdbsnp_titv\ttotal_indels\tdbsnp_ins_del_ratio");
        assert_eq!(lines[3], "trioGGVCF\tson\t1.588235\t233\t2.191781\t35\t0.75");
    }

    #[test]
    fn test_csv_and_log_line() {
        let mut writer = MetricsSummaryWriter::default();
        writer.add_callset(&joint_metrics());

        let temp = tempfile::tempdir().unwrap();
        let out_fn = temp.path().join("summary.csv");
        writer.write_summary(&out_fn).unwrap();
        let contents = std::fs::read_to_string(&out_fn).unwrap();
        assert!(contents.starts_with("callset,sample,"));

        assert_eq!(
            writer.rows()[2].log_line(),
            "trioGGVCF\tson\tsnps=233\ttitv=2.192\tindels=35\tins_del=0.750\thet_homvar=1.588"
        );
    }
}
