
use anyhow::{Context, anyhow};
use log::{debug, trace};
use noodles::vcf;
use noodles::vcf::variant::record::info::field::key as info_key;
use noodles::vcf::variant::record_buf::info::field::Value as InfoValue;
use noodles_util::variant::io::reader::Builder as VariantReaderBuilder;
use std::path::Path;

use crate::data_types::gvcf_summary::{GvcfRecordKind, GvcfSummary};

/// Opens a VCF/BCF (plain or compressed) and reads the header.
/// # Arguments
/// * `vcf_fn` - the variant file to open
fn read_vcf_header(vcf_fn: &Path) -> anyhow::Result<vcf::Header> {
    let mut vcf_reader = VariantReaderBuilder::default()
        .build_from_path(vcf_fn)
        .with_context(|| format!("Error while opening {vcf_fn:?}:"))?;

    let vcf_header = vcf_reader.read_header()
        .with_context(|| format!("Error while reading header of {vcf_fn:?}:"))?;
    Ok(vcf_header)
}

/// This will open a VCF file and retrieve all sample names in header order
/// # Arguments
/// * `vcf_fn` - the VCF filename to open
pub fn get_vcf_sample_names(vcf_fn: &Path) -> anyhow::Result<Vec<String>> {
    let vcf_header = read_vcf_header(vcf_fn)?;
    Ok(vcf_header.sample_names().iter().cloned().collect())
}

/// Scans an entire GVCF and classifies every record into reference blocks and variant sites.
/// # Arguments
/// * `gvcf_fn` - the GVCF to scan, plain or compressed
/// # Errors
/// * if the file cannot be opened or a record cannot be parsed
pub fn scan_gvcf(gvcf_fn: &Path) -> anyhow::Result<GvcfSummary> {
    let mut vcf_reader = VariantReaderBuilder::default()
        .build_from_path(gvcf_fn)
        .with_context(|| format!("Error while opening {gvcf_fn:?}:"))?;
    let vcf_header = vcf_reader.read_header()
        .with_context(|| format!("Error while reading header of {gvcf_fn:?}:"))?;

    let mut summary = GvcfSummary {
        samples: vcf_header.sample_names().iter().cloned().collect(),
        ..Default::default()
    };

    debug!("Scanning records in {gvcf_fn:?}...");
    for result in vcf_reader.records(&vcf_header) {
        let record: Box<dyn vcf::variant::Record> = result
            .with_context(|| format!("Error while reading record from {gvcf_fn:?}:"))?;
        let record_buf = vcf::variant::RecordBuf::try_from_variant_record(&vcf_header, record.as_ref())?;

        let contig = record_buf.reference_sequence_name();
        let start = record_buf.variant_start()
            .ok_or(anyhow!("Missing POS in record: {record_buf:?}"))?
            .get() as u64;
        let end = match record_buf.info().get(info_key::END_POSITION) {
            Some(Some(InfoValue::Integer(e))) => u64::try_from(*e).ok(),
            _ => None
        };

        let kind = GvcfRecordKind::classify(record_buf.alternate_bases().as_ref(), start, end);
        trace!("{contig}\t{start}\t{end:?}\t{kind:?}");
        summary.add_record(contig, kind);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_sample_names() {
        let gvcf_fn = PathBuf::from("test_data/gvcf/mother.g.vcf");
        assert_eq!(get_vcf_sample_names(&gvcf_fn).unwrap(), vec!["mother".to_string()]);
        assert!(get_vcf_sample_names(&PathBuf::from("test_data/gvcf/missing.g.vcf")).is_err());
    }

    #[test]
    fn test_scan_gvcf() {
        let summary = scan_gvcf(&PathBuf::from("test_data/gvcf/mother.g.vcf")).unwrap();
        assert_eq!(summary.samples, vec!["mother".to_string()]);
        assert!(summary.is_valid_gvcf());

        let contig = summary.contigs.get("20").unwrap();
        assert_eq!(contig.reference_blocks, 4);
        assert_eq!(contig.reference_bases, 50 + 16 + 1 + 83);
        assert_eq!(contig.variant_sites, 2);
    }

    #[test]
    fn test_scan_plain_vcf() {
        // a plain VCF is readable, but flagged as an invalid GVCF
        let summary = scan_gvcf(&PathBuf::from("test_data/gvcf/motherHC.vcf")).unwrap();
        assert!(!summary.is_valid_gvcf());
        assert_eq!(summary.total().missing_non_ref, 2);
    }

    #[test]
    fn test_scan_negative_end() {
        // a malformed END is treated as absent, so the block covers only its own base
        let header: String = std::fs::read_to_string("test_data/gvcf/mother.g.vcf").unwrap()
            .lines()
            .take_while(|l| l.starts_with('#'))
            .map(|l| format!("{l}\n"))
            .collect();
        let contents = format!("{header}20\t10000000\t.\tT\t<NON_REF>\t.\t.\tEND=-5\tGT:DP:GQ:MIN_DP:PL\t0/0:28:60:24:0,60,900\n");

        let temp = tempfile::tempdir().unwrap();
        let gvcf_fn = temp.path().join("negative_end.g.vcf");
        std::fs::write(&gvcf_fn, contents).unwrap();

        let summary = scan_gvcf(&gvcf_fn).unwrap();
        let contig = summary.contigs.get("20").unwrap();
        assert_eq!(contig.reference_blocks, 1);
        assert_eq!(contig.reference_bases, 1);
    }
}
