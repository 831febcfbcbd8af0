
use serde::Serialize;
use std::collections::BTreeMap;

/// The symbolic allele that marks a record as carrying reference confidence
pub const NON_REF_ALLELE: &str = "<NON_REF>";

/// How a single GVCF record is classified
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GvcfRecordKind {
    /// Only `<NON_REF>` as an ALT; covers `span` reference-like bases
    ReferenceBlock { span: u64 },
    /// At least one real ALT allele in addition to `<NON_REF>`
    VariantSite,
    /// No `<NON_REF>` allele, which is not valid in a GVCF
    MissingNonRef
}

impl GvcfRecordKind {
    /// Classifies a record from its ALT alleles and block coordinates.
    /// # Arguments
    /// * `alternate_alleles` - the ALT column values
    /// * `start` - POS, 1-based
    /// * `end` - the INFO/END value, if present
    pub fn classify<S: AsRef<str>>(alternate_alleles: &[S], start: u64, end: Option<u64>) -> Self {
        let has_non_ref = alternate_alleles.iter().any(|a| a.as_ref() == NON_REF_ALLELE);
        if !has_non_ref {
            GvcfRecordKind::MissingNonRef
        } else if alternate_alleles.len() == 1 {
            // a block without END covers exactly one base
            let span = end.map(|e| e.saturating_sub(start) + 1).unwrap_or(1);
            GvcfRecordKind::ReferenceBlock { span }
        } else {
            GvcfRecordKind::VariantSite
        }
    }
}

/// Per-contig accumulation of GVCF content
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ContigSummary {
    /// Number of reference-confidence blocks
    pub reference_blocks: u64,
    /// Number of bases covered by reference-confidence blocks
    pub reference_bases: u64,
    /// Number of records with a real ALT allele
    pub variant_sites: u64,
    /// Number of records without `<NON_REF>`
    pub missing_non_ref: u64
}

impl std::ops::AddAssign for ContigSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.reference_blocks += rhs.reference_blocks;
        self.reference_bases += rhs.reference_bases;
        self.variant_sites += rhs.variant_sites;
        self.missing_non_ref += rhs.missing_non_ref;
    }
}

/// Summary of a single GVCF, used to inspect per-sample caller output
#[derive(Clone, Debug, Default, Serialize)]
pub struct GvcfSummary {
    /// Sample names from the header
    pub samples: Vec<String>,
    /// Counts per contig, in sorted order
    pub contigs: BTreeMap<String, ContigSummary>
}

impl GvcfSummary {
    /// Adds one classified record
    /// # Arguments
    /// * `contig` - the contig the record is on
    /// * `kind` - the record classification
    pub fn add_record(&mut self, contig: &str, kind: GvcfRecordKind) {
        let entry = self.contigs.entry(contig.to_string()).or_default();
        match kind {
            GvcfRecordKind::ReferenceBlock { span } => {
                entry.reference_blocks += 1;
                entry.reference_bases += span;
            },
            GvcfRecordKind::VariantSite => entry.variant_sites += 1,
            GvcfRecordKind::MissingNonRef => entry.missing_non_ref += 1
        };
    }

    /// Totals across all contigs
    pub fn total(&self) -> ContigSummary {
        let mut ret = ContigSummary::default();
        for summary in self.contigs.values() {
            ret += *summary;
        }
        ret
    }

    /// A GVCF is valid only if every record carries `<NON_REF>`
    pub fn is_valid_gvcf(&self) -> bool {
        self.total().missing_non_ref == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            GvcfRecordKind::classify(&["<NON_REF>"], 100, Some(149)),
            GvcfRecordKind::ReferenceBlock { span: 50 }
        );
        assert_eq!(
            GvcfRecordKind::classify(&["<NON_REF>"], 100, None),
            GvcfRecordKind::ReferenceBlock { span: 1 }
        );
        assert_eq!(
            GvcfRecordKind::classify(&["T", "<NON_REF>"], 100, None),
            GvcfRecordKind::VariantSite
        );
        assert_eq!(
            GvcfRecordKind::classify(&["T"], 100, None),
            GvcfRecordKind::MissingNonRef
        );
    }

    #[test]
    fn test_accumulate() {
        let mut summary = GvcfSummary::default();
        summary.add_record("20", GvcfRecordKind::ReferenceBlock { span: 10 });
        summary.add_record("20", GvcfRecordKind::ReferenceBlock { span: 5 });
        summary.add_record("20", GvcfRecordKind::VariantSite);
        summary.add_record("21", GvcfRecordKind::ReferenceBlock { span: 1 });
        assert!(summary.is_valid_gvcf());

        assert_eq!(summary.contigs["20"], ContigSummary {
            reference_blocks: 2, reference_bases: 15, variant_sites: 1, missing_non_ref: 0
        });
        assert_eq!(summary.total().reference_bases, 16);

        summary.add_record("21", GvcfRecordKind::MissingNonRef);
        assert!(!summary.is_valid_gvcf());
    }
}
