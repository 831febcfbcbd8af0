
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum IntervalError {
    #[error("interval is empty")]
    Empty,
    #[error("interval is missing a contig name: {0:?}")]
    MissingContig(String),
    #[error("could not parse coordinate {value:?} in interval {interval:?}")]
    BadCoordinate { interval: String, value: String },
    #[error("interval {0:?} must have a start and end separated by '-'")]
    MissingEnd(String),
    #[error("interval start must be >= 1 (coordinates are 1-based): {0:?}")]
    ZeroStart(String),
    #[error("interval start must be <= end: {0:?}")]
    Inverted(String)
}

/// A genomic interval in the 1-based, inclusive form the GATK tools accept.
/// A missing range means the whole contig.
#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GenomicInterval {
    /// Contig name, e.g. "20" or "chr20"
    contig: String,
    /// Inclusive 1-based range, if the interval is not a full contig
    range: Option<(u64, u64)>
}

impl GenomicInterval {
    /// Creates a bounded interval.
    /// # Arguments
    /// * `contig` - the contig name
    /// * `start` - the first included position, 1-based
    /// * `end` - the last included position, 1-based
    /// # Errors
    /// * if `start` is 0 or greater than `end`
    pub fn new(contig: &str, start: u64, end: u64) -> Result<Self, IntervalError> {
        let label = format!("{contig}:{start}-{end}");
        if contig.is_empty() {
            return Err(IntervalError::MissingContig(label));
        }
        if start == 0 {
            return Err(IntervalError::ZeroStart(label));
        }
        if start > end {
            return Err(IntervalError::Inverted(label));
        }
        Ok(Self {
            contig: contig.to_string(),
            range: Some((start, end))
        })
    }

    /// Creates an interval that spans an entire contig.
    pub fn whole_contig(contig: &str) -> Result<Self, IntervalError> {
        if contig.is_empty() {
            return Err(IntervalError::Empty);
        }
        Ok(Self {
            contig: contig.to_string(),
            range: None
        })
    }

    /// Returns the number of bases covered, or None if this is a full contig
    pub fn len(&self) -> Option<u64> {
        self.range.map(|(s, e)| e - s + 1)
    }

    // getters
    pub fn contig(&self) -> &str {
        &self.contig
    }

    pub fn start(&self) -> Option<u64> {
        self.range.map(|(s, _e)| s)
    }

    pub fn end(&self) -> Option<u64> {
        self.range.map(|(_s, e)| e)
    }
}

/// Parses a single coordinate, allowing thousands separators like "10,000,000"
fn parse_coordinate(interval: &str, value: &str) -> Result<u64, IntervalError> {
    let cleaned: String = value.chars().filter(|&c| c != ',').collect();
    cleaned.parse::<u64>().map_err(|_e| IntervalError::BadCoordinate {
        interval: interval.to_string(),
        value: value.to_string()
    })
}

impl FromStr for GenomicInterval {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IntervalError::Empty);
        }

        // the range is always the final ':' component
        match s.rsplit_once(':') {
            Some((contig, range)) => {
                if contig.is_empty() {
                    return Err(IntervalError::MissingContig(s.to_string()));
                }
                let (raw_start, raw_end) = range.split_once('-')
                    .ok_or_else(|| IntervalError::MissingEnd(s.to_string()))?;
                let start = parse_coordinate(s, raw_start)?;
                let end = parse_coordinate(s, raw_end)?;
                Self::new(contig, start, end)
            },
            None => Self::whole_contig(s)
        }
    }
}

impl TryFrom<String> for GenomicInterval {
    type Error = IntervalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GenomicInterval> for String {
    fn from(value: GenomicInterval) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for GenomicInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.range {
            Some((start, end)) => write!(f, "{}:{start}-{end}", self.contig),
            None => write!(f, "{}", self.contig)
        }
    }
}
