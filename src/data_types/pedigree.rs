
use anyhow::Context;
use indexmap::IndexMap;
use log::debug;
use serde::Serialize;
use std::path::Path;
use strum_macros::EnumString;

/// Placeholder for an unknown parent in the PED format
pub const UNKNOWN_PARENT: &str = "0";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PedigreeError {
    #[error("line {line}: expected 6 columns, found {found}")]
    ColumnCount { line: usize, found: usize },
    #[error("line {line}: duplicate individual {individual:?}")]
    DuplicateIndividual { line: usize, individual: String },
    #[error("line {line}: unrecognized sex code {code:?}")]
    BadSex { line: usize, code: String },
    #[error("individual {individual:?} is listed as their own parent")]
    SelfParent { individual: String },
    #[error("individual {individual:?} references parent {parent:?} that is not in the pedigree")]
    MissingParent { individual: String, parent: String },
    #[error("{parent:?} is the {role} of {individual:?} but is recorded as {sex:?}")]
    ParentSex { individual: String, parent: String, role: &'static str, sex: Sex },
    #[error("pedigree does not contain any individuals")]
    Empty
}

/// Sex codes from the PED format
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, EnumString, strum_macros::Display)]
pub enum Sex {
    #[strum(serialize = "1")]
    Male,
    #[strum(serialize = "2")]
    Female,
    #[strum(serialize = "0", serialize = "other")]
    Unknown
}

/// A single PED record
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Individual {
    /// Family identifier
    family_id: String,
    /// Individual identifier, expected to match a VCF sample name
    individual_id: String,
    /// Father identifier, if known
    father_id: Option<String>,
    /// Mother identifier, if known
    mother_id: Option<String>,
    /// Recorded sex
    sex: Sex
}

impl Individual {
    // getters
    pub fn family_id(&self) -> &str {
        &self.family_id
    }

    pub fn individual_id(&self) -> &str {
        &self.individual_id
    }

    pub fn father_id(&self) -> Option<&str> {
        self.father_id.as_deref()
    }

    pub fn mother_id(&self) -> Option<&str> {
        self.mother_id.as_deref()
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }
}

/// A child with both parents present, the unit that pedigree priors act on
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Trio {
    pub family_id: String,
    pub child: String,
    pub father: String,
    pub mother: String
}

/// A parsed and validated pedigree, in file order
#[derive(Clone, Debug, Default, Serialize)]
pub struct Pedigree {
    individuals: IndexMap<String, Individual>
}

impl Pedigree {
    /// Loads and validates a PED file from disk.
    /// # Arguments
    /// * `filename` - the PED file to parse
    /// # Errors
    /// * if the file cannot be read
    /// * if any record fails validation, see `Pedigree::from_ped_str`
    pub fn from_ped_file(filename: &Path) -> anyhow::Result<Self> {
        debug!("Loading pedigree from {filename:?}...");
        let contents = std::fs::read_to_string(filename)
            .with_context(|| format!("Error while reading {filename:?}:"))?;
        let pedigree = Self::from_ped_str(&contents)
            .with_context(|| format!("Error while parsing pedigree {filename:?}:"))?;
        Ok(pedigree)
    }

    /// Parses PED content. Columns may be separated by any whitespace; blank lines and '#' comments are skipped.
    /// # Arguments
    /// * `contents` - the full text of a PED file
    /// # Errors
    /// * if a record does not have exactly six columns
    /// * if an individual is duplicated, is their own parent, or references a missing parent
    /// * if a parent's recorded sex contradicts their role
    pub fn from_ped_str(contents: &str) -> Result<Self, PedigreeError> {
        let mut individuals: IndexMap<String, Individual> = Default::default();
        for (line_index, line) in contents.lines().enumerate() {
            let line_number = line_index + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let columns: Vec<&str> = trimmed.split_whitespace().collect();
            if columns.len() != 6 {
                return Err(PedigreeError::ColumnCount { line: line_number, found: columns.len() });
            }

            let parent = |value: &str| -> Option<String> {
                if value == UNKNOWN_PARENT {
                    None
                } else {
                    Some(value.to_string())
                }
            };
            let sex: Sex = columns[4].parse()
                .map_err(|_e| PedigreeError::BadSex { line: line_number, code: columns[4].to_string() })?;

            let individual = Individual {
                family_id: columns[0].to_string(),
                individual_id: columns[1].to_string(),
                father_id: parent(columns[2]),
                mother_id: parent(columns[3]),
                sex
            };

            if individuals.contains_key(individual.individual_id()) {
                return Err(PedigreeError::DuplicateIndividual { line: line_number, individual: individual.individual_id });
            }
            individuals.insert(individual.individual_id.clone(), individual);
        }

        if individuals.is_empty() {
            return Err(PedigreeError::Empty);
        }

        let pedigree = Self { individuals };
        pedigree.validate_parents()?;
        Ok(pedigree)
    }

    /// Checks that every referenced parent exists and has a sex consistent with its role
    fn validate_parents(&self) -> Result<(), PedigreeError> {
        for individual in self.individuals.values() {
            let roles = [
                ("father", individual.father_id(), Sex::Female),
                ("mother", individual.mother_id(), Sex::Male)
            ];
            for (role, opt_parent, forbidden_sex) in roles.into_iter() {
                let Some(parent_id) = opt_parent else {
                    continue;
                };
                if parent_id == individual.individual_id() {
                    return Err(PedigreeError::SelfParent { individual: individual.individual_id.clone() });
                }
                let parent = self.individuals.get(parent_id)
                    .ok_or_else(|| PedigreeError::MissingParent {
                        individual: individual.individual_id.clone(),
                        parent: parent_id.to_string()
                    })?;
                if parent.sex == forbidden_sex {
                    return Err(PedigreeError::ParentSex {
                        individual: individual.individual_id.clone(),
                        parent: parent_id.to_string(),
                        role,
                        sex: parent.sex
                    });
                }
            }
        }
        Ok(())
    }

    /// Returns every child that has both parents recorded, in file order
    pub fn trios(&self) -> Vec<Trio> {
        self.individuals.values()
            .filter_map(|i| {
                match (i.father_id(), i.mother_id()) {
                    (Some(father), Some(mother)) => Some(Trio {
                        family_id: i.family_id.clone(),
                        child: i.individual_id.clone(),
                        father: father.to_string(),
                        mother: mother.to_string()
                    }),
                    _ => None
                }
            })
            .collect()
    }

    /// Returns the sample names that are absent from this pedigree
    /// # Arguments
    /// * `samples` - sample names from the cohort
    pub fn missing_samples<'a, S: AsRef<str>>(&self, samples: &'a [S]) -> Vec<&'a str> {
        samples.iter()
            .map(|s| s.as_ref())
            .filter(|s| !self.individuals.contains_key(*s))
            .collect()
    }

    // getters
    pub fn get(&self, individual_id: &str) -> Option<&Individual> {
        self.individuals.get(individual_id)
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn individuals(&self) -> impl Iterator<Item = &Individual> {
        self.individuals.values()
    }
}
