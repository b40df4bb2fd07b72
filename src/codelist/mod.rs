//! Clinical codelists
//!
//! A [`Codelist`] is an immutable, named set of clinical codes drawn from one or more
//! coding systems, optionally annotated with a category per code. Codelists are built
//! once when a study is defined and shared read-only by every patient evaluation.

pub mod catalog;
pub mod loader;
pub mod registry;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CohortError;

pub use catalog::{CodelistSpec, STUDY_CODELISTS};
pub use loader::load_codelist;
pub use registry::CodelistRegistry;

/// Coding systems that clinical codes are drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodingSystem {
    /// SNOMED CT concept identifiers (primary care)
    Snomed,
    /// ICD-10 diagnosis codes (hospital episodes, death certificates)
    Icd10,
    /// OPCS-4 procedure codes (hospital episodes)
    Opcs4,
    /// Dictionary of medicines and devices
    Dmd,
}

impl CodingSystem {
    /// Hospital classifications are recorded at varying depth, so a listed code also
    /// matches any recorded code that extends it.
    #[must_use]
    pub const fn matches_by_prefix(self) -> bool {
        matches!(self, Self::Icd10 | Self::Opcs4)
    }

    /// Canonical form of a raw code in this system
    #[must_use]
    pub fn normalize(self, raw: &str) -> String {
        let trimmed = raw.trim();
        if self.matches_by_prefix() {
            trimmed
                .chars()
                .filter(|c| *c != '.')
                .map(|c| c.to_ascii_uppercase())
                .collect()
        } else {
            trimmed.to_string()
        }
    }

    /// Short lowercase name used in configuration files
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Snomed => "snomed",
            Self::Icd10 => "icd10",
            Self::Opcs4 => "opcs4",
            Self::Dmd => "dmd",
        }
    }
}

impl fmt::Display for CodingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodingSystem {
    type Err = CohortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snomed" | "snomedct" | "ctv3" => Ok(Self::Snomed),
            "icd10" | "icd-10" => Ok(Self::Icd10),
            "opcs4" | "opcs-4" => Ok(Self::Opcs4),
            "dmd" | "dm+d" => Ok(Self::Dmd),
            other => Err(CohortError::Config(format!("Unknown coding system '{other}'"))),
        }
    }
}

/// A single code within a coding system
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClinicalCode {
    pub system: CodingSystem,
    pub code: String,
}

impl ClinicalCode {
    /// Create a code, normalizing it for its system
    pub fn new(system: CodingSystem, code: impl AsRef<str>) -> Self {
        Self {
            system,
            code: system.normalize(code.as_ref()),
        }
    }
}

impl fmt::Display for ClinicalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.system, self.code)
    }
}

/// Immutable named set of clinical codes with optional categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codelist {
    name: String,
    entries: BTreeMap<ClinicalCode, Option<String>>,
}

impl Codelist {
    /// Create an uncategorised codelist from literal codes
    pub fn new<I, S>(name: impl Into<String>, system: CodingSystem, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries = BTreeMap::new();
        for code in codes {
            let code = ClinicalCode::new(system, code);
            if !code.code.is_empty() {
                entries.entry(code).or_insert(None);
            }
        }
        Self {
            name: name.into(),
            entries,
        }
    }

    /// Create a categorised codelist from `(code, category)` pairs.
    /// The first category seen for a code is kept.
    pub fn with_categories<I, S, C>(name: impl Into<String>, system: CodingSystem, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, C)>,
        S: AsRef<str>,
        C: Into<String>,
    {
        let mut entries = BTreeMap::new();
        for (code, category) in pairs {
            let code = ClinicalCode::new(system, code);
            if code.code.is_empty() {
                continue;
            }
            let category = Some(category.into()).filter(|c: &String| !c.is_empty());
            entries.entry(code).or_insert(category);
        }
        Self {
            name: name.into(),
            entries,
        }
    }

    pub(crate) fn from_entries(
        name: impl Into<String>,
        entries: BTreeMap<ClinicalCode, Option<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Codes in deterministic (system, code) order
    pub fn codes(&self) -> impl Iterator<Item = &ClinicalCode> {
        self.entries.keys()
    }

    /// Codes with their categories in deterministic order
    pub fn entries(&self) -> impl Iterator<Item = (&ClinicalCode, Option<&str>)> {
        self.entries.iter().map(|(code, cat)| (code, cat.as_deref()))
    }

    /// Coding systems present in this list
    #[must_use]
    pub fn systems(&self) -> BTreeSet<CodingSystem> {
        self.entries.keys().map(|c| c.system).collect()
    }

    /// Whether the exact code is listed
    #[must_use]
    pub fn contains(&self, code: &ClinicalCode) -> bool {
        self.entries.contains_key(code)
    }

    /// Category of an exactly listed code
    #[must_use]
    pub fn category(&self, code: &ClinicalCode) -> Option<&str> {
        self.entries.get(code).and_then(|c| c.as_deref())
    }

    /// Look up a recorded code.
    ///
    /// Returns `None` when the code does not match the list, otherwise the matched
    /// entry's category (itself optional). ICD-10 and OPCS-4 codes fall back to their
    /// longest listed prefix.
    #[must_use]
    pub fn lookup(&self, system: CodingSystem, raw_code: &str) -> Option<Option<&str>> {
        let code = ClinicalCode::new(system, raw_code);
        if let Some(category) = self.entries.get(&code) {
            return Some(category.as_deref());
        }
        if !system.matches_by_prefix() {
            return None;
        }
        (1..code.code.len()).rev().find_map(|len| {
            let prefix = ClinicalCode {
                system,
                code: code.code.get(..len)?.to_string(),
            };
            self.entries.get(&prefix).map(|c| c.as_deref())
        })
    }

    /// Whether a recorded code matches this list
    #[must_use]
    pub fn matches(&self, system: CodingSystem, raw_code: &str) -> bool {
        self.lookup(system, raw_code).is_some()
    }

    /// Union of several codelists.
    ///
    /// A code's category comes from the earliest list that categorises it.
    #[must_use]
    pub fn combine(name: impl Into<String>, lists: &[&Self]) -> Self {
        let mut entries: BTreeMap<ClinicalCode, Option<String>> = BTreeMap::new();
        for list in lists {
            for (code, category) in &list.entries {
                let slot = entries.entry(code.clone()).or_insert(None);
                if slot.is_none() {
                    slot.clone_from(category);
                }
            }
        }
        Self::from_entries(name, entries)
    }

    /// Subset of codes whose category is one of `include`
    #[must_use]
    pub fn filter_by_category(&self, name: impl Into<String>, include: &[&str]) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(_, category)| {
                category
                    .as_deref()
                    .is_some_and(|c| include.contains(&c))
            })
            .map(|(code, category)| (code.clone(), category.clone()))
            .collect();
        Self::from_entries(name, entries)
    }
}

impl fmt::Display for Codelist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} codes)", self.name, self.entries.len())
    }
}
