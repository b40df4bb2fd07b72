//! Demographic records: sex, practice registrations, addresses and deaths

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Recorded sex of a patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "F", alias = "female")]
    Female,
    #[serde(rename = "M", alias = "male")]
    Male,
    #[serde(rename = "I", alias = "intersex")]
    Intersex,
    #[serde(rename = "U", alias = "unknown")]
    Unknown,
}

impl Sex {
    /// Single-letter category as it appears in the output dataset
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Female => "F",
            Self::Male => "M",
            Self::Intersex => "I",
            Self::Unknown => "U",
        }
    }
}

impl From<&str> for Sex {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "f" | "female" | "2" => Self::Female,
            "m" | "male" | "1" => Self::Male,
            "i" | "intersex" => Self::Intersex,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A period of registration with a general practice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub start_date: NaiveDate,
    /// Last day of registration; open registrations have none
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Sustainability and transformation partnership of the practice
    #[serde(default)]
    pub stp_code: Option<String>,
    /// NUTS1 region name of the practice
    #[serde(default)]
    pub region: Option<String>,
}

impl Registration {
    #[must_use]
    pub fn new(start_date: NaiveDate, end_date: Option<NaiveDate>) -> Self {
        Self {
            start_date,
            end_date,
            stp_code: None,
            region: None,
        }
    }

    #[must_use]
    pub fn with_stp(mut self, stp_code: impl Into<String>) -> Self {
        self.stp_code = Some(stp_code.into());
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Whether the registration is in force on `date` (both ends inclusive)
    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && self.end_date.is_none_or(|end| date <= end)
    }
}

/// A period of residence at an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Index of multiple deprivation rank of the area (1 is most deprived)
    #[serde(default)]
    pub imd_rank: Option<u32>,
    /// Rural/urban classification of the area (1-8)
    #[serde(default)]
    pub rural_urban: Option<u8>,
}

impl Address {
    #[must_use]
    pub fn new(start_date: NaiveDate, end_date: Option<NaiveDate>) -> Self {
        Self {
            start_date,
            end_date,
            imd_rank: None,
            rural_urban: None,
        }
    }

    #[must_use]
    pub fn with_imd_rank(mut self, rank: u32) -> Self {
        self.imd_rank = Some(rank);
        self
    }

    #[must_use]
    pub fn with_rural_urban(mut self, class: u8) -> Self {
        self.rural_urban = Some(class);
        self
    }

    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && self.end_date.is_none_or(|end| date <= end)
    }
}

/// A registered death
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathRecord {
    pub date: NaiveDate,
    /// ICD-10 codes on the death certificate, underlying cause first
    #[serde(default)]
    pub causes: Vec<String>,
}

impl DeathRecord {
    pub fn new<I, S>(date: NaiveDate, causes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            date,
            causes: causes.into_iter().map(Into::into).collect(),
        }
    }
}
