//! Source rules: variables computed directly from a patient's coded records
//!
//! A [`SourceRule`] combines a [`Query`] (which record stream and which records in it),
//! a [`Window`] of inclusive date bounds, a [`Matching`] policy and a [`Returning`]
//! attribute that decides the shape of the result.

use std::sync::Arc;

use crate::codelist::Codelist;
use crate::models::{SARS_2_CORONAVIRUS, SARS_COV_2};
use crate::rules::date_expr::DateExpr;
use crate::rules::value::Shape;

/// Which result of a laboratory test is wanted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TestResultFilter {
    #[default]
    Positive,
    Negative,
    Any,
}

/// Hospital admission filters. Empty filters match every admission.
#[derive(Debug, Clone, Default)]
pub struct AdmissionFilter {
    /// Codes that must match the primary diagnosis
    pub primary_diagnoses: Option<Arc<Codelist>>,
    /// Codes that must match any diagnosis, primary included
    pub diagnoses: Option<Arc<Codelist>>,
    /// Codes that must match any procedure
    pub procedures: Option<Arc<Codelist>>,
    /// Accepted patient classifications
    pub patient_classification: Vec<String>,
    /// Accepted admission methods
    pub admission_method: Vec<String>,
}

impl AdmissionFilter {
    #[must_use]
    pub fn with_primary_diagnoses(mut self, codelist: Arc<Codelist>) -> Self {
        self.primary_diagnoses = Some(codelist);
        self
    }

    #[must_use]
    pub fn with_diagnoses(mut self, codelist: Arc<Codelist>) -> Self {
        self.diagnoses = Some(codelist);
        self
    }

    #[must_use]
    pub fn with_procedures(mut self, codelist: Arc<Codelist>) -> Self {
        self.procedures = Some(codelist);
        self
    }

    #[must_use]
    pub fn with_patient_classification<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patient_classification = classes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_admission_method<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.admission_method = methods.into_iter().map(Into::into).collect();
        self
    }
}

/// Laboratory test filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFilter {
    pub pathogen: String,
    pub result: TestResultFilter,
    /// Only the patient's earliest matching specimen is a candidate
    pub restrict_to_earliest_specimen_date: bool,
}

impl TestFilter {
    /// SARS-CoV-2 tests with the given result, every specimen a candidate
    #[must_use]
    pub fn sars_cov_2(result: TestResultFilter) -> Self {
        Self {
            pathogen: SARS_COV_2.to_string(),
            result,
            restrict_to_earliest_specimen_date: false,
        }
    }

    #[must_use]
    pub fn earliest_specimen_only(mut self) -> Self {
        self.restrict_to_earliest_specimen_date = true;
        self
    }
}

/// Therapeutics dataset filters. Empty lists match every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TherapeuticFilter {
    pub therapeutics: Vec<String>,
    pub indications: Vec<String>,
    pub statuses: Vec<String>,
}

impl TherapeuticFilter {
    pub fn therapeutics<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            therapeutics: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_indication(mut self, indication: impl Into<String>) -> Self {
        self.indications.push(indication.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.statuses.push(status.into());
        self
    }
}

/// Which records a source rule considers
#[derive(Debug, Clone)]
pub enum Query {
    /// Primary care events with a code in the list
    ClinicalEvents(Arc<Codelist>),
    /// Medication issues with a code in the list
    Medications(Arc<Codelist>),
    /// Hospital admissions passing the filter
    Admissions(AdmissionFilter),
    /// Test results passing the filter
    TestResults(TestFilter),
    /// Vaccinations against a target disease
    Vaccinations { target_disease: String },
    /// Therapeutics records passing the filter
    Therapeutics(TherapeuticFilter),
    /// Death from any cause
    Death,
    /// Death with a listed code anywhere on the certificate
    DeathCertificate(Arc<Codelist>),
    /// Leaving the last supported practice
    Deregistration,
}

impl Query {
    /// Short name for logs and error messages
    #[must_use]
    pub const fn table(&self) -> &'static str {
        match self {
            Self::ClinicalEvents(_) => "clinical_events",
            Self::Medications(_) => "medications",
            Self::Admissions(_) => "admissions",
            Self::TestResults(_) => "test_results",
            Self::Vaccinations { .. } => "vaccinations",
            Self::Therapeutics(_) => "therapeutics",
            Self::Death => "deaths",
            Self::DeathCertificate(_) => "death_certificates",
            Self::Deregistration => "registrations",
        }
    }

    /// Whether a returning attribute exists for records of this query
    #[must_use]
    pub fn supports(&self, returning: &Returning) -> bool {
        match returning {
            Returning::BinaryFlag | Returning::Date | Returning::NumberOfMatches => true,
            Returning::DateDischarged | Returning::DaysInCriticalCare => {
                matches!(self, Self::Admissions(_))
            }
            Returning::NumericValue => matches!(self, Self::ClinicalEvents(_)),
            Returning::Category(CategorySource::Codelist) => {
                matches!(self, Self::ClinicalEvents(_) | Self::Medications(_))
            }
            Returning::Category(
                CategorySource::Symptomatic | CategorySource::SGeneTargetFailure | CategorySource::Variant,
            ) => matches!(self, Self::TestResults(_)),
            Returning::Category(CategorySource::RiskGroup | CategorySource::Region) => {
                matches!(self, Self::Therapeutics(_))
            }
        }
    }

    /// Codelist whose categories a `Category(Codelist)` return reads
    #[must_use]
    pub fn codelist(&self) -> Option<&Arc<Codelist>> {
        match self {
            Self::ClinicalEvents(list) | Self::Medications(list) | Self::DeathCertificate(list) => {
                Some(list)
            }
            _ => None,
        }
    }
}

/// Inclusive date bounds; a missing side is unbounded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Window {
    pub on_or_after: Option<DateExpr>,
    pub on_or_before: Option<DateExpr>,
}

impl Window {
    /// No bounds at all
    #[must_use]
    pub fn all_time() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn between(start: DateExpr, end: DateExpr) -> Self {
        Self {
            on_or_after: Some(start),
            on_or_before: Some(end),
        }
    }

    #[must_use]
    pub fn on_or_after(start: DateExpr) -> Self {
        Self {
            on_or_after: Some(start),
            on_or_before: None,
        }
    }

    #[must_use]
    pub fn on_or_before(end: DateExpr) -> Self {
        Self {
            on_or_after: None,
            on_or_before: Some(end),
        }
    }

    /// Bound expressions present on this window
    pub fn bounds(&self) -> impl Iterator<Item = &DateExpr> {
        self.on_or_after.iter().chain(self.on_or_before.iter())
    }
}

/// Which candidate supplies the value when several records match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Matching {
    /// Earliest by date
    #[default]
    First,
    /// Latest by date
    Last,
}

/// Category-valued attributes of matched records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategorySource {
    /// Category of the matched code in the query's codelist
    Codelist,
    /// Symptom status reported with a test
    Symptomatic,
    /// S-gene target failure of a test
    SGeneTargetFailure,
    /// Sequenced variant of a test
    Variant,
    /// High-risk cohort a treatment was given under
    RiskGroup,
    /// Region of a treatment record
    Region,
}

/// What a source rule returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Returning {
    /// Whether any record matched
    BinaryFlag,
    /// Date of the selected record
    Date,
    /// Discharge date of the selected admission
    DateDischarged,
    /// Number of matching records in the window
    NumberOfMatches,
    /// Numeric value of the selected event
    NumericValue,
    /// Critical care days of the selected admission
    DaysInCriticalCare,
    /// A category attribute of the selected record
    Category(CategorySource),
}

impl Returning {
    #[must_use]
    pub const fn shape(self) -> Shape {
        match self {
            Self::BinaryFlag => Shape::Flag,
            Self::Date | Self::DateDischarged => Shape::Date,
            Self::NumberOfMatches | Self::DaysInCriticalCare => Shape::Integer,
            Self::NumericValue => Shape::Float,
            Self::Category(_) => Shape::Category,
        }
    }
}

/// A variable computed from one record stream
#[derive(Debug, Clone)]
pub struct SourceRule {
    pub query: Query,
    pub window: Window,
    pub matching: Matching,
    pub returning: Returning,
}

impl SourceRule {
    /// A binary flag over all time; narrow it with the builder methods
    #[must_use]
    pub fn new(query: Query) -> Self {
        Self {
            query,
            window: Window::all_time(),
            matching: Matching::First,
            returning: Returning::BinaryFlag,
        }
    }

    #[must_use]
    pub fn clinical_events(codelist: Arc<Codelist>) -> Self {
        Self::new(Query::ClinicalEvents(codelist))
    }

    #[must_use]
    pub fn medications(codelist: Arc<Codelist>) -> Self {
        Self::new(Query::Medications(codelist))
    }

    #[must_use]
    pub fn admissions(filter: AdmissionFilter) -> Self {
        Self::new(Query::Admissions(filter))
    }

    #[must_use]
    pub fn test_results(filter: TestFilter) -> Self {
        Self::new(Query::TestResults(filter))
    }

    /// COVID-19 vaccinations
    #[must_use]
    pub fn covid_vaccinations() -> Self {
        Self::new(Query::Vaccinations {
            target_disease: SARS_2_CORONAVIRUS.to_string(),
        })
    }

    #[must_use]
    pub fn therapeutics(filter: TherapeuticFilter) -> Self {
        Self::new(Query::Therapeutics(filter))
    }

    #[must_use]
    pub fn died_from_any_cause() -> Self {
        Self::new(Query::Death)
    }

    #[must_use]
    pub fn death_certificate(codelist: Arc<Codelist>) -> Self {
        Self::new(Query::DeathCertificate(codelist))
    }

    #[must_use]
    pub fn deregistration() -> Self {
        Self::new(Query::Deregistration)
    }

    #[must_use]
    pub fn window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    #[must_use]
    pub fn between(self, start: DateExpr, end: DateExpr) -> Self {
        self.window(Window::between(start, end))
    }

    #[must_use]
    pub fn on_or_after(mut self, start: DateExpr) -> Self {
        self.window.on_or_after = Some(start);
        self
    }

    #[must_use]
    pub fn on_or_before(mut self, end: DateExpr) -> Self {
        self.window.on_or_before = Some(end);
        self
    }

    #[must_use]
    pub fn find_first(mut self) -> Self {
        self.matching = Matching::First;
        self
    }

    #[must_use]
    pub fn find_last(mut self) -> Self {
        self.matching = Matching::Last;
        self
    }

    #[must_use]
    pub fn returning(mut self, returning: Returning) -> Self {
        self.returning = returning;
        self
    }

    #[must_use]
    pub fn returning_date(self) -> Self {
        self.returning(Returning::Date)
    }

    #[must_use]
    pub fn returning_count(self) -> Self {
        self.returning(Returning::NumberOfMatches)
    }

    #[must_use]
    pub fn returning_category(self, source: CategorySource) -> Self {
        self.returning(Returning::Category(source))
    }

    #[must_use]
    pub const fn shape(&self) -> Shape {
        self.returning.shape()
    }
}
