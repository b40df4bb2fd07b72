//! Patient entity model
//!
//! A [`Patient`] is the read-only record the backend supplies for one person: demographics
//! plus every coded event stream the rules can query.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::covid::{TestResult, TherapeuticRecord, Vaccination};
use crate::models::demographics::{Address, DeathRecord, Registration, Sex};
use crate::models::events::{ClinicalEvent, MedicationIssue};
use crate::models::hospital::Admission;

/// One patient as supplied by a backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Patient {
    /// Pseudonymous patient identifier
    pub patient_id: u64,
    /// Recorded sex
    pub sex: Option<Sex>,
    /// Date of birth (month precision in practice, stored as the first of the month)
    pub date_of_birth: Option<NaiveDate>,
    /// Practice registration periods
    pub registrations: Vec<Registration>,
    /// Address periods with area-level attributes
    pub addresses: Vec<Address>,
    /// Coded primary care events
    pub clinical_events: Vec<ClinicalEvent>,
    /// Primary care medication issues
    pub medications: Vec<MedicationIssue>,
    /// Hospital admissions
    pub admissions: Vec<Admission>,
    /// Laboratory test results
    pub test_results: Vec<TestResult>,
    /// Vaccination records
    pub vaccinations: Vec<Vaccination>,
    /// Antiviral and antibody treatment records
    pub therapeutics: Vec<TherapeuticRecord>,
    /// Registered death, if any
    pub death: Option<DeathRecord>,
}

impl Patient {
    /// Create a patient with no recorded data
    #[must_use]
    pub fn new(patient_id: u64) -> Self {
        Self {
            patient_id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_sex(mut self, sex: Sex) -> Self {
        self.sex = Some(sex);
        self
    }

    #[must_use]
    pub fn with_date_of_birth(mut self, date_of_birth: NaiveDate) -> Self {
        self.date_of_birth = Some(date_of_birth);
        self
    }

    #[must_use]
    pub fn with_registration(mut self, registration: Registration) -> Self {
        self.registrations.push(registration);
        self
    }

    #[must_use]
    pub fn with_address(mut self, address: Address) -> Self {
        self.addresses.push(address);
        self
    }

    #[must_use]
    pub fn with_clinical_event(mut self, event: ClinicalEvent) -> Self {
        self.clinical_events.push(event);
        self
    }

    #[must_use]
    pub fn with_medication(mut self, issue: MedicationIssue) -> Self {
        self.medications.push(issue);
        self
    }

    #[must_use]
    pub fn with_admission(mut self, admission: Admission) -> Self {
        self.admissions.push(admission);
        self
    }

    #[must_use]
    pub fn with_test_result(mut self, result: TestResult) -> Self {
        self.test_results.push(result);
        self
    }

    #[must_use]
    pub fn with_vaccination(mut self, vaccination: Vaccination) -> Self {
        self.vaccinations.push(vaccination);
        self
    }

    #[must_use]
    pub fn with_therapeutic(mut self, record: TherapeuticRecord) -> Self {
        self.therapeutics.push(record);
        self
    }

    #[must_use]
    pub fn with_death(mut self, death: DeathRecord) -> Self {
        self.death = Some(death);
        self
    }

    /// Age in completed years on `date`
    #[must_use]
    pub fn age_on(&self, date: NaiveDate) -> Option<i64> {
        let birth = self.date_of_birth?;
        if date < birth {
            return None;
        }
        let mut age = i64::from(date.year() - birth.year());
        if (date.month(), date.day()) < (birth.month(), birth.day()) {
            age -= 1;
        }
        Some(age)
    }

    /// Whether any registration period covers `date`
    #[must_use]
    pub fn is_registered_on(&self, date: NaiveDate) -> bool {
        self.registrations.iter().any(|r| r.covers(date))
    }

    /// Registration in force on `date`; the most recently started one wins
    #[must_use]
    pub fn registration_on(&self, date: NaiveDate) -> Option<&Registration> {
        latest_covering(&self.registrations, |r| (r.start_date, r.covers(date)))
    }

    /// Address in force on `date`; the most recently started one wins
    #[must_use]
    pub fn address_on(&self, date: NaiveDate) -> Option<&Address> {
        latest_covering(&self.addresses, |a| (a.start_date, a.covers(date)))
    }

    /// Date the patient left their last registered practice.
    ///
    /// `None` while any registration is still open.
    #[must_use]
    pub fn deregistration_date(&self) -> Option<NaiveDate> {
        if self.registrations.iter().any(|r| r.end_date.is_none()) {
            return None;
        }
        self.registrations.iter().filter_map(|r| r.end_date).max()
    }
}

fn latest_covering<T>(periods: &[T], key: impl Fn(&T) -> (NaiveDate, bool)) -> Option<&T> {
    let mut best: Option<(&T, NaiveDate)> = None;
    for period in periods {
        let (start, covers) = key(period);
        if !covers {
            continue;
        }
        if best.is_none_or(|(_, best_start)| start > best_start) {
            best = Some((period, start));
        }
    }
    best.map(|(period, _)| period)
}
