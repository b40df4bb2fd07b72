//! Synthetic patient data
//!
//! Generates plausible, reproducible patient records for running study definitions
//! end to end without access to real data. Records are drawn around the study dates
//! and coded from the registry's codelists, so every source rule has something to find.

pub mod codelists;

use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, TimeDelta};
use indicatif::ProgressIterator;
use log::info;
use rand::prelude::*;

use crate::codelist::{Codelist, CodelistRegistry, CodingSystem};
use crate::config::StudyConfig;
use crate::models::{
    Address, Admission, ClinicalEvent, DeathRecord, MedicationIssue, Patient, Registration,
    SARS_2_CORONAVIRUS, Sex, TestResult, TherapeuticRecord, Vaccination,
};
use crate::studies::fragments::EMERGENCY_ADMISSION_METHODS;
use crate::studies::fragments::therapeutics::{NON_HOSPITALISED, THERAPEUTICS};
use crate::utils::logging::patient_bar;

pub use codelists::dummy_registry;

const REGIONS: [&str; 9] = [
    "North East",
    "North West",
    "Yorkshire and The Humber",
    "East Midlands",
    "West Midlands",
    "East",
    "London",
    "South West",
    "South East",
];

const RISK_GROUPS: [&str; 5] = [
    "Downs syndrome",
    "solid cancer",
    "haematological diseases,stem cell transplant recipients",
    "renal disease",
    "immune-mediated inflammatory disorders (IMID)",
];

const VARIANTS: [&str; 3] = ["B.1.617.2", "BA.1", "BA.2"];

/// Largest IMD rank in England
pub const MAX_IMD_RANK: u32 = 32_844;

/// Rates at which synthetic records occur
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Seed for the random number generator
    pub seed: u64,
    /// Share of patients with a positive test in the study period
    pub positive_rate: f64,
    /// Chance that a patient has a record from any one codelist
    pub condition_rate: f64,
    /// Share of positive patients treated in the community
    pub treatment_rate: f64,
    /// Share of patients who die during follow-up
    pub death_rate: f64,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            positive_rate: 0.7,
            condition_rate: 0.05,
            treatment_rate: 0.3,
            death_rate: 0.02,
        }
    }
}

impl DummyConfig {
    /// Rates limited to probabilities; NaN counts as zero
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            positive_rate: probability(self.positive_rate),
            condition_rate: probability(self.condition_rate),
            treatment_rate: probability(self.treatment_rate),
            death_rate: probability(self.death_rate),
            ..self
        }
    }
}

fn probability(rate: f64) -> f64 {
    if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) }
}

/// Reproducible generator of synthetic patients
pub struct DummyDataGenerator {
    rng: StdRng,
    config: DummyConfig,
    index_date: NaiveDate,
    end_date: NaiveDate,
    lists: Vec<Arc<Codelist>>,
}

impl DummyDataGenerator {
    #[must_use]
    pub fn new(registry: &CodelistRegistry, study: &StudyConfig, config: DummyConfig) -> Self {
        let config = config.clamped();
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            index_date: study.index_date,
            end_date: study.end_date,
            lists: registry.iter().filter(|list| !list.is_empty()).cloned().collect(),
        }
    }

    /// Generate `count` patients with ids `1..=count`
    pub fn generate(&mut self, count: usize, show_progress: bool) -> Vec<Patient> {
        let start = Instant::now();
        let pb = patient_bar(count, "Generating", show_progress);
        let patients = (1..=count as u64)
            .progress_with(pb.clone())
            .map(|id| self.patient(id))
            .collect::<Vec<_>>();
        pb.finish_and_clear();
        info!("Generated {} dummy patients in {:?}", patients.len(), start.elapsed());
        patients
    }

    fn days_from(&mut self, date: NaiveDate, min: i64, max: i64) -> NaiveDate {
        date + TimeDelta::days(self.rng.random_range(min..=max))
    }

    fn study_length(&self) -> i64 {
        (self.end_date - self.index_date).num_days().max(0)
    }

    /// One synthetic patient
    pub fn patient(&mut self, id: u64) -> Patient {
        let index = self.index_date;
        let mut patient = Patient::new(id);

        if self.rng.random_bool(0.98) {
            let sex = if self.rng.random_bool(0.51) { Sex::Female } else { Sex::Male };
            patient = patient.with_sex(sex);
        }
        let age_days = self.rng.random_range(12..100) * 365 + self.rng.random_range(0..365);
        patient = patient.with_date_of_birth(index - TimeDelta::days(age_days));

        patient = self.registration(patient);
        patient = self.address(patient);
        patient = self.tests_and_treatment(patient);
        patient = self.vaccinations(patient);
        patient = self.coded_records(patient);

        if self.rng.random_bool(self.config.death_rate) {
            let length = self.study_length();
            let date = self.days_from(index, -365, length);
            patient = patient.with_death(DeathRecord::new(date, ["U071"]));
        }
        patient
    }

    fn registration(&mut self, patient: Patient) -> Patient {
        let start = self.days_from(self.index_date, -20 * 365, -30);
        let end = self
            .rng
            .random_bool(0.05)
            .then(|| self.days_from(self.index_date, -29, 365));
        let stp = format!("STP{}", self.rng.random_range(1..=10));
        let region = REGIONS.choose(&mut self.rng).copied().unwrap_or("London");

        let mut registration = Registration::new(start, end).with_region(region);
        if self.rng.random_bool(0.97) {
            registration = registration.with_stp(stp);
        }
        patient.with_registration(registration)
    }

    fn address(&mut self, patient: Patient) -> Patient {
        let start = self.days_from(self.index_date, -30 * 365, -30);
        let mut address = Address::new(start, None)
            .with_rural_urban(self.rng.random_range(1..=8));
        if self.rng.random_bool(0.97) {
            address = address.with_imd_rank(self.rng.random_range(1..=MAX_IMD_RANK));
        }
        patient.with_address(address)
    }

    fn tests_and_treatment(&mut self, mut patient: Patient) -> Patient {
        if !self.rng.random_bool(self.config.positive_rate) {
            if self.rng.random_bool(0.5) {
                let length = self.study_length();
                let date = self.days_from(self.index_date, 0, length);
                patient = patient.with_test_result(TestResult::covid_negative(date));
            }
            return patient;
        }

        let length = self.study_length();
        let tested = self.days_from(self.index_date, 0, length);
        let symptomatic = if self.rng.random_bool(0.6) { "Y" } else { "N" };
        let sgtf = if self.rng.random_bool(0.5) { "1" } else { "0" };
        let variant = VARIANTS.choose(&mut self.rng).copied().unwrap_or("BA.2");
        patient = patient.with_test_result(
            TestResult::covid_positive(tested)
                .with_symptomatic(symptomatic)
                .with_sgtf(sgtf)
                .with_variant(variant),
        );

        if self.rng.random_bool(self.config.treatment_rate) {
            let (_, drug) = THERAPEUTICS
                .choose(&mut self.rng)
                .copied()
                .unwrap_or(THERAPEUTICS[0]);
            let treated = self.days_from(tested, 0, 5);
            let risk = RISK_GROUPS.choose(&mut self.rng).copied().unwrap_or(RISK_GROUPS[0]);
            let region = REGIONS.choose(&mut self.rng).copied().unwrap_or("London");
            patient = patient.with_therapeutic(
                TherapeuticRecord::new(treated, drug)
                    .with_status("Treatment Complete")
                    .with_indication(NON_HOSPITALISED)
                    .with_risk_cohort(risk)
                    .with_region(region),
            );
        }
        patient
    }

    fn vaccinations(&mut self, mut patient: Patient) -> Patient {
        let doses = self.rng.random_range(0..=3);
        let mut date = self.days_from(NaiveDate::from_ymd_opt(2020, 12, 8).unwrap_or(self.index_date), 0, 120);
        for _ in 0..doses {
            if date > self.index_date {
                break;
            }
            patient = patient.with_vaccination(Vaccination::new(date, SARS_2_CORONAVIRUS));
            date = self.days_from(date, 56, 120);
        }
        patient
    }

    /// Records coded from randomly chosen codelists
    fn coded_records(&mut self, mut patient: Patient) -> Patient {
        let lists = self.lists.clone();
        for list in &lists {
            if !self.rng.random_bool(self.config.condition_rate) {
                continue;
            }
            let codes: Vec<_> = list.codes().collect();
            let Some(code) = codes.choose(&mut self.rng) else {
                continue;
            };
            let date = self.days_from(self.index_date, -3 * 365, 90);
            patient = match code.system {
                CodingSystem::Snomed => {
                    let mut event = ClinicalEvent::new(date, code.code.clone());
                    if list.name().starts_with("weight") {
                        event = event.with_value(f64::from(self.rng.random_range(45..130_u32)));
                    }
                    patient.with_clinical_event(event)
                }
                CodingSystem::Dmd => patient.with_medication(MedicationIssue::with_system(
                    date,
                    CodingSystem::Dmd,
                    code.code.clone(),
                )),
                CodingSystem::Icd10 => patient.with_admission(self.admission(date).with_diagnosis(code.code.clone())),
                CodingSystem::Opcs4 => patient.with_admission(self.admission(date).with_procedure(code.code.clone())),
            };
        }
        patient
    }

    fn admission(&mut self, date: NaiveDate) -> Admission {
        let method = EMERGENCY_ADMISSION_METHODS
            .choose(&mut self.rng)
            .copied()
            .unwrap_or("21");
        let discharged = self.days_from(date, 0, 14);
        let mut admission = Admission::new(date).discharged(discharged).classified("1", method);
        if self.rng.random_bool(0.1) {
            admission = admission.with_critical_care_days(self.rng.random_range(1..=10));
        }
        admission
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(seed: u64) -> DummyDataGenerator {
        let registry = dummy_registry().unwrap();
        let config = DummyConfig {
            seed,
            ..DummyConfig::default()
        };
        DummyDataGenerator::new(&registry, &StudyConfig::default(), config)
    }

    #[test]
    fn same_seed_same_patients() {
        let a = generator(7).generate(50, false);
        let b = generator(7).generate(50, false);
        assert_eq!(a, b);
    }

    #[test]
    fn out_of_range_rates_are_clamped() {
        let registry = dummy_registry().unwrap();
        let config = DummyConfig {
            positive_rate: 1.5,
            condition_rate: -0.2,
            treatment_rate: f64::NAN,
            death_rate: 2.0,
            ..DummyConfig::default()
        };
        let mut generator = DummyDataGenerator::new(&registry, &StudyConfig::default(), config);
        let patients = generator.generate(20, false);
        assert!(patients.iter().all(|p| p.death.is_some()));
        assert!(patients.iter().all(|p| p.therapeutics.is_empty()));
        assert!(patients.iter().all(|p| p.admissions.is_empty() && p.clinical_events.is_empty()));
    }

    #[test]
    fn ids_are_sequential() {
        let patients = generator(1).generate(10, false);
        let ids: Vec<u64> = patients.iter().map(|p| p.patient_id).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
        assert!(patients.iter().all(|p| !p.registrations.is_empty()));
    }
}
