//! Matching a source rule against one patient's records

use chrono::NaiveDate;

use crate::codelist::CodingSystem;
use crate::evaluate::scope::Scope;
use crate::models::{
    Admission, ClinicalEvent, MedicationIssue, Patient, TestOutcome, TestResult, TherapeuticRecord,
};
use crate::rules::{
    AdmissionFilter, CategorySource, Matching, Query, Returning, SourceRule, TestFilter,
    TestResultFilter, TherapeuticFilter, Value,
};

/// Result of evaluating one variable
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub value: Value,
    /// Date of the selected record, for `date_of`
    pub matched: Option<NaiveDate>,
}

impl Outcome {
    #[must_use]
    pub const fn value(value: Value) -> Self {
        Self {
            value,
            matched: None,
        }
    }

    /// Result of a source rule with no candidates
    #[must_use]
    pub const fn no_match(returning: Returning) -> Self {
        let value = match returning {
            Returning::BinaryFlag => Value::Bool(false),
            Returning::NumberOfMatches => Value::Int(0),
            _ => Value::Null,
        };
        Self::value(value)
    }
}

#[derive(Debug, Clone, Copy)]
enum Record<'p> {
    Event(&'p ClinicalEvent, Option<&'p str>),
    Medication(&'p MedicationIssue, Option<&'p str>),
    Admission(&'p Admission),
    Test(&'p TestResult),
    Therapeutic(&'p TherapeuticRecord),
    Dated,
}

#[derive(Debug, Clone, Copy)]
struct Candidate<'p> {
    date: NaiveDate,
    record: Record<'p>,
}

/// Evaluate a source rule for one patient.
///
/// A window bound that resolves to null leaves no candidates, so the rule yields
/// false, zero or null rather than an unbounded search.
#[must_use]
pub fn evaluate_source(rule: &SourceRule, patient: &Patient, scope: &Scope<'_>) -> Outcome {
    let lower = match &rule.window.on_or_after {
        Some(expr) => match scope.resolve(expr) {
            Some(date) => Some(date),
            None => return Outcome::no_match(rule.returning),
        },
        None => None,
    };
    let upper = match &rule.window.on_or_before {
        Some(expr) => match scope.resolve(expr) {
            Some(date) => Some(date),
            None => return Outcome::no_match(rule.returning),
        },
        None => None,
    };
    let in_window = |date: NaiveDate| {
        lower.is_none_or(|start| date >= start) && upper.is_none_or(|end| date <= end)
    };

    let candidates = collect_candidates(&rule.query, patient, in_window);
    summarise(&candidates, rule.matching, rule.returning)
}

fn collect_candidates<'p>(
    query: &'p Query,
    patient: &'p Patient,
    in_window: impl Fn(NaiveDate) -> bool,
) -> Vec<Candidate<'p>> {
    match query {
        Query::ClinicalEvents(codelist) => patient
            .clinical_events
            .iter()
            .filter(|e| in_window(e.date))
            .filter_map(|e| {
                let category = codelist.lookup(e.system, &e.code)?;
                Some(Candidate {
                    date: e.date,
                    record: Record::Event(e, category),
                })
            })
            .collect(),
        Query::Medications(codelist) => patient
            .medications
            .iter()
            .filter(|m| in_window(m.date))
            .filter_map(|m| {
                let category = codelist.lookup(m.system, &m.code)?;
                Some(Candidate {
                    date: m.date,
                    record: Record::Medication(m, category),
                })
            })
            .collect(),
        Query::Admissions(filter) => patient
            .admissions
            .iter()
            .filter(|a| in_window(a.admission_date) && admission_matches(filter, a))
            .map(|a| Candidate {
                date: a.admission_date,
                record: Record::Admission(a),
            })
            .collect(),
        Query::TestResults(filter) => test_candidates(filter, patient, in_window),
        Query::Vaccinations { target_disease } => patient
            .vaccinations
            .iter()
            .filter(|v| in_window(v.date) && v.target_disease.eq_ignore_ascii_case(target_disease))
            .map(|v| Candidate {
                date: v.date,
                record: Record::Dated,
            })
            .collect(),
        Query::Therapeutics(filter) => patient
            .therapeutics
            .iter()
            .filter(|t| in_window(t.treatment_start_date) && therapeutic_matches(filter, t))
            .map(|t| Candidate {
                date: t.treatment_start_date,
                record: Record::Therapeutic(t),
            })
            .collect(),
        Query::Death => patient
            .death
            .iter()
            .filter(|d| in_window(d.date))
            .map(|d| Candidate {
                date: d.date,
                record: Record::Dated,
            })
            .collect(),
        Query::DeathCertificate(codelist) => patient
            .death
            .iter()
            .filter(|d| {
                in_window(d.date)
                    && d.causes.iter().any(|c| codelist.matches(CodingSystem::Icd10, c))
            })
            .map(|d| Candidate {
                date: d.date,
                record: Record::Dated,
            })
            .collect(),
        Query::Deregistration => patient
            .deregistration_date()
            .filter(|&date| in_window(date))
            .map(|date| Candidate {
                date,
                record: Record::Dated,
            })
            .into_iter()
            .collect(),
    }
}

fn admission_matches(filter: &AdmissionFilter, admission: &Admission) -> bool {
    if let Some(list) = &filter.primary_diagnoses {
        let primary = admission
            .primary_diagnosis
            .as_deref()
            .is_some_and(|code| list.matches(CodingSystem::Icd10, code));
        if !primary {
            return false;
        }
    }
    if let Some(list) = &filter.diagnoses {
        if !admission
            .all_diagnoses()
            .any(|code| list.matches(CodingSystem::Icd10, code))
        {
            return false;
        }
    }
    if let Some(list) = &filter.procedures {
        if !admission
            .procedures
            .iter()
            .any(|code| list.matches(CodingSystem::Opcs4, code))
        {
            return false;
        }
    }
    one_of(&filter.patient_classification, admission.patient_classification.as_deref())
        && one_of(&filter.admission_method, admission.admission_method.as_deref())
}

fn therapeutic_matches(filter: &TherapeuticFilter, record: &TherapeuticRecord) -> bool {
    one_of(&filter.therapeutics, Some(&record.intervention))
        && one_of(&filter.indications, record.indication.as_deref())
        && one_of(&filter.statuses, record.current_status.as_deref())
}

/// An empty list accepts anything; otherwise the value must be present and listed
fn one_of(accepted: &[String], value: Option<&str>) -> bool {
    accepted.is_empty()
        || value.is_some_and(|v| accepted.iter().any(|a| a.eq_ignore_ascii_case(v.trim())))
}

fn test_candidates<'p>(
    filter: &TestFilter,
    patient: &'p Patient,
    in_window: impl Fn(NaiveDate) -> bool,
) -> Vec<Candidate<'p>> {
    let matching = patient.test_results.iter().filter(|t| {
        t.pathogen.eq_ignore_ascii_case(&filter.pathogen)
            && match filter.result {
                TestResultFilter::Positive => t.result == TestOutcome::Positive,
                TestResultFilter::Negative => t.result == TestOutcome::Negative,
                TestResultFilter::Any => true,
            }
    });

    let as_candidate = |t: &'p TestResult| Candidate {
        date: t.specimen_date,
        record: Record::Test(t),
    };

    if filter.restrict_to_earliest_specimen_date {
        let earliest = matching.fold(None::<&TestResult>, |best, t| match best {
            Some(b) if b.specimen_date <= t.specimen_date => Some(b),
            _ => Some(t),
        });
        earliest
            .filter(|t| in_window(t.specimen_date))
            .map(as_candidate)
            .into_iter()
            .collect()
    } else {
        matching
            .filter(|t| in_window(t.specimen_date))
            .map(as_candidate)
            .collect()
    }
}

/// Pick the earliest or latest candidate; on equal dates the first in record order wins
fn select<'a, 'p>(candidates: &'a [Candidate<'p>], matching: Matching) -> Option<&'a Candidate<'p>> {
    candidates.iter().fold(None, |best, candidate| match best {
        None => Some(candidate),
        Some(current) => {
            let better = match matching {
                Matching::First => candidate.date < current.date,
                Matching::Last => candidate.date > current.date,
            };
            if better { Some(candidate) } else { Some(current) }
        }
    })
}

fn summarise(candidates: &[Candidate<'_>], matching: Matching, returning: Returning) -> Outcome {
    let Some(selected) = select(candidates, matching) else {
        return Outcome::no_match(returning);
    };

    let value = match returning {
        Returning::BinaryFlag => Value::Bool(true),
        Returning::Date => Value::Date(selected.date),
        Returning::NumberOfMatches => Value::Int(i64::try_from(candidates.len()).unwrap_or(i64::MAX)),
        Returning::DateDischarged => match selected.record {
            Record::Admission(a) => a.discharge_date.into(),
            _ => Value::Null,
        },
        Returning::DaysInCriticalCare => match selected.record {
            Record::Admission(a) => a.days_in_critical_care.map(i64::from).into(),
            _ => Value::Null,
        },
        Returning::NumericValue => match selected.record {
            Record::Event(e, _) => e.numeric_value.into(),
            _ => Value::Null,
        },
        Returning::Category(source) => category_of(selected.record, source),
    };

    Outcome {
        value,
        matched: Some(selected.date),
    }
}

fn category_of(record: Record<'_>, source: CategorySource) -> Value {
    let label = match (record, source) {
        (Record::Event(_, category) | Record::Medication(_, category), CategorySource::Codelist) => {
            category
        }
        (Record::Test(t), CategorySource::Symptomatic) => t.symptomatic.as_deref(),
        (Record::Test(t), CategorySource::SGeneTargetFailure) => t.sgtf.as_deref(),
        (Record::Test(t), CategorySource::Variant) => t.variant.as_deref(),
        (Record::Therapeutic(t), CategorySource::RiskGroup) => t.risk_cohort.as_deref(),
        (Record::Therapeutic(t), CategorySource::Region) => t.region.as_deref(),
        _ => None,
    };
    label.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::codelist::Codelist;
    use crate::rules::{DateExpr, RuleSet};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn run(rule: &SourceRule, patient: &Patient) -> Outcome {
        let rules = RuleSet::builder().build().unwrap();
        let scope = Scope::new(&rules, date(2021, 12, 16));
        evaluate_source(rule, patient, &scope)
    }

    fn weight_list() -> Arc<Codelist> {
        Arc::new(Codelist::new("weight", CodingSystem::Snomed, ["27113001"]))
    }

    #[test]
    fn ties_resolve_to_first_record() {
        let patient = Patient::new(1)
            .with_clinical_event(ClinicalEvent::new(date(2022, 1, 3), "27113001").with_value(70.0))
            .with_clinical_event(ClinicalEvent::new(date(2022, 1, 3), "27113001").with_value(72.0));
        let first = SourceRule::clinical_events(weight_list()).returning(Returning::NumericValue);
        let last = first.clone().find_last();
        assert_eq!(run(&first, &patient).value, Value::Float(70.0));
        assert_eq!(run(&last, &patient).value, Value::Float(70.0));
    }

    #[test]
    fn count_ignores_matching_policy() {
        let patient = Patient::new(1)
            .with_clinical_event(ClinicalEvent::new(date(2021, 1, 1), "27113001"))
            .with_clinical_event(ClinicalEvent::new(date(2022, 1, 1), "27113001"))
            .with_clinical_event(ClinicalEvent::new(date(2022, 2, 1), "999"));
        let rule = SourceRule::clinical_events(weight_list())
            .on_or_after(DateExpr::index().minus_years(1))
            .returning_count();
        assert_eq!(run(&rule, &patient).value, Value::Int(1));
    }

    #[test]
    fn null_bound_finds_nothing() {
        let patient = Patient::new(1)
            .with_clinical_event(ClinicalEvent::new(date(2022, 1, 1), "27113001"));
        let flag = SourceRule::clinical_events(weight_list())
            .on_or_after(DateExpr::var("not_yet_known"));
        let outcome = run(&flag, &patient);
        assert_eq!(outcome.value, Value::Bool(false));
        assert_eq!(outcome.matched, None);
    }

    #[test]
    fn earliest_specimen_restriction() {
        let patient = Patient::new(1)
            .with_test_result(TestResult::covid_positive(date(2021, 6, 1)))
            .with_test_result(TestResult::covid_positive(date(2022, 1, 5)));
        let window_from_index = |filter: TestFilter| {
            SourceRule::test_results(filter)
                .on_or_after(DateExpr::index())
                .returning_date()
        };
        let all = window_from_index(TestFilter::sars_cov_2(TestResultFilter::Positive));
        let earliest = window_from_index(
            TestFilter::sars_cov_2(TestResultFilter::Positive).earliest_specimen_only(),
        );
        assert_eq!(run(&all, &patient).value, Value::Date(date(2022, 1, 5)));
        assert_eq!(run(&earliest, &patient).value, Value::Null);
    }

    #[test]
    fn admission_filters_combine() {
        let covid = Arc::new(Codelist::new("covid", CodingSystem::Icd10, ["U071", "U072"]));
        let emergency = Admission::new(date(2022, 1, 10))
            .discharged(date(2022, 1, 20))
            .with_primary_diagnosis("U07.1")
            .classified("1", "21");
        let day_case = Admission::new(date(2022, 1, 12))
            .with_primary_diagnosis("U071")
            .classified("2", "21");
        let patient = Patient::new(1).with_admission(day_case).with_admission(emergency);
        let rule = SourceRule::admissions(
            AdmissionFilter::default()
                .with_primary_diagnoses(covid)
                .with_patient_classification(["1"])
                .with_admission_method(["21", "22"]),
        )
        .returning(Returning::DateDischarged);
        assert_eq!(run(&rule, &patient).value, Value::Date(date(2022, 1, 20)));
    }

    #[test]
    fn therapeutic_risk_group() {
        let patient = Patient::new(1).with_therapeutic(
            TherapeuticRecord::new(date(2022, 1, 6), "Paxlovid")
                .with_indication("non_hospitalised")
                .with_risk_cohort("IMID,solid cancer"),
        );
        let rule = SourceRule::therapeutics(
            TherapeuticFilter::therapeutics(["Paxlovid", "Sotrovimab"]).with_indication("non_hospitalised"),
        )
        .returning_category(CategorySource::RiskGroup);
        assert_eq!(run(&rule, &patient).value, Value::from("IMID,solid cancer"));

        let other = SourceRule::therapeutics(TherapeuticFilter::therapeutics(["Remdesivir"]));
        assert_eq!(run(&other, &patient).value, Value::Bool(false));
    }
}
