//! Definition-time validation of rule sets

use cohort_def::rules::{
    AdmissionFilter, Categories, CategorySource, Returning, TestFilter, TestResultFilter,
};
use cohort_def::{CohortError, DateExpr, Expr, Rule, RuleSet, Shape, SourceRule, Variable};

use crate::utils::test_registry;

fn positive_test() -> SourceRule {
    SourceRule::test_results(TestFilter::sars_cov_2(TestResultFilter::Positive))
}

#[test]
fn test_cycle_through_window_bounds() {
    let err = RuleSet::builder()
        .variable("a", positive_test().on_or_after(DateExpr::var("b")).returning_date())
        .variable("b", positive_test().on_or_before(DateExpr::var("c")).returning_date())
        .variable("c", positive_test().on_or_after(DateExpr::var("a")).returning_date())
        .build()
        .unwrap_err();

    let CohortError::CyclicDependency(cycle) = err else {
        panic!("expected a cycle, got {err}");
    };
    assert_eq!(cycle.first(), cycle.last());
    for name in ["a", "b", "c"] {
        assert!(cycle.iter().any(|n| n == name), "{name} missing from {cycle:?}");
    }
}

#[test]
fn test_unknown_reference_in_population() {
    let err = RuleSet::builder()
        .variable("covid_test_positive", positive_test())
        .population(Expr::all([Expr::var("covid_test_positive"), Expr::var("registered")]))
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        CohortError::UnknownVariable { ref variable, ref reference }
            if variable == "population" && reference == "registered"
    ));
}

#[test]
fn test_population_cannot_see_locals() {
    let err = RuleSet::builder()
        .variable(
            "died",
            Rule::satisfying_with(
                Expr::var("died_any"),
                vec![Variable::new("died_any", SourceRule::died_from_any_cause())],
            ),
        )
        .population(Expr::var("died_any"))
        .build()
        .unwrap_err();
    assert!(matches!(err, CohortError::UnknownVariable { ref reference, .. } if reference == "died_any"));
}

#[test]
fn test_duplicate_top_level_names() {
    let err = RuleSet::builder()
        .variable("age", Rule::age_as_of(DateExpr::index()))
        .variable("age", Rule::age_as_of(DateExpr::parse("index_date + 1 year").unwrap()))
        .build()
        .unwrap_err();
    assert!(matches!(err, CohortError::DuplicateVariable(ref name) if name == "age"));
}

#[test]
fn test_flag_used_as_date_bound() {
    let err = RuleSet::builder()
        .variable("covid_test_positive", positive_test())
        .variable(
            "prev_treated",
            SourceRule::died_from_any_cause().on_or_before(DateExpr::var("covid_test_positive")),
        )
        .build()
        .unwrap_err();
    assert!(matches!(err, CohortError::ShapeMismatch { ref variable, .. } if variable == "prev_treated"));
    assert!(err.is_definition_error());
}

#[test]
fn test_date_of_needs_a_source_rule() {
    let err = RuleSet::builder()
        .variable("a", positive_test().returning_date())
        .variable("b", positive_test().returning_date())
        .variable("earliest", Rule::minimum_of(["a", "b"]))
        .variable("when", Rule::date_of("earliest"))
        .build()
        .unwrap_err();
    assert!(matches!(err, CohortError::ShapeMismatch { ref variable, .. } if variable == "when"));
}

#[test]
fn test_round_to_nearest_zero_is_invalid() {
    let err = RuleSet::builder()
        .variable("imd", Rule::imd_as_of(DateExpr::index(), Some(0)))
        .build()
        .unwrap_err();
    assert!(matches!(err, CohortError::InvalidRule { ref variable, .. } if variable == "imd"));
}

#[test]
fn test_unsupported_returning_attribute() {
    let registry = test_registry();
    let covid = registry.get("covid_icd10").unwrap();
    let err = RuleSet::builder()
        .variable(
            "hosp_weight",
            SourceRule::admissions(AdmissionFilter::default().with_diagnoses(covid))
                .returning(Returning::NumericValue),
        )
        .build()
        .unwrap_err();
    assert!(matches!(err, CohortError::InvalidRule { ref variable, .. } if variable == "hosp_weight"));
}

#[test]
fn test_category_needs_categorised_codelist() {
    let registry = test_registry();
    let err = RuleSet::builder()
        .variable(
            "asthma_group",
            SourceRule::clinical_events(registry.get("asthma").unwrap())
                .returning_category(CategorySource::Codelist),
        )
        .build()
        .unwrap_err();
    assert!(matches!(err, CohortError::InvalidRule { .. }));
}

#[test]
fn test_malformed_date_expression() {
    for input in ["index_date + 3 fortnights", "index_date +", "2022-13-01", ""] {
        let err = DateExpr::parse(input).unwrap_err();
        assert!(
            matches!(err, CohortError::InvalidDateExpression(_)),
            "'{input}' gave {err}"
        );
    }
}

#[test]
fn test_valid_set_reports_shapes() {
    let registry = test_registry();
    let rules = RuleSet::builder()
        .variable("tested", positive_test().on_or_after(DateExpr::index()).returning_date())
        .variable("age", Rule::age_as_of(DateExpr::var("tested")))
        .variable(
            "weight",
            SourceRule::clinical_events(registry.get("weight").unwrap())
                .on_or_before(DateExpr::var("tested"))
                .find_last()
                .returning(Returning::NumericValue),
        )
        .variable(
            "age_group",
            Rule::categorised_as(
                Categories::new("missing")
                    .category("18-59", Expr::all([Expr::ge("age", 18), Expr::lt("age", 60)]))
                    .category("60+", Expr::ge("age", 60)),
            ),
        )
        .population(Expr::is_present("tested"))
        .build()
        .unwrap();

    assert_eq!(rules.shape("tested"), Some(Shape::Date));
    assert_eq!(rules.shape("age"), Some(Shape::Integer));
    assert_eq!(rules.shape("weight"), Some(Shape::Float));
    assert_eq!(rules.shape("age_group"), Some(Shape::Category));
    assert_eq!(rules.len(), 4);
}
