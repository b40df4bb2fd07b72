//! Clinical groups, pregnancy, weight and vaccination status
//!
//! All windows here hang off `start_date`.

use crate::codelist::CodelistRegistry;
use crate::error::Result;
use crate::rules::{Categories, DateExpr, Expr, Returning, Rule, SourceRule, Variable};

use super::var;

fn start() -> DateExpr {
    DateExpr::var("start_date")
}

/// Pregnancy without a recorded delivery, and the latest weight measurement
pub fn pregnancy_and_weight(registry: &CodelistRegistry) -> Result<Vec<Variable>> {
    let preg_36wks_date = var(
        "preg_36wks_date",
        SourceRule::clinical_events(registry.get("pregnancy_primis")?)
            .between(
                DateExpr::parse("start_date - 252 days")?,
                DateExpr::parse("start_date - 1 day")?,
            )
            .find_last()
            .returning_date(),
    );
    let pregdel = var(
        "pregdel",
        SourceRule::clinical_events(registry.get("pregdel_primis")?).between(
            DateExpr::parse("preg_36wks_date + 1 day")?,
            DateExpr::parse("start_date - 1 day")?,
        ),
    );
    let pregnancy = var(
        "pregnancy",
        Rule::satisfying_with(
            Expr::all([
                Expr::eq("gender", "F"),
                Expr::le("preg_age", 50),
                Expr::var("preg_36wks_date"),
                !Expr::var("pregdel"),
            ]),
            vec![
                var("gender", Rule::sex()),
                var("preg_age", Rule::age_as_of(DateExpr::var("preg_36wks_date"))),
            ],
        ),
    );
    let weight = var(
        "weight",
        SourceRule::clinical_events(registry.get("weight_opensafely_snomed")?)
            .between(DateExpr::parse("start_date - 182 days")?, start())
            .find_last()
            .returning(Returning::NumericValue),
    );
    Ok(vec![preg_36wks_date, pregdel, pregnancy, weight])
}

fn recorded_before_start(registry: &CodelistRegistry, name: &str, codelist: &str) -> Result<Variable> {
    Ok(var(
        name,
        SourceRule::clinical_events(registry.get(codelist)?).on_or_before(start()),
    ))
}

/// Autism, care home residence, dementia, housebound status and learning disability
pub fn clinical_groups(registry: &CodelistRegistry) -> Result<Vec<Variable>> {
    let dementia = var(
        "dementia_nhsd",
        Rule::satisfying_with(
            Expr::all([Expr::var("dementia_all"), Expr::gt("age", 39)]),
            vec![recorded_before_start(registry, "dementia_all", "dementia_nhsd_snomed")?],
        ),
    );

    let housebound_date = var(
        "housebound_date",
        SourceRule::clinical_events(registry.get("housebound_opensafely_snomed")?)
            .on_or_before(start())
            .find_last()
            .returning_date(),
    );
    let housebound = var(
        "housebound_opensafely",
        Rule::satisfying_with(
            Expr::all([
                Expr::var("housebound_date"),
                !Expr::var("no_longer_housebound"),
                !Expr::var("moved_into_care_home"),
            ]),
            vec![
                housebound_date,
                var(
                    "no_longer_housebound",
                    SourceRule::clinical_events(registry.get("no_longer_housebound_opensafely_snomed")?)
                        .on_or_after(DateExpr::var("housebound_date")),
                ),
                var(
                    "moved_into_care_home",
                    SourceRule::clinical_events(registry.get("care_home_primis_snomed")?)
                        .on_or_after(DateExpr::var("housebound_date")),
                ),
            ],
        ),
    );

    Ok(vec![
        recorded_before_start(registry, "autism_nhsd", "autism_nhsd_snomed")?,
        recorded_before_start(registry, "care_home_primis", "care_home_primis_snomed")?,
        dementia,
        housebound,
        recorded_before_start(registry, "learning_disability_primis", "wider_ld_primis_snomed")?,
    ])
}

/// Shielding status: flagged as high risk and not later downgraded
pub fn shielding(registry: &CodelistRegistry) -> Result<Vec<Variable>> {
    let high_risk = registry.get("high_risk_primis_snomed")?;
    let not_high_risk = registry.get("not_high_risk_primis_snomed")?;

    let shielded = var(
        "shielded_primis",
        Rule::satisfying_with(
            Expr::all([
                Expr::var("severely_clinically_vulnerable"),
                !Expr::var("less_vulnerable"),
            ]),
            vec![
                var(
                    "severely_clinically_vulnerable",
                    SourceRule::clinical_events(high_risk.clone()).find_last(),
                ),
                var(
                    "date_severely_clinically_vulnerable",
                    Rule::date_of("severely_clinically_vulnerable"),
                ),
                var(
                    "less_vulnerable",
                    SourceRule::clinical_events(not_high_risk.clone())
                        .on_or_after(DateExpr::var("date_severely_clinically_vulnerable")),
                ),
            ],
        ),
    );

    let since_feb_15 = var(
        "shielded_since_feb_15",
        Rule::satisfying_with(
            Expr::all([
                Expr::var("severely_clinically_vulnerable_since_feb_15"),
                !Expr::var("new_shielding_status_reduced"),
                !Expr::var("previous_flag"),
            ]),
            vec![
                var(
                    "severely_clinically_vulnerable_since_feb_15",
                    SourceRule::clinical_events(high_risk)
                        .on_or_after(DateExpr::parse("2021-02-15")?)
                        .find_first(),
                ),
                var(
                    "date_vulnerable_since_feb_15",
                    Rule::date_of("severely_clinically_vulnerable_since_feb_15"),
                ),
                var(
                    "new_shielding_status_reduced",
                    SourceRule::clinical_events(not_high_risk)
                        .on_or_after(DateExpr::var("date_vulnerable_since_feb_15")),
                ),
                var(
                    "previous_flag",
                    SourceRule::clinical_events(registry.combine(
                        "primis_shielding",
                        &["high_risk_primis_snomed", "not_high_risk_primis_snomed"],
                    )?)
                    .on_or_before(DateExpr::parse("2021-02-14")?),
                ),
            ],
        ),
    );

    Ok(vec![
        shielded,
        since_feb_15,
        var(
            "serious_mental_illness_nhsd",
            SourceRule::clinical_events(registry.get("serious_mental_illness_nhsd_snomed")?)
                .on_or_before(DateExpr::index()),
        ),
    ])
}

/// Number of COVID-19 vaccine doses by `start_date`, with declined vaccination
/// distinguished from no record
pub fn vaccination_status(registry: &CodelistRegistry) -> Result<Variable> {
    let dose = |name: &str, from: DateExpr| {
        var(
            name,
            SourceRule::covid_vaccinations()
                .between(from, start())
                .find_first()
                .returning_date(),
        )
    };

    let categories = Categories::new("Un-vaccinated")
        .category(
            "Un-vaccinated (declined)",
            Expr::all([
                Expr::var("covid_vax_declined"),
                !Expr::any_of(["covid_vax_1", "covid_vax_2", "covid_vax_3"]),
            ]),
        )
        .category(
            "One vaccination",
            Expr::all([Expr::var("covid_vax_1"), !Expr::var("covid_vax_2")]),
        )
        .category(
            "Two vaccinations",
            Expr::all([Expr::var("covid_vax_2"), !Expr::var("covid_vax_3")]),
        )
        .category("Three or more vaccinations", Expr::var("covid_vax_3"));

    Ok(var(
        "vaccination_status",
        Rule::categorised_as_with(
            categories,
            vec![
                dose("covid_vax_1", DateExpr::parse("2020-06-08")?),
                dose("covid_vax_2", DateExpr::parse("covid_vax_1 + 19 days")?),
                dose("covid_vax_3", DateExpr::parse("covid_vax_2 + 56 days")?),
                var(
                    "covid_vax_declined",
                    SourceRule::clinical_events(registry.get("covid_vaccine_declined")?)
                        .on_or_before(start()),
                ),
            ],
        ),
    ))
}
