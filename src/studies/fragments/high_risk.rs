//! High-risk conditions for COVID-19 treatment eligibility
//!
//! Every condition is looked up in primary care (SNOMED) and, where a hospital
//! codelist exists, in admissions (ICD-10 diagnoses or OPCS-4 procedures). A group
//! variable then combines the sources: with [`Evidence::Dates`] it is the earliest of
//! the latest-record dates, with [`Evidence::Flags`] it is true when any source matched.

use crate::codelist::CodelistRegistry;
use crate::error::Result;
use crate::rules::{
    AdmissionFilter, DateExpr, Expr, Rule, SourceRule, Variable, Window,
};

use super::{Evidence, anchor, var};

/// Builder for the high-risk condition variables around one anchor date
#[derive(Debug, Clone, Copy)]
pub struct HighRiskConditions<'a> {
    registry: &'a CodelistRegistry,
    anchor: &'a str,
    evidence: Evidence,
}

impl<'a> HighRiskConditions<'a> {
    #[must_use]
    pub const fn new(registry: &'a CodelistRegistry, anchor: &'a str, evidence: Evidence) -> Self {
        Self {
            registry,
            anchor,
            evidence,
        }
    }

    fn anchor(&self) -> DateExpr {
        anchor(self.anchor)
    }

    fn up_to_anchor(&self) -> Window {
        Window::on_or_before(self.anchor())
    }

    fn months_before(&self, months: i32) -> Window {
        Window::between(self.anchor().minus_months(months), self.anchor())
    }

    /// Same-day window on another admission's date
    fn same_day_as(name: &str) -> Window {
        Window::between(DateExpr::var(name), DateExpr::var(name))
    }

    fn evidence(&self, rule: SourceRule) -> SourceRule {
        match self.evidence {
            Evidence::Dates => rule.find_last().returning_date(),
            Evidence::Flags => rule,
        }
    }

    /// Primary care record of a codelist, named after the codelist
    fn events(&self, codelist: &str, window: Window) -> Result<Variable> {
        let rule = SourceRule::clinical_events(self.registry.get(codelist)?).window(window);
        Ok(var(codelist, self.evidence(rule)))
    }

    /// Admission with a diagnosis from a codelist, named after the codelist
    fn diagnoses(&self, codelist: &str, window: Window) -> Result<Variable> {
        let filter = AdmissionFilter::default().with_diagnoses(self.registry.get(codelist)?);
        let rule = SourceRule::admissions(filter).window(window);
        Ok(var(codelist, self.evidence(rule)))
    }

    /// Admission with a procedure from a codelist
    fn procedures(&self, name: &str, codelist: &str, window: Window) -> Result<Variable> {
        let filter = AdmissionFilter::default().with_procedures(self.registry.get(codelist)?);
        let rule = SourceRule::admissions(filter).window(window);
        Ok(var(name, self.evidence(rule)))
    }

    /// Latest admission date for a procedure; always a date, other windows hang off it
    fn procedure_date(&self, name: &str, codelist: &str) -> Result<Variable> {
        let filter = AdmissionFilter::default().with_procedures(self.registry.get(codelist)?);
        let rule = SourceRule::admissions(filter)
            .window(self.up_to_anchor())
            .find_last()
            .returning_date();
        Ok(var(name, rule))
    }

    fn group(&self, name: &str, parts: &[&str]) -> Variable {
        match self.evidence {
            Evidence::Dates => var(name, Rule::minimum_of(parts.iter().copied())),
            Evidence::Flags => var(name, Rule::satisfying(Expr::any_of(parts.iter().copied()))),
        }
    }

    /// SNOMED and ICD-10 lookups for a condition plus their group
    fn with_hospital_diagnoses(&self, condition: &str, window: &Window) -> Result<Vec<Variable>> {
        let snomed = format!("{condition}_snomed");
        let icd10 = format!("{condition}_icd10");
        Ok(vec![
            self.events(&snomed, window.clone())?,
            self.diagnoses(&icd10, window.clone())?,
            self.group(condition, &[&snomed, &icd10]),
        ])
    }

    /// Every high-risk variable in declaration order
    ///
    /// # Errors
    /// Returns `UnknownCodelist` for the first codelist missing from the registry
    pub fn variables(&self) -> Result<Vec<Variable>> {
        let mut vars = Vec::new();

        vars.extend(self.with_hospital_diagnoses("downs_syndrome_nhsd", &self.up_to_anchor())?);

        let cancer = self.registry.combine(
            "cancer_opensafely_snomed",
            &[
                "non_haematological_cancer_opensafely_snomed",
                "lung_cancer_opensafely_snomed",
                "chemotherapy_radiotherapy_opensafely_snomed",
            ],
        )?;
        vars.push(var(
            "cancer_opensafely_snomed",
            self.evidence(SourceRule::clinical_events(cancer).window(self.months_before(6))),
        ));

        vars.extend(self.haematological_disease()?);
        vars.extend(self.with_hospital_diagnoses("ckd_stage_5_nhsd", &self.up_to_anchor())?);
        vars.extend(self.with_hospital_diagnoses("liver_disease_nhsd", &self.up_to_anchor())?);
        vars.extend(self.immune_mediated()?);
        vars.push(self.events("immunosupression_nhsd", self.up_to_anchor())?);
        vars.extend(self.with_hospital_diagnoses("hiv_aids_nhsd", &self.up_to_anchor())?);
        vars.extend(self.solid_organ_transplant()?);

        for condition in [
            "multiple_sclerosis_nhsd",
            "motor_neurone_disease_nhsd",
            "myasthenia_gravis_nhsd",
            "huntingtons_disease_nhsd",
        ] {
            vars.extend(self.with_hospital_diagnoses(condition, &self.up_to_anchor())?);
        }

        Ok(vars)
    }

    fn haematological_disease(&self) -> Result<Vec<Variable>> {
        let hsct = self.months_before(12);
        let malignancy = self.months_before(24);
        let mut vars = vec![
            self.events("haematopoietic_stem_cell_transplant_nhsd_snomed", hsct.clone())?,
            self.diagnoses("haematopoietic_stem_cell_transplant_nhsd_icd10", hsct.clone())?,
            self.procedures(
                "haematopoietic_stem_cell_transplant_nhsd_opcs4",
                "haematopoietic_stem_cell_transplant_nhsd_opcs4",
                hsct,
            )?,
            self.events("haematological_malignancies_nhsd_snomed", malignancy.clone())?,
            self.diagnoses("haematological_malignancies_nhsd_icd10", malignancy)?,
            self.events("sickle_cell_disease_nhsd_snomed", self.up_to_anchor())?,
            self.diagnoses("sickle_cell_disease_nhsd_icd10", self.up_to_anchor())?,
        ];
        vars.push(self.group(
            "haematological_disease_nhsd",
            &[
                "haematopoietic_stem_cell_transplant_nhsd_snomed",
                "haematopoietic_stem_cell_transplant_nhsd_icd10",
                "haematopoietic_stem_cell_transplant_nhsd_opcs4",
                "haematological_malignancies_nhsd_snomed",
                "haematological_malignancies_nhsd_icd10",
                "sickle_cell_disease_nhsd_snomed",
                "sickle_cell_disease_nhsd_icd10",
            ],
        ));
        if self.evidence == Evidence::Dates {
            vars.push(self.group(
                "sickle_cell_disease_nhsd",
                &["sickle_cell_disease_nhsd_snomed", "sickle_cell_disease_nhsd_icd10"],
            ));
        }
        Ok(vars)
    }

    /// Immunosuppressant and oral steroid prescribing
    fn immune_mediated(&self) -> Result<Vec<Variable>> {
        let immunosuppressants = self.registry.combine(
            "immunosuppresant_drugs_nhsd",
            &["immunosuppresant_drugs_dmd", "immunosuppresant_drugs_snomed"],
        )?;
        let steroids = self.registry.combine(
            "oral_steroid_drugs_nhsd",
            &["oral_steroid_drugs_dmd", "oral_steroid_drugs_snomed"],
        )?;

        let mut vars = vec![
            var(
                "immunosuppresant_drugs_nhsd",
                self.evidence(SourceRule::medications(immunosuppressants).window(self.months_before(6))),
            ),
            var(
                "oral_steroid_drugs_nhsd",
                self.evidence(
                    SourceRule::medications(steroids.clone()).window(self.months_before(12)),
                ),
            ),
            var(
                "oral_steroid_drug_nhsd_3m_count",
                SourceRule::medications(steroids.clone())
                    .window(self.months_before(3))
                    .returning_count(),
            ),
            var(
                "oral_steroid_drug_nhsd_12m_count",
                SourceRule::medications(steroids)
                    .window(self.months_before(12))
                    .returning_count(),
            ),
        ];

        if self.evidence == Evidence::Flags {
            vars.push(var(
                "oral_steroid_drugs_nhsd2",
                Rule::satisfying(Expr::all([
                    Expr::var("oral_steroid_drugs_nhsd"),
                    Expr::ge("oral_steroid_drug_nhsd_3m_count", 2),
                    Expr::ge("oral_steroid_drug_nhsd_12m_count", 4),
                ])),
            ));
            vars.push(var(
                "imid_nhsd",
                Rule::satisfying(Expr::any_of(["immunosuppresant_drugs_nhsd", "oral_steroid_drugs_nhsd2"])),
            ));
        }
        Ok(vars)
    }

    /// Solid organ transplants, including procedures only counted when recorded on the
    /// same day as a transplant Y code
    fn solid_organ_transplant(&self) -> Result<Vec<Variable>> {
        let all_y = "transplant_all_y_codes_opcs4";
        let conjunctiva_y = "transplant_conjunctiva_y_code_opcs4";
        let ileum_1_y = "transplant_ileum_1_Y_codes_opcs4";
        let ileum_2_y = "transplant_ileum_2_Y_codes_opcs4";

        let ileum_2 = {
            let filter = AdmissionFilter::default()
                .with_procedures(self.registry.get("ileum_2_transplant_nhsd_opcs4")?);
            let rule = SourceRule::admissions(filter).window(Self::same_day_as(ileum_2_y));
            match self.evidence {
                Evidence::Dates => rule.find_first().returning_date(),
                Evidence::Flags => rule,
            }
        };

        Ok(vec![
            self.events("solid_organ_transplant_nhsd_snomed", self.up_to_anchor())?,
            self.procedures(
                "solid_organ_transplant_nhsd_opcs4",
                "solid_organ_transplant_nhsd_opcs4",
                self.up_to_anchor(),
            )?,
            self.procedure_date(all_y, "replacement_of_organ_transplant_nhsd_opcs4")?,
            self.procedures(
                "transplant_thymus_opcs4",
                "thymus_gland_transplant_nhsd_opcs4",
                Self::same_day_as(all_y),
            )?,
            self.procedure_date(conjunctiva_y, "conjunctiva_y_codes_transplant_nhsd_opcs4")?,
            self.procedures(
                "transplant_conjunctiva_opcs4",
                "conjunctiva_transplant_nhsd_opcs4",
                Self::same_day_as(conjunctiva_y),
            )?,
            self.procedures(
                "transplant_stomach_opcs4",
                "stomach_transplant_nhsd_opcs4",
                Self::same_day_as(all_y),
            )?,
            self.procedure_date(ileum_1_y, "ileum_1_y_codes_transplant_nhsd_opcs4")?,
            self.procedure_date(ileum_2_y, "ileum_2_y_codes_transplant_nhsd_opcs4")?,
            self.procedures(
                "transplant_ileum_1_opcs4",
                "ileum_1_transplant_nhsd_opcs4",
                Self::same_day_as(ileum_1_y),
            )?,
            var("transplant_ileum_2_opcs4", ileum_2),
            self.group(
                "solid_organ_transplant_nhsd",
                &[
                    "solid_organ_transplant_nhsd_snomed",
                    "solid_organ_transplant_nhsd_opcs4",
                    "transplant_thymus_opcs4",
                    "transplant_conjunctiva_opcs4",
                    "transplant_stomach_opcs4",
                    "transplant_ileum_1_opcs4",
                    "transplant_ileum_2_opcs4",
                ],
            ),
        ])
    }
}

/// Flowchart definition of high risk: any of the qualifying condition groups
#[must_use]
pub fn high_risk_group() -> Variable {
    var(
        "high_risk_group",
        Rule::satisfying(Expr::any_of([
            "huntingtons_disease_nhsd",
            "myasthenia_gravis_nhsd",
            "motor_neurone_disease_nhsd",
            "multiple_sclerosis_nhsd",
            "solid_organ_transplant_nhsd",
            "hiv_aids_nhsd",
            "immunosupression_nhsd",
            "imid_nhsd",
            "liver_disease_nhsd",
            "ckd_stage_5_nhsd",
            "haematological_disease_nhsd",
            "cancer_opensafely_snomed",
            "downs_syndrome_nhsd",
        ])),
    )
}
