//! Catalog of the codelists used by the study definitions
//!
//! Each entry names a codelist, the CSV file it is read from (relative to the
//! codelist directory), its coding system and the columns holding codes and,
//! where present, categories.

use crate::codelist::{Codelist, CodingSystem};
use crate::error::Result;

use super::CodelistRegistry;

/// Where and how to load one codelist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodelistSpec {
    pub name: &'static str,
    pub file: &'static str,
    pub system: CodingSystem,
    pub column: &'static str,
    pub category_column: Option<&'static str>,
}

impl CodelistSpec {
    #[must_use]
    pub const fn new(
        name: &'static str,
        file: &'static str,
        system: CodingSystem,
        column: &'static str,
        category_column: Option<&'static str>,
    ) -> Self {
        Self {
            name,
            file,
            system,
            column,
            category_column,
        }
    }
}

/// Codelists read from CSV files
pub const STUDY_CODELISTS: &[CodelistSpec] = &[
    CodelistSpec::new("chronic_cardiac_dis", "opensafely-chronic-cardiac-disease-snomed.csv", CodingSystem::Snomed, "id", None),
    CodelistSpec::new("chronic_respiratory_dis", "opensafely-chronic-respiratory-disease-snomed.csv", CodingSystem::Snomed, "id", None),
    CodelistSpec::new("diabetes", "opensafely-diabetes-snomed.csv", CodingSystem::Snomed, "id", None),
    CodelistSpec::new("hypertension", "opensafely-hypertension-snomed.csv", CodingSystem::Snomed, "id", None),
    CodelistSpec::new("covid_symptoms_snomed", "user-MillieGreen-covid-19-symptoms.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("covid_icd10", "opensafely-covid-identification.csv", CodingSystem::Icd10, "icd10_code", None),
    CodelistSpec::new("pregnancy_primis", "primis-covid19-vacc-uptake-preg.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("pregdel_primis", "primis-covid19-vacc-uptake-pregdel.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("weight_opensafely_snomed", "opensafely-weight-snomed.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("downs_syndrome_nhsd_snomed", "nhsd-downs-syndrome-snomed-ct.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("downs_syndrome_nhsd_icd10", "nhsd-downs-syndrome-icd-10.csv", CodingSystem::Icd10, "code", None),
    CodelistSpec::new("sickle_cell_disease_nhsd_snomed", "nhsd-sickle-spl-atriskv4-snomed-ct.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("sickle_cell_disease_nhsd_icd10", "nhsd-sickle-spl-hes-icd-10.csv", CodingSystem::Icd10, "code", None),
    CodelistSpec::new("non_haematological_cancer_opensafely_snomed", "opensafely-cancer-excluding-lung-and-haematological-snomed.csv", CodingSystem::Snomed, "id", None),
    CodelistSpec::new("lung_cancer_opensafely_snomed", "opensafely-lung-cancer-snomed.csv", CodingSystem::Snomed, "id", None),
    CodelistSpec::new("chemotherapy_radiotherapy_opensafely_snomed", "opensafely-chemotherapy-or-radiotherapy-snomed.csv", CodingSystem::Snomed, "id", None),
    CodelistSpec::new("haematopoietic_stem_cell_transplant_nhsd_snomed", "nhsd-haematopoietic-stem-cell-transplant-snomed.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("haematopoietic_stem_cell_transplant_nhsd_icd10", "nhsd-haematopoietic-stem-cell-transplant-icd-10.csv", CodingSystem::Icd10, "code", None),
    CodelistSpec::new("haematopoietic_stem_cell_transplant_nhsd_opcs4", "nhsd-haematopoietic-stem-cell-transplant-opcs4.csv", CodingSystem::Opcs4, "code", None),
    CodelistSpec::new("haematological_malignancies_nhsd_snomed", "nhsd-haematological-malignancies-snomed.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("haematological_malignancies_nhsd_icd10", "nhsd-haematological-malignancies-icd-10.csv", CodingSystem::Icd10, "code", None),
    CodelistSpec::new("ckd_stage_5_nhsd_snomed", "nhsd-ckd-stage-5-snomed-ct.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("ckd_stage_5_nhsd_icd10", "nhsd-ckd-stage-5-icd-10.csv", CodingSystem::Icd10, "code", None),
    CodelistSpec::new("liver_disease_nhsd_snomed", "nhsd-liver-cirrhosis.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("liver_disease_nhsd_icd10", "nhsd-liver-cirrhosis-icd-10.csv", CodingSystem::Icd10, "code", None),
    CodelistSpec::new("immunosuppresant_drugs_dmd", "nhsd-immunosuppresant-drugs-pra-dmd.csv", CodingSystem::Dmd, "code", None),
    CodelistSpec::new("immunosuppresant_drugs_snomed", "nhsd-immunosuppresant-drugs-pra-snomed.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("oral_steroid_drugs_dmd", "nhsd-oral-steroid-drugs-pra-dmd.csv", CodingSystem::Dmd, "dmd_id", None),
    CodelistSpec::new("oral_steroid_drugs_snomed", "nhsd-oral-steroid-drugs-snomed.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("immunosupression_nhsd", "nhsd-immunosupression-pcdcluster-snomed-ct.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("hiv_aids_nhsd_snomed", "nhsd-hiv-aids-snomed.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("hiv_aids_nhsd_icd10", "nhsd-hiv-aids-icd10.csv", CodingSystem::Icd10, "code", None),
    CodelistSpec::new("solid_organ_transplant_nhsd_snomed", "nhsd-transplant-spl-atriskv4-snomed-ct.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("solid_organ_transplant_nhsd_opcs4", "nhsd-transplant-spl-hes-opcs4.csv", CodingSystem::Opcs4, "code", None),
    CodelistSpec::new("thymus_gland_transplant_nhsd_opcs4", "nhsd-transplant-thymus-gland-spl-hes-opcs4.csv", CodingSystem::Opcs4, "code", None),
    CodelistSpec::new("replacement_of_organ_transplant_nhsd_opcs4", "nhsd-transplant-replacement-of-organ-spl-hes-opcs4.csv", CodingSystem::Opcs4, "code", None),
    CodelistSpec::new("conjunctiva_transplant_nhsd_opcs4", "nhsd-transplant-conjunctiva-spl-hes-opcs4.csv", CodingSystem::Opcs4, "code", None),
    CodelistSpec::new("conjunctiva_y_codes_transplant_nhsd_opcs4", "nhsd-transplant-conjunctiva-y-codes-spl-hes-opcs4.csv", CodingSystem::Opcs4, "code", None),
    CodelistSpec::new("stomach_transplant_nhsd_opcs4", "nhsd-transplant-stomach-spl-hes-opcs4.csv", CodingSystem::Opcs4, "code", None),
    CodelistSpec::new("ileum_1_transplant_nhsd_opcs4", "nhsd-transplant-ileum_1-spl-hes-opcs4.csv", CodingSystem::Opcs4, "code", None),
    CodelistSpec::new("ileum_2_transplant_nhsd_opcs4", "nhsd-transplant-ileum_2-spl-hes-opcs4.csv", CodingSystem::Opcs4, "code", None),
    CodelistSpec::new("ileum_1_y_codes_transplant_nhsd_opcs4", "nhsd-transplant-ileum_1-y-codes-spl-hes-opcs4.csv", CodingSystem::Opcs4, "code", None),
    CodelistSpec::new("ileum_2_y_codes_transplant_nhsd_opcs4", "nhsd-transplant-ileum_2-y-codes-spl-hes-opcs4.csv", CodingSystem::Opcs4, "code", None),
    CodelistSpec::new("multiple_sclerosis_nhsd_snomed", "nhsd-multiple-sclerosis-snomed-ct.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("multiple_sclerosis_nhsd_icd10", "nhsd-multiple-sclerosis.csv", CodingSystem::Icd10, "code", None),
    CodelistSpec::new("motor_neurone_disease_nhsd_snomed", "nhsd-motor-neurone-disease-snomed-ct.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("motor_neurone_disease_nhsd_icd10", "nhsd-motor-neurone-disease-icd-10.csv", CodingSystem::Icd10, "code", None),
    CodelistSpec::new("myasthenia_gravis_nhsd_snomed", "nhsd-myasthenia-gravis-snomed-ct.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("myasthenia_gravis_nhsd_icd10", "nhsd-myasthenia-gravis.csv", CodingSystem::Icd10, "code", None),
    CodelistSpec::new("huntingtons_disease_nhsd_snomed", "nhsd-huntingtons-snomed-ct.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("huntingtons_disease_nhsd_icd10", "nhsd-huntingtons.csv", CodingSystem::Icd10, "code", None),
    CodelistSpec::new("ethnicity_primis_snomed", "primis-covid19-vacc-uptake-eth2001.csv", CodingSystem::Snomed, "code", Some("grouping_6_id")),
    CodelistSpec::new("autism_nhsd_snomed", "nhsd-primary-care-domain-refsets-autism_cod.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("care_home_primis_snomed", "primis-covid19-vacc-uptake-longres.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("dementia_nhsd_snomed", "nhsd-primary-care-domain-refsets-dem_cod.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("housebound_opensafely_snomed", "opensafely-housebound.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("no_longer_housebound_opensafely_snomed", "opensafely-no-longer-housebound.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("wider_ld_primis_snomed", "primis-covid19-vacc-uptake-learndis.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("high_risk_primis_snomed", "primis-covid19-vacc-uptake-shield.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("not_high_risk_primis_snomed", "primis-covid19-vacc-uptake-nonshield.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("serious_mental_illness_nhsd_snomed", "nhsd-primary-care-domain-refsets-mh_cod.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("first_dose_declined", "opensafely-covid-19-vaccination-first-dose-declined.csv", CodingSystem::Snomed, "code", None),
    CodelistSpec::new("second_dose_declined", "opensafely-covid-19-vaccination-second-dose-declined.csv", CodingSystem::Snomed, "code", None),
];

/// Codelists written out literally rather than read from a file
#[must_use]
pub fn literal_codelists() -> Vec<Codelist> {
    vec![
        // Monoclonal antibody infusions recorded as hospital procedures
        Codelist::new("mabs_procedure", CodingSystem::Opcs4, ["X891", "X892"]),
    ]
}

/// Codelists composed from other registered codelists.
/// Skipped silently when their sources are not registered.
pub fn derived_codelists(registry: &CodelistRegistry) -> Result<Vec<Codelist>> {
    let mut derived = Vec::new();
    if registry.contains("first_dose_declined") && registry.contains("second_dose_declined") {
        let combined = registry.combine(
            "covid_vaccine_declined",
            &["first_dose_declined", "second_dose_declined"],
        )?;
        derived.push(combined.as_ref().clone());
    }
    Ok(derived)
}
