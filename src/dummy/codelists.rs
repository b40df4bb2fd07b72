//! Synthetic codelists
//!
//! Every catalogued codelist gets a few made-up codes so that study definitions can be
//! built and exercised without the real codelist files. Codes are unique across lists
//! and all hospital codes have the same length, so prefix matching never links two
//! unrelated lists.

use crate::codelist::{Codelist, CodelistRegistry, CodingSystem, STUDY_CODELISTS};
use crate::error::Result;

/// Codes generated per codelist
pub const CODES_PER_LIST: usize = 3;

/// Categories cycled through for categorised lists (PRIMIS ethnicity groups)
const CATEGORIES: [&str; 5] = ["1", "2", "3", "4", "5"];

fn dummy_code(system: CodingSystem, list: usize, n: usize) -> String {
    match system {
        CodingSystem::Snomed => format!("{}", 100_000_000 + list * 100 + n),
        CodingSystem::Dmd => format!("{}", 900_000_000 + list * 100 + n),
        CodingSystem::Icd10 => format!("X{list:02}{n}"),
        CodingSystem::Opcs4 => format!("Y{list:02}{n}"),
    }
}

/// Registry holding synthetic versions of every catalogued codelist
///
/// # Errors
/// Fails only if the composed lists cannot be built
pub fn dummy_registry() -> Result<CodelistRegistry> {
    let mut registry = CodelistRegistry::new();
    for (i, spec) in STUDY_CODELISTS.iter().enumerate() {
        let codes = (0..CODES_PER_LIST).map(|n| dummy_code(spec.system, i, n));
        let codelist = if spec.category_column.is_some() {
            Codelist::with_categories(
                spec.name,
                spec.system,
                codes
                    .enumerate()
                    .map(|(n, code)| (code, CATEGORIES[n % CATEGORIES.len()])),
            )
        } else {
            Codelist::new(spec.name, spec.system, codes)
        };
        registry.insert(codelist);
    }
    registry.with_composed_lists()
}
