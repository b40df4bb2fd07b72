//! Codelist registry
//!
//! The registry is an explicit, immutable catalog of named codelists. Rule builders
//! receive it by reference and resolve codelists by name while a study is defined, so
//! an unknown name is a definition-time error and nothing depends on load order.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use crate::codelist::catalog::CodelistSpec;
use crate::codelist::loader::load_codelist;
use crate::codelist::Codelist;
use crate::error::util::validate_directory;
use crate::error::{CohortError, Result};
use crate::utils::logging::{log_file_done, log_file_start};

/// Immutable catalog of named codelists
#[derive(Debug, Clone, Default)]
pub struct CodelistRegistry {
    lists: BTreeMap<String, Arc<Codelist>>,
}

impl CodelistRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a codelist under its own name, replacing any list with the same name
    #[must_use]
    pub fn with(mut self, codelist: Codelist) -> Self {
        self.insert(codelist);
        self
    }

    /// Add a codelist under its own name, replacing any list with the same name
    pub fn insert(&mut self, codelist: Codelist) {
        let name = codelist.name().to_string();
        if self.lists.insert(name.clone(), Arc::new(codelist)).is_some() {
            log::warn!("Codelist '{name}' registered twice, keeping the latest");
        }
    }

    /// Load every codelist in `specs` from `dir`, in parallel.
    ///
    /// # Errors
    /// Fails on the first file that is missing or lacks a referenced column
    pub fn load_catalog(dir: &Path, specs: &[CodelistSpec]) -> Result<Self> {
        validate_directory(dir, "loading codelists")?;
        let start = Instant::now();
        log_file_start("Loading codelist catalog from", dir);

        let loaded: Vec<Codelist> = specs
            .par_iter()
            .map(|spec| {
                load_codelist(
                    &dir.join(spec.file),
                    spec.name,
                    spec.system,
                    spec.column,
                    spec.category_column,
                )
            })
            .collect::<Result<_>>()?;

        let mut registry = Self::new();
        for codelist in loaded {
            registry.insert(codelist);
        }
        let registry = registry.with_composed_lists()?;

        log_file_done("Loaded", registry.len(), "codelists", dir, start.elapsed());
        Ok(registry)
    }

    /// Add the literal codelists and those composed from registered lists
    ///
    /// # Errors
    /// Fails when a composed list cannot be built from its sources
    pub fn with_composed_lists(mut self) -> Result<Self> {
        for codelist in super::catalog::literal_codelists() {
            self.insert(codelist);
        }
        for codelist in super::catalog::derived_codelists(&self)? {
            self.insert(codelist);
        }
        Ok(self)
    }

    /// Fetch a codelist by name
    ///
    /// # Errors
    /// Returns `UnknownCodelist` if no list has that name
    pub fn get(&self, name: &str) -> Result<Arc<Codelist>> {
        self.lists
            .get(name)
            .cloned()
            .ok_or_else(|| CohortError::UnknownCodelist(name.to_string()))
    }

    /// Union of several registered codelists under a new name
    pub fn combine(&self, name: &str, names: &[&str]) -> Result<Arc<Codelist>> {
        let lists = names
            .iter()
            .map(|n| self.get(n))
            .collect::<Result<Vec<_>>>()?;
        let refs: Vec<&Codelist> = lists.iter().map(AsRef::as_ref).collect();
        Ok(Arc::new(Codelist::combine(name, &refs)))
    }

    /// Category-filtered projection of a registered codelist
    pub fn filter_by_category(
        &self,
        source: &str,
        name: &str,
        include: &[&str],
    ) -> Result<Arc<Codelist>> {
        Ok(Arc::new(self.get(source)?.filter_by_category(name, include)))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.lists.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lists.keys().map(String::as_str)
    }

    /// Registered codelists in name order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Codelist>> {
        self.lists.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}
