//! Per-patient variable storage

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::rules::{Bindings, DateExpr, RuleSet, Value};

/// Values computed so far for one patient, one slot per declared variable
#[derive(Debug)]
pub struct Scope<'r> {
    slots: &'r FxHashMap<String, usize>,
    values: Vec<Value>,
    matched: Vec<Option<NaiveDate>>,
    index_date: NaiveDate,
}

impl<'r> Scope<'r> {
    /// An empty scope: every variable null until evaluated
    #[must_use]
    pub fn new(rules: &'r RuleSet, index_date: NaiveDate) -> Self {
        let count = rules.slot_count();
        Self {
            slots: rules.slots(),
            values: vec![Value::Null; count],
            matched: vec![None; count],
            index_date,
        }
    }

    #[must_use]
    pub const fn index_date(&self) -> NaiveDate {
        self.index_date
    }

    /// Store a variable's value and the date of the record it came from
    pub fn set(&mut self, name: &str, value: Value, matched: Option<NaiveDate>) {
        if let Some(&slot) = self.slots.get(name) {
            self.values[slot] = value;
            self.matched[slot] = matched;
        }
    }

    /// Current value; undeclared names read as null
    #[must_use]
    pub fn get(&self, name: &str) -> &Value {
        self.slots
            .get(name)
            .map_or(&Value::Null, |&slot| &self.values[slot])
    }

    /// Date of the record a source rule matched
    #[must_use]
    pub fn matched_date(&self, name: &str) -> Option<NaiveDate> {
        self.slots.get(name).and_then(|&slot| self.matched[slot])
    }

    /// Evaluate a date expression against this patient's values
    #[must_use]
    pub fn resolve(&self, expr: &DateExpr) -> Option<NaiveDate> {
        expr.resolve(self.index_date, |name| self.get(name).as_date())
    }

    /// Take the values of the given variables, in order
    pub fn take_values<'a>(&mut self, names: impl Iterator<Item = &'a str>) -> Vec<Value> {
        names
            .map(|name| {
                self.slots
                    .get(name)
                    .map_or(Value::Null, |&slot| std::mem::take(&mut self.values[slot]))
            })
            .collect()
    }
}

impl Bindings for Scope<'_> {
    fn value(&self, name: &str) -> Option<&Value> {
        self.slots.get(name).map(|&slot| &self.values[slot])
    }
}
