//! Validated rule sets
//!
//! [`RuleSetBuilder::build`] checks every definition-time invariant before any patient
//! is touched: unique names, resolvable references, consistent shapes and an acyclic
//! reference graph. Top-level variables may refer to each other in any declaration
//! order; they are evaluated in a topological order fixed at build time. Local
//! variables see only earlier locals of the same rule and the top-level variables.

use std::collections::BTreeSet;

use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::error::{CohortError, Result};
use crate::output::Column;
use crate::rules::expr::{Expr, Operand};
use crate::rules::rule::{AddressAttribute, Rule, Variable};
use crate::rules::source::{CategorySource, Returning, SourceRule};
use crate::rules::value::Shape;

/// Collects variables and the population predicate for a study
#[derive(Debug, Clone, Default)]
pub struct RuleSetBuilder {
    variables: Vec<Variable>,
    population: Option<Expr>,
}

impl RuleSetBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a top-level variable
    #[must_use]
    pub fn variable(mut self, name: impl Into<String>, rule: impl Into<Rule>) -> Self {
        self.variables.push(Variable::new(name, rule));
        self
    }

    /// Declare several top-level variables, e.g. a shared fragment
    #[must_use]
    pub fn extend(mut self, variables: impl IntoIterator<Item = Variable>) -> Self {
        self.variables.extend(variables);
        self
    }

    /// Set the cohort inclusion predicate. Without one every patient is included.
    #[must_use]
    pub fn population(mut self, expr: Expr) -> Self {
        self.population = Some(expr);
        self
    }

    /// Validate the definitions and fix the evaluation order
    ///
    /// # Errors
    /// `DuplicateVariable`, `UnknownVariable`, `CyclicDependency`, `ShapeMismatch` or
    /// `InvalidRule`, naming the offending variable
    pub fn build(self) -> Result<RuleSet> {
        let population = self.population.unwrap_or(Expr::AlwaysTrue);
        let variables = self.variables;

        let mut slots = FxHashMap::default();
        for variable in &variables {
            declare(variable, &mut slots)?;
        }

        let top_level: FxHashMap<&str, usize> = variables
            .iter()
            .enumerate()
            .map(|(idx, v)| (v.name.as_str(), idx))
            .collect();

        let dependencies = variables
            .iter()
            .map(|variable| {
                let mut deps = BTreeSet::new();
                resolve_references(variable, &[], &top_level, &mut deps)?;
                Ok(deps)
            })
            .collect::<Result<Vec<_>>>()?;

        let order = topological_order(&variables, &dependencies)?;

        let mut checker = ShapeChecker {
            slots: &slots,
            shapes: vec![None; slots.len()],
            sources: vec![false; slots.len()],
        };
        for &idx in &order {
            checker.check_variable(&variables[idx])?;
        }

        for reference in population.required_variables() {
            if !top_level.contains_key(reference) {
                return Err(CohortError::UnknownVariable {
                    variable: "population".to_string(),
                    reference: reference.to_string(),
                });
            }
        }
        checker.check_comparisons("population", &population)?;

        let shapes = checker
            .shapes
            .into_iter()
            .map(|shape| shape.unwrap_or(Shape::Flag))
            .collect();

        log::info!(
            "Validated rule set: {} variables, {} including locals",
            variables.len(),
            slots.len()
        );
        log::debug!(
            "Evaluation order: {}",
            order.iter().map(|&i| variables[i].name.as_str()).join(", ")
        );

        Ok(RuleSet {
            variables,
            order,
            shapes,
            slots,
            population,
        })
    }
}

fn declare(variable: &Variable, slots: &mut FxHashMap<String, usize>) -> Result<()> {
    let next = slots.len();
    if slots.insert(variable.name.clone(), next).is_some() {
        return Err(CohortError::DuplicateVariable(variable.name.clone()));
    }
    for local in variable.rule.locals() {
        declare(local, slots)?;
    }
    Ok(())
}

/// Record the top-level variables `owner` depends on, through its locals too
fn resolve_references<'a>(
    owner: &'a Variable,
    outer: &[&'a str],
    top_level: &FxHashMap<&str, usize>,
    deps: &mut BTreeSet<usize>,
) -> Result<()> {
    let mut visible: Vec<&str> = outer.to_vec();
    for local in owner.rule.locals() {
        resolve_references(local, &visible, top_level, deps)?;
        visible.push(&local.name);
    }

    for reference in owner.rule.references() {
        if visible.contains(&reference) {
            continue;
        }
        if let Some(&idx) = top_level.get(reference) {
            deps.insert(idx);
        } else if reference == owner.name {
            return Err(CohortError::CyclicDependency(vec![
                owner.name.clone(),
                owner.name.clone(),
            ]));
        } else {
            return Err(CohortError::UnknownVariable {
                variable: owner.name.clone(),
                reference: reference.to_string(),
            });
        }
    }
    Ok(())
}

/// Kahn's algorithm; among ready variables the earliest declared goes first
fn topological_order(variables: &[Variable], dependencies: &[BTreeSet<usize>]) -> Result<Vec<usize>> {
    let n = variables.len();
    let mut pending = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (idx, deps) in dependencies.iter().enumerate() {
        for &dep in deps {
            pending[idx] += 1;
            dependents[dep].push(idx);
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(idx) = ready.pop_first() {
        order.push(idx);
        for &dependent in &dependents[idx] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() == n {
        return Ok(order);
    }

    // Every unprocessed variable waits on another unprocessed one, so walking
    // dependencies from any of them must revisit a node.
    let blocked = |i: usize| pending[i] > 0;
    let mut path: Vec<usize> = Vec::new();
    let mut current = (0..n).find(|&i| blocked(i)).unwrap_or_default();
    loop {
        if let Some(pos) = path.iter().position(|&i| i == current) {
            let mut cycle: Vec<String> = path[pos..]
                .iter()
                .map(|&i| variables[i].name.clone())
                .collect();
            cycle.push(variables[current].name.clone());
            return Err(CohortError::CyclicDependency(cycle));
        }
        path.push(current);
        match dependencies[current].iter().copied().find(|&d| blocked(d)) {
            Some(next) => current = next,
            None => {
                return Err(CohortError::CyclicDependency(
                    path.iter().map(|&i| variables[i].name.clone()).collect(),
                ));
            }
        }
    }
}

struct ShapeChecker<'a> {
    slots: &'a FxHashMap<String, usize>,
    shapes: Vec<Option<Shape>>,
    sources: Vec<bool>,
}

impl ShapeChecker<'_> {
    fn shape_of(&self, owner: &str, name: &str) -> Result<Shape> {
        self.slots
            .get(name)
            .and_then(|&slot| self.shapes[slot])
            .ok_or_else(|| CohortError::UnknownVariable {
                variable: owner.to_string(),
                reference: name.to_string(),
            })
    }

    fn check_variable(&mut self, variable: &Variable) -> Result<()> {
        for local in variable.rule.locals() {
            self.check_variable(local)?;
        }

        let name = variable.name.as_str();
        for date in variable.rule.date_exprs() {
            if let Some(reference) = date.variable() {
                let shape = self.shape_of(name, reference)?;
                if shape != Shape::Date {
                    return Err(CohortError::shape_mismatch(
                        name,
                        format!("'{reference}' is a {shape} but is used as a date in '{date}'"),
                    ));
                }
            }
        }

        let shape = match &variable.rule {
            Rule::Source(source) => {
                check_source(name, source)?;
                source.shape()
            }
            Rule::MinimumOf(operands) | Rule::MaximumOf(operands) => {
                self.extremum_shape(name, operands)?
            }
            Rule::DateOf(target) => {
                self.shape_of(name, target)?;
                let is_source = self.slots.get(target).is_some_and(|&s| self.sources[s]);
                if !is_source {
                    return Err(CohortError::shape_mismatch(
                        name,
                        format!("date_of('{target}') must refer to a source rule"),
                    ));
                }
                Shape::Date
            }
            Rule::Satisfying { expr, .. } => {
                self.check_comparisons(name, expr)?;
                Shape::Flag
            }
            Rule::CategorisedAs { categories, .. } => {
                for (_, condition) in categories.conditions() {
                    self.check_comparisons(name, condition)?;
                }
                Shape::Category
            }
            Rule::AddressAsOf {
                attribute: AddressAttribute::ImdRank { round_to_nearest: Some(0) },
                ..
            } => {
                return Err(CohortError::invalid_rule(name, "round_to_nearest must be positive"));
            }
            other => other.intrinsic_shape().unwrap_or(Shape::Flag),
        };

        if let Some(&slot) = self.slots.get(name) {
            self.shapes[slot] = Some(shape);
            self.sources[slot] = matches!(variable.rule, Rule::Source(_));
        }
        Ok(())
    }

    fn extremum_shape(&self, name: &str, operands: &[String]) -> Result<Shape> {
        if operands.is_empty() {
            return Err(CohortError::invalid_rule(name, "needs at least one operand"));
        }
        let shapes = operands
            .iter()
            .map(|operand| self.shape_of(name, operand))
            .collect::<Result<Vec<_>>>()?;

        if shapes.iter().all(|s| *s == Shape::Date) {
            Ok(Shape::Date)
        } else if shapes.iter().all(|s| *s == Shape::Integer) {
            Ok(Shape::Integer)
        } else if shapes.iter().all(|s| s.is_numeric()) {
            Ok(Shape::Float)
        } else {
            let listed = operands
                .iter()
                .zip(&shapes)
                .map(|(operand, shape)| format!("{operand}: {shape}"))
                .join(", ");
            Err(CohortError::shape_mismatch(
                name,
                format!("operands must all be dates or all numbers ({listed})"),
            ))
        }
    }

    fn check_comparisons(&self, name: &str, expr: &Expr) -> Result<()> {
        for (left, operand) in expr.comparisons() {
            let left_shape = self.shape_of(name, left)?;
            let compatible = match operand {
                Operand::Literal(value) => left_shape.accepts(value),
                Operand::Var(right) => left_shape.comparable_with(self.shape_of(name, right)?),
            };
            if !compatible {
                return Err(CohortError::shape_mismatch(
                    name,
                    format!("'{left}' ({left_shape}) cannot be compared with {operand:?}"),
                ));
            }
        }
        for (left, values) in expr.memberships() {
            let left_shape = self.shape_of(name, left)?;
            if let Some(value) = values.iter().find(|value| !left_shape.accepts(value)) {
                return Err(CohortError::shape_mismatch(
                    name,
                    format!("'{left}' ({left_shape}) can never equal {value:?}"),
                ));
            }
        }
        Ok(())
    }
}

fn check_source(name: &str, source: &SourceRule) -> Result<()> {
    if !source.query.supports(&source.returning) {
        return Err(CohortError::invalid_rule(
            name,
            format!(
                "{} records have no {:?} attribute",
                source.query.table(),
                source.returning
            ),
        ));
    }
    if source.returning == Returning::Category(CategorySource::Codelist) {
        let categorised = source
            .query
            .codelist()
            .is_some_and(|list| list.entries().any(|(_, category)| category.is_some()));
        if !categorised {
            return Err(CohortError::invalid_rule(
                name,
                "returning a category needs a categorised codelist",
            ));
        }
    }
    Ok(())
}

/// A validated, immutable set of variable definitions
#[derive(Debug, Clone)]
pub struct RuleSet {
    variables: Vec<Variable>,
    order: Vec<usize>,
    shapes: Vec<Shape>,
    slots: FxHashMap<String, usize>,
    population: Expr,
}

impl RuleSet {
    #[must_use]
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::new()
    }

    /// Top-level variables in declaration order
    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Top-level variables in evaluation order
    pub fn evaluation_order(&self) -> impl Iterator<Item = &Variable> {
        self.order.iter().map(|&idx| &self.variables[idx])
    }

    #[must_use]
    pub const fn population(&self) -> &Expr {
        &self.population
    }

    /// Output columns: one per top-level variable, in declaration order
    #[must_use]
    pub fn columns(&self) -> Vec<Column> {
        self.variables
            .iter()
            .map(|v| Column::new(v.name.clone(), self.shape(&v.name).unwrap_or(Shape::Flag)))
            .collect()
    }

    /// Shape of any declared variable, locals included
    #[must_use]
    pub fn shape(&self, name: &str) -> Option<Shape> {
        self.slots.get(name).map(|&slot| self.shapes[slot])
    }

    /// Storage slot of any declared variable, locals included
    #[must_use]
    pub fn slot(&self, name: &str) -> Option<usize> {
        self.slots.get(name).copied()
    }

    pub(crate) const fn slots(&self) -> &FxHashMap<String, usize> {
        &self.slots
    }

    /// Number of slots needed to hold every variable for one patient
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.shapes.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}
