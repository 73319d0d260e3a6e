use thiserror::Error;

use crate::cross_sell::fields::{match_type_supports, FieldCatalog, FieldType};
use crate::cross_sell::value::{shares_dimensions, Operand, ValueError, DEFAULT_NUMERIC_SCALE};
use crate::domain::execution::RuleWarning;
use crate::domain::product::{Product, ProductId};
use crate::domain::rule::{CrossSellingRule, MatchType, RuleTargetCriteria};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("value of `{field}` on the source product cannot be used for matching: {source}")]
    SourceValue { field: String, source: ValueError },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledCriterion {
    pub field: String,
    pub field_type: FieldType,
    pub match_type: MatchType,
    /// Literal to compare against; `None` compares against the source product.
    pub literal: Option<Operand>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Criterion {
    Valid(CompiledCriterion),
    NeverMatches,
}

#[derive(Clone, Debug, Default)]
pub struct CompiledCriteria {
    pub criteria: Vec<Criterion>,
    pub warnings: Vec<RuleWarning>,
}

/// Criterion with its reference value resolved for one source product.
struct Bound<'c> {
    criterion: &'c CompiledCriterion,
    reference: Operand,
}

#[derive(Clone, Copy, Debug)]
pub struct TargetMatcher {
    scale: u32,
}

impl Default for TargetMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_NUMERIC_SCALE)
    }
}

impl TargetMatcher {
    pub fn new(scale: u32) -> Self {
        Self { scale }
    }

    pub fn compile(&self, rule: &CrossSellingRule, catalog: &FieldCatalog) -> CompiledCriteria {
        let mut compiled = CompiledCriteria::default();

        for criteria in &rule.target_criteria {
            match compile_criterion(criteria, catalog) {
                Ok(valid) => compiled.criteria.push(Criterion::Valid(valid)),
                Err(message) => {
                    compiled.criteria.push(Criterion::NeverMatches);
                    compiled.warnings.push(RuleWarning {
                        rule_id: rule.id.clone(),
                        rule_name: rule.name.clone(),
                        field: criteria.field.clone(),
                        message,
                    });
                }
            }
        }

        compiled
    }

    /// Returns the candidates satisfying every criterion relative to `source`, in
    /// candidate order. The source itself and `exclude` are never returned, and an
    /// empty criteria list yields no targets.
    pub fn find_targets<'a, I>(
        &self,
        source: &Product,
        criteria: &[Criterion],
        candidates: I,
        exclude: &ProductId,
    ) -> Result<Vec<&'a Product>, MatchError>
    where
        I: IntoIterator<Item = &'a Product>,
    {
        if criteria.is_empty() {
            return Ok(Vec::new());
        }

        let mut bound = Vec::with_capacity(criteria.len());
        for criterion in criteria {
            let Criterion::Valid(criterion) = criterion else {
                return Ok(Vec::new());
            };
            match self.reference_for(source, criterion)? {
                Some(reference) => bound.push(Bound { criterion, reference }),
                None => return Ok(Vec::new()),
            }
        }

        Ok(candidates
            .into_iter()
            .filter(|candidate| candidate.id != source.id && &candidate.id != exclude)
            .filter(|candidate| bound.iter().all(|entry| self.satisfies(candidate, entry)))
            .collect())
    }

    /// `Ok(None)` when the source carries no value for a relational criterion; such a
    /// source has no targets for this rule.
    fn reference_for(
        &self,
        source: &Product,
        criterion: &CompiledCriterion,
    ) -> Result<Option<Operand>, MatchError> {
        if let Some(literal) = &criterion.literal {
            return Ok(Some(literal.clone()));
        }
        let Some(raw) = source.field_value(&criterion.field) else {
            return Ok(None);
        };
        Operand::from_field_value(&raw, criterion.field_type)
            .map(Some)
            .map_err(|error| MatchError::SourceValue { field: criterion.field.clone(), source: error })
    }

    fn satisfies(&self, candidate: &Product, entry: &Bound<'_>) -> bool {
        let criterion = entry.criterion;
        let Some(raw) = candidate.field_value(&criterion.field) else {
            return false;
        };
        let Ok(value) = Operand::from_field_value(&raw, criterion.field_type) else {
            return false;
        };

        match criterion.match_type {
            MatchType::Exact | MatchType::SameProperty => {
                value.equals(&entry.reference, self.scale).unwrap_or(false)
            }
            MatchType::Contains => value.contains(&entry.reference).unwrap_or(false),
            MatchType::SameDimensions => match (&value, &entry.reference) {
                (Operand::Dimensions(candidate), Operand::Dimensions(source)) => {
                    shares_dimensions(candidate, source, self.scale)
                }
                _ => false,
            },
        }
    }
}

fn compile_criterion(
    criteria: &RuleTargetCriteria,
    catalog: &FieldCatalog,
) -> Result<CompiledCriterion, String> {
    let key = criteria.field.trim();
    if key.is_empty() {
        return Err("target criterion has no field".to_owned());
    }
    let descriptor =
        catalog.resolve_field(key).ok_or_else(|| format!("unknown field `{key}`"))?;

    if !match_type_supports(criteria.match_type, descriptor.field_type) {
        return Err(format!(
            "match type `{}` is not supported for {} field `{key}`",
            criteria.match_type.as_str(),
            descriptor.field_type
        ));
    }

    let literal = match (&criteria.value, criteria.match_type.is_relational_only()) {
        (Some(raw), false) if !raw.is_null() => Some(
            Operand::from_literal(raw, descriptor.field_type)
                .map_err(|error| format!("invalid value for `{key}`: {error}"))?,
        ),
        _ => None,
    };

    Ok(CompiledCriterion {
        field: key.to_owned(),
        field_type: descriptor.field_type,
        match_type: criteria.match_type,
        literal,
    })
}
