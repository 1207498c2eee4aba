//! Trigger/skip and success/failure conditions

use crate::core::{error::EngineError, format::TypedValue, variable::VariableObject};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

/// What a condition list decides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionType {
    /// Run the step only when all conditions hold
    Trigger,
    /// Run the step unless all conditions hold
    Skip,
    /// The step succeeded when all conditions hold
    Pass,
    /// The step failed when all conditions hold
    Fail,
}

/// One comparison between a variable and a literal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionObject {
    pub condition_type: ConditionType,
    pub condition_on_variable: String,
    pub conditional_operator: String,
    pub conditional_value: String,
}

impl ConditionObject {
    pub fn new(condition_type: ConditionType, variable: &str, operator: &str, value: &str) -> Self {
        Self {
            condition_type,
            condition_on_variable: variable.to_string(),
            conditional_operator: operator.to_string(),
            conditional_value: value.to_string(),
        }
    }
}

/// Comparison operators understood by the evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FromStr for ComparisonOperator {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "==" => Ok(ComparisonOperator::Eq),
            "!=" => Ok(ComparisonOperator::Ne),
            ">" => Ok(ComparisonOperator::Gt),
            ">=" => Ok(ComparisonOperator::Gte),
            "<" => Ok(ComparisonOperator::Lt),
            "<=" => Ok(ComparisonOperator::Lte),
            other => Err(EngineError::ConditionEvaluation(format!(
                "unknown operator '{}'",
                other
            ))),
        }
    }
}

impl ComparisonOperator {
    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonOperator::Eq => ordering == Ordering::Equal,
            ComparisonOperator::Ne => ordering != Ordering::Equal,
            ComparisonOperator::Gt => ordering == Ordering::Greater,
            ComparisonOperator::Gte => ordering != Ordering::Less,
            ComparisonOperator::Lt => ordering == Ordering::Less,
            ComparisonOperator::Lte => ordering != Ordering::Greater,
        }
    }

    fn is_equality(&self) -> bool {
        matches!(self, ComparisonOperator::Eq | ComparisonOperator::Ne)
    }

    /// Apply the operator to two typed operands
    pub fn apply(&self, left: &TypedValue, right: &TypedValue) -> Result<bool, EngineError> {
        let ordering = match (left, right) {
            (TypedValue::Number(l), TypedValue::Number(r)) => l.partial_cmp(r).ok_or_else(|| {
                EngineError::ConditionEvaluation(format!("cannot compare {} and {}", l, r))
            })?,
            (TypedValue::String(l), TypedValue::String(r)) => l.cmp(r),
            (TypedValue::Bool(l), TypedValue::Bool(r)) if self.is_equality() => l.cmp(r),
            (TypedValue::Bool(_), TypedValue::Bool(_)) => {
                return Err(EngineError::ConditionEvaluation(format!(
                    "operator {:?} is not defined for bool operands",
                    self
                )))
            }
            (l, r) => {
                return Err(EngineError::ConditionEvaluation(format!(
                    "type mismatch: {} vs {}",
                    l.kind(),
                    r.kind()
                )))
            }
        };
        Ok(self.accepts(ordering))
    }
}

/// Evaluate a single condition against the available variables.
///
/// The literal comparand is converted with the format of the variable it is
/// compared to.
pub fn evaluate(condition: &ConditionObject, variables: &[VariableObject]) -> Result<bool, EngineError> {
    let by_name: HashMap<&str, &VariableObject> =
        variables.iter().map(|v| (v.name.as_str(), v)).collect();

    let variable = by_name
        .get(condition.condition_on_variable.as_str())
        .ok_or_else(|| {
            EngineError::ConditionEvaluation(format!(
                "variable '{}' not found for condition",
                condition.condition_on_variable
            ))
        })?;

    let left = variable.typed()?;
    let right = crate::core::format::convert(&condition.conditional_value, variable.format)?;
    let operator: ComparisonOperator = condition.conditional_operator.parse()?;

    operator.apply(&left, &right)
}

/// AND-reduce all conditions; the first error aborts the whole list
fn all_hold(conditions: &[ConditionObject], variables: &[VariableObject]) -> Result<bool, EngineError> {
    let mut result = true;
    for condition in conditions {
        result &= evaluate(condition, variables)?;
    }
    Ok(result)
}

/// Decide whether a step should run.
///
/// The type of the first condition governs the whole list; mixed lists are
/// not validated.
pub fn should_trigger(conditions: &[ConditionObject], variables: &[VariableObject]) -> Result<bool, EngineError> {
    let Some(first) = conditions.first() else {
        return Ok(true);
    };
    let result = all_hold(conditions, variables)?;
    match first.condition_type {
        ConditionType::Trigger => Ok(result),
        ConditionType::Skip => Ok(!result),
        other => Err(EngineError::ConditionEvaluation(format!(
            "{:?} conditions cannot gate step execution",
            other
        ))),
    }
}

/// Decide whether a finished step counts as successful
pub fn is_success(conditions: &[ConditionObject], variables: &[VariableObject]) -> Result<bool, EngineError> {
    let Some(first) = conditions.first() else {
        return Ok(true);
    };
    let result = all_hold(conditions, variables)?;
    match first.condition_type {
        ConditionType::Pass => Ok(result),
        ConditionType::Fail => Ok(!result),
        other => Err(EngineError::ConditionEvaluation(format!(
            "{:?} conditions cannot decide step success",
            other
        ))),
    }
}
