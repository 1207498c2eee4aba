//! Test: end-to-end examples of resolution, evaluation and gating

use crate::helpers::*;
use ci_runner::core::condition::evaluate;
use ci_runner::core::{
    ConditionObject, ConditionType, StageType, StageVariableTable, Step, TypedValue, VariableFormat,
    VariableObject, VariableType,
};
use ci_runner::execution::{resolve_variables, VariableScopes};
use std::collections::HashMap;

fn pre_table() -> StageVariableTable {
    let mut table = StageVariableTable::new();
    table.record(1, &[VariableObject::value("age", "20", VariableFormat::String)]);
    table
}

#[test]
fn test_literal_value_is_untouched() {
    let global = HashMap::new();
    let empty = StageVariableTable::new();
    let scopes = VariableScopes::for_stage(StageType::PreCi, &global, &empty, &empty);
    let desired = vec![VariableObject::value("age", "20", VariableFormat::Number)];

    let resolved = resolve_variables(&desired, &scopes).unwrap();
    assert_eq!(resolved, desired);
    assert!(resolved[0].typed_value.is_none());
}

#[test]
fn test_global_reference_is_typed() {
    let global = map(&[("age", "20")]);
    let empty = StageVariableTable::new();
    let scopes = VariableScopes::for_stage(StageType::PreCi, &global, &empty, &empty);
    let desired = vec![VariableObject::reference(
        "age",
        VariableType::RefGlobal,
        0,
        "age",
        VariableFormat::Number,
    )];

    let resolved = resolve_variables(&desired, &scopes).unwrap();
    assert_eq!(resolved[0].value, "20");
    assert_eq!(resolved[0].typed_value, Some(TypedValue::Number(20.0)));
}

#[test]
fn test_pre_stage_reference() {
    let global = HashMap::new();
    let pre = pre_table();
    let empty = StageVariableTable::new();
    let scopes = VariableScopes::for_stage(StageType::PostCi, &global, &pre, &empty);
    let desired = vec![VariableObject::reference(
        "age",
        VariableType::RefPreCi,
        1,
        "age",
        VariableFormat::String,
    )];

    let resolved = resolve_variables(&desired, &scopes).unwrap();
    assert_eq!(resolved[0].value, "20");
}

#[test]
fn test_pre_stage_reference_to_missing_step() {
    let global = HashMap::new();
    let mut pre = StageVariableTable::new();
    pre.record(2, &[VariableObject::value("age", "20", VariableFormat::String)]);
    let empty = StageVariableTable::new();
    let scopes = VariableScopes::for_stage(StageType::PostCi, &global, &pre, &empty);
    let desired = vec![VariableObject::reference(
        "age",
        VariableType::RefPreCi,
        1,
        "age",
        VariableFormat::String,
    )];

    let msg = resolve_variables(&desired, &scopes).unwrap_err().to_string();
    assert!(msg.contains("age"));
    assert!(msg.contains("not_found"));
}

#[test]
fn test_number_condition_is_false() {
    let condition = ConditionObject::new(ConditionType::Trigger, "today", ">", "10");
    let variables = vec![VariableObject::value("today", "8", VariableFormat::Number)];

    assert!(!evaluate(&condition, &variables).unwrap());
}

#[tokio::test]
async fn test_skipped_step_returns_nothing() {
    let stage = TestStage::new();
    let step = Step::shell("weekend job", 1, "weekend.sh")
        .with_inputs(vec![VariableObject::value("today", "8", VariableFormat::Number)])
        .with_trigger_skip(vec![ConditionObject::new(ConditionType::Skip, "today", "<", "10")]);

    let outcome = stage.run_simple(StageType::PreCi, &mut [step]).await.unwrap();

    assert!(outcome.artifacts.is_empty());
    assert!(outcome.stage_table.is_empty());
    assert!(stage.executor.calls().is_empty());
}
