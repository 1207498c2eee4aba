//! Test: success/failure conditions judge finished steps

use crate::helpers::*;
use ci_runner::core::{
    ConditionObject, ConditionType, EngineError, StageType, Step, VariableFormat, VariableObject,
};

fn coverage_step(condition_type: ConditionType, operator: &str, threshold: &str) -> Step {
    Step::shell("coverage", 1, "coverage.sh")
        .with_outputs(vec![VariableObject::value("COVERAGE", "", VariableFormat::Number)])
        .with_success_failure(vec![ConditionObject::new(
            condition_type,
            "COVERAGE",
            operator,
            threshold,
        )])
}

#[tokio::test]
async fn test_pass_condition_accepts_step() {
    let stage = TestStage::new();
    stage
        .executor
        .respond("coverage.sh", MockResponse::outputs(&[("COVERAGE", "87.5")]));

    let mut steps = vec![coverage_step(ConditionType::Pass, ">=", "80")];
    let outcome = stage.run_simple(StageType::PreCi, &mut steps).await.unwrap();

    assert!(outcome.stage_table.contains_step(1));
}

#[tokio::test]
async fn test_pass_condition_rejects_step() {
    let stage = TestStage::new();
    stage
        .executor
        .respond("coverage.sh", MockResponse::outputs(&[("COVERAGE", "42")]));
    let marker = stage.dir.path().join("after");
    stage
        .executor
        .respond("after.sh", MockResponse::default().with_touch(&marker));

    let mut steps = vec![
        coverage_step(ConditionType::Pass, ">=", "80"),
        Step::shell("after", 2, "after.sh"),
    ];
    let failure = stage.run_simple(StageType::PreCi, &mut steps).await.unwrap_err();

    assert!(failure.is_condition_failure());
    assert_eq!(
        failure.error.to_string(),
        "stage not successful because of condition failure"
    );
    assert_eq!(failure.step.name, "coverage");
    // Outputs were finalized but never recorded
    assert_eq!(failure.step.output_vars[0].value, "42");
    assert!(!failure.stage_table.contains_step(1));
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_fail_condition_inverts_polarity() {
    let stage = TestStage::new();
    stage
        .executor
        .respond("coverage.sh", MockResponse::outputs(&[("COVERAGE", "42")]));

    let mut steps = vec![coverage_step(ConditionType::Fail, "<", "50")];
    let failure = stage.run_simple(StageType::PreCi, &mut steps).await.unwrap_err();
    assert!(failure.is_condition_failure());

    let mut steps = vec![coverage_step(ConditionType::Fail, "<", "10")];
    assert!(stage.run_simple(StageType::PreCi, &mut steps).await.is_ok());
}

#[tokio::test]
async fn test_condition_on_missing_output_is_an_evaluation_error() {
    let stage = TestStage::new();

    // No COVERAGE captured, so the output is dropped before evaluation
    let mut steps = vec![coverage_step(ConditionType::Pass, ">=", "80")];
    let failure = stage.run_simple(StageType::PreCi, &mut steps).await.unwrap_err();

    assert!(matches!(failure.error, EngineError::ConditionEvaluation(_)));
    assert!(!failure.is_condition_failure());
    assert!(failure.step.output_vars.is_empty());
}

#[tokio::test]
async fn test_output_type_error_fails_step() {
    let stage = TestStage::new();
    stage
        .executor
        .respond("coverage.sh", MockResponse::outputs(&[("COVERAGE", "lots")]));

    let mut steps = vec![coverage_step(ConditionType::Pass, ">=", "80")];
    let failure = stage.run_simple(StageType::PreCi, &mut steps).await.unwrap_err();

    assert!(matches!(failure.error, EngineError::Conversion { .. }));
}
