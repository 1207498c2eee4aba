//! Test: trigger/skip conditions decide whether a step runs

use crate::helpers::*;
use ci_runner::core::{
    ConditionObject, ConditionType, StageType, Step, VariableFormat, VariableObject,
};
use ci_runner::execution::StageEvent;

fn deploy_step(deploy: &str, condition_type: ConditionType) -> Step {
    Step::shell("deploy", 1, "deploy.sh")
        .with_inputs(vec![VariableObject::value("DEPLOY", deploy, VariableFormat::Bool)])
        .with_outputs(vec![VariableObject::value("URL", "", VariableFormat::String)])
        .with_trigger_skip(vec![ConditionObject::new(condition_type, "DEPLOY", "==", "true")])
}

#[tokio::test]
async fn test_gated_off_step_is_a_no_op() {
    let stage = TestStage::new();
    let scratch = stage.workspace().scratch_dir.clone();
    std::fs::create_dir_all(&scratch).unwrap();
    let leftover = scratch.join("leftover.txt");
    std::fs::write(&leftover, "from a previous step").unwrap();

    let mut steps = vec![deploy_step("false", ConditionType::Trigger)];
    let outcome = stage.run_simple(StageType::PreCi, &mut steps).await.unwrap();

    assert!(stage.executor.calls().is_empty());
    assert!(!outcome.stage_table.contains_step(1));
    assert!(outcome.artifacts.is_empty());
    // Scratch area untouched
    assert!(leftover.exists());
    // Declared outputs left as they were
    assert_eq!(steps[0].output_vars[0].value, "");

    assert!(stage.events().iter().any(|e| matches!(
        e,
        StageEvent::StepSkipped { step_name, .. } if step_name == "deploy"
    )));
}

#[tokio::test]
async fn test_running_step_starts_with_empty_scratch() {
    let stage = TestStage::new();
    let scratch = stage.workspace().scratch_dir.clone();
    std::fs::create_dir_all(&scratch).unwrap();
    let leftover = scratch.join("leftover.txt");
    std::fs::write(&leftover, "from a previous step").unwrap();
    let fresh = scratch.join("fresh.txt");
    stage
        .executor
        .respond("deploy.sh", MockResponse::default().with_touch(&fresh));

    let mut steps = vec![deploy_step("true", ConditionType::Trigger)];
    stage.run_simple(StageType::PreCi, &mut steps).await.unwrap();

    assert_eq!(stage.executor.call_keys(), vec!["deploy.sh".to_string()]);
    assert!(!leftover.exists());
    assert!(fresh.exists());
}

#[tokio::test]
async fn test_trigger_condition_met_runs_step() {
    let stage = TestStage::new();
    stage
        .executor
        .respond("deploy.sh", MockResponse::outputs(&[("URL", "https://staging")]));

    let mut steps = vec![deploy_step("true", ConditionType::Trigger)];
    let outcome = stage.run_simple(StageType::PreCi, &mut steps).await.unwrap();

    assert_eq!(stage.executor.call_keys(), vec!["deploy.sh"]);
    assert_eq!(
        outcome.stage_table.lookup(1, "URL").map(|v| v.value.as_str()),
        Some("https://staging")
    );
}

#[tokio::test]
async fn test_skip_condition_inverts_polarity() {
    let stage = TestStage::new();

    let mut skipped = vec![deploy_step("true", ConditionType::Skip)];
    stage.run_simple(StageType::PreCi, &mut skipped).await.unwrap();
    assert!(stage.executor.calls().is_empty());

    let mut runs = vec![deploy_step("false", ConditionType::Skip)];
    stage.run_simple(StageType::PreCi, &mut runs).await.unwrap();
    assert_eq!(stage.executor.call_keys(), vec!["deploy.sh"]);
}

#[tokio::test]
async fn test_malformed_gate_fails_stage() {
    let stage = TestStage::new();
    let step = Step::shell("deploy", 1, "deploy.sh")
        .with_inputs(vec![VariableObject::value("DEPLOY", "true", VariableFormat::Bool)])
        .with_trigger_skip(vec![ConditionObject::new(ConditionType::Trigger, "DEPLOY", "=~", "true")]);

    let failure = stage.run_simple(StageType::PreCi, &mut [step]).await.unwrap_err();
    assert_eq!(failure.step.name, "deploy");
    assert!(stage.executor.calls().is_empty());
}
