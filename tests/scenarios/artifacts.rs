//! Test: plugin artifacts and artifact staging

use crate::helpers::*;
use ci_runner::core::{
    ContainerDetails, MountPath, RefPlugins, StageType, StageVariableTable, Step, VariableFormat,
    VariableObject,
};
use std::collections::HashMap;

const PUSH_V1: &str = r#"{"Kind":"PluginArtifacts","Artifacts":[{
    "Type":"CONTAINER","Data":["registry.local/app:1"],
    "CredentialsSourceType":"global_container_registry","CredentialSourceValue":"hub",
    "createdByPluginIdentifier":"copy-image","createdOn":"2024-03-01T10:00:00Z"}]}"#;

const PUSH_V2: &str = r#"{"Kind":"PluginArtifacts","Artifacts":[{
    "Type":"CONTAINER","Data":["registry.local/app:1","registry.local/app:2"],
    "CredentialsSourceType":"global_container_registry","CredentialSourceValue":"hub",
    "createdByPluginIdentifier":"copy-image","createdOn":"2024-03-02T10:00:00Z"}]}"#;

const OTHER_REGISTRY: &str = r#"{"Kind":"PluginArtifacts","Artifacts":[{
    "Type":"CONTAINER","Data":["quay.io/app:1"],
    "CredentialsSourceType":"global_container_registry","CredentialSourceValue":"quay",
    "createdByPluginIdentifier":"copy-image","createdOn":"2024-03-02T10:00:00Z"}]}"#;

#[tokio::test]
async fn test_side_file_artifacts_are_merged_and_consumed() {
    let stage = TestStage::new();
    stage
        .executor
        .respond("push-1", MockResponse::default().with_plugin_artifacts(PUSH_V1));
    stage
        .executor
        .respond("push-2", MockResponse::default().with_plugin_artifacts(PUSH_V2));
    stage
        .executor
        .respond("push-3", MockResponse::default().with_plugin_artifacts(OTHER_REGISTRY));

    let mut steps = vec![
        Step::shell("push one", 1, "push-1"),
        Step::shell("push two", 2, "push-2"),
        Step::shell("push three", 3, "push-3"),
    ];
    let outcome = stage.run_simple(StageType::PreCi, &mut steps).await.unwrap();

    let artifacts = &outcome.artifacts.artifacts;
    assert_eq!(artifacts.len(), 2);
    assert_eq!(
        artifacts[0].data,
        vec!["registry.local/app:1".to_string(), "registry.local/app:2".to_string()]
    );
    assert_eq!(artifacts[1].data, vec!["quay.io/app:1".to_string()]);
    assert!(!stage.workspace().plugin_artifacts_file.exists());
}

#[tokio::test]
async fn test_malformed_side_file_does_not_fail_step() {
    let stage = TestStage::new();
    stage
        .executor
        .respond("push", MockResponse::default().with_plugin_artifacts("{ not json"));

    let mut steps = vec![Step::shell("push", 1, "push")];
    let outcome = stage.run_simple(StageType::PreCi, &mut steps).await.unwrap();

    assert!(outcome.artifacts.is_empty());
    assert!(!stage.workspace().plugin_artifacts_file.exists());
}

#[tokio::test]
async fn test_plugin_artifacts_bubble_up_to_caller() {
    let stage = TestStage::new();
    stage
        .executor
        .respond("copy-image", MockResponse::default().with_plugin_artifacts(PUSH_V1));
    let copy_plugin = plugin(3, "copy-container-image", vec![Step::shell("copy", 1, "copy-image")]);

    let mut steps = vec![Step::ref_plugin("copy image", 1, 3)];
    let outcome = stage
        .run(
            StageType::PostCi,
            &mut steps,
            &plugins(vec![copy_plugin]),
            &HashMap::new(),
            &StageVariableTable::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.artifacts.artifacts.len(), 1);
    assert_eq!(outcome.artifacts.artifacts[0].created_by_plugin_identifier, "copy-image");
}

#[tokio::test]
async fn test_failed_step_keeps_its_side_file_artifacts() {
    let stage = TestStage::new();
    stage.executor.respond(
        "push-then-crash",
        MockResponse::failure("registry timeout").with_plugin_artifacts(PUSH_V1),
    );

    let mut steps = vec![Step::shell("push", 1, "push-then-crash")];
    let failure = stage.run_simple(StageType::PreCi, &mut steps).await.unwrap_err();

    assert_eq!(failure.step.name, "push");
    assert_eq!(failure.artifacts.artifacts.len(), 1);
    assert_eq!(failure.artifacts.artifacts[0].data, vec!["registry.local/app:1".to_string()]);
    assert!(!stage.workspace().plugin_artifacts_file.exists());
}

#[tokio::test]
async fn test_failed_plugin_keeps_inner_artifacts() {
    let stage = TestStage::new();
    stage
        .executor
        .respond("copy-image", MockResponse::default().with_plugin_artifacts(PUSH_V1));
    stage
        .executor
        .respond("verify-image", MockResponse::failure("digest mismatch"));
    let copy_plugin = plugin(
        3,
        "copy-container-image",
        vec![
            Step::shell("copy", 1, "copy-image"),
            Step::shell("verify", 2, "verify-image"),
        ],
    );

    let mut steps = vec![Step::ref_plugin("copy image", 1, 3)];
    let failure = stage
        .run(
            StageType::PostCi,
            &mut steps,
            &plugins(vec![copy_plugin]),
            &HashMap::new(),
            &StageVariableTable::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(failure.step.name, "copy image");
    assert_eq!(failure.artifacts.artifacts.len(), 1);
    assert_eq!(failure.artifacts.artifacts[0].created_by_plugin_identifier, "copy-image");
}

#[tokio::test]
async fn test_shell_artifact_paths_are_staged() {
    let stage = TestStage::new();
    let report = stage.dir.path().join("src").join("report.xml");
    stage
        .executor
        .respond("test.sh", MockResponse::default().with_touch(&report));

    let mut steps = vec![Step::shell("unit tests", 1, "test.sh").with_artifact_paths(vec![
        report.display().to_string(),
        stage.dir.path().join("missing").display().to_string(),
    ])];
    stage.run_simple(StageType::PreCi, &mut steps).await.unwrap();

    let staging_root = &stage.workspace().staging_root;
    let staged: Vec<_> = walk(staging_root)
        .into_iter()
        .filter(|p| p.ends_with("report.xml"))
        .collect();
    assert_eq!(staged.len(), 1);
    assert!(staged[0].starts_with(staging_root.join("unit_tests")));
}

#[tokio::test]
async fn test_container_step_mounts() {
    let stage = TestStage::new();
    let container = ContainerDetails {
        image: "node:20".to_string(),
        command: Some("sh".to_string()),
        args: vec!["/scripts/run.sh".to_string()],
        custom_script_mount: Some(MountPath::new("", "/scripts/run.sh")),
        source_code_mount: Some(MountPath::new("/workspace/src", "/src")),
        extra_volume_mounts: vec![MountPath::new("/cache", "/root/.npm")],
    };
    let mut step = Step::container("bundle", 1, container)
        .with_artifact_paths(vec!["/src/dist".to_string()])
        .with_inputs(vec![VariableObject::value("NODE_ENV", "production", VariableFormat::String)])
        .with_outputs(vec![VariableObject::value("SIZE", "", VariableFormat::Number)]);
    step.script = "npm run build".to_string();
    step.exposed_ports.insert(8080, 80);

    stage
        .executor
        .respond("node:20", MockResponse::outputs(&[("SIZE", "1024")]));

    let mut steps = vec![step];
    let outcome = stage
        .run(
            StageType::PreCi,
            &mut steps,
            &RefPlugins::new(),
            &HashMap::new(),
            &StageVariableTable::new(),
        )
        .await
        .unwrap();

    let calls = stage.executor.calls();
    let request = match &calls[0] {
        Invocation::Container(request) => request.clone(),
        other => panic!("expected a container call, got {:?}", other),
    };
    let scratch = &stage.workspace().scratch_dir;

    assert_eq!(request.command.as_deref(), Some("sh"));
    assert_eq!(request.env.get("NODE_ENV"), Some(&"production".to_string()));
    assert_eq!(request.ports.get(&8080), Some(&80));
    assert_eq!(request.output_names, vec!["SIZE".to_string()]);

    let destinations: Vec<_> = request.mounts.iter().map(|m| m.dst_path.as_str()).collect();
    assert_eq!(destinations, vec!["/scripts/run.sh", "/src", "/root/.npm", "/src/dist"]);

    let script_src = std::path::Path::new(&request.mounts[0].src_path);
    assert!(script_src.starts_with(scratch));
    assert_eq!(std::fs::read_to_string(script_src).unwrap(), "npm run build");
    assert!(std::path::Path::new(&request.mounts[3].src_path).starts_with(scratch));

    assert_eq!(
        outcome.stage_table.lookup(1, "SIZE").map(|v| v.value.as_str()),
        Some("1024")
    );
}

fn walk(root: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(root) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(walk(&path));
            } else {
                files.push(path);
            }
        }
    }
    files
}
