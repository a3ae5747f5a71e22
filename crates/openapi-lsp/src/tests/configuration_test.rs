//! Settings changes, engine acquisition and the workspace root

use super::mock_editor::MockEditor;
use super::test_utils::pets_definition;
use crate::coordinator::EngineState;
use crate::errors::CoordinatorError;
use lsp_types::MessageType;
use serde_json::json;

#[tokio::test]
async fn test_engine_is_acquired_once() {
    let mut editor = MockEditor::new();

    editor.coordinator_mut().configuration_changed(json!({})).await;
    assert_eq!(editor.coordinator().engine_state(), &EngineState::Ready);
    assert_eq!(editor.coordinator().engine().runtime_version(), Some("3.0.0"));

    editor
        .coordinator_mut()
        .configuration_changed(json!({ "autorest": { "minimumAutoRestVersion": "9.0.0" } }))
        .await;
    assert_eq!(editor.coordinator().engine_state(), &EngineState::Ready);
}

#[tokio::test]
async fn test_failed_engine_acquisition_is_not_retried() {
    let mut editor = MockEditor::new();

    editor
        .coordinator_mut()
        .configuration_changed(json!({ "autorest": { "minimumAutoRestVersion": "9.0.0" } }))
        .await;
    assert!(matches!(editor.coordinator().engine_state(), EngineState::Failed(_)));
    editor.assert_logged("Unable to get analysis engine runtime");

    editor.coordinator_mut().configuration_changed(json!({})).await;
    assert!(matches!(editor.coordinator().engine_state(), EngineState::Failed(_)));
    assert_eq!(editor.coordinator().engine().runtime_version(), None);
}

#[tokio::test]
async fn test_settings_snapshot_is_replaced() {
    let mut editor = MockEditor::new();

    editor
        .coordinator_mut()
        .configuration_changed(json!({ "autorest": { "information": true, "maxNumberOfProblems": 3 } }))
        .await;
    assert!(editor.coordinator().settings().autorest.information);
    assert_eq!(editor.coordinator().settings().problem_limit(), Some(3));
    editor.assert_logged("Analysis engine runtime acquired.");

    editor.coordinator_mut().configuration_changed(json!({ "autorest": {} })).await;
    assert!(!editor.coordinator().settings().autorest.information);
    assert_eq!(editor.coordinator().settings().problem_limit(), None);
}

#[tokio::test]
async fn test_malformed_settings_fall_back_to_defaults() {
    let mut editor = MockEditor::new();

    editor
        .coordinator_mut()
        .configuration_changed(json!({ "autorest": { "maxNumberOfProblems": "many" } }))
        .await;

    assert_eq!(editor.coordinator().settings().problem_limit(), None);
    assert!(editor
        .client()
        .logs()
        .iter()
        .any(|(typ, line)| *typ == MessageType::WARNING && line.contains("malformed settings")));
}

#[tokio::test]
async fn test_problem_limit_caps_diagnostics_per_file() {
    let mut editor = MockEditor::new();
    editor
        .coordinator_mut()
        .configuration_changed(json!({ "autorest": { "maxNumberOfProblems": 1 } }))
        .await;

    editor.open_document("a.json", &pets_definition(&["Pet_Name", "Pet_Age", "Pet_Owner"])).await;

    editor.assert_diagnostic_count("a.json", 1);
}

#[test]
fn test_root_uri_is_set_once() {
    let mut editor = MockEditor::new();
    let coordinator = editor.coordinator_mut();

    coordinator.set_root_uri(Some("file:///work/")).unwrap();
    let error = coordinator.set_root_uri(Some("file:///other/")).unwrap_err();

    assert!(matches!(error, CoordinatorError::RootAlreadySet { .. }));
    assert_eq!(coordinator.root_uri().map(|uri| uri.as_str()), Some("file:///work/"));
}

#[test]
fn test_missing_root_uri_is_only_reported() {
    let mut editor = MockEditor::new();

    editor.coordinator_mut().set_root_uri(None).unwrap();
    editor.coordinator_mut().set_root_uri(Some("")).unwrap();

    assert_eq!(editor.coordinator().root_uri(), None);
    editor.assert_logged("No workspace uri.");
}

#[test]
fn test_root_path_is_accepted() {
    let mut editor = MockEditor::new();
    let root = editor.root().to_string_lossy().to_string();

    editor.coordinator_mut().set_root_uri(Some(&root)).unwrap();

    assert_eq!(editor.coordinator().root_uri().map(|uri| uri.scheme()), Some("file"));
}
