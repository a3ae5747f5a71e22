//! Files changed outside the editor

use super::mock_editor::MockEditor;
use super::test_utils::{configuration, pets_definition};
use lsp_types::{FileChangeType, FileEvent, Url};

#[tokio::test]
async fn test_inactive_input_is_reloaded_from_disk() {
    let mut editor = MockEditor::new();
    let readme = configuration(&["a.json"], "azure-validator: true\n");
    editor.write_file("readme.md", &readme);
    editor.write_file("a.json", &pets_definition(&["Pet_Name"]));

    editor.open_document("readme.md", &readme).await;
    editor.assert_diagnostic_count("a.json", 1);

    editor.change_on_disk("a.json", &pets_definition(&["petName"])).await;

    editor.assert_cleared("a.json");
}

#[tokio::test]
async fn test_open_document_ignores_disk_content() {
    let mut editor = MockEditor::new();
    let text = pets_definition(&["Pet_Name"]);
    editor.write_file("a.json", &text);
    editor.open_document("a.json", &text).await;
    let published = editor.client().published().len();

    editor.change_on_disk("a.json", &pets_definition(&["petName"])).await;

    assert_eq!(editor.client().published().len(), published);
    editor.assert_diagnostic_count("a.json", 1);
}

#[tokio::test]
async fn test_untracked_and_foreign_changes_are_skipped() {
    let mut editor = MockEditor::new();
    let events = vec![
        FileEvent { uri: Url::parse("untitled:Untitled-1").unwrap(), typ: FileChangeType::CHANGED },
        FileEvent { uri: editor.uri("unknown.json"), typ: FileChangeType::CREATED },
    ];

    editor.coordinator_mut().changed_on_disk(events).await.unwrap();

    assert!(editor.client().published().is_empty());
    assert!(editor.coordinator().files().is_empty());
}
