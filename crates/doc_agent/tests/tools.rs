mod support;

use std::fs;

use doc_agent::tools::{ToolDispatchError, ToolResult};
use serde_json::json;
use support::{call, package_fixture, registry};

#[test]
fn schemas_publish_the_three_package_tools() {
    let package = package_fixture();
    let names: Vec<String> = registry(package.path())
        .schemas()
        .into_iter()
        .map(|schema| schema.name)
        .collect();

    assert_eq!(names, vec!["list_directory", "read_file", "write_file"]);
}

#[test]
fn list_directory_sorts_entries_and_hides_excluded_docs() {
    let package = package_fixture();
    let result = registry(package.path())
        .dispatch(&call("c1", "list_directory", json!({ "path": "" })))
        .expect("known tool");

    assert!(!result.is_error(), "{result:?}");
    let expected = format!(
        "Contents of :\n  data_stream/ (directory)\n  manifest.yml (file, {} bytes)\n",
        support::MANIFEST.len()
    );
    assert_eq!(result.content, expected);
}

#[test]
fn read_file_returns_contents_inside_root() {
    let package = package_fixture();
    let result = registry(package.path())
        .dispatch(&call(
            "c1",
            "read_file",
            json!({ "path": "data_stream/access/fields.yml" }),
        ))
        .expect("known tool");

    assert_eq!(result, ToolResult::ok("- name: message\n"));
}

#[test]
fn reads_outside_root_or_under_docs_are_denied() {
    let package = package_fixture();
    let tools = registry(package.path());

    let escaped = tools
        .dispatch(&call("c1", "read_file", json!({ "path": "../outside.txt" })))
        .expect("known tool");
    assert_eq!(
        escaped.error.as_deref(),
        Some("access denied: path outside package root")
    );

    let excluded = tools
        .dispatch(&call("c2", "read_file", json!({ "path": "docs/README.md" })))
        .expect("known tool");
    assert_eq!(excluded.error.as_deref(), Some("access denied: invalid path"));

    let listed = tools
        .dispatch(&call("c3", "list_directory", json!({ "path": "docs" })))
        .expect("known tool");
    assert!(
        !listed.content.contains("README.md"),
        "excluded tree leaked: {}",
        listed.content
    );
}

#[test]
fn write_file_creates_parents_and_reports_byte_count() {
    let package = package_fixture();
    let result = registry(package.path())
        .dispatch(&call(
            "c1",
            "write_file",
            json!({ "path": "_dev/build/docs/README.md", "content": "# X" }),
        ))
        .expect("known tool");

    assert_eq!(
        result,
        ToolResult::ok("Successfully wrote 3 bytes to _dev/build/docs/README.md")
    );
    assert_eq!(
        fs::read_to_string(package.path().join("_dev/build/docs/README.md")).expect("written"),
        "# X"
    );
}

#[test]
fn write_file_outside_docs_build_dir_is_denied_and_writes_nothing() {
    let package = package_fixture();
    let tools = registry(package.path());

    for path in ["manifest.yml", "_dev/build/docs", "_dev/build/other.md", "../escape.md"] {
        let result = tools
            .dispatch(&call(
                "c1",
                "write_file",
                json!({ "path": path, "content": "overwritten" }),
            ))
            .expect("known tool");
        assert_eq!(
            result.error.as_deref(),
            Some("access denied: path outside allowed directory"),
            "path {path}"
        );
    }

    assert_eq!(
        fs::read_to_string(package.path().join("manifest.yml")).expect("manifest"),
        support::MANIFEST
    );
    assert!(!package.path().join("_dev/build/other.md").exists());
}

#[test]
fn missing_file_and_bad_arguments_are_tool_errors() {
    let package = package_fixture();
    let tools = registry(package.path());

    let missing = tools
        .dispatch(&call("c1", "read_file", json!({ "path": "nope.yml" })))
        .expect("known tool");
    assert_eq!(
        missing.error.as_deref(),
        Some("failed to read file: no such file or directory: nope.yml")
    );

    let malformed = tools
        .dispatch(&call("c2", "write_file", json!({ "path": "_dev/build/docs/a.md" })))
        .expect("known tool");
    let message = malformed.error.expect("missing content is an error");
    assert!(
        message.starts_with("failed to parse arguments: "),
        "{message}"
    );
}

#[test]
fn unknown_tool_is_a_dispatch_failure() {
    let package = package_fixture();
    let error = registry(package.path())
        .dispatch(&call("c1", "delete_file", json!({ "path": "manifest.yml" })))
        .expect_err("unknown tool");

    assert_eq!(error, ToolDispatchError::UnknownTool("delete_file".to_string()));
    assert_eq!(error.to_string(), "tool not found: delete_file");
}
