//! Tests for the project, requirement, document and review tools

use std::sync::Arc;

use serde_json::json;

use super::test_support::{args, body, parsed, shared, status};
use super::{
    CreateReviewItem, GetCurrentProjectName, GetRequirementItem, ListRawDocuments,
    register_all_tools,
};
use crate::client::MockBackendClient;
use crate::context::CallContext;
use crate::tools::{Tool, ToolRegistry, ToolResult};

#[tokio::test]
async fn test_register_all_tools() {
    let registry = ToolRegistry::new();
    register_all_tools(&registry, Arc::new(MockBackendClient::new())).await;

    assert_eq!(registry.count().await, 13);
    for name in [
        "get_current_project_name",
        "list_raw_documents",
        "get_requirement_item",
        "update_manual_cases",
        "update_defects",
        "get_execution_task_cases",
        "update_execution_case_result",
        "create_review_item",
    ] {
        assert!(registry.has(name).await, "{name} not registered");
    }
}

#[tokio::test]
async fn test_raw_documents_keep_completed_only() {
    let mut mock = MockBackendClient::new();
    mock.expect_get()
        .withf(|_, path, _| path == "/api/v1/projects/2/raw-documents")
        .returning(|_, _, _| {
            body(json!({
                "code": 0,
                "data": {"documents": [
                    {
                        "id": 1, "project_id": 2, "convert_status": "completed",
                        "converted_filename": "spec.md", "converted_file_size": 120,
                        "converted_time": "2024-05-01T10:00:00Z", "original_filename": "spec.docx",
                        "storage_path": "/srv/x"
                    },
                    {"id": 2, "project_id": 2, "convert_status": "pending", "original_filename": "b.pdf"}
                ]}
            }))
        });

    let tool = ListRawDocuments::new(shared(mock));
    let result = tool
        .execute(&CallContext::new(), &args(json!({"project_id": 2})))
        .await
        .unwrap();

    assert_eq!(
        parsed(&result),
        json!({
            "documents": [{
                "id": 1, "project_id": 2, "converted_filename": "spec.md",
                "converted_file_size": 120, "converted_time": "2024-05-01T10:00:00Z",
                "original_filename": "spec.docx"
            }],
            "total": 1
        })
    );
}

#[tokio::test]
async fn test_requirement_by_name() {
    let mut mock = MockBackendClient::new();
    mock.expect_get()
        .withf(|_, path, _| path == "/api/v1/projects/1/requirement-items")
        .times(1)
        .returning(|_, _, _| {
            body(json!({"code": 0, "data": [{"id": 3, "name": "login"}, {"id": 4, "name": "search"}]}))
        });
    mock.expect_get()
        .withf(|_, path, _| path == "/api/v1/projects/1/requirement-items/4")
        .times(1)
        .returning(|_, _, _| body(json!({"code": 0, "data": {"id": 4}})));

    let tool = GetRequirementItem::new(shared(mock));
    let result = tool
        .execute(
            &CallContext::new(),
            &args(json!({"project_id": 1, "name": "search"})),
        )
        .await
        .unwrap();
    assert_eq!(parsed(&result)["data"]["id"], 4);
}

#[tokio::test]
async fn test_requirement_needs_id_or_name() {
    let tool = GetRequirementItem::new(shared(MockBackendClient::new()));
    let result = tool
        .execute(&CallContext::new(), &args(json!({"project_id": 1})))
        .await
        .unwrap();
    assert_eq!(result, ToolResult::error("either id or name is required"));
}

#[tokio::test]
async fn test_review_item_with_content() {
    let mut mock = MockBackendClient::new();
    mock.expect_post()
        .withf(|_, path, body| {
            path == "/api/v1/projects/6/review-items" && *body == json!({"name": "Sprint 12"})
        })
        .times(1)
        .returning(|_, _, _| body(json!({"id": 31, "name": "Sprint 12"})));
    mock.expect_put()
        .withf(|_, path, body| {
            path == "/api/v1/projects/6/review-items/31" && *body == json!({"content": "# Review"})
        })
        .times(1)
        .returning(|_, _, _| body(json!({"id": 31, "content": "# Review"})));

    let tool = CreateReviewItem::new(shared(mock));
    let result = tool
        .execute(
            &CallContext::new(),
            &args(json!({"project_id": 6, "name": "Sprint 12", "content": "# Review"})),
        )
        .await
        .unwrap();
    assert_eq!(parsed(&result)["content"], "# Review");
}

#[tokio::test]
async fn test_review_item_without_content_returns_creation() {
    let mut mock = MockBackendClient::new();
    mock.expect_post()
        .times(1)
        .returning(|_, _, _| body(json!({"id": 31, "name": "Sprint 12"})));

    let tool = CreateReviewItem::new(shared(mock));
    let result = tool
        .execute(
            &CallContext::new(),
            &args(json!({"project_id": 6, "name": "Sprint 12"})),
        )
        .await
        .unwrap();
    assert_eq!(parsed(&result)["id"], 31);
}

fn project_mock(current: serde_json::Value, projects: serde_json::Value) -> MockBackendClient {
    let mut mock = MockBackendClient::new();
    mock.expect_get()
        .withf(|_, path, _| path == "/api/v1/auth/me")
        .returning(|_, _, _| body(json!({"code": 0, "data": {"user_id": 1, "username": "amy"}})));
    mock.expect_get()
        .withf(|_, path, _| path == "/api/v1/profile/current-project")
        .returning(move |_, _, _| body(current.clone()));
    mock.expect_get()
        .withf(|_, path, _| path == "/api/v1/projects")
        .returning(move |_, _, _| body(projects.clone()));
    mock
}

#[tokio::test]
async fn test_current_project_found() {
    let mock = project_mock(
        json!({"code": 0, "data": {"project_id": 7}}),
        json!({"code": 0, "data": [{"id": 3, "name": "Other"}, {"id": 7, "name": "Checkout"}]}),
    );
    let tool = GetCurrentProjectName::new(shared(mock));
    let result = tool
        .execute(&CallContext::new().with_token("t"), &args(json!({})))
        .await
        .unwrap();
    assert_eq!(parsed(&result), json!({"id": 7, "name": "Checkout"}));
}

#[tokio::test]
async fn test_current_project_not_selected() {
    let mock = project_mock(json!({"code": 0, "data": {"project_id": 0}}), json!({}));
    let tool = GetCurrentProjectName::new(shared(mock));
    let result = tool
        .execute(&CallContext::new(), &args(json!({})))
        .await
        .unwrap();
    assert_eq!(parsed(&result)["message"], "no current project selected");
}

#[tokio::test]
async fn test_current_project_not_member() {
    let mock = project_mock(
        json!({"code": 0, "data": {"project_id": 9}}),
        json!({"code": 0, "data": [{"id": 3, "name": "Other"}]}),
    );
    let tool = GetCurrentProjectName::new(shared(mock));
    let result = tool
        .execute(&CallContext::new(), &args(json!({})))
        .await
        .unwrap();
    let value = parsed(&result);
    assert_eq!(value["project_id"], 9);
    assert_eq!(value["name"], "unknown project");
}

#[tokio::test]
async fn test_current_project_user_lookup_fails() {
    let mut mock = MockBackendClient::new();
    mock.expect_get()
        .returning(|_, _, _| Err(status(401, "Unauthorized")));
    let tool = GetCurrentProjectName::new(shared(mock));
    let result = tool
        .execute(&CallContext::new(), &args(json!({})))
        .await
        .unwrap();
    assert_eq!(
        result,
        ToolResult::error("failed to get current user: backend returned 401: Unauthorized")
    );
}
