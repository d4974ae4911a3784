//! Tests for the manual case tools

use mockall::Sequence;
use serde_json::json;

use super::test_support::{args, body, parsed, shared, status};
use super::{ListManualGroups, UpdateManualCase, UpdateManualCases};
use crate::client::MockBackendClient;
use crate::context::CallContext;
use crate::tools::{Tool, ToolResult};

#[tokio::test]
async fn test_list_manual_groups_uses_overall_type() {
    let mut mock = MockBackendClient::new();
    mock.expect_get()
        .withf(|_, path, query| {
            path == "/api/v1/projects/8/case-groups"
                && query.get("case_type").map(String::as_str) == Some("overall")
        })
        .times(1)
        .returning(|_, _, _| body(json!({"code": 0, "data": []})));

    let tool = ListManualGroups::new(shared(mock));
    let result = tool
        .execute(&CallContext::new(), &args(json!({"project_id": 8})))
        .await
        .unwrap();
    assert!(!result.is_error());
}

#[tokio::test]
async fn test_update_manual_case_sends_data() {
    let mut mock = MockBackendClient::new();
    mock.expect_put()
        .withf(|_, path, body| {
            path == "/api/v1/projects/1/manual-cases/15" && *body == json!({"remark": "checked"})
        })
        .times(1)
        .returning(|_, _, _| body(json!({"code": 0})));

    let tool = UpdateManualCase::new(shared(mock));
    let result = tool
        .execute(
            &CallContext::new(),
            &args(json!({"project_id": 1, "id": 15, "data": {"remark": "checked"}})),
        )
        .await
        .unwrap();
    assert!(!result.is_error());
}

#[tokio::test]
async fn test_update_manual_case_requires_object_data() {
    let tool = UpdateManualCase::new(shared(MockBackendClient::new()));
    let result = tool
        .execute(
            &CallContext::new(),
            &args(json!({"project_id": 1, "id": 15, "data": "x"})),
        )
        .await
        .unwrap();
    assert!(result.is_error());
}

#[tokio::test]
async fn test_batch_update_through_group() {
    let mut mock = MockBackendClient::new();
    let mut seq = Sequence::new();
    mock.expect_put()
        .withf(|_, path, body| {
            path == "/api/v1/projects/1/case-groups/9/manual-cases/100"
                && *body == json!({"case_number": "A-1", "remark": ""})
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| body(json!({"code": 0})));
    mock.expect_put()
        .withf(|_, path, _| path == "/api/v1/projects/1/case-groups/9/manual-cases/101")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Err(status(409, "case number already used")));
    mock.expect_put()
        .withf(|_, path, _| path == "/api/v1/projects/1/case-groups/9/manual-cases/102")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| body(json!({"code": 0})));

    let tool = UpdateManualCases::new(shared(mock));
    let result = tool
        .execute(
            &CallContext::new(),
            &args(json!({
                "project_id": 1,
                "group_id": 9,
                "cases": [
                    {"id": 100, "case_number": "A-1", "remark": ""},
                    {"id": 101, "case_number": "A-1"},
                    {"id": 102.0, "test_result": "OK"}
                ]
            })),
        )
        .await
        .unwrap();

    assert_eq!(
        parsed(&result),
        json!({
            "success": 2,
            "failed": 1,
            "results": [
                {"index": 0, "case_id": 100, "status": "success"},
                {"index": 1, "case_id": 101, "status": "failed", "error": "backend returned 409: case number already used"},
                {"index": 2, "case_id": 102, "status": "success"}
            ]
        })
    );
}

#[tokio::test]
async fn test_batch_update_without_group_and_bad_items() {
    let mut mock = MockBackendClient::new();
    mock.expect_put()
        .withf(|_, path, _| path == "/api/v1/projects/1/manual-cases/5")
        .times(1)
        .returning(|_, _, _| body(json!({"code": 0})));

    let tool = UpdateManualCases::new(shared(mock));
    let result = tool
        .execute(
            &CallContext::new(),
            &args(json!({
                "project_id": 1,
                "cases": [7, {"remark": "x"}, {"id": "5"}, {"id": 5}]
            })),
        )
        .await
        .unwrap();

    let value = parsed(&result);
    assert_eq!(value["success"], 1);
    assert_eq!(value["failed"], 3);
    assert_eq!(value["results"][0]["error"], "case item must be an object");
    assert_eq!(value["results"][1]["error"], "id field is required");
    assert_eq!(value["results"][2]["error"], "id must be an integer");
}

#[tokio::test]
async fn test_batch_update_requires_cases() {
    let tool = UpdateManualCases::new(shared(MockBackendClient::new()));
    let result = tool
        .execute(&CallContext::new(), &args(json!({"project_id": 1})))
        .await
        .unwrap();
    assert_eq!(result, ToolResult::error("missing required field: cases"));
}
