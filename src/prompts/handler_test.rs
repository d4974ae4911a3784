//! Tests for the prompts/list and prompts/get merge logic

use std::path::Path;
use std::sync::Arc;

use serde_json::{Value, json};

use super::{PromptLoader, PromptScope, PromptsHandler, PromptsRegistry};
use crate::client::{BackendError, BackendResult, MockBackendClient};
use crate::context::CallContext;
use crate::protocol::ErrorCode;

fn body(value: Value) -> BackendResult<Vec<u8>> {
    Ok(serde_json::to_vec(&value).unwrap())
}

fn page(items: Value) -> BackendResult<Vec<u8>> {
    let total = items.as_array().map(Vec::len).unwrap_or(0);
    body(json!({"code": 0, "data": {"items": items, "total": total}}))
}

async fn registry_with(dir: &Path, files: &[(&str, &str)]) -> Arc<PromptsRegistry> {
    for (file, content) in files {
        std::fs::write(dir.join(file), content).unwrap();
    }
    let registry = Arc::new(PromptsRegistry::new());
    PromptLoader::new().load_all(dir, &registry).await.unwrap();
    registry
}

fn expect_project_prompts(mock: &mut MockBackendClient, items: Value) {
    mock.expect_get()
        .withf(|_, path, query| {
            path == "/api/v1/prompts/public"
                && query.get("scope").map(String::as_str) == Some("project")
                && query.get("page_size").map(String::as_str) == Some("1000")
        })
        .times(1)
        .returning(move |_, _, _| page(items.clone()));
}

fn scopes_and_names(prompts: &[super::PromptMetadata]) -> Vec<(PromptScope, String)> {
    prompts.iter().map(|p| (p.scope, p.name.clone())).collect()
}

#[tokio::test]
async fn test_list_without_identity_skips_user_scope() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(
        dir.path(),
        &[("a.prompt.md", "---\nname: shared\ndescription: sys\n---\nbody\n")],
    )
    .await;

    let mut mock = MockBackendClient::new();
    expect_project_prompts(
        &mut mock,
        json!([{"name": "team-plan", "description": "project", "updated_at": "2024-05-01T10:00:00Z"}]),
    );

    let handler = PromptsHandler::new(registry, Arc::new(mock));
    let listed = handler.list(&CallContext::new(), Value::Null).await.unwrap();

    assert_eq!(
        scopes_and_names(&listed.prompts),
        vec![
            (PromptScope::System, "shared".to_string()),
            (PromptScope::Project, "team-plan".to_string()),
        ]
    );
    assert_eq!(listed.prompts[1].updated_at, 1714557600);
}

#[tokio::test]
async fn test_list_with_token_adds_user_prompts_and_dedupes_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(
        dir.path(),
        &[("a.prompt.md", "---\nname: shared\n---\nbody\n")],
    )
    .await;

    let mut mock = MockBackendClient::new();
    expect_project_prompts(
        &mut mock,
        json!([{"name": "shared"}, {"name": "team-plan"}, {"name": "team-plan"}]),
    );
    mock.expect_get()
        .withf(|ctx, path, _| path == "/api/v1/auth/me" && ctx.token() == Some("tok"))
        .times(1)
        .returning(|_, _, _| body(json!({"code": 0, "data": {"user_id": 42, "username": "amy"}})));
    mock.expect_get()
        .withf(|ctx, path, query| {
            path == "/api/v1/prompts"
                && ctx.token() == Some("tok")
                && query.get("scope").map(String::as_str) == Some("user")
                && !query.contains_key("user_id")
        })
        .times(1)
        .returning(|_, _, _| page(json!([{"name": "shared"}, {"name": "my-notes", "version": "3"}])));

    let handler = PromptsHandler::new(registry, Arc::new(mock));
    let ctx = CallContext::new().with_token("tok");
    let listed = handler.list(&ctx, json!({})).await.unwrap();

    assert_eq!(
        scopes_and_names(&listed.prompts),
        vec![
            (PromptScope::System, "shared".to_string()),
            (PromptScope::Project, "team-plan".to_string()),
            (PromptScope::User, "my-notes".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_list_api_token_param_and_explicit_user() {
    let mut mock = MockBackendClient::new();
    expect_project_prompts(&mut mock, json!([]));
    mock.expect_get()
        .withf(|ctx, path, query| {
            path == "/api/v1/prompts"
                && ctx.token() == Some("param-token")
                && query.get("user_role").map(String::as_str) == Some("admin")
        })
        .times(1)
        .returning(|_, _, _| page(json!([{"name": "mine"}])));

    let handler = PromptsHandler::new(Arc::new(PromptsRegistry::new()), Arc::new(mock));
    let listed = handler
        .list(
            &CallContext::new(),
            json!({"user_id": 7, "api_token": "param-token", "user_role": "admin"}),
        )
        .await
        .unwrap();

    assert_eq!(
        scopes_and_names(&listed.prompts),
        vec![(PromptScope::User, "mine".to_string())]
    );
}

#[tokio::test]
async fn test_list_backend_failures_cost_only_their_scope() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(dir.path(), &[("a.prompt.md", "---\nname: sys\n---\nx\n")]).await;

    let mut mock = MockBackendClient::new();
    mock.expect_get()
        .withf(|_, path, _| path == "/api/v1/prompts/public")
        .returning(|_, _, _| Err(BackendError::Timeout));
    mock.expect_get()
        .withf(|_, path, _| path == "/api/v1/auth/me")
        .returning(|_, _, _| {
            Err(BackendError::Status {
                status: 401,
                message: "Unauthorized".into(),
            })
        });

    let handler = PromptsHandler::new(registry, Arc::new(mock));
    let listed = handler
        .list(&CallContext::new().with_token("stale"), Value::Null)
        .await
        .unwrap();

    assert_eq!(
        scopes_and_names(&listed.prompts),
        vec![(PromptScope::System, "sys".to_string())]
    );
}

#[tokio::test]
async fn test_list_scope_filter() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(dir.path(), &[("a.prompt.md", "---\nname: sys\n---\nx\n")]).await;

    let handler = PromptsHandler::new(registry, Arc::new(MockBackendClient::new()));
    let listed = handler
        .list(&CallContext::new().with_token("tok"), json!({"scope": "system"}))
        .await
        .unwrap();
    assert_eq!(listed.prompts.len(), 1);

    let err = handler
        .list(&CallContext::new(), json!({"scope": "team"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorCode::InvalidParams));
}

#[tokio::test]
async fn test_list_rejects_bad_params() {
    let handler = PromptsHandler::new(
        Arc::new(PromptsRegistry::new()),
        Arc::new(MockBackendClient::new()),
    );

    let err = handler
        .list(&CallContext::new(), json!({"user_id": "abc"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorCode::InvalidParams));

    let err = handler
        .list(&CallContext::new(), json!("oops"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorCode::InvalidParams));
}

#[tokio::test]
async fn test_get_system_prompt_with_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(
        dir.path(),
        &[(
            "review.prompt.md",
            "---\nname: review\ndescription: Review cases\n---\nReview {{module}} with {{count}} cases\n",
        )],
    )
    .await;

    let handler = PromptsHandler::new(registry, Arc::new(MockBackendClient::new()));
    let got = handler
        .get(
            &CallContext::new(),
            json!({"name": "review", "arguments": {"module": "login", "count": 5}}),
        )
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&got).unwrap(),
        json!({
            "description": "Review cases",
            "messages": [{
                "role": "user",
                "content": {"type": "text", "text": "Review login with 5 cases"}
            }]
        })
    );
}

#[tokio::test]
async fn test_get_system_prompt_wins_over_backend() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(dir.path(), &[("a.prompt.md", "---\nname: dup\n---\nlocal\n")]).await;

    let handler = PromptsHandler::new(registry, Arc::new(MockBackendClient::new()));
    let got = handler
        .get(&CallContext::new().with_token("tok"), json!({"name": "dup"}))
        .await
        .unwrap();
    assert_eq!(got.messages[0].content.text, "local");
}

#[tokio::test]
async fn test_get_custom_prompt_from_backend() {
    let mut mock = MockBackendClient::new();
    mock.expect_get()
        .withf(|_, path, _| path == "/api/v1/auth/me")
        .times(1)
        .returning(|_, _, _| body(json!({"code": 0, "data": {"user_id": 3, "username": "bo"}})));
    mock.expect_get()
        .withf(|ctx, path, query| {
            path == "/api/v1/prompts/by-name"
                && ctx.token() == Some("tok")
                && query.get("name").map(String::as_str) == Some("my-notes")
        })
        .times(1)
        .returning(|_, _, _| body(json!({"code": 0, "data": {"content": "Hi {{who}}"}})));

    let handler = PromptsHandler::new(Arc::new(PromptsRegistry::new()), Arc::new(mock));
    let got = handler
        .get(
            &CallContext::new().with_token("tok"),
            json!({"name": "my-notes", "arguments": {"who": "team"}}),
        )
        .await
        .unwrap();

    assert_eq!(got.description, "Custom prompt: my-notes");
    assert_eq!(got.messages[0].content.text, "Hi team");
}

#[tokio::test]
async fn test_get_not_found() {
    let mut mock = MockBackendClient::new();
    mock.expect_get()
        .withf(|_, path, _| path == "/api/v1/prompts/by-name")
        .times(1)
        .returning(|_, _, _| {
            Err(BackendError::Status {
                status: 404,
                message: "Not Found".into(),
            })
        });

    let handler = PromptsHandler::new(Arc::new(PromptsRegistry::new()), Arc::new(mock));
    let err = handler
        .get(&CallContext::new(), json!({"name": "nope"}))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Some(ErrorCode::InvalidParams));
    assert_eq!(err.message, "prompt not found: nope");
}

#[tokio::test]
async fn test_get_backend_failure_keeps_http_status() {
    let mut mock = MockBackendClient::new();
    mock.expect_get()
        .withf(|_, path, _| path == "/api/v1/prompts/by-name")
        .times(1)
        .returning(|_, _, _| {
            Err(BackendError::Status {
                status: 401,
                message: "token expired".into(),
            })
        });

    let handler = PromptsHandler::new(Arc::new(PromptsRegistry::new()), Arc::new(mock));
    let err = handler
        .get(&CallContext::new(), json!({"name": "x"}))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Some(ErrorCode::Unauthorized));
    assert_eq!(err.message, "token expired");
}

#[tokio::test]
async fn test_get_backend_timeout_is_internal() {
    let mut mock = MockBackendClient::new();
    mock.expect_get()
        .withf(|_, path, _| path == "/api/v1/prompts/by-name")
        .times(1)
        .returning(|_, _, _| Err(BackendError::Timeout));

    let handler = PromptsHandler::new(Arc::new(PromptsRegistry::new()), Arc::new(mock));
    let err = handler
        .get(&CallContext::new(), json!({"name": "x"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorCode::InternalError));
}

#[tokio::test]
async fn test_get_requires_name() {
    let handler = PromptsHandler::new(
        Arc::new(PromptsRegistry::new()),
        Arc::new(MockBackendClient::new()),
    );
    let err = handler
        .get(&CallContext::new(), json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.message, "missing required parameter: name");
}

#[tokio::test]
async fn test_get_unreadable_system_prompt_is_internal() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(dir.path(), &[("a.prompt.md", "---\nname: vanish\n---\nx\n")]).await;
    std::fs::remove_file(dir.path().join("a.prompt.md")).unwrap();

    let handler = PromptsHandler::new(registry, Arc::new(MockBackendClient::new()));
    let err = handler
        .get(&CallContext::new(), json!({"name": "vanish"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorCode::InternalError));
    assert!(err.message.starts_with("failed to load prompt content:"));
}
