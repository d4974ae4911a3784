//! `prompts/list` and `prompts/get`
//!
//! System prompts come from the registry and need no identity. Project
//! prompts are fetched from the backend's public listing. User prompts need
//! an acting user: an explicit `user_id`, or the one the backend reports for
//! the caller's token. Backend failures while listing are logged and cost
//! only the prompts of that scope.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{PromptArgument, PromptMetadata, PromptScope, PromptsRegistry};
use crate::client::{BackendClient, BackendError, BackendResult, query};
use crate::context::CallContext;
use crate::protocol::RpcError;
use crate::tools::args::{to_int, to_string};

const PAGE_SIZE: &str = "1000";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListParams {
    user_id: Option<Value>,
    user_role: Option<String>,
    project_id: Option<Value>,
    scope: Option<String>,
    api_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GetParams {
    name: String,
    arguments: HashMap<String, Value>,
    user_id: Option<Value>,
    api_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptListResponse {
    pub prompts: Vec<PromptMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: PromptContent,
}

impl PromptMessage {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: PromptContent {
                kind: "text".to_string(),
                text: text.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptGetResponse {
    pub description: String,
    pub messages: Vec<PromptMessage>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    code: i64,
    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
struct Identity {
    #[serde(default)]
    user_id: i64,
    #[serde(default)]
    username: String,
}

#[derive(Debug, Default, Deserialize)]
struct PromptPage {
    #[serde(default)]
    items: Vec<BackendPrompt>,
    #[serde(default)]
    total: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BackendPrompt {
    name: String,
    description: String,
    version: String,
    arguments: Vec<PromptArgument>,
    updated_at: String,
}

#[derive(Debug, Default, Deserialize)]
struct PromptBody {
    #[serde(default)]
    content: String,
}

impl BackendPrompt {
    fn into_metadata(self, scope: PromptScope) -> PromptMetadata {
        let updated_at = if self.updated_at.is_empty() {
            0
        } else {
            match DateTime::parse_from_rfc3339(&self.updated_at) {
                Ok(at) => at.timestamp(),
                Err(e) => {
                    warn!(prompt = %self.name, value = %self.updated_at, error = %e, "Unparseable updated_at");
                    0
                }
            }
        };
        PromptMetadata {
            name: self.name,
            description: self.description,
            version: self.version,
            arguments: self.arguments,
            updated_at,
            scope,
        }
    }
}

/// Which scopes a listing should include
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeFilter {
    All,
    Only(PromptScope),
}

impl ScopeFilter {
    fn parse(raw: Option<&str>) -> Result<Self, RpcError> {
        match raw.map(str::trim).unwrap_or("") {
            "" | "all" => Ok(ScopeFilter::All),
            "system" => Ok(ScopeFilter::Only(PromptScope::System)),
            "project" => Ok(ScopeFilter::Only(PromptScope::Project)),
            "user" => Ok(ScopeFilter::Only(PromptScope::User)),
            other => Err(RpcError::invalid_params(format!(
                "invalid scope '{other}': expected system, project, user or all"
            ))),
        }
    }

    fn includes(self, scope: PromptScope) -> bool {
        match self {
            ScopeFilter::All => true,
            ScopeFilter::Only(only) => only == scope,
        }
    }
}

fn decode_params<T: DeserializeOwned + Default>(params: Value) -> Result<T, RpcError> {
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params).map_err(|e| RpcError::invalid_params(format!("invalid params: {e}")))
}

fn decode_envelope<T: DeserializeOwned>(body: &[u8]) -> BackendResult<Option<T>> {
    let envelope: Envelope<T> = serde_json::from_slice(body)?;
    if envelope.code != 0 {
        return Err(BackendError::InvalidResponse(format!(
            "backend returned error code: {}",
            envelope.code
        )));
    }
    Ok(envelope.data)
}

/// Explicit user id from params. Absent, null and 0 mean "not given".
fn explicit_user_id(raw: Option<&Value>) -> Result<Option<i64>, RpcError> {
    let Some(value) = raw.filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    match to_int(value) {
        Some(0) => Ok(None),
        Some(id) if id > 0 => Ok(Some(id)),
        _ => Err(RpcError::invalid_params(format!(
            "user_id must be a positive integer, got {value}"
        ))),
    }
}

/// Replace every `{{name}}` placeholder with its argument
///
/// Single pass over `content`: substituted values are never rescanned, and
/// placeholders without an argument are left as written.
pub fn apply_arguments(content: &str, arguments: &HashMap<String, Value>) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        let key = &rest[start + 2..start + 2 + len];
        let end = start + 2 + len + 2;
        out.push_str(&rest[..start]);
        match arguments.get(key) {
            Some(Value::String(s)) => out.push_str(s),
            Some(other) => out.push_str(&to_string(other).unwrap_or_else(|| other.to_string())),
            None => out.push_str(&rest[start..end]),
        }
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

/// Merge layer over the registry and the backend's prompt endpoints
pub struct PromptsHandler {
    registry: Arc<PromptsRegistry>,
    backend: Arc<dyn BackendClient>,
}

impl PromptsHandler {
    pub fn new(registry: Arc<PromptsRegistry>, backend: Arc<dyn BackendClient>) -> Self {
        Self { registry, backend }
    }

    pub fn registry(&self) -> &Arc<PromptsRegistry> {
        &self.registry
    }

    #[instrument(skip_all)]
    pub async fn list(&self, ctx: &CallContext, params: Value) -> Result<PromptListResponse, RpcError> {
        let params: ListParams = decode_params(params)?;
        let filter = ScopeFilter::parse(params.scope.as_deref())?;
        let explicit_user = explicit_user_id(params.user_id.as_ref())?;
        let user_ctx = token_context(ctx, params.api_token.as_deref());

        debug!(
            scope = ?filter,
            user_id = ?explicit_user,
            project_id = ?params.project_id,
            has_token = user_ctx.token().is_some(),
            "prompts/list"
        );

        let mut prompts = Vec::new();
        if filter.includes(PromptScope::System) {
            prompts.extend(self.registry.list().await);
        }

        if filter.includes(PromptScope::Project) {
            match self
                .fetch_scope(ctx, PromptScope::Project, params.user_role.as_deref())
                .await
            {
                Ok(found) => prompts.extend(found),
                Err(e) => warn!(error = %e, "Failed to fetch project prompts"),
            }
        }

        if filter.includes(PromptScope::User) {
            match self.acting_user(&user_ctx, explicit_user).await {
                Some(user_id) => {
                    match self
                        .fetch_scope(&user_ctx, PromptScope::User, params.user_role.as_deref())
                        .await
                    {
                        Ok(found) => {
                            debug!(user_id, count = found.len(), "Fetched user prompts");
                            prompts.extend(found);
                        }
                        Err(e) => warn!(user_id, error = %e, "Failed to fetch user prompts"),
                    }
                }
                None => debug!("No acting user, skipping user prompts"),
            }
        }

        // Collected system, project, user: the first name wins, as in `get`
        let mut seen = HashSet::new();
        prompts.retain(|p| {
            let fresh = seen.insert(p.name.clone());
            if !fresh {
                debug!(prompt = %p.name, scope = p.scope.as_str(), "Shadowed prompt dropped");
            }
            fresh
        });

        debug!(count = prompts.len(), "Returning prompts");
        Ok(PromptListResponse { prompts })
    }

    #[instrument(skip_all)]
    pub async fn get(&self, ctx: &CallContext, params: Value) -> Result<PromptGetResponse, RpcError> {
        let params: GetParams = decode_params(params)?;
        if params.name.is_empty() {
            return Err(RpcError::invalid_params("missing required parameter: name"));
        }
        let name = params.name.as_str();

        if let Some(prompt) = self.registry.get(name).await {
            debug!(prompt = name, "Serving system prompt");
            let content = prompt
                .content()
                .await
                .map_err(|e| RpcError::internal(format!("failed to load prompt content: {e}")))?;
            return Ok(PromptGetResponse {
                description: prompt.description.clone(),
                messages: vec![PromptMessage::user_text(apply_arguments(
                    &content,
                    &params.arguments,
                ))],
            });
        }

        let explicit_user = explicit_user_id(params.user_id.as_ref())?;
        let user_ctx = token_context(ctx, params.api_token.as_deref());
        let user_id = self.acting_user(&user_ctx, explicit_user).await;
        debug!(prompt = name, user_id = ?user_id, "Looking up custom prompt");

        match self.fetch_by_name(&user_ctx, name).await {
            Ok(Some(content)) => Ok(PromptGetResponse {
                description: format!("Custom prompt: {name}"),
                messages: vec![PromptMessage::user_text(apply_arguments(
                    &content,
                    &params.arguments,
                ))],
            }),
            Ok(None) => Err(RpcError::invalid_params(format!("prompt not found: {name}"))),
            Err(e) if e.status() == Some(404) => {
                Err(RpcError::invalid_params(format!("prompt not found: {name}")))
            }
            Err(e) => {
                warn!(prompt = name, error = %e, "Failed to fetch custom prompt");
                Err(e.to_rpc_error())
            }
        }
    }

    /// Explicit id wins; otherwise ask the backend who owns the token
    async fn acting_user(&self, ctx: &CallContext, explicit: Option<i64>) -> Option<i64> {
        if explicit.is_some() {
            return explicit;
        }
        let token = ctx.token()?;
        debug!(token_len = token.len(), "Resolving user from token");

        match self.resolve_user(ctx).await {
            Ok(Some(identity)) if identity.user_id > 0 => {
                debug!(user_id = identity.user_id, username = %identity.username, "Resolved user");
                Some(identity.user_id)
            }
            Ok(_) => {
                debug!("Token resolved to no user");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to resolve user from token");
                None
            }
        }
    }

    async fn resolve_user(&self, ctx: &CallContext) -> BackendResult<Option<Identity>> {
        let body = self
            .backend
            .get(ctx, "/api/v1/auth/me", &Default::default())
            .await?;
        decode_envelope(&body)
    }

    async fn fetch_scope(
        &self,
        ctx: &CallContext,
        scope: PromptScope,
        user_role: Option<&str>,
    ) -> BackendResult<Vec<PromptMetadata>> {
        let path = match scope {
            PromptScope::Project => "/api/v1/prompts/public",
            _ => "/api/v1/prompts",
        };
        let mut params = query([
            ("page", "1"),
            ("page_size", PAGE_SIZE),
            ("scope", scope.as_str()),
        ]);
        if let Some(role) = user_role.filter(|r| !r.is_empty()) {
            params.insert("user_role".to_string(), role.to_string());
        }

        let body = self.backend.get(ctx, path, &params).await?;
        let page: PromptPage = decode_envelope(&body)?.unwrap_or_default();
        debug!(scope = scope.as_str(), count = page.items.len(), total = page.total, "Fetched prompts");

        Ok(page
            .items
            .into_iter()
            .map(|item| item.into_metadata(scope))
            .collect())
    }

    async fn fetch_by_name(&self, ctx: &CallContext, name: &str) -> BackendResult<Option<String>> {
        let body = self
            .backend
            .get(ctx, "/api/v1/prompts/by-name", &query([("name", name)]))
            .await?;
        let found: Option<PromptBody> = decode_envelope(&body)?;
        Ok(found.map(|p| p.content).filter(|c| !c.is_empty()))
    }
}

/// `ctx` carrying `api_token` when one is given, else `ctx` as is
fn token_context(ctx: &CallContext, api_token: Option<&str>) -> CallContext {
    match api_token.filter(|t| !t.trim().is_empty()) {
        Some(token) => ctx.clone().with_token(token),
        None => ctx.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_apply_arguments() {
        let arguments: HashMap<String, Value> = [
            ("module".to_string(), json!("login")),
            ("count".to_string(), json!(3)),
            ("ratio".to_string(), json!(2.0)),
            ("strict".to_string(), json!(true)),
        ]
        .into_iter()
        .collect();

        let text = apply_arguments(
            "{{module}} x{{count}} r{{ratio}} {{strict}} {{module}} {{other}}",
            &arguments,
        );
        assert_eq!(text, "login x3 r2 true login {{other}}");
    }

    #[test]
    fn test_apply_arguments_does_not_rescan_values() {
        let arguments: HashMap<String, Value> = [
            ("a".to_string(), json!("{{b}}")),
            ("b".to_string(), json!("{{a}}")),
        ]
        .into_iter()
        .collect();

        for _ in 0..8 {
            assert_eq!(apply_arguments("{{a}}-{{b}}-{{", &arguments), "{{b}}-{{a}}-{{");
        }
    }

    #[test]
    fn test_explicit_user_id() {
        assert_eq!(explicit_user_id(None).unwrap(), None);
        assert_eq!(explicit_user_id(Some(&json!(null))).unwrap(), None);
        assert_eq!(explicit_user_id(Some(&json!(0))).unwrap(), None);
        assert_eq!(explicit_user_id(Some(&json!(12))).unwrap(), Some(12));
        assert_eq!(explicit_user_id(Some(&json!("12"))).unwrap(), Some(12));
        assert!(explicit_user_id(Some(&json!(-3))).is_err());
        assert!(explicit_user_id(Some(&json!("abc"))).is_err());
    }

    #[test]
    fn test_scope_filter() {
        assert_eq!(ScopeFilter::parse(None).unwrap(), ScopeFilter::All);
        assert_eq!(ScopeFilter::parse(Some("all")).unwrap(), ScopeFilter::All);
        assert_eq!(
            ScopeFilter::parse(Some("user")).unwrap(),
            ScopeFilter::Only(PromptScope::User)
        );
        assert!(ScopeFilter::parse(Some("team")).is_err());
    }

    #[test]
    fn test_backend_prompt_timestamp() {
        let item = BackendPrompt {
            name: "a".into(),
            updated_at: "2024-05-01T10:00:00Z".into(),
            ..Default::default()
        };
        assert_eq!(item.into_metadata(PromptScope::User).updated_at, 1714557600);

        let item = BackendPrompt {
            name: "b".into(),
            updated_at: "yesterday".into(),
            ..Default::default()
        };
        assert_eq!(item.into_metadata(PromptScope::User).updated_at, 0);
    }
}
