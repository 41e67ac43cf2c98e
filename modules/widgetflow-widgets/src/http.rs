//! Generic HTTP effect.
//!
//! [`http_effect`] turns a request builder and a response mapper into an
//! [`Effect`]: the request is derived from the triggering action and the
//! post-reducer state, sent through an [`HttpClient`], and the decoded JSON
//! is mapped to the succeeded action. Transport errors, non-2xx responses and
//! mapping errors all end up in the failed action.

use std::sync::Arc;

use async_trait::async_trait;
use checklist_client::{ChecklistClient, Method};
use serde_json::Value;
use tracing::debug;
use widgetflow_common::{Action, ActionType, EffectError};
use widgetflow_engine::{Effect, EffectContext, Merge};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// A JSON request relative to the client's API root.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    /// Query parameters, encoded by the client.
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Patch,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Delete,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

/// Network boundary. Never retries.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: HttpRequest) -> anyhow::Result<Value>;
}

#[async_trait]
impl HttpClient for ChecklistClient {
    async fn send(&self, request: HttpRequest) -> anyhow::Result<Value> {
        let body = ChecklistClient::send(
            self,
            request.method.into(),
            &request.path,
            &request.query,
            request.body.as_ref(),
        )
        .await?;
        Ok(body)
    }
}

/// Build an effect that performs one HTTP request per triggering action.
///
/// Every invocation is bracketed: `started` is queued before the request,
/// then exactly one of the `succeeded` or `failed` actions follows. An error
/// from `request` or `succeeded` is reported through `failed` like a
/// transport error. Teardown aborts the wait for the response and drops the
/// outcome.
pub fn http_effect<S, A, T, R, M, F>(
    name: &'static str,
    client: Arc<dyn HttpClient>,
    started: T,
    request: R,
    succeeded: M,
    failed: F,
) -> Effect<S, A>
where
    S: Merge,
    A: ActionType,
    T: Fn(&Action<A>) -> A + Send + Sync + 'static,
    R: Fn(&Action<A>, &S) -> anyhow::Result<HttpRequest> + Send + Sync + 'static,
    M: Fn(&Action<A>, Value) -> anyhow::Result<A> + Send + Sync + 'static,
    F: Fn(&Action<A>, EffectError) -> A + Send + Sync + 'static,
{
    let succeeded = Arc::new(succeeded);
    Effect::new(
        name,
        move |ctx: EffectContext<S, A>| {
            let client = client.clone();
            let succeeded = succeeded.clone();
            let request = request(&ctx.action, &*ctx.state);
            async move {
                let request = request?;
                debug!(
                    effect = name,
                    method = ?request.method,
                    path = request.path.as_str(),
                    "Sending request"
                );

                let body = tokio::select! {
                    body = client.send(request) => body?,
                    _ = ctx.cancel.cancelled() => {
                        debug!(effect = name, "Request abandoned at teardown");
                        return Ok(None);
                    }
                };
                succeeded(&ctx.action, body).map(Some)
            }
        },
        failed,
    )
    .with_started(started)
}
