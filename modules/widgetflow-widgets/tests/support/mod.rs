//! Shared fixtures for the widget integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;
use widgetflow_widgets::{HttpClient, HttpMethod, HttpRequest};

/// Scripted HTTP client. Unrouted requests fail like a 404.
#[derive(Default)]
pub struct FakeHttp {
    routes: Mutex<HashMap<(HttpMethod, String), Result<Value, String>>>,
    requests: Mutex<Vec<HttpRequest>>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, method: HttpMethod, path: &str, body: Value) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), Ok(body));
        self
    }

    pub fn fail(self, method: HttpMethod, path: &str, message: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), Err(message.to_string()));
        self
    }

    /// Hold the next request until the returned sender fires.
    pub fn hold_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn send(&self, request: HttpRequest) -> anyhow::Result<Value> {
        self.requests.lock().unwrap().push(request.clone());
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let route = self
            .routes
            .lock()
            .unwrap()
            .get(&(request.method, request.path.clone()))
            .cloned();
        match route {
            Some(Ok(body)) => Ok(body),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!(
                "API error (status 404): no route for {:?} {}",
                request.method,
                request.path
            )),
        }
    }
}

/// Poll `check` until it holds, yielding to spawned tasks in between.
pub async fn eventually(check: impl Fn() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached in time");
}
