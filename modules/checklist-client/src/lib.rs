pub mod error;
pub mod types;

pub use error::{ChecklistApiError, Result};
pub use reqwest::Method;
pub use types::{ApiResponse, ItemPatch, ItemRecord, NewItem};

use std::time::Duration;

/// Table holding checklist items.
pub const ITEM_TABLE: &str = "x_checklist_item";

/// Path of the item table, relative to the API root.
pub fn table_path() -> String {
    ITEM_TABLE.to_string()
}

/// Path of one item row, relative to the API root.
pub fn record_path(sys_id: &str) -> String {
    format!("{ITEM_TABLE}/{sys_id}")
}

/// Query parameters selecting the items assigned to `user`. Empty when
/// `user` is empty, which lists every item. Values are encoded when the
/// request is built.
pub fn assigned_items_query(user: &str) -> Vec<(String, String)> {
    if user.is_empty() {
        Vec::new()
    } else {
        vec![("sysparm_query".to_string(), format!("assigned_to={user}"))]
    }
}

pub struct ChecklistClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ChecklistClient {
    /// `base_url` points at the table API root, e.g. `https://host/api/now/table`.
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&serde_json::Value>,
    ) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.url_for(path))
            .header("Accept", "application/json");
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder
    }

    /// Send a JSON request to `path` (relative to the API root) with `query`
    /// parameters and return the decoded response body. Empty bodies, e.g.
    /// from a delete, come back as `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let builder = self.request(method.clone(), path, query, body);
        let resp = builder.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ChecklistApiError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        tracing::debug!(%method, path, status = status.as_u16(), "Checklist API request");

        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}
