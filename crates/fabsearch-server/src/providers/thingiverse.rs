//! Thingiverse adapter
//!
//! Requires a `THINGIVERSE_TOKEN` app token; without one the provider
//! registers as unconfigured and is never dispatched.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use fabsearch_core::{
    AdapterError, Capabilities, ProviderDescriptor, ProviderQuery, SearchAdapter,
};

use super::favicon;

pub struct ThingiverseAdapter {
    descriptor: ProviderDescriptor,
    client: Client,
    token: Option<String>,
}

impl ThingiverseAdapter {
    pub fn from_env() -> Self {
        let token = std::env::var("THINGIVERSE_TOKEN")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Self::new(token)
    }

    pub fn new(token: Option<String>) -> Self {
        let mut descriptor = ProviderDescriptor::api("thingiverse", "Thingiverse");
        descriptor.homepage = Some("https://www.thingiverse.com".to_string());
        descriptor.icon_url = Some(favicon("thingiverse.com"));
        descriptor.search_url_template =
            Some("https://www.thingiverse.com/search?q={q}".to_string());
        descriptor.configured = token.is_some();
        descriptor.is_public = false;
        descriptor.supports = Capabilities {
            search: true,
            stats: true,
            license: false,
            formats: false,
        };
        descriptor.notes = if token.is_some() {
            "token set".to_string()
        } else {
            "set THINGIVERSE_TOKEN to enable".to_string()
        };

        Self {
            descriptor,
            client: Client::builder()
                .timeout(Duration::from_secs(8))
                .user_agent(concat!("fabsearch/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            token,
        }
    }
}

fn map_hit(hit: &Value) -> Value {
    json!({
        "source": "thingiverse",
        "id": hit.get("id").cloned().unwrap_or(Value::Null),
        "title": hit.get("name").cloned().unwrap_or(Value::Null),
        "url": hit.get("public_url")
            .or_else(|| hit.get("url"))
            .cloned()
            .unwrap_or(Value::Null),
        "thumbnail": hit.get("thumbnail")
            .or_else(|| hit.get("preview_image"))
            .cloned()
            .unwrap_or(Value::Null),
        "author": hit.pointer("/creator/name").cloned().unwrap_or(Value::Null),
        "creatorUrl": hit.pointer("/creator/public_url").cloned().unwrap_or(Value::Null),
        "meta": {
            "likes": hit.get("like_count").cloned().unwrap_or(Value::Null),
            "downloads": hit.get("download_count").cloned().unwrap_or(Value::Null),
            "publishedAt": hit.get("created_at").cloned().unwrap_or(Value::Null),
            "price": 0,
        },
    })
}

#[async_trait]
impl SearchAdapter for ThingiverseAdapter {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn search(&self, query: &ProviderQuery) -> Result<Value, AdapterError> {
        let Some(token) = &self.token else {
            return Err(AdapterError::Other("missing THINGIVERSE_TOKEN".to_string()));
        };

        let mut endpoint = reqwest::Url::parse("https://api.thingiverse.com/search/")
            .map_err(|error| AdapterError::Other(error.to_string()))?;
        endpoint
            .path_segments_mut()
            .map_err(|_| AdapterError::Other("invalid search endpoint".to_string()))?
            .push(&query.query);
        let response = self
            .client
            .get(endpoint)
            .query(&[
                ("access_token", token.as_str()),
                ("per_page", query.limit.to_string().as_str()),
                ("page", query.page.to_string().as_str()),
            ])
            .send()
            .await
            .map_err(|error| AdapterError::Http(error.to_string()))?;
        if !response.status().is_success() {
            return Err(AdapterError::Status(response.status().as_u16()));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|error| AdapterError::Http(error.to_string()))?;

        let hits = body
            .get("hits")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let items: Vec<Value> = hits
            .iter()
            .take(query.limit as usize)
            .map(map_hit)
            .collect();
        Ok(Value::Array(items))
    }
}
