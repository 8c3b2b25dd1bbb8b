//! Sketchfab adapter
//!
//! Public search works without a token; an optional `SKETCHFAB_TOKEN`
//! raises rate limits. Returns raw result candidates for the engine to
//! validate.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use fabsearch_core::{
    AdapterError, Capabilities, ProviderDescriptor, ProviderQuery, SearchAdapter,
};

use super::favicon;

const SEARCH_ENDPOINT: &str = "https://api.sketchfab.com/v3/search";

pub struct SketchfabAdapter {
    descriptor: ProviderDescriptor,
    client: Client,
    token: Option<String>,
}

impl SketchfabAdapter {
    pub fn from_env() -> Self {
        let token = std::env::var("SKETCHFAB_TOKEN")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Self::new(token)
    }

    pub fn new(token: Option<String>) -> Self {
        let mut descriptor = ProviderDescriptor::api("sketchfab", "Sketchfab");
        descriptor.homepage = Some("https://sketchfab.com".to_string());
        descriptor.icon_url = Some(favicon("sketchfab.com"));
        descriptor.search_url_template =
            Some("https://sketchfab.com/search?q={q}&type=models".to_string());
        // Public search works without a token.
        descriptor.configured = true;
        descriptor.is_public = true;
        descriptor.supports = Capabilities {
            search: true,
            stats: true,
            license: true,
            formats: false,
        };
        descriptor.notes = if token.is_some() {
            "token set".to_string()
        } else {
            "public search (token optional)".to_string()
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

/// Highest-resolution thumbnail url, if any.
fn best_thumbnail(model: &Value) -> Value {
    let images = model
        .pointer("/thumbnails/images")
        .and_then(Value::as_array);
    let best = images.and_then(|images| {
        images.iter().max_by_key(|image| {
            image.get("width").and_then(Value::as_u64).unwrap_or(0)
        })
    });
    best.and_then(|image| image.get("url"))
        .cloned()
        .unwrap_or(Value::Null)
}

fn map_model(model: &Value) -> Value {
    let id = model
        .get("uid")
        .or_else(|| model.get("id"))
        .cloned()
        .unwrap_or(Value::Null);
    let url = model
        .get("viewerUrl")
        .or_else(|| model.get("url"))
        .cloned()
        .unwrap_or_else(|| match &id {
            Value::String(id) => json!(format!("https://sketchfab.com/models/{id}")),
            _ => Value::Null,
        });
    json!({
        "source": "sketchfab",
        "id": id,
        "title": model.get("name").cloned().unwrap_or(Value::Null),
        "url": url,
        "thumbnail": best_thumbnail(model),
        "author": model.pointer("/user/displayName")
            .or_else(|| model.pointer("/user/username"))
            .cloned()
            .unwrap_or(Value::Null),
        "creatorUrl": model.pointer("/user/profileUrl").cloned().unwrap_or(Value::Null),
        "meta": {
            "likes": model.get("likeCount").cloned().unwrap_or(Value::Null),
            "views": model.get("viewCount").cloned().unwrap_or(Value::Null),
            "license": model.pointer("/license/label").cloned().unwrap_or(Value::Null),
            "publishedAt": model.get("publishedAt")
                .or_else(|| model.get("createdAt"))
                .cloned()
                .unwrap_or(Value::Null),
            "tags": model.get("tags").cloned().unwrap_or(Value::Null),
        },
    })
}

#[async_trait]
impl SearchAdapter for SketchfabAdapter {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn search(&self, query: &ProviderQuery) -> Result<Value, AdapterError> {
        let per_page = query.limit.min(24);
        let mut request = self.client.get(SEARCH_ENDPOINT).query(&[
            ("type", "models"),
            ("q", query.query.as_str()),
            ("per_page", per_page.to_string().as_str()),
        ]);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Token {token}"));
        }

        let response = request
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

        let models = body
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let items: Vec<Value> = models
            .iter()
            .take(query.limit as usize)
            .map(map_model)
            .collect();
        Ok(Value::Array(items))
    }
}
