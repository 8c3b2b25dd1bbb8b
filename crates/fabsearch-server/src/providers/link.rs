//! Link-only providers
//!
//! These adapters never hit an API; they exist so the response can carry a
//! "Search on <site>" quick-link and pseudo-result for platforms without a
//! public search API. Returning an empty array keeps the result list
//! clean; the engine renders the deep-link separately.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use fabsearch_core::{
    AdapterError, AssetType, ProviderDescriptor, ProviderQuery, SearchAdapter,
};

use super::favicon;

/// A provider that only contributes a deep-link.
pub struct LinkAdapter {
    descriptor: ProviderDescriptor,
}

impl LinkAdapter {
    pub fn new(descriptor: ProviderDescriptor) -> Self {
        Self { descriptor }
    }
}

#[async_trait]
impl SearchAdapter for LinkAdapter {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn search(&self, _query: &ProviderQuery) -> Result<Value, AdapterError> {
        Ok(Value::Array(Vec::new()))
    }
}

fn link(
    id: &str,
    label: &str,
    domain: &str,
    search_url_template: &str,
    asset_types: Vec<AssetType>,
) -> Arc<dyn SearchAdapter> {
    let mut descriptor = ProviderDescriptor::link(id, label);
    descriptor.homepage = Some(format!("https://{domain}"));
    descriptor.search_url_template = Some(search_url_template.to_string());
    descriptor.icon_url = Some(favicon(domain));
    descriptor.asset_types = asset_types;
    descriptor.notes = "Link-only (no public search API).".to_string();
    Arc::new(LinkAdapter::new(descriptor))
}

/// The built-in set of link-only platforms.
pub fn default_link_adapters() -> Vec<Arc<dyn SearchAdapter>> {
    vec![
        link(
            "printables",
            "Printables",
            "printables.com",
            "https://www.printables.com/search/models?q={q}",
            vec![AssetType::Model3d],
        ),
        link(
            "thangs",
            "Thangs",
            "thangs.com",
            "https://thangs.com/search/{q}",
            vec![AssetType::Model3d],
        ),
        link(
            "makerworld",
            "MakerWorld",
            "makerworld.com",
            "https://makerworld.com/en/search/models?keyword={q}",
            vec![AssetType::Model3d],
        ),
        link(
            "turbosquid",
            "TurboSquid",
            "turbosquid.com",
            "https://www.turbosquid.com/Search/Index.cfm?keyword={q}",
            vec![AssetType::Model3d],
        ),
        link(
            "openbuilds",
            "OpenBuilds",
            "openbuilds.com",
            "https://openbuilds.com/search/324236/?q={q}&t=post",
            vec![AssetType::Cnc],
        ),
        link(
            "vectric",
            "Vectric",
            "vectric.com",
            "https://forum.vectric.com/search.php?keywords={q}",
            vec![AssetType::Cnc],
        ),
        link(
            "easel",
            "Easel",
            "easel.inventables.com",
            "https://easel.inventables.com/projects?q={q}",
            vec![AssetType::Cnc],
        ),
        link(
            "glowforge",
            "Glowforge",
            "glowforge.com",
            "https://community.glowforge.com/search?q={q}",
            vec![AssetType::Laser2d],
        ),
        link(
            "xtool",
            "xTool",
            "xtool.com",
            "https://projects.xtool.com/search?keyword={q}",
            vec![AssetType::Laser2d],
        ),
    ]
}
