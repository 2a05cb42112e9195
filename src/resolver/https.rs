//! HTTPS resolver handler (spec.md §4.6).
//!
//! `directory` is the host+path base; a `host` key in `location_metadata` is
//! required. Missing host surfaces the taxonomic `InvalidLocationMetadata`
//! error, which the Controller maps to 400.

use async_trait::async_trait;

use super::{Include, ResolverError, SchemeHandler};
use crate::models::BlueprintDocumentInfo;

pub fn build_include(info: &BlueprintDocumentInfo) -> Result<Include, ResolverError> {
    let host = info
        .location_metadata
        .get("host")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            ResolverError::InvalidLocationMetadata("location_metadata.host is required".into())
        })?
        .to_string();

    let base = info.directory.trim_matches('/');
    let file = info.blueprint_file.trim_start_matches('/');
    let object_path = if base.is_empty() {
        file.to_string()
    } else {
        format!("{base}/{file}")
    };

    Ok(Include {
        source_type: "https".into(),
        object_path,
        host: Some(host),
        ..Default::default()
    })
}

/// Fetches the document over HTTPS. The network call itself sits at the
/// boundary this core delegates to an injected `reqwest::Client`, the same
/// HTTP client the model service uses for its own outbound calls.
pub struct HttpsHandler {
    client: reqwest::Client,
}

impl HttpsHandler {
    pub fn new(client: reqwest::Client) -> Self {
        HttpsHandler { client }
    }
}

#[async_trait]
impl SchemeHandler for HttpsHandler {
    fn build_include(&self, info: &BlueprintDocumentInfo) -> Result<Include, ResolverError> {
        build_include(info)
    }

    async fn fetch(&self, include: &Include) -> Result<String, ResolverError> {
        let host = include
            .host
            .as_deref()
            .ok_or_else(|| ResolverError::InvalidLocationMetadata("missing host".into()))?;
        let url = format!("https://{host}/{}", include.object_path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ResolverError::FetchFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ResolverError::Unresolvable);
        }
        response
            .text()
            .await
            .map_err(|e| ResolverError::FetchFailed(e.to_string()))
    }
}
