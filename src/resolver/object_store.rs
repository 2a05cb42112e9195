//! S3 / GCS / Azure Blob resolver handlers (spec.md §4.6).
//!
//! The actual object-store fetch is an out-of-scope external collaborator
//! (spec.md §1 names persistence/object backends as interfaces, not
//! implementations); this module builds the full addressing `Include` and
//! delegates the byte fetch to an injected `ObjectFetcher`.

use async_trait::async_trait;

use super::{Include, ResolverError, SchemeHandler};
use crate::models::{BlueprintDocumentInfo, FileSourceScheme};

pub fn source_type_for(scheme: FileSourceScheme) -> &'static str {
    match scheme {
        FileSourceScheme::S3 => "s3",
        FileSourceScheme::Gcs => "gcs",
        FileSourceScheme::Azureblob => "azureblob",
        _ => "",
    }
}

/// First path segment of `directory` is the bucket/container name, the
/// remainder is the key prefix; `object_path = prefix + "/" + file`
/// (spec.md §4.6).
pub fn build_include(info: &BlueprintDocumentInfo) -> Result<Include, ResolverError> {
    let trimmed = info.directory.trim_matches('/');
    let mut segments = trimmed.splitn(2, '/');
    let bucket_name = segments
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ResolverError::InvalidLocationMetadata(
                "directory must start with a bucket or container name".into(),
            )
        })?
        .to_string();
    let prefix = segments.next().unwrap_or("");
    let object_path = if prefix.is_empty() {
        info.blueprint_file.trim_start_matches('/').to_string()
    } else {
        format!("{}/{}", prefix, info.blueprint_file.trim_start_matches('/'))
    };

    let region = info
        .location_metadata
        .get("region")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let source_type = source_type_for(info.file_source_scheme).to_string();
    let (bucket, container) = if info.file_source_scheme == FileSourceScheme::Azureblob {
        (None, Some(bucket_name))
    } else {
        (Some(bucket_name), None)
    };

    Ok(Include {
        source_type,
        bucket,
        container,
        region,
        object_path,
        host: None,
    })
}

/// Fetches an object's bytes given a resolved `Include`. A real
/// implementation would wrap the corresponding cloud SDK client; that
/// client is the out-of-scope external collaborator here.
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    async fn fetch_object(&self, include: &Include) -> Result<String, ResolverError>;
}

pub struct ObjectStoreHandler {
    fetcher: std::sync::Arc<dyn ObjectFetcher>,
}

impl ObjectStoreHandler {
    pub fn new(fetcher: std::sync::Arc<dyn ObjectFetcher>) -> Self {
        ObjectStoreHandler { fetcher }
    }
}

#[async_trait]
impl SchemeHandler for ObjectStoreHandler {
    fn build_include(&self, info: &BlueprintDocumentInfo) -> Result<Include, ResolverError> {
        build_include(info)
    }

    async fn fetch(&self, include: &Include) -> Result<String, ResolverError> {
        self.fetcher.fetch_object(include).await
    }
}

/// Default fetcher wired by `main.rs` until a real cloud-SDK client is
/// plugged in for the S3/GCS/Azure Blob handlers.
pub struct UnimplementedObjectFetcher;

#[async_trait]
impl ObjectFetcher for UnimplementedObjectFetcher {
    async fn fetch_object(&self, _include: &Include) -> Result<String, ResolverError> {
        Err(ResolverError::FetchFailed("no object store fetcher configured".into()))
    }
}

#[cfg(any(test, feature = "test-support"))]
pub struct FakeObjectFetcher {
    pub contents: String,
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl ObjectFetcher for FakeObjectFetcher {
    async fn fetch_object(&self, _include: &Include) -> Result<String, ResolverError> {
        Ok(self.contents.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(scheme: FileSourceScheme, directory: &str) -> BlueprintDocumentInfo {
        BlueprintDocumentInfo {
            file_source_scheme: scheme,
            directory: directory.into(),
            blueprint_file: "project.blueprint.yml".into(),
            location_metadata: Default::default(),
        }
    }

    #[test]
    fn splits_bucket_from_prefix() {
        let include = build_include(&info(FileSourceScheme::S3, "my-bucket/path/to/dir")).unwrap();
        assert_eq!(include.bucket.as_deref(), Some("my-bucket"));
        assert_eq!(include.object_path, "path/to/dir/project.blueprint.yml");
        assert_eq!(include.source_type, "s3");
    }

    #[test]
    fn bucket_only_directory_has_no_prefix() {
        let include = build_include(&info(FileSourceScheme::Gcs, "my-bucket")).unwrap();
        assert_eq!(include.bucket.as_deref(), Some("my-bucket"));
        assert_eq!(include.object_path, "project.blueprint.yml");
    }

    #[test]
    fn azure_uses_container_not_bucket() {
        let include =
            build_include(&info(FileSourceScheme::Azureblob, "my-container/a")).unwrap();
        assert_eq!(include.container.as_deref(), Some("my-container"));
        assert!(include.bucket.is_none());
    }

    #[tokio::test]
    async fn fetch_delegates_to_injected_fetcher() {
        let handler = ObjectStoreHandler::new(std::sync::Arc::new(FakeObjectFetcher {
            contents: "name: demo".into(),
        }));
        let include = build_include(&info(FileSourceScheme::S3, "bucket/dir")).unwrap();
        let contents = handler.fetch(&include).await.unwrap();
        assert_eq!(contents, "name: demo");
    }
}
