//! Local filesystem resolver handler — the unconditional default backend
//! (spec.md §4.6, §9).

use std::path::PathBuf;

use async_trait::async_trait;

use super::{Include, ResolverError, SchemeHandler};
use crate::models::BlueprintDocumentInfo;

pub fn build_include(info: &BlueprintDocumentInfo) -> Result<Include, ResolverError> {
    let path: PathBuf = [info.directory.as_str(), info.blueprint_file.as_str()]
        .iter()
        .collect();
    Ok(Include {
        source_type: String::new(),
        object_path: path.to_string_lossy().into_owned(),
        ..Default::default()
    })
}

/// Returns the document's absolute local path; the loader opens it itself
/// (spec.md §4.6: "produce the blueprint source string (or an absolute
/// local path) for the loader").
pub struct LocalFilesystemHandler;

#[async_trait]
impl SchemeHandler for LocalFilesystemHandler {
    fn build_include(&self, info: &BlueprintDocumentInfo) -> Result<Include, ResolverError> {
        build_include(info)
    }

    async fn fetch(&self, include: &Include) -> Result<String, ResolverError> {
        let path = std::path::Path::new(&include.object_path);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| ResolverError::FetchFailed(e.to_string()))?
                .join(path)
        };
        tokio::fs::metadata(&absolute)
            .await
            .map_err(|_| ResolverError::Unresolvable)?;
        Ok(absolute.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_directory_and_file_with_host_separator() {
        let info = BlueprintDocumentInfo {
            file_source_scheme: Default::default(),
            directory: "/test/dir".into(),
            blueprint_file: "test.blueprint.yaml".into(),
            location_metadata: Default::default(),
        };
        let include = build_include(&info).unwrap();
        let expected: PathBuf = ["/test/dir", "test.blueprint.yaml"].iter().collect();
        assert_eq!(include.object_path, expected.to_string_lossy());
        assert!(include.source_type.is_empty());
    }

    #[tokio::test]
    async fn fetch_errors_on_missing_file() {
        let info = BlueprintDocumentInfo {
            file_source_scheme: Default::default(),
            directory: "/does/not/exist".into(),
            blueprint_file: "missing.yml".into(),
            location_metadata: Default::default(),
        };
        let include = build_include(&info).unwrap();
        let handler = LocalFilesystemHandler;
        let err = handler.fetch(&include).await.unwrap_err();
        assert!(matches!(err, ResolverError::Unresolvable));
    }

    #[tokio::test]
    async fn fetch_resolves_existing_file_to_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("project.blueprint.yml");
        tokio::fs::write(&file_path, b"name: demo").await.unwrap();

        let info = BlueprintDocumentInfo {
            file_source_scheme: Default::default(),
            directory: dir.path().to_string_lossy().into_owned(),
            blueprint_file: "project.blueprint.yml".into(),
            location_metadata: Default::default(),
        };
        let include = build_include(&info).unwrap();
        let handler = LocalFilesystemHandler;
        let resolved = handler.fetch(&include).await.unwrap();
        assert_eq!(std::path::Path::new(&resolved), file_path);
    }
}
