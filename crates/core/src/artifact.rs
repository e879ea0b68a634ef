//! Artifact naming and discovery.
//!
//! The converter is told to write `<dir>/<job id>.%(ext)s`, but the final
//! extension depends on what it decides to produce. Discovery is therefore a
//! two-step lookup:
//!
//! 1. [`Lookup::ExpectedPath`]: `<dir>/<job id>.<target extension>`.
//! 2. [`Lookup::PrefixScan`]: the first file (by name) in `<dir>` whose name
//!    starts with the job id.

use std::path::{Path, PathBuf};

use crate::job::Artifact;
use crate::types::JobId;

/// Extension placeholder understood by the converter's output template.
pub const EXTENSION_PLACEHOLDER: &str = "%(ext)s";

/// Which discovery step located the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    ExpectedPath,
    PrefixScan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub lookup: Lookup,
    pub artifact: Artifact,
}

/// `<job id>.<extension>`.
pub fn expected_file_name(id: JobId, extension: &str) -> String {
    format!("{id}.{extension}")
}

/// Output path template passed to the converter.
pub fn output_template(output_dir: &Path, id: JobId) -> PathBuf {
    output_dir.join(format!("{id}.{EXTENSION_PLACEHOLDER}"))
}

/// Locate the artifact produced for `id`, verifying that it exists.
pub async fn discover(output_dir: &Path, id: JobId, extension: &str) -> Option<Discovery> {
    let name = expected_file_name(id, extension);
    let expected = output_dir.join(&name);
    if is_file(&expected).await {
        return Some(Discovery {
            lookup: Lookup::ExpectedPath,
            artifact: Artifact {
                name,
                path: expected,
            },
        });
    }

    scan_for_prefix(output_dir, &id.to_string())
        .await
        .map(|artifact| Discovery {
            lookup: Lookup::PrefixScan,
            artifact,
        })
}

async fn scan_for_prefix(output_dir: &Path, prefix: &str) -> Option<Artifact> {
    let mut entries = match tokio::fs::read_dir(output_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %output_dir.display(), error = %e, "Artifact scan failed");
            return None;
        }
    };

    let mut matches = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let Ok(name) = entry.file_name().into_string() else {
                    continue;
                };
                if name.starts_with(prefix) && is_file(&entry.path()).await {
                    matches.push(name);
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(dir = %output_dir.display(), error = %e, "Artifact scan aborted");
                break;
            }
        }
    }

    matches.sort();
    matches.into_iter().next().map(|name| Artifact {
        path: output_dir.join(&name),
        name,
    })
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"audio").expect("write file");
    }

    #[test]
    fn template_uses_job_id_and_placeholder() {
        let id = uuid::Uuid::new_v4();
        let template = output_template(Path::new("/data/downloads"), id);
        assert_eq!(
            template,
            PathBuf::from(format!("/data/downloads/{id}.%(ext)s"))
        );
    }

    #[tokio::test]
    async fn expected_path_hit() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let id = uuid::Uuid::new_v4();
        touch(dir.path(), &format!("{id}.mp3"));
        touch(dir.path(), &format!("{id}.webm"));

        let found = discover(dir.path(), id, "mp3").await.expect("found");
        assert_eq!(found.lookup, Lookup::ExpectedPath);
        assert_eq!(found.artifact.name, format!("{id}.mp3"));
        assert_eq!(found.artifact.path, dir.path().join(format!("{id}.mp3")));
    }

    #[tokio::test]
    async fn prefix_scan_hit() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let id = uuid::Uuid::new_v4();
        let other = uuid::Uuid::new_v4();
        touch(dir.path(), &format!("{other}.m4a"));
        touch(dir.path(), &format!("{id}.opus"));
        touch(dir.path(), &format!("{id}.m4a"));

        let found = discover(dir.path(), id, "mp3").await.expect("found");
        assert_eq!(found.lookup, Lookup::PrefixScan);
        // First match in name order.
        assert_eq!(found.artifact.name, format!("{id}.m4a"));
    }

    #[tokio::test]
    async fn directories_are_not_artifacts() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let id = uuid::Uuid::new_v4();
        std::fs::create_dir(dir.path().join(format!("{id}.mp3"))).unwrap();
        assert!(discover(dir.path(), id, "mp3").await.is_none());
    }

    #[tokio::test]
    async fn nothing_found() {
        let dir = tempfile::tempdir().expect("create temp dir");
        touch(dir.path(), "unrelated.mp3");
        assert!(discover(dir.path(), uuid::Uuid::new_v4(), "mp3").await.is_none());
    }

    #[tokio::test]
    async fn missing_directory_is_not_an_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let gone = dir.path().join("gone");
        assert!(discover(&gone, uuid::Uuid::new_v4(), "mp3").await.is_none());
    }
}
