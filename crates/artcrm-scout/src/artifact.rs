//! JSON record of a scout run.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::ArtifactError;
use crate::types::ScoutRunResult;

/// Replaces every character outside `[A-Za-z0-9_-]` with `_`.
fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Runs sharing a second get `_2`, `_3`, ... appended before giving up.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// `scout_<city>_<country>_<YYYYmmdd_HHMMSS>.json`
#[must_use]
pub fn artifact_file_name(city: &str, country: &str, timestamp: DateTime<Utc>) -> String {
    format!(
        "scout_{}_{}_{}.json",
        sanitize(city),
        sanitize(country),
        timestamp.format("%Y%m%d_%H%M%S")
    )
}

fn numbered(file_name: &str, attempt: u32) -> String {
    if attempt == 1 {
        return file_name.to_string();
    }
    match file_name.strip_suffix(".json") {
        Some(stem) => format!("{stem}_{attempt}.json"),
        None => format!("{file_name}_{attempt}"),
    }
}

/// Writes `result` as pretty JSON into `results_dir`, creating the directory
/// if needed. The file name is stamped with the run's timestamp; an existing
/// file is never replaced, a numeric suffix is added instead.
///
/// # Errors
///
/// Returns [`ArtifactError`] if serialization or any filesystem step fails.
pub async fn write_artifact(
    results_dir: &Path,
    result: &ScoutRunResult,
) -> Result<PathBuf, ArtifactError> {
    let stats = &result.stats;
    let file_name = artifact_file_name(&stats.city, &stats.country, stats.timestamp);
    let body = serde_json::to_vec_pretty(result)?;

    tokio::fs::create_dir_all(results_dir)
        .await
        .map_err(|source| ArtifactError::Io {
            path: results_dir.to_path_buf(),
            source,
        })?;

    let mut attempt = 1;
    let (path, mut file) = loop {
        let path = results_dir.join(numbered(&file_name, attempt));
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => break (path, file),
            Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < MAX_NAME_ATTEMPTS => {
                attempt += 1;
            }
            Err(source) => return Err(ArtifactError::Io { path, source }),
        }
    };

    let written = async {
        file.write_all(&body).await?;
        file.flush().await
    };
    written.await.map_err(|source| ArtifactError::Io {
        path: path.clone(),
        source,
    })?;

    tracing::info!(path = %path.display(), "wrote scout results");
    Ok(path)
}
