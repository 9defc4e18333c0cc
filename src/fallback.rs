use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::{ReporterError, Result};
use crate::formatter::IssueDraft;

/// Contents of a fallback file.
#[derive(Serialize)]
struct FallbackRecord<'a> {
    title: &'a str,
    body: &'a str,
    timestamp: String,
}

/// Save the report under `dir` and return the new file's path.
pub fn persist_locally(dir: &Path, draft: &IssueDraft) -> Result<PathBuf> {
    persist_at(dir, draft, Local::now())
}

/// Never overwrites: a second report in the same second gets a `_1`, `_2`,
/// ... suffix.
fn persist_at(dir: &Path, draft: &IssueDraft, now: DateTime<Local>) -> Result<PathBuf> {
    let record = FallbackRecord {
        title: &draft.title,
        body: &draft.body,
        timestamp: now.to_rfc3339(),
    };
    let json = serde_json::to_string_pretty(&record).map_err(|e| ReporterError::Persistence {
        path: dir.to_path_buf(),
        source: e.into(),
    })?;
    let stamp = now.format("%Y%m%d%H%M%S").to_string();

    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("error_report_{stamp}.json")
        } else {
            format!("error_report_{stamp}_{attempt}.json")
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(json.as_bytes())
                    .map_err(|source| ReporterError::Persistence {
                        path: path.clone(),
                        source,
                    })?;
                tracing::info!(path = %path.display(), "saved error report locally");
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(source) => return Err(ReporterError::Persistence { path, source }),
        }
    }
}
