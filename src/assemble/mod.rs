//! Merges per-chapter artifacts into the final book output.
//!
//! Discovery is by file name shape: anything in the save directory whose name
//! starts with a digit and ends in `.txt` is a chapter artifact. Metadata
//! files (`info.txt`, the failure ledger) never match. Intermediate artifacts
//! are removed only after the final output has been written.

mod epub;
mod txt;

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{BookInfo, OutputFormat};
use crate::utils::chapter_number;

/// One chapter artifact, parsed back from disk.
pub(crate) struct ChapterArtifact {
    pub(crate) path: PathBuf,
    pub(crate) index: u32,
    pub(crate) title: String,
    pub(crate) body: String,
}

/// Merge every chapter artifact under `dir` into one final output file.
///
/// Artifacts are merged in ascending chapter order. An unreadable artifact is
/// skipped with a warning; zero discovered or zero readable artifacts is
/// fatal. Returns the path of the assembled output.
pub fn assemble(dir: &Path, info: &BookInfo, format: OutputFormat) -> Result<PathBuf> {
    let paths = discover_artifacts(dir)?;
    if paths.is_empty() {
        return Err(Error::NoArtifacts(dir.to_path_buf()));
    }

    let mut chapters = Vec::with_capacity(paths.len());
    for path in paths {
        match std::fs::read_to_string(&path) {
            Ok(raw) => {
                let (title, body) = parse_artifact(&raw);
                chapters.push(ChapterArtifact {
                    index: chapter_number(&path).unwrap_or(0),
                    path,
                    title,
                    body,
                });
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable artifact");
            }
        }
    }
    if chapters.is_empty() {
        return Err(Error::NoArtifacts(dir.to_path_buf()));
    }

    let output = match format {
        OutputFormat::Txt => txt::write_txt(dir, info, &chapters)?,
        OutputFormat::Epub => epub::write_epub(dir, info, &chapters)?,
    };
    tracing::info!(
        output = %output.display(),
        chapters = chapters.len(),
        "book assembled"
    );

    // The final output is durable at this point; a failed cleanup leaves
    // stale intermediates behind but never invalidates the book.
    for chapter in &chapters {
        if let Err(e) = std::fs::remove_file(&chapter.path) {
            tracing::warn!(path = %chapter.path.display(), error = %e, "failed to remove intermediate");
        }
    }

    Ok(output)
}

/// Chapter artifact paths under `dir`, sorted ascending by chapter number.
fn discover_artifacts(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.ends_with(".txt") && name.starts_with(|c: char| c.is_ascii_digit()) {
            paths.push(path);
        }
    }
    // A name without a parsable number sorts first; the sort is stable so
    // ties keep directory order.
    paths.sort_by_key(|path| chapter_number(path).unwrap_or(0));
    Ok(paths)
}

/// Split a persisted artifact back into title and body.
///
/// The first line is the title; rule lines and edge blank lines around the
/// body are dropped.
fn parse_artifact(raw: &str) -> (String, String) {
    let mut lines = raw.lines();
    let title = lines.next().unwrap_or("").to_string();
    let body: Vec<&str> = lines
        .filter(|line| !(line.len() >= 3 && line.chars().all(|c| c == '=')))
        .collect();
    let body = body.join("\n").trim().to_string();
    (title, body)
}
