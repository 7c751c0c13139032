//! Plain-text assembly: one concatenated file with a metadata header.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::assemble::ChapterArtifact;
use crate::error::Result;
use crate::types::BookInfo;
use crate::utils::sanitize_filename;

pub(crate) fn write_txt(
    dir: &Path,
    info: &BookInfo,
    chapters: &[ChapterArtifact],
) -> Result<PathBuf> {
    let output = dir.join(format!("{}_full.txt", sanitize_filename(&info.title)));
    let rule = "=".repeat(50);

    let mut file = std::io::BufWriter::new(std::fs::File::create(&output)?);
    writeln!(file, "{}", info.title)?;
    writeln!(file, "作者：{}", info.author)?;
    writeln!(file, "状态：{}", info.status)?;
    if !info.synopsis.is_empty() {
        writeln!(file, "\n{}", info.synopsis)?;
    }
    writeln!(file)?;

    for chapter in chapters {
        writeln!(file, "{rule}")?;
        writeln!(file, "{}", chapter.title)?;
        writeln!(file, "{rule}")?;
        writeln!(file, "\n{}\n", chapter.body)?;
    }
    file.flush()?;

    Ok(output)
}
