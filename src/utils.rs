//! Utility functions

use std::path::Path;

/// Strip characters that are invalid in file names on common platforms.
///
/// Returns "chapter" when nothing printable survives, so a destination name
/// can always be formed.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "chapter".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Derive a chapter index from a persisted artifact's file name.
///
/// Destinations are named `{index:04}-{title}.txt`, so the leading digit run
/// is the index. Returns `None` when the name does not start with a digit.
pub fn chapter_number(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    let digits: String = name.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// Build the destination file name for a chapter: a 4-digit zero-padded index
/// prefix before the sanitized title, so lexicographic order coincides with
/// numeric order for indices below 10000.
pub fn destination_name(index: u32, title: &str) -> String {
    format!("{:04}-{}.txt", index, sanitize_filename(title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn sanitize_strips_reserved_characters() {
        assert_eq!(sanitize_filename("a/b\\c:d*e?f\"g<h>i|j"), "abcdefghij");
        assert_eq!(sanitize_filename("  spaced  "), "spaced");
        assert_eq!(sanitize_filename("第一章 起点"), "第一章 起点");
    }

    #[test]
    fn sanitize_falls_back_when_nothing_survives() {
        assert_eq!(sanitize_filename("***"), "chapter");
        assert_eq!(sanitize_filename("   "), "chapter");
    }

    #[test]
    fn chapter_number_parses_leading_digits() {
        assert_eq!(chapter_number(&PathBuf::from("0002-second.txt")), Some(2));
        assert_eq!(
            chapter_number(&PathBuf::from("novels/book/0131-ch.txt")),
            Some(131)
        );
        assert_eq!(chapter_number(&PathBuf::from("info.txt")), None);
        assert_eq!(chapter_number(&PathBuf::from("no-digits.txt")), None);
    }

    #[test]
    fn destination_name_is_zero_padded_and_sanitized() {
        assert_eq!(destination_name(7, "a/b"), "0007-ab.txt");
        assert_eq!(destination_name(1234, "t"), "1234-t.txt");
    }
}
