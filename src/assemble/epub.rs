//! EPUB assembly: a minimal EPUB 2 container with one XHTML page per chapter.
//!
//! The `mimetype` entry must be the first entry in the archive and must be
//! stored uncompressed, per the OCF spec.

use std::io::Write;
use std::path::{Path, PathBuf};

use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::assemble::ChapterArtifact;
use crate::error::Result;
use crate::types::BookInfo;
use crate::utils::sanitize_filename;

pub(crate) fn write_epub(
    dir: &Path,
    info: &BookInfo,
    chapters: &[ChapterArtifact],
) -> Result<PathBuf> {
    let output = dir.join(format!("{}.epub", sanitize_filename(&info.title)));
    let file = std::fs::File::create(&output)?;
    let mut zip = zip::ZipWriter::new(file);

    let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored)?;
    zip.write_all(b"application/epub+zip")?;

    zip.start_file("META-INF/container.xml", deflated)?;
    zip.write_all(CONTAINER_XML.as_bytes())?;

    zip.start_file("OEBPS/content.opf", deflated)?;
    zip.write_all(content_opf(info, chapters).as_bytes())?;

    zip.start_file("OEBPS/toc.ncx", deflated)?;
    zip.write_all(toc_ncx(info, chapters).as_bytes())?;

    zip.start_file("OEBPS/intro.xhtml", deflated)?;
    zip.write_all(intro_page(info).as_bytes())?;

    for chapter in chapters {
        zip.start_file(format!("OEBPS/chapter_{:04}.xhtml", chapter.index), deflated)?;
        zip.write_all(chapter_page(chapter).as_bytes())?;
    }

    zip.finish()?;
    Ok(output)
}

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

fn content_opf(info: &BookInfo, chapters: &[ChapterArtifact]) -> String {
    let mut manifest = String::from(
        r#"    <item id="intro" href="intro.xhtml" media-type="application/xhtml+xml"/>
"#,
    );
    let mut spine = String::from("    <itemref idref=\"intro\"/>\n");
    for chapter in chapters {
        manifest.push_str(&format!(
            "    <item id=\"chapter_{0:04}\" href=\"chapter_{0:04}.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
            chapter.index
        ));
        spine.push_str(&format!(
            "    <itemref idref=\"chapter_{:04}\"/>\n",
            chapter.index
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="bookid" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{title}</dc:title>
    <dc:creator>{author}</dc:creator>
    <dc:language>zh</dc:language>
    <dc:identifier id="bookid">{id}</dc:identifier>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
{manifest}  </manifest>
  <spine toc="ncx">
{spine}  </spine>
</package>
"#,
        title = xml_escape(&info.title),
        author = xml_escape(&info.author),
        id = xml_escape(&info.title),
        manifest = manifest,
        spine = spine,
    )
}

fn toc_ncx(info: &BookInfo, chapters: &[ChapterArtifact]) -> String {
    let mut points = String::from(
        r#"    <navPoint id="intro" playOrder="1">
      <navLabel><text>简介</text></navLabel>
      <content src="intro.xhtml"/>
    </navPoint>
"#,
    );
    for (order, chapter) in chapters.iter().enumerate() {
        points.push_str(&format!(
            r#"    <navPoint id="chapter_{index:04}" playOrder="{order}">
      <navLabel><text>{title}</text></navLabel>
      <content src="chapter_{index:04}.xhtml"/>
    </navPoint>
"#,
            index = chapter.index,
            order = order + 2,
            title = xml_escape(&chapter.title),
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{id}"/>
  </head>
  <docTitle><text>{title}</text></docTitle>
  <navMap>
{points}  </navMap>
</ncx>
"#,
        id = xml_escape(&info.title),
        title = xml_escape(&info.title),
        points = points,
    )
}

fn intro_page(info: &BookInfo) -> String {
    let synopsis = info
        .synopsis
        .lines()
        .map(|line| format!("    <p>{}</p>\n", xml_escape(line)))
        .collect::<String>();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
  <head><title>{title}</title></head>
  <body>
    <h1>{title}</h1>
    <p>作者：{author}</p>
    <p>状态：{status}</p>
{synopsis}  </body>
</html>
"#,
        title = xml_escape(&info.title),
        author = xml_escape(&info.author),
        status = info.status,
        synopsis = synopsis,
    )
}

fn chapter_page(chapter: &ChapterArtifact) -> String {
    let paragraphs = chapter
        .body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| format!("    <p>{}</p>\n", xml_escape(line.trim())))
        .collect::<String>();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
  <head><title>{title}</title></head>
  <body>
    <h2>{title}</h2>
{paragraphs}  </body>
</html>
"#,
        title = xml_escape(&chapter.title),
        paragraphs = paragraphs,
    )
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BookStatus;
    use std::io::Read;

    fn info() -> BookInfo {
        BookInfo {
            title: "书名 & 副标题".to_string(),
            author: "作者".to_string(),
            status: BookStatus::Ongoing,
            synopsis: "简介".to_string(),
            latest_chapter: String::new(),
            category: None,
            word_count: None,
            updated: None,
        }
    }

    fn sample_chapters(dir: &Path) -> Vec<ChapterArtifact> {
        vec![ChapterArtifact {
            path: dir.join("0001-a.txt"),
            index: 1,
            title: "第一章 <开端>".to_string(),
            body: "第一段。\n第二段。".to_string(),
        }]
    }

    #[test]
    fn mimetype_is_the_first_entry_and_stored() {
        let dir = tempfile::tempdir().unwrap();
        let output = write_epub(dir.path(), &info(), &sample_chapters(dir.path())).unwrap();

        let mut archive = zip::ZipArchive::new(std::fs::File::open(output).unwrap()).unwrap();
        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), "mimetype");
        assert_eq!(entry.compression(), CompressionMethod::Stored);

        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "application/epub+zip");
    }

    #[test]
    fn package_lists_every_chapter_in_the_spine() {
        let dir = tempfile::tempdir().unwrap();
        let output = write_epub(dir.path(), &info(), &sample_chapters(dir.path())).unwrap();

        let mut archive = zip::ZipArchive::new(std::fs::File::open(output).unwrap()).unwrap();
        let mut opf = String::new();
        archive
            .by_name("OEBPS/content.opf")
            .unwrap()
            .read_to_string(&mut opf)
            .unwrap();
        assert!(opf.contains("chapter_0001.xhtml"));
        assert!(opf.contains("<itemref idref=\"chapter_0001\"/>"));
        assert!(opf.contains("书名 &amp; 副标题"), "title is escaped");
    }

    #[test]
    fn chapter_markup_escapes_titles_and_splits_paragraphs() {
        let dir = tempfile::tempdir().unwrap();
        let page = chapter_page(&sample_chapters(dir.path())[0]);
        assert!(page.contains("第一章 &lt;开端&gt;"));
        assert_eq!(page.matches("<p>").count(), 2);
    }
}
