//! Folder walking and content extraction.
//!
//! `extract` never fails: unreadable files, unsupported formats and broken
//! documents come back as an empty string, which the indexer skips.

use crate::indexer::SourceItem;
use calamine::{open_workbook_auto, Data, Reader as _};
use quick_xml::events::Event;
use quick_xml::Reader;
use scraper::Html;
use std::fs;
use std::io::{self, Cursor, Read, Seek};
use std::panic;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;
use zip::ZipArchive;

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "rst", "py", "rs", "js", "ts", "java", "c", "h", "cpp", "go", "json", "log", "csv",
    "tsv", "toml", "yaml", "yml", "ini", "cfg",
];
const MARKUP_EXTENSIONS: &[&str] = &["html", "htm", "xhtml", "xml"];
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Markup,
    Docx,
    Pptx,
    Spreadsheet,
    Pdf,
    Unsupported,
}

#[derive(Debug, Error)]
enum ExtractError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    Spreadsheet(#[from] calamine::Error),
    #[error("pdf: {0}")]
    Pdf(String),
    #[error("not decodable as UTF-8 or GBK")]
    Undecodable,
}

fn format_of(path: &Path) -> Format {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        e if TEXT_EXTENSIONS.contains(&e) => Format::Text,
        e if MARKUP_EXTENSIONS.contains(&e) => Format::Markup,
        e if SPREADSHEET_EXTENSIONS.contains(&e) => Format::Spreadsheet,
        "docx" => Format::Docx,
        "pptx" => Format::Pptx,
        "pdf" => Format::Pdf,
        _ => Format::Unsupported,
    }
}

/// UTF-8 first, then GBK. Undecodable bytes yield an empty string.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    match encoding_rs::GBK.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(s) => s.into_owned(),
        None => String::new(),
    }
}

/// Visible text of an HTML/XML document, one text node per line.
pub fn strip_markup(markup: &str) -> String {
    let doc = Html::parse_document(markup);
    doc.root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn extract(path: &Path) -> String {
    let result = match format_of(path) {
        Format::Unsupported => {
            tracing::debug!(path = %path.display(), "unsupported format");
            return String::new();
        }
        Format::Text => read_text(path),
        Format::Markup => read_text(path).map(|t| strip_markup(&t)),
        Format::Docx => fs::read(path).map_err(ExtractError::from).and_then(|b| docx_text(&b)),
        Format::Pptx => fs::read(path).map_err(ExtractError::from).and_then(|b| pptx_text(&b)),
        Format::Pdf => fs::read(path).map_err(ExtractError::from).and_then(|b| pdf_text(&b)),
        Format::Spreadsheet => spreadsheet_text(path),
    };
    match result {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to extract text");
            String::new()
        }
    }
}

fn read_text(path: &Path) -> Result<String, ExtractError> {
    let bytes = fs::read(path)?;
    let text = decode_text(&bytes);
    if text.is_empty() && !bytes.is_empty() {
        return Err(ExtractError::Undecodable);
    }
    Ok(text)
}

/// Text runs (`<w:t>`, `<a:t>`) of an Office Open XML part, one paragraph per line.
fn xml_text(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_run = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_run = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_run = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_run => out.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out.trim_end().to_string())
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String, ExtractError> {
    let mut xml = String::new();
    archive.by_name(name)?.read_to_string(&mut xml)?;
    Ok(xml)
}

fn docx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    xml_text(&read_part(&mut archive, "word/document.xml")?)
}

/// Slides in presentation order (`slide2.xml` before `slide10.xml`).
fn pptx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let n = name.strip_prefix("ppt/slides/slide")?.strip_suffix(".xml")?.parse().ok()?;
            Some((n, name.to_string()))
        })
        .collect();
    slides.sort();
    let mut texts = Vec::with_capacity(slides.len());
    for (_, name) in slides {
        texts.push(xml_text(&read_part(&mut archive, &name)?)?);
    }
    Ok(texts.join("\n"))
}

/// Non-empty cells of every sheet, space separated, one row per line.
fn spreadsheet_text(path: &Path) -> Result<String, ExtractError> {
    let mut workbook = open_workbook_auto(path)?;
    let mut lines = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        for row in range.rows() {
            let cells: Vec<String> = row
                .iter()
                .filter(|c| !matches!(c, Data::Empty))
                .map(|c| c.to_string())
                .collect();
            if !cells.is_empty() {
                lines.push(cells.join(" "));
            }
        }
    }
    Ok(lines.join("\n"))
}

/// The PDF parser can panic on malformed input; that counts as a failed extraction.
fn pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    match panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ExtractError::Pdf(format!("{e:?}"))),
        Err(_) => Err(ExtractError::Pdf("parser panicked".into())),
    }
}

/// Every regular file under a folder, in file-name order, as `SourceItem`s.
/// Walk errors are logged and skipped.
pub struct FolderSource {
    root: PathBuf,
    walker: walkdir::IntoIter,
}

impl FolderSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        let walker = WalkDir::new(&root).sort_by_file_name().into_iter();
        Self { root, walker }
    }

    pub fn root(&self) -> &Path { &self.root }
}

impl Iterator for FolderSource {
    type Item = SourceItem;

    fn next(&mut self) -> Option<SourceItem> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(root = %self.root.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            tracing::debug!(path = %path.display(), "reading");
            let title = entry.file_name().to_string_lossy().into_owned();
            return Some(SourceItem::new(extract(path), path.to_string_lossy().into_owned(), title));
        }
    }
}
