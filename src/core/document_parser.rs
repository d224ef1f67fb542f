use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::errors::CoreError;
use super::pdf::PdfTextExtractor;

/// Turns a job description file into plain text for the agent.
pub struct JobDescriptionReader {
    pdf_text_extractor: PdfTextExtractor,
}

impl Default for JobDescriptionReader {
    fn default() -> Self {
        Self::new(PdfTextExtractor::new())
    }
}

impl JobDescriptionReader {
    pub fn new(pdf_text_extractor: PdfTextExtractor) -> Self {
        Self { pdf_text_extractor }
    }

    pub fn read_text(&self, path: &Path) -> Result<String, CoreError> {
        let data = std::fs::read(path).map_err(|err| CoreError::document_read(path, err))?;

        let extension = path
            .extension()
            .and_then(|v| v.to_str())
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => self
                .pdf_text_extractor
                .extract_text(&data)
                .map_err(|err| CoreError::document_read(path, err)),
            "docx" => extract_docx_text(&data).map_err(|err| CoreError::document_read(path, err)),
            "txt" | "md" => Ok(String::from_utf8_lossy(&data).into_owned()),
            other => Err(CoreError::document_read(
                path,
                format!("unsupported file type {other:?}"),
            )),
        }
    }
}

fn extract_docx_text(data: &[u8]) -> anyhow::Result<String> {
    let cursor = Cursor::new(data);
    let mut archive = zip::ZipArchive::new(cursor)?;

    let mut document_file = archive.by_name("word/document.xml")?;
    let mut xml = String::new();
    document_file.read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut current = String::new();
    let mut lines = Vec::new();
    let mut in_paragraph = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:p" => {
                in_paragraph = true;
                current.clear();
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"w:p" => {
                if !current.trim().is_empty() {
                    lines.push(current.trim().to_string());
                }
                current.clear();
                in_paragraph = false;
            }
            Ok(Event::Text(e)) if in_paragraph => {
                current.push_str(&e.xml_content()?);
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(err.into()),
            _ => {}
        }

        buf.clear();
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;

    fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
            .collect();
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        );

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn reads_docx_paragraphs() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("Backend_Lead.docx");
        std::fs::write(&path, docx_bytes(&["Backend Lead", "Rust and Postgres"])).unwrap();

        let text = JobDescriptionReader::default().read_text(&path).unwrap();
        assert_eq!(text, "Backend Lead\nRust and Postgres");
    }

    #[test]
    fn missing_file_is_document_read_error() {
        let err = JobDescriptionReader::default()
            .read_text(Path::new("/definitely/not/here.pdf"))
            .unwrap_err();
        assert!(matches!(err, CoreError::DocumentRead { .. }));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("jd.rtf");
        std::fs::write(&path, b"{\\rtf1}").unwrap();
        assert!(JobDescriptionReader::default().read_text(&path).is_err());
    }
}
