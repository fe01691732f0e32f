//! Format-specific text extraction.
//!
//! Each [`FileFormat`] variant turns a file on disk into an [`ExtractedDocument`]. Paged and
//! paragraph formats produce one normalized text body that is later windowed by the word
//! chunker; the generic path produces pre-chunked sections.

use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use super::structured::{self, Markup, Section};
use super::types::{FileType, ParseError};

/// Maximum decompressed bytes read from `word/document.xml`.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Splits a PDF held in memory into per-page text.
pub type PdfPageExtractor = fn(&[u8]) -> Result<Vec<String>, String>;

/// Page extraction backed by `pdf-extract`.
pub fn pdf_extract_pages(bytes: &[u8]) -> Result<Vec<String>, String> {
    pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|err| err.to_string())
}

/// Closed set of extractors, selected by file extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileFormat {
    /// `.pdf`
    Pdf,
    /// `.docx` and `.doc`
    Docx,
    /// `.txt`
    PlainText,
    /// Anything else, handled by the structure-aware extractor.
    Generic {
        /// Lowercase extension without the dot, or `unknown`.
        extension: String,
    },
}

/// Text pulled out of a document before chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedBody {
    /// A single normalized string, to be split into word windows.
    Text(String),
    /// Sections that each become one chunk.
    Sections(Vec<Section>),
}

/// Output of an extractor plus the format-specific counts recorded in chunk metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Extracted content.
    pub body: ExtractedBody,
    /// Number of pages for paged formats.
    pub total_pages: Option<usize>,
    /// Number of paragraphs for paragraph formats.
    pub total_paragraphs: Option<usize>,
}

impl ExtractedDocument {
    fn text(text: String) -> Self {
        Self {
            body: ExtractedBody::Text(text),
            total_pages: None,
            total_paragraphs: None,
        }
    }
}

impl FileFormat {
    /// Select the extractor for `path` from its extension, case-insensitively.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => Self::Pdf,
            "docx" | "doc" => Self::Docx,
            "txt" => Self::PlainText,
            "" => Self::Generic {
                extension: "unknown".to_string(),
            },
            _ => Self::Generic { extension },
        }
    }

    /// Label written to `file_type` in chunk metadata.
    pub fn file_type(&self) -> FileType {
        match self {
            Self::Pdf => FileType::Pdf,
            Self::Docx => FileType::Docx,
            Self::PlainText => FileType::Txt,
            Self::Generic { extension } => FileType::Other(extension.clone()),
        }
    }

    /// Extract the document at `path`.
    ///
    /// `max_section_chars` caps the size of sections on the generic path.
    pub fn extract(
        &self,
        path: &Path,
        max_section_chars: usize,
    ) -> Result<ExtractedDocument, ParseError> {
        self.extract_with(path, max_section_chars, pdf_extract_pages)
    }

    /// Like [`FileFormat::extract`], with an explicit PDF page extractor.
    ///
    /// A panic inside `pdf_pages` is caught and reported as [`ParseError::Malformed`].
    pub fn extract_with(
        &self,
        path: &Path,
        max_section_chars: usize,
        pdf_pages: PdfPageExtractor,
    ) -> Result<ExtractedDocument, ParseError> {
        match self {
            Self::Pdf => extract_pdf(path, pdf_pages),
            Self::Docx => extract_docx(path),
            Self::PlainText => read_utf8(path).map(ExtractedDocument::text),
            Self::Generic { extension } => {
                let text = read_utf8(path)?;
                let markup = Markup::from_extension(extension);
                Ok(ExtractedDocument {
                    body: ExtractedBody::Sections(structured::segment(
                        &text,
                        markup,
                        max_section_chars,
                    )),
                    total_pages: None,
                    total_paragraphs: None,
                })
            }
        }
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, ParseError> {
    std::fs::read(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_utf8(path: &Path) -> Result<String, ParseError> {
    let bytes = read_bytes(path)?;
    String::from_utf8(bytes).map_err(|_| ParseError::Unsupported {
        path: path.to_path_buf(),
        reason: "content is not valid UTF-8 text".into(),
    })
}

fn malformed(path: &Path, reason: impl std::fmt::Display) -> ParseError {
    ParseError::Malformed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn extract_pdf(path: &Path, pdf_pages: PdfPageExtractor) -> Result<ExtractedDocument, ParseError> {
    let bytes = read_bytes(path)?;
    let pages = panic::catch_unwind(AssertUnwindSafe(|| pdf_pages(&bytes)))
        .map_err(|payload| {
            let reason = format!("PDF extractor panicked: {}", panic_message(&*payload));
            malformed(path, reason)
        })?
        .map_err(|e| malformed(path, e))?;

    Ok(ExtractedDocument {
        body: ExtractedBody::Text(join_pages(&pages)),
        total_pages: Some(pages.len()),
        total_paragraphs: None,
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Concatenate page texts in order, prefixing each with a 1-based page marker.
fn join_pages(pages: &[String]) -> String {
    let mut text = String::new();
    for (index, page) in pages.iter().enumerate() {
        text.push_str(&format!("\n--- Page {} ---\n", index + 1));
        text.push_str(page);
    }
    text
}

fn extract_docx(path: &Path) -> Result<ExtractedDocument, ParseError> {
    let bytes = read_bytes(path)?;
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| malformed(path, e))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| malformed(path, "word/document.xml not found"))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| malformed(path, e))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(malformed(path, "word/document.xml exceeds size limit"));
    }

    let paragraphs = docx_paragraphs(&xml).map_err(|e| malformed(path, e))?;
    Ok(ExtractedDocument {
        total_paragraphs: Some(paragraphs.len()),
        total_pages: None,
        body: ExtractedBody::Text(paragraphs.join("\n")),
    })
}

/// Collect the text of every `w:p` element in document order, including empty paragraphs.
///
/// Paragraphs nested inside text boxes are collected separately, when they close. Breaks
/// become newlines and tabs become tab characters.
fn docx_paragraphs(xml: &[u8]) -> Result<Vec<String>, quick_xml::Error> {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => open.push(String::new()),
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => {
                let whitespace = match e.local_name().as_ref() {
                    b"p" => {
                        paragraphs.push(String::new());
                        None
                    }
                    b"tab" => Some('\t'),
                    b"br" | b"cr" => Some('\n'),
                    _ => None,
                };
                if let Some(ch) = whitespace
                    && let Some(paragraph) = open.last_mut()
                {
                    paragraph.push(ch);
                }
            }
            Event::Text(te) if in_text => {
                if let Some(paragraph) = open.last_mut() {
                    paragraph.push_str(te.unescape().unwrap_or_default().as_ref());
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"p" => {
                    if let Some(paragraph) = open.pop() {
                        paragraphs.push(paragraph);
                    }
                }
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    /// Write a minimal `.docx` whose body holds the given paragraphs.
    pub(crate) fn write_docx(path: &Path, paragraphs: &[&str]) {
        let body: String = paragraphs
            .iter()
            .map(|text| {
                if text.is_empty() {
                    "<w:p/>".to_string()
                } else {
                    format!("<w:p><w:r><w:t xml:space=\"preserve\">{text}</w:t></w:r></w:p>")
                }
            })
            .collect();
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{body}</w:body></w:document>"
        );

        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        let types = br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#;
        zip.write_all(types).unwrap();
        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    /// Write a PDF with one Helvetica text line per page.
    pub(crate) fn write_pdf(path: &Path, pages: &[&str]) {
        use lopdf::content::{Content, Operation};
        use lopdf::{Document, Object, Stream, dictionary};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut file = std::fs::File::create(path).unwrap();
        doc.save_to(&mut file).unwrap();
    }

    #[test]
    fn formats_are_selected_case_insensitively() {
        assert_eq!(FileFormat::from_path(Path::new("a/B.PDF")), FileFormat::Pdf);
        assert_eq!(FileFormat::from_path(Path::new("memo.doc")), FileFormat::Docx);
        assert_eq!(
            FileFormat::from_path(Path::new("notes.txt")),
            FileFormat::PlainText
        );
        assert_eq!(
            FileFormat::from_path(Path::new("README.Md")),
            FileFormat::Generic {
                extension: "md".into()
            }
        );
        assert_eq!(
            FileFormat::from_path(Path::new("Makefile")).file_type(),
            FileType::Other("unknown".into())
        );
    }

    #[test]
    fn docx_paragraphs_are_joined_with_newlines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memo.docx");
        write_docx(&path, &["First paragraph.", "", "Third &amp; last."]);

        let document = FileFormat::Docx.extract(&path, 1000).unwrap();
        assert_eq!(document.total_paragraphs, Some(3));
        assert_eq!(
            document.body,
            ExtractedBody::Text("First paragraph.\n\nThird & last.".into())
        );
    }

    #[test]
    fn docx_breaks_tabs_and_text_boxes_are_kept() {
        let xml = br#"<w:document xmlns:w="w"><w:body>
            <w:p><w:r><w:t>Name</w:t><w:tab/><w:t>Value</w:t><w:br/><w:t>Next line</w:t></w:r>
              <w:r><w:txbxContent><w:p><w:r><w:t>Boxed</w:t></w:r></w:p></w:txbxContent></w:r>
              <w:r><w:t> tail</w:t></w:r></w:p>
        </w:body></w:document>"#;

        let paragraphs = docx_paragraphs(xml).unwrap();
        assert_eq!(paragraphs, vec!["Boxed", "Name\tValue\nNext line tail"]);
    }

    #[test]
    fn non_archive_doc_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.doc");
        std::fs::write(&path, b"\xD0\xCF\x11\xE0 not a zip").unwrap();

        let err = FileFormat::from_path(&path).extract(&path, 1000).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }), "{err:?}");
    }

    #[test]
    fn pdf_pages_carry_boundary_markers() {
        let text = join_pages(&["Intro".to_string(), "Summary".to_string()]);
        assert_eq!(text, "\n--- Page 1 ---\nIntro\n--- Page 2 ---\nSummary");
    }

    #[test]
    fn pdf_text_is_extracted_per_page() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("guide.pdf");
        write_pdf(&path, &["Alpha intake steps", "Bravo billing steps"]);

        let document = FileFormat::Pdf.extract(&path, 1000).unwrap();
        assert_eq!(document.total_pages, Some(2));
        let ExtractedBody::Text(text) = document.body else {
            panic!("expected a text body");
        };
        let first = text.find("--- Page 1 ---").unwrap();
        let alpha = text.find("Alpha").unwrap();
        let second = text.find("--- Page 2 ---").unwrap();
        let bravo = text.find("Bravo").unwrap();
        assert!(first < alpha && alpha < second && second < bravo, "{text:?}");
    }

    #[test]
    fn panicking_pdf_extractor_is_reported_as_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hostile.pdf");
        std::fs::write(&path, b"%PDF-1.4 whatever").unwrap();

        let err = FileFormat::Pdf
            .extract_with(&path, 1000, |_| panic!("xref table exploded"))
            .unwrap_err();
        match err {
            ParseError::Malformed { reason, .. } => {
                assert!(reason.contains("xref table exploded"), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn corrupt_pdf_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a valid pdf").unwrap();

        let err = FileFormat::Pdf.extract(&path, 1000).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }), "{err:?}");
    }

    #[test]
    fn binary_content_on_the_generic_path_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("image.bin");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x81]).unwrap();

        let err = FileFormat::from_path(&path).extract(&path, 1000).unwrap_err();
        assert!(matches!(err, ParseError::Unsupported { .. }), "{err:?}");
    }
}
