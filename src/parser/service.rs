//! File and directory parsing into ordered chunks.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::chunking::WordChunker;
use super::extract::{ExtractedBody, FileFormat, PdfPageExtractor, pdf_extract_pages};
use super::types::{Chunk, ChunkMetadata, ChunkingError, ParseError};

/// Extensions picked up by directory scans when the caller does not provide a list.
pub const DEFAULT_EXTENSIONS: [&str; 7] =
    [".pdf", ".docx", ".doc", ".txt", ".md", ".html", ".csv"];

/// Result of parsing one file during a directory scan.
#[derive(Debug)]
pub struct FileOutcome {
    /// File that was parsed.
    pub path: PathBuf,
    /// Chunks on success, or the reason the file was skipped.
    pub result: Result<Vec<Chunk>, ParseError>,
}

/// Per-file outcomes of a directory scan, in traversal order.
#[derive(Debug, Default)]
pub struct DirectoryScan {
    /// One entry per matching file.
    pub files: Vec<FileOutcome>,
}

impl DirectoryScan {
    /// Number of files that produced chunks without error.
    pub fn parsed(&self) -> usize {
        self.files.iter().filter(|file| file.result.is_ok()).count()
    }

    /// Files that were skipped, with the error that caused it.
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &ParseError)> {
        self.files.iter().filter_map(|file| match &file.result {
            Ok(_) => None,
            Err(err) => Some((file.path.as_path(), err)),
        })
    }

    /// Concatenate chunks of every successfully parsed file, preserving per-file order.
    pub fn into_chunks(self) -> Vec<Chunk> {
        self.files
            .into_iter()
            .filter_map(|file| file.result.ok())
            .flatten()
            .collect()
    }
}

/// Turns files and directories into ordered chunks with provenance metadata.
#[derive(Debug, Clone)]
pub struct DocumentParser {
    chunker: WordChunker,
    pdf_pages: PdfPageExtractor,
}

impl DocumentParser {
    /// Build a parser, rejecting chunk settings whose window would not advance.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkingError> {
        Ok(Self {
            chunker: WordChunker::new(chunk_size, chunk_overlap)?,
            pdf_pages: pdf_extract_pages,
        })
    }

    /// Replace the function used to pull per-page text out of PDF bytes.
    ///
    /// A panic inside the extractor is reported as [`ParseError::Malformed`] for that file.
    pub fn with_pdf_extractor(mut self, pdf_pages: PdfPageExtractor) -> Self {
        self.pdf_pages = pdf_pages;
        self
    }

    /// Word-window chunker used for text bodies.
    pub fn chunker(&self) -> &WordChunker {
        &self.chunker
    }

    /// Parse a single file into chunks.
    ///
    /// A missing path yields [`ParseError::NotFound`]; anything that is not a regular file, or
    /// cannot be decoded, yields a parse failure.
    pub fn parse_document(&self, path: &Path) -> Result<Vec<Chunk>, ParseError> {
        if !path.exists() {
            return Err(ParseError::NotFound(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(ParseError::Unsupported {
                path: path.to_path_buf(),
                reason: "not a regular file".into(),
            });
        }

        let format = FileFormat::from_path(path);
        let file_type = format.file_type();
        let document = format.extract_with(path, self.chunker.chunk_size(), self.pdf_pages)?;
        let source = path.to_string_lossy().into_owned();

        let pieces: Vec<(String, Option<String>)> = match document.body {
            ExtractedBody::Text(text) => self
                .chunker
                .chunk(&text)
                .into_iter()
                .map(|content| (content, None))
                .collect(),
            ExtractedBody::Sections(sections) => sections
                .into_iter()
                .map(|section| (section.text, Some(section.element_type.as_str().to_string())))
                .collect(),
        };

        let chunks: Vec<Chunk> = pieces
            .into_iter()
            .filter(|(content, _)| !content.trim().is_empty())
            .enumerate()
            .map(|(chunk_id, (content, element_type))| Chunk {
                content,
                metadata: ChunkMetadata {
                    source: source.clone(),
                    chunk_id,
                    file_type: file_type.clone(),
                    total_pages: document.total_pages,
                    total_paragraphs: document.total_paragraphs,
                    element_type,
                },
            })
            .collect();

        tracing::info!(
            path = %path.display(),
            file_type = %file_type,
            chunks = chunks.len(),
            "Parsed document"
        );
        Ok(chunks)
    }

    /// Parse every matching file under `dir`, recording a result per file.
    ///
    /// Extensions are matched case-insensitively, with or without a leading dot. Files are
    /// visited recursively in file-name order. Unreadable entries are logged and skipped.
    pub fn scan_directory(
        &self,
        dir: &Path,
        extensions: &[String],
    ) -> Result<DirectoryScan, ParseError> {
        if !dir.exists() {
            return Err(ParseError::NotFound(dir.to_path_buf()));
        }
        if !dir.is_dir() {
            return Err(ParseError::NotADirectory(dir.to_path_buf()));
        }

        let wanted: Vec<String> = extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .collect();

        let mut scan = DirectoryScan::default();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "Skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !matches_extension(entry.path(), &wanted) {
                continue;
            }

            let path = entry.into_path();
            let result = self.parse_document(&path);
            if let Err(err) = &result {
                tracing::error!(path = %path.display(), error = %err, "Failed to parse document");
            }
            scan.files.push(FileOutcome { path, result });
        }

        tracing::info!(
            directory = %dir.display(),
            files = scan.files.len(),
            parsed = scan.parsed(),
            "Scanned directory"
        );
        Ok(scan)
    }

    /// Parse every matching file under `dir` and return the union of their chunks.
    ///
    /// Files that fail to parse are skipped; the scan never aborts on a single bad file.
    pub fn parse_directory(
        &self,
        dir: &Path,
        extensions: &[String],
    ) -> Result<Vec<Chunk>, ParseError> {
        self.scan_directory(dir, extensions)
            .map(DirectoryScan::into_chunks)
    }
}

/// Default extension list as owned strings.
pub fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
}

fn matches_extension(path: &Path, wanted: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            wanted.iter().any(|candidate| *candidate == ext)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract::tests::write_docx;
    use crate::parser::types::FileType;
    use std::fs;
    use tempfile::TempDir;

    fn words(count: usize) -> String {
        (0..count)
            .map(|index| format!("w{index}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(DocumentParser::new(100, 100).is_err());
        assert!(DocumentParser::new(0, 0).is_err());
    }

    #[test]
    fn text_document_is_windowed_with_sequential_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("long.txt");
        fs::write(&path, words(2400)).unwrap();

        let parser = DocumentParser::new(1000, 200).unwrap();
        let chunks = parser.parse_document(&path).unwrap();

        assert_eq!(chunks.len(), 3);
        for (index, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.chunk_id, index);
            assert_eq!(chunk.metadata.file_type, FileType::Txt);
            assert_eq!(chunk.metadata.source, path.to_string_lossy());
            assert!(chunk.content.split_whitespace().count() <= 1000);
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let parser = DocumentParser::new(10, 2).unwrap();
        let err = parser
            .parse_document(Path::new("/definitely/missing/file.txt"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn blank_document_yields_no_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blank.txt");
        fs::write(&path, "  \n\n  ").unwrap();

        let parser = DocumentParser::new(10, 2).unwrap();
        assert!(parser.parse_document(&path).unwrap().is_empty());
    }

    #[test]
    fn docx_chunks_record_paragraph_count() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memo.docx");
        write_docx(&path, &["Claims must be filed", "within ninety days."]);

        let parser = DocumentParser::new(100, 10).unwrap();
        let chunks = parser.parse_document(&path).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Claims must be filed within ninety days.");
        assert_eq!(chunks[0].metadata.file_type, FileType::Docx);
        assert_eq!(chunks[0].metadata.total_paragraphs, Some(2));
    }

    #[test]
    fn markdown_sections_record_element_type() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("guide.md");
        fs::write(&path, "# Setup\n\nInstall the tool.\n\n# Usage\n\nRun it.").unwrap();

        let parser = DocumentParser::new(1000, 200).unwrap();
        let chunks = parser.parse_document(&path).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].content, "Usage\n\nRun it.");
        assert_eq!(chunks[1].metadata.chunk_id, 1);
        assert_eq!(chunks[1].metadata.file_type, FileType::Other("md".into()));
        assert_eq!(chunks[1].metadata.element_type.as_deref(), Some("Title"));
    }

    #[test]
    fn directory_scan_skips_bad_files_and_keeps_going() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a_good.txt"), "alpha beta gamma").unwrap();
        fs::write(dir.path().join("b_bad.pdf"), b"not a valid pdf").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.TXT"), "delta epsilon").unwrap();
        fs::write(dir.path().join("ignored.rs"), "fn main() {}").unwrap();

        let parser = DocumentParser::new(10, 2).unwrap();
        let scan = parser
            .scan_directory(dir.path(), &default_extensions())
            .unwrap();

        assert_eq!(scan.files.len(), 3);
        assert_eq!(scan.parsed(), 2);
        let failed: Vec<&Path> = scan.failures().map(|(path, _)| path).collect();
        assert_eq!(failed, vec![dir.path().join("b_bad.pdf").as_path()]);

        let contents: Vec<String> = scan
            .into_chunks()
            .into_iter()
            .map(|chunk| chunk.content)
            .collect();
        assert_eq!(contents, vec!["alpha beta gamma", "delta epsilon"]);
    }

    #[test]
    fn panicking_pdf_extractor_fails_only_that_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a_hostile.pdf"), b"%PDF-1.4 crafted").unwrap();
        fs::write(dir.path().join("b_notes.txt"), "still parsed").unwrap();

        let parser = DocumentParser::new(10, 2)
            .unwrap()
            .with_pdf_extractor(|_| panic!("font table overflow"));
        let scan = parser
            .scan_directory(dir.path(), &default_extensions())
            .unwrap();

        assert_eq!(scan.files.len(), 2);
        assert_eq!(scan.parsed(), 1);
        let (path, err) = scan.failures().next().unwrap();
        assert!(path.ends_with("a_hostile.pdf"));
        assert!(
            matches!(err, ParseError::Malformed { reason, .. } if reason.contains("panicked")),
            "{err:?}"
        );
        let contents: Vec<String> = scan.into_chunks().into_iter().map(|c| c.content).collect();
        assert_eq!(contents, vec!["still parsed"]);
    }

    #[test]
    fn custom_extensions_accept_missing_dot() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "one two").unwrap();
        fs::write(dir.path().join("page.md"), "three four").unwrap();

        let parser = DocumentParser::new(10, 2).unwrap();
        let chunks = parser
            .parse_directory(dir.path(), &["md".to_string()])
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "three four");
    }

    #[test]
    fn scanning_a_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("single.txt");
        fs::write(&path, "text").unwrap();

        let parser = DocumentParser::new(10, 2).unwrap();
        let err = parser.scan_directory(&path, &default_extensions()).unwrap_err();
        assert!(matches!(err, ParseError::NotADirectory(_)));
    }
}
