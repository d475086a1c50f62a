use crate::error::EvidenceSheetError;
use std::fmt::Display;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;
use zip::ZipArchive;

#[derive(Error, Debug)]
pub enum SourceReaderError {
    #[error("No data in input '{0}'")]
    EmptyInputError(String),

    #[error("No input matches pattern '{0}'")]
    NoMatchError(String),
}

/// An input handed to the engine: a file on disk or a named in-memory upload.
#[derive(Clone, Debug, PartialEq)]
pub enum InputSource {
    /// Local file path
    Path(PathBuf),
    /// Uploaded content with its original file name
    Bytes { name: String, data: Vec<u8> },
}

impl InputSource {
    /// Wraps in-memory content under the given file name
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        InputSource::Bytes { name: name.into(), data }
    }

    /// Returns the file name (last path component) used by the naming conventions
    pub fn name(&self) -> String {
        match self {
            InputSource::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
            InputSource::Bytes { name, .. } => base_name(name).to_owned(),
        }
    }

    /// Opens the input for reading
    pub(crate) fn open(&self) -> Result<SourceReader, EvidenceSheetError> {
        match self {
            InputSource::Path(path) => {
                let file = File::open(path)?;
                Ok(SourceReader::File(BufReader::new(file)))
            }
            InputSource::Bytes { name, data } => {
                if data.is_empty() {
                    Err(SourceReaderError::EmptyInputError(name.to_owned()))?;
                }
                Ok(SourceReader::Memory(Cursor::new(data.clone())))
            }
        }
    }

    /// Opens the input as a ZIP archive
    pub(crate) fn open_archive(&self) -> Result<ZipArchive<SourceReader>, EvidenceSheetError> {
        Ok(ZipArchive::new(self.open()?)?)
    }

    /// Expands a glob pattern into path inputs, sorted by path
    ///
    /// # Arguments
    /// * `pattern` - Glob pattern such as `uploads/*.xlsx`
    ///
    /// # Returns
    /// * `Result<Vec<InputSource>, EvidenceSheetError>` - Every matching regular file
    pub fn glob(pattern: &str) -> Result<Vec<InputSource>, EvidenceSheetError> {
        let mut paths = Vec::new();
        for entry in glob::glob(pattern)? {
            let path = entry?;
            if path.is_file() {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            Err(SourceReaderError::NoMatchError(pattern.to_owned()))?;
        }
        paths.sort();
        Ok(paths.into_iter().map(InputSource::Path).collect())
    }

    /// Reads every accepted file entry of a ZIP archive into in-memory inputs
    ///
    /// Directory entries, `__MACOSX` metadata and office lock files (`~$`) are never returned.
    ///
    /// # Arguments
    /// * `accept` - Predicate on the entry file name deciding whether it is kept
    ///
    /// # Returns
    /// * `Result<Vec<InputSource>, EvidenceSheetError>` - Accepted entries in archive order
    pub fn archive_entries<F>(&self, accept: F) -> Result<Vec<InputSource>, EvidenceSheetError>
    where
        F: Fn(&str) -> bool,
    {
        let mut zip = self.open_archive()?;
        let mut entries = Vec::new();
        for index in 0..zip.len() {
            let mut file = zip.by_index(index)?;
            if file.is_dir() || is_metadata_entry(file.name()) {
                continue;
            }
            let name = file.name().to_owned();
            if !accept(base_name(&name)) {
                continue;
            }
            let mut data = Vec::with_capacity(entry_capacity(file.size()));
            file.read_to_end(&mut data)?;
            entries.push(InputSource::Bytes { name, data });
        }
        Ok(entries)
    }
}

impl Display for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputSource::Path(path) => write!(f, "{}", path.display()),
            InputSource::Bytes { name, .. } => write!(f, "{}", name),
        }
    }
}

impl From<PathBuf> for InputSource {
    fn from(path: PathBuf) -> Self {
        InputSource::Path(path)
    }
}

impl From<&Path> for InputSource {
    fn from(path: &Path) -> Self {
        InputSource::Path(path.to_path_buf())
    }
}

/// Largest buffer reserved up front for an archive entry; declared sizes are not trusted
const MAX_PREALLOCATION: u64 = 1 << 20;

/// Initial buffer capacity for an archive entry declaring `size` bytes
pub(crate) fn entry_capacity(size: u64) -> usize {
    size.min(MAX_PREALLOCATION) as usize
}

/// Returns the last component of an archive or upload path
pub(crate) fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Checks whether an archive entry is operating-system or editor metadata
pub(crate) fn is_metadata_entry(name: &str) -> bool {
    name.split(['/', '\\']).any(|part| part == "__MACOSX")
        || base_name(name).starts_with("~$")
        || base_name(name).starts_with("._")
}

/// A reader over either a local file or an in-memory buffer
pub(crate) enum SourceReader {
    /// Local file reader
    File(BufReader<File>),
    /// In-memory buffer
    Memory(Cursor<Vec<u8>>),
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            SourceReader::File(reader) => reader.read(buf),
            SourceReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for SourceReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            SourceReader::File(reader) => reader.seek(pos),
            SourceReader::Memory(reader) => reader.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::zip_bytes;

    #[test]
    fn test_input_name() {
        assert_eq!(InputSource::Path(PathBuf::from("/tmp/uploads/Level 2.xlsx")).name(), "Level 2.xlsx");
        assert_eq!(InputSource::from_bytes("bundle/3_D.png", vec![1]).name(), "3_D.png");
        assert_eq!(InputSource::from_bytes("bundle\\3_D.png", vec![1]).name(), "3_D.png");
    }

    #[test]
    fn test_open_local_file() {
        let result = InputSource::Path(PathBuf::from("Cargo.toml")).open();
        assert!(result.is_ok(), "Failed to open local file: {:?}", result.err());

        let result = InputSource::Path(PathBuf::from("non_existent_file.xlsx")).open();
        assert!(result.is_err(), "Should fail to open non-existent file");

        let result = InputSource::from_bytes("empty.zip", Vec::new()).open();
        assert!(result.is_err(), "Should fail to open empty upload");
    }

    #[test]
    fn test_metadata_entries() {
        assert!(is_metadata_entry("__MACOSX/._Level 1.xlsx"));
        assert!(is_metadata_entry("forms/~$Level 1.xlsx"));
        assert!(!is_metadata_entry("forms/Level 1.xlsx"));
    }

    #[test]
    fn test_archive_entries() {
        let bundle = InputSource::from_bytes("bundle.zip", zip_bytes(&[
            ("forms/", b"".as_slice()),
            ("forms/Level 1.xlsx", b"one".as_slice()),
            ("__MACOSX/forms/._Level 1.xlsx", b"meta".as_slice()),
            ("forms/~$Level 1.xlsx", b"lock".as_slice()),
            ("forms/notes.txt", b"text".as_slice()),
        ]));
        let entries = bundle.archive_entries(|name| name.ends_with(".xlsx")).unwrap();
        assert_eq!(entries, vec![InputSource::from_bytes("forms/Level 1.xlsx", b"one".to_vec())]);
    }

    #[test]
    fn test_entry_capacity() {
        assert_eq!(entry_capacity(4096), 4096);
        assert_eq!(entry_capacity(u64::MAX), 1 << 20);
    }

    #[test]
    fn test_glob_without_match() {
        assert!(InputSource::glob("no-such-directory/*.xlsx").is_err());
    }
}
