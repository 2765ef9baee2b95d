//! Discovery and reading of CQL logic files.

use crate::constants::LOGIC_FILE_EXTENSION;
use crate::{QcError, QcResult};
use std::fs;
use std::path::{Path, PathBuf};

/// A `.cql` file in the input directory, identified by its file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogicFile {
    name: String,
    path: PathBuf,
}

impl LogicFile {
    /// File name, used as the key of the results map.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the raw file contents.
    pub fn read(&self) -> QcResult<Vec<u8>> {
        fs::read(&self.path).map_err(|source| QcError::FileRead {
            path: self.path.clone(),
            source,
        })
    }
}

/// Lists the logic files directly inside `dir`, sorted by name.
///
/// Subdirectories are not searched. Names that are not valid UTF-8 are skipped with a warning
/// because they could not be used as JSON keys.
///
/// # Errors
///
/// Returns [`QcError::InvalidParameter`] if `dir` is not a directory or holds no `.cql` files,
/// and [`QcError::DirRead`] if it cannot be listed.
pub fn discover(dir: &Path) -> QcResult<Vec<LogicFile>> {
    if !dir.is_dir() {
        return Err(QcError::InvalidParameter(format!(
            "directory not found: {}",
            dir.display()
        )));
    }

    let dir_read_err = |source| QcError::DirRead {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(dir_read_err)? {
        let path = entry.map_err(dir_read_err)?.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some(LOGIC_FILE_EXTENSION) {
            continue;
        }
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => files.push(LogicFile {
                name: name.to_owned(),
                path: path.clone(),
            }),
            None => tracing::warn!("skipping logic file with non UTF-8 name: {}", path.display()),
        }
    }

    if files.is_empty() {
        return Err(QcError::InvalidParameter(format!(
            "no .{LOGIC_FILE_EXTENSION} files found in {}",
            dir.display()
        )));
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Human description of a check, taken from a leading `// ...` comment line.
pub fn description(content: &[u8]) -> Option<String> {
    let first_line = content.split(|b| *b == b'\n').next()?;
    let first_line = String::from_utf8_lossy(first_line);
    let comment = first_line.trim().strip_prefix("//")?.trim();
    (!comment.is_empty()).then(|| comment.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn discovers_only_cql_files_sorted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.cql"), "define InInitialPopulation: true").unwrap();
        fs::write(dir.path().join("a.cql"), "define InInitialPopulation: true").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();
        fs::write(dir.path().join("upper.CQL"), "case matters").unwrap();
        fs::create_dir(dir.path().join("nested.cql")).unwrap();

        let files = discover(dir.path()).unwrap();
        let names: Vec<&str> = files.iter().map(LogicFile::name).collect();
        assert_eq!(names, vec!["a.cql", "b.cql"]);
        assert_eq!(files[0].path(), dir.path().join("a.cql"));
    }

    #[test]
    fn empty_directory_is_invalid() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("readme.md"), "no logic here").unwrap();
        let err = discover(dir.path()).expect_err("no cql files");
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn missing_directory_is_invalid() {
        let dir = TempDir::new().unwrap();
        let err = discover(&dir.path().join("missing")).expect_err("missing dir");
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn reads_raw_bytes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("x.cql"), b"\xffbinary").unwrap();
        let files = discover(dir.path()).unwrap();
        assert_eq!(files[0].read().unwrap(), b"\xffbinary".to_vec());
    }

    #[test]
    fn description_comes_from_leading_comment() {
        assert_eq!(
            description(b"// Patients without a birth date\nlibrary X\n"),
            Some("Patients without a birth date".to_owned())
        );
        assert_eq!(description(b"  //   padded  \r\nlibrary X"), Some("padded".to_owned()));
        assert_eq!(description(b"library X\n// not first\n"), None);
        assert_eq!(description(b"//\nlibrary X"), None);
        assert_eq!(description(b""), None);
    }
}
