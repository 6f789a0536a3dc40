//! The persisted work queue: a text file with one pending identifier per line.
//!
//! The file is the durable record of what is still to be done. Lines are only
//! ever removed, by rewriting the file into a sibling temporary file and
//! renaming it over the original, so a crash leaves either the old or the new
//! content and never a partial file.
//!
//! These functions do no locking of their own. Concurrent callers must go
//! through [`OutcomeTracker`](super::tracker::OutcomeTracker).

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Read the pending identifiers, in file order. Blank lines are skipped.
pub fn load(path: &Path) -> io::Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut identifiers = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            identifiers.push(trimmed.to_string());
        }
    }
    Ok(identifiers)
}

/// Drop every line whose trimmed content equals `identifier`.
pub fn remove_line(path: &Path, identifier: &str) -> io::Result<usize> {
    remove_lines(path, &HashSet::from([identifier]))
}

/// Drop every line whose trimmed content is in `identifiers` and atomically
/// replace the file. Returns the number of lines dropped.
///
/// Lines that are kept are written back unchanged, each terminated by `\n`.
pub fn remove_lines(path: &Path, identifiers: &HashSet<&str>) -> io::Result<usize> {
    let source = File::open(path)?;
    let permissions = source.metadata()?.permissions();
    let reader = BufReader::new(source);

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir)?;

    let mut removed = 0;
    {
        let mut out = BufWriter::new(tmp.as_file());
        for line in reader.lines() {
            let line = line?;
            if identifiers.contains(line.trim()) {
                removed += 1;
                continue;
            }
            out.write_all(line.as_bytes())?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
    }
    tmp.as_file().sync_all()?;
    std::fs::set_permissions(tmp.path(), permissions)?;

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn queue_with(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("assets.txt");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_skips_blank_lines_and_trims() {
        let dir = TempDir::new().unwrap();
        let path = queue_with(&dir, "A\n  B \n\nC\r\n");
        assert_eq!(load(&path).unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn load_tolerates_missing_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let path = queue_with(&dir, "A\nB");
        assert_eq!(load(&path).unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("nope.txt")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn remove_line_drops_matching_line() {
        let dir = TempDir::new().unwrap();
        let path = queue_with(&dir, "A\nB\nC\n");
        assert_eq!(remove_line(&path, "B").unwrap(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "A\nC\n");
    }

    #[test]
    fn remove_line_drops_all_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = queue_with(&dir, "A\nB\nA\n");
        assert_eq!(remove_line(&path, "A").unwrap(), 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "B\n");
    }

    #[test]
    fn remove_line_matches_trimmed_content_exactly() {
        let dir = TempDir::new().unwrap();
        let path = queue_with(&dir, "AB\n A \nA1\n");
        assert_eq!(remove_line(&path, "A").unwrap(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "AB\nA1\n");
    }

    #[test]
    fn remove_absent_identifier_leaves_content_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = queue_with(&dir, "A\nB\nC\n");
        assert_eq!(remove_line(&path, "Z").unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "A\nB\nC\n");

        // Applying the same removal twice is a no-op the second time.
        remove_line(&path, "B").unwrap();
        remove_line(&path, "B").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "A\nC\n");
    }

    #[test]
    fn remove_lines_batch() {
        let dir = TempDir::new().unwrap();
        let path = queue_with(&dir, "A\nB\nC\nD\n");
        let removed = remove_lines(&path, &HashSet::from(["A", "C", "X"])).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "B\nD\n");
    }

    #[test]
    fn remove_last_line_leaves_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = queue_with(&dir, "A\n");
        remove_line(&path, "A").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
        assert!(load(&path).unwrap().is_empty());
    }

    #[test]
    fn remove_line_leaves_no_temporary_files() {
        let dir = TempDir::new().unwrap();
        let path = queue_with(&dir, "A\nB\n");
        remove_line(&path, "A").unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn remove_line_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(remove_line(&dir.path().join("gone.txt"), "A").is_err());
    }
}
