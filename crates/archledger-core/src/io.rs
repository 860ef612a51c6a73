use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Readers never observe a half-written manifest or document.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// What happened when a generated document was put in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Existing,
    Overwritten,
}

/// Write `data` to `path` unless it already exists. With `overwrite`, an
/// existing file is replaced instead of kept.
pub fn write_document(path: &Path, data: &[u8], overwrite: bool) -> Result<WriteOutcome> {
    if path.exists() {
        if !overwrite {
            return Ok(WriteOutcome::Existing);
        }
        atomic_write(path, data)?;
        return Ok(WriteOutcome::Overwritten);
    }
    atomic_write(path, data)?;
    Ok(WriteOutcome::Created)
}

/// Append `line` to the file at `path` unless an identical line is already
/// present. The file is created with `header` when missing. Returns true if
/// the line was added.
pub fn ensure_line(path: &Path, header: &str, line: &str) -> Result<bool> {
    let mut existing = if path.exists() {
        std::fs::read_to_string(path)?
    } else {
        header.to_string()
    };
    // Exact line match; a substring check would treat "a.md" as present when "ba.md" is.
    if existing.lines().any(|l| l.trim_end() == line) {
        if !path.exists() {
            atomic_write(path, existing.as_bytes())?;
        }
        return Ok(false);
    }
    if !existing.is_empty() && !existing.ends_with('\n') {
        existing.push('\n');
    }
    existing.push_str(line);
    existing.push('\n');
    atomic_write(path, existing.as_bytes())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("payments.yaml");
        atomic_write(&path, b"system: payments").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "system: payments");
    }

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docs/architecture/reviews/r.md");
        atomic_write(&path, b"data").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn write_document_keeps_existing_without_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("existing.md");
        std::fs::write(&path, b"original").unwrap();
        let outcome = write_document(&path, b"new", false).unwrap();
        assert_eq!(outcome, WriteOutcome::Existing);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }

    #[test]
    fn write_document_overwrites_when_asked() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("existing.md");
        std::fs::write(&path, b"original").unwrap();
        let outcome = write_document(&path, b"new", true).unwrap();
        assert_eq!(outcome, WriteOutcome::Overwritten);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn ensure_line_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.md");
        assert!(ensure_line(&path, "# Index\n\n", "- ADR: `a.md`").unwrap());
        assert!(!ensure_line(&path, "# Index\n\n", "- ADR: `a.md`").unwrap());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Index"));
        assert_eq!(content.matches("- ADR: `a.md`").count(), 1);
    }

    #[test]
    fn ensure_line_appends_after_unterminated_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.md");
        std::fs::write(&path, "# Index").unwrap();
        ensure_line(&path, "", "- Reviews").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Index\n- Reviews\n");
    }
}
