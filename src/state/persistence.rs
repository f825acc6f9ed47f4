//! Durable JSON state files.
//!
//! Files are replaced by writing a temporary sibling and renaming it over the
//! destination, so a crash mid-write leaves the previous good copy in place.

use crate::error::PersistError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `dest` atomically using `write` to produce its contents.
pub fn write_atomically<F>(dest: &Path, write: F) -> Result<(), PersistError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), PersistError>,
{
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        write(&mut out)?;
        out.flush()?;
    }
    tmp.as_file().sync_all()?;
    // Dropping an unpersisted NamedTempFile removes it.
    tmp.persist(dest)?;
    Ok(())
}

/// Serialize `value` as JSON into `dest`.
pub fn save_json<T: Serialize + ?Sized>(dest: &Path, value: &T) -> Result<(), PersistError> {
    write_atomically(dest, |w| {
        serde_json::to_writer(w, value)?;
        Ok(())
    })
}

/// Run a blocking write on the blocking thread pool.
///
/// File writes end in an fsync, which must not run on a runtime worker.
pub async fn write_off_worker<T, F>(write: F) -> Result<T, PersistError>
where
    F: FnOnce() -> Result<T, PersistError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(write).await?
}

/// Read JSON from `path`. A missing file is `Ok(None)`.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_cycle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("karma.json");

        let mut m = HashMap::new();
        m.insert("frank".to_string(), 9999_i64);
        save_json(&path, &m).unwrap();

        let loaded: HashMap<String, i64> = load_json(&path).unwrap().unwrap();
        assert_eq!(loaded, m);
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempdir().unwrap();
        let loaded: Option<HashMap<String, i64>> =
            load_json(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_failed_write_keeps_previous_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        save_json(&path, &vec![1, 2, 3]).unwrap();

        let result = write_atomically(&path, |w| {
            w.write_all(b"[4, 5")?;
            Err(PersistError::Io(std::io::Error::other("disk on fire")))
        });
        assert!(result.is_err());

        let loaded: Vec<i32> = load_json(&path).unwrap().unwrap();
        assert_eq!(loaded, vec![1, 2, 3]);

        // no temporary files are left behind
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_write_off_worker() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let dest = path.clone();
        write_off_worker(move || save_json(&dest, &vec![7])).await.unwrap();
        let loaded: Vec<i32> = load_json(&path).unwrap().unwrap();
        assert_eq!(loaded, vec![7]);

        let failed = write_off_worker(|| -> Result<(), _> {
            Err(PersistError::Io(std::io::Error::other("disk on fire")))
        })
        .await;
        assert!(matches!(failed, Err(PersistError::Io(_))));
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{not json").unwrap();

        let loaded: Result<Option<Vec<i32>>, _> = load_json(&path);
        assert!(matches!(loaded, Err(PersistError::Json(_))));
    }
}
