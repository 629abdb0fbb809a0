use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{RecordKind, StoreError, StoreResult};
use super::note::Note;
use super::template::Template;

/// A record stored as one JSON document per id.
pub trait Record: Serialize + DeserializeOwned {
    const KIND: RecordKind;

    fn id(&self) -> &str;

    /// Repair recoverable field problems after reading from disk.
    fn normalize(&mut self) {}
}

impl Record for Note {
    const KIND: RecordKind = RecordKind::Note;

    fn id(&self) -> &str {
        &self.id
    }

    fn normalize(&mut self) {
        Note::normalize(self)
    }
}

impl Record for Template {
    const KIND: RecordKind = RecordKind::Template;

    fn id(&self) -> &str {
        &self.id
    }

    fn normalize(&mut self) {
        Template::normalize(self)
    }
}

/// Directory of `<id>.json` files for one record kind.
#[derive(Debug, Clone)]
pub struct RecordDir<R> {
    root: PathBuf,
    _record: PhantomData<R>,
}

impl<R: Record> RecordDir<R> {
    /// Opens the directory, creating it if needed.
    pub fn create(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        Ok(Self { root, _record: PhantomData })
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_file_stem(id)))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.path_for(id).exists()
    }

    pub fn load(&self, id: &str) -> StoreResult<R> {
        let path = self.path_for(id);
        match fs::read_to_string(&path) {
            Ok(raw) => parse_record(&path, &raw),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::not_found(R::KIND, id)),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    /// Loads every record. Unreadable files are returned as errors next to the
    /// records that did load so one bad file never hides the rest.
    pub fn load_all(&self) -> StoreResult<(Vec<R>, Vec<StoreError>)> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|ext| ext == "json").unwrap_or(false))
            .collect();
        paths.sort();

        let mut records = Vec::new();
        let mut problems = Vec::new();

        for path in paths {
            let raw = match fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable {} file", R::KIND);
                    problems.push(StoreError::io(&path, e));
                    continue;
                }
            };

            match parse_record::<R>(&path, &raw) {
                Ok(record) => {
                    let home = self.path_for(record.id());
                    if path != home {
                        // Another file already owns this id; leave both on disk.
                        if home.exists() {
                            tracing::warn!(path = %path.display(), id = record.id(), "duplicate {} id", R::KIND);
                            problems.push(StoreError::DuplicateId {
                                kind: R::KIND,
                                id: record.id().to_string(),
                                path,
                            });
                            continue;
                        }
                        self.rehome(&path, &record);
                    }
                    records.push(record);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping corrupt {} file", R::KIND);
                    problems.push(e);
                }
            }
        }

        Ok((records, problems))
    }

    pub fn write(&self, record: &R) -> StoreResult<()> {
        let path = self.path_for(record.id());
        let json = serde_json::to_string_pretty(record)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StoreError::io(&path, e))?;
        tracing::debug!(kind = %R::KIND.to_string(), id = record.id(), "record written");
        Ok(())
    }

    /// Removes the record's file. Returns `false` when it was already gone.
    pub fn remove(&self, id: &str) -> StoreResult<bool> {
        let path = self.path_for(id);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(kind = %R::KIND.to_string(), id, "record removed");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    // A file whose name disagrees with the id inside it is moved so that
    // later writes and deletes hit the same path. The caller checks that the
    // target is free.
    fn rehome(&self, from: &Path, record: &R) {
        let to = self.path_for(record.id());
        match fs::rename(from, &to) {
            Ok(()) => tracing::info!(from = %from.display(), id = record.id(), "renamed record file to match its id"),
            Err(e) => tracing::warn!(from = %from.display(), error = %e, "could not rename record file"),
        }
    }
}

fn parse_record<R: Record>(path: &Path, raw: &str) -> StoreResult<R> {
    let mut record: R = serde_json::from_str(raw).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    record.normalize();
    Ok(record)
}

fn sanitize_file_stem(id: &str) -> String {
    id.chars()
        .map(|c| if matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::note::NoteDraft;

    fn note(id: &str, content: &str) -> Note {
        Note::from_draft(id.to_string(), NoteDraft::with_content(content)).unwrap()
    }

    #[test]
    fn test_write_load_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let dir: RecordDir<Note> = RecordDir::create(tmp.path().join("notes")).unwrap();

        let n = note("note_1", "hello");
        dir.write(&n).unwrap();
        assert!(dir.exists("note_1"));
        assert_eq!(dir.load("note_1").unwrap(), n);

        assert!(dir.remove("note_1").unwrap());
        assert!(!dir.remove("note_1").unwrap());
        assert!(dir.load("note_1").unwrap_err().is_not_found());
    }

    #[test]
    fn test_corrupt_files_are_reported_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let dir: RecordDir<Note> = RecordDir::create(tmp.path()).unwrap();
        dir.write(&note("note_1", "good")).unwrap();
        fs::write(tmp.path().join("note_2.json"), "{ not json").unwrap();
        fs::write(tmp.path().join("readme.txt"), "ignored").unwrap();

        let (records, problems) = dir.load_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(problems.len(), 1);
        assert!(matches!(problems[0], StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_misnamed_file_is_rehomed() {
        let tmp = tempfile::tempdir().unwrap();
        let dir: RecordDir<Note> = RecordDir::create(tmp.path()).unwrap();
        let n = note("note_7", "moved");
        fs::write(tmp.path().join("copy.json"), serde_json::to_string(&n).unwrap()).unwrap();

        let (records, _) = dir.load_all().unwrap();
        assert_eq!(records[0].id, "note_7");
        assert!(dir.exists("note_7"));
        assert!(!tmp.path().join("copy.json").exists());
    }

    #[test]
    fn test_stray_copy_never_replaces_the_record_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir: RecordDir<Note> = RecordDir::create(tmp.path()).unwrap();
        dir.write(&note("note_1", "ORIGINAL")).unwrap();
        let stray = tmp.path().join("note_1 copy.json");
        fs::write(&stray, serde_json::to_string(&note("note_1", "stale copy")).unwrap()).unwrap();

        let (records, problems) = dir.load_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "ORIGINAL");
        assert_eq!(problems.len(), 1);
        assert!(matches!(&problems[0], StoreError::DuplicateId { id, .. } if id == "note_1"));

        assert_eq!(dir.load("note_1").unwrap().content, "ORIGINAL");
        assert!(stray.exists());
    }

    #[test]
    fn test_ids_are_sanitized_for_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let dir: RecordDir<Note> = RecordDir::create(tmp.path()).unwrap();
        assert_eq!(dir.path_for("a/b:c"), tmp.path().join("a_b_c.json"));
    }
}
