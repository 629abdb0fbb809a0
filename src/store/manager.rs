use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::dir::RecordDir;
use super::error::{RecordKind, StoreError, StoreResult};
use super::note::{generate_note_id, now, Note, NoteDraft, NoteUpdate, TIME_FMT};
use super::template::{builtin_rank, builtin_templates, is_builtin, slugify, Template, TemplateDraft};

/// Sole owner of the on-disk notes and templates.
///
/// Every mutation is written through to its JSON file before the in-memory
/// copy changes, so the cache never holds state that is not on disk.
pub struct DataManager {
    root: PathBuf,
    note_files: RecordDir<Note>,
    template_files: RecordDir<Template>,
    notes: HashMap<String, Note>,
    templates: HashMap<String, Template>,
    load_warnings: Vec<String>,
}

#[derive(Serialize)]
struct ExportFile<'a> {
    notes: Vec<&'a Note>,
    export_timestamp: String,
    total_notes: usize,
}

#[derive(Deserialize)]
struct ImportFile {
    notes: Vec<serde_json::Value>,
}

impl DataManager {
    /// Opens (creating if needed) `root/notes` and `root/templates` and loads both.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        let note_files = RecordDir::create(root.join("notes"))?;
        let template_files = RecordDir::create(root.join("templates"))?;

        let mut manager = Self {
            root,
            note_files,
            template_files,
            notes: HashMap::new(),
            templates: HashMap::new(),
            load_warnings: Vec::new(),
        };
        manager.seed_builtin_templates()?;
        manager.reload()?;
        tracing::info!(
            root = %manager.root.display(),
            notes = manager.notes.len(),
            templates = manager.templates.len(),
            "data loaded"
        );
        Ok(manager)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    #[cfg(test)]
    pub fn note_file(&self, id: &str) -> PathBuf {
        self.note_files.path_for(id)
    }

    /// Problems found during the last load, as user-facing messages.
    pub fn load_warnings(&self) -> &[String] {
        &self.load_warnings
    }

    pub fn take_load_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.load_warnings)
    }

    /// Re-reads every record from disk, replacing the in-memory copies.
    pub fn reload(&mut self) -> StoreResult<()> {
        self.load_warnings.clear();

        let (notes, problems) = self.note_files.load_all()?;
        self.record_problems(RecordKind::Note, &problems);
        self.notes = notes.into_iter().map(|n| (n.id.clone(), n)).collect();

        let (templates, problems) = self.template_files.load_all()?;
        self.record_problems(RecordKind::Template, &problems);
        self.templates = templates.into_iter().map(|t| (t.id.clone(), t)).collect();

        // A corrupt built-in file is replaced rather than leaving the shortcut missing.
        for builtin in builtin_templates() {
            if !self.templates.contains_key(&builtin.id) {
                self.template_files.write(&builtin)?;
                self.templates.insert(builtin.id.clone(), builtin);
            }
        }
        Ok(())
    }

    fn record_problems(&mut self, kind: RecordKind, problems: &[StoreError]) {
        if problems.is_empty() {
            return;
        }
        let files: Vec<String> = problems
            .iter()
            .map(|p| match p {
                StoreError::Corrupt { path, .. }
                | StoreError::Io { path, .. }
                | StoreError::DuplicateId { path, .. } => path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string()),
                other => other.to_string(),
            })
            .collect();
        self.load_warnings
            .push(format!("Skipped {} {} file(s): {}", problems.len(), kind, files.join(", ")));
    }

    fn seed_builtin_templates(&mut self) -> StoreResult<()> {
        for template in builtin_templates() {
            if !self.template_files.exists(&template.id) {
                self.template_files.write(&template)?;
                tracing::info!(id = %template.id, "seeded built-in template");
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Notes
    // ---------------------------------------------------------------------

    fn next_note_id(&self) -> String {
        let mut millis = Utc::now().timestamp_millis();
        loop {
            let id = generate_note_id(millis);
            if !self.notes.contains_key(&id) && !self.note_files.exists(&id) {
                return id;
            }
            millis += 1;
        }
    }

    pub fn create_note(&mut self, draft: NoteDraft) -> StoreResult<Note> {
        let note = Note::from_draft(self.next_note_id(), draft)?;
        self.note_files.write(&note)?;
        tracing::info!(id = %note.id, "note created");
        self.notes.insert(note.id.clone(), note.clone());
        Ok(note)
    }

    /// Creates a note seeded with a copy of the template's title, content and color.
    pub fn create_note_from_template(&mut self, template_id: &str) -> StoreResult<Note> {
        let template = self
            .templates
            .get(template_id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Template, template_id))?;
        let draft = NoteDraft {
            title: (!template.title.is_empty()).then(|| template.title.clone()),
            content: template.content.clone(),
            color: Some(template.color.clone()),
            ..NoteDraft::default()
        };
        self.create_note(draft)
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.get(id)
    }

    pub fn get_note(&self, id: &str) -> StoreResult<&Note> {
        self.notes
            .get(id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Note, id))
    }

    pub fn update_note(&mut self, id: &str, update: NoteUpdate) -> StoreResult<&Note> {
        let note = self
            .notes
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Note, id))?;
        let mut updated = note.clone();
        updated.apply(update)?;
        self.note_files.write(&updated)?;
        *note = updated;
        Ok(note)
    }

    /// Deletes a note. Returns `false` if nothing existed, which is not an error.
    pub fn delete_note(&mut self, id: &str) -> StoreResult<bool> {
        let removed_file = self.note_files.remove(id)?;
        let removed_cached = self.notes.remove(id).is_some();
        if removed_file || removed_cached {
            tracing::info!(id, "note deleted");
        }
        Ok(removed_file || removed_cached)
    }

    /// All notes, most recently updated first.
    pub fn notes(&self) -> Vec<&Note> {
        let mut notes: Vec<&Note> = self.notes.values().collect();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| b.id.cmp(&a.id)));
        notes
    }

    /// Case-insensitive substring search over title and content.
    /// A blank query returns every note.
    pub fn search_notes(&self, query: &str) -> Vec<&Note> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.notes();
        }

        let mut hits: Vec<(usize, &Note)> = self
            .notes
            .values()
            .map(|note| (note.matches(&query), note))
            .filter(|(count, _)| *count > 0)
            .collect();
        hits.sort_by(|(ca, a), (cb, b)| {
            cb.cmp(ca)
                .then_with(|| b.updated_at.cmp(&a.updated_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        hits.into_iter().map(|(_, note)| note).collect()
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Writes every note into one JSON document. Returns the number exported.
    pub fn export_notes(&self, path: &Path) -> StoreResult<usize> {
        let notes = self.notes();
        let export = ExportFile {
            total_notes: notes.len(),
            export_timestamp: now().format(TIME_FMT).to_string(),
            notes,
        };
        let json = serde_json::to_string_pretty(&export)?;
        fs::write(path, json).map_err(|e| StoreError::io(path, e))?;
        tracing::info!(path = %path.display(), count = export.total_notes, "notes exported");
        Ok(export.total_notes)
    }

    /// Imports notes from an export document. Ids that already exist get a
    /// fresh id instead of overwriting. Unreadable entries are skipped.
    pub fn import_notes(&mut self, path: &Path) -> StoreResult<usize> {
        let raw = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        let file: ImportFile = serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

        let mut imported = 0;
        for value in file.notes {
            let mut note: Note = match serde_json::from_value(value) {
                Ok(note) => note,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable note in import");
                    continue;
                }
            };
            note.normalize();
            // Distinct ids can share a file name once sanitized, so the file is checked too.
            if note.id.trim().is_empty()
                || self.notes.contains_key(&note.id)
                || self.note_files.exists(&note.id)
            {
                note.id = self.next_note_id();
            }
            self.note_files.write(&note)?;
            self.notes.insert(note.id.clone(), note);
            imported += 1;
        }
        tracing::info!(path = %path.display(), imported, "notes imported");
        Ok(imported)
    }

    // ---------------------------------------------------------------------
    // Templates
    // ---------------------------------------------------------------------

    /// Built-ins in their fixed order, then custom templates by name.
    pub fn templates(&self) -> Vec<&Template> {
        let mut templates: Vec<&Template> = self.templates.values().collect();
        templates.sort_by_key(|t| (builtin_rank(&t.id).unwrap_or(usize::MAX), t.name.to_lowercase()));
        templates
    }

    pub fn template(&self, id: &str) -> Option<&Template> {
        self.templates.get(id)
    }

    pub fn create_template(&mut self, draft: TemplateDraft) -> StoreResult<Template> {
        let base = slugify(&draft.name);
        let mut id = base.clone();
        let mut suffix = 2;
        while is_builtin(&id) || self.templates.contains_key(&id) || self.template_files.exists(&id) {
            id = format!("{base}-{suffix}");
            suffix += 1;
        }

        let template = Template::from_draft(id, draft)?;
        self.template_files.write(&template)?;
        tracing::info!(id = %template.id, "template created");
        self.templates.insert(template.id.clone(), template.clone());
        Ok(template)
    }

    /// Stores a copy of a note's content and color as a new custom template.
    pub fn save_note_as_template(&mut self, note_id: &str, name: &str) -> StoreResult<Template> {
        let note = self.get_note(note_id)?;
        let draft = TemplateDraft {
            name: name.to_string(),
            title: String::new(),
            content: note.content.clone(),
            color: Some(note.color.clone()),
        };
        self.create_template(draft)
    }

    pub fn rename_template(&mut self, id: &str, name: &str) -> StoreResult<&Template> {
        if is_builtin(id) {
            return Err(StoreError::BuiltinTemplate(id.to_string()));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("template name cannot be empty".to_string()));
        }
        let template = self
            .templates
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Template, id))?;
        let mut renamed = template.clone();
        renamed.name = name.to_string();
        self.template_files.write(&renamed)?;
        *template = renamed;
        Ok(template)
    }

    /// Deletes a custom template. Built-ins are refused.
    pub fn delete_template(&mut self, id: &str) -> StoreResult<bool> {
        if is_builtin(id) {
            return Err(StoreError::BuiltinTemplate(id.to_string()));
        }
        let removed_file = self.template_files.remove(id)?;
        let removed_cached = self.templates.remove(id).is_some();
        Ok(removed_file || removed_cached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::note::{Geometry, DEFAULT_NOTE_COLOR};
    use pretty_assertions::assert_eq;

    fn open(dir: &tempfile::TempDir) -> DataManager {
        DataManager::open(dir.path()).unwrap()
    }

    #[test]
    fn test_open_creates_directories_and_builtins() {
        let tmp = tempfile::tempdir().unwrap();
        let dm = open(&tmp);
        assert!(tmp.path().join("notes").is_dir());
        assert!(tmp.path().join("templates/todo.json").is_file());

        let ids: Vec<&str> = dm.templates().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["todo", "meeting", "code", "shopping", "ideas"]);
        assert!(dm.load_warnings().is_empty());
    }

    #[test]
    fn test_round_trip_after_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let created = {
            let mut dm = open(&tmp);
            let note = dm
                .create_note(NoteDraft {
                    content: "Buy milk\nand bread".into(),
                    color: Some("#BBDEFB".into()),
                    font_size: Some(16),
                    geometry: Some(Geometry { x: 5, y: 7, w: 50, h: 20 }),
                    ..NoteDraft::default()
                })
                .unwrap();
            dm.update_note(&note.id, NoteUpdate::Geometry(Geometry { x: 12, y: 4, w: 60, h: 22 }))
                .unwrap()
                .clone()
        };

        let dm = open(&tmp);
        let reloaded = dm.get_note(&created.id).unwrap();
        assert_eq!(reloaded, &created);
        assert_eq!(reloaded.content, "Buy milk\nand bread");
        assert_eq!(reloaded.color, "#BBDEFB");
        assert_eq!(reloaded.font_size, 16);
        assert_eq!(reloaded.geometry(), Geometry { x: 12, y: 4, w: 60, h: 22 });
    }

    #[test]
    fn test_ids_stay_unique_for_fast_creation() {
        let tmp = tempfile::tempdir().unwrap();
        let mut dm = open(&tmp);
        let ids: Vec<String> = (0..20)
            .map(|i| dm.create_note(NoteDraft::with_content(format!("n{i}"))).unwrap().id)
            .collect();
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
        assert!(ids.iter().all(|id| id.starts_with("note_")));
    }

    #[test]
    fn test_buy_milk_scenario() {
        let tmp = tempfile::tempdir().unwrap();
        let mut dm = open(&tmp);
        dm.create_note(NoteDraft::with_content("Call the plumber")).unwrap();
        let milk = dm.create_note(NoteDraft::with_content("Buy milk")).unwrap();

        let hits: Vec<&str> = dm.search_notes("MILK").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(hits, vec![milk.id.as_str()]);

        let path = dm.note_file(&milk.id);
        assert!(path.exists());
        assert!(dm.delete_note(&milk.id).unwrap());
        assert!(dm.search_notes("milk").is_empty());
        assert!(!path.exists());

        // Deleting again is a no-op.
        assert!(!dm.delete_note(&milk.id).unwrap());
    }

    #[test]
    fn test_search_orders_by_match_count_and_blank_returns_all() {
        let tmp = tempfile::tempdir().unwrap();
        let mut dm = open(&tmp);
        let one = dm.create_note(NoteDraft::with_content("tea")).unwrap();
        let three = dm.create_note(NoteDraft::with_content("tea, tea and more tea")).unwrap();

        let hits: Vec<&str> = dm.search_notes("tea").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(hits, vec![three.id.as_str(), one.id.as_str()]);
        assert_eq!(dm.search_notes("   ").len(), 2);
    }

    #[test]
    fn test_update_missing_note_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let mut dm = open(&tmp);
        let err = dm.update_note("note_404", NoteUpdate::Content("x".into())).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_update_refreshes_timestamp_and_orders_notes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut dm = open(&tmp);
        let first = dm.create_note(NoteDraft::with_content("first")).unwrap();
        let second = dm.create_note(NoteDraft::with_content("second")).unwrap();

        // Push the second note into the past so the edit below decides the order.
        let old = crate::store::note::parse_timestamp("2020-01-01 00:00:00").unwrap();
        dm.notes.get_mut(&second.id).unwrap().updated_at = old;
        dm.notes.get_mut(&first.id).unwrap().updated_at = old;

        let updated = dm.update_note(&second.id, NoteUpdate::Content("second, edited".into())).unwrap();
        assert!(updated.updated_at > old);
        assert_eq!(dm.notes()[0].id, second.id);
    }

    #[test]
    fn test_note_from_template_is_an_independent_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let mut dm = open(&tmp);
        let template = dm
            .create_template(TemplateDraft {
                name: "Standup".into(),
                title: String::new(),
                content: "Yesterday:\nToday:".into(),
                color: Some("#E1BEE7".into()),
            })
            .unwrap();

        let note = dm.create_note_from_template(&template.id).unwrap();
        assert_eq!(note.content, "Yesterday:\nToday:");
        assert_eq!(note.color, "#E1BEE7");

        dm.rename_template(&template.id, "Daily standup").unwrap();
        dm.templates.get_mut(&template.id).unwrap().content = "changed".into();
        assert_eq!(dm.get_note(&note.id).unwrap().content, "Yesterday:\nToday:");
    }

    #[test]
    fn test_builtin_templates_cannot_be_removed_or_renamed() {
        let tmp = tempfile::tempdir().unwrap();
        let mut dm = open(&tmp);
        for id in ["todo", "meeting", "code", "shopping", "ideas"] {
            assert!(matches!(dm.delete_template(id), Err(StoreError::BuiltinTemplate(_))));
            assert!(matches!(dm.rename_template(id, "x"), Err(StoreError::BuiltinTemplate(_))));
            assert!(dm.template(id).is_some());
            assert!(tmp.path().join("templates").join(format!("{id}.json")).exists());
        }
    }

    #[test]
    fn test_custom_template_lifecycle() {
        let tmp = tempfile::tempdir().unwrap();
        let mut dm = open(&tmp);
        let note = dm.create_note(NoteDraft::with_content("Went well:\nTo improve:")).unwrap();
        let a = dm.save_note_as_template(&note.id, "Retro").unwrap();
        let b = dm.save_note_as_template(&note.id, "Retro").unwrap();
        assert_eq!(a.id, "retro");
        assert_eq!(b.id, "retro-2");
        assert_eq!(a.color, DEFAULT_NOTE_COLOR);

        // A custom template named like a built-in never takes the built-in id.
        let todo = dm
            .create_template(TemplateDraft { name: "todo".into(), ..TemplateDraft::default() })
            .unwrap();
        assert_eq!(todo.id, "todo-2");

        assert!(dm.delete_template("retro").unwrap());
        assert!(!dm.delete_template("retro").unwrap());
        assert_eq!(dm.templates().last().map(|t| t.id.as_str()), Some("todo-2"));

        let err = dm.create_template(TemplateDraft::default()).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_corrupt_note_is_skipped_with_warning() {
        let tmp = tempfile::tempdir().unwrap();
        let kept = {
            let mut dm = open(&tmp);
            dm.create_note(NoteDraft::with_content("keep me")).unwrap()
        };
        fs::write(tmp.path().join("notes/note_1.json"), "{\"id\": ").unwrap();

        let mut dm = open(&tmp);
        assert_eq!(dm.note_count(), 1);
        assert!(dm.note(&kept.id).is_some());
        let warnings = dm.take_load_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("note_1.json"));
    }

    #[test]
    fn test_corrupt_builtin_is_restored() {
        let tmp = tempfile::tempdir().unwrap();
        drop(open(&tmp));
        fs::write(tmp.path().join("templates/code.json"), "nope").unwrap();

        let dm = open(&tmp);
        assert_eq!(dm.template("code").map(|t| t.name.as_str()), Some("Code Snippet"));
        assert_eq!(dm.load_warnings().len(), 1);
    }

    #[test]
    fn test_export_then_import_into_another_store() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let export = src.path().join("export.json");

        let mut a = open(&src);
        a.create_note(NoteDraft::with_content("alpha")).unwrap();
        a.create_note(NoteDraft::with_content("beta")).unwrap();
        assert_eq!(a.export_notes(&export).unwrap(), 2);

        let mut b = open(&dst);
        let existing = b.create_note(NoteDraft::with_content("local")).unwrap();
        assert_eq!(b.import_notes(&export).unwrap(), 2);
        assert_eq!(b.note_count(), 3);

        // Importing the same file again must not overwrite: ids collide, fresh ids are issued.
        assert_eq!(b.import_notes(&export).unwrap(), 2);
        assert_eq!(b.note_count(), 5);
        assert_eq!(b.get_note(&existing.id).unwrap().content, "local");
    }

    #[test]
    fn test_import_never_reuses_an_occupied_file_name() {
        let tmp = tempfile::tempdir().unwrap();
        let mut dm = open(&tmp);
        let first = tmp.path().join("first.json");
        let second = tmp.path().join("second.json");
        fs::write(&first, r#"{ "notes": [{ "id": "a_b", "content": "first" }] }"#).unwrap();
        fs::write(&second, r#"{ "notes": [{ "id": "a/b", "content": "second" }] }"#).unwrap();

        assert_eq!(dm.import_notes(&first).unwrap(), 1);
        assert_eq!(dm.import_notes(&second).unwrap(), 1);
        assert_eq!(dm.note_count(), 2);
        assert_eq!(dm.get_note("a_b").unwrap().content, "first");

        let reopened = open(&tmp);
        assert_eq!(reopened.note_count(), 2);
        assert_eq!(reopened.get_note("a_b").unwrap().content, "first");
    }

    #[test]
    fn test_import_rejects_non_export_file() {
        let tmp = tempfile::tempdir().unwrap();
        let mut dm = open(&tmp);
        let bogus = tmp.path().join("bogus.json");
        fs::write(&bogus, "[1, 2, 3]").unwrap();
        assert!(matches!(dm.import_notes(&bogus), Err(StoreError::Corrupt { .. })));
    }
}
