//! Persistence for notes and templates: one pretty-printed JSON file per record.

mod dir;
mod error;
mod manager;
pub mod note;
pub mod template;

pub use error::StoreError;
pub use manager::DataManager;
pub use note::{Geometry, Note, NoteDraft, NoteUpdate};
pub use template::Template;
