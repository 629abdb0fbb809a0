use serde::{Deserialize, Serialize};

use super::error::{StoreError, StoreResult};
use super::note::{is_valid_color, DEFAULT_NOTE_COLOR};

/// A reusable preset for new notes, persisted in `<data_dir>/templates/<id>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Default title for notes created from this template. Empty means "derive from content".
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String { DEFAULT_NOTE_COLOR.to_string() }

#[derive(Debug, Clone, Default)]
pub struct TemplateDraft {
    pub name: String,
    pub title: String,
    pub content: String,
    pub color: Option<String>,
}

struct Builtin {
    id: &'static str,
    name: &'static str,
    color: &'static str,
    content: &'static str,
}

const BUILTINS: [Builtin; 5] = [
    Builtin {
        id: "todo",
        name: "To-Do List",
        color: "#C8E6C9",
        content: "📋 To-Do List\n\n✅ Task 1\n□ Task 2\n□ Task 3\n\n📅 Due: \n\n💡 Notes:",
    },
    Builtin {
        id: "meeting",
        name: "Meeting Notes",
        color: "#BBDEFB",
        content: "📋 Meeting Notes\n\n📅 Date: \n⏰ Time: \n📍 Location: \n\n👥 Attendees:\n• \n• \n• \n\n📝 Agenda:\n• \n• \n• \n\n✅ Action Items:\n• \n• \n•",
    },
    Builtin {
        id: "code",
        name: "Code Snippet",
        color: "#E1BEE7",
        content: "💻 Code Snippet\n\n📁 File: \n🔧 Language: \n\n📝 Description:\n\n```\n// Your code here\n```\n\n💡 Notes:",
    },
    Builtin {
        id: "shopping",
        name: "Shopping List",
        color: "#FFCDD2",
        content: "🛒 Shopping List\n\n🏪 Store: \n\n📋 Items:\n□ \n□ \n□ \n□ \n\n💰 Budget: \n\n📅 Date:",
    },
    Builtin {
        id: "ideas",
        name: "Ideas & Brainstorming",
        color: "#FFF9C4",
        content: "💡 Ideas & Brainstorming\n\n🎯 Topic: \n\n💭 Ideas:\n• \n• \n• \n\n🔍 Research:\n• \n• \n\n✅ Next Steps:\n• \n•",
    },
];

pub fn builtin_templates() -> Vec<Template> {
    BUILTINS
        .iter()
        .map(|b| Template {
            id: b.id.to_string(),
            name: b.name.to_string(),
            title: String::new(),
            content: b.content.to_string(),
            color: b.color.to_string(),
        })
        .collect()
}

pub fn is_builtin(id: &str) -> bool {
    BUILTINS.iter().any(|b| b.id == id)
}

/// Position of a built-in in the fixed display order.
pub fn builtin_rank(id: &str) -> Option<usize> {
    BUILTINS.iter().position(|b| b.id == id)
}

impl Template {
    pub fn is_builtin(&self) -> bool {
        is_builtin(&self.id)
    }

    pub fn from_draft(id: String, draft: TemplateDraft) -> StoreResult<Self> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("template name cannot be empty".to_string()));
        }
        let color = match draft.color {
            Some(color) if is_valid_color(color.trim()) => color.trim().to_string(),
            Some(color) => {
                return Err(StoreError::Validation(format!("'{color}' is not a #RRGGBB color")))
            }
            None => default_color(),
        };
        Ok(Self {
            id,
            name: name.to_string(),
            title: draft.title.trim().to_string(),
            content: draft.content,
            color,
        })
    }

    pub fn normalize(&mut self) {
        if !is_valid_color(&self.color) {
            self.color = default_color();
        }
        if self.name.trim().is_empty() {
            self.name = self.id.clone();
        }
    }
}

/// File-safe identifier derived from a display name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::new();
    let mut last_dash = true;
    for c in name.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "template".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_protected_by_id() {
        let builtins = builtin_templates();
        assert_eq!(builtins.len(), 5);
        assert!(builtins.iter().all(Template::is_builtin));
        assert!(!is_builtin("standup"));
        assert_eq!(builtin_rank("meeting"), Some(1));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Weekly Stand-up!"), "weekly-stand-up");
        assert_eq!(slugify("  Über  Plan "), "über-plan");
        assert_eq!(slugify("???"), "template");
    }

    #[test]
    fn test_draft_validation() {
        let err = Template::from_draft("x".into(), TemplateDraft::default()).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let bad_color = TemplateDraft {
            name: "Retro".into(),
            color: Some("pink".into()),
            ..TemplateDraft::default()
        };
        assert!(Template::from_draft("retro".into(), bad_color).is_err());

        let ok = Template::from_draft(
            "retro".into(),
            TemplateDraft { name: " Retro ".into(), content: "Went well:".into(), ..Default::default() },
        )
        .unwrap();
        assert_eq!(ok.name, "Retro");
        assert_eq!(ok.color, DEFAULT_NOTE_COLOR);
    }
}
