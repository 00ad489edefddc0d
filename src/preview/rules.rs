//! Transform rules, named items, and the templated-transform boundary.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::SystemTime;

use regex::Regex;

/// How a rule's search field is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Exact substring find/replace, all occurrences.
    Literal,
    /// Regular expression with capture-group back-references in the replacement.
    Pattern,
}

/// One find/replace rule. Rules apply in ordinal order; disabled rules are
/// skipped entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRule {
    pub name: String,
    pub search: String,
    pub replace: String,
    pub kind: RuleKind,
    pub enabled: bool,
    pub ordinal: u32,
}

impl TransformRule {
    pub fn literal(
        name: impl Into<String>,
        search: impl Into<String>,
        replace: impl Into<String>,
        ordinal: u32,
    ) -> Self {
        Self {
            name: name.into(),
            search: search.into(),
            replace: replace.into(),
            kind: RuleKind::Literal,
            enabled: true,
            ordinal,
        }
    }

    pub fn pattern(
        name: impl Into<String>,
        search: impl Into<String>,
        replace: impl Into<String>,
        ordinal: u32,
    ) -> Self {
        Self {
            name: name.into(),
            search: search.into(),
            replace: replace.into(),
            kind: RuleKind::Pattern,
            enabled: true,
            ordinal,
        }
    }
}

/// Lifecycle classification of a named item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Valid,
    /// Assigned only after a batch apply commits, never during preview.
    Modified,
    Duplicate,
    Error,
}

/// One renameable item. The identifier is stable for the item's lifetime;
/// everything else is the mutable surface the pipeline operates on.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedItem {
    pub id: u64,
    pub original_name: String,
    pub current_name: String,
    pub char_count: usize,
    pub status: ItemStatus,
    pub modified_at: SystemTime,
}

impl NamedItem {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            char_count: name.chars().count(),
            original_name: name.clone(),
            current_name: name,
            status: ItemStatus::Valid,
            modified_at: SystemTime::now(),
        }
    }

    /// Rename the item, refreshing the derived character count and timestamp.
    pub fn set_name(&mut self, name: String) {
        self.char_count = name.chars().count();
        self.current_name = name;
        self.modified_at = SystemTime::now();
    }
}

/// A specialized templated transform, owned by an external collaborator.
///
/// Receives the current name plus whether an episode-title segment is
/// present; `Err` carries a per-item failure message.
pub trait TemplateTransform: Send + Sync {
    fn render(&self, name: &str, has_episode_title: bool) -> std::result::Result<String, String>;
}

/// Registry of templated transforms, looked up by the name inside a rule's
/// `{template-name}` replacement field.
#[derive(Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Arc<dyn TemplateTransform>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in templates.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("episode-tag", Arc::new(EpisodeTagTemplate));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, template: Arc<dyn TemplateTransform>) {
        self.templates.insert(name.into(), template);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn TemplateTransform>> {
        self.templates.get(name)
    }
}

/// Extract the template name from a `{template-name}` replacement field.
pub fn template_target(replace: &str) -> Option<&str> {
    let inner = replace.strip_prefix('{')?.strip_suffix('}')?;
    if inner.is_empty() || inner.contains(['{', '}', '$']) {
        return None;
    }
    Some(inner)
}

fn episode_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+?)\s*-\s*(\d+)(?:\s*-\s*(.+))?$").expect("static pattern"))
}

/// True when the name carries a trailing episode-title segment
/// (`Show - 101 - Title` as opposed to `Show - 101`).
pub fn has_episode_title(name: &str) -> bool {
    episode_regex()
        .captures(name)
        .map_or(false, |caps| caps.get(3).is_some())
}

/// Built-in template: reorders `Show - NNN - Title` into
/// `Show   Title  Ep No. NNN`.
pub struct EpisodeTagTemplate;

impl TemplateTransform for EpisodeTagTemplate {
    fn render(&self, name: &str, has_episode_title: bool) -> std::result::Result<String, String> {
        let caps = episode_regex()
            .captures(name)
            .ok_or_else(|| format!("'{name}' does not carry an episode number"))?;
        let show = caps[1].trim_end();
        let number = &caps[2];

        if has_episode_title {
            let title = caps
                .get(3)
                .ok_or_else(|| format!("'{name}' is missing its episode title"))?;
            Ok(format!("{show}   {}  Ep No. {number}", title.as_str()))
        } else {
            Ok(format!("{show}  Ep No. {number}"))
        }
    }
}
