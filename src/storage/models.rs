use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Languages offered by the snippet form. Any other value is accepted as-is.
pub const LANGUAGE_SUGGESTIONS: &[&str] = &[
    "javascript",
    "typescript",
    "python",
    "java",
    "cpp",
    "csharp",
    "php",
    "ruby",
    "swift",
    "kotlin",
    "rust",
    "go",
    "html",
    "css",
    "markdown",
    "json",
    "yaml",
    "xml",
    "bash",
    "shell",
    "powershell",
    "sql",
    "postgresql",
    "mysql",
    "sqlite",
    "mongodb",
    "redis",
    "graphql",
    "other",
];

pub const DEFAULT_LANGUAGE: &str = "javascript";

/// Categories offered by the link form. Free-form like languages.
pub const CATEGORY_SUGGESTIONS: &[&str] = &[
    "tutorial",
    "news",
    "documentation",
    "tool",
    "video",
    "article",
    "reference",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Link,
    Snippet,
    Note,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Link, ResourceKind::Snippet, ResourceKind::Note];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Link => "link",
            ResourceKind::Snippet => "snippet",
            ResourceKind::Note => "note",
        }
    }

    pub fn parse(s: &str) -> Option<ResourceKind> {
        match s.trim().to_lowercase().as_str() {
            "link" | "links" => Some(ResourceKind::Link),
            "snippet" | "snippets" => Some(ResourceKind::Snippet),
            "note" | "notes" => Some(ResourceKind::Note),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique, trimmed, non-empty labels. Iteration order is lexical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeSet<String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` for blank input or a tag that is already present.
    pub fn insert(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() {
            return false;
        }
        self.0.insert(tag.to_string())
    }

    pub fn remove(&mut self, tag: &str) -> bool {
        self.0.remove(tag.trim())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag.trim())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Splits on commas, trims each segment and drops empty ones.
    pub fn parse_list(input: &str) -> Self {
        input.split(',').collect()
    }

    pub fn join(&self, sep: &str) -> String {
        self.iter().collect::<Vec<_>>().join(sep)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for Tags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for tag in iter {
            tags.insert(tag.as_ref());
        }
        tags
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub note: Option<String>,
    pub tags: Tags,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewLink {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub note: Option<String>,
    pub tags: Tags,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// `None` leaves a field unchanged; `Some(None)` clears a nullable one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkPatch {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<Option<String>>,
    pub note: Option<Option<String>>,
    pub tags: Option<Tags>,
    pub category: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snippet {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub content: String,
    pub language: String,
    pub tags: Tags,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSnippet {
    pub title: String,
    pub content: String,
    pub language: String,
    pub tags: Tags,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnippetPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub language: Option<String>,
    pub tags: Option<Tags>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: Tags,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub tags: Tags,
    pub is_favorite: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Tags>,
    pub is_favorite: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    pub username: Option<Option<String>>,
    pub full_name: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
}

#[derive(Debug, Default, Serialize)]
pub struct VaultStats {
    pub links: i64,
    pub snippets: i64,
    pub notes: i64,
    pub total_items: i64,
    pub last_week_activity: i64,
    pub favorite_items: i64,
}

/// A row type held by a collection. Everything generic over links, snippets
/// and notes goes through this.
pub trait Resource: Clone + fmt::Debug {
    type New: Clone + fmt::Debug;
    type Patch: Clone + fmt::Debug + Default;

    const KIND: ResourceKind;

    fn id(&self) -> Uuid;
    fn owner_id(&self) -> Uuid;
    fn title(&self) -> &str;
    fn tags(&self) -> &Tags;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;

    fn tags_patch(tags: Tags) -> Self::Patch;
    fn into_item(self) -> VaultItem;
}

impl Resource for Link {
    type New = NewLink;
    type Patch = LinkPatch;

    const KIND: ResourceKind = ResourceKind::Link;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn tags(&self) -> &Tags {
        &self.tags
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn tags_patch(tags: Tags) -> LinkPatch {
        LinkPatch {
            tags: Some(tags),
            ..Default::default()
        }
    }

    fn into_item(self) -> VaultItem {
        VaultItem::Link(self)
    }
}

impl Resource for Snippet {
    type New = NewSnippet;
    type Patch = SnippetPatch;

    const KIND: ResourceKind = ResourceKind::Snippet;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn tags(&self) -> &Tags {
        &self.tags
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn tags_patch(tags: Tags) -> SnippetPatch {
        SnippetPatch {
            tags: Some(tags),
            ..Default::default()
        }
    }

    fn into_item(self) -> VaultItem {
        VaultItem::Snippet(self)
    }
}

impl Resource for Note {
    type New = NewNote;
    type Patch = NotePatch;

    const KIND: ResourceKind = ResourceKind::Note;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn tags(&self) -> &Tags {
        &self.tags
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn tags_patch(tags: Tags) -> NotePatch {
        NotePatch {
            tags: Some(tags),
            ..Default::default()
        }
    }

    fn into_item(self) -> VaultItem {
        VaultItem::Note(self)
    }
}

/// Any resource, as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VaultItem {
    Link(Link),
    Snippet(Snippet),
    Note(Note),
}

impl VaultItem {
    pub fn kind(&self) -> ResourceKind {
        match self {
            VaultItem::Link(_) => ResourceKind::Link,
            VaultItem::Snippet(_) => ResourceKind::Snippet,
            VaultItem::Note(_) => ResourceKind::Note,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            VaultItem::Link(l) => l.id,
            VaultItem::Snippet(s) => s.id,
            VaultItem::Note(n) => n.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            VaultItem::Link(l) => &l.title,
            VaultItem::Snippet(s) => &s.title,
            VaultItem::Note(n) => &n.title,
        }
    }

    pub fn tags(&self) -> &Tags {
        match self {
            VaultItem::Link(l) => &l.tags,
            VaultItem::Snippet(s) => &s.tags,
            VaultItem::Note(n) => &n.tags,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            VaultItem::Link(l) => l.created_at,
            VaultItem::Snippet(s) => s.created_at,
            VaultItem::Note(n) => n.created_at,
        }
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            VaultItem::Link(l) => l.updated_at,
            VaultItem::Snippet(s) => s.updated_at,
            VaultItem::Note(n) => n.updated_at,
        }
    }

    pub fn is_favorite(&self) -> bool {
        matches!(self, VaultItem::Note(n) if n.is_favorite)
    }

    /// The text a copy action puts on the clipboard.
    pub fn copy_text(&self) -> &str {
        match self {
            VaultItem::Link(l) => &l.url,
            VaultItem::Snippet(s) => &s.content,
            VaultItem::Note(n) => &n.content,
        }
    }

    pub fn short_id(&self) -> String {
        short_id(self.id())
    }
}

pub fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}
