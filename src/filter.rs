use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::models::{Link, Note, ResourceKind, Snippet, Tags, VaultItem};

/// What the engine needs to know about a row.
pub trait Listable {
    fn kind(&self) -> ResourceKind;
    fn title(&self) -> &str;
    /// Searched alongside title and tags: a snippet's language or a link's
    /// description.
    fn secondary_text(&self) -> Option<&str>;
    fn tags(&self) -> &Tags;
    fn is_favorite(&self) -> bool;
    fn timestamp(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    #[default]
    All,
    Link,
    Snippet,
    Note,
}

impl FilterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterType::All => "all",
            FilterType::Link => "link",
            FilterType::Snippet => "snippet",
            FilterType::Note => "note",
        }
    }

    pub fn parse(s: &str) -> Option<FilterType> {
        match s.trim().to_lowercase().as_str() {
            "all" => Some(FilterType::All),
            other => ResourceKind::parse(other).map(FilterType::from),
        }
    }

    pub fn next(self) -> FilterType {
        match self {
            FilterType::All => FilterType::Link,
            FilterType::Link => FilterType::Snippet,
            FilterType::Snippet => FilterType::Note,
            FilterType::Note => FilterType::All,
        }
    }

    pub fn matches(&self, kind: ResourceKind) -> bool {
        match self {
            FilterType::All => true,
            FilterType::Link => kind == ResourceKind::Link,
            FilterType::Snippet => kind == ResourceKind::Snippet,
            FilterType::Note => kind == ResourceKind::Note,
        }
    }
}

impl From<ResourceKind> for FilterType {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Link => FilterType::Link,
            ResourceKind::Snippet => FilterType::Snippet,
            ResourceKind::Note => FilterType::Note,
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    Recent,
    Favorites,
    Tags,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Recent => "recent",
            SortMode::Favorites => "favorites",
            SortMode::Tags => "tags",
        }
    }

    pub fn parse(s: &str) -> Option<SortMode> {
        match s.trim().to_lowercase().as_str() {
            "recent" => Some(SortMode::Recent),
            "favorites" | "favourites" => Some(SortMode::Favorites),
            "tags" => Some(SortMode::Tags),
            _ => None,
        }
    }

    pub fn next(self) -> SortMode {
        match self {
            SortMode::Recent => SortMode::Favorites,
            SortMode::Favorites => SortMode::Tags,
            SortMode::Tags => SortMode::Recent,
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive substring match over title, secondary text and tags.
/// A blank query matches everything.
pub fn matches_query<T: Listable + ?Sized>(item: &T, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    item.title().to_lowercase().contains(&query)
        || item
            .secondary_text()
            .is_some_and(|text| text.to_lowercase().contains(&query))
        || item.tags().iter().any(|tag| tag.to_lowercase().contains(&query))
}

fn newest_first<T: Listable>(a: &T, b: &T) -> Ordering {
    b.timestamp().cmp(&a.timestamp())
}

pub fn compare<T: Listable>(mode: SortMode, a: &T, b: &T) -> Ordering {
    match mode {
        SortMode::Recent => newest_first(a, b),
        SortMode::Favorites => b
            .is_favorite()
            .cmp(&a.is_favorite())
            .then_with(|| newest_first(a, b)),
        SortMode::Tags => b
            .tags()
            .len()
            .cmp(&a.tags().len())
            .then_with(|| newest_first(a, b)),
    }
}

/// The rows to show, in display order. Sorting is stable, so rows that
/// compare equal keep their order from `items`.
pub fn visible<'a, T: Listable>(
    items: &'a [T],
    query: &str,
    filter_type: FilterType,
    sort_mode: SortMode,
) -> Vec<&'a T> {
    let mut out: Vec<&T> = items
        .iter()
        .filter(|item| filter_type.matches(item.kind()))
        .filter(|item| matches_query(*item, query))
        .collect();
    out.sort_by(|a, b| compare(sort_mode, *a, *b));
    out
}

impl Listable for Link {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Link
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn secondary_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn tags(&self) -> &Tags {
        &self.tags
    }

    fn is_favorite(&self) -> bool {
        false
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Listable for Snippet {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Snippet
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn secondary_text(&self) -> Option<&str> {
        Some(self.language.as_str())
    }

    fn tags(&self) -> &Tags {
        &self.tags
    }

    fn is_favorite(&self) -> bool {
        false
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Listable for Note {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Note
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn secondary_text(&self) -> Option<&str> {
        None
    }

    fn tags(&self) -> &Tags {
        &self.tags
    }

    fn is_favorite(&self) -> bool {
        self.is_favorite
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Listable for VaultItem {
    fn kind(&self) -> ResourceKind {
        VaultItem::kind(self)
    }

    fn title(&self) -> &str {
        VaultItem::title(self)
    }

    fn secondary_text(&self) -> Option<&str> {
        match self {
            VaultItem::Link(l) => l.secondary_text(),
            VaultItem::Snippet(s) => s.secondary_text(),
            VaultItem::Note(n) => n.secondary_text(),
        }
    }

    fn tags(&self) -> &Tags {
        VaultItem::tags(self)
    }

    fn is_favorite(&self) -> bool {
        VaultItem::is_favorite(self)
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).unwrap()
    }

    fn note(title: &str, d: u32, favorite: bool) -> VaultItem {
        VaultItem::Note(Note {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            title: title.to_string(),
            content: String::new(),
            tags: Tags::new(),
            is_favorite: favorite,
            created_at: day(d),
            updated_at: day(d),
        })
    }

    fn snippet(title: &str, language: &str, d: u32, tags: &str) -> VaultItem {
        VaultItem::Snippet(Snippet {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            title: title.to_string(),
            content: "code".to_string(),
            language: language.to_string(),
            tags: Tags::parse_list(tags),
            created_at: day(d),
            updated_at: day(d),
        })
    }

    fn link(title: &str, description: Option<&str>, d: u32, tags: &str) -> VaultItem {
        VaultItem::Link(Link {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            title: title.to_string(),
            url: "https://example.com".to_string(),
            description: description.map(String::from),
            note: None,
            tags: Tags::parse_list(tags),
            category: None,
            image_url: None,
            created_at: day(d),
            updated_at: day(d),
        })
    }

    fn titles(items: Vec<&VaultItem>) -> Vec<&str> {
        items.into_iter().map(|i| VaultItem::title(i)).collect()
    }

    // --- Sorting ---

    #[test]
    fn test_favorites_and_recent_agree_when_favorite_is_newest() {
        let items = vec![note("A", 1, false), note("B", 3, true), note("C", 2, false)];
        assert_eq!(
            titles(visible(&items, "", FilterType::All, SortMode::Favorites)),
            vec!["B", "C", "A"]
        );
        assert_eq!(
            titles(visible(&items, "", FilterType::All, SortMode::Recent)),
            vec!["B", "C", "A"]
        );
    }

    #[test]
    fn test_favorites_sort_lifts_old_favorite() {
        let items = vec![note("D", 5, false), note("E", 1, true)];
        assert_eq!(
            titles(visible(&items, "", FilterType::All, SortMode::Favorites)),
            vec!["E", "D"]
        );
        assert_eq!(
            titles(visible(&items, "", FilterType::All, SortMode::Recent)),
            vec!["D", "E"]
        );
    }

    #[test]
    fn test_every_favorite_precedes_every_other() {
        let items = vec![
            note("n1", 9, false),
            note("f1", 2, true),
            snippet("s1", "rust", 8, ""),
            note("f2", 4, true),
            link("l1", None, 7, ""),
        ];
        let out = visible(&items, "", FilterType::All, SortMode::Favorites);
        let first_plain = out.iter().position(|i| !i.is_favorite()).unwrap();
        assert!(out[first_plain..].iter().all(|i| !i.is_favorite()));
        assert_eq!(titles(out), vec!["f2", "f1", "n1", "s1", "l1"]);
    }

    #[test]
    fn test_tags_sort_by_count_then_recency() {
        let items = vec![
            snippet("one-old", "go", 1, "a"),
            snippet("none", "go", 9, ""),
            snippet("two", "go", 2, "a, b"),
            snippet("one-new", "go", 5, "c"),
        ];
        assert_eq!(
            titles(visible(&items, "", FilterType::All, SortMode::Tags)),
            vec!["two", "one-new", "one-old", "none"]
        );
    }

    #[test]
    fn test_recent_keeps_insertion_order_on_ties() {
        let items = vec![note("first", 3, false), note("second", 3, false), note("third", 3, false)];
        assert_eq!(
            titles(visible(&items, "", FilterType::All, SortMode::Recent)),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn test_empty_query_returns_everything_and_is_idempotent() {
        let items = vec![note("a", 1, false), snippet("b", "go", 4, ""), link("c", None, 2, "")];
        let once = visible(&items, "   ", FilterType::All, SortMode::Recent);
        let twice = visible(&items, "   ", FilterType::All, SortMode::Recent);
        assert_eq!(once.len(), items.len());
        assert_eq!(once, twice);
        assert_eq!(titles(once), vec!["b", "c", "a"]);
    }

    // --- Filtering ---

    #[test]
    fn test_query_matches_language() {
        let items = vec![
            snippet("parser", "python", 1, ""),
            snippet("gem", "ruby", 2, ""),
            snippet("server", "go", 3, ""),
        ];
        assert_eq!(
            titles(visible(&items, "py", FilterType::All, SortMode::Recent)),
            vec!["parser"]
        );
    }

    #[test]
    fn test_query_is_case_insensitive_and_trimmed() {
        let items = vec![link("Rust Book", None, 1, ""), link("Go Tour", None, 2, "")];
        assert_eq!(
            titles(visible(&items, "  rUSt ", FilterType::All, SortMode::Recent)),
            vec!["Rust Book"]
        );
    }

    #[test]
    fn test_query_matches_tag_and_description() {
        let items = vec![
            link("a", Some("Async runtime"), 1, ""),
            link("b", None, 2, "Tokio"),
            link("c", None, 3, "web"),
        ];
        assert_eq!(
            titles(visible(&items, "tok", FilterType::All, SortMode::Recent)),
            vec!["b"]
        );
        assert_eq!(
            titles(visible(&items, "async", FilterType::All, SortMode::Recent)),
            vec!["a"]
        );
    }

    #[test]
    fn test_query_ignores_note_body() {
        let mut item = note("shopping", 1, false);
        if let VaultItem::Note(ref mut n) = item {
            n.content = "buy rust book".to_string();
        }
        let items = vec![item];
        assert!(visible(&items, "rust", FilterType::All, SortMode::Recent).is_empty());
    }

    #[test]
    fn test_every_result_matches_query() {
        let items = vec![
            link("Pytest docs", None, 1, ""),
            snippet("loop", "python", 2, ""),
            note("ideas", 3, false),
            snippet("deploy", "bash", 4, "py-tools"),
            link("blog", Some("happy path"), 5, ""),
        ];
        let out = visible(&items, "PY", FilterType::All, SortMode::Recent);
        assert_eq!(out.len(), 4);
        for item in out {
            assert!(matches_query(item, "py"));
        }
    }

    #[test]
    fn test_filter_type_restricts_kind() {
        let items = vec![note("n", 1, false), snippet("s", "go", 2, ""), link("l", None, 3, "")];
        assert_eq!(
            titles(visible(&items, "", FilterType::Snippet, SortMode::Recent)),
            vec!["s"]
        );
        assert_eq!(
            titles(visible(&items, "", FilterType::Note, SortMode::Recent)),
            vec!["n"]
        );
        assert_eq!(visible(&items, "", FilterType::All, SortMode::Recent).len(), 3);
    }

    #[test]
    fn test_filter_and_query_combine() {
        let items = vec![snippet("rust tips", "rust", 1, ""), link("rust blog", None, 2, "")];
        assert_eq!(
            titles(visible(&items, "rust", FilterType::Link, SortMode::Recent)),
            vec!["rust blog"]
        );
    }

    #[test]
    fn test_works_on_concrete_resource_lists() {
        let now = Utc::now();
        let notes = vec![Note {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            title: "Standup".into(),
            content: String::new(),
            tags: Tags::parse_list("work"),
            is_favorite: false,
            created_at: now,
            updated_at: now,
        }];
        assert_eq!(visible(&notes, "WORK", FilterType::All, SortMode::Recent).len(), 1);
        assert!(visible(&notes, "", FilterType::Link, SortMode::Recent).is_empty());
    }

    // --- Modes ---

    #[test]
    fn test_mode_names() {
        assert_eq!(SortMode::parse("Favorites"), Some(SortMode::Favorites));
        assert_eq!(SortMode::parse("oldest"), None);
        assert_eq!(FilterType::parse("ALL"), Some(FilterType::All));
        assert_eq!(FilterType::parse("snippets"), Some(FilterType::Snippet));
        assert_eq!(FilterType::parse("video"), None);
    }

    #[test]
    fn test_modes_cycle() {
        let mut mode = SortMode::Recent;
        for _ in 0..3 {
            mode = mode.next();
        }
        assert_eq!(mode, SortMode::Recent);
        assert_eq!(FilterType::All.next(), FilterType::Link);
        assert_eq!(FilterType::Note.next(), FilterType::All);
    }
}
