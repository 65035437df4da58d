use chrono::{Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::auth::Identity;
use crate::errors::{Result, VaultError};
use crate::storage::models::{Link, Note, Resource, ResourceKind, Snippet, VaultItem, VaultStats};
use crate::storage::{AccountStorage, ResourceClient};
use crate::store::ResourceStore;

/// Shortest id prefix accepted by [`Dashboard::find`].
pub const MIN_PREFIX_LEN: usize = 4;

/// Everything a backend needs to serve the dashboard.
pub trait VaultBackend:
    ResourceClient<Link> + ResourceClient<Snippet> + ResourceClient<Note> + AccountStorage
{
}

impl<T> VaultBackend for T where
    T: ResourceClient<Link> + ResourceClient<Snippet> + ResourceClient<Note> + AccountStorage
{
}

/// The three stores of one signed-in session, side by side.
pub struct Dashboard<'c, C> {
    backend: &'c C,
    identity: Option<Identity>,
    pub links: ResourceStore<'c, Link, C>,
    pub snippets: ResourceStore<'c, Snippet, C>,
    pub notes: ResourceStore<'c, Note, C>,
}

impl<'c, C: VaultBackend> Dashboard<'c, C> {
    pub fn new(backend: &'c C, identity: Option<Identity>) -> Self {
        Self {
            backend,
            links: ResourceStore::new(backend, identity.clone()),
            snippets: ResourceStore::new(backend, identity.clone()),
            notes: ResourceStore::new(backend, identity.clone()),
            identity,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Loads every store even when one fails. Each store keeps its own
    /// error; the first one is returned.
    pub fn load_all(&mut self) -> Result<()> {
        let results = [self.links.load(), self.snippets.load(), self.notes.load()];
        debug!(
            links = self.links.items().len(),
            snippets = self.snippets.items().len(),
            notes = self.notes.items().len(),
            "dashboard loaded"
        );
        results.into_iter().collect()
    }

    pub fn is_loading(&self) -> bool {
        self.links.is_loading() || self.snippets.is_loading() || self.notes.is_loading()
    }

    /// First recorded store error, if any.
    pub fn error(&self) -> Option<&str> {
        self.links
            .error()
            .or(self.snippets.error())
            .or(self.notes.error())
    }

    pub fn clear_errors(&mut self) {
        self.links.clear_error();
        self.snippets.clear_error();
        self.notes.clear_error();
    }

    /// All loaded items, newest first.
    pub fn items(&self) -> Vec<VaultItem> {
        let mut items: Vec<VaultItem> = self
            .links
            .items()
            .iter()
            .cloned()
            .map(Resource::into_item)
            .chain(self.snippets.items().iter().cloned().map(Resource::into_item))
            .chain(self.notes.items().iter().cloned().map(Resource::into_item))
            .collect();
        items.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        items
    }

    /// Resolves a full id or a unique prefix among the loaded items.
    pub fn find(&self, id_or_prefix: &str) -> Result<VaultItem> {
        resolve(self.items(), id_or_prefix)
    }

    /// Counts for the signed-in owner. `Ok(None)` when signed out.
    pub fn stats(&self) -> Result<Option<VaultStats>> {
        let Some(identity) = &self.identity else {
            return Ok(None);
        };
        let since = Utc::now() - Duration::days(7);
        self.backend.stats(identity.id, since).map(Some)
    }

    pub fn delete(&mut self, kind: ResourceKind, id: Uuid) -> Result<bool> {
        match kind {
            ResourceKind::Link => self.links.delete(id),
            ResourceKind::Snippet => self.snippets.delete(id),
            ResourceKind::Note => self.notes.delete(id),
        }
    }

    pub fn add_tag(&mut self, kind: ResourceKind, id: Uuid, tag: &str) -> Result<Option<VaultItem>> {
        Ok(match kind {
            ResourceKind::Link => self.links.add_tag(id, tag)?.map(Resource::into_item),
            ResourceKind::Snippet => self.snippets.add_tag(id, tag)?.map(Resource::into_item),
            ResourceKind::Note => self.notes.add_tag(id, tag)?.map(Resource::into_item),
        })
    }

    pub fn remove_tag(&mut self, kind: ResourceKind, id: Uuid, tag: &str) -> Result<Option<VaultItem>> {
        Ok(match kind {
            ResourceKind::Link => self.links.remove_tag(id, tag)?.map(Resource::into_item),
            ResourceKind::Snippet => self.snippets.remove_tag(id, tag)?.map(Resource::into_item),
            ResourceKind::Note => self.notes.remove_tag(id, tag)?.map(Resource::into_item),
        })
    }

    /// Only notes carry a favorite flag.
    pub fn toggle_favorite(&mut self, kind: ResourceKind, id: Uuid) -> Result<Option<VaultItem>> {
        if kind != ResourceKind::Note {
            return Err(VaultError::InvalidInput(format!("only notes can be favorited, not {kind}s")));
        }
        Ok(self.notes.toggle_favorite(id)?.map(Resource::into_item))
    }
}

fn resolve(items: Vec<VaultItem>, id_or_prefix: &str) -> Result<VaultItem> {
    let raw = id_or_prefix.trim();
    let needle: String = raw
        .chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if needle.len() < MIN_PREFIX_LEN || !needle.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(VaultError::InvalidInput(format!(
            "'{raw}' is not an id (use at least {MIN_PREFIX_LEN} hex characters)"
        )));
    }

    let mut matches = items
        .into_iter()
        .filter(|item| item.id().simple().to_string().starts_with(&needle));
    let first = matches
        .next()
        .ok_or_else(|| VaultError::NotFound(format!("no item with id {raw}")))?;
    if matches.next().is_some() {
        return Err(VaultError::InvalidInput(format!("id prefix '{raw}' is ambiguous")));
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::{NewLink, NewNote, NewSnippet, Tags};
    use crate::storage::sqlite::SqliteBackend;

    fn seeded() -> (SqliteBackend, Identity) {
        let backend = SqliteBackend::in_memory().unwrap();
        let identity = backend.find_or_create_user("dev@example.com").unwrap();
        let owner = identity.id;
        let _: Link = backend
            .create(
                owner,
                NewLink {
                    title: "Rust".into(),
                    url: "https://rust-lang.org".into(),
                    ..Default::default()
                },
            )
            .unwrap();
        let _: Snippet = backend
            .create(
                owner,
                NewSnippet {
                    title: "hello".into(),
                    content: "fn main() {}".into(),
                    language: "rust".into(),
                    tags: Tags::parse_list("demo"),
                },
            )
            .unwrap();
        let _: Note = backend
            .create(
                owner,
                NewNote {
                    title: "ideas".into(),
                    is_favorite: true,
                    ..Default::default()
                },
            )
            .unwrap();
        (backend, identity)
    }

    #[test]
    fn test_load_all_merges_every_kind() {
        let (backend, identity) = seeded();
        let mut dashboard = Dashboard::new(&backend, Some(identity));
        dashboard.load_all().unwrap();
        let items = dashboard.items();
        assert_eq!(items.len(), 3);
        for kind in ResourceKind::ALL {
            assert!(items.iter().any(|item| item.kind() == kind));
        }
        assert!(items.windows(2).all(|w| w[0].created_at() >= w[1].created_at()));
    }

    #[test]
    fn test_load_all_keeps_loading_after_a_failed_collection() {
        let (backend, identity) = seeded();
        backend.conn().execute_batch("DROP TABLE links_tags").unwrap();
        let mut dashboard = Dashboard::new(&backend, Some(identity));

        assert!(matches!(dashboard.load_all(), Err(VaultError::Backend(_))));
        assert!(dashboard.links.error().is_some());
        assert!(dashboard.links.items().is_empty());
        assert!(dashboard.snippets.error().is_none());
        assert!(dashboard.notes.error().is_none());
        assert_eq!(dashboard.snippets.items().len(), 1);
        assert_eq!(dashboard.notes.items().len(), 1);
        assert_eq!(dashboard.items().len(), 2);
    }

    #[test]
    fn test_signed_out_dashboard_is_empty() {
        let (backend, _) = seeded();
        let mut dashboard = Dashboard::new(&backend, None);
        dashboard.load_all().unwrap();
        assert!(dashboard.items().is_empty());
        assert!(dashboard.stats().unwrap().is_none());
    }

    #[test]
    fn test_find_by_prefix_and_full_id() {
        let (backend, identity) = seeded();
        let mut dashboard = Dashboard::new(&backend, Some(identity));
        dashboard.load_all().unwrap();
        let note_id = dashboard.notes.items()[0].id;

        let by_full = dashboard.find(&note_id.to_string()).unwrap();
        assert_eq!(by_full.id(), note_id);
        let prefix = &note_id.simple().to_string()[..8];
        assert_eq!(dashboard.find(prefix).unwrap().id(), note_id);
        assert_eq!(dashboard.find(&prefix.to_uppercase()).unwrap().id(), note_id);
    }

    #[test]
    fn test_find_rejects_short_or_unknown() {
        let (backend, identity) = seeded();
        let mut dashboard = Dashboard::new(&backend, Some(identity));
        dashboard.load_all().unwrap();
        assert!(matches!(dashboard.find("ab"), Err(VaultError::InvalidInput(_))));
        assert!(matches!(dashboard.find("zzzz"), Err(VaultError::InvalidInput(_))));
        let unused = Uuid::new_v4().to_string();
        assert!(matches!(dashboard.find(&unused), Err(VaultError::NotFound(_))));
    }

    fn note_with_id(id: u128) -> VaultItem {
        let now = Utc::now();
        Note {
            id: Uuid::from_u128(id),
            owner_id: Uuid::nil(),
            title: "n".into(),
            content: String::new(),
            tags: Tags::new(),
            is_favorite: false,
            created_at: now,
            updated_at: now,
        }
        .into_item()
    }

    #[test]
    fn test_find_ambiguous_prefix() {
        let items = vec![
            note_with_id(0xabcd1111_0000_0000_0000_000000000000),
            note_with_id(0xabcd2222_0000_0000_0000_000000000000),
        ];
        assert!(matches!(resolve(items.clone(), "abcd"), Err(VaultError::InvalidInput(_))));
        let found = resolve(items, "abcd2").unwrap();
        assert_eq!(found.id(), Uuid::from_u128(0xabcd2222_0000_0000_0000_000000000000));
    }

    #[test]
    fn test_stats_counts_all_kinds() {
        let (backend, identity) = seeded();
        let dashboard = Dashboard::new(&backend, Some(identity));
        let stats = dashboard.stats().unwrap().unwrap();
        assert_eq!(stats.links, 1);
        assert_eq!(stats.snippets, 1);
        assert_eq!(stats.notes, 1);
        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.last_week_activity, 3);
        assert_eq!(stats.favorite_items, 1);
    }

    #[test]
    fn test_dispatch_by_kind() {
        let (backend, identity) = seeded();
        let mut dashboard = Dashboard::new(&backend, Some(identity));
        dashboard.load_all().unwrap();
        let link_id = dashboard.links.items()[0].id;
        let note_id = dashboard.notes.items()[0].id;

        let tagged = dashboard.add_tag(ResourceKind::Link, link_id, "lang").unwrap().unwrap();
        assert!(tagged.tags().contains("lang"));
        assert!(matches!(
            dashboard.toggle_favorite(ResourceKind::Link, link_id),
            Err(VaultError::InvalidInput(_))
        ));
        let toggled = dashboard.toggle_favorite(ResourceKind::Note, note_id).unwrap().unwrap();
        assert!(!toggled.is_favorite());

        assert!(dashboard.delete(ResourceKind::Link, link_id).unwrap());
        assert_eq!(dashboard.items().len(), 2);
    }
}
