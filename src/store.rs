use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::Identity;
use crate::errors::{Result, VaultError};
use crate::storage::ResourceClient;
use crate::storage::models::{Note, NotePatch, Resource};

pub struct ResourceStore<'c, R, C: ?Sized> {
    client: &'c C,
    identity: Option<Identity>,
    items: Vec<R>,
    loading: bool,
    error: Option<String>,
}

impl<'c, R, C> ResourceStore<'c, R, C>
where
    R: Resource,
    C: ResourceClient<R> + ?Sized,
{
    pub fn new(client: &'c C, identity: Option<Identity>) -> Self {
        Self {
            client,
            identity,
            items: Vec::new(),
            loading: false,
            error: None,
        }
    }

    pub fn items(&self) -> &[R] {
        &self.items
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn find(&self, id: Uuid) -> Option<&R> {
        self.items.iter().find(|item| item.id() == id)
    }

    fn owner(&self) -> Option<Uuid> {
        self.identity.as_ref().map(|identity| identity.id)
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(ref e) = result {
            warn!(kind = %R::KIND, error = %e, "store operation failed");
            self.error = Some(e.to_string());
        }
        result
    }

    /// Replaces the list with the owner's rows in server order.
    pub fn load(&mut self) -> Result<()> {
        let Some(owner) = self.owner() else {
            return Ok(());
        };
        self.loading = true;
        let result = self.client.list_by_owner(owner);
        self.loading = false;
        let items = self.track(result)?;
        debug!(kind = %R::KIND, count = items.len(), "loaded");
        self.items = items;
        Ok(())
    }

    /// Fetches one row for editing. The local list is not consulted.
    pub fn get(&mut self, id: Uuid) -> Result<Option<R>> {
        let Some(owner) = self.owner() else {
            return Ok(None);
        };
        let result = self.client.get_by_id(owner, id);
        self.track(result).map(Some)
    }

    pub fn create(&mut self, new: R::New) -> Result<Option<R>> {
        let Some(owner) = self.owner() else {
            return Ok(None);
        };
        let result = self.client.create(owner, new);
        let created = self.track(result)?;
        self.items.insert(0, created.clone());
        Ok(Some(created))
    }

    pub fn update(&mut self, id: Uuid, patch: R::Patch) -> Result<Option<R>> {
        let Some(owner) = self.owner() else {
            return Ok(None);
        };
        let result = self.client.update(owner, id, patch);
        let updated = self.track(result)?;
        if let Some(slot) = self.items.iter_mut().find(|item| item.id() == id) {
            *slot = updated.clone();
        }
        Ok(Some(updated))
    }

    /// A row the backend no longer has is still dropped from the list.
    /// Returns whether the backend deleted something.
    pub fn delete(&mut self, id: Uuid) -> Result<bool> {
        let Some(owner) = self.owner() else {
            return Ok(false);
        };
        let result = self.client.delete(owner, id);
        let deleted = self.track(result)?;
        self.items.retain(|item| item.id() != id);
        Ok(deleted)
    }

    fn current(&mut self, id: Uuid) -> Result<Option<R>> {
        match self.find(id) {
            Some(item) => Ok(Some(item.clone())),
            None => self.get(id),
        }
    }

    pub fn add_tag(&mut self, id: Uuid, tag: &str) -> Result<Option<R>> {
        let Some(item) = self.current(id)? else {
            return Ok(None);
        };
        let mut tags = item.tags().clone();
        if tag.trim().is_empty() {
            return Err(VaultError::validation("tag", "cannot be empty"));
        }
        if !tags.insert(tag) {
            return Err(VaultError::validation("tag", format!("\"{}\" already exists", tag.trim())));
        }
        self.update(id, R::tags_patch(tags))
    }

    pub fn remove_tag(&mut self, id: Uuid, tag: &str) -> Result<Option<R>> {
        let Some(item) = self.current(id)? else {
            return Ok(None);
        };
        let mut tags = item.tags().clone();
        if !tags.remove(tag) {
            return Err(VaultError::validation("tag", format!("no such tag \"{}\"", tag.trim())));
        }
        self.update(id, R::tags_patch(tags))
    }
}

impl<'c, C> ResourceStore<'c, Note, C>
where
    C: ResourceClient<Note> + ?Sized,
{
    pub fn toggle_favorite(&mut self, id: Uuid) -> Result<Option<Note>> {
        let Some(note) = self.current(id)? else {
            return Ok(None);
        };
        self.update(
            id,
            NotePatch {
                is_favorite: Some(!note.is_favorite),
                ..Default::default()
            },
        )
    }
}
