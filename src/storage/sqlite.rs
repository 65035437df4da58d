use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;
use uuid::Uuid;

use super::models::{
    Link, LinkPatch, NewLink, NewNote, NewSnippet, Note, NotePatch, Profile, ProfilePatch,
    Resource, Snippet, SnippetPatch, Tags, VaultStats,
};
use super::schema;
use super::{AccountStorage, ResourceClient};
use crate::auth::{Identity, normalize_email};
use crate::errors::{Result, VaultError};

/// Separator for `GROUP_CONCAT` over tags; cannot appear in typed input.
const TAG_SEP: char = '\u{1f}';

/// Index of the first resource-specific column in a collection row.
const DATA_COL: usize = 4;

pub type BoxedParams = Vec<Box<dyn ToSql>>;

pub struct SqliteBackend {
    conn: Connection,
}

/// How a resource maps onto its table. Rows are read as
/// `id, owner_id, created_at, updated_at, COLUMNS.., tags`.
pub trait Table: Resource + Sized {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &Row, tags: Tags) -> rusqlite::Result<Self>;
    fn insert_values(new: &Self::New) -> BoxedParams;
    fn new_tags(new: &Self::New) -> &Tags;
    fn patch_assignments(patch: &Self::Patch) -> Vec<(&'static str, Box<dyn ToSql>)>;
    fn patch_tags(patch: &Self::Patch) -> Option<&Tags>;
}

fn select_sql<T: Table>() -> String {
    let cols = T::COLUMNS
        .iter()
        .map(|c| format!("t.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT t.id, t.owner_id, t.created_at, t.updated_at, {cols},
                (SELECT GROUP_CONCAT(g.tag, char(31)) FROM {table}_tags g WHERE g.item_id = t.id)
         FROM {table} t",
        table = T::TABLE
    )
}

fn read_row<T: Table>(row: &Row) -> rusqlite::Result<T> {
    let tags_str: Option<String> = row.get(DATA_COL + T::COLUMNS.len())?;
    let tags = match tags_str {
        Some(s) if !s.is_empty() => s.split(TAG_SEP).collect(),
        _ => Tags::new(),
    };
    T::from_row(row, tags)
}

fn replace_tags(conn: &Connection, table: &str, item_id: Uuid, tags: &Tags) -> Result<()> {
    conn.execute(
        &format!("DELETE FROM {table}_tags WHERE item_id = ?"),
        params![item_id],
    )?;
    let mut stmt = conn.prepare(&format!(
        "INSERT OR IGNORE INTO {table}_tags (item_id, tag) VALUES (?, ?)"
    ))?;
    for tag in tags.iter() {
        stmt.execute(params![item_id, tag.replace(TAG_SEP, "")])?;
    }
    Ok(())
}

fn not_found<T: Table>(id: Uuid) -> VaultError {
    VaultError::NotFound(format!("{} with id {} not found", T::KIND, id))
}

impl SqliteBackend {
    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute(schema::CREATE_USERS_TABLE, [])?;
        conn.execute(schema::CREATE_PROFILES_TABLE, [])?;
        conn.execute(schema::CREATE_LINKS_TABLE, [])?;
        conn.execute(schema::CREATE_SNIPPETS_TABLE, [])?;
        conn.execute(schema::CREATE_NOTES_TABLE, [])?;
        for table in [Link::TABLE, Snippet::TABLE, Note::TABLE] {
            conn.execute(&schema::create_tags_table(table), [])?;
            for index in schema::create_indexes(table) {
                conn.execute(&index, [])?;
            }
        }
        Ok(Self { conn })
    }

    /// Opens (or creates) the database file, creating its directory first.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened database");
        Self::new(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::new(conn)
    }

    #[cfg(test)]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn list_rows<T: Table>(&self, owner: Uuid) -> Result<Vec<T>> {
        let sql = format!(
            "{} WHERE t.owner_id = ? ORDER BY t.created_at DESC, t.rowid DESC",
            select_sql::<T>()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![owner], read_row::<T>)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(table = T::TABLE, count = rows.len(), "listed rows");
        Ok(rows)
    }

    fn get_row<T: Table>(&self, owner: Uuid, id: Uuid) -> Result<T> {
        let sql = format!("{} WHERE t.id = ? AND t.owner_id = ?", select_sql::<T>());
        self.conn
            .query_row(&sql, params![id, owner], read_row::<T>)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => not_found::<T>(id),
                other => VaultError::Backend(other),
            })
    }

    fn insert_row<T: Table>(&self, owner: Uuid, new: T::New) -> Result<T> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO {} (id, owner_id, created_at, updated_at, {}) VALUES ({})",
            T::TABLE,
            T::COLUMNS.join(", "),
            vec!["?"; DATA_COL + T::COLUMNS.len()].join(", ")
        );

        let mut values: BoxedParams = vec![Box::new(id), Box::new(owner), Box::new(now), Box::new(now)];
        values.extend(T::insert_values(&new));
        let param_refs: Vec<&dyn ToSql> = values.iter().map(|p| p.as_ref()).collect();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(&sql, param_refs.as_slice())?;
        replace_tags(&tx, T::TABLE, id, T::new_tags(&new))?;
        tx.commit()?;

        debug!(table = T::TABLE, %id, "inserted row");
        self.get_row(owner, id)
    }

    fn update_row<T: Table>(&self, owner: Uuid, id: Uuid, patch: T::Patch) -> Result<T> {
        let mut sets = vec!["updated_at = ?".to_string()];
        let mut values: BoxedParams = vec![Box::new(Utc::now())];
        for (column, value) in T::patch_assignments(&patch) {
            sets.push(format!("{column} = ?"));
            values.push(value);
        }
        values.push(Box::new(id));
        values.push(Box::new(owner));

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ? AND owner_id = ?",
            T::TABLE,
            sets.join(", ")
        );
        let param_refs: Vec<&dyn ToSql> = values.iter().map(|p| p.as_ref()).collect();

        let tx = self.conn.unchecked_transaction()?;
        let changes = tx.execute(&sql, param_refs.as_slice())?;
        if changes == 0 {
            return Err(not_found::<T>(id));
        }
        if let Some(tags) = T::patch_tags(&patch) {
            replace_tags(&tx, T::TABLE, id, tags)?;
        }
        tx.commit()?;

        debug!(table = T::TABLE, %id, "updated row");
        self.get_row(owner, id)
    }

    fn delete_row<T: Table>(&self, owner: Uuid, id: Uuid) -> Result<bool> {
        let changes = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ? AND owner_id = ?", T::TABLE),
            params![id, owner],
        )?;
        debug!(table = T::TABLE, %id, deleted = changes > 0, "deleted row");
        Ok(changes > 0)
    }

    fn count_rows<T: Table>(&self, owner: Uuid) -> Result<i64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE owner_id = ?", T::TABLE),
            params![owner],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn count_since<T: Table>(&self, owner: Uuid, since: DateTime<Utc>) -> Result<i64> {
        let count = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE owner_id = ? AND created_at >= ?",
                T::TABLE
            ),
            params![owner, since],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl<T: Table> ResourceClient<T> for SqliteBackend {
    fn list_by_owner(&self, owner: Uuid) -> Result<Vec<T>> {
        self.list_rows(owner)
    }

    fn get_by_id(&self, owner: Uuid, id: Uuid) -> Result<T> {
        self.get_row(owner, id)
    }

    fn create(&self, owner: Uuid, new: T::New) -> Result<T> {
        self.insert_row(owner, new)
    }

    fn update(&self, owner: Uuid, id: Uuid, patch: T::Patch) -> Result<T> {
        self.update_row(owner, id, patch)
    }

    fn delete(&self, owner: Uuid, id: Uuid) -> Result<bool> {
        self.delete_row::<T>(owner, id)
    }

    fn count_by_owner(&self, owner: Uuid) -> Result<i64> {
        self.count_rows::<T>(owner)
    }
}

impl AccountStorage for SqliteBackend {
    fn find_or_create_user(&self, email: &str) -> Result<Identity> {
        let email = normalize_email(email)?;
        let existing: Option<Uuid> = self
            .conn
            .query_row(
                "SELECT id FROM users WHERE email = ?",
                params![email],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(Identity { id, email });
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO users (id, email, created_at) VALUES (?, ?, ?)",
            params![id, email, now],
        )?;
        tx.execute(
            "INSERT INTO profiles (id, updated_at) VALUES (?, ?)",
            params![id, now],
        )?;
        tx.commit()?;
        debug!(%id, "created user");
        Ok(Identity { id, email })
    }

    fn get_profile(&self, owner: Uuid) -> Result<Profile> {
        self.conn
            .query_row(
                "SELECT id, username, full_name, avatar_url, updated_at FROM profiles WHERE id = ?",
                params![owner],
                |row| {
                    Ok(Profile {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        full_name: row.get(2)?,
                        avatar_url: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                },
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    VaultError::NotFound(format!("profile {} not found", owner))
                }
                other => VaultError::Backend(other),
            })
    }

    fn update_profile(&self, owner: Uuid, patch: ProfilePatch) -> Result<Profile> {
        let mut sets = vec!["updated_at = ?".to_string()];
        let mut values: BoxedParams = vec![Box::new(Utc::now())];
        let fields = [
            ("username", patch.username),
            ("full_name", patch.full_name),
            ("avatar_url", patch.avatar_url),
        ];
        for (column, value) in fields {
            if let Some(value) = value {
                sets.push(format!("{column} = ?"));
                values.push(Box::new(value));
            }
        }
        values.push(Box::new(owner));

        let sql = format!("UPDATE profiles SET {} WHERE id = ?", sets.join(", "));
        let param_refs: Vec<&dyn ToSql> = values.iter().map(|p| p.as_ref()).collect();
        let changes = self.conn.execute(&sql, param_refs.as_slice())?;
        if changes == 0 {
            return Err(VaultError::NotFound(format!("profile {} not found", owner)));
        }
        self.get_profile(owner)
    }

    fn stats(&self, owner: Uuid, since: DateTime<Utc>) -> Result<VaultStats> {
        let links = self.count_rows::<Link>(owner)?;
        let snippets = self.count_rows::<Snippet>(owner)?;
        let notes = self.count_rows::<Note>(owner)?;
        let last_week_activity = self.count_since::<Link>(owner, since)?
            + self.count_since::<Snippet>(owner, since)?
            + self.count_since::<Note>(owner, since)?;
        let favorite_items = self.conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE owner_id = ? AND is_favorite = 1",
            params![owner],
            |row| row.get(0),
        )?;
        Ok(VaultStats {
            links,
            snippets,
            notes,
            total_items: links + snippets + notes,
            last_week_activity,
            favorite_items,
        })
    }
}

// ── Collection mappings ────────────────────────────────────────────

impl Table for Link {
    const TABLE: &'static str = "links";
    const COLUMNS: &'static [&'static str] =
        &["title", "url", "description", "note", "category", "image_url"];

    fn from_row(row: &Row, tags: Tags) -> rusqlite::Result<Self> {
        Ok(Link {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
            title: row.get(DATA_COL)?,
            url: row.get(DATA_COL + 1)?,
            description: row.get(DATA_COL + 2)?,
            note: row.get(DATA_COL + 3)?,
            category: row.get(DATA_COL + 4)?,
            image_url: row.get(DATA_COL + 5)?,
            tags,
        })
    }

    fn insert_values(new: &NewLink) -> BoxedParams {
        vec![
            Box::new(new.title.clone()),
            Box::new(new.url.clone()),
            Box::new(new.description.clone()),
            Box::new(new.note.clone()),
            Box::new(new.category.clone()),
            Box::new(new.image_url.clone()),
        ]
    }

    fn new_tags(new: &NewLink) -> &Tags {
        &new.tags
    }

    fn patch_assignments(patch: &LinkPatch) -> Vec<(&'static str, Box<dyn ToSql>)> {
        let mut out: Vec<(&'static str, Box<dyn ToSql>)> = Vec::new();
        if let Some(ref title) = patch.title {
            out.push(("title", Box::new(title.clone())));
        }
        if let Some(ref url) = patch.url {
            out.push(("url", Box::new(url.clone())));
        }
        if let Some(ref description) = patch.description {
            out.push(("description", Box::new(description.clone())));
        }
        if let Some(ref note) = patch.note {
            out.push(("note", Box::new(note.clone())));
        }
        if let Some(ref category) = patch.category {
            out.push(("category", Box::new(category.clone())));
        }
        if let Some(ref image_url) = patch.image_url {
            out.push(("image_url", Box::new(image_url.clone())));
        }
        out
    }

    fn patch_tags(patch: &LinkPatch) -> Option<&Tags> {
        patch.tags.as_ref()
    }
}

impl Table for Snippet {
    const TABLE: &'static str = "snippets";
    const COLUMNS: &'static [&'static str] = &["title", "content", "language"];

    fn from_row(row: &Row, tags: Tags) -> rusqlite::Result<Self> {
        Ok(Snippet {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
            title: row.get(DATA_COL)?,
            content: row.get(DATA_COL + 1)?,
            language: row.get(DATA_COL + 2)?,
            tags,
        })
    }

    fn insert_values(new: &NewSnippet) -> BoxedParams {
        vec![
            Box::new(new.title.clone()),
            Box::new(new.content.clone()),
            Box::new(new.language.clone()),
        ]
    }

    fn new_tags(new: &NewSnippet) -> &Tags {
        &new.tags
    }

    fn patch_assignments(patch: &SnippetPatch) -> Vec<(&'static str, Box<dyn ToSql>)> {
        let mut out: Vec<(&'static str, Box<dyn ToSql>)> = Vec::new();
        if let Some(ref title) = patch.title {
            out.push(("title", Box::new(title.clone())));
        }
        if let Some(ref content) = patch.content {
            out.push(("content", Box::new(content.clone())));
        }
        if let Some(ref language) = patch.language {
            out.push(("language", Box::new(language.clone())));
        }
        out
    }

    fn patch_tags(patch: &SnippetPatch) -> Option<&Tags> {
        patch.tags.as_ref()
    }
}

impl Table for Note {
    const TABLE: &'static str = "notes";
    const COLUMNS: &'static [&'static str] = &["title", "content", "is_favorite"];

    fn from_row(row: &Row, tags: Tags) -> rusqlite::Result<Self> {
        Ok(Note {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
            title: row.get(DATA_COL)?,
            content: row.get(DATA_COL + 1)?,
            is_favorite: row.get(DATA_COL + 2)?,
            tags,
        })
    }

    fn insert_values(new: &NewNote) -> BoxedParams {
        vec![
            Box::new(new.title.clone()),
            Box::new(new.content.clone()),
            Box::new(new.is_favorite),
        ]
    }

    fn new_tags(new: &NewNote) -> &Tags {
        &new.tags
    }

    fn patch_assignments(patch: &NotePatch) -> Vec<(&'static str, Box<dyn ToSql>)> {
        let mut out: Vec<(&'static str, Box<dyn ToSql>)> = Vec::new();
        if let Some(ref title) = patch.title {
            out.push(("title", Box::new(title.clone())));
        }
        if let Some(ref content) = patch.content {
            out.push(("content", Box::new(content.clone())));
        }
        if let Some(is_favorite) = patch.is_favorite {
            out.push(("is_favorite", Box::new(is_favorite)));
        }
        out
    }

    fn patch_tags(patch: &NotePatch) -> Option<&Tags> {
        patch.tags.as_ref()
    }
}
