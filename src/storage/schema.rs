pub const CREATE_USERS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id BLOB PRIMARY KEY,
        email TEXT NOT NULL UNIQUE COLLATE NOCASE,
        created_at TEXT NOT NULL
    )
";

pub const CREATE_PROFILES_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS profiles (
        id BLOB PRIMARY KEY,
        username TEXT,
        full_name TEXT,
        avatar_url TEXT,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (id) REFERENCES users(id) ON DELETE CASCADE
    )
";

pub const CREATE_LINKS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS links (
        id BLOB PRIMARY KEY,
        owner_id BLOB NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        title TEXT NOT NULL CHECK (length(trim(title)) > 0),
        url TEXT NOT NULL CHECK (length(trim(url)) > 0),
        description TEXT,
        note TEXT,
        category TEXT,
        image_url TEXT,
        FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE
    )
";

pub const CREATE_SNIPPETS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS snippets (
        id BLOB PRIMARY KEY,
        owner_id BLOB NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        title TEXT NOT NULL CHECK (length(trim(title)) > 0),
        content TEXT NOT NULL CHECK (length(trim(content)) > 0),
        language TEXT NOT NULL DEFAULT '',
        FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE
    )
";

pub const CREATE_NOTES_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS notes (
        id BLOB PRIMARY KEY,
        owner_id BLOB NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        title TEXT NOT NULL CHECK (length(trim(title)) > 0),
        content TEXT NOT NULL DEFAULT '',
        is_favorite INTEGER NOT NULL DEFAULT 0,
        FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE
    )
";

/// Every collection gets a `<table>_tags` companion with the same shape.
pub fn create_tags_table(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table}_tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_id BLOB NOT NULL,
            tag TEXT NOT NULL,
            FOREIGN KEY (item_id) REFERENCES {table}(id) ON DELETE CASCADE,
            UNIQUE(item_id, tag)
        )"
    )
}

pub fn create_indexes(table: &str) -> [String; 3] {
    [
        format!("CREATE INDEX IF NOT EXISTS idx_{table}_owner ON {table}(owner_id)"),
        format!("CREATE INDEX IF NOT EXISTS idx_{table}_created_at ON {table}(created_at)"),
        format!("CREATE INDEX IF NOT EXISTS idx_{table}_tags_item ON {table}_tags(item_id)"),
    ]
}
