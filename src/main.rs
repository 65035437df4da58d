use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use vault::auth::{AuthGate, Identity, SessionAuth};
use vault::clipboard::{copy_item, read_text_from_clipboard};
use vault::config::{AppPaths, VaultConfig};
use vault::dashboard::Dashboard;
use vault::errors::{Result, VaultError};
use vault::filter::{FilterType, SortMode, visible};
use vault::form::{Draft, Form, LinkDraft, NoteDraft, SnippetDraft, TagField};
use vault::logging;
use vault::storage::AccountStorage;
use vault::storage::models::{
    CATEGORY_SUGGESTIONS, LANGUAGE_SUGGESTIONS, Link, Note, ProfilePatch, ResourceKind, Snippet,
    Tags, VaultItem, short_id,
};
use vault::storage::sqlite::SqliteBackend;
use vault::store::ResourceStore;
use vault::upload::{ImageUploader, LocalImageStore};

#[derive(Parser)]
#[command(name = "vault", version, about = "A personal vault for links, snippets and notes")]
struct Cli {
    /// Output results as JSON
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in (creates the account on first use)
    Login {
        #[arg(short, long)]
        email: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in account
    Whoami,

    /// List items
    List {
        /// Filter by type: all, link, snippet, note
        #[arg(short = 't', long)]
        r#type: Option<String>,

        /// Sort by: recent, favorites, tags
        #[arg(short, long)]
        sort: Option<String>,

        /// Only items whose title, tags, language or description contain this
        #[arg(short, long)]
        query: Option<String>,

        /// Maximum number of items to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Search titles, tags, languages and descriptions
    Search {
        query: String,

        /// Maximum results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one item in full
    Show {
        /// Item ID or unique prefix
        id: String,
    },

    /// Add a link, snippet or note
    Add {
        #[command(subcommand)]
        kind: AddKind,
    },

    /// Edit an item. Only the given fields change.
    Edit {
        /// Item ID or unique prefix
        id: String,

        #[command(flatten)]
        fields: EditArgs,
    },

    /// Delete an item
    Delete {
        /// Item ID or unique prefix
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Favorite or unfavorite a note
    Fav {
        /// Note ID or unique prefix
        id: String,
    },

    /// Add or remove a tag
    Tag {
        /// Item ID or unique prefix
        id: String,

        /// Tag name
        tag: String,

        /// Remove the tag instead of adding
        #[arg(short, long)]
        remove: bool,
    },

    /// Copy a link's URL or a snippet's or note's content to the clipboard
    Copy {
        /// Item ID or unique prefix
        id: String,
    },

    /// Show or update the profile. An empty value clears a field.
    Profile {
        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        full_name: Option<String>,

        /// Image file to upload as the avatar
        #[arg(long)]
        avatar: Option<PathBuf>,
    },

    /// Show vault statistics
    Stats,

    /// List suggested snippet languages and link categories
    Languages,

    /// Interactive TUI
    Tui,
}

#[derive(Subcommand)]
enum AddKind {
    /// Save a link
    Link {
        #[arg(long)]
        title: String,

        /// URL (read from the clipboard when omitted and --clipboard is set)
        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        note: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// Comma separated tags
        #[arg(long)]
        tags: Option<String>,

        /// Preview image file to upload
        #[arg(long)]
        image: Option<PathBuf>,

        /// Take the URL from the clipboard
        #[arg(long)]
        clipboard: bool,
    },

    /// Save a code snippet
    Snippet {
        #[arg(long)]
        title: String,

        #[arg(short, long)]
        language: Option<String>,

        #[command(flatten)]
        body: BodyArgs,

        /// Comma separated tags
        #[arg(long)]
        tags: Option<String>,
    },

    /// Save a markdown note
    Note {
        #[arg(long)]
        title: String,

        #[command(flatten)]
        body: BodyArgs,

        /// Comma separated tags
        #[arg(long)]
        tags: Option<String>,

        #[arg(long)]
        favorite: bool,
    },
}

#[derive(Args)]
struct BodyArgs {
    /// Content inline
    #[arg(short, long, conflicts_with_all = ["file", "clipboard"])]
    content: Option<String>,

    /// Read content from a file
    #[arg(short, long, conflicts_with = "clipboard")]
    file: Option<PathBuf>,

    /// Take content from the clipboard
    #[arg(long)]
    clipboard: bool,
}

#[derive(Args)]
struct EditArgs {
    #[arg(long)]
    title: Option<String>,

    /// Links only
    #[arg(long)]
    url: Option<String>,

    /// Links only
    #[arg(long)]
    description: Option<String>,

    /// Links only
    #[arg(long)]
    note: Option<String>,

    /// Links only
    #[arg(long)]
    category: Option<String>,

    /// Links only: preview image file to upload
    #[arg(long)]
    image: Option<PathBuf>,

    /// Snippets only
    #[arg(short, long)]
    language: Option<String>,

    /// Replace all tags (comma separated)
    #[arg(long)]
    tags: Option<String>,

    #[command(flatten)]
    body: BodyArgs,
}

#[derive(Serialize)]
struct StatusResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        if json {
            eprintln!("{}", serde_json::json!({"error": e.to_string()}));
        } else {
            eprintln!("error: {}", e);
        }
        process::exit(1);
    }
}

struct Context {
    paths: AppPaths,
    config: VaultConfig,
    backend: SqliteBackend,
    auth: SessionAuth,
}

impl Context {
    fn require_user(&self) -> Result<Identity> {
        self.auth.current_user().cloned().ok_or(VaultError::AuthRequired)
    }

    /// A loaded dashboard for the signed-in user.
    fn dashboard(&self) -> Result<Dashboard<'_, SqliteBackend>> {
        let mut dashboard = Dashboard::new(&self.backend, Some(self.require_user()?));
        dashboard.load_all()?;
        Ok(dashboard)
    }

    fn uploader(&self) -> LocalImageStore {
        LocalImageStore::new(self.paths.uploads_dir.clone(), self.config.max_upload_bytes)
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = AppPaths::resolve()?;
    paths.ensure_dirs()?;
    let config = VaultConfig::load(&paths.config_file)?;

    if let Some(Commands::Tui) = cli.command {
        return vault::tui::run(&paths, &config);
    }
    logging::init(&config.log_level);

    let backend = SqliteBackend::open(&paths.db_path)?;
    let mut auth = SessionAuth::open(&paths.session_file)?;
    auth.refresh(&backend)?;
    let mut ctx = Context {
        paths,
        config,
        backend,
        auth,
    };
    let json = cli.json;

    match cli.command {
        None => {
            let limit = ctx.config.list_limit;
            cmd_list(&ctx, ctx.config.default_filter, ctx.config.default_sort, "", limit, json)
        }
        Some(Commands::Login { email }) => cmd_login(&mut ctx, &email, json),
        Some(Commands::Logout) => cmd_logout(&mut ctx, json),
        Some(Commands::Whoami) => cmd_whoami(&ctx, json),
        Some(Commands::List {
            r#type,
            sort,
            query,
            limit,
        }) => {
            let filter = match r#type.as_deref() {
                Some(t) => FilterType::parse(t)
                    .ok_or_else(|| VaultError::InvalidInput(format!("unknown type '{t}'")))?,
                None => ctx.config.default_filter,
            };
            let sort = match sort.as_deref() {
                Some(s) => SortMode::parse(s)
                    .ok_or_else(|| VaultError::InvalidInput(format!("unknown sort '{s}'")))?,
                None => ctx.config.default_sort,
            };
            let limit = limit.unwrap_or(ctx.config.list_limit);
            cmd_list(&ctx, filter, sort, query.as_deref().unwrap_or(""), limit, json)
        }
        Some(Commands::Search { query, limit }) => cmd_search(&ctx, &query, limit, json),
        Some(Commands::Show { id }) => cmd_show(&ctx, &id, json),
        Some(Commands::Add { kind }) => cmd_add(&ctx, kind, json),
        Some(Commands::Edit { id, fields }) => cmd_edit(&ctx, &id, fields, json),
        Some(Commands::Delete { id, yes }) => cmd_delete(&ctx, &id, yes, json),
        Some(Commands::Fav { id }) => cmd_fav(&ctx, &id, json),
        Some(Commands::Tag { id, tag, remove }) => cmd_tag(&ctx, &id, &tag, remove, json),
        Some(Commands::Copy { id }) => cmd_copy(&ctx, &id, json),
        Some(Commands::Profile {
            username,
            full_name,
            avatar,
        }) => cmd_profile(&ctx, username, full_name, avatar.as_deref(), json),
        Some(Commands::Stats) => cmd_stats(&ctx, json),
        Some(Commands::Languages) => cmd_languages(json),
        Some(Commands::Tui) => Ok(()),
    }
}

fn report(json: bool, success: bool, message: String, id: Option<String>) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string(&StatusResponse {
                success,
                message,
                id,
            })?
        );
    } else {
        println!("{}", message);
    }
    Ok(())
}

fn cmd_login(ctx: &mut Context, email: &str, json: bool) -> Result<()> {
    let identity = ctx.auth.sign_in(&ctx.backend, email)?;
    report(json, true, format!("Signed in as {}.", identity.email), Some(identity.id.to_string()))
}

fn cmd_logout(ctx: &mut Context, json: bool) -> Result<()> {
    let had_session = ctx.auth.sign_out()?;
    let message = if had_session {
        "Signed out."
    } else {
        "Not signed in."
    };
    report(json, had_session, message.into(), None)
}

fn cmd_whoami(ctx: &Context, json: bool) -> Result<()> {
    let Some(identity) = ctx.auth.current_user() else {
        if json {
            println!("{}", serde_json::json!({"signed_in": false}));
        } else {
            println!("Not signed in.");
        }
        return Ok(());
    };
    let profile = ctx.backend.get_profile(identity.id)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "signed_in": true,
                "user": identity,
                "profile": profile,
            })
        );
        return Ok(());
    }

    println!("Email:     {}", identity.email);
    println!("ID:        {}", identity.id);
    if let Some(ref username) = profile.username {
        println!("Username:  {}", username);
    }
    if let Some(ref full_name) = profile.full_name {
        println!("Name:      {}", full_name);
    }
    if let Some(ref avatar) = profile.avatar_url {
        println!("Avatar:    {}", avatar);
    }
    Ok(())
}

fn print_items(items: &[&VaultItem], empty: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("{}", empty);
        return Ok(());
    }

    for item in items {
        print_item_row(item);
    }
    Ok(())
}

fn cmd_list(
    ctx: &Context,
    filter: FilterType,
    sort: SortMode,
    query: &str,
    limit: usize,
    json: bool,
) -> Result<()> {
    let dashboard = ctx.dashboard()?;
    let items = dashboard.items();
    let mut shown = visible(&items, query, filter, sort);
    shown.truncate(limit);
    print_items(&shown, "No items found.", json)
}

fn cmd_search(ctx: &Context, query: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let dashboard = ctx.dashboard()?;
    let items = dashboard.items();
    let mut shown = visible(&items, query, FilterType::All, SortMode::Recent);
    shown.truncate(limit.unwrap_or(ctx.config.list_limit));
    print_items(&shown, &format!("No results for \"{}\".", query), json)
}

fn cmd_show(ctx: &Context, id: &str, json: bool) -> Result<()> {
    let item = ctx.dashboard()?.find(id)?;

    if json {
        println!("{}", serde_json::to_string(&item)?);
        return Ok(());
    }

    print_item_detail(&item);
    Ok(())
}

/// Inline content, a file, or the clipboard, in that order.
fn read_body(body: &BodyArgs) -> Result<Option<String>> {
    if let Some(ref content) = body.content {
        return Ok(Some(content.clone()));
    }
    if let Some(ref path) = body.file {
        return Ok(Some(fs::read_to_string(path)?));
    }
    if body.clipboard {
        return read_text_from_clipboard()?
            .map(Some)
            .ok_or_else(|| VaultError::InvalidInput("clipboard has no text".into()));
    }
    Ok(None)
}

fn attach_file(form: &mut Form<LinkDraft>, uploader: &dyn ImageUploader, path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    form.attach_image(uploader, &bytes, &name)
}

fn submit<D: Draft>(
    form: &mut Form<D>,
    store: &mut ResourceStore<'_, D::Target, SqliteBackend>,
) -> Result<D::Target>
where
    SqliteBackend: vault::storage::ResourceClient<D::Target>,
{
    form.submit(store)?.ok_or(VaultError::AuthRequired)
}

fn cmd_add(ctx: &Context, kind: AddKind, json: bool) -> Result<()> {
    let identity = Some(ctx.require_user()?);

    let item = match kind {
        AddKind::Link {
            title,
            url,
            description,
            note,
            category,
            tags,
            image,
            clipboard,
        } => {
            let url = match url {
                Some(url) => url,
                None if clipboard => read_text_from_clipboard()?.unwrap_or_default(),
                None => String::new(),
            };
            let mut form = Form::with_draft(LinkDraft {
                title,
                url,
                description: description.unwrap_or_default(),
                note: note.unwrap_or_default(),
                category: category.unwrap_or_default(),
                tags: tags.unwrap_or_default(),
                ..Default::default()
            });
            form.draft().validate()?;
            if let Some(ref path) = image {
                attach_file(&mut form, &ctx.uploader(), path)?;
            }
            let mut store: ResourceStore<Link, _> = ResourceStore::new(&ctx.backend, identity);
            VaultItem::Link(submit(&mut form, &mut store)?)
        }
        AddKind::Snippet {
            title,
            language,
            body,
            tags,
        } => {
            let mut draft = SnippetDraft {
                title,
                content: read_body(&body)?.unwrap_or_default(),
                tags: TagField::with_tags(Tags::parse_list(tags.as_deref().unwrap_or(""))),
                ..Default::default()
            };
            if let Some(language) = language {
                draft.language = language;
            }
            let mut form = Form::with_draft(draft);
            let mut store: ResourceStore<Snippet, _> = ResourceStore::new(&ctx.backend, identity);
            VaultItem::Snippet(submit(&mut form, &mut store)?)
        }
        AddKind::Note {
            title,
            body,
            tags,
            favorite,
        } => {
            let mut form = Form::with_draft(NoteDraft {
                title,
                content: read_body(&body)?.unwrap_or_default(),
                is_favorite: favorite,
                tags: TagField::with_tags(Tags::parse_list(tags.as_deref().unwrap_or(""))),
            });
            let mut store: ResourceStore<Note, _> = ResourceStore::new(&ctx.backend, identity);
            VaultItem::Note(submit(&mut form, &mut store)?)
        }
    };

    if json {
        println!("{}", serde_json::to_string(&item)?);
        return Ok(());
    }
    println!("Added {} {} \"{}\".", item.kind(), item.short_id(), item.title());
    Ok(())
}

fn reject_flags(kind: ResourceKind, flags: &[(&str, bool)]) -> Result<()> {
    match flags.iter().find(|(_, given)| *given) {
        Some((flag, _)) => Err(VaultError::InvalidInput(format!("--{flag} does not apply to {kind}s"))),
        None => Ok(()),
    }
}

fn cmd_edit(ctx: &Context, id: &str, fields: EditArgs, json: bool) -> Result<()> {
    let mut dashboard = ctx.dashboard()?;
    let target = dashboard.find(id)?;
    let body = read_body(&fields.body)?;
    let not_found = || VaultError::NotFound(format!("{} {}", target.kind(), target.short_id()));

    let item = match target.kind() {
        ResourceKind::Link => {
            reject_flags(
                ResourceKind::Link,
                &[("language", fields.language.is_some()), ("content", body.is_some())],
            )?;
            let mut form =
                Form::<LinkDraft>::edit(&mut dashboard.links, target.id())?.ok_or_else(not_found)?;
            let draft = form.draft_mut();
            if let Some(title) = fields.title {
                draft.title = title;
            }
            if let Some(url) = fields.url {
                draft.url = url;
            }
            if let Some(description) = fields.description {
                draft.description = description;
            }
            if let Some(note) = fields.note {
                draft.note = note;
            }
            if let Some(category) = fields.category {
                draft.category = category;
            }
            if let Some(tags) = fields.tags {
                draft.tags = tags;
            }
            if let Some(ref path) = fields.image {
                attach_file(&mut form, &ctx.uploader(), path)?;
            }
            VaultItem::Link(submit(&mut form, &mut dashboard.links)?)
        }
        ResourceKind::Snippet => {
            reject_flags(
                ResourceKind::Snippet,
                &[
                    ("url", fields.url.is_some()),
                    ("description", fields.description.is_some()),
                    ("note", fields.note.is_some()),
                    ("category", fields.category.is_some()),
                    ("image", fields.image.is_some()),
                ],
            )?;
            let mut form =
                Form::<SnippetDraft>::edit(&mut dashboard.snippets, target.id())?.ok_or_else(not_found)?;
            let draft = form.draft_mut();
            if let Some(title) = fields.title {
                draft.title = title;
            }
            if let Some(language) = fields.language {
                draft.language = language;
            }
            if let Some(content) = body {
                draft.content = content;
            }
            if let Some(tags) = fields.tags {
                draft.tags = TagField::with_tags(Tags::parse_list(&tags));
            }
            VaultItem::Snippet(submit(&mut form, &mut dashboard.snippets)?)
        }
        ResourceKind::Note => {
            reject_flags(
                ResourceKind::Note,
                &[
                    ("url", fields.url.is_some()),
                    ("description", fields.description.is_some()),
                    ("note", fields.note.is_some()),
                    ("category", fields.category.is_some()),
                    ("image", fields.image.is_some()),
                    ("language", fields.language.is_some()),
                ],
            )?;
            let mut form =
                Form::<NoteDraft>::edit(&mut dashboard.notes, target.id())?.ok_or_else(not_found)?;
            let draft = form.draft_mut();
            if let Some(title) = fields.title {
                draft.title = title;
            }
            if let Some(content) = body {
                draft.content = content;
            }
            if let Some(tags) = fields.tags {
                draft.tags = TagField::with_tags(Tags::parse_list(&tags));
            }
            VaultItem::Note(submit(&mut form, &mut dashboard.notes)?)
        }
    };

    if json {
        println!("{}", serde_json::to_string(&item)?);
        return Ok(());
    }
    println!("Updated {} {} \"{}\".", item.kind(), item.short_id(), item.title());
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn cmd_delete(ctx: &Context, id: &str, yes: bool, json: bool) -> Result<()> {
    let mut dashboard = ctx.dashboard()?;
    let item = dashboard.find(id)?;

    if !yes {
        if json {
            return Err(VaultError::InvalidInput("pass --yes to delete with --json".into()));
        }
        if !confirm(&format!("Delete {} \"{}\"?", item.kind(), item.title()))? {
            println!("Kept {} {}.", item.kind(), item.short_id());
            return Ok(());
        }
    }

    let found = dashboard.delete(item.kind(), item.id())?;
    let message = if found {
        format!("Deleted {} {}.", item.kind(), item.short_id())
    } else {
        format!("{} {} was already gone.", item.kind(), item.short_id())
    };
    report(json, true, message, Some(item.id().to_string()))
}

fn cmd_fav(ctx: &Context, id: &str, json: bool) -> Result<()> {
    let mut dashboard = ctx.dashboard()?;
    let item = dashboard.find(id)?;
    let updated = dashboard
        .toggle_favorite(item.kind(), item.id())?
        .ok_or(VaultError::AuthRequired)?;
    let message = if updated.is_favorite() {
        format!("Favorited note {}.", updated.short_id())
    } else {
        format!("Unfavorited note {}.", updated.short_id())
    };
    report(json, true, message, Some(updated.id().to_string()))
}

fn cmd_tag(ctx: &Context, id: &str, tag: &str, remove: bool, json: bool) -> Result<()> {
    let mut dashboard = ctx.dashboard()?;
    let item = dashboard.find(id)?;
    let tag = tag.trim();
    let message = if remove {
        dashboard.remove_tag(item.kind(), item.id(), tag)?;
        format!("Removed tag \"{}\" from {} {}.", tag, item.kind(), item.short_id())
    } else {
        dashboard.add_tag(item.kind(), item.id(), tag)?;
        format!("Added tag \"{}\" to {} {}.", tag, item.kind(), item.short_id())
    };
    report(json, true, message, Some(item.id().to_string()))
}

fn cmd_copy(ctx: &Context, id: &str, json: bool) -> Result<()> {
    let item = ctx.dashboard()?.find(id)?;
    copy_item(&item)?;
    let what = match item.kind() {
        ResourceKind::Link => "URL",
        ResourceKind::Snippet => "code",
        ResourceKind::Note => "content",
    };
    report(
        json,
        true,
        format!("Copied {} of {} {} to clipboard.", what, item.kind(), item.short_id()),
        Some(item.id().to_string()),
    )
}

/// Empty input clears the field.
fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| {
        let v = v.trim().to_string();
        (!v.is_empty()).then_some(v)
    })
}

fn cmd_profile(
    ctx: &Context,
    username: Option<String>,
    full_name: Option<String>,
    avatar: Option<&Path>,
    json: bool,
) -> Result<()> {
    let identity = ctx.require_user()?;
    let avatar_url = match avatar {
        Some(path) => Some(Some(ctx.uploader().upload_file(path)?)),
        None => None,
    };
    let patch = ProfilePatch {
        username: clearable(username),
        full_name: clearable(full_name),
        avatar_url,
    };

    let profile = if patch == ProfilePatch::default() {
        ctx.backend.get_profile(identity.id)?
    } else {
        ctx.backend.update_profile(identity.id, patch)?
    };

    if json {
        println!("{}", serde_json::to_string(&profile)?);
        return Ok(());
    }

    println!("Email:     {}", identity.email);
    println!("Username:  {}", profile.username.as_deref().unwrap_or("-"));
    println!("Name:      {}", profile.full_name.as_deref().unwrap_or("-"));
    println!("Avatar:    {}", profile.avatar_url.as_deref().unwrap_or("-"));
    println!("Updated:   {}", profile.updated_at.format("%Y-%m-%d %H:%M"));
    Ok(())
}

fn cmd_stats(ctx: &Context, json: bool) -> Result<()> {
    let dashboard = Dashboard::new(&ctx.backend, Some(ctx.require_user()?));
    let stats = dashboard.stats()?.ok_or(VaultError::AuthRequired)?;

    if json {
        println!("{}", serde_json::to_string(&stats)?);
        return Ok(());
    }

    println!("Vault Statistics");
    println!("────────────────");
    println!("Total items:  {}", stats.total_items);
    println!("  Links:      {}", stats.links);
    println!("  Snippets:   {}", stats.snippets);
    println!("  Notes:      {}", stats.notes);
    println!("Last 7 days:  {}", stats.last_week_activity);
    println!("Favorites:    {}", stats.favorite_items);
    Ok(())
}

fn cmd_languages(json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "languages": LANGUAGE_SUGGESTIONS,
                "categories": CATEGORY_SUGGESTIONS,
            })
        );
        return Ok(());
    }

    println!("Languages:  {}", LANGUAGE_SUGGESTIONS.join(", "));
    println!("Categories: {}", CATEGORY_SUGGESTIONS.join(", "));
    Ok(())
}

fn one_line(text: &str, max: usize) -> String {
    let oneline = text.replace('\n', " ");
    if oneline.chars().count() > max {
        let cut: String = oneline.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        oneline
    }
}

fn print_item_row(item: &VaultItem) {
    let type_icon = match item.kind() {
        ResourceKind::Link => "L",
        ResourceKind::Snippet => "S",
        ResourceKind::Note => "N",
    };

    let fav = if item.is_favorite() { "*" } else { " " };

    let detail = match item {
        VaultItem::Link(link) => one_line(&link.url, 40),
        VaultItem::Snippet(snippet) => snippet.language.clone(),
        VaultItem::Note(note) => one_line(&note.content, 40),
    };

    let age = format_age(item.created_at());
    let tags = if item.tags().is_empty() {
        String::new()
    } else {
        format!(" [{}]", item.tags().join(", "))
    };

    println!(
        "{} {}{} {:>4}  {}  ({}){}",
        short_id(item.id()),
        type_icon,
        fav,
        age,
        one_line(item.title(), 50),
        detail,
        tags
    );
}

fn print_item_detail(item: &VaultItem) {
    println!("ID:       {}", item.id());
    println!("Type:     {}", item.kind());
    println!("Title:    {}", item.title());
    println!("Created:  {}", item.created_at().format("%Y-%m-%d %H:%M:%S"));
    println!("Updated:  {}", item.updated_at().format("%Y-%m-%d %H:%M:%S"));
    if !item.tags().is_empty() {
        println!("Tags:     {}", item.tags().join(", "));
    }

    match item {
        VaultItem::Link(link) => {
            println!("URL:      {}", link.url);
            if let Some(ref category) = link.category {
                println!("Category: {}", category);
            }
            if let Some(ref image) = link.image_url {
                println!("Image:    {}", image);
            }
            if let Some(ref description) = link.description {
                println!("─────────────────────────");
                println!("{}", description);
            }
            if let Some(ref note) = link.note {
                println!("─────────────────────────");
                println!("{}", note);
            }
        }
        VaultItem::Snippet(snippet) => {
            println!("Language: {}", snippet.language);
            println!("─────────────────────────");
            println!("{}", snippet.content);
        }
        VaultItem::Note(note) => {
            println!("Favorite: {}", note.is_favorite);
            println!("─────────────────────────");
            println!("{}", note.content);
        }
    }
}

fn format_age(dt: chrono::DateTime<Utc>) -> String {
    let dur = Utc::now() - dt;
    if dur.num_seconds() < 60 {
        "now".to_string()
    } else if dur.num_minutes() < 60 {
        format!("{}m", dur.num_minutes())
    } else if dur.num_hours() < 24 {
        format!("{}h", dur.num_hours())
    } else {
        format!("{}d", dur.num_days())
    }
}
