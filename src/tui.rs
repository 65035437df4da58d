use std::time::{Duration, Instant};

use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::SessionAuth;
use crate::clipboard::copy_item;
use crate::config::{AppPaths, VaultConfig};
use crate::dashboard::{Dashboard, VaultBackend};
use crate::errors::{Result, VaultError};
use crate::filter::{FilterType, SortMode, visible};
use crate::form::{Draft, Field, FieldKind, Form, Leave, LinkDraft, NoteDraft, SnippetDraft};
use crate::logging;
use crate::storage::models::{Resource, ResourceKind, VaultItem};
use crate::storage::sqlite::SqliteBackend;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Normal,
    Search,
    Tag,
    RemoveTag,
    ConfirmDelete(ResourceKind, Uuid),
    /// After `n`, waiting for the kind.
    NewKind,
    /// Editing the form; the index is the focused field.
    Form(usize),
    ConfirmDiscard(usize),
}

enum ActiveForm {
    Link(Form<LinkDraft>),
    Snippet(Form<SnippetDraft>),
    Note(Form<NoteDraft>),
}

macro_rules! each_form {
    ($form:expr, $f:ident => $body:expr) => {
        match $form {
            ActiveForm::Link($f) => $body,
            ActiveForm::Snippet($f) => $body,
            ActiveForm::Note($f) => $body,
        }
    };
}

impl ActiveForm {
    fn new(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Link => ActiveForm::Link(Form::create()),
            ResourceKind::Snippet => ActiveForm::Snippet(Form::create()),
            ResourceKind::Note => ActiveForm::Note(Form::create()),
        }
    }

    fn kind(&self) -> ResourceKind {
        match self {
            ActiveForm::Link(_) => ResourceKind::Link,
            ActiveForm::Snippet(_) => ResourceKind::Snippet,
            ActiveForm::Note(_) => ResourceKind::Note,
        }
    }

    fn is_edit(&self) -> bool {
        each_form!(self, f => f.editing_id().is_some())
    }

    fn fields(&self) -> Vec<Field<'_>> {
        each_form!(self, f => f.draft().fields())
    }

    fn field_mut(&mut self, index: usize) -> Option<&mut String> {
        each_form!(self, f => f.draft_mut().field_mut(index))
    }

    fn commit_tag(&mut self, index: usize) -> bool {
        each_form!(self, f => f.draft_mut().commit_tag(index))
    }

    fn error(&self) -> Option<&str> {
        each_form!(self, f => f.error())
    }

    fn is_dirty(&self) -> bool {
        each_form!(self, f => f.is_dirty())
    }

    fn request_leave(&mut self) -> Leave {
        each_form!(self, f => f.request_leave())
    }

    fn submit<C: VaultBackend>(&mut self, dashboard: &mut Dashboard<'_, C>) -> Result<Option<VaultItem>> {
        Ok(match self {
            ActiveForm::Link(f) => f.submit(&mut dashboard.links)?.map(Resource::into_item),
            ActiveForm::Snippet(f) => f.submit(&mut dashboard.snippets)?.map(Resource::into_item),
            ActiveForm::Note(f) => f.submit(&mut dashboard.notes)?.map(Resource::into_item),
        })
    }
}

struct App<'c, C> {
    dashboard: Dashboard<'c, C>,
    email: String,
    shown: Vec<VaultItem>,
    list_state: ListState,
    mode: Mode,
    filter: FilterType,
    sort: SortMode,
    search_query: String,
    tag_input: String,
    form: Option<ActiveForm>,
    status: String,
    status_time: Option<Instant>,
    preview_scroll: u16,
    should_quit: bool,
}

impl<'c, C: VaultBackend> App<'c, C> {
    fn new(dashboard: Dashboard<'c, C>, filter: FilterType, sort: SortMode) -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        let email = dashboard
            .identity()
            .map(|identity| identity.email.clone())
            .unwrap_or_default();
        Self {
            dashboard,
            email,
            shown: Vec::new(),
            list_state,
            mode: Mode::Normal,
            filter,
            sort,
            search_query: String::new(),
            tag_input: String::new(),
            form: None,
            status: String::new(),
            status_time: None,
            preview_scroll: 0,
            should_quit: false,
        }
    }

    fn set_status(&mut self, msg: String) {
        self.status = msg;
        self.status_time = Some(Instant::now());
    }

    fn clear_status(&mut self) {
        self.status.clear();
        self.status_time = None;
    }

    fn selected(&self) -> Option<&VaultItem> {
        self.list_state.selected().and_then(|i| self.shown.get(i))
    }

    fn select_next(&mut self) {
        self.select_by(1);
    }

    fn select_prev(&mut self) {
        self.select_by(-1);
    }

    fn select_by(&mut self, delta: isize) {
        if self.shown.is_empty() {
            return;
        }
        let current = self.list_state.selected().unwrap_or(0) as isize;
        let new = (current + delta).clamp(0, self.shown.len() as isize - 1) as usize;
        self.list_state.select(Some(new));
        self.preview_scroll = 0;
    }

    fn select_first(&mut self) {
        if !self.shown.is_empty() {
            self.list_state.select(Some(0));
            self.preview_scroll = 0;
        }
    }

    fn select_last(&mut self) {
        if !self.shown.is_empty() {
            self.list_state.select(Some(self.shown.len() - 1));
            self.preview_scroll = 0;
        }
    }

    fn select_id(&mut self, id: Uuid) {
        if let Some(i) = self.shown.iter().position(|item| item.id() == id) {
            self.list_state.select(Some(i));
            self.preview_scroll = 0;
        }
    }

    /// Recomputes the visible list from the stores without a reload.
    fn refresh_view(&mut self) {
        let items = self.dashboard.items();
        self.shown = visible(&items, &self.search_query, self.filter, self.sort)
            .into_iter()
            .cloned()
            .collect();

        if self.shown.is_empty() {
            self.list_state.select(None);
        } else if let Some(i) = self.list_state.selected() {
            if i >= self.shown.len() {
                self.list_state.select(Some(self.shown.len() - 1));
            }
        } else {
            self.list_state.select(Some(0));
        }
    }

    fn reload(&mut self) {
        self.dashboard.clear_errors();
        if let Err(e) = self.dashboard.load_all() {
            self.set_status(format!("Load error: {e}"));
        }
        self.refresh_view();
    }

    fn copy_selected(&mut self) {
        let Some(item) = self.selected() else {
            return;
        };
        let short = item.short_id();
        match copy_item(item) {
            Ok(()) => self.set_status(format!("Copied {short}")),
            Err(e) => self.set_status(format!("Copy failed: {e}")),
        }
    }

    fn request_delete(&mut self) {
        let Some(item) = self.selected() else {
            return;
        };
        let (kind, id, title) = (item.kind(), item.id(), item.title().to_string());
        self.mode = Mode::ConfirmDelete(kind, id);
        self.set_status(format!("Delete {kind} \"{title}\"? [y/n]"));
    }

    fn confirm_delete(&mut self, kind: ResourceKind, id: Uuid) {
        match self.dashboard.delete(kind, id) {
            Ok(_) => {
                self.set_status(format!("Deleted {kind}"));
                self.refresh_view();
            }
            Err(e) => self.set_status(format!("Delete error: {e}")),
        }
    }

    fn toggle_favorite(&mut self) {
        let Some(item) = self.selected() else {
            return;
        };
        let (kind, id) = (item.kind(), item.id());
        match self.dashboard.toggle_favorite(kind, id) {
            Ok(Some(updated)) => {
                let verb = if updated.is_favorite() {
                    "Favorited"
                } else {
                    "Unfavorited"
                };
                self.set_status(format!("{verb} {}", updated.short_id()));
                self.refresh_view();
                self.select_id(id);
            }
            Ok(None) => {}
            Err(e) => self.set_status(format!("Favorite error: {e}")),
        }
    }

    fn apply_tag(&mut self, remove: bool) {
        let tag = self.tag_input.trim().to_string();
        self.tag_input.clear();
        let Some(item) = self.selected() else {
            return;
        };
        let (kind, id) = (item.kind(), item.id());
        let result = if remove {
            self.dashboard.remove_tag(kind, id, &tag)
        } else {
            self.dashboard.add_tag(kind, id, &tag)
        };
        match result {
            Ok(_) if remove => self.set_status(format!("Removed tag \"{tag}\"")),
            Ok(_) => self.set_status(format!("Tagged \"{tag}\"")),
            Err(e) => self.set_status(format!("Tag error: {e}")),
        }
        self.refresh_view();
        self.select_id(id);
    }

    fn open_new(&mut self, kind: ResourceKind) {
        self.form = Some(ActiveForm::new(kind));
        self.mode = Mode::Form(0);
        self.clear_status();
    }

    fn open_edit(&mut self) {
        let Some(item) = self.selected() else {
            return;
        };
        let (kind, id) = (item.kind(), item.id());
        let opened = match kind {
            ResourceKind::Link => Form::<LinkDraft>::edit(&mut self.dashboard.links, id).map(|f| f.map(ActiveForm::Link)),
            ResourceKind::Snippet => {
                Form::<SnippetDraft>::edit(&mut self.dashboard.snippets, id).map(|f| f.map(ActiveForm::Snippet))
            }
            ResourceKind::Note => Form::<NoteDraft>::edit(&mut self.dashboard.notes, id).map(|f| f.map(ActiveForm::Note)),
        };
        match opened {
            Ok(Some(form)) => {
                self.form = Some(form);
                self.mode = Mode::Form(0);
                self.clear_status();
            }
            Ok(None) => {}
            Err(e) => self.set_status(format!("Load error: {e}")),
        }
    }

    fn close_form(&mut self) {
        self.form = None;
        self.mode = Mode::Normal;
    }

    fn submit_form(&mut self, field: usize) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        let editing = form.is_edit();
        match form.submit(&mut self.dashboard) {
            Ok(Some(item)) => {
                let verb = if editing { "Saved" } else { "Added" };
                info!(kind = %item.kind(), id = %item.id(), "saved from tui");
                self.set_status(format!("{verb} {} \"{}\"", item.kind(), item.title()));
                self.close_form();
                self.refresh_view();
                self.select_id(item.id());
            }
            Ok(None) => self.mode = Mode::Form(field),
            Err(e) => {
                warn!(error = %e, "form submit failed");
                self.set_status(format!("{e}"));
                self.mode = Mode::Form(field);
            }
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

fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{truncated}…")
    } else {
        truncated
    }
}

// ── UI rendering ───────────────────────────────────────────────────

fn label(text: &str) -> Span<'static> {
    Span::styled(format!("{text:<10}"), Style::new().fg(Color::DarkGray))
}

fn preview_lines(item: &VaultItem) -> Vec<Line<'_>> {
    let tags = if item.tags().is_empty() {
        "-".to_string()
    } else {
        item.tags().join(", ")
    };

    let mut lines = vec![
        Line::from(vec![label("ID:"), Span::raw(item.id().to_string())]),
        Line::from(vec![label("Type:"), Span::raw(item.kind().as_str())]),
        Line::from(vec![label("Title:"), Span::raw(item.title())]),
        Line::from(vec![label("Tags:"), Span::raw(tags)]),
        Line::from(vec![
            label("Created:"),
            Span::raw(item.created_at().format("%Y-%m-%d %H:%M").to_string()),
        ]),
    ];

    let body = match item {
        VaultItem::Link(link) => {
            lines.push(Line::from(vec![label("URL:"), Span::raw(link.url.as_str())]));
            if let Some(ref category) = link.category {
                lines.push(Line::from(vec![label("Category:"), Span::raw(category.as_str())]));
            }
            if let Some(ref image) = link.image_url {
                lines.push(Line::from(vec![label("Image:"), Span::raw(image.as_str())]));
            }
            let mut body = link.description.clone().unwrap_or_default();
            if let Some(ref note) = link.note {
                body.push_str("\n\n");
                body.push_str(note);
            }
            body
        }
        VaultItem::Snippet(snippet) => {
            lines.push(Line::from(vec![label("Language:"), Span::raw(snippet.language.as_str())]));
            snippet.content.clone()
        }
        VaultItem::Note(note) => {
            lines.push(Line::from(vec![label("Favorite:"), Span::raw(note.is_favorite.to_string())]));
            note.content.clone()
        }
    };

    lines.push(Line::raw("─────────────────────────"));
    lines.extend(body.lines().map(|line| Line::raw(line.to_string())));
    lines
}

fn draw_list<C: VaultBackend>(frame: &mut Frame, app: &mut App<'_, C>, area: Rect) {
    let items: Vec<ListItem> = app
        .shown
        .iter()
        .map(|item| {
            let type_ch = match item.kind() {
                ResourceKind::Link => "L",
                ResourceKind::Snippet => "S",
                ResourceKind::Note => "N",
            };
            let fav = if item.is_favorite() { "*" } else { " " };
            let age = format_age(item.created_at());
            ListItem::new(format!(
                "{}{} {:>4}  {}",
                type_ch,
                fav,
                age,
                truncate_chars(item.title(), 32)
            ))
        })
        .collect();

    let list_title = if app.mode == Mode::Search {
        format!("Search: {}_", app.search_query)
    } else if app.search_query.is_empty() {
        format!("Items [{} · {}]", app.filter, app.sort)
    } else {
        format!("Items [{} · {} · \"{}\"]", app.filter, app.sort, app.search_query)
    };

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(list_title))
        .highlight_style(
            Style::new()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn draw_preview<C: VaultBackend>(frame: &mut Frame, app: &App<'_, C>, area: Rect) {
    let content = match app.selected() {
        Some(item) => preview_lines(item),
        None if app.dashboard.is_loading() => vec![Line::raw("Loading…")],
        None => vec![Line::raw("Nothing here yet. Press [n] to add something.")],
    };

    let title = match app.mode {
        Mode::Tag => format!("Tag: {}_", app.tag_input),
        Mode::RemoveTag => format!("Remove tag: {}_", app.tag_input),
        _ if app.preview_scroll > 0 => format!("Preview [scroll: {}]", app.preview_scroll),
        _ => "Preview".to_string(),
    };

    let preview = Paragraph::new(content)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
        .scroll((app.preview_scroll, 0));
    frame.render_widget(preview, area);
}

fn field_lines<'a>(field: &Field<'a>, focused: bool) -> Vec<Line<'a>> {
    let cursor = if focused { "_" } else { "" };
    match field.kind {
        FieldKind::Tags => {
            let mut spans: Vec<Span> = field
                .committed
                .into_iter()
                .flat_map(|tags| tags.iter())
                .map(|tag| Span::styled(format!("[{tag}] "), Style::new().fg(Color::Cyan)))
                .collect();
            spans.push(Span::raw(format!("{}{cursor}", field.value)));
            vec![Line::from(spans)]
        }
        FieldKind::Line => vec![Line::raw(format!("{}{cursor}", field.value))],
        FieldKind::Multiline => {
            let mut lines: Vec<Line> = field.value.split('\n').map(Line::raw).collect();
            if focused && let Some(last) = lines.last_mut() {
                last.push_span(Span::raw(cursor));
            }
            lines
        }
    }
}

fn draw_form(frame: &mut Frame, form: &ActiveForm, focus: usize, area: Rect) {
    let fields = form.fields();
    let constraints: Vec<Constraint> = fields
        .iter()
        .map(|field| match field.kind {
            FieldKind::Multiline => Constraint::Fill(1),
            _ => Constraint::Length(3),
        })
        .chain(std::iter::once(Constraint::Length(1)))
        .collect();
    let areas = Layout::vertical(constraints).split(area);

    for (i, field) in fields.iter().enumerate() {
        let focused = i == focus;
        let title = if field.required {
            format!("{} *", field.label)
        } else {
            field.label.to_string()
        };
        let border = if focused {
            Style::new().fg(Color::Cyan)
        } else {
            Style::new().fg(Color::DarkGray)
        };
        let widget = Paragraph::new(field_lines(field, focused))
            .block(Block::default().borders(Borders::ALL).border_style(border).title(title))
            .wrap(Wrap { trim: false });
        frame.render_widget(widget, areas[i]);
    }

    if let Some(error) = form.error() {
        frame.render_widget(
            Paragraph::new(error.to_string()).style(Style::new().fg(Color::Red)),
            areas[fields.len()],
        );
    }
}

fn draw<C: VaultBackend>(frame: &mut Frame, app: &mut App<'_, C>) {
    let [title_area, body_area, help_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let title = match &app.form {
        Some(form) => {
            let action = if form.is_edit() { "Edit" } else { "New" };
            let dirty = if form.is_dirty() { " (modified)" } else { "" };
            format!(" VAULT · {action} {}{dirty} ", form.kind())
        }
        None => format!(
            " VAULT · {} · {} links · {} snippets · {} notes ",
            app.email,
            app.dashboard.links.items().len(),
            app.dashboard.snippets.items().len(),
            app.dashboard.notes.items().len(),
        ),
    };
    frame.render_widget(
        Paragraph::new(title).style(Style::new().fg(Color::Black).bg(Color::Cyan)),
        title_area,
    );

    match (app.mode, app.form.is_some()) {
        (Mode::Form(focus) | Mode::ConfirmDiscard(focus), true) => {
            if let Some(form) = &app.form {
                draw_form(frame, form, focus, body_area);
            }
        }
        _ => {
            let [list_area, preview_area] =
                Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)])
                    .areas(body_area);
            draw_list(frame, app, list_area);
            draw_preview(frame, app, preview_area);
        }
    }

    if let Some(t) = app.status_time
        && t.elapsed() > Duration::from_secs(3)
    {
        app.clear_status();
    }

    let help_text = match app.mode {
        Mode::Normal | Mode::ConfirmDelete(..) | Mode::Form(_) if !app.status.is_empty() => {
            format!(" {} ", app.status)
        }
        Mode::Normal | Mode::ConfirmDelete(..) => {
            " [q]uit [/]search [f]ilter [s]ort [n]ew [e]dit [Enter]copy [*]fav [t]ag [T]untag [d]el [r]eload"
                .to_string()
        }
        Mode::Search => " Type to search (live) · [Enter] done · [Esc] clear".to_string(),
        Mode::Tag => " Type tag name · [Enter] add · [Esc] cancel".to_string(),
        Mode::RemoveTag => " Type tag name · [Enter] remove · [Esc] cancel".to_string(),
        Mode::NewKind => " New: [l]ink [s]nippet n[o]te · [Esc] cancel".to_string(),
        Mode::Form(_) => {
            " [Tab]/[S-Tab] field · [Enter] tag/newline · [Ctrl-S] save · [Esc] back".to_string()
        }
        Mode::ConfirmDiscard(_) => " Discard unsaved changes? [y/n]".to_string(),
    };

    frame.render_widget(
        Paragraph::new(help_text).style(Style::new().fg(Color::Black).bg(Color::White)),
        help_area,
    );
}

// ── Event handling ─────────────────────────────────────────────────

fn handle_form_key<C: VaultBackend>(app: &mut App<'_, C>, key: KeyEvent, field: usize) {
    let Some(form) = app.form.as_mut() else {
        app.mode = Mode::Normal;
        return;
    };
    let fields: Vec<FieldKind> = form.fields().iter().map(|f| f.kind).collect();
    let count = fields.len();
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('s') if ctrl => app.submit_form(field),
        KeyCode::Esc => match form.request_leave() {
            Leave::Left => app.close_form(),
            Leave::ConfirmDiscard => app.mode = Mode::ConfirmDiscard(field),
        },
        KeyCode::Tab => app.mode = Mode::Form((field + 1) % count),
        KeyCode::BackTab => app.mode = Mode::Form((field + count - 1) % count),
        KeyCode::Enter => match fields.get(field) {
            Some(FieldKind::Tags) => {
                let has_input = form.field_mut(field).is_some_and(|input| !input.trim().is_empty());
                if !form.commit_tag(field) && has_input {
                    app.set_status("Tag already added".to_string());
                }
            }
            Some(FieldKind::Multiline) => {
                if let Some(value) = form.field_mut(field) {
                    value.push('\n');
                }
            }
            _ => app.mode = Mode::Form((field + 1) % count),
        },
        KeyCode::Backspace => {
            if let Some(value) = form.field_mut(field) {
                value.pop();
            }
        }
        KeyCode::Char(c) if !ctrl => {
            if let Some(value) = form.field_mut(field) {
                value.push(c);
            }
        }
        _ => {}
    }
}

fn handle_key<C: VaultBackend>(app: &mut App<'_, C>, key: KeyEvent) {
    match app.mode {
        Mode::Normal => {
            let shifted = key.modifiers.contains(KeyModifiers::SHIFT);
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
                KeyCode::Char('J') if shifted => {
                    app.preview_scroll = app.preview_scroll.saturating_add(1);
                }
                KeyCode::Char('K') if shifted => {
                    app.preview_scroll = app.preview_scroll.saturating_sub(1);
                }
                KeyCode::Char('j') | KeyCode::Down => app.select_next(),
                KeyCode::Char('k') | KeyCode::Up => app.select_prev(),
                KeyCode::PageDown => app.select_by(10),
                KeyCode::PageUp => app.select_by(-10),
                KeyCode::Char('g') | KeyCode::Home => app.select_first(),
                KeyCode::Char('G') | KeyCode::End => app.select_last(),
                KeyCode::Enter => app.copy_selected(),
                KeyCode::Char('d') => app.request_delete(),
                KeyCode::Char('*') => app.toggle_favorite(),
                KeyCode::Char('f') => {
                    app.filter = app.filter.next();
                    app.refresh_view();
                    app.select_first();
                }
                KeyCode::Char('s') => {
                    app.sort = app.sort.next();
                    app.refresh_view();
                    app.select_first();
                }
                KeyCode::Char('t') => {
                    app.mode = Mode::Tag;
                    app.tag_input.clear();
                    app.clear_status();
                }
                KeyCode::Char('T') => {
                    app.mode = Mode::RemoveTag;
                    app.tag_input.clear();
                    app.clear_status();
                }
                KeyCode::Char('/') => {
                    app.mode = Mode::Search;
                    app.search_query.clear();
                    app.clear_status();
                    app.refresh_view();
                }
                KeyCode::Char('n') => {
                    app.mode = Mode::NewKind;
                    app.clear_status();
                }
                KeyCode::Char('e') => app.open_edit(),
                KeyCode::Char('r') => {
                    app.reload();
                    if let Some(e) = app.dashboard.error() {
                        let msg = format!("Reload error: {e}");
                        app.set_status(msg);
                    } else {
                        app.set_status("Reloaded".to_string());
                    }
                }
                _ => {}
            }
        }
        Mode::ConfirmDelete(kind, id) => {
            app.mode = Mode::Normal;
            match key.code {
                KeyCode::Char('y') => app.confirm_delete(kind, id),
                _ => app.set_status("Delete cancelled".to_string()),
            }
        }
        Mode::NewKind => match key.code {
            KeyCode::Char('l') => app.open_new(ResourceKind::Link),
            KeyCode::Char('s') => app.open_new(ResourceKind::Snippet),
            KeyCode::Char('o') => app.open_new(ResourceKind::Note),
            _ => app.mode = Mode::Normal,
        },
        Mode::Form(field) => handle_form_key(app, key, field),
        Mode::ConfirmDiscard(field) => match key.code {
            KeyCode::Char('y') => {
                app.close_form();
                app.set_status("Changes discarded".to_string());
            }
            _ => app.mode = Mode::Form(field),
        },
        Mode::Search => match key.code {
            KeyCode::Esc => {
                app.mode = Mode::Normal;
                app.search_query.clear();
                app.refresh_view();
            }
            KeyCode::Enter => app.mode = Mode::Normal,
            KeyCode::Backspace => {
                app.search_query.pop();
                app.refresh_view();
            }
            KeyCode::Char(c) => {
                app.search_query.push(c);
                app.refresh_view();
                app.select_first();
            }
            _ => {}
        },
        Mode::Tag | Mode::RemoveTag => match key.code {
            KeyCode::Esc => {
                app.mode = Mode::Normal;
                app.tag_input.clear();
            }
            KeyCode::Enter => {
                let remove = app.mode == Mode::RemoveTag;
                app.mode = Mode::Normal;
                app.apply_tag(remove);
            }
            KeyCode::Backspace => {
                app.tag_input.pop();
            }
            KeyCode::Char(c) => app.tag_input.push(c),
            _ => {}
        },
    }
}

fn handle_event<C: VaultBackend>(app: &mut App<'_, C>) -> std::io::Result<()> {
    if !event::poll(Duration::from_millis(250))? {
        return Ok(());
    }

    let Event::Key(key) = event::read()? else {
        return Ok(());
    };
    if key.kind != KeyEventKind::Press {
        return Ok(());
    }
    handle_key(app, key);
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────

pub fn run(paths: &AppPaths, config: &VaultConfig) -> Result<()> {
    logging::init_to_file(&paths.log_file, &config.log_level)?;
    let backend = SqliteBackend::open(&paths.db_path)?;
    let mut auth = SessionAuth::open(&paths.session_file)?;
    let identity = auth
        .refresh(&backend)?
        .cloned()
        .ok_or(VaultError::AuthRequired)?;

    let mut app = App::new(
        Dashboard::new(&backend, Some(identity)),
        config.default_filter,
        config.default_sort,
    );
    app.reload();

    let mut terminal = ratatui::init();

    let result = (|| {
        loop {
            terminal.draw(|frame| draw(frame, &mut app))?;
            handle_event(&mut app)?;
            if app.should_quit {
                break;
            }
        }
        Ok::<(), std::io::Error>(())
    })();

    ratatui::restore();

    result.map_err(VaultError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::AccountStorage;
    use crate::storage::ResourceClient;
    use crate::storage::models::{NewNote, Note, Tags};

    fn press(app: &mut App<'_, SqliteBackend>, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App<'_, SqliteBackend>, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn ctrl_s(app: &mut App<'_, SqliteBackend>) {
        handle_key(app, KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
    }

    fn app_with_notes<'a>(backend: &'a SqliteBackend, titles: &[&str]) -> App<'a, SqliteBackend> {
        let identity = backend.find_or_create_user("dev@example.com").unwrap();
        for title in titles {
            let _: Note = backend
                .create(
                    identity.id,
                    NewNote {
                        title: title.to_string(),
                        content: "body".into(),
                        ..Default::default()
                    },
                )
                .unwrap();
        }
        let mut app = App::new(
            Dashboard::new(backend, Some(identity)),
            FilterType::All,
            SortMode::Recent,
        );
        app.reload();
        app
    }

    #[test]
    fn test_search_filters_live() {
        let backend = SqliteBackend::in_memory().unwrap();
        let mut app = app_with_notes(&backend, &["rust tips", "grocery list"]);
        assert_eq!(app.shown.len(), 2);

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "rust");
        assert_eq!(app.shown.len(), 1);
        assert_eq!(app.shown[0].title(), "rust tips");

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.shown.len(), 2);
    }

    #[test]
    fn test_filter_cycles_types() {
        let backend = SqliteBackend::in_memory().unwrap();
        let mut app = app_with_notes(&backend, &["only a note"]);
        press(&mut app, KeyCode::Char('f'));
        assert_eq!(app.filter, FilterType::Link);
        assert!(app.shown.is_empty());
        assert_eq!(app.list_state.selected(), None);
        press(&mut app, KeyCode::Char('f'));
        press(&mut app, KeyCode::Char('f'));
        assert_eq!(app.filter, FilterType::Note);
        assert_eq!(app.shown.len(), 1);
    }

    #[test]
    fn test_new_note_through_form() {
        let backend = SqliteBackend::in_memory().unwrap();
        let mut app = app_with_notes(&backend, &[]);

        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Char('o'));
        assert_eq!(app.mode, Mode::Form(0));
        type_text(&mut app, "meeting");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "work");
        press(&mut app, KeyCode::Enter);
        ctrl_s(&mut app);

        assert_eq!(app.mode, Mode::Normal);
        assert!(app.form.is_none());
        assert_eq!(app.shown.len(), 1);
        assert_eq!(app.shown[0].title(), "meeting");
        assert!(app.shown[0].tags().contains("work"));
    }

    #[test]
    fn test_invalid_form_stays_open() {
        let backend = SqliteBackend::in_memory().unwrap();
        let mut app = app_with_notes(&backend, &[]);
        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Char('l'));
        type_text(&mut app, "no url");
        ctrl_s(&mut app);

        assert_eq!(app.mode, Mode::Form(0));
        assert!(app.form.as_ref().unwrap().error().unwrap().contains("url"));
        assert!(app.shown.is_empty());
    }

    #[test]
    fn test_dirty_form_asks_before_leaving() {
        let backend = SqliteBackend::in_memory().unwrap();
        let mut app = app_with_notes(&backend, &[]);
        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Char('s'));
        type_text(&mut app, "x");
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.mode, Mode::ConfirmDiscard(0));

        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.mode, Mode::Form(0));
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.mode, Mode::Normal);
        assert!(app.form.is_none());
    }

    #[test]
    fn test_edit_and_favorite_selected() {
        let backend = SqliteBackend::in_memory().unwrap();
        let mut app = app_with_notes(&backend, &["draft"]);

        press(&mut app, KeyCode::Char('e'));
        assert_eq!(app.mode, Mode::Form(0));
        type_text(&mut app, " v2");
        ctrl_s(&mut app);
        assert_eq!(app.shown[0].title(), "draft v2");

        press(&mut app, KeyCode::Char('*'));
        assert!(app.shown[0].is_favorite());
    }

    #[test]
    fn test_tag_and_delete_selected() {
        let backend = SqliteBackend::in_memory().unwrap();
        let mut app = app_with_notes(&backend, &["keep", "drop"]);
        let drop_id = app.shown[0].id();

        press(&mut app, KeyCode::Char('t'));
        type_text(&mut app, "old");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.shown[0].tags(), &Tags::parse_list("old"));

        press(&mut app, KeyCode::Char('T'));
        type_text(&mut app, "missing");
        press(&mut app, KeyCode::Enter);
        assert!(app.status.contains("no such tag"));
        assert_eq!(app.shown[0].tags(), &Tags::parse_list("old"));

        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.mode, Mode::ConfirmDelete(ResourceKind::Note, drop_id));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.shown.len(), 1);
        assert_eq!(app.shown[0].title(), "keep");

        app.reload();
        assert!(app.shown.iter().all(|item| item.id() != drop_id));
    }

    #[test]
    fn test_delete_cancelled() {
        let backend = SqliteBackend::in_memory().unwrap();
        let mut app = app_with_notes(&backend, &["stay"]);
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.shown.len(), 1);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello…");
    }
}
