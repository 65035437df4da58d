use tracing::debug;
use uuid::Uuid;

use crate::errors::{Result, VaultError};
use crate::storage::ResourceClient;
use crate::storage::models::{
    DEFAULT_LANGUAGE, Link, LinkPatch, NewLink, NewNote, NewSnippet, Note, NotePatch, Resource,
    Snippet, SnippetPatch, Tags,
};
use crate::store::ResourceStore;
use crate::upload::ImageUploader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Line,
    Multiline,
    /// Committed one at a time on Enter.
    Tags,
}

pub struct Field<'a> {
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub value: &'a str,
    pub committed: Option<&'a Tags>,
}

impl<'a> Field<'a> {
    fn line(label: &'static str, required: bool, value: &'a str) -> Self {
        Self {
            label,
            kind: FieldKind::Line,
            required,
            value,
            committed: None,
        }
    }

    fn multiline(label: &'static str, required: bool, value: &'a str) -> Self {
        Self {
            kind: FieldKind::Multiline,
            ..Self::line(label, required, value)
        }
    }

    fn tags(field: &'a TagField) -> Self {
        Self {
            label: "Tags",
            kind: FieldKind::Tags,
            required: false,
            value: &field.input,
            committed: Some(&field.tags),
        }
    }
}

/// Committed tags plus the text being typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagField {
    pub tags: Tags,
    pub input: String,
}

impl TagField {
    pub fn with_tags(tags: Tags) -> Self {
        Self {
            tags,
            input: String::new(),
        }
    }

    /// Moves the typed text into the tag set. A blank or duplicate entry is
    /// ignored and left in the input.
    pub fn commit_input(&mut self) -> bool {
        if self.tags.insert(&self.input) {
            self.input.clear();
            true
        } else {
            false
        }
    }
}

pub trait Draft: Clone + PartialEq + Default {
    type Target: Resource;

    fn from_resource(resource: &Self::Target) -> Self;
    fn fields(&self) -> Vec<Field<'_>>;
    fn field_mut(&mut self, index: usize) -> Option<&mut String>;
    fn validate(&self) -> Result<()>;
    fn to_new(&self) -> <Self::Target as Resource>::New;
    fn to_patch(&self) -> <Self::Target as Resource>::Patch;

    fn commit_tag(&mut self, _index: usize) -> bool {
        false
    }
}

fn required(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(VaultError::validation(field, "is required"));
    }
    Ok(())
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

// --- Links ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkDraft {
    pub title: String,
    pub url: String,
    pub description: String,
    pub note: String,
    pub category: String,
    pub image_url: String,
    /// Comma separated, split on submit.
    pub tags: String,
}

impl Draft for LinkDraft {
    type Target = Link;

    fn from_resource(link: &Link) -> Self {
        Self {
            title: link.title.clone(),
            url: link.url.clone(),
            description: link.description.clone().unwrap_or_default(),
            note: link.note.clone().unwrap_or_default(),
            category: link.category.clone().unwrap_or_default(),
            image_url: link.image_url.clone().unwrap_or_default(),
            tags: link.tags.join(", "),
        }
    }

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::line("Title", true, &self.title),
            Field::line("URL", true, &self.url),
            Field::multiline("Description", false, &self.description),
            Field::multiline("Note", false, &self.note),
            Field::line("Category", false, &self.category),
            Field::line("Image URL", false, &self.image_url),
            Field::line("Tags (comma separated)", false, &self.tags),
        ]
    }

    fn field_mut(&mut self, index: usize) -> Option<&mut String> {
        Some(match index {
            0 => &mut self.title,
            1 => &mut self.url,
            2 => &mut self.description,
            3 => &mut self.note,
            4 => &mut self.category,
            5 => &mut self.image_url,
            6 => &mut self.tags,
            _ => return None,
        })
    }

    fn validate(&self) -> Result<()> {
        required("title", &self.title)?;
        required("url", &self.url)
    }

    fn to_new(&self) -> NewLink {
        NewLink {
            title: self.title.trim().to_string(),
            url: self.url.trim().to_string(),
            description: optional(&self.description),
            note: optional(&self.note),
            tags: Tags::parse_list(&self.tags),
            category: optional(&self.category),
            image_url: optional(&self.image_url),
        }
    }

    fn to_patch(&self) -> LinkPatch {
        let new = self.to_new();
        LinkPatch {
            title: Some(new.title),
            url: Some(new.url),
            description: Some(new.description),
            note: Some(new.note),
            tags: Some(new.tags),
            category: Some(new.category),
            image_url: Some(new.image_url),
        }
    }
}

// --- Snippets ---

#[derive(Debug, Clone, PartialEq)]
pub struct SnippetDraft {
    pub title: String,
    pub content: String,
    pub language: String,
    pub tags: TagField,
}

impl Default for SnippetDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            tags: TagField::default(),
        }
    }
}

impl Draft for SnippetDraft {
    type Target = Snippet;

    fn from_resource(snippet: &Snippet) -> Self {
        Self {
            title: snippet.title.clone(),
            content: snippet.content.clone(),
            language: snippet.language.clone(),
            tags: TagField::with_tags(snippet.tags.clone()),
        }
    }

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::line("Title", true, &self.title),
            Field::line("Language", false, &self.language),
            Field::multiline("Code", true, &self.content),
            Field::tags(&self.tags),
        ]
    }

    fn field_mut(&mut self, index: usize) -> Option<&mut String> {
        Some(match index {
            0 => &mut self.title,
            1 => &mut self.language,
            2 => &mut self.content,
            3 => &mut self.tags.input,
            _ => return None,
        })
    }

    fn commit_tag(&mut self, index: usize) -> bool {
        index == 3 && self.tags.commit_input()
    }

    fn validate(&self) -> Result<()> {
        required("title", &self.title)?;
        required("content", &self.content)
    }

    fn to_new(&self) -> NewSnippet {
        let language = self.language.trim();
        NewSnippet {
            title: self.title.trim().to_string(),
            content: self.content.clone(),
            language: if language.is_empty() {
                DEFAULT_LANGUAGE.to_string()
            } else {
                language.to_lowercase()
            },
            tags: self.tags.tags.clone(),
        }
    }

    fn to_patch(&self) -> SnippetPatch {
        let new = self.to_new();
        SnippetPatch {
            title: Some(new.title),
            content: Some(new.content),
            language: Some(new.language),
            tags: Some(new.tags),
        }
    }
}

// --- Notes ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub is_favorite: bool,
    pub tags: TagField,
}

impl Draft for NoteDraft {
    type Target = Note;

    fn from_resource(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            is_favorite: note.is_favorite,
            tags: TagField::with_tags(note.tags.clone()),
        }
    }

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::line("Title", true, &self.title),
            Field::multiline("Content (markdown)", false, &self.content),
            Field::tags(&self.tags),
        ]
    }

    fn field_mut(&mut self, index: usize) -> Option<&mut String> {
        Some(match index {
            0 => &mut self.title,
            1 => &mut self.content,
            2 => &mut self.tags.input,
            _ => return None,
        })
    }

    fn commit_tag(&mut self, index: usize) -> bool {
        index == 2 && self.tags.commit_input()
    }

    fn validate(&self) -> Result<()> {
        required("title", &self.title)
    }

    fn to_new(&self) -> NewNote {
        NewNote {
            title: self.title.trim().to_string(),
            content: self.content.clone(),
            tags: self.tags.tags.clone(),
            is_favorite: self.is_favorite,
        }
    }

    fn to_patch(&self) -> NotePatch {
        let new = self.to_new();
        NotePatch {
            title: Some(new.title),
            content: Some(new.content),
            tags: Some(new.tags),
            is_favorite: Some(new.is_favorite),
        }
    }
}

// --- Form state machine ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Loading,
    Editing,
    Submitting,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leave {
    Left,
    ConfirmDiscard,
}

#[derive(Debug)]
pub struct Form<D: Draft> {
    editing: Option<Uuid>,
    draft: D,
    initial: D,
    state: FormState,
    error: Option<String>,
}

impl<D: Draft> Form<D> {
    pub fn create() -> Self {
        Self::with_draft(D::default())
    }

    /// A create form prefilled with `draft`. The prefill is the snapshot,
    /// so leaving untouched does not prompt.
    pub fn with_draft(draft: D) -> Self {
        Self {
            editing: None,
            initial: draft.clone(),
            draft,
            state: FormState::Editing,
            error: None,
        }
    }

    /// An edit form waiting for [`Form::loaded`].
    pub fn loading(id: Uuid) -> Self {
        Self {
            editing: Some(id),
            draft: D::default(),
            initial: D::default(),
            state: FormState::Loading,
            error: None,
        }
    }

    /// Fetches `id` through the store and opens it for editing. `Ok(None)`
    /// when the store has no signed-in owner.
    pub fn edit<C>(store: &mut ResourceStore<'_, D::Target, C>, id: Uuid) -> Result<Option<Self>>
    where
        C: ResourceClient<D::Target> + ?Sized,
    {
        let mut form = Self::loading(id);
        let Some(resource) = store.get(id)? else {
            return Ok(None);
        };
        form.loaded(&resource);
        Ok(Some(form))
    }

    pub fn loaded(&mut self, resource: &D::Target) {
        self.editing = Some(resource.id());
        self.draft = D::from_resource(resource);
        self.initial = self.draft.clone();
        self.state = FormState::Editing;
        self.error = None;
    }

    pub fn draft(&self) -> &D {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut D {
        &mut self.draft
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn editing_id(&self) -> Option<Uuid> {
        self.editing
    }

    pub fn is_dirty(&self) -> bool {
        self.draft != self.initial
    }

    pub fn request_leave(&mut self) -> Leave {
        if self.state == FormState::Editing && self.is_dirty() {
            return Leave::ConfirmDiscard;
        }
        self.state = FormState::Closed;
        Leave::Left
    }

    pub fn discard(&mut self) {
        self.state = FormState::Closed;
    }

    /// `Ok(None)` when the store has no signed-in owner.
    pub fn submit<C>(&mut self, store: &mut ResourceStore<'_, D::Target, C>) -> Result<Option<D::Target>>
    where
        C: ResourceClient<D::Target> + ?Sized,
    {
        if self.state != FormState::Editing {
            return Err(VaultError::InvalidInput(format!(
                "form is not editable while {:?}",
                self.state
            )));
        }
        if let Err(e) = self.draft.validate() {
            self.error = Some(e.to_string());
            return Err(e);
        }

        self.state = FormState::Submitting;
        let result = match self.editing {
            Some(id) => store.update(id, self.draft.to_patch()),
            None => store.create(self.draft.to_new()),
        };
        match result {
            Ok(Some(saved)) => {
                let kind = <D::Target as Resource>::KIND;
                debug!(%kind, id = %saved.id(), "form saved");
                self.state = FormState::Closed;
                self.error = None;
                Ok(Some(saved))
            }
            Ok(None) => {
                self.state = FormState::Editing;
                Ok(None)
            }
            Err(e) => {
                self.state = FormState::Editing;
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

impl Form<LinkDraft> {
    pub fn attach_image(&mut self, uploader: &dyn ImageUploader, bytes: &[u8], file_name: &str) -> Result<String> {
        match uploader.upload(bytes, file_name) {
            Ok(url) => {
                self.draft.image_url = url.clone();
                Ok(url)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::AccountStorage;
    use crate::storage::sqlite::SqliteBackend;

    fn backend_with_user() -> (SqliteBackend, crate::auth::Identity) {
        let backend = SqliteBackend::in_memory().unwrap();
        let identity = backend.find_or_create_user("dev@example.com").unwrap();
        (backend, identity)
    }

    struct FixedUploader;

    impl ImageUploader for FixedUploader {
        fn upload(&self, _bytes: &[u8], file_name: &str) -> Result<String> {
            Ok(format!("file:///uploads/{file_name}"))
        }
    }

    struct RejectingUploader;

    impl ImageUploader for RejectingUploader {
        fn upload(&self, _bytes: &[u8], _file_name: &str) -> Result<String> {
            Err(VaultError::Upload("not an image".into()))
        }
    }

    // --- Tags ---

    #[test]
    fn test_tag_field_suppresses_duplicates() {
        let mut field = TagField::default();
        field.input = " rust ".into();
        assert!(field.commit_input());
        assert!(field.input.is_empty());

        field.input = "rust".into();
        assert!(!field.commit_input());
        assert_eq!(field.input, "rust");
        assert_eq!(field.tags.to_vec(), vec!["rust"]);

        field.input = "   ".into();
        assert!(!field.commit_input());
    }

    #[test]
    fn test_link_tags_split_on_submit() {
        let draft = LinkDraft {
            title: "Rust".into(),
            url: "https://rust-lang.org".into(),
            tags: "a, b,  c".into(),
            ..Default::default()
        };
        assert_eq!(draft.to_new().tags.to_vec(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_commit_tag_only_on_tag_field() {
        let mut draft = NoteDraft::default();
        draft.tags.input = "idea".into();
        assert!(!draft.commit_tag(0));
        assert!(draft.commit_tag(2));
        assert!(draft.tags.tags.contains("idea"));
    }

    // --- Validation ---

    #[test]
    fn test_link_requires_title_and_url() {
        let mut draft = LinkDraft {
            title: "t".into(),
            ..Default::default()
        };
        assert!(matches!(draft.validate(), Err(VaultError::Validation { field: "url", .. })));
        draft.url = "https://example.com".into();
        draft.title = "  ".into();
        assert!(matches!(draft.validate(), Err(VaultError::Validation { field: "title", .. })));
    }

    #[test]
    fn test_snippet_requires_content() {
        let draft = SnippetDraft {
            title: "t".into(),
            ..Default::default()
        };
        assert!(matches!(draft.validate(), Err(VaultError::Validation { field: "content", .. })));
    }

    #[test]
    fn test_note_requires_only_title() {
        let draft = NoteDraft {
            title: "t".into(),
            ..Default::default()
        };
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_snippet_language_defaults_and_lowercases() {
        let mut draft = SnippetDraft {
            title: "t".into(),
            content: "x".into(),
            language: " ".into(),
            ..Default::default()
        };
        assert_eq!(draft.to_new().language, DEFAULT_LANGUAGE);
        draft.language = "Rust".into();
        assert_eq!(draft.to_new().language, "rust");
    }

    #[test]
    fn test_link_patch_clears_blank_optionals() {
        let draft = LinkDraft {
            title: "t".into(),
            url: "u".into(),
            description: "  ".into(),
            ..Default::default()
        };
        assert_eq!(draft.to_patch().description, Some(None));
    }

    // --- Submit ---

    #[test]
    fn test_invalid_draft_never_reaches_store() {
        let (backend, identity) = backend_with_user();
        let mut store: ResourceStore<Link, _> = ResourceStore::new(&backend, Some(identity));
        let mut form: Form<LinkDraft> = Form::create();
        form.draft_mut().title = "no url".into();

        assert!(form.submit(&mut store).is_err());
        assert_eq!(form.state(), FormState::Editing);
        assert!(form.error().unwrap().contains("url"));
        assert!(store.items().is_empty());
        assert!(store.error().is_none());
    }

    #[test]
    fn test_create_submit_closes_form() {
        let (backend, identity) = backend_with_user();
        let mut store: ResourceStore<Snippet, _> = ResourceStore::new(&backend, Some(identity));
        let mut form: Form<SnippetDraft> = Form::create();
        let draft = form.draft_mut();
        draft.title = "hello".into();
        draft.content = "println!(\"hi\");".into();
        draft.language = "rust".into();
        draft.tags.input = "demo".into();
        draft.commit_tag(3);

        let saved = form.submit(&mut store).unwrap().unwrap();
        assert_eq!(form.state(), FormState::Closed);
        assert_eq!(saved.tags.to_vec(), vec!["demo"]);
        assert_eq!(store.items()[0].id, saved.id);
    }

    #[test]
    fn test_edit_round_trip() {
        let (backend, identity) = backend_with_user();
        let mut store: ResourceStore<Note, _> = ResourceStore::new(&backend, Some(identity));
        let note = store
            .create(NewNote {
                title: "draft".into(),
                content: "# hi".into(),
                is_favorite: true,
                ..Default::default()
            })
            .unwrap()
            .unwrap();

        let mut form = Form::<NoteDraft>::edit(&mut store, note.id).unwrap().unwrap();
        assert_eq!(form.editing_id(), Some(note.id));
        assert!(!form.is_dirty());
        form.draft_mut().title = "final".into();
        assert!(form.is_dirty());

        let saved = form.submit(&mut store).unwrap().unwrap();
        assert_eq!(saved.id, note.id);
        assert_eq!(saved.title, "final");
        assert!(saved.is_favorite);
        assert_eq!(store.items().len(), 1);
    }

    #[test]
    fn test_backend_failure_keeps_form_open() {
        let (backend, identity) = backend_with_user();
        let mut store: ResourceStore<Note, _> = ResourceStore::new(&backend, Some(identity));
        let mut form: Form<NoteDraft> = Form::loading(Uuid::new_v4());
        form.loaded(&Note {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "ghost".into(),
            content: String::new(),
            tags: Tags::new(),
            is_favorite: false,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        });

        let result = form.submit(&mut store);
        assert!(matches!(result, Err(VaultError::NotFound(_))));
        assert_eq!(form.state(), FormState::Editing);
        assert!(form.error().is_some());
    }

    #[test]
    fn test_submit_without_identity_writes_nothing() {
        let backend = SqliteBackend::in_memory().unwrap();
        let mut store: ResourceStore<Note, _> = ResourceStore::new(&backend, None);
        let mut form: Form<NoteDraft> = Form::create();
        form.draft_mut().title = "t".into();
        assert!(form.submit(&mut store).unwrap().is_none());
        assert_eq!(form.state(), FormState::Editing);
    }

    #[test]
    fn test_loading_form_rejects_submit() {
        let (backend, identity) = backend_with_user();
        let mut store: ResourceStore<Note, _> = ResourceStore::new(&backend, Some(identity));
        let mut form: Form<NoteDraft> = Form::loading(Uuid::new_v4());
        assert_eq!(form.state(), FormState::Loading);
        assert!(matches!(form.submit(&mut store), Err(VaultError::InvalidInput(_))));
    }

    // --- Leaving ---

    #[test]
    fn test_leave_clean_form() {
        let mut form: Form<NoteDraft> = Form::create();
        assert_eq!(form.request_leave(), Leave::Left);
        assert_eq!(form.state(), FormState::Closed);
    }

    #[test]
    fn test_leave_dirty_form_asks_first() {
        let mut form: Form<LinkDraft> = Form::create();
        form.draft_mut().url = "https://".into();
        assert_eq!(form.request_leave(), Leave::ConfirmDiscard);
        assert_eq!(form.state(), FormState::Editing);
        form.discard();
        assert_eq!(form.state(), FormState::Closed);
    }

    #[test]
    fn test_prefilled_draft_is_clean() {
        let mut form = Form::with_draft(NoteDraft {
            title: "from clipboard".into(),
            ..Default::default()
        });
        assert!(!form.is_dirty());
        assert_eq!(form.request_leave(), Leave::Left);
    }

    // --- Images ---

    #[test]
    fn test_attach_image_sets_url() {
        let mut form: Form<LinkDraft> = Form::create();
        let url = form.attach_image(&FixedUploader, b"png", "cover.png").unwrap();
        assert_eq!(form.draft().image_url, url);
        assert!(form.is_dirty());
    }

    #[test]
    fn test_attach_image_failure_surfaces_error() {
        let mut form: Form<LinkDraft> = Form::create();
        assert!(form.attach_image(&RejectingUploader, b"txt", "a.txt").is_err());
        assert!(form.draft().image_url.is_empty());
        assert!(form.error().unwrap().contains("not an image"));
    }
}
