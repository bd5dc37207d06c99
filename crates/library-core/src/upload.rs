//! Add-book dialog workflow.
//!
//! `Idle -> FileSelected -> PreviewReady | PreviewFailed -> Validating ->
//! Submitting -> Done | Failed`. Validation errors drop back to the state
//! the dialog was in; a failed insert keeps every field for a retry.

use crate::notify::{Notification, Toaster};
use crate::progress::{ProgressMeter, ProgressTimer, COMPLETE};
use command_bridge::{CommandBridge, CommandError};
use doc_model::{NewBook, UploadSettings};
use pdf_engine::{PreviewError, PreviewGenerator, PreviewImage};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const TITLE_REQUIRED: &str = "Title is required.";
pub const FILE_REQUIRED: &str = "PDF file is required.";
pub const FIELDS_REQUIRED: &str = "Please fill all required fields.";
pub const PREVIEW_FAILED: &str = "Failed to generate PDF preview.";
pub const ADD_FAILED: &str = "Failed to add book. Please try again.";
pub const BOOK_ADDED: &str = "Book Added!";
pub const BOOK_ADDED_DESCRIPTION: &str = "The book has been successfully added to your collection.";

const ERROR_TITLE: &str = "Error";
const TRANSITION_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadState {
    Idle,
    FileSelected,
    PreviewReady,
    PreviewFailed,
    Validating,
    Submitting,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadField {
    Title,
    File,
}

pub type FieldErrors = BTreeMap<UploadField, String>;

#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { name, path, bytes }
    }

    pub fn read(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        Ok(Self::new(path, std::fs::read(path)?))
    }

    /// Accepts `.pdf` files by extension, or anything carrying the PDF magic.
    pub fn is_pdf(&self) -> bool {
        let by_extension = self
            .path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"));
        by_extension || self.bytes.starts_with(b"%PDF")
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PreviewStatus {
    #[default]
    Empty,
    Generating,
    Ready(PreviewImage),
    Failed(String),
}

/// Transient dialog fields. Reset whenever the dialog closes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadDraft {
    pub title: String,
    pub author: String,
    pub file: Option<SelectedFile>,
    pub preview: PreviewStatus,
    pub errors: FieldErrors,
    pub progress: u8,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("missing required fields: {0:?}")]
    Validation(FieldErrors),

    #[error("backend refused the book: {0}")]
    Command(#[from] CommandError),

    #[error("the upload dialog is closed")]
    Closed,
}

/// First-page render started by [`UploadFlow::begin_selection`].
pub struct PreviewJob {
    selection: u64,
    task: JoinHandle<Result<PreviewImage, PreviewError>>,
}

impl PreviewJob {
    pub async fn resolve(self) -> ResolvedPreview {
        let result = match self.task.await {
            Ok(rendered) => rendered.map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        };
        ResolvedPreview { selection: self.selection, result }
    }
}

#[derive(Debug)]
pub struct ResolvedPreview {
    selection: u64,
    result: Result<PreviewImage, String>,
}

pub struct UploadFlow {
    bridge: Arc<dyn CommandBridge>,
    toaster: Toaster,
    settings: UploadSettings,
    previews: PreviewGenerator,
    state: UploadState,
    draft: UploadDraft,
    meter: ProgressMeter,
    timer: Option<ProgressTimer>,
    open: bool,
    selection: u64,
    transitions: broadcast::Sender<UploadState>,
}

impl UploadFlow {
    /// Creates the flow with its dialog open.
    pub fn new(
        bridge: Arc<dyn CommandBridge>,
        toaster: Toaster,
        settings: UploadSettings,
        previews: PreviewGenerator,
    ) -> Self {
        Self {
            bridge,
            toaster,
            settings,
            previews,
            state: UploadState::Idle,
            draft: UploadDraft::default(),
            meter: ProgressMeter::new(),
            timer: None,
            open: true,
            selection: 0,
            transitions: broadcast::channel(TRANSITION_BUFFER).0,
        }
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    /// Snapshot of the dialog fields with the live progress value.
    pub fn draft(&self) -> UploadDraft {
        UploadDraft { progress: self.meter.percent(), ..self.draft.clone() }
    }

    pub fn progress(&self) -> ProgressMeter {
        self.meter.clone()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
        self.draft.errors.remove(&UploadField::Title);
    }

    pub fn set_author(&mut self, author: impl Into<String>) {
        self.draft.author = author.into();
    }

    /// Every state change in order, for observers of the dialog. Receivers
    /// that fall behind skip ahead with `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<UploadState> {
        self.transitions.subscribe()
    }

    /// Takes the first PDF of a drop or picker batch, replacing any earlier
    /// selection, and starts rendering its preview. The draft shows
    /// [`PreviewStatus::Generating`] until the returned job is completed.
    /// Returns `None` if the batch held no PDF.
    pub fn begin_selection(&mut self, files: Vec<SelectedFile>) -> Option<PreviewJob> {
        let Some(file) = files.into_iter().find(SelectedFile::is_pdf) else {
            debug!("selection contained no PDF");
            return None;
        };

        info!(file = %file.name, bytes = file.bytes.len(), "selected file");
        let bytes = file.bytes.clone();
        self.selection += 1;
        self.draft.file = Some(file);
        self.draft.preview = PreviewStatus::Generating;
        self.draft.errors.remove(&UploadField::File);
        self.transition(UploadState::FileSelected);

        let previews = self.previews;
        let task = tokio::task::spawn_blocking(move || previews.preview(&bytes));
        Some(PreviewJob { selection: self.selection, task })
    }

    /// Applies a finished preview. A result for a file that has since been
    /// replaced or removed is discarded and `false` is returned.
    pub fn complete_preview(&mut self, resolved: ResolvedPreview) -> bool {
        if resolved.selection != self.selection {
            debug!(
                selection = resolved.selection,
                current = self.selection,
                "discarded stale preview"
            );
            return false;
        }

        // A submit started before the preview finished keeps its state.
        let waiting = self.state == UploadState::FileSelected;
        match resolved.result {
            Ok(image) => {
                self.draft.preview = PreviewStatus::Ready(image);
                if waiting {
                    self.transition(UploadState::PreviewReady);
                }
            }
            Err(reason) => {
                warn!("preview generation failed: {reason}");
                self.draft.preview = PreviewStatus::Failed(reason);
                self.toaster.push(Notification::error(ERROR_TITLE, PREVIEW_FAILED));
                if waiting {
                    self.transition(UploadState::PreviewFailed);
                }
            }
        }
        true
    }

    /// `begin_selection` and `complete_preview` in one step.
    pub async fn select_files(&mut self, files: Vec<SelectedFile>) -> bool {
        let Some(job) = self.begin_selection(files) else {
            return false;
        };
        let resolved = job.resolve().await;
        self.complete_preview(resolved);
        true
    }

    pub fn remove_file(&mut self) {
        self.selection += 1;
        self.draft.file = None;
        self.draft.preview = PreviewStatus::Empty;
        self.transition(UploadState::Idle);
    }

    pub async fn submit(&mut self) -> Result<(), UploadError> {
        if !self.open {
            return Err(UploadError::Closed);
        }

        let resume = self.state;
        self.transition(UploadState::Validating);

        let book = match self.validate() {
            Ok(book) => book,
            Err(errors) => {
                debug!(?errors, "rejected submission");
                self.draft.errors = errors.clone();
                self.transition(resume);
                self.toaster.push(Notification::error(ERROR_TITLE, FIELDS_REQUIRED));
                return Err(UploadError::Validation(errors));
            }
        };

        self.draft.errors.clear();
        self.transition(UploadState::Submitting);
        self.meter.set(0);
        self.timer = Some(ProgressTimer::start(
            self.meter.clone(),
            self.settings.progress_interval(),
            self.settings.progress_step,
        ));

        info!(title = %book.title, file = %book.file_path, "adding book");
        let result = self.bridge.insert_new_book(&book).await;
        self.stop_timer();

        match result {
            Ok(()) => {
                self.meter.set(COMPLETE);
                self.transition(UploadState::Done);
                self.toaster.push(Notification::success(BOOK_ADDED, BOOK_ADDED_DESCRIPTION));

                tokio::time::sleep(self.settings.close_delay()).await;
                self.close();
                Ok(())
            }
            Err(err) => {
                self.meter.set(0);
                self.transition(UploadState::Failed);
                self.toaster.push(Notification::error(ERROR_TITLE, ADD_FAILED));
                Err(UploadError::Command(err))
            }
        }
    }

    /// Stops the progress timer, clears every transient field and closes the
    /// dialog.
    pub fn close(&mut self) {
        self.stop_timer();
        self.meter.set(0);
        self.selection += 1;
        self.draft = UploadDraft::default();
        self.transition(UploadState::Idle);
        self.open = false;
        debug!("closed upload dialog");
    }

    fn validate(&self) -> Result<NewBook, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = self.draft.title.trim();
        if title.is_empty() {
            errors.insert(UploadField::Title, TITLE_REQUIRED.to_string());
        }

        let Some(file) = &self.draft.file else {
            errors.insert(UploadField::File, FILE_REQUIRED.to_string());
            return Err(errors);
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        let author = self.draft.author.trim();
        Ok(NewBook {
            title: title.to_string(),
            author: (!author.is_empty()).then(|| author.to_string()),
            file_path: file.path.to_string_lossy().into_owned(),
        })
    }

    fn transition(&mut self, next: UploadState) {
        self.state = next;
        // Sending only fails when nobody is subscribed.
        let _ = self.transitions.send(next);
    }

    fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ToastVariant;
    use crate::testing::{Reply, ScriptedBridge};
    use pdf_engine::fixtures::sample_pdf;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    fn flow(bridge: Arc<ScriptedBridge>) -> (UploadFlow, Toaster) {
        let toaster = Toaster::new();
        let flow = UploadFlow::new(
            bridge,
            toaster.clone(),
            UploadSettings::default(),
            PreviewGenerator::default(),
        );
        (flow, toaster)
    }

    fn pdf(path: &str) -> SelectedFile {
        SelectedFile::new(path, sample_pdf(2))
    }

    #[tokio::test(start_paused = true)]
    async fn empty_submission_reports_title_and_file_errors() {
        let bridge = ScriptedBridge::new();
        let (mut flow, toaster) = flow(bridge.clone());

        let err = flow.submit().await.expect_err("nothing filled in");

        let errors = match err {
            UploadError::Validation(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        };
        assert_eq!(errors.keys().copied().collect::<Vec<_>>(), [UploadField::Title, UploadField::File]);
        assert_eq!(errors[&UploadField::Title], TITLE_REQUIRED);
        assert_eq!(errors[&UploadField::File], FILE_REQUIRED);
        assert_eq!(flow.state(), UploadState::Idle);
        assert_eq!(flow.draft().errors, errors);
        assert_eq!(toaster.last(), Some(Notification::error("Error", FIELDS_REQUIRED)));
        assert!(bridge.books().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn whitespace_title_counts_as_missing() {
        let (mut flow, _) = flow(ScriptedBridge::new());
        flow.set_title("   ");
        assert!(flow.select_files(vec![pdf("/books/dune.pdf")]).await);

        let err = flow.submit().await.expect_err("blank title");

        assert!(matches!(err, UploadError::Validation(ref errors) if errors.len() == 1));
        assert_eq!(flow.state(), UploadState::PreviewReady);
    }

    #[tokio::test(start_paused = true)]
    async fn editing_fields_clears_their_errors() {
        let (mut flow, _) = flow(ScriptedBridge::new());
        let _ = flow.submit().await;

        flow.set_title("Dune");
        assert!(!flow.draft().errors.contains_key(&UploadField::Title));

        flow.select_files(vec![pdf("/books/dune.pdf")]).await;
        assert!(flow.draft().errors.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_a_pdf_renders_its_preview() {
        let (mut flow, _) = flow(ScriptedBridge::new());

        assert!(flow.select_files(vec![pdf("/books/dune.pdf")]).await);

        let draft = flow.draft();
        assert_eq!(flow.state(), UploadState::PreviewReady);
        assert_eq!(draft.file.map(|file| file.name), Some("dune.pdf".to_string()));
        let PreviewStatus::Ready(image) = draft.preview else {
            panic!("preview should be ready");
        };
        assert_eq!((image.width, image.height), (232, 300));
    }

    #[tokio::test(start_paused = true)]
    async fn first_pdf_of_a_batch_replaces_previous_selection() {
        let (mut flow, _) = flow(ScriptedBridge::new());
        flow.select_files(vec![pdf("/books/a.pdf")]).await;

        let batch = vec![
            SelectedFile::new("/notes/todo.txt", b"buy milk".to_vec()),
            pdf("/books/b.pdf"),
            pdf("/books/c.pdf"),
        ];
        assert!(flow.select_files(batch).await);

        assert_eq!(flow.draft().file.map(|file| file.name), Some("b.pdf".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn batch_without_pdf_is_ignored() {
        let (mut flow, _) = flow(ScriptedBridge::new());

        let accepted =
            flow.select_files(vec![SelectedFile::new("/notes/todo.txt", b"milk".to_vec())]).await;

        assert!(!accepted);
        assert_eq!(flow.state(), UploadState::Idle);
        assert_eq!(flow.draft().file, None);
    }

    #[tokio::test(start_paused = true)]
    async fn broken_pdf_still_allows_submission() {
        let bridge = ScriptedBridge::new();
        let (mut flow, toaster) = flow(bridge.clone());
        flow.set_title("Broken");

        flow.select_files(vec![SelectedFile::new("/books/broken.pdf", b"garbage".to_vec())]).await;

        assert_eq!(flow.state(), UploadState::PreviewFailed);
        assert!(matches!(flow.draft().preview, PreviewStatus::Failed(_)));
        assert_eq!(toaster.last().map(|toast| toast.description), Some(PREVIEW_FAILED.to_string()));

        flow.submit().await.expect("submission is still allowed");
        assert_eq!(bridge.books()[0].file_path, "/books/broken.pdf");
    }

    #[tokio::test(start_paused = true)]
    async fn remove_file_returns_to_idle() {
        let (mut flow, _) = flow(ScriptedBridge::new());
        flow.select_files(vec![pdf("/books/dune.pdf")]).await;

        flow.remove_file();

        let draft = flow.draft();
        assert_eq!(flow.state(), UploadState::Idle);
        assert_eq!(draft.file, None);
        assert_eq!(draft.preview, PreviewStatus::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_submission_sends_book_and_closes_after_delay() {
        let bridge = ScriptedBridge::new();
        let (mut flow, toaster) = flow(bridge.clone());
        flow.set_title("  Dune ");
        flow.select_files(vec![pdf("/books/dune.pdf")]).await;

        flow.submit().await.expect("insert succeeds");

        assert_eq!(
            bridge.books(),
            vec![NewBook {
                title: "Dune".to_string(),
                author: None,
                file_path: "/books/dune.pdf".to_string(),
            }]
        );
        assert!(!flow.is_open());
        assert_eq!(flow.state(), UploadState::Idle);
        assert_eq!(flow.draft(), UploadDraft::default());

        let toast = toaster.last().expect("success toast");
        assert_eq!(toast.variant, ToastVariant::Default);
        assert_eq!(toast.title, BOOK_ADDED);
        assert_eq!(toast.description, BOOK_ADDED_DESCRIPTION);
    }

    #[tokio::test(start_paused = true)]
    async fn success_holds_full_progress_until_the_dialog_closes() {
        let (mut flow, _) = flow(ScriptedBridge::new());
        flow.set_title("Dune");
        flow.set_author("Frank Herbert");
        flow.select_files(vec![pdf("/books/dune.pdf")]).await;

        let pending = timeout(Duration::from_millis(500), flow.submit()).await;

        assert!(pending.is_err(), "dialog closes only after the delay");
        assert_eq!(flow.state(), UploadState::Done);
        assert_eq!(flow.draft().progress, 100);
        assert!(flow.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_insert_keeps_fields_and_resets_progress() {
        let bridge = ScriptedBridge::with_replies([Reply::Delay(1200, Some("database is locked"))]);
        let (mut flow, toaster) = flow(bridge.clone());
        flow.set_title("Dune");
        flow.set_author("Frank Herbert");
        flow.select_files(vec![pdf("/books/dune.pdf")]).await;

        let err = flow.submit().await.expect_err("backend rejects");

        assert!(matches!(err, UploadError::Command(CommandError::Rejected(_))));
        assert_eq!(flow.state(), UploadState::Failed);
        assert!(flow.is_open());

        let draft = flow.draft();
        assert_eq!(draft.progress, 0);
        assert_eq!(draft.title, "Dune");
        assert_eq!(draft.author, "Frank Herbert");
        assert!(draft.file.is_some());
        assert_eq!(toaster.last(), Some(Notification::error("Error", ADD_FAILED)));

        flow.submit().await.expect("retry succeeds");
        assert_eq!(bridge.books().len(), 2);
        assert_eq!(bridge.books()[1].author.as_deref(), Some("Frank Herbert"));
    }

    #[tokio::test(start_paused = true)]
    async fn progress_advances_while_the_insert_is_pending() {
        let (mut flow, _) = flow(ScriptedBridge::with_replies([Reply::Hang]));
        flow.set_title("Dune");
        flow.select_files(vec![pdf("/books/dune.pdf")]).await;

        let _ = timeout(Duration::from_millis(1600), flow.submit()).await;

        assert_eq!(flow.state(), UploadState::Submitting);
        assert_eq!(flow.draft().progress, 30);
    }

    #[tokio::test(start_paused = true)]
    async fn closing_mid_submit_stops_the_progress_timer() {
        let (mut flow, _) = flow(ScriptedBridge::with_replies([Reply::Hang]));
        flow.set_title("Dune");
        flow.select_files(vec![pdf("/books/dune.pdf")]).await;
        let meter = flow.progress();

        let _ = timeout(Duration::from_millis(1200), flow.submit()).await;
        assert_eq!(meter.ticks(), 2);

        flow.close();
        let ticks = meter.ticks();
        sleep(Duration::from_secs(10)).await;

        assert_eq!(meter.ticks(), ticks);
        assert_eq!(meter.percent(), 0);
        assert!(!flow.is_open());
        assert_eq!(flow.draft(), UploadDraft::default());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_flow_releases_the_timer() {
        let (mut flow, _) = flow(ScriptedBridge::with_replies([Reply::Hang]));
        flow.set_title("Dune");
        flow.select_files(vec![pdf("/books/dune.pdf")]).await;
        let meter = flow.progress();

        let _ = timeout(Duration::from_millis(700), flow.submit()).await;
        drop(flow);
        let ticks = meter.ticks();
        sleep(Duration::from_secs(10)).await;

        assert_eq!(meter.ticks(), ticks);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_dialog_refuses_to_submit() {
        let (mut flow, _) = flow(ScriptedBridge::new());
        flow.close();

        assert!(matches!(flow.submit().await, Err(UploadError::Closed)));

        flow.open();
        assert!(matches!(flow.submit().await, Err(UploadError::Validation(_))));
    }

    fn transitions(rx: &mut broadcast::Receiver<UploadState>) -> Vec<UploadState> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn preview_shows_generating_until_the_job_completes() {
        let (mut flow, _) = flow(ScriptedBridge::new());

        let job = flow.begin_selection(vec![pdf("/books/dune.pdf")]).expect("a PDF was selected");

        assert_eq!(flow.state(), UploadState::FileSelected);
        assert_eq!(flow.draft().preview, PreviewStatus::Generating);

        let resolved = job.resolve().await;
        assert_eq!(flow.draft().preview, PreviewStatus::Generating);
        assert!(flow.complete_preview(resolved));

        assert_eq!(flow.state(), UploadState::PreviewReady);
        assert!(matches!(flow.draft().preview, PreviewStatus::Ready(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn preview_of_a_replaced_file_is_discarded() {
        let (mut flow, _) = flow(ScriptedBridge::new());
        let first = flow.begin_selection(vec![pdf("/books/a.pdf")]).expect("a.pdf");
        let second = flow.begin_selection(vec![pdf("/books/b.pdf")]).expect("b.pdf");

        assert!(!flow.complete_preview(first.resolve().await));
        assert_eq!(flow.draft().preview, PreviewStatus::Generating);

        assert!(flow.complete_preview(second.resolve().await));
        assert_eq!(flow.draft().file.map(|file| file.name), Some("b.pdf".to_string()));
        assert_eq!(flow.state(), UploadState::PreviewReady);
    }

    #[tokio::test(start_paused = true)]
    async fn removing_the_file_discards_its_pending_preview() {
        let (mut flow, _) = flow(ScriptedBridge::new());
        let job = flow.begin_selection(vec![pdf("/books/dune.pdf")]).expect("dune.pdf");

        flow.remove_file();

        assert!(!flow.complete_preview(job.resolve().await));
        assert_eq!(flow.state(), UploadState::Idle);
        assert_eq!(flow.draft().preview, PreviewStatus::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_submission_publishes_every_transition() {
        let (mut flow, _) = flow(ScriptedBridge::new());
        let mut rx = flow.subscribe();
        flow.set_title("Dune");
        flow.select_files(vec![pdf("/books/dune.pdf")]).await;

        flow.submit().await.expect("insert succeeds");

        assert_eq!(
            transitions(&mut rx),
            [
                UploadState::FileSelected,
                UploadState::PreviewReady,
                UploadState::Validating,
                UploadState::Submitting,
                UploadState::Done,
                UploadState::Idle,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_validation_publishes_validating_then_restores() {
        let (mut flow, _) = flow(ScriptedBridge::new());
        flow.select_files(vec![pdf("/books/dune.pdf")]).await;
        let mut rx = flow.subscribe();

        let _ = flow.submit().await;

        assert_eq!(transitions(&mut rx), [UploadState::Validating, UploadState::PreviewReady]);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_author_is_sent_as_null() {
        let bridge = ScriptedBridge::new();
        let (mut flow, _) = flow(bridge.clone());
        flow.set_title("Dune");
        flow.set_author("   ");
        flow.select_files(vec![pdf("/books/dune.pdf")]).await;

        flow.submit().await.expect("insert succeeds");

        assert_eq!(bridge.books()[0].author, None);
    }
}
