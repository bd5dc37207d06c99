//! Async page session.
//!
//! Each navigation issues a [`RenderTicket`], awaits the renderer and only
//! applies the surface if no newer ticket was issued in the meantime. Slow
//! renders for pages the reader already left are reported as
//! [`RenderOutcome::Stale`] and dropped.

use crate::{NavIntent, PageViewState, RenderTicket, ToolbarState};
use async_trait::async_trait;
use doc_model::{Document, TargetBox, ViewerSettings};
use parking_lot::Mutex;
use pdf_engine::{DecodeError, PageRasterizer, PdfEngine, RenderedSurface};
use tracing::{debug, warn};

#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn page_count(&self, document: &Document) -> Result<u32, DecodeError>;

    async fn render(
        &self,
        document: &Document,
        page_number: u32,
        target: TargetBox,
    ) -> Result<RenderedSurface, DecodeError>;
}

/// Renders through a [`PageRasterizer`], keeping decoded documents open
/// between calls.
pub struct EngineRenderer<E> {
    rasterizer: Mutex<PageRasterizer<E>>,
}

impl<E: PdfEngine> EngineRenderer<E> {
    pub fn new(engine: E) -> Self {
        Self { rasterizer: Mutex::new(PageRasterizer::new(engine)) }
    }
}

#[async_trait]
impl<E: PdfEngine + Send> PageRenderer for EngineRenderer<E> {
    async fn page_count(&self, document: &Document) -> Result<u32, DecodeError> {
        self.rasterizer.lock().page_count(document)
    }

    async fn render(
        &self,
        document: &Document,
        page_number: u32,
        target: TargetBox,
    ) -> Result<RenderedSurface, DecodeError> {
        self.rasterizer.lock().render(document, page_number, target)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Applied { page: u32 },
    /// A newer request was issued while this one was rendering.
    Stale { page: u32 },
    /// Navigation was a no-op (boundary or same page).
    Unchanged,
    Failed { page: u32, error: DecodeError },
}

pub struct ViewerSession<R> {
    renderer: R,
    document: Document,
    target: TargetBox,
    state: Mutex<PageViewState>,
    visible: Mutex<Option<RenderedSurface>>,
    last_error: Mutex<Option<DecodeError>>,
}

impl<R: PageRenderer> ViewerSession<R> {
    /// Decode the document once to learn its page count. Nothing is drawn
    /// until [`ViewerSession::refresh`] or a navigation call.
    pub async fn open(
        renderer: R,
        document: Document,
        settings: &ViewerSettings,
    ) -> Result<Self, DecodeError> {
        let total_pages = renderer.page_count(&document).await?;
        let target = TargetBox::new(settings.target_width as f32, settings.target_height as f32);

        debug!(
            document = %document.id,
            total_pages,
            policy = ?settings.boundary_policy,
            "opened viewer session"
        );

        Ok(Self {
            renderer,
            document,
            target,
            state: Mutex::new(PageViewState::new(total_pages, settings.boundary_policy)),
            visible: Mutex::new(None),
            last_error: Mutex::new(None),
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn state(&self) -> PageViewState {
        self.state.lock().clone()
    }

    pub fn toolbar(&self) -> ToolbarState {
        self.state.lock().toolbar()
    }

    pub fn visible(&self) -> Option<RenderedSurface> {
        self.visible.lock().clone()
    }

    pub fn visible_page(&self) -> Option<u32> {
        self.visible.lock().as_ref().map(|surface| surface.page_number)
    }

    pub fn last_error(&self) -> Option<DecodeError> {
        self.last_error.lock().clone()
    }

    pub async fn refresh(&self) -> RenderOutcome {
        let ticket = self.state.lock().reload();
        self.render(ticket).await
    }

    pub async fn next(&self) -> RenderOutcome {
        self.apply(NavIntent::Next).await
    }

    pub async fn prev(&self) -> RenderOutcome {
        self.apply(NavIntent::Prev).await
    }

    pub async fn apply(&self, intent: NavIntent) -> RenderOutcome {
        let ticket = self.state.lock().apply(intent);
        self.dispatch(ticket).await
    }

    pub async fn go_to(&self, page: u32) -> RenderOutcome {
        let ticket = self.state.lock().go_to(page);
        self.dispatch(ticket).await
    }

    async fn dispatch(&self, ticket: Option<RenderTicket>) -> RenderOutcome {
        match ticket {
            Some(ticket) => self.render(ticket).await,
            None => RenderOutcome::Unchanged,
        }
    }

    async fn render(&self, ticket: RenderTicket) -> RenderOutcome {
        let result = self.renderer.render(&self.document, ticket.page, self.target).await;

        let current = self.state.lock().is_current(&ticket);
        if !current {
            debug!(
                document = %self.document.id,
                page = ticket.page,
                generation = ticket.generation,
                "discarded stale render"
            );
            return RenderOutcome::Stale { page: ticket.page };
        }

        match result {
            Ok(surface) => {
                *self.visible.lock() = Some(surface);
                *self.last_error.lock() = None;
                RenderOutcome::Applied { page: ticket.page }
            }
            Err(error) => {
                warn!(document = %self.document.id, page = ticket.page, "render failed: {error}");
                *self.last_error.lock() = Some(error.clone());
                RenderOutcome::Failed { page: ticket.page, error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{BoundaryPolicy, DocumentId};
    use pdf_engine::fixtures::sample_pdf;
    use pdf_engine::LopdfEngine;
    use std::collections::HashMap;
    use tokio::sync::oneshot;

    /// Holds renders of selected pages until the test releases them.
    struct GatedRenderer {
        inner: EngineRenderer<LopdfEngine>,
        gates: Mutex<HashMap<u32, oneshot::Receiver<()>>>,
    }

    impl GatedRenderer {
        fn new() -> Self {
            Self { inner: EngineRenderer::new(LopdfEngine::new()), gates: Mutex::new(HashMap::new()) }
        }

        fn gate(&self, page: u32) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().insert(page, rx);
            tx
        }
    }

    #[async_trait]
    impl PageRenderer for GatedRenderer {
        async fn page_count(&self, document: &Document) -> Result<u32, DecodeError> {
            self.inner.page_count(document).await
        }

        async fn render(
            &self,
            document: &Document,
            page_number: u32,
            target: TargetBox,
        ) -> Result<RenderedSurface, DecodeError> {
            let gate = self.gates.lock().remove(&page_number);
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.inner.render(document, page_number, target).await
        }
    }

    fn settings(policy: BoundaryPolicy) -> ViewerSettings {
        ViewerSettings { boundary_policy: policy, target_width: 306, target_height: 396 }
    }

    fn document(pages: u32) -> Document {
        Document::new(DocumentId::new("book"), sample_pdf(pages))
    }

    #[tokio::test]
    async fn first_refresh_shows_page_one() {
        let session = ViewerSession::open(
            EngineRenderer::new(LopdfEngine::new()),
            document(3),
            &settings(BoundaryPolicy::Clamp),
        )
        .await
        .expect("session should open");

        assert_eq!(session.visible_page(), None);
        assert_eq!(session.refresh().await, RenderOutcome::Applied { page: 1 });

        let surface = session.visible().expect("page 1 is visible");
        assert_eq!((surface.width(), surface.height()), (306, 396));
        assert_eq!(session.toolbar().label, "1 / 3");
    }

    #[tokio::test]
    async fn latest_request_wins_when_renders_finish_out_of_order() {
        let renderer = GatedRenderer::new();
        let release_page_two = renderer.gate(2);
        let session = ViewerSession::open(renderer, document(5), &settings(BoundaryPolicy::Clamp))
            .await
            .expect("session should open");

        let slow = session.next();
        let fast = async {
            while session.state().generation() < 1 {
                tokio::task::yield_now().await;
            }
            let outcome = session.next().await;
            let _ = release_page_two.send(());
            outcome
        };

        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(fast, RenderOutcome::Applied { page: 3 });
        assert_eq!(slow, RenderOutcome::Stale { page: 2 });
        assert_eq!(session.visible_page(), Some(3));
        assert_eq!(session.state().current_page(), 3);
    }

    #[tokio::test]
    async fn clamp_policy_keeps_last_page_on_next() {
        let session = ViewerSession::open(
            EngineRenderer::new(LopdfEngine::new()),
            document(2),
            &settings(BoundaryPolicy::Clamp),
        )
        .await
        .expect("session should open");

        assert_eq!(session.go_to(2).await, RenderOutcome::Applied { page: 2 });
        assert_eq!(session.next().await, RenderOutcome::Unchanged);
        assert_eq!(session.visible_page(), Some(2));
        assert_eq!(session.last_error(), None);
    }

    #[tokio::test]
    async fn pass_through_policy_fails_past_the_end_and_keeps_last_surface() {
        let session = ViewerSession::open(
            EngineRenderer::new(LopdfEngine::new()),
            document(2),
            &settings(BoundaryPolicy::PassThrough),
        )
        .await
        .expect("session should open");

        assert_eq!(session.go_to(2).await, RenderOutcome::Applied { page: 2 });

        let expected = DecodeError::PageOutOfRange { page: 3, page_count: 2 };
        assert_eq!(session.next().await, RenderOutcome::Failed { page: 3, error: expected.clone() });
        assert_eq!(session.visible_page(), Some(2));
        assert_eq!(session.last_error(), Some(expected));

        assert_eq!(session.prev().await, RenderOutcome::Applied { page: 2 });
        assert_eq!(session.last_error(), None);
    }

    #[tokio::test]
    async fn prev_on_first_page_is_unchanged() {
        let session = ViewerSession::open(
            EngineRenderer::new(LopdfEngine::new()),
            document(2),
            &settings(BoundaryPolicy::PassThrough),
        )
        .await
        .expect("session should open");

        assert_eq!(session.prev().await, RenderOutcome::Unchanged);
        assert_eq!(session.state().current_page(), 1);
    }

    #[tokio::test]
    async fn corrupted_document_fails_to_open() {
        let result = ViewerSession::open(
            EngineRenderer::new(LopdfEngine::new()),
            Document::new(DocumentId::new("broken"), b"not a pdf".to_vec()),
            &settings(BoundaryPolicy::Clamp),
        )
        .await;

        assert!(matches!(result, Err(DecodeError::Malformed { .. })));
    }
}
