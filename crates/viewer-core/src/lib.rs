use doc_model::BoundaryPolicy;

pub mod session;

pub use session::{EngineRenderer, PageRenderer, RenderOutcome, ViewerSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavIntent {
    Next,
    Prev,
}

/// Identifies one render request. Only the most recently issued ticket is
/// allowed to update the visible page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTicket {
    pub generation: u64,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarState {
    pub prev_enabled: bool,
    pub next_enabled: bool,
    pub label: String,
}

pub fn toolbar_state(current_page: u32, total_pages: u32) -> ToolbarState {
    ToolbarState {
        prev_enabled: current_page > 1,
        next_enabled: current_page < total_pages,
        label: format!("{current_page} / {total_pages}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageViewState {
    current_page: u32,
    total_pages: u32,
    policy: BoundaryPolicy,
    generation: u64,
}

impl PageViewState {
    pub fn new(total_pages: u32, policy: BoundaryPolicy) -> Self {
        Self { current_page: 1, total_pages, policy, generation: 0 }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn policy(&self) -> BoundaryPolicy {
        self.policy
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn toolbar(&self) -> ToolbarState {
        toolbar_state(self.current_page, self.total_pages)
    }

    /// Request the current page again, e.g. for the first paint.
    pub fn reload(&mut self) -> RenderTicket {
        self.issue(self.current_page)
    }

    /// Jump to `page`. Returns `None` when the target is already showing.
    pub fn go_to(&mut self, page: u32) -> Option<RenderTicket> {
        let target = match self.policy {
            BoundaryPolicy::Clamp => page.clamp(1, self.total_pages.max(1)),
            BoundaryPolicy::PassThrough => page.max(1),
        };

        if target == self.current_page {
            return None;
        }
        Some(self.issue(target))
    }

    pub fn next(&mut self) -> Option<RenderTicket> {
        match self.policy {
            BoundaryPolicy::Clamp if self.current_page >= self.total_pages => None,
            _ => Some(self.issue(self.current_page.saturating_add(1))),
        }
    }

    pub fn prev(&mut self) -> Option<RenderTicket> {
        if self.current_page <= 1 {
            return None;
        }

        Some(self.issue(self.current_page - 1))
    }

    pub fn apply(&mut self, intent: NavIntent) -> Option<RenderTicket> {
        match intent {
            NavIntent::Next => self.next(),
            NavIntent::Prev => self.prev(),
        }
    }

    pub fn is_current(&self, ticket: &RenderTicket) -> bool {
        ticket.generation == self.generation
    }

    fn issue(&mut self, page: u32) -> RenderTicket {
        self.generation += 1;
        self.current_page = page;
        RenderTicket { generation: self.generation, page }
    }
}
