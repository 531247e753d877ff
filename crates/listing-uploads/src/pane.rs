use crate::preview::PreviewView;

/// Where previews are drawn.
///
/// Calls are made synchronously from the orchestrator's event loop, and
/// `mount` returns before the entry's transfer is spawned.
pub trait PreviewPane {
    fn mount(&mut self, view: &PreviewView);
    fn update(&mut self, view: &PreviewView);
    fn unmount(&mut self, preview_id: &str);
}

/// A pane that keeps rendered views in memory, in mount order.
#[derive(Debug, Default)]
pub struct MemoryPane {
    views: Vec<PreviewView>,
    history: Vec<PaneOp>,
}

/// Calls received by a [`MemoryPane`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneOp {
    Mount(PreviewView),
    Update(PreviewView),
    Unmount(String),
}

impl MemoryPane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn views(&self) -> &[PreviewView] {
        &self.views
    }

    pub fn view(&self, file_name: &str) -> Option<&PreviewView> {
        self.views.iter().find(|v| v.file_name == file_name)
    }

    pub fn history(&self) -> &[PaneOp] {
        &self.history
    }

    /// Every view this pane has shown for `file_name`, oldest first.
    pub fn history_for(&self, file_name: &str) -> Vec<&PreviewView> {
        self.history
            .iter()
            .filter_map(|op| match op {
                PaneOp::Mount(v) | PaneOp::Update(v) if v.file_name == file_name => Some(v),
                _ => None,
            })
            .collect()
    }
}

impl PreviewPane for MemoryPane {
    fn mount(&mut self, view: &PreviewView) {
        self.views.push(view.clone());
        self.history.push(PaneOp::Mount(view.clone()));
    }

    fn update(&mut self, view: &PreviewView) {
        if let Some(existing) = self.views.iter_mut().find(|v| v.id == view.id) {
            *existing = view.clone();
        }
        self.history.push(PaneOp::Update(view.clone()));
    }

    fn unmount(&mut self, preview_id: &str) {
        self.views.retain(|v| v.id != preview_id);
        self.history.push(PaneOp::Unmount(preview_id.to_string()));
    }
}
