//! Listing Uploads Library
//!
//! Coordinates direct uploads of listing images. The [`UploadOrchestrator`] owns
//! every piece of widget state (preview entries, the preview pane and the form's
//! hidden reference fields) and mutates it from a single event loop. Each file is
//! uploaded by its own [`Transfer`] task, which reports back exclusively through
//! [`TransferEvent`]s and can be cancelled at any point before it finishes.

pub mod backend;
pub mod events;
pub mod input;
pub mod orchestrator;
pub mod pane;
pub mod preview;
pub mod registry;
pub mod transfer;

// Re-export commonly used types
pub use backend::DirectUploadBackend;
pub use events::{TransferEvent, TransferEventKind, UiEvent};
pub use input::FileInput;
pub use orchestrator::{OrchestratorOptions, UploadOrchestrator};
pub use pane::{MemoryPane, PaneOp, PreviewPane};
pub use preview::{load_thumbnail, PreviewEntry, PreviewView};
pub use registry::{AttachmentForm, FormField};
pub use transfer::{Transfer, TransferHandle};
