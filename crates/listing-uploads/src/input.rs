use listing_core::SelectedFile;

/// A file input element: the current selection plus the direct-upload URL it
/// advertises.
#[derive(Debug, Clone, Default)]
pub struct FileInput {
    files: Vec<SelectedFile>,
    direct_upload_url: Option<String>,
}

impl FileInput {
    pub fn new(files: Vec<SelectedFile>) -> Self {
        Self {
            files,
            direct_upload_url: None,
        }
    }

    pub fn with_direct_upload_url(mut self, url: impl Into<String>) -> Self {
        self.direct_upload_url = Some(url.into());
        self
    }

    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    pub fn direct_upload_url(&self) -> Option<&str> {
        self.direct_upload_url.as_deref()
    }

    /// Clear the selection so the same file can be picked again.
    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
