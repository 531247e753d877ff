//! Hidden form fields holding the signed references of uploaded files.

use serde::Serialize;

/// One form field. Attachment fields carry the name of the file they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// The enclosing form, reduced to its ordered field list.
#[derive(Debug, Clone)]
pub struct AttachmentForm {
    attachment_field: String,
    fields: Vec<FormField>,
}

impl AttachmentForm {
    pub fn new(attachment_field: impl Into<String>) -> Self {
        Self {
            attachment_field: attachment_field.into(),
            fields: Vec::new(),
        }
    }

    pub fn attachment_field(&self) -> &str {
        &self.attachment_field
    }

    /// Append a plain field such as `listing[title]`.
    pub fn push_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(FormField {
            name: name.into(),
            value: value.into(),
            file_name: None,
        });
    }

    /// Append a hidden attachment field for `file_name`.
    pub fn register(&mut self, file_name: &str, signed_id: &str) {
        self.fields.push(FormField {
            name: self.attachment_field.clone(),
            value: signed_id.to_string(),
            file_name: Some(file_name.to_string()),
        });
        tracing::debug!(filename = %file_name, signed_id = %signed_id, "Added hidden input");
    }

    /// Remove every attachment field tagged with `file_name`.
    pub fn unregister(&mut self, file_name: &str) -> usize {
        let before = self.fields.len();
        let attachment_field = &self.attachment_field;
        self.fields.retain(|f| {
            !(f.name == *attachment_field && f.file_name.as_deref() == Some(file_name))
        });
        let removed = before - self.fields.len();
        if removed > 0 {
            tracing::debug!(filename = %file_name, removed, "Removed hidden input");
        }
        removed
    }

    /// Signed references in document order.
    pub fn attachment_values(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.name == self.attachment_field)
            .map(|f| f.value.as_str())
            .collect()
    }

    pub fn references_for(&self, file_name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.name == self.attachment_field && f.file_name.as_deref() == Some(file_name))
            .map(|f| f.value.as_str())
            .collect()
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    /// `(name, value)` pairs for submission, in document order.
    pub fn to_form_pairs(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.value.clone()))
            .collect()
    }
}
