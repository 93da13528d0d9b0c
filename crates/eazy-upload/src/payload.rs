//! Multipart payload construction.

use std::collections::HashMap;

use crate::request::{FileSource, FormFields};

/// Name of the content type header.
pub const CONTENT_TYPE: &str = "Content-Type";

/// Content type forced on every upload request.
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// One part of a multipart payload.
#[derive(Debug)]
pub enum PayloadPart {
    /// A plain text field.
    Text {
        /// Field name.
        name: String,
        /// Field value.
        value: String,
    },
    /// The file field.
    File {
        /// Field name.
        name: String,
        /// File contents.
        source: FileSource,
    },
}

impl PayloadPart {
    /// Returns the field name of this part.
    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. } | Self::File { name, .. } => name,
        }
    }
}

/// Ordered list of multipart parts.
#[derive(Debug, Default)]
pub struct MultipartPayload {
    parts: Vec<PayloadPart>,
}

impl MultipartPayload {
    /// Builds the upload payload: every extra field in order, then the file.
    pub fn for_upload(extra_data: FormFields, field_name: String, file: FileSource) -> Self {
        let mut payload = Self::default();
        for (name, value) in extra_data {
            payload.push_text(name, value);
        }
        payload.push_file(field_name, file);
        payload
    }

    /// Appends a text field.
    pub fn push_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parts.push(PayloadPart::Text {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Appends a file field.
    pub fn push_file(&mut self, name: impl Into<String>, source: FileSource) {
        self.parts.push(PayloadPart::File {
            name: name.into(),
            source,
        });
    }

    /// Returns the parts in send order.
    pub fn parts(&self) -> &[PayloadPart] {
        &self.parts
    }

    /// Returns the field names in send order.
    pub fn field_names(&self) -> Vec<&str> {
        self.parts.iter().map(PayloadPart::name).collect()
    }

    /// Returns the number of parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns whether the payload has no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl IntoIterator for MultipartPayload {
    type IntoIter = std::vec::IntoIter<PayloadPart>;
    type Item = PayloadPart;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.into_iter()
    }
}

/// Merges caller headers with the multipart content type.
///
/// Caller headers are applied first; any `Content-Type` among them, in any
/// letter case, is replaced by [`MULTIPART_FORM_DATA`].
pub fn merge_headers(headers: HashMap<String, String>) -> HashMap<String, String> {
    let mut merged: HashMap<String, String> = headers
        .into_iter()
        .filter(|(name, _)| !name.eq_ignore_ascii_case(CONTENT_TYPE))
        .collect();
    merged.insert(CONTENT_TYPE.to_owned(), MULTIPART_FORM_DATA.to_owned());
    merged
}
