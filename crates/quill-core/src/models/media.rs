use std::fmt;

/// A file received in a request. Consumed once by the media pipeline; only the
/// resulting URL outlives the request.
#[derive(Clone)]
pub struct UploadedFile {
    pub original_filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(
        original_filename: impl Into<String>,
        content_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        Self {
            original_filename: original_filename.into(),
            content_type: content_type.into(),
            content,
        }
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("original_filename", &self.original_filename)
            .field("content_type", &self.content_type)
            .field("size_bytes", &self.content.len())
            .finish()
    }
}
