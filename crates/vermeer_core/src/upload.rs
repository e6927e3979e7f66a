//! Uploaded reference image capability.

use std::io::{Cursor, Read, Seek, SeekFrom};

/// Capability contract for uploaded reference images: a seekable byte
/// stream with a filename and a declared MIME type.
///
/// Adapters and the shared data-URL transform depend on this trait rather
/// than on any concrete upload representation.
pub trait ImageSource: Send {
    /// Original filename of the upload.
    fn filename(&self) -> &str;

    /// MIME type declared by the uploader, if any.
    fn content_type(&self) -> Option<&str>;

    /// Read the full contents.
    ///
    /// The stream is rewound to position 0 before reading and again after,
    /// so callers may read the same source repeatedly.
    fn read_bytes(&mut self) -> std::io::Result<Vec<u8>>;
}

/// In-memory uploaded image, as handed over by the multipart layer.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    filename: String,
    content_type: Option<String>,
    cursor: Cursor<Vec<u8>>,
}

impl ImageUpload {
    /// Wraps upload bytes with their filename and declared MIME type.
    pub fn new(
        filename: impl Into<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            cursor: Cursor::new(bytes),
        }
    }

    /// Size of the upload in bytes.
    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    /// True when the upload carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }
}

impl ImageSource for ImageUpload {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn read_bytes(&mut self) -> std::io::Result<Vec<u8>> {
        self.cursor.seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::with_capacity(self.len());
        self.cursor.read_to_end(&mut bytes)?;
        self.cursor.seek(SeekFrom::Start(0))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_bytes_rewinds_for_repeat_reads() {
        let mut upload = ImageUpload::new("cat.png", Some("image/png".to_string()), vec![1, 2, 3]);
        assert_eq!(upload.read_bytes().unwrap(), vec![1, 2, 3]);
        // A second read sees the full contents again.
        assert_eq!(upload.read_bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn exposes_filename_and_declared_mime() {
        let upload = ImageUpload::new("cat.png", Some("image/png".to_string()), vec![0]);
        assert_eq!(upload.filename(), "cat.png");
        assert_eq!(upload.content_type(), Some("image/png"));
        assert_eq!(upload.len(), 1);
    }
}
