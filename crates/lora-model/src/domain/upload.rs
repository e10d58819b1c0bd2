use std::path::Path;

/// A file handed to the submission path by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// What an uploaded file is, judging by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// A YAML job-configuration document.
    Config,
    /// A training image.
    Image,
    /// Anything else; not forwarded to the job-execution service.
    Unsupported,
}

const CONFIG_EXTENSIONS: [&str; 2] = ["yaml", "yml"];
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    pub fn kind(&self) -> FileKind {
        match self.extension() {
            Some(ext) if CONFIG_EXTENSIONS.contains(&ext.as_str()) => FileKind::Config,
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => FileKind::Image,
            _ => FileKind::Unsupported,
        }
    }

    /// MIME type used when forwarding the file in a multipart upload.
    pub fn content_type(&self) -> &'static str {
        match self.extension().as_deref() {
            Some("yaml") | Some("yml") => "text/yaml",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            _ => "application/octet-stream",
        }
    }
}

/// Result of uploading a job to the job-execution service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub accepted: bool,
    /// Diagnostic text: the service's response body or the transport error.
    pub message: String,
}

impl SubmitOutcome {
    pub fn accepted(message: impl Into<String>) -> Self {
        Self {
            accepted: true,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            message: message.into(),
        }
    }
}
