//! Image attachments referenced from the input line by `[Image #N]`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [(&str, &str); 5] = [
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

/// Which attachments accompany a submitted message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentPolicy {
    /// Only attachments whose placeholder is still in the submitted text.
    #[default]
    Referenced,
    /// Every attachment added since the last submit.
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub id: u64,
    pub path: PathBuf,
    pub mime_type: String,
}

impl ImageAttachment {
    pub fn placeholder(&self) -> String {
        placeholder(self.id)
    }
}

/// Placeholder text for attachment `id`.
pub fn placeholder(id: u64) -> String {
    format!("[Image #{id}]")
}

/// MIME type for a supported image path, by extension.
pub fn image_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

/// Interpret pasted text as a single existing image file path.
///
/// Terminals often paste dragged files quoted or with escaped spaces.
pub fn pasted_image_path(pasted: &str) -> Option<PathBuf> {
    let trimmed = pasted.trim();
    if trimmed.is_empty() || trimmed.contains('\n') {
        return None;
    }
    let unquoted = trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
        .unwrap_or(trimmed);
    let path = PathBuf::from(unquoted.replace("\\ ", " "));
    if image_mime_type(&path).is_some() && path.is_file() {
        Some(path)
    } else {
        None
    }
}

/// Attachments added since the last submit.
#[derive(Debug, Clone)]
pub struct AttachmentList {
    next_id: u64,
    items: Vec<ImageAttachment>,
}

impl Default for AttachmentList {
    fn default() -> Self {
        Self {
            next_id: 1,
            items: Vec::new(),
        }
    }
}

impl AttachmentList {
    /// Register an image. Returns `None` for unsupported extensions.
    pub fn add(&mut self, path: &Path) -> Option<&ImageAttachment> {
        let mime_type = image_mime_type(path)?;
        let id = self.next_id;
        self.next_id += 1;
        self.items.push(ImageAttachment {
            id,
            path: path.to_path_buf(),
            mime_type: mime_type.to_string(),
        });
        tracing::debug!(id, path = %path.display(), "image attached");
        self.items.last()
    }

    /// Drop an attachment. Its placeholder text is left for the caller to
    /// remove.
    pub fn remove(&mut self, id: u64) -> Option<ImageAttachment> {
        let idx = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(idx))
    }

    pub fn items(&self) -> &[ImageAttachment] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Take the attachments to send along with `text`. Ids keep increasing.
    pub fn take_for_submit(&mut self, text: &str, policy: AttachmentPolicy) -> Vec<ImageAttachment> {
        let items = std::mem::take(&mut self.items);
        match policy {
            AttachmentPolicy::All => items,
            AttachmentPolicy::Referenced => items
                .into_iter()
                .filter(|item| text.contains(&item.placeholder()))
                .collect(),
        }
    }

    /// Whether submitting `text` would carry at least one attachment.
    pub fn any_for_submit(&self, text: &str, policy: AttachmentPolicy) -> bool {
        match policy {
            AttachmentPolicy::All => !self.items.is_empty(),
            AttachmentPolicy::Referenced => self
                .items
                .iter()
                .any(|item| text.contains(&item.placeholder())),
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
