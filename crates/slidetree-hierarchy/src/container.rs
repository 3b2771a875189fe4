//! Enclosing image containers.
//!
//! A hierarchy usually belongs to an image entry of a project. The entry
//! decides whether the hierarchy may be modified; the hierarchy only holds a
//! `Weak` reference to it and asks on every mutation.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Something that owns a hierarchy and controls its writability.
pub trait ImageContainer: Send + Sync {
    /// Returns `true` if the hierarchy must not be modified.
    fn is_readonly(&self) -> bool;

    /// Display name of the image.
    fn image_name(&self) -> String;
}

/// A project image entry with a toggleable readonly flag.
#[derive(Debug)]
pub struct ImageEntry {
    image_name: String,
    readonly: AtomicBool,
}

impl ImageEntry {
    pub fn new(image_name: impl Into<String>) -> Self {
        Self {
            image_name: image_name.into(),
            readonly: AtomicBool::new(false),
        }
    }

    /// Create an entry that starts out readonly.
    pub fn readonly(image_name: impl Into<String>) -> Self {
        let entry = Self::new(image_name);
        entry.set_readonly(true);
        entry
    }

    pub fn set_readonly(&self, readonly: bool) {
        self.readonly.store(readonly, Ordering::Relaxed);
    }
}

impl ImageContainer for ImageEntry {
    fn is_readonly(&self) -> bool {
        self.readonly.load(Ordering::Relaxed)
    }

    fn image_name(&self) -> String {
        self.image_name.clone()
    }
}

impl fmt::Display for ImageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageEntry({})", self.image_name)
    }
}
