use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::GeneratedImage;

/// Newest-first list of generated images with unique ids.
///
/// Serializes as a plain JSON array so the persisted blob stays readable by
/// other tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Gallery {
    images: Vec<GeneratedImage>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an ordered list, keeping the first occurrence of each id.
    pub fn from_images(images: impl IntoIterator<Item = GeneratedImage>) -> Self {
        let mut gallery = Self::new();
        gallery.append(images);
        gallery
    }

    pub fn images(&self) -> &[GeneratedImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.images.iter().any(|img| img.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&GeneratedImage> {
        self.images.iter().find(|img| img.id == id)
    }

    /// Put `image` at the front. An existing entry with the same id is replaced.
    pub fn prepend(&mut self, image: GeneratedImage) {
        self.images.retain(|img| img.id != image.id);
        self.images.insert(0, image);
    }

    /// Append to the tail in the given order, skipping ids already present.
    /// Returns how many images were added.
    pub fn append(&mut self, images: impl IntoIterator<Item = GeneratedImage>) -> usize {
        let before = self.images.len();
        for image in images {
            if !self.contains(&image.id) {
                self.images.push(image);
            }
        }
        self.images.len() - before
    }

    pub fn replace(&mut self, images: impl IntoIterator<Item = GeneratedImage>) {
        self.images.clear();
        self.append(images);
    }

    /// Remove by id. Local only: no backend is told about the deletion.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.images.iter().position(|img| img.id == id) {
            Some(idx) => {
                self.images.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let images: Vec<GeneratedImage> = serde_json::from_str(json)?;
        Ok(Self::from_images(images))
    }
}
