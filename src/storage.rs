// SPDX-License-Identifier: GPL-3.0-only

//! In-memory photo collection
//!
//! Insertion-ordered list of captured photos, each with a user rating in
//! `0..=10`. Nothing here touches the camera or the network.

use crate::backends::camera::types::CapturedImage;
use crate::constants::gallery::{MAX_RATING, MIN_RATING};
use chrono::{DateTime, Local};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// One photo in the collection
#[derive(Debug, Clone)]
pub struct PhotoItem {
    pub id: Uuid,
    pub image: Arc<CapturedImage>,
    pub rating: u8,
    pub added_at: DateTime<Local>,
}

/// Ordered collection of photos
#[derive(Debug, Default)]
pub struct PhotoStore {
    items: Vec<PhotoItem>,
}

impl PhotoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a photo with rating 0
    pub fn add(&mut self, image: Arc<CapturedImage>) -> PhotoItem {
        let item = PhotoItem {
            id: Uuid::new_v4(),
            image,
            rating: MIN_RATING,
            added_at: Local::now(),
        };
        debug!(id = %item.id, count = self.items.len() + 1, "Photo added");
        self.items.push(item.clone());
        item
    }

    /// Set the rating of `id`, clamped to `0..=10`
    ///
    /// Returns false (and changes nothing) if `id` is not in the store.
    pub fn update_rating(&mut self, id: Uuid, rating: i32) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            debug!(%id, "Rating update for unknown photo ignored");
            return false;
        };
        item.rating = rating.clamp(i32::from(MIN_RATING), i32::from(MAX_RATING)) as u8;
        true
    }

    /// Remove `id`; returns the removed item if it was present
    pub fn remove(&mut self, id: Uuid) -> Option<PhotoItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn get(&self, id: Uuid) -> Option<&PhotoItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Items in insertion order
    pub fn items(&self) -> &[PhotoItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> Arc<CapturedImage> {
        Arc::new(CapturedImage::from_rgba(1, 1, vec![0, 0, 0, 255]))
    }

    #[test]
    fn test_add_defaults_rating_to_zero() {
        let mut store = PhotoStore::new();
        let item = store.add(image());
        assert_eq!(item.rating, 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_rating_clamps() {
        let mut store = PhotoStore::new();
        let id = store.add(image()).id;

        assert!(store.update_rating(id, 15));
        assert_eq!(store.get(id).unwrap().rating, 10);

        assert!(store.update_rating(id, -3));
        assert_eq!(store.get(id).unwrap().rating, 0);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut store = PhotoStore::new();
        let id = store.add(image()).id;
        assert!(!store.update_rating(Uuid::new_v4(), 5));
        assert_eq!(store.get(id).unwrap().rating, 0);
    }

    #[test]
    fn test_removed_item_ignores_rating() {
        let mut store = PhotoStore::new();
        let id = store.add(image()).id;
        assert!(store.remove(id).is_some());
        assert!(!store.update_rating(id, 4));
        assert!(store.is_empty());
    }

    #[test]
    fn test_items_keep_insertion_order() {
        let mut store = PhotoStore::new();
        let first = store.add(image()).id;
        let second = store.add(image()).id;
        let ids: Vec<_> = store.items().iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![first, second]);

        store.clear();
        assert!(store.is_empty());
    }
}
