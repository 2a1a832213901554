//! Release schedule definition.
//!
//! A [`Schedule`] is the fixed, ordered list of content items. Declaration
//! order is significant: it determines display position, labels, and which
//! item is unlocked unconditionally (the first one).
//!
//! Schedules are either the built-in default or loaded from a TOML file:
//!
//! ```toml
//! [[items]]
//! id = 1
//! release_date = "2026-02-10"
//! content = "Hello"
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::ScheduleError;

/// Stable identifier of a content item. Never reused or reordered.
pub type ItemId = u32;

/// A single scheduled content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ItemId,
    /// Calendar date on which the item becomes eligible to unlock.
    pub release_date: NaiveDate,
    /// Opaque payload, never inspected by the reconciler.
    #[serde(default)]
    pub content: String,
}

impl ContentItem {
    pub fn new(id: ItemId, release_date: NaiveDate, content: impl Into<String>) -> Self {
        Self {
            id,
            release_date,
            content: content.into(),
        }
    }

    /// Whether the item's release date has been reached on `today`.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.release_date <= today
    }
}

/// Ordered, validated, read-only list of content items.
///
/// Always holds at least one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schedule {
    items: Vec<ContentItem>,
}

/// On-disk shape of a schedule file.
#[derive(Deserialize)]
struct ScheduleFile {
    #[serde(default)]
    items: Vec<ContentItem>,
}

impl Schedule {
    /// Build a schedule, validating that it is non-empty and that ids are
    /// positive and unique.
    pub fn new(items: Vec<ContentItem>) -> Result<Self, ScheduleError> {
        if items.is_empty() {
            return Err(ScheduleError::Empty);
        }

        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if item.id == 0 {
                return Err(ScheduleError::InvalidId(item.id));
            }
            if !seen.insert(item.id) {
                return Err(ScheduleError::DuplicateId(item.id));
            }
        }

        Ok(Self { items })
    }

    /// Parse a schedule from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ScheduleError> {
        let file: ScheduleFile = toml::from_str(content)?;
        Self::new(file.items)
    }

    /// Load a schedule file from disk.
    pub fn load(path: &Path) -> Result<Self, ScheduleError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ScheduleError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&content)
    }

    /// The default five-day countdown, one message per day.
    pub fn builtin() -> Self {
        let day = |d: u32| NaiveDate::from_ymd_opt(2026, 2, d).unwrap_or(NaiveDate::MIN);
        Self {
            items: vec![
                ContentItem::new(
                    1,
                    day(10),
                    "You said yes, so the first message is yours already. \
                     The next one is a day away.",
                ),
                ContentItem::new(
                    2,
                    day(11),
                    "If you're reading this, you waited patiently. Thank you for choosing us.",
                ),
                ContentItem::new(
                    3,
                    day(12),
                    "You deserve to be loved loudly, gently, and consistently.",
                ),
                ContentItem::new(4, day(13), "Almost there. Just one more day."),
                ContentItem::new(5, day(14), "Happy Valentine's Day. We made it to today."),
            ],
        }
    }

    /// Items in declaration order.
    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    /// The unconditionally unlocked item.
    pub fn first(&self) -> &ContentItem {
        // `new` rejects empty schedules
        &self.items[0]
    }

    pub fn first_id(&self) -> ItemId {
        self.first().id
    }

    /// Total number of items in the schedule.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false for a constructed schedule.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ItemId) -> Option<&ContentItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Zero-based display position of an item.
    pub fn position(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Whether `id` is the last item, which gets the finale treatment.
    pub fn is_final(&self, id: ItemId) -> bool {
        self.items.last().is_some_and(|item| item.id == id)
    }

    /// Ids of items released on or before `today`.
    pub fn due_ids(&self, today: NaiveDate) -> impl Iterator<Item = ItemId> + '_ {
        self.items
            .iter()
            .filter(move |item| item.is_due(today))
            .map(|item| item.id)
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::builtin()
    }
}
