//! Display labels for schedule items.
//!
//! Pure formatting: output depends only on the release date and position.

use crate::schedule::ContentItem;

/// Decorative markers cycled by item position.
pub const LOCK_MARKERS: [&str; 5] = ["\u{1F48C}", "\u{1F49D}", "\u{1F497}", "\u{1F496}", "\u{1F498}"];

/// Label shown under the always-unlocked first item.
pub const FIRST_LABEL: &str = "First message";

/// Label for a locked item, e.g. `"Unlocks on 11 Feb 💝"`.
pub fn unlock_label(item: &ContentItem, position: usize) -> String {
    let marker = LOCK_MARKERS[position % LOCK_MARKERS.len()];
    format!(
        "Unlocks on {} {}",
        item.release_date.format("%-d %b"),
        marker
    )
}

/// One-based name for an item at `position`.
pub fn display_label(position: usize) -> String {
    format!("Message {}", position + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn item(date: &str) -> ContentItem {
        ContentItem::new(2, date.parse::<NaiveDate>().unwrap(), "")
    }

    #[test]
    fn unlock_label_formats_day_without_padding() {
        assert_eq!(unlock_label(&item("2026-02-01"), 1), "Unlocks on 1 Feb \u{1F49D}");
        assert_eq!(unlock_label(&item("2026-12-25"), 0), "Unlocks on 25 Dec \u{1F48C}");
    }

    #[test]
    fn unlock_label_marker_wraps_around() {
        let it = item("2026-02-11");
        assert_eq!(unlock_label(&it, 1), unlock_label(&it, 1 + LOCK_MARKERS.len()));
        assert_ne!(unlock_label(&it, 1), unlock_label(&it, 2));
    }

    #[test]
    fn display_label_is_one_based() {
        assert_eq!(display_label(0), "Message 1");
        assert_eq!(display_label(4), "Message 5");
    }
}
