//! Unlock reconciler.
//!
//! On every visit the reconciler merges three sources into one unlocked set:
//! the ids persisted by earlier visits, the items whose release date has
//! arrived, and the first item (always unlocked). The merged set is written
//! back before it is returned, so confirmed unlocks survive the session.
//!
//! Nothing here fails outward. Missing or corrupt data is treated as an
//! empty history and a failed write only clears [`Reconciliation::persisted`].

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::clock::{Clock, LocalClock};
use crate::label;
use crate::schedule::{ContentItem, ItemId, Schedule};
use crate::store::UnlockStore;

/// Store key the unlocked ids are kept under.
pub const DEFAULT_STORAGE_KEY: &str = "valentine-unlocked-ids";

/// Set of unlocked item ids for one visit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnlockState {
    unlocked_ids: BTreeSet<ItemId>,
}

impl UnlockState {
    pub fn from_ids(ids: impl IntoIterator<Item = ItemId>) -> Self {
        Self {
            unlocked_ids: ids.into_iter().collect(),
        }
    }

    pub fn ids(&self) -> &BTreeSet<ItemId> {
        &self.unlocked_ids
    }

    pub fn is_unlocked(&self, id: ItemId) -> bool {
        self.unlocked_ids.contains(&id)
    }

    /// Number of unlocked ids, including ids no longer in the schedule.
    pub fn unlocked_count(&self) -> usize {
        self.unlocked_ids.len()
    }

    pub fn all_unlocked(&self, schedule: &Schedule) -> bool {
        self.unlocked_count() >= schedule.len()
    }

    /// Fraction of the schedule unlocked, in `[0, 1]`.
    pub fn progress(&self, schedule: &Schedule) -> f64 {
        if schedule.is_empty() {
            return 0.0;
        }
        (self.unlocked_count() as f64 / schedule.len() as f64).min(1.0)
    }

    /// Resolve a click on an item. Clicking never changes the state.
    pub fn open<'a>(&self, schedule: &'a Schedule, id: ItemId) -> Click<'a> {
        let Some(position) = schedule.position(id) else {
            return Click::Unknown(id);
        };
        let item = &schedule.items()[position];

        if self.is_unlocked(id) {
            Click::Open {
                item,
                position,
                is_final: schedule.is_final(id),
            }
        } else {
            Click::Locked {
                item,
                position,
                label: label::unlock_label(item, position),
            }
        }
    }

    fn insert(&mut self, id: ItemId) -> bool {
        self.unlocked_ids.insert(id)
    }

    /// JSON array of ids, the persisted encoding.
    fn encode(&self) -> String {
        // A set of integers always serializes
        serde_json::to_string(&self.unlocked_ids).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Outcome of clicking an item.
#[derive(Debug, Clone, PartialEq)]
pub enum Click<'a> {
    /// Unlocked: show the content.
    Open {
        item: &'a ContentItem,
        position: usize,
        is_final: bool,
    },
    /// Locked: cosmetic rejection only.
    Locked {
        item: &'a ContentItem,
        position: usize,
        label: String,
    },
    /// No item with this id in the schedule.
    Unknown(ItemId),
}

/// What was recovered from the store at the start of a visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriorState {
    /// Nothing stored (first visit, read failure, or no store).
    Absent,
    /// Stored value was not a JSON array and was thrown away.
    Discarded,
    /// Array entries that are valid ids; `dropped` counts the rest.
    Recovered { ids: BTreeSet<ItemId>, dropped: usize },
}

impl PriorState {
    /// Parse a raw persisted value.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::Absent;
        }

        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Array(entries)) => {
                let valid: Vec<ItemId> = entries.iter().filter_map(entry_id).collect();
                Self::Recovered {
                    dropped: entries.len() - valid.len(),
                    ids: valid.into_iter().collect(),
                }
            }
            _ => Self::Discarded,
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        let ids = match self {
            Self::Recovered { ids, .. } => Some(ids.iter().copied()),
            _ => None,
        };
        ids.into_iter().flatten()
    }
}

/// Integral JSON numbers that fit an [`ItemId`]; everything else is dropped.
fn entry_id(value: &serde_json::Value) -> Option<ItemId> {
    if let Some(n) = value.as_u64() {
        return ItemId::try_from(n).ok();
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= 0.0 && f <= f64::from(ItemId::MAX) {
        Some(f as ItemId)
    } else {
        None
    }
}

/// Result of one [`Reconciler::reconcile`] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub state: UnlockState,
    /// The date the schedule was evaluated against.
    pub today: NaiveDate,
    pub prior: PriorState,
    /// Ids unlocked now that the store did not hold before this visit.
    pub newly_unlocked: BTreeSet<ItemId>,
    /// Whether the merged set reached the store.
    pub persisted: bool,
}

/// Merges stored history with the schedule for the current date.
pub struct Reconciler {
    schedule: Schedule,
    store: Box<dyn UnlockStore>,
    key: String,
    clock: Box<dyn Clock>,
}

impl Reconciler {
    /// Reconciler over `store` using the default key and the local clock.
    pub fn new(schedule: Schedule, store: impl UnlockStore + 'static) -> Self {
        Self::with_boxed_store(schedule, Box::new(store))
    }

    /// Same as [`Reconciler::new`] for a store chosen at runtime.
    pub fn with_boxed_store(schedule: Schedule, store: Box<dyn UnlockStore>) -> Self {
        Self {
            schedule,
            store,
            key: DEFAULT_STORAGE_KEY.to_string(),
            clock: Box::new(LocalClock),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reconcile against the clock's current date.
    pub fn reconcile(&self) -> Reconciliation {
        self.reconcile_on(self.clock.today())
    }

    /// Reconcile against an explicit date.
    pub fn reconcile_on(&self, today: NaiveDate) -> Reconciliation {
        let mut state = UnlockState::default();
        state.insert(self.schedule.first_id());

        let prior = self.read_prior();
        for id in prior.ids() {
            state.insert(id);
        }

        for id in self.schedule.due_ids(today) {
            state.insert(id);
        }

        let before: BTreeSet<ItemId> = prior.ids().collect();
        let newly_unlocked = state.ids().difference(&before).copied().collect();

        let persisted = self.persist(&state);

        debug!(
            %today,
            unlocked = state.unlocked_count(),
            total = self.schedule.len(),
            persisted,
            "reconciled unlock state"
        );

        Reconciliation {
            state,
            today,
            prior,
            newly_unlocked,
            persisted,
        }
    }

    fn read_prior(&self) -> PriorState {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return PriorState::Absent,
            Err(e) => {
                warn!(store = %self.store.describe(), error = %e, "could not read unlock state");
                return PriorState::Absent;
            }
        };

        let prior = PriorState::parse(&raw);
        match &prior {
            PriorState::Discarded => {
                warn!(store = %self.store.describe(), "discarding unreadable unlock state");
            }
            PriorState::Recovered { dropped, .. } if *dropped > 0 => {
                warn!(dropped, "ignoring non-integer entries in unlock state");
            }
            _ => {}
        }
        prior
    }

    fn persist(&self, state: &UnlockState) -> bool {
        match self.store.set(&self.key, &state.encode()) {
            Ok(()) => true,
            Err(e) => {
                warn!(store = %self.store.describe(), error = %e, "could not persist unlock state");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::{MemoryStore, NullStore};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn two_item_schedule() -> Schedule {
        Schedule::new(vec![
            ContentItem::new(1, date("2020-01-01"), "one"),
            ContentItem::new(2, date("2099-01-01"), "two"),
        ])
        .unwrap()
    }

    fn ids(state: &UnlockState) -> Vec<ItemId> {
        state.ids().iter().copied().collect()
    }

    #[test]
    fn parse_absent_for_blank_values() {
        assert_eq!(PriorState::parse(""), PriorState::Absent);
        assert_eq!(PriorState::parse("  \n"), PriorState::Absent);
    }

    #[test]
    fn parse_discards_non_arrays() {
        assert_eq!(PriorState::parse("not valid data"), PriorState::Discarded);
        assert_eq!(PriorState::parse("{\"ids\": [1]}"), PriorState::Discarded);
        assert_eq!(PriorState::parse("3"), PriorState::Discarded);
    }

    #[test]
    fn parse_filters_non_integer_entries() {
        let prior = PriorState::parse("[1, \"x\", 3, null, 2.5, -4, 5.0]");
        assert_eq!(
            prior,
            PriorState::Recovered {
                ids: [1, 3, 5].into_iter().collect(),
                dropped: 4,
            }
        );
    }

    #[test]
    fn parse_drops_numbers_too_large_for_a_float() {
        let prior = PriorState::parse("[4, 1e400, 99999999999999999999999]");
        assert_eq!(
            prior,
            PriorState::Recovered {
                ids: [4].into_iter().collect(),
                dropped: 2,
            }
        );
    }

    #[test]
    fn parse_is_whitespace_and_order_insensitive() {
        let a = PriorState::parse("[3,1,2]");
        let b = PriorState::parse(" [ 1 ,\n 2 , 3 ] ");
        assert_eq!(a, b);
    }

    #[test]
    fn first_visit_unlocks_first_and_due_items() {
        let store = MemoryStore::new();
        let reconciler = Reconciler::new(two_item_schedule(), store.clone());

        let result = reconciler.reconcile_on(date("2024-06-01"));

        assert_eq!(ids(&result.state), vec![1]);
        assert_eq!(result.prior, PriorState::Absent);
        assert!(result.persisted);
        assert_eq!(store.raw(DEFAULT_STORAGE_KEY).as_deref(), Some("[1]"));
    }

    #[test]
    fn reconcile_uses_the_configured_clock() {
        let reconciler = Reconciler::new(two_item_schedule(), MemoryStore::new())
            .with_clock(FixedClock(date("2099-01-01")));
        let result = reconciler.reconcile();
        assert_eq!(result.today, date("2099-01-01"));
        assert_eq!(ids(&result.state), vec![1, 2]);
    }

    #[test]
    fn custom_key_is_used_for_read_and_write() {
        let store = MemoryStore::with_value("custom", "[2]");
        let reconciler = Reconciler::new(two_item_schedule(), store.clone()).with_key("custom");

        let result = reconciler.reconcile_on(date("2024-06-01"));

        assert_eq!(ids(&result.state), vec![1, 2]);
        assert!(store.raw(DEFAULT_STORAGE_KEY).is_none());
        assert_eq!(store.raw("custom").as_deref(), Some("[1,2]"));
    }

    #[test]
    fn newly_unlocked_excludes_prior_ids() {
        let store = MemoryStore::with_value(DEFAULT_STORAGE_KEY, "[1]");
        let reconciler = Reconciler::new(two_item_schedule(), store);

        let result = reconciler.reconcile_on(date("2099-06-01"));
        assert_eq!(result.newly_unlocked, [2].into_iter().collect());
    }

    #[test]
    fn write_failure_still_returns_state() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        let reconciler = Reconciler::new(two_item_schedule(), store.clone());

        let result = reconciler.reconcile_on(date("2099-01-01"));

        assert!(!result.persisted);
        assert_eq!(ids(&result.state), vec![1, 2]);
        assert!(store.raw(DEFAULT_STORAGE_KEY).is_none());
    }

    #[test]
    fn null_store_degrades_to_schedule_only() {
        let reconciler = Reconciler::new(two_item_schedule(), NullStore);
        let result = reconciler.reconcile_on(date("2024-06-01"));
        assert_eq!(result.prior, PriorState::Absent);
        assert!(!result.persisted);
        assert_eq!(ids(&result.state), vec![1]);
    }

    #[test]
    fn derived_queries() {
        let schedule = two_item_schedule();
        let state = UnlockState::from_ids([1]);

        assert!(state.is_unlocked(1));
        assert!(!state.is_unlocked(2));
        assert_eq!(state.unlocked_count(), 1);
        assert!(!state.all_unlocked(&schedule));
        assert!((state.progress(&schedule) - 0.5).abs() < f64::EPSILON);

        let full = UnlockState::from_ids([1, 2]);
        assert!(full.all_unlocked(&schedule));
        assert!((full.progress(&schedule) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stray_ids_count_but_progress_is_capped() {
        let schedule = two_item_schedule();
        let state = UnlockState::from_ids([1, 2, 3]);
        assert_eq!(state.unlocked_count(), 3);
        assert!(state.all_unlocked(&schedule));
        assert!((state.progress(&schedule) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn open_resolves_clicks() {
        let schedule = two_item_schedule();
        let state = UnlockState::from_ids([1]);

        match state.open(&schedule, 1) {
            Click::Open { item, position, is_final } => {
                assert_eq!(item.content, "one");
                assert_eq!(position, 0);
                assert!(!is_final);
            }
            other => panic!("expected open, got {other:?}"),
        }

        match state.open(&schedule, 2) {
            Click::Locked { position, label, .. } => {
                assert_eq!(position, 1);
                assert_eq!(label, "Unlocks on 1 Jan \u{1F49D}");
            }
            other => panic!("expected locked, got {other:?}"),
        }

        assert_eq!(state.open(&schedule, 9), Click::Unknown(9));
    }

    #[test]
    fn open_flags_final_item() {
        let schedule = two_item_schedule();
        let state = UnlockState::from_ids([1, 2]);
        assert!(matches!(
            state.open(&schedule, 2),
            Click::Open { is_final: true, .. }
        ));
    }
}
