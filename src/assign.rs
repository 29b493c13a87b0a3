//! Deterministic slot assignment.
//!
//! Slots are visited in ascending numeric id order so that repeated calls
//! against the same snapshot always hand out the same slot. Ids that are not
//! integers sort after every numeric id, lexicographically.

use std::cmp::Ordering;

use crate::status::{SlotState, SlotStatus};

pub fn compare_slot_ids(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

pub fn sort_states(states: &mut [SlotState]) {
    states.sort_by(|a, b| compare_slot_ids(&a.slot_id, &b.slot_id));
}

/// First `available` slot in ascending id order, if any.
pub fn first_available(states: &[SlotState]) -> Option<&str> {
    states
        .iter()
        .filter(|state| state.status == SlotStatus::Available)
        .min_by(|a, b| compare_slot_ids(&a.slot_id, &b.slot_id))
        .map(|state| state.slot_id.as_str())
}

/// Every `available` slot, best candidate first.
pub fn available_in_order(states: &[SlotState]) -> Vec<&str> {
    let mut ids: Vec<&str> = states
        .iter()
        .filter(|state| state.status == SlotStatus::Available)
        .map(|state| state.slot_id.as_str())
        .collect();
    ids.sort_by(|a, b| compare_slot_ids(a, b));
    ids
}
