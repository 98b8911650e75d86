//! Availability override records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use chairbook_core::schedule::{DayOverride, SlotState};
use chairbook_core::wire::calendar_date;
use chairbook_core::{AvailableTimeId, ShopId, UserId};

/// A stored override for one shop and date.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRecord {
    pub id: AvailableTimeId,
    pub shop_id: ShopId,
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    pub is_available: bool,
    pub time_slots: Option<serde_json::Value>,
    pub reason: Option<String>,
    /// Staff the override applies to; empty means shop-wide.
    pub staff_ids: Vec<UserId>,
}

impl OverrideRecord {
    #[must_use]
    pub fn is_shop_wide(&self) -> bool {
        self.staff_ids.is_empty()
    }

    /// Convert into the evaluator's view.
    ///
    /// A malformed `time_slots` payload is logged and ignored, so the day
    /// still follows `is_available`.
    #[must_use]
    pub fn to_day_override(&self) -> DayOverride {
        let slot_states = match self.time_slots.as_ref().map(SlotState::parse_payload) {
            None => Vec::new(),
            Some(Ok(states)) => states,
            Some(Err(e)) => {
                tracing::warn!(
                    override_id = %self.id,
                    error = %e,
                    "Ignoring malformed time_slots payload"
                );
                Vec::new()
            }
        };

        DayOverride {
            is_available: self.is_available,
            reason: self.reason.clone(),
            slot_states,
        }
    }
}

/// Body of `PUT /shops/{id}/overrides`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertOverride {
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    pub is_available: bool,
    #[serde(default)]
    pub time_slots: Option<Vec<SlotState>>,
    #[serde(default)]
    pub reason: Option<String>,
    /// Staff the override applies to; empty or absent means shop-wide.
    #[serde(default)]
    pub staff_ids: Vec<UserId>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn record(time_slots: Option<serde_json::Value>) -> OverrideRecord {
        OverrideRecord {
            id: AvailableTimeId::new(1),
            shop_id: ShopId::new(1),
            date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            is_available: true,
            time_slots,
            reason: None,
            staff_ids: vec![],
        }
    }

    #[test]
    fn test_payload_is_parsed() {
        let rec = record(Some(serde_json::json!([{"time": "14:00", "available": false}])));
        let day = rec.to_day_override();
        assert_eq!(day.slot_states.len(), 1);
        assert_eq!(day.slot_states[0].time, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        assert!(!day.slot_states[0].available);
        assert!(rec.is_shop_wide());
    }

    #[test]
    fn test_malformed_payload_is_ignored() {
        let day = record(Some(serde_json::json!({"slots": "nope"}))).to_day_override();
        assert!(day.slot_states.is_empty());
        assert!(day.is_available);
    }

    #[test]
    fn test_upsert_body_defaults_to_shop_wide() {
        let body: UpsertOverride = serde_json::from_value(serde_json::json!({
            "date": "2024-12-24",
            "isAvailable": false,
            "reason": "Holiday"
        }))
        .unwrap();
        assert!(body.staff_ids.is_empty());
        assert!(body.time_slots.is_none());
    }
}
