//! Shop and service domain types.

use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;

use chairbook_core::schedule::ShopSchedule;
use chairbook_core::wire::hhmm;
use chairbook_core::{Price, ServiceId, ShopId, UserId};

/// A shop with its schedule.
#[derive(Debug, Clone)]
pub struct Shop {
    pub id: ShopId,
    pub name: String,
    /// The barber who owns the shop.
    pub owner_id: Option<UserId>,
    pub address: Option<String>,
    pub schedule: ShopSchedule,
    pub created_at: DateTime<Utc>,
}

/// A service offered by a shop.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: ServiceId,
    pub shop_id: ShopId,
    pub name: String,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub duration_minutes: Option<u32>,
}

/// JSON shape of a shop, including its derived slot grid.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopView {
    pub id: ShopId,
    pub name: String,
    pub owner_id: Option<UserId>,
    pub address: Option<String>,
    #[serde(with = "hhmm")]
    pub opens_at: NaiveTime,
    #[serde(with = "hhmm")]
    pub closes_at: NaiveTime,
    pub slot_minutes: u32,
    /// Weekly closing days, 0 = Sunday.
    pub closed_weekdays: Vec<i32>,
    pub daily_capacity: Option<u32>,
    /// Start times of every bookable slot.
    pub slots: Vec<String>,
}

impl From<&Shop> for ShopView {
    fn from(shop: &Shop) -> Self {
        let hours = &shop.schedule.hours;
        Self {
            id: shop.id,
            name: shop.name.clone(),
            owner_id: shop.owner_id,
            address: shop.address.clone(),
            opens_at: hours.opens_at,
            closes_at: hours.closes_at,
            slot_minutes: hours.slot_minutes,
            closed_weekdays: ShopSchedule::weekdays_to_column(&shop.schedule.closed_weekdays),
            daily_capacity: shop.schedule.daily_capacity,
            slots: shop.schedule.grid().labels(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shop_view_lists_sixteen_slots() {
        let shop = Shop {
            id: ShopId::new(1),
            name: "Fade Factory".to_string(),
            owner_id: Some(UserId::new(3)),
            address: None,
            schedule: ShopSchedule::default(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(ShopView::from(&shop)).unwrap();
        assert_eq!(json["opensAt"], "09:30");
        assert_eq!(json["closesAt"], "21:30");
        assert_eq!(json["closedWeekdays"], serde_json::json!([0]));
        assert_eq!(json["slots"].as_array().unwrap().len(), 16);
        assert_eq!(json["slots"][15], "20:45");
    }
}
