//! Seed the database with shops, staff and services from a YAML file.
//!
//! Intended for a fresh database: users are reused by email, shops are
//! always inserted.
//!
//! ```yaml
//! users:
//!   - email: alex@example.com
//!     firstName: Alex
//!     role: barber
//! shops:
//!   - name: Fade Street
//!     owner: alex@example.com
//!     opensAt: "09:30"
//!     closesAt: "21:30"
//!     slotMinutes: 45
//!     closedWeekdays: [0]
//!     staff: [alex@example.com]
//!     services:
//!       - name: Haircut
//!         price: "25.00"
//!         durationMinutes: 45
//! ```

use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use chairbook_core::schedule::{ShopSchedule, WorkingHours};
use chairbook_core::wire::parse_clock;
use chairbook_core::{Email, Price, Role, UserId};
use chairbook_server::db::shops::NewShop;
use chairbook_server::db::{ShopRepository, UserRepository};

/// Top-level seed file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub shops: Vec<SeedShop>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeedUser {
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "customer".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeedShop {
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub opens_at: Option<String>,
    #[serde(default)]
    pub closes_at: Option<String>,
    #[serde(default)]
    pub slot_minutes: Option<i32>,
    #[serde(default)]
    pub closed_weekdays: Option<Vec<i32>>,
    #[serde(default)]
    pub daily_capacity: Option<u32>,
    #[serde(default)]
    pub staff: Vec<String>,
    #[serde(default)]
    pub services: Vec<SeedService>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeedService {
    pub name: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

impl SeedShop {
    fn schedule(&self) -> ShopSchedule {
        let defaults = ShopSchedule::default();
        ShopSchedule {
            hours: WorkingHours::from_columns(
                self.opens_at.as_deref().and_then(parse_clock),
                self.closes_at.as_deref().and_then(parse_clock),
                self.slot_minutes,
            ),
            closed_weekdays: self
                .closed_weekdays
                .as_deref()
                .map_or(defaults.closed_weekdays, ShopSchedule::weekdays_from_column),
            daily_capacity: self.daily_capacity,
        }
    }
}

/// Check a seed file before touching the database.
///
/// Returns one message per problem; empty means valid.
#[must_use]
pub fn validate(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut roles: HashMap<&str, Option<Role>> = HashMap::new();

    for user in &seed.users {
        if Email::parse(&user.email).is_err() {
            errors.push(format!("user {}: invalid email", user.email));
        }
        let role = user.role.parse::<Role>().ok();
        if role.is_none() {
            errors.push(format!("user {}: invalid role `{}`", user.email, user.role));
        }
        if roles.insert(user.email.as_str(), role).is_some() {
            errors.push(format!("user {}: listed twice", user.email));
        }
    }

    for shop in &seed.shops {
        let label = format!("shop {}", shop.name);
        for (field, value) in [("opensAt", &shop.opens_at), ("closesAt", &shop.closes_at)] {
            if let Some(raw) = value
                && parse_clock(raw).is_none()
            {
                errors.push(format!("{label}: {field} `{raw}` is not HH:MM"));
            }
        }
        if let Some(owner) = &shop.owner
            && !roles.contains_key(owner.as_str())
        {
            errors.push(format!("{label}: owner {owner} is not a seeded user"));
        }
        for member in &shop.staff {
            match roles.get(member.as_str()) {
                None => errors.push(format!("{label}: staff {member} is not a seeded user")),
                Some(Some(role)) if !role.is_staff() => {
                    errors.push(format!("{label}: {member} has role {role}, not staff"));
                }
                Some(_) => {}
            }
        }
        for service in &shop.services {
            if service.price.is_some_and(|p| p.is_sign_negative()) {
                errors.push(format!("{label}: service {} has a negative price", service.name));
            }
        }
    }

    errors
}

/// Seed from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a database write fails.
pub async fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()).into());
    }

    info!(path = %path.display(), "Loading seed file");
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }
    info!(
        users = seed.users.len(),
        shops = seed.shops.len(),
        "Seed file validated"
    );

    let pool = super::connect().await?;
    let users = UserRepository::new(&pool);
    let shops = ShopRepository::new(&pool);

    let mut ids: HashMap<String, UserId> = HashMap::new();
    for user in &seed.users {
        let email = Email::parse(&user.email)?;
        let role: Role = user.role.parse()?;
        let id = match users.get_by_email(&email).await? {
            Some(existing) => existing.id,
            None => {
                users
                    .create(
                        &format!("local:{email}"),
                        &email,
                        user.first_name.as_deref(),
                        user.last_name.as_deref(),
                        role,
                    )
                    .await?
                    .id
            }
        };
        ids.insert(user.email.clone(), id);
    }

    for entry in &seed.shops {
        let shop = shops
            .create(&NewShop {
                name: entry.name.clone(),
                owner_id: entry.owner.as_ref().and_then(|o| ids.get(o).copied()),
                address: entry.address.clone(),
                schedule: entry.schedule(),
            })
            .await?;

        for member in &entry.staff {
            if let Some(id) = ids.get(member) {
                shops.add_staff(shop.id, *id).await?;
            }
        }
        for service in &entry.services {
            shops
                .add_service(
                    shop.id,
                    &service.name,
                    service.price.and_then(Price::new),
                    service.duration_minutes,
                )
                .await?;
        }

        info!(
            shop_id = %shop.id,
            name = %shop.name,
            staff = entry.staff.len(),
            services = entry.services.len(),
            "Shop seeded"
        );
    }

    info!("Seeding complete!");
    Ok(())
}
