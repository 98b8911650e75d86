//! Data cleanup commands.
//!
//! # Usage
//!
//! ```bash
//! # Show what would change
//! chairbook cleanup legacy-notes --dry-run
//!
//! # Apply
//! chairbook cleanup legacy-notes
//! ```

use chairbook_core::legacy::split_legacy_notes;
use chairbook_server::db::{AppointmentRepository, RepositoryError, UserRepository};

use super::CommandError;

/// Outcome of a cleanup run.
#[derive(Debug, Default)]
pub struct CleanupSummary {
    pub scanned: usize,
    pub updated: usize,
    pub reassigned: usize,
    pub skipped: usize,
}

/// Strip `EmployeeId:` markers from notes and move known ids into `employee_id`.
///
/// Appointments whose move would overlap another booking of the referenced
/// employee keep their current employee and are reported as skipped.
pub async fn legacy_notes(dry_run: bool) -> Result<CleanupSummary, CommandError> {
    let pool = super::connect().await?;
    let appointments = AppointmentRepository::new(&pool);
    let users = UserRepository::new(&pool);

    let rows = appointments.with_legacy_notes().await?;
    let mut summary = CleanupSummary {
        scanned: rows.len(),
        ..CleanupSummary::default()
    };
    tracing::info!(count = rows.len(), dry_run, "Appointments with legacy notes");

    for row in rows {
        let Some(split) = split_legacy_notes(&row.notes) else {
            continue;
        };

        let employee_id = match split.employee_id {
            Some(id) if id != row.employee_id => {
                if users.exists(id).await? {
                    id
                } else {
                    tracing::warn!(appointment_id = %row.id, referenced = %id, "Unknown employee in notes, keeping current");
                    row.employee_id
                }
            }
            _ => row.employee_id,
        };
        let reassigned = employee_id != row.employee_id;

        if dry_run {
            tracing::info!(
                appointment_id = %row.id,
                from = %row.employee_id,
                to = %employee_id,
                notes = split.notes.as_deref().unwrap_or(""),
                "Would update"
            );
            summary.updated += 1;
            summary.reassigned += usize::from(reassigned);
            continue;
        }

        match appointments
            .apply_legacy_cleanup(row.id, employee_id, split.notes.as_deref())
            .await
        {
            Ok(()) => {
                summary.updated += 1;
                summary.reassigned += usize::from(reassigned);
            }
            Err(RepositoryError::Conflict(constraint)) => {
                tracing::warn!(appointment_id = %row.id, %constraint, "Reassignment would overlap, skipped");
                summary.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!("Cleanup complete!");
    tracing::info!("  Scanned: {}", summary.scanned);
    tracing::info!("  Updated: {}", summary.updated);
    tracing::info!("  Reassigned: {}", summary.reassigned);
    tracing::info!("  Skipped: {}", summary.skipped);
    Ok(summary)
}
