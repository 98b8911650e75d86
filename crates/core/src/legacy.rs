//! Legacy employee references embedded in appointment notes.
//!
//! Older clients had no employee column and wrote `EmployeeId: 7` into the
//! notes field. The cleanup command moves those into `employee_id`.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::UserId;

static EMPLOYEE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*EmployeeId:\s*(\d+)\s*").expect("Invalid regex"));

/// Notes split into the embedded employee reference and the remaining text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyNotes {
    pub employee_id: Option<UserId>,
    /// Remaining text, `None` when nothing meaningful is left.
    pub notes: Option<String>,
}

/// Extract the first `EmployeeId: N` marker and strip every marker from the text.
///
/// Returns `None` when the notes carry no marker at all.
#[must_use]
pub fn split_legacy_notes(notes: &str) -> Option<LegacyNotes> {
    let captures = EMPLOYEE_MARKER.captures(notes)?;
    let employee_id = captures
        .get(1)
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .filter(|id| *id > 0)
        .map(UserId::new);

    let stripped = EMPLOYEE_MARKER.replace_all(notes, " ");
    let remaining = stripped
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '|' | ',' | ';' | '-'))
        .to_string();

    Some(LegacyNotes {
        employee_id,
        notes: (!remaining.is_empty()).then_some(remaining),
    })
}
