//! Activity records and the inputs that create, patch and filter them.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{Action, Principal, RecordId, Status};

/// A stored activity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: RecordId,
    /// Set once at creation from the authenticated caller.
    pub owner: Principal,
    pub action: Action,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub metadata: Option<serde_json::Value>,
    pub status: Status,
    /// Write counter: 0 at creation, incremented by every persisted write.
    pub version: i64,
}

impl ActivityRecord {
    /// Build a freshly created record. Status is always `PENDING`.
    pub fn create(
        id: RecordId,
        owner: Principal,
        draft: NewRecord,
        created_at: OffsetDateTime,
    ) -> Self {
        ActivityRecord {
            id,
            owner,
            action: draft.action,
            created_at,
            metadata: draft.metadata,
            status: Status::Pending,
            version: 0,
        }
    }

    pub fn is_owned_by(&self, principal: &Principal) -> bool {
        &self.owner == principal
    }
}

/// Creation input. Owner and status are not part of it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub action: Action,
    pub metadata: Option<serde_json::Value>,
}

/// Partial update of the mutable fields.
///
/// `metadata: Some(None)` clears the payload; `None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub action: Option<Action>,
    pub metadata: Option<Option<serde_json::Value>>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.action.is_none() && self.metadata.is_none()
    }

    /// Apply the patch in place. Returns true if any field was present.
    pub fn apply(&self, record: &mut ActivityRecord) -> bool {
        if let Some(action) = self.action {
            record.action = action;
        }
        if let Some(metadata) = &self.metadata {
            record.metadata = metadata.clone();
        }
        !self.is_empty()
    }
}

/// Exact-match filters for listing. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub action: Option<Action>,
    pub created_at: Option<OffsetDateTime>,
}

impl RecordFilter {
    pub fn matches(&self, record: &ActivityRecord) -> bool {
        self.action.map_or(true, |a| record.action == a)
            && self.created_at.map_or(true, |t| record.created_at == t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn record() -> ActivityRecord {
        ActivityRecord::create(
            RecordId(1),
            Principal::new("alice"),
            NewRecord {
                action: Action::Login,
                metadata: Some(serde_json::json!({"ip": "10.0.0.1"})),
            },
            datetime!(2025-01-01 00:00:00 UTC),
        )
    }

    #[test]
    fn create_forces_pending_and_version_zero() {
        let r = record();
        assert_eq!(r.status, Status::Pending);
        assert_eq!(r.version, 0);
        assert!(r.is_owned_by(&Principal::new("alice")));
        assert!(!r.is_owned_by(&Principal::new("bob")));
    }

    #[test]
    fn patch_updates_only_present_fields() {
        let mut r = record();
        let patch = RecordPatch {
            action: Some(Action::Logout),
            metadata: None,
        };
        assert!(patch.apply(&mut r));
        assert_eq!(r.action, Action::Logout);
        assert_eq!(r.metadata, Some(serde_json::json!({"ip": "10.0.0.1"})));
        assert_eq!(r.status, Status::Pending);
    }

    #[test]
    fn patch_can_clear_metadata() {
        let mut r = record();
        let patch = RecordPatch {
            action: None,
            metadata: Some(None),
        };
        patch.apply(&mut r);
        assert_eq!(r.metadata, None);
    }

    #[test]
    fn empty_patch_reports_no_change() {
        let mut r = record();
        assert!(!RecordPatch::default().apply(&mut r));
        assert_eq!(r, record());
    }

    #[test]
    fn filter_matches_exactly() {
        let r = record();
        assert!(RecordFilter::default().matches(&r));
        let by_action = RecordFilter {
            action: Some(Action::Login),
            ..Default::default()
        };
        assert!(by_action.matches(&r));
        let other_action = RecordFilter {
            action: Some(Action::UploadFile),
            ..Default::default()
        };
        assert!(!other_action.matches(&r));
        let by_time = RecordFilter {
            created_at: Some(datetime!(2025-01-01 00:00:00 UTC)),
            ..Default::default()
        };
        assert!(by_time.matches(&r));
    }

    #[test]
    fn serializes_created_at_as_rfc3339() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["created_at"], "2025-01-01T00:00:00Z");
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["owner"], "alice");
        assert_eq!(json["id"], 1);
    }
}
