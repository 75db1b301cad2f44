use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::StoreError;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Signed,
}

/// Metadata for one uploaded document and its signing lifecycle.
///
/// Persisted with camelCase keys; `signedFileName` is omitted until the
/// document has been signed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: Uuid,
    pub original_name: String,
    pub stored_file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_file_name: Option<String>,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn new(id: Uuid, original_name: &str, stored_file_name: &str, now: DateTime<Utc>) -> Self {
        Self {
            id,
            original_name: original_name.to_string(),
            stored_file_name: stored_file_name.to_string(),
            signed_file_name: None,
            status: DocumentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.status == DocumentStatus::Signed
    }
}

/// The fields an update may touch. Everything else on a record is immutable.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    #[serde(default)]
    pub status: Option<DocumentStatus>,
    #[serde(default)]
    pub signed_file_name: Option<String>,
}

impl DocumentPatch {
    /// Patch recording a completed signing.
    pub fn signed(signed_file_name: impl Into<String>) -> Self {
        Self {
            status: Some(DocumentStatus::Signed),
            signed_file_name: Some(signed_file_name.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.signed_file_name.is_none()
    }

    /// Checks that need no record: a supplied file name must not be blank.
    pub fn validate(&self) -> Result<(), StoreError> {
        match &self.signed_file_name {
            Some(name) if name.trim().is_empty() => {
                Err(StoreError::invalid_patch("signedFileName must not be empty"))
            }
            _ => Ok(()),
        }
    }

    /// Merge into `record`, refreshing `updated_at`.
    ///
    /// Signed records are frozen (the Signed transition happens once and is
    /// never undone), and a Signed result must carry a file name. On error
    /// `record` is unchanged.
    pub fn apply(self, record: &mut DocumentRecord, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.validate()?;
        if record.is_signed() && !self.is_empty() {
            return Err(StoreError::invalid_patch("document is already signed"));
        }

        let mut merged = record.clone();
        if let Some(status) = self.status {
            merged.status = status;
        }
        if let Some(name) = self.signed_file_name {
            merged.signed_file_name = Some(name);
        }
        let has_file = merged
            .signed_file_name
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty());
        if merged.is_signed() && !has_file {
            return Err(StoreError::invalid_patch("signed status requires signedFileName"));
        }

        merged.updated_at = next_timestamp(record.updated_at, now);
        *record = merged;
        Ok(())
    }
}

/// `now`, bumped past `previous` when the clock has not advanced.
pub(crate) fn next_timestamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> DocumentRecord {
        DocumentRecord::new(Uuid::new_v4(), "doc.pdf", "1700-doc.pdf", Utc::now())
    }

    #[test]
    fn serializes_with_camel_case_and_lowercase_status() {
        let rec = pending();
        let json = serde_json::to_value(&rec).expect("serialize");
        assert_eq!(json["originalName"], "doc.pdf");
        assert_eq!(json["storedFileName"], "1700-doc.pdf");
        assert_eq!(json["status"], "pending");
        assert!(json.get("signedFileName").is_none());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn signed_patch_sets_status_and_file() {
        let mut rec = pending();
        let before = rec.clone();
        DocumentPatch::signed("signed-1700-doc.pdf").apply(&mut rec, Utc::now()).expect("apply");

        assert_eq!(rec.status, DocumentStatus::Signed);
        assert_eq!(rec.signed_file_name.as_deref(), Some("signed-1700-doc.pdf"));
        assert_eq!(rec.id, before.id);
        assert_eq!(rec.original_name, before.original_name);
        assert_eq!(rec.stored_file_name, before.stored_file_name);
        assert_eq!(rec.created_at, before.created_at);
        assert!(rec.updated_at > before.updated_at);
    }

    #[test]
    fn updated_at_advances_even_with_a_stale_clock() {
        let mut rec = pending();
        let stale = rec.updated_at - Duration::seconds(5);
        DocumentPatch::default().apply(&mut rec, stale).expect("apply");
        assert!(rec.updated_at > rec.created_at);
    }

    #[test]
    fn rejects_signed_without_file_name() {
        let mut rec = pending();
        let patch = DocumentPatch {
            status: Some(DocumentStatus::Signed),
            signed_file_name: None,
        };
        assert!(matches!(patch.apply(&mut rec, Utc::now()), Err(StoreError::InvalidPatch(_))));
        assert_eq!(rec.status, DocumentStatus::Pending);

        let blank = DocumentPatch::signed("   ");
        assert!(matches!(blank.apply(&mut rec, Utc::now()), Err(StoreError::InvalidPatch(_))));
    }

    #[test]
    fn signed_records_are_frozen() {
        let mut rec = pending();
        DocumentPatch::signed("signed-a.pdf").apply(&mut rec, Utc::now()).expect("apply");
        let signed = rec.clone();

        let back = DocumentPatch {
            status: Some(DocumentStatus::Pending),
            signed_file_name: None,
        };
        assert!(matches!(back.apply(&mut rec, Utc::now()), Err(StoreError::InvalidPatch(_))));
        let again = DocumentPatch::signed("signed-b.pdf");
        assert!(matches!(again.apply(&mut rec, Utc::now()), Err(StoreError::InvalidPatch(_))));
        assert_eq!(rec, signed);
    }

    #[test]
    fn pending_record_may_receive_file_name_first() {
        let mut rec = pending();
        let patch = DocumentPatch {
            status: None,
            signed_file_name: Some("draft.pdf".into()),
        };
        patch.apply(&mut rec, Utc::now()).expect("apply");
        assert_eq!(rec.status, DocumentStatus::Pending);

        let finish = DocumentPatch {
            status: Some(DocumentStatus::Signed),
            signed_file_name: None,
        };
        finish.apply(&mut rec, Utc::now()).expect("apply");
        assert!(rec.is_signed());
    }
}
