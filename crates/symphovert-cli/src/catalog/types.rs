//! Catalog record types

use crate::error::{CliError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::path::Path;
use uuid::Uuid;

/// Action name marking a record for conversion
pub const CONVERT_ACTION: &str = "convert";

/// Per-record instructions for the conversion step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertAction {
    /// Name of the tool that owns this record
    pub tool: String,
    /// Output extension decided for this record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// The `action_data` JSON column
///
/// Only `convert` is interpreted; other keys are preserved on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convert: Option<ConvertAction>,

    #[serde(flatten)]
    pub other: Map<String, JsonValue>,
}

/// An original file in the archive
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub uuid: Uuid,
    /// `/`-separated path of the original
    pub relative_path: String,
    /// Detected format identifier
    pub puid: Option<String>,
    pub processed: bool,
    pub action: Option<String>,
    pub action_data: ActionData,
}

impl FileRecord {
    /// Unprocessed record assigned to `tool` for conversion
    pub fn for_conversion(
        relative_path: impl Into<String>,
        puid: impl Into<String>,
        tool: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            relative_path: relative_path.into(),
            puid: Some(puid.into()),
            processed: false,
            action: Some(CONVERT_ACTION.to_string()),
            action_data: ActionData {
                convert: Some(ConvertAction {
                    tool: tool.into(),
                    output: None,
                }),
                other: Map::new(),
            },
        }
    }

    /// File name component of the relative path
    pub fn name(&self) -> &str {
        self.relative_path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.relative_path)
    }

    pub fn is_convert_action(&self) -> bool {
        self.action.as_deref() == Some(CONVERT_ACTION)
    }
}

/// A converted master copy of an original
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterArtifact {
    pub uuid: Uuid,
    /// `/`-separated path relative to the archive root
    pub relative_path: String,
    pub original_uuid: Uuid,
    pub sequence: u32,
    /// SHA-256 of the file contents, lowercase hex
    pub checksum: Option<String>,
    pub size: Option<u64>,
}

impl MasterArtifact {
    /// Describe an existing file under `root`, checksumming its contents
    pub fn from_file(path: &Path, root: &Path, original_uuid: Uuid, sequence: u32) -> Result<Self> {
        let relative = path.strip_prefix(root).map_err(|_| {
            CliError::invalid_record(format!(
                "{} is outside the archive {}",
                path.display(),
                root.display()
            ))
        })?;

        let relative_path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let digest = symphovert_common::checksum::digest_file(path)?;

        Ok(Self {
            uuid: Uuid::new_v4(),
            relative_path,
            original_uuid,
            sequence,
            checksum: Some(digest.sha256),
            size: Some(digest.size),
        })
    }

    pub fn name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }
}

/// A row of the catalog's event log
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEvent {
    pub id: Option<i64>,
    pub time: DateTime<Utc>,
    /// `<tool>.<step>`, e.g. `symphovert.convert`
    pub operation: String,
    pub uuid: Option<Uuid>,
    pub data: Option<JsonValue>,
    pub reason: Option<String>,
}

impl CatalogEvent {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            id: None,
            time: Utc::now(),
            operation: operation.into(),
            uuid: None,
            data: None,
            reason: None,
        }
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }

    pub fn with_data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Which file records [`super::Catalog::select_pending`] returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFilter {
    /// Only records with this action (`None`: any)
    pub action: Option<String>,
    /// Only records not yet processed
    pub unprocessed_only: bool,
}

impl Default for PendingFilter {
    fn default() -> Self {
        Self::convert()
    }
}

impl PendingFilter {
    /// Unprocessed records marked for conversion
    pub fn convert() -> Self {
        Self {
            action: Some(CONVERT_ACTION.to_string()),
            unprocessed_only: true,
        }
    }

    /// Every record
    pub fn all() -> Self {
        Self {
            action: None,
            unprocessed_only: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_action_data_keeps_unknown_keys() {
        let raw = json!({
            "convert": {"tool": "symphovert", "output": "odt"},
            "reidentify": {"reason": "extension mismatch"}
        });

        let data: ActionData = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(data.convert.as_ref().unwrap().tool, "symphovert");
        assert_eq!(data.convert.as_ref().unwrap().output.as_deref(), Some("odt"));
        assert!(data.other.contains_key("reidentify"));

        assert_eq!(serde_json::to_value(&data).unwrap(), raw);
    }

    #[test]
    fn test_action_data_without_convert() {
        let data: ActionData = serde_json::from_str("{}").unwrap();
        assert!(data.convert.is_none());
        assert_eq!(serde_json::to_string(&data).unwrap(), "{}");
    }

    #[test]
    fn test_file_record_name() {
        let record = FileRecord::for_conversion("OriginalDocuments/docs/report.lwp", "fmt/340", "symphovert");
        assert_eq!(record.name(), "report.lwp");
        assert!(record.is_convert_action());
        assert!(!record.processed);
    }

    #[test]
    fn test_master_artifact_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("MasterDocuments/docs/report.odt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"hello world").unwrap();

        let original = Uuid::new_v4();
        let artifact = MasterArtifact::from_file(&path, dir.path(), original, 0).unwrap();

        assert_eq!(artifact.relative_path, "MasterDocuments/docs/report.odt");
        assert_eq!(artifact.name(), "report.odt");
        assert_eq!(artifact.original_uuid, original);
        assert_eq!(artifact.size, Some(11));
        assert_eq!(
            artifact.checksum.as_deref(),
            Some("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
        );
    }

    #[test]
    fn test_master_artifact_outside_root() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let path = other.path().join("a.odt");
        std::fs::write(&path, b"x").unwrap();

        let err = MasterArtifact::from_file(&path, dir.path(), Uuid::new_v4(), 0).unwrap_err();
        assert!(matches!(err, CliError::InvalidRecord(_)));
    }

    #[test]
    fn test_event_builder() {
        let uuid = Uuid::new_v4();
        let event = CatalogEvent::new("symphovert.error")
            .with_uuid(uuid)
            .with_reason("launch failed: not found");
        assert_eq!(event.operation, "symphovert.error");
        assert_eq!(event.uuid, Some(uuid));
        assert!(event.data.is_none());
    }
}
