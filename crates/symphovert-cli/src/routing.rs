//! Format routing and archive layout
//!
//! Decides whether a catalog record is this driver's to convert and, if so,
//! where its master copy goes and in which format.

use crate::catalog::FileRecord;
use crate::config::Config;
use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

/// Directory holding the archived originals
pub const ORIGINAL_DOCUMENTS: &str = "OriginalDocuments";

/// Directory receiving converted master copies
pub const MASTER_DOCUMENTS: &str = "MasterDocuments";

/// Directory holding the catalog and logs
pub const METADATA_DIR: &str = "_metadata";

/// Catalog database file name inside [`METADATA_DIR`]
pub const CATALOG_FILE: &str = "avid.db";

/// Built-in routes for the Lotus SmartSuite formats found in the archive
const DEFAULT_ROUTES: &[(&str, TargetFormat)] = &[
    // Lotus Word Pro and its archive-local identifier
    ("fmt/340", TargetFormat::Odt),
    ("x-fmt/340", TargetFormat::Odt),
    ("fmt/1216", TargetFormat::Odt),
    ("aca-fmt/1", TargetFormat::Odt),
    // Lotus 1-2-3
    ("x-fmt/114", TargetFormat::Ods),
    ("x-fmt/115", TargetFormat::Ods),
    ("x-fmt/116", TargetFormat::Ods),
];

/// Output formats the application can be asked to save as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Odt,
    Ods,
    Odp,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 3] = [TargetFormat::Odt, TargetFormat::Ods, TargetFormat::Odp];

    /// File extension, without the dot
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Odt => "odt",
            TargetFormat::Ods => "ods",
            TargetFormat::Odp => "odp",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TargetFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let ext = s.trim().trim_start_matches('.').to_lowercase();
        TargetFormat::ALL
            .into_iter()
            .find(|f| f.extension() == ext)
            .ok_or_else(|| {
                format!(
                    "unsupported output format '{}' (expected one of odt, ods, odp)",
                    s.trim()
                )
            })
    }
}

/// Maps format identifiers (PRONOM PUIDs and archive-local ids) to outputs
#[derive(Debug, Clone)]
pub struct FormatRouter {
    table: HashMap<String, TargetFormat>,
}

impl Default for FormatRouter {
    fn default() -> Self {
        let table = DEFAULT_ROUTES
            .iter()
            .map(|(id, format)| (id.to_string(), *format))
            .collect();
        Self { table }
    }
}

impl FormatRouter {
    /// Router with the built-in table
    pub fn new() -> Self {
        Self::default()
    }

    /// Router with no routes at all
    #[cfg(test)]
    pub(crate) fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Built-in table plus the configured overrides
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new().with_overrides(&config.routing)
    }

    pub fn with_overrides(mut self, overrides: &BTreeMap<String, String>) -> Result<Self> {
        for (id, extension) in overrides {
            let format = extension
                .parse()
                .map_err(|e| CliError::config(format!("routing entry '{}': {}", id, e)))?;
            self.insert(id.clone(), format);
        }
        Ok(self)
    }

    pub fn insert(&mut self, format_id: impl Into<String>, format: TargetFormat) {
        self.table.insert(format_id.into(), format);
    }

    /// `None` means the format is not eligible for conversion
    pub fn route(&self, format_id: &str) -> Option<TargetFormat> {
        self.table.get(format_id.trim()).copied()
    }
}

/// Directory conventions of an archive (AVID) root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    root: PathBuf,
}

impl ArchiveLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join(METADATA_DIR)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.metadata_dir().join(CATALOG_FILE)
    }

    pub fn original_dir(&self) -> PathBuf {
        self.root.join(ORIGINAL_DOCUMENTS)
    }

    pub fn master_dir(&self) -> PathBuf {
        self.root.join(MASTER_DOCUMENTS)
    }

    /// Absolute path of a root-relative, `/`-separated catalog path
    pub fn resolve(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|c| !c.is_empty())
            .fold(self.root.clone(), |path, component| path.join(component))
    }

    /// Catalog paths are relative to the archive root
    /// (`OriginalDocuments/docs/a.lwp`) or to the originals directory
    /// (`docs/a.lwp`); both yield `docs/a.lwp`.
    pub fn original_subpath<'a>(&self, relative_path: &'a str) -> Option<Vec<&'a str>> {
        let mut components: Vec<&str> = Vec::new();
        for component in relative_path.split(['/', '\\']) {
            match component {
                "" | "." => continue,
                ".." => return None,
                c if c.contains(':') => return None,
                c => components.push(c),
            }
        }

        if components.first() == Some(&ORIGINAL_DOCUMENTS) {
            components.remove(0);
        }

        if components.is_empty() {
            None
        } else {
            Some(components)
        }
    }

    /// Root-relative `/`-separated path of the master copy of `subpath`
    pub fn master_relative_path(&self, subpath: &[&str], format: TargetFormat) -> Option<String> {
        let (name, dirs) = subpath.split_last()?;
        let renamed = Path::new(name).with_extension(format.extension());

        let mut parts: Vec<String> = Vec::with_capacity(subpath.len() + 1);
        parts.push(MASTER_DOCUMENTS.to_string());
        parts.extend(dirs.iter().map(|d| d.to_string()));
        parts.push(renamed.to_string_lossy().into_owned());
        Some(parts.join("/"))
    }
}

/// One planned conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub file_uuid: Uuid,
    pub archive_root: PathBuf,
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    /// Catalog key of the master copy, relative to `archive_root`
    pub master_relative_path: String,
    pub target_format: TargetFormat,
}

/// Why a pending record is not converted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyProcessed,
    NotConvertAction,
    OtherTool(String),
    UnsupportedFormat(String),
    InvalidPath(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyProcessed => f.write_str("already processed"),
            SkipReason::NotConvertAction => f.write_str("no convert action"),
            SkipReason::OtherTool(tool) => write!(f, "assigned to tool '{}'", tool),
            SkipReason::UnsupportedFormat(id) => write!(f, "unsupported format '{}'", id),
            SkipReason::InvalidPath(path) => write!(f, "unusable relative path '{}'", path),
        }
    }
}

/// Turns catalog records into conversion jobs
#[derive(Debug, Clone)]
pub struct JobPlanner {
    layout: ArchiveLayout,
    router: FormatRouter,
    tool_name: String,
}

impl JobPlanner {
    pub fn new(layout: ArchiveLayout, router: FormatRouter, tool_name: impl Into<String>) -> Self {
        Self {
            layout,
            router,
            tool_name: tool_name.into(),
        }
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn plan(&self, record: &FileRecord) -> std::result::Result<ConversionJob, SkipReason> {
        if record.processed {
            return Err(SkipReason::AlreadyProcessed);
        }

        if !record.is_convert_action() {
            return Err(SkipReason::NotConvertAction);
        }
        let convert = record
            .action_data
            .convert
            .as_ref()
            .ok_or(SkipReason::NotConvertAction)?;

        if convert.tool != self.tool_name {
            return Err(SkipReason::OtherTool(convert.tool.clone()));
        }

        let target_format = self.target_format(record)?;

        let subpath = self
            .layout
            .original_subpath(&record.relative_path)
            .ok_or_else(|| SkipReason::InvalidPath(record.relative_path.clone()))?;
        let master_relative_path = self
            .layout
            .master_relative_path(&subpath, target_format)
            .ok_or_else(|| SkipReason::InvalidPath(record.relative_path.clone()))?;

        let source_path = subpath
            .iter()
            .fold(self.layout.original_dir(), |path, c| path.join(c));
        let destination_path = self.layout.resolve(&master_relative_path);

        Ok(ConversionJob {
            file_uuid: record.uuid,
            archive_root: self.layout.root().to_path_buf(),
            source_path,
            destination_path,
            master_relative_path,
            target_format,
        })
    }

    /// The record's declared output wins; the table covers records without one.
    fn target_format(&self, record: &FileRecord) -> std::result::Result<TargetFormat, SkipReason> {
        let declared = record
            .action_data
            .convert
            .as_ref()
            .and_then(|c| c.output.as_deref())
            .filter(|o| !o.trim().is_empty());

        if let Some(output) = declared {
            return output
                .parse()
                .map_err(|_| SkipReason::UnsupportedFormat(output.to_string()));
        }

        let puid = record.puid.as_deref().unwrap_or_default();
        self.router
            .route(puid)
            .ok_or_else(|| SkipReason::UnsupportedFormat(puid.to_string()))
    }
}
