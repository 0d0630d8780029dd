//! Dashboard output entity

use anyhow::Context;
use restchain_core::Record;
use serde::Serialize;

/// Core metadata for one Mode report.
///
/// A dashboard group is a Mode space; a dashboard is a report within it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetadata {
    pub organization: String,
    pub dashboard_group_id: String,
    pub dashboard_group: String,
    pub dashboard_group_description: Option<String>,
    pub dashboard_id: String,
    pub dashboard_name: String,
    pub description: Option<String>,
    pub report_created_at: Option<String>,
    pub report_updated_at: Option<String>,
}

impl DashboardMetadata {
    /// Shape a merged record from the spaces→reports chain.
    ///
    /// Identifier and name fields are required; descriptions and timestamps
    /// are sparse in Mode responses and stay optional.
    pub fn from_record(record: &Record) -> anyhow::Result<Self> {
        Ok(Self {
            organization: required(record, "organization")?,
            dashboard_group_id: required(record, "dashboard_group_id")?,
            dashboard_group: required(record, "dashboard_group")?,
            dashboard_group_description: optional(record, "dashboard_group_description"),
            dashboard_id: required(record, "dashboard_id")?,
            dashboard_name: required(record, "dashboard_name")?,
            description: optional(record, "description"),
            report_created_at: optional(record, "report_created_at"),
            report_updated_at: optional(record, "report_updated_at"),
        })
    }
}

fn optional(record: &Record, name: &str) -> Option<String> {
    record.get(name).and_then(|v| v.as_display())
}

fn required(record: &Record, name: &str) -> anyhow::Result<String> {
    optional(record, name).with_context(|| format!("record has no value for '{name}'"))
}
