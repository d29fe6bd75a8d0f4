//! Change records and the aggregated report.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Breaking,
    Additive,
    None,
}

impl Severity {
    /// Fixed category token that opens a rendered record.
    pub fn prefix(self) -> &'static str {
        match self {
            Severity::Breaking => "BREAKING: ",
            Severity::Additive => "MINOR: ",
            Severity::None => "",
        }
    }
}

/// One classified difference between the two documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub severity: Severity,
    pub description: String,
}

impl ChangeRecord {
    pub fn breaking(description: impl Into<String>) -> Self {
        ChangeRecord {
            severity: Severity::Breaking,
            description: description.into(),
        }
    }

    pub fn additive(description: impl Into<String>) -> Self {
        ChangeRecord {
            severity: Severity::Additive,
            description: description.into(),
        }
    }

    pub fn is_breaking(&self) -> bool {
        self.severity == Severity::Breaking
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.severity.prefix(), self.description)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Major,
    Minor,
    Patch,
}

impl ChangeType {
    /// Major if anything breaks, minor if anything is additive, else patch.
    pub fn aggregate<'a>(records: impl IntoIterator<Item = &'a ChangeRecord>) -> ChangeType {
        let mut change_type = ChangeType::Patch;
        for record in records {
            match record.severity {
                Severity::Breaking => return ChangeType::Major,
                Severity::Additive => change_type = ChangeType::Minor,
                Severity::None => {}
            }
        }
        change_type
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Major => "major",
            ChangeType::Minor => "minor",
            ChangeType::Patch => "patch",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{ "changeType": ..., "changes": [...] }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeReport {
    pub change_type: ChangeType,
    pub changes: Vec<String>,
}

impl ChangeReport {
    pub fn from_records(records: &[ChangeRecord]) -> Self {
        ChangeReport {
            change_type: ChangeType::aggregate(records),
            changes: records
                .iter()
                .filter(|r| r.severity != Severity::None)
                .map(|r| r.to_string())
                .collect(),
        }
    }

    pub fn is_breaking(&self) -> bool {
        self.change_type == ChangeType::Major
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_is_patch() {
        let report = ChangeReport::from_records(&[]);
        assert_eq!(report.change_type, ChangeType::Patch);
        assert!(report.changes.is_empty());
    }

    #[test]
    fn aggregation_prefers_breaking() {
        let records = vec![
            ChangeRecord::additive("Added new type A"),
            ChangeRecord::breaking("Removed type B"),
        ];
        assert_eq!(ChangeType::aggregate(&records), ChangeType::Major);
        assert_eq!(
            ChangeType::aggregate(&records[..1]),
            ChangeType::Minor
        );
    }

    #[test]
    fn records_render_with_category_token() {
        let record = ChangeRecord::breaking("Removed function f");
        assert_eq!(record.to_string(), "BREAKING: Removed function f");
        assert!(record.is_breaking());
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = ChangeReport::from_records(&[ChangeRecord::additive("Added new type A")]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "changeType": "minor",
                "changes": ["MINOR: Added new type A"],
            })
        );
    }
}
