//! Asynchronous detection entry point.
//!
//! Loading, validating and parsing the two definition files are independent
//! and run concurrently; the comparison itself starts only once both
//! documents are available and runs synchronously.

use tracing::{debug, info};

use crate::ast::Document;
use crate::classify::detect_changes;
use crate::config::{DefinitionFile, DetectorOptions};
use crate::error::DetectError;
use crate::parser::{parse, validate};
use crate::report::ChangeReport;

pub struct Detector {
    options: DetectorOptions,
}

impl Detector {
    pub fn new(options: DetectorOptions) -> Self {
        Detector { options }
    }

    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }

    /// Run one detection. Each call builds its own resolution context, so
    /// repeated calls on the same inputs produce identical reports.
    pub async fn detect(&self) -> Result<ChangeReport, DetectError> {
        let (previous, current) = tokio::try_join!(
            load_document(&self.options.previous),
            load_document(&self.options.current),
        )?;
        let report = detect_changes(&previous, &current, &self.options.config)?;
        info!(
            previous = %previous.name,
            current = %current.name,
            change_type = %report.change_type,
            changes = report.changes.len(),
            "detection finished"
        );
        Ok(report)
    }
}

/// Read (unless inline), validate and parse one definition file.
pub async fn load_document(file: &DefinitionFile) -> Result<Document, DetectError> {
    let text = match &file.content {
        Some(content) => content.clone(),
        None => tokio::fs::read_to_string(&file.path)
            .await
            .map_err(|source| DetectError::Io {
                path: file.path.clone(),
                source,
            })?,
    };
    let name = file.name.clone();
    debug!(file = %name, bytes = text.len(), "parsing definition file");
    tokio::task::spawn_blocking(move || {
        let text = validate(&name, &text)?;
        parse(&name, &text)
    })
    .await?
}
