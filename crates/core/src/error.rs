use std::path::PathBuf;

/// Errors that abort a detection run. Ordinary differences between the two
/// documents are never errors; they become change records instead.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    /// The text is not well-formed against the declaration grammar.
    #[error("{file}:{line}: {message}")]
    Parse {
        file: String,
        line: u32,
        message: String,
    },

    /// The document contains non-declarative (executable) content.
    #[error("{file}:{line}: not a valid definition file: {message}")]
    Validation {
        file: String,
        line: u32,
        message: String,
    },

    /// A named type reference could not be resolved in the shared context.
    #[error("{file}:{line}: cannot resolve type '{name}'")]
    Resolution {
        file: String,
        line: u32,
        name: String,
    },

    /// A definition file could not be read.
    #[error("failed to read definition file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid detector configuration (e.g. a malformed ignore pattern).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A background parse task panicked or was cancelled.
    #[error("definition task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl DetectError {
    pub fn parse(file: &str, line: u32, message: impl Into<String>) -> Self {
        DetectError::Parse {
            file: file.to_owned(),
            line,
            message: message.into(),
        }
    }

    pub fn validation(file: &str, line: u32, message: impl Into<String>) -> Self {
        DetectError::Validation {
            file: file.to_owned(),
            line,
            message: message.into(),
        }
    }

    pub fn resolution(file: &str, line: u32, name: impl Into<String>) -> Self {
        DetectError::Resolution {
            file: file.to_owned(),
            line,
            name: name.into(),
        }
    }

    /// True for failures that happen before any comparison starts.
    pub fn is_initialization(&self) -> bool {
        matches!(
            self,
            DetectError::Parse { .. }
                | DetectError::Validation { .. }
                | DetectError::Io { .. }
                | DetectError::Task(_)
        )
    }

    /// Short machine-readable category used in JSON error output.
    pub fn kind(&self) -> &'static str {
        match self {
            DetectError::Parse { .. } => "parse",
            DetectError::Validation { .. } => "validation",
            DetectError::Resolution { .. } => "resolution",
            DetectError::Io { .. } => "io",
            DetectError::Config(_) => "config",
            DetectError::Task(_) => "internal",
        }
    }

    /// Serialize to JSON. Always includes every field (null for missing).
    pub fn to_json_value(&self) -> serde_json::Value {
        let (file, line) = match self {
            DetectError::Parse { file, line, .. }
            | DetectError::Validation { file, line, .. }
            | DetectError::Resolution { file, line, .. } => (Some(file.clone()), Some(*line)),
            DetectError::Io { path, .. } => (Some(path.display().to_string()), None),
            DetectError::Config(_) | DetectError::Task(_) => (None, None),
        };
        serde_json::json!({
            "file":    file,
            "kind":    self.kind(),
            "line":    line,
            "message": self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialization_errors_are_grouped() {
        assert!(DetectError::parse("a.d.ts", 1, "x").is_initialization());
        assert!(DetectError::validation("a.d.ts", 1, "x").is_initialization());
        assert!(!DetectError::resolution("a.d.ts", 1, "Foo").is_initialization());
        assert!(!DetectError::Config("bad".into()).is_initialization());
    }

    #[test]
    fn resolution_error_names_the_reference() {
        let e = DetectError::resolution("previous.d.ts", 3, "Invalid");
        assert_eq!(e.to_string(), "previous.d.ts:3: cannot resolve type 'Invalid'");
        let json = e.to_json_value();
        assert_eq!(json["kind"], "resolution");
        assert_eq!(json["line"], 3);
        assert_eq!(json["file"], "previous.d.ts");
    }

    #[test]
    fn config_error_json_has_null_location() {
        let json = DetectError::Config("bad pattern".into()).to_json_value();
        assert!(json["file"].is_null());
        assert!(json["line"].is_null());
    }
}
