use thiserror::Error;

/// Errors raised while turning price files into stored records.
///
/// Every variant except `Directory` is contained to a single line or file:
/// the pipeline logs it, records it in the ingestion report and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestionError {
    #[error("Malformed price line '{line}': {reason}")]
    Format { line: String, reason: String },

    #[error("File name {file_name} doesn't match pattern SYMBOL_values.csv")]
    Naming { file_name: String },

    #[error("File {file_name} does not exist, is unreadable or is empty")]
    EmptyOrMissingFile { file_name: String },

    #[error("Prices directory {path} unusable: {reason}")]
    Directory { path: String, reason: String },

    #[error("Failed to store prices from {file_name}: {reason}")]
    Storage { file_name: String, reason: String },
}

impl IngestionError {
    pub fn format(line: &str, reason: impl Into<String>) -> Self {
        IngestionError::Format {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_formatting() {
        let error = IngestionError::format("BTC,100.10", "expected 3 fields, found 2");

        let msg = error.to_string();
        assert!(msg.contains("BTC,100.10"));
        assert!(msg.contains("expected 3 fields"));
    }

    #[test]
    fn test_naming_error_formatting() {
        let error = IngestionError::Naming {
            file_name: "BTC.txt".to_string(),
        };

        assert!(error.to_string().contains("SYMBOL_values.csv"));
    }
}
