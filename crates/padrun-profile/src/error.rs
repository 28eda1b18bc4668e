use thiserror::Error;

/// Hard failures while reading or writing a mappings file.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read mappings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("mappings file is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// One malformed entry encountered during a lenient load. The entry falls
/// back to its default (or is skipped); the load as a whole still succeeds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed {table} entry {entry:?}: {reason}")]
pub struct ConfigFormatError {
    pub table: &'static str,
    pub entry: String,
    pub reason: String,
}
