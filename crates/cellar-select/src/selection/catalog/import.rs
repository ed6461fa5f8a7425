use std::io::Read;
use std::path::Path;

use super::parser::{self, RowError};
use super::InMemoryCatalog;

#[derive(Debug)]
pub enum CatalogImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: u64, reason: String },
    DuplicateId(String),
}

impl std::fmt::Display for CatalogImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogImportError::Io(err) => write!(f, "failed to read catalog export: {}", err),
            CatalogImportError::Csv(err) => write!(f, "invalid catalog CSV data: {}", err),
            CatalogImportError::InvalidRow { line, reason } => {
                write!(f, "invalid catalog row at line {}: {}", line, reason)
            }
            CatalogImportError::DuplicateId(id) => {
                write!(f, "catalog contains wine id '{}' more than once", id)
            }
        }
    }
}

impl std::error::Error for CatalogImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogImportError::Io(err) => Some(err),
            CatalogImportError::Csv(err) => Some(err),
            CatalogImportError::InvalidRow { .. } | CatalogImportError::DuplicateId(_) => None,
        }
    }
}

impl From<std::io::Error> for CatalogImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<RowError> for CatalogImportError {
    fn from(err: RowError) -> Self {
        match err {
            RowError::Csv(err) => Self::Csv(err),
            RowError::Invalid { line, reason } => Self::InvalidRow { line, reason },
        }
    }
}

pub struct CatalogImporter;

impl CatalogImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<InMemoryCatalog, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<InMemoryCatalog, CatalogImportError> {
        let records = parser::parse_records(reader)?;

        let mut seen = std::collections::HashSet::new();
        for record in &records {
            if !seen.insert(record.id.clone()) {
                return Err(CatalogImportError::DuplicateId(record.id.0.clone()));
            }
        }

        Ok(InMemoryCatalog::new(records))
    }
}
