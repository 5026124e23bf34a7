//! Dataset providers consumed by the collector agent.
//!
//! A provider is the only seam between the workflow core and wherever the
//! records actually live: a county portal, a JSON export, or a generator.

pub mod mock;

use crate::error::ProviderError;
use crate::models::Dataset;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

pub use mock::{MockDataGenerator, MockProvider};

/// Source of property and appeal records.
#[async_trait]
pub trait DatasetProvider: Send + Sync {
    /// Fetch all records for `source_id`.
    async fn fetch(&self, source_id: &str) -> Result<Dataset, ProviderError>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// Provider serving a fixed dataset from memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    dataset: Dataset,
}

impl InMemoryProvider {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }
}

#[async_trait]
impl DatasetProvider for InMemoryProvider {
    async fn fetch(&self, source_id: &str) -> Result<Dataset, ProviderError> {
        debug!("Serving in-memory dataset for {}", source_id);
        Ok(self.dataset.clone())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

/// Provider reading a `{properties, appeals}` JSON export.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    path: PathBuf,
}

impl JsonFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DatasetProvider for JsonFileProvider {
    async fn fetch(&self, source_id: &str) -> Result<Dataset, ProviderError> {
        info!(
            "Loading dataset for {} from {}",
            source_id,
            self.path.display()
        );

        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProviderError::NotFound(self.path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let dataset: Dataset = serde_json::from_str(&content)?;
        debug!(
            "Loaded {} properties and {} appeals",
            dataset.properties.len(),
            dataset.appeals.len()
        );
        Ok(dataset)
    }

    fn name(&self) -> &str {
        "json-file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "properties": [
            {"property_id": "12-345-67", "address": "123 Main St", "assessed_value": 125000,
             "market_value": 150000, "owner_name": "John Doe", "property_type": "Residential"}
        ],
        "appeals": [
            {"appeal_id": "AP-2024-001", "property_id": "12-345-67", "appeal_date": "2024-01-15",
             "status": "Pending", "requested_value": 100000, "reason": "Overassessment"}
        ]
    }"#;

    #[tokio::test]
    async fn test_json_file_provider_reads_dataset() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", SAMPLE).unwrap();

        let provider = JsonFileProvider::new(file.path());
        let dataset = provider.fetch("lackawanna").await.unwrap();

        assert_eq!(dataset.properties.len(), 1);
        assert_eq!(dataset.appeals[0].id, "AP-2024-001");
        assert_eq!(dataset.appeals[0].requested_value, 100_000);
    }

    #[tokio::test]
    async fn test_json_file_provider_missing_file() {
        let provider = JsonFileProvider::new("/no/such/dataset.json");
        let err = provider.fetch("lackawanna").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_json_file_provider_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"properties\": 42}}").unwrap();

        let provider = JsonFileProvider::new(file.path());
        let err = provider.fetch("lackawanna").await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[test]
    fn test_in_memory_provider() {
        let provider = InMemoryProvider::new(Dataset::default());
        let dataset = tokio_test::block_on(provider.fetch("any")).unwrap();
        assert_eq!(dataset, Dataset::default());
        assert_eq!(provider.name(), "in-memory");
    }
}
