use std::path::Path;

use kvgit_blob::WriterOptions;
use kvgit_kv::Throughput;
use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, AdapterResult};

/// Where kvgit keeps its data and how it streams pack files.
///
/// Every field has a default; a TOML file only needs the keys it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Table holding one configuration text row per repository.
    pub configurations_table: String,
    /// Table holding one row per reference.
    pub refs_table: String,
    /// Table holding one row per pack.
    pub pack_descriptions_table: String,
    /// Bucket holding pack files.
    pub packs_bucket: String,
    /// Block size reported by pack readers and writers, in bytes.
    pub streaming_block_size: usize,
    /// Extra bytes requested beyond each read.
    pub read_ahead: u64,
    /// Bytes a pack writer may run ahead of its upload before blocking.
    pub upload_high_water_mark: u64,
    /// Read capacity hint for a newly created references table.
    pub refs_table_read_capacity: u64,
    /// Write capacity hint for a newly created references table.
    pub refs_table_write_capacity: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            configurations_table: "kvgit.Configurations".into(),
            refs_table: "kvgit.Refs".into(),
            pack_descriptions_table: "kvgit.PackDescriptions".into(),
            packs_bucket: "kvgit-packs".into(),
            streaming_block_size: 128 * 1024,
            read_ahead: 0,
            upload_high_water_mark: 1024 * 1024,
            refs_table_read_capacity: 10,
            refs_table_write_capacity: 10,
        }
    }
}

impl AdapterConfig {
    /// Parse TOML text and validate the result.
    pub fn from_toml_str(text: &str) -> AdapterResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| AdapterError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> AdapterResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> AdapterResult<String> {
        toml::to_string(self).map_err(|e| AdapterError::InvalidConfig(e.to_string()))
    }

    /// Reject settings the stores cannot work with.
    pub fn validate(&self) -> AdapterResult<()> {
        let names = [
            ("configurations_table", &self.configurations_table),
            ("refs_table", &self.refs_table),
            ("pack_descriptions_table", &self.pack_descriptions_table),
            ("packs_bucket", &self.packs_bucket),
        ];
        if let Some((field, _)) = names.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(AdapterError::InvalidConfig(format!("{field} must not be empty")));
        }
        if self.streaming_block_size == 0 {
            return Err(AdapterError::InvalidConfig(
                "streaming_block_size must be positive".into(),
            ));
        }
        if self.upload_high_water_mark == 0 {
            return Err(AdapterError::InvalidConfig(
                "upload_high_water_mark must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Options for pack writers.
    pub fn writer_options(&self) -> WriterOptions {
        WriterOptions {
            block_size: self.streaming_block_size,
            high_water_mark: self.upload_high_water_mark,
            content_length: None,
        }
    }

    /// Capacity hints for the references table.
    pub fn refs_throughput(&self) -> Throughput {
        Throughput {
            read_capacity: self.refs_table_read_capacity,
            write_capacity: self.refs_table_write_capacity,
        }
    }
}
