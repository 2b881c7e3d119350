//! Product configuration
//!
//! Products are read from a TOML file with one `[[products]]` table per
//! product line:
//!
//! ```toml
//! [[products]]
//! name = "Rice Crispy Treats"
//! shelf_life_days = 75
//! source_location = "rice-crispy-treats"
//! archive_location = "rice-crispy-treats-archive"
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use serde::Deserialize;

use crate::date::check_shelf_life;
use crate::error::{Error, Result};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "products.toml";

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "LABEL_DATES_CONFIG";

/// One product line and where its labels live
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductConfig {
    pub name: String,
    /// Days a product stays good from its processing date
    pub shelf_life_days: u32,
    /// Location holding the live labels
    pub source_location: String,
    /// Location receiving a copy of each label before it is rewritten
    pub archive_location: String,
}

impl ProductConfig {
    pub fn new(
        name: impl Into<String>,
        shelf_life_days: u32,
        source_location: impl Into<String>,
        archive_location: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            shelf_life_days,
            source_location: source_location.into(),
            archive_location: archive_location.into(),
        }
    }

    /// Check a single product
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("product name is empty".to_string()));
        }
        if let Err(Error::Config(reason)) = check_shelf_life(self.shelf_life_days) {
            return Err(Error::Config(format!("{}: {}", self.name, reason)));
        }
        if self.source_location.trim().is_empty() || self.archive_location.trim().is_empty() {
            return Err(Error::Config(format!("{}: locations must not be empty", self.name)));
        }
        if self.source_location.trim() == self.archive_location.trim() {
            return Err(Error::Config(format!(
                "{}: source and archive location are both '{}'",
                self.name, self.source_location
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    products: Vec<ProductConfig>,
}

/// Check a full product list: at least one product, each valid, names unique
pub fn validate_products(products: &[ProductConfig]) -> Result<()> {
    if products.is_empty() {
        return Err(Error::Config("no products configured".to_string()));
    }

    let mut seen = HashSet::new();
    for product in products {
        product.validate()?;
        if !seen.insert(product.name.trim()) {
            return Err(Error::Config(format!("duplicate product '{}'", product.name)));
        }
    }
    Ok(())
}

/// Parse and validate products from TOML text
pub fn parse_products(text: &str) -> Result<Vec<ProductConfig>> {
    let file: ConfigFile = toml::from_str(text)?;
    validate_products(&file.products)?;
    Ok(file.products)
}

/// Load and validate products from a TOML file
pub fn load_products(path: &Path) -> Result<Vec<ProductConfig>> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    parse_products(&text)
}
