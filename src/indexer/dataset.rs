use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::rag::{Document, COCKTAIL_SOURCE, SOURCE_KEY};

/// One row of the cocktails CSV. Extra columns are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CocktailRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ingredients: String,
    #[serde(default)]
    pub instructions: String,
}

impl CocktailRecord {
    /// Stable id derived from the name, so re-importing replaces the same points.
    pub fn document_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.name.trim().as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Uuid::from_bytes(bytes).to_string()
    }

    pub fn content(&self) -> String {
        format!(
            "Cocktail: {}\nIngredients: {}\nInstructions: {}",
            self.name, self.ingredients, self.instructions
        )
    }

    pub fn into_document(self) -> Document {
        Document::new(self.content())
            .with_id(self.document_id())
            .with_metadata("name", self.name)
            .with_metadata("ingredients", self.ingredients)
            .with_metadata(SOURCE_KEY, COCKTAIL_SOURCE)
    }
}

pub fn read_cocktails<R: Read>(reader: R) -> Result<Vec<CocktailRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (row, result) in csv_reader.deserialize::<CocktailRecord>().enumerate() {
        let record = result.with_context(|| format!("Invalid cocktail row {}", row + 1))?;
        if record.name.is_empty() {
            tracing::warn!("Skipping cocktail row {} without a name", row + 1);
            continue;
        }
        records.push(record);
    }

    Ok(records)
}

pub fn load_cocktails(path: &Path) -> Result<Vec<CocktailRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open cocktails dataset: {}", path.display()))?;
    read_cocktails(file)
}
