//! # Catalog Export
//!
//! Turns a resolved product list into a downloadable artifact.
//!
//! Both formats render the same `ExportTable`: one header row
//! (`SKU, Name, Category, Price`) and one row per product, prices with two
//! decimal places. An empty product list still yields a valid document with
//! only the header. Exporting has no side effects.

mod csv;
mod pdf;

use crate::DashError;
use crate::catalog::Product;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column titles of every export, in order.
pub const EXPORT_HEADER: [&str; 4] = ["SKU", "Name", "Category", "Price"];

// =============================================================================
// TABLE
// =============================================================================

/// The rows of an export, already formatted as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    pub title: String,
    pub rows: Vec<[String; 4]>,
}

impl ExportTable {
    #[must_use]
    pub fn new(catalog_name: &str, products: &[Product]) -> Self {
        Self {
            title: catalog_name.to_string(),
            rows: products
                .iter()
                .map(|p| {
                    [
                        p.sku.clone(),
                        p.name.clone(),
                        p.category.clone(),
                        format_price(p.mrp),
                    ]
                })
                .collect(),
        }
    }
}

/// Two decimal places, half away from zero (`19.5` renders `19.50`).
#[must_use]
pub fn format_price(price: Decimal) -> String {
    let rounded = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

// =============================================================================
// FORMATS
// =============================================================================

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Pdf,
    Csv,
}

impl ExportFormat {
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(DashError::Validation(format!(
                "unknown export format '{}', expected 'pdf' or 'csv'",
                other
            ))),
        }
    }
}

/// A finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub format: ExportFormat,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub checksum: String,
}

// =============================================================================
// EXPORT FUNCTIONS
// =============================================================================

/// Render `products` as a PDF table titled `catalog_name`.
pub fn export(catalog_name: &str, products: &[Product]) -> Result<Vec<u8>, DashError> {
    pdf::render(&ExportTable::new(catalog_name, products))
}

/// Render `products` as CSV text.
pub fn export_csv(catalog_name: &str, products: &[Product]) -> Result<Vec<u8>, DashError> {
    csv::render(&ExportTable::new(catalog_name, products))
}

/// Render in `format` and wrap with a file name and checksum.
pub fn export_as(
    format: ExportFormat,
    catalog_name: &str,
    products: &[Product],
) -> Result<Artifact, DashError> {
    let bytes = match format {
        ExportFormat::Pdf => export(catalog_name, products)?,
        ExportFormat::Csv => export_csv(catalog_name, products)?,
    };
    Ok(Artifact {
        format,
        file_name: format!("{}.{}", file_stem(catalog_name), format.extension()),
        checksum: checksum(&bytes),
        bytes,
    })
}

/// A file-system-safe stem: ASCII alphanumerics kept, runs of anything else
/// collapsed to `-`.
#[must_use]
pub fn file_stem(catalog_name: &str) -> String {
    let mut stem = String::with_capacity(catalog_name.len());
    for c in catalog_name.chars() {
        if c.is_ascii_alphanumeric() {
            stem.push(c.to_ascii_lowercase());
        } else if !stem.ends_with('-') {
            stem.push('-');
        }
    }
    let stem = stem.trim_matches('-');
    if stem.is_empty() {
        "catalog".to_string()
    } else {
        stem.to_string()
    }
}

// =============================================================================
// CHECKSUM
// =============================================================================

/// BLAKE3 hex digest of `bytes` (64 characters).
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn checksum(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// 64-bit FNV-1a hex digest of `bytes` (16 characters).
///
/// Enable the `crypto-hash` feature for BLAKE3.
#[cfg(not(feature = "crypto-hash"))]
#[must_use]
pub fn checksum(bytes: &[u8]) -> String {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let hash = bytes
        .iter()
        .fold(OFFSET, |h, b| (h ^ u64::from(*b)).wrapping_mul(PRIME));
    format!("{:016x}", hash)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn widget() -> Product {
        Product {
            id: "p1".to_string(),
            sku: "A1".to_string(),
            name: "Widget".to_string(),
            category: "Misc".to_string(),
            mrp: Decimal::new(195, 1),
            collection: None,
            subcategory: None,
            status: None,
            created_at: None,
        }
    }

    #[test]
    fn prices_have_two_decimals() {
        assert_eq!(format_price(Decimal::new(195, 1)), "19.50");
        assert_eq!(format_price(Decimal::new(7, 0)), "7.00");
        assert_eq!(format_price(Decimal::new(12345, 3)), "12.35");
        assert_eq!(format_price(Decimal::new(-5, 1)), "-0.50");
    }

    #[test]
    fn empty_table_has_no_rows() {
        let table = ExportTable::new("X", &[]);
        assert_eq!(table.title, "X");
        assert!(table.rows.is_empty());
    }

    #[test]
    fn widget_row() {
        let table = ExportTable::new("X", &[widget()]);
        assert_eq!(
            table.rows,
            vec![[
                "A1".to_string(),
                "Widget".to_string(),
                "Misc".to_string(),
                "19.50".to_string()
            ]]
        );
    }

    #[test]
    fn format_parsing() {
        assert_eq!("PDF".parse::<ExportFormat>().ok(), Some(ExportFormat::Pdf));
        assert_eq!(" csv".parse::<ExportFormat>().ok(), Some(ExportFormat::Csv));
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn artifact_carries_name_and_checksum() {
        let artifact = export_as(ExportFormat::Csv, "Summer Sale 2026!", &[widget()]).expect("export");
        assert_eq!(artifact.file_name, "summer-sale-2026.csv");
        assert_eq!(artifact.checksum, checksum(&artifact.bytes));
        assert!(!artifact.checksum.is_empty());
        assert_eq!(file_stem("!!!"), "catalog");
    }

    #[test]
    fn checksum_is_deterministic() {
        assert_eq!(checksum(b"catalog"), checksum(b"catalog"));
        assert_ne!(checksum(b"catalog"), checksum(b"catalogs"));
    }
}
