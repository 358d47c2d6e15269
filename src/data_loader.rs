use anyhow::{Context, Result};
use csv::StringRecord;
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Structural errors raised when an input file violates its declared schema.
/// Everything else (dangling references, empty files of valid shape) is
/// handled by join/grouping semantics downstream.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("{relation}: missing required column '{column}'")]
    MissingColumn {
        relation: &'static str,
        column: &'static str,
    },
    #[error("{relation} line {line}: missing value for '{field}'")]
    MissingField {
        relation: &'static str,
        line: usize,
        field: &'static str,
    },
    #[error("{relation} line {line}: invalid {field} value '{value}'")]
    InvalidField {
        relation: &'static str,
        line: usize,
        field: &'static str,
        value: String,
    },
    #[error("{relation}: duplicate {column} '{value}'")]
    DuplicateKey {
        relation: &'static str,
        column: &'static str,
        value: String,
    },
}

pub struct OrdersLoadProfile {
    pub order_id_column: usize,
    pub customer_id_column: usize,
    pub purchase_ts_column: usize,
}

impl Default for OrdersLoadProfile {
    fn default() -> Self {
        Self {
            order_id_column: 0,
            customer_id_column: 1,
            purchase_ts_column: 2,
        }
    }
}

impl Display for OrdersLoadProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Orders column offsets: order_id:{}, customer_id:{}, order_purchase_timestamp:{}",
            self.order_id_column, self.customer_id_column, self.purchase_ts_column,
        )
    }
}

pub struct OrderItemsLoadProfile {
    pub order_id_column: usize,
    pub product_id_column: usize,
    pub price_column: usize,
}

impl Default for OrderItemsLoadProfile {
    fn default() -> Self {
        Self {
            order_id_column: 0,
            product_id_column: 1,
            price_column: 2,
        }
    }
}

impl Display for OrderItemsLoadProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Order items column offsets: order_id:{}, product_id:{}, price:{}",
            self.order_id_column, self.product_id_column, self.price_column,
        )
    }
}

pub struct ProductsLoadProfile {
    pub product_id_column: usize,
    pub category_column: usize,
}

impl Default for ProductsLoadProfile {
    fn default() -> Self {
        Self {
            product_id_column: 0,
            category_column: 1,
        }
    }
}

impl Display for ProductsLoadProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Products column offsets: product_id:{}, product_category_name:{}",
            self.product_id_column, self.category_column,
        )
    }
}

pub fn create_orders_load_profile(headers: &[String]) -> OrdersLoadProfile {
    let mut profile = OrdersLoadProfile::default();
    for (i, field) in headers.iter().enumerate() {
        match field.as_str() {
            "order_id" => profile.order_id_column = i,
            "customer_id" => profile.customer_id_column = i,
            "order_purchase_timestamp" => profile.purchase_ts_column = i,
            _ => {}
        }
    }
    profile
}

pub fn create_order_items_load_profile(headers: &[String]) -> OrderItemsLoadProfile {
    let mut profile = OrderItemsLoadProfile::default();
    for (i, field) in headers.iter().enumerate() {
        match field.as_str() {
            "order_id" => profile.order_id_column = i,
            "product_id" => profile.product_id_column = i,
            "price" => profile.price_column = i,
            _ => {}
        }
    }
    profile
}

pub fn create_products_load_profile(headers: &[String]) -> ProductsLoadProfile {
    let mut profile = ProductsLoadProfile::default();
    for (i, field) in headers.iter().enumerate() {
        match field.as_str() {
            "product_id" => profile.product_id_column = i,
            "product_category_name" => profile.category_column = i,
            _ => {}
        }
    }
    profile
}

pub fn get_headers_from_file(filename: &str, separator: u8) -> Result<Vec<String>> {
    let file =
        File::open(filename).with_context(|| format!("Failed to open file {}", filename))?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    if let Some(Ok(header)) = lines.next() {
        let headers: Vec<String> = header
            .split(separator as char)
            .map(|col_name| col_name.trim().to_string())
            .collect();

        Ok(headers)
    } else {
        Err(anyhow::anyhow!(
            "File {} is empty or has no header row",
            filename
        ))
    }
}

pub fn load_csv(filename: &str, separator: u8) -> Result<Vec<StringRecord>> {
    let path = Path::new(filename);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open file {}", filename))?;

    let records: Vec<StringRecord> = reader
        .records()
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("Failed to parse records from {}", filename))?;

    Ok(records)
}

fn verify_headers(
    headers: &[String],
    required: &[&'static str],
    relation: &'static str,
) -> std::result::Result<(), SchemaError> {
    let columns: HashSet<&str> = headers.iter().map(|h| h.as_str()).collect();
    for &col in required {
        if !columns.contains(col) {
            return Err(SchemaError::MissingColumn {
                relation,
                column: col,
            });
        }
    }
    Ok(())
}

pub fn verify_orders_headers(headers: &[String]) -> std::result::Result<(), SchemaError> {
    verify_headers(
        headers,
        &["order_id", "customer_id", "order_purchase_timestamp"],
        "orders",
    )
}

pub fn verify_order_items_headers(headers: &[String]) -> std::result::Result<(), SchemaError> {
    verify_headers(headers, &["order_id", "product_id", "price"], "order_items")
}

pub fn verify_products_headers(headers: &[String]) -> std::result::Result<(), SchemaError> {
    verify_headers(headers, &["product_id", "product_category_name"], "products")
}

/// Ensure the key column of a relation holds unique, non-blank values.
/// Orders and Products declare their ids unique; a violation is a schema
/// fault in the upstream store, not something the joins should paper over.
pub fn verify_unique_key_column(
    records: &[StringRecord],
    key_column: usize,
    relation: &'static str,
    column: &'static str,
) -> std::result::Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for (idx, record) in records.iter().enumerate() {
        let line = idx + 2;
        match record.get(key_column) {
            Some(value) if !value.trim().is_empty() => {
                if !seen.insert(value.trim().to_string()) {
                    return Err(SchemaError::DuplicateKey {
                        relation,
                        column,
                        value: value.trim().to_string(),
                    });
                }
            }
            _ => {
                return Err(SchemaError::MissingField {
                    relation,
                    line,
                    field: column,
                });
            }
        }
    }
    Ok(())
}
