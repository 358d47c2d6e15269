use crate::common;
use crate::data_loader;
use crate::dataset::{Dataset, Order, OrderItem, Product};
use crate::plan::{ExportFileType, ExportProfileItem, ImportFileType, ImportProfile, Plan};
use crate::report::{self, ReportRow};
use anyhow::{anyhow, Context, Result};
use csv::StringRecord;
use std::path::Path;
use tracing::{debug, info};

/// Picks the field separator for an import file: an explicit override in the
/// profile wins, otherwise the file extension decides.
fn resolve_separator(profile: &ImportProfile) -> Result<u8> {
    if let Some(sep) = profile.separator {
        return Ok(sep as u8);
    }

    let extension = Path::new(&profile.filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("");

    match extension {
        "csv" => Ok(b','),
        "tsv" => Ok(b'\t'),
        _ => Err(anyhow!(
            "Unsupported extension '{}' for import file {} (use csv, tsv, or set a separator)",
            extension,
            profile.filename
        )),
    }
}

/// Loads a data file from disk, returning its headers and records
fn load_file(file_path: &str, separator: u8) -> Result<(Vec<String>, Vec<StringRecord>)> {
    let headers = data_loader::get_headers_from_file(file_path, separator)?;
    let records = data_loader::load_csv(file_path, separator)?;

    debug!(
        "Loaded {} records with headers: {:?}",
        records.len(),
        headers
    );
    Ok((headers, records))
}

/// Loads the three input relations named by the plan's import profiles.
/// Each relation must be supplied exactly once.
fn load_dataset(plan: &Plan, plan_file_path: &Path) -> Result<Dataset> {
    let mut orders: Option<Vec<Order>> = None;
    let mut order_items: Option<Vec<OrderItem>> = None;
    let mut products: Option<Vec<Product>> = None;

    for profile in &plan.import.profiles {
        let parent_dir = plan_file_path
            .parent()
            .ok_or_else(|| anyhow!("Plan file has no parent directory"))?;
        let import_file_path = parent_dir.join(&profile.filename);
        info!(
            "Importing file: {} as {:?}",
            import_file_path.display(),
            profile.filetype
        );

        let file_path_str = import_file_path.to_str().ok_or_else(|| {
            anyhow!(
                "Import file path contains invalid UTF-8: {}",
                import_file_path.display()
            )
        })?;
        let separator = resolve_separator(profile)?;
        let (headers, records) = load_file(file_path_str, separator)?;

        match profile.filetype {
            ImportFileType::Orders => {
                if orders.is_some() {
                    return Err(anyhow!("Duplicate import profile for Orders"));
                }
                data_loader::verify_orders_headers(&headers)?;
                let load_profile = data_loader::create_orders_load_profile(&headers);
                info!("{}", load_profile);
                data_loader::verify_unique_key_column(
                    &records,
                    load_profile.order_id_column,
                    "orders",
                    "order_id",
                )?;

                let mut rows = Vec::with_capacity(records.len());
                for (idx, record) in records.iter().enumerate() {
                    rows.push(Order::from_record(record, &load_profile, idx + 2)?);
                }
                orders = Some(rows);
            }
            ImportFileType::OrderItems => {
                if order_items.is_some() {
                    return Err(anyhow!("Duplicate import profile for OrderItems"));
                }
                data_loader::verify_order_items_headers(&headers)?;
                let load_profile = data_loader::create_order_items_load_profile(&headers);
                info!("{}", load_profile);

                let mut rows = Vec::with_capacity(records.len());
                for (idx, record) in records.iter().enumerate() {
                    rows.push(OrderItem::from_record(record, &load_profile, idx + 2)?);
                }
                order_items = Some(rows);
            }
            ImportFileType::Products => {
                if products.is_some() {
                    return Err(anyhow!("Duplicate import profile for Products"));
                }
                data_loader::verify_products_headers(&headers)?;
                let load_profile = data_loader::create_products_load_profile(&headers);
                info!("{}", load_profile);
                data_loader::verify_unique_key_column(
                    &records,
                    load_profile.product_id_column,
                    "products",
                    "product_id",
                )?;

                let mut rows = Vec::with_capacity(records.len());
                for (idx, record) in records.iter().enumerate() {
                    rows.push(Product::from_record(record, &load_profile, idx + 2)?);
                }
                products = Some(rows);
            }
        }
    }

    let dataset = Dataset {
        orders: orders.ok_or_else(|| anyhow!("Plan has no import profile for Orders"))?,
        order_items: order_items
            .ok_or_else(|| anyhow!("Plan has no import profile for OrderItems"))?,
        products: products.ok_or_else(|| anyhow!("Plan has no import profile for Products"))?,
    };

    info!("Dataset loaded with {}", dataset.stats());
    Ok(dataset)
}

/// Renders the report with the exporter named by the profile and writes it
/// next to the plan file (absolute export paths are used as-is).
fn export_report(
    report_name: &str,
    rows: &[ReportRow],
    profile: &ExportProfileItem,
    plan_file_path: &Path,
) -> Result<()> {
    info!(
        "Exporting file: {} using exporter {:?}",
        profile.filename, profile.exporter
    );

    let output = match &profile.exporter {
        ExportFileType::CSV => crate::export::to_csv::render(rows),
        ExportFileType::JSON => crate::export::to_json::render(rows),
        ExportFileType::Markdown => crate::export::to_markdown::render(report_name, rows),
        ExportFileType::Custom(params) => {
            crate::export::to_custom::render(report_name, rows, params)
        }
    }?;

    let target = if Path::new(&profile.filename).is_absolute() {
        profile.filename.clone()
    } else {
        let parent_dir = plan_file_path
            .parent()
            .ok_or_else(|| anyhow!("Plan file has no parent directory"))?;
        parent_dir.join(&profile.filename).display().to_string()
    };
    common::write_string_to_file(&target, &output)
        .with_context(|| format!("Failed to write to file {}", target))?;
    Ok(())
}

pub fn execute_plan(plan: String) -> Result<()> {
    info!("Executing plan");

    let plan_file_path = Path::new(&plan);
    let path_content = std::fs::read_to_string(plan_file_path)
        .with_context(|| format!("Failed to read plan file {}", plan))?;
    let plan: Plan = serde_yaml::from_str(&path_content)
        .with_context(|| "Failed to parse plan file".to_string())?;

    debug!("Executing plan: {:?}", plan);

    let dataset = load_dataset(&plan, plan_file_path)?;
    let report = report::run_pipeline(&dataset);

    let report_name = plan
        .meta
        .as_ref()
        .and_then(|meta| meta.name.clone())
        .unwrap_or_else(|| "Daily sales report".to_string());

    for profile in &plan.export.profiles {
        export_report(&report_name, &report, profile, plan_file_path)?;
    }

    Ok(())
}
