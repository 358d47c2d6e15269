pub mod to_csv;
pub mod to_custom;
pub mod to_json;
pub mod to_markdown;

/// Common rendering support used by the template-based exporters
pub mod renderer {
    use crate::report::ReportRow;
    use serde_json::{json, Value};

    /// Creates the standard context object handed to report templates
    pub fn create_standard_context(report_name: &str, rows: &[ReportRow]) -> Value {
        json!({
            "report_name": report_name,
            "day_count": rows.len(),
            "rows": rows,
        })
    }
}
