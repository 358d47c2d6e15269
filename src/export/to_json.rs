use crate::report::ReportRow;
use anyhow::Result;

pub fn render(rows: &[ReportRow]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rows)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_report_is_an_empty_array() {
        assert_eq!(render(&[]).unwrap(), "[]");
    }

    #[test]
    fn missing_slots_serialize_as_null() {
        let row = ReportRow {
            purchase_date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            total_orders: 1,
            total_customers: 1,
            total_revenue: dec!(150.00),
            average_revenue_per_order: dec!(150.00),
            top_1_category: Some("electronics".to_string()),
            top_1_percent_revenue: Some(dec!(1.00)),
            top_2_category: None,
            top_2_percent_revenue: None,
            top_3_category: None,
            top_3_percent_revenue: None,
        };
        let out = render(&[row]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["purchase_date"], "2021-01-01");
        assert_eq!(parsed[0]["top_1_category"], "electronics");
        assert!(parsed[0]["top_3_category"].is_null());
    }
}
