use crate::report::ReportRow;
use anyhow::Result;
use csv::Writer;
use rust_decimal::Decimal;

fn decimal_field(value: &Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn render(rows: &[ReportRow]) -> Result<String> {
    let mut wtr = Writer::from_writer(vec![]);

    // Write the header
    wtr.write_record([
        "purchase_date",
        "total_orders",
        "total_customers",
        "total_revenue",
        "average_revenue_per_order",
        "top_1_category",
        "top_1_percent_revenue",
        "top_2_category",
        "top_2_percent_revenue",
        "top_3_category",
        "top_3_percent_revenue",
    ])?;

    for row in rows {
        wtr.write_record([
            row.purchase_date.to_string(),
            row.total_orders.to_string(),
            row.total_customers.to_string(),
            row.total_revenue.to_string(),
            row.average_revenue_per_order.to_string(),
            row.top_1_category.clone().unwrap_or_default(),
            decimal_field(&row.top_1_percent_revenue),
            row.top_2_category.clone().unwrap_or_default(),
            decimal_field(&row.top_2_percent_revenue),
            row.top_3_category.clone().unwrap_or_default(),
            decimal_field(&row.top_3_percent_revenue),
        ])?;
    }

    let data = wtr.into_inner()?;
    let csv_string = String::from_utf8(data)?;

    Ok(csv_string)
}
