use crate::report::ReportRow;
use anyhow::Result;

pub fn render(report_name: &str, rows: &[ReportRow]) -> Result<String> {
    let handlebars = crate::common::get_handlebars();
    let context = super::renderer::create_standard_context(report_name, rows);
    let res = handlebars.render_template(&get_template(), &context)?;
    Ok(res)
}

pub fn get_template() -> String {
    let template = r##"# {{report_name}}

{{day_count}} day(s) of sales.

| purchase date | orders | customers | revenue | avg revenue/order | top 1 | top 2 | top 3 |
|---|---|---|---|---|---|---|---|
{{#each rows as |row|}}
| {{row.purchase_date}} | {{row.total_orders}} | {{row.total_customers}} | {{row.total_revenue}} | {{row.average_revenue_per_order}} | {{#if (exists row.top_1_category)}}{{row.top_1_category}} ({{row.top_1_percent_revenue}}){{/if}} | {{#if (exists row.top_2_category)}}{{row.top_2_category}} ({{row.top_2_percent_revenue}}){{/if}} | {{#if (exists row.top_3_category)}}{{row.top_3_category}} ({{row.top_3_percent_revenue}}){{/if}} |
{{/each}}
"##;

    template.to_string()
}
