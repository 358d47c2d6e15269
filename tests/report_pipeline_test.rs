use std::fs;
use std::path::Path;

use salesrollup::plan_execution::execute_plan;

fn write_file(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).expect("write fixture");
}

fn write_plan(dir: &Path, exports: &str) {
    let plan = format!(
        r#"meta:
  name: Test report
import:
  profiles:
    - filename: orders.csv
      filetype: Orders
    - filename: order_items.csv
      filetype: OrderItems
    - filename: products.csv
      filetype: Products
export:
  profiles:
{}"#,
        exports
    );
    write_file(dir, "report.yaml", &plan);
}

fn plan_path(dir: &Path) -> String {
    dir.join("report.yaml").to_str().unwrap().to_string()
}

#[test]
fn end_to_end_single_order_report() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();

    write_file(
        dir,
        "orders.csv",
        "order_id,customer_id,order_purchase_timestamp\no1,c1,2021-01-01 10:00:00\n",
    );
    write_file(
        dir,
        "order_items.csv",
        "order_id,product_id,price\no1,p1,100.00\no1,p2,50.00\n",
    );
    write_file(
        dir,
        "products.csv",
        "product_id,product_category_name\np1,electronics\np2,books\n",
    );
    write_plan(
        dir,
        "    - filename: report.csv\n      exporter: CSV\n    - filename: report.json\n      exporter: JSON\n",
    );

    execute_plan(plan_path(dir)).unwrap();

    let csv = fs::read_to_string(dir.join("report.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "purchase_date,total_orders,total_customers,total_revenue,average_revenue_per_order,\
         top_1_category,top_1_percent_revenue,top_2_category,top_2_percent_revenue,\
         top_3_category,top_3_percent_revenue"
    );
    assert_eq!(
        lines.next().unwrap(),
        "2021-01-01,1,1,150.00,150.00,electronics,0.67,books,0.33,,"
    );
    assert_eq!(lines.next(), None);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("report.json")).unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["total_revenue"], "150.00");
    assert!(json[0]["top_3_category"].is_null());
}

#[test]
fn dangling_references_are_dropped_not_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();

    write_file(
        dir,
        "orders.csv",
        "order_id,customer_id,order_purchase_timestamp\no1,c1,2021-01-01 10:00:00\n",
    );
    // The second and third items reference an unknown order and product.
    write_file(
        dir,
        "order_items.csv",
        "order_id,product_id,price\no1,p1,100.00\nghost,p1,999.00\no1,ghost,999.00\n",
    );
    write_file(
        dir,
        "products.csv",
        "product_id,product_category_name\np1,electronics\n",
    );
    write_plan(dir, "    - filename: report.csv\n      exporter: CSV\n");

    execute_plan(plan_path(dir)).unwrap();

    let csv = fs::read_to_string(dir.join("report.csv")).unwrap();
    let row = csv.lines().nth(1).unwrap();
    assert_eq!(
        row,
        "2021-01-01,1,1,100.00,100.00,electronics,1.00,,,,"
    );
}

#[test]
fn multi_day_report_is_sorted_by_date() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();

    // Later date listed first in the input.
    write_file(
        dir,
        "orders.csv",
        "order_id,customer_id,order_purchase_timestamp\n\
         o2,c2,2021-01-03 08:00:00\n\
         o1,c1,2021-01-01 10:00:00\n",
    );
    write_file(
        dir,
        "order_items.csv",
        "order_id,product_id,price\no1,p1,10.00\no2,p1,20.00\n",
    );
    write_file(
        dir,
        "products.csv",
        "product_id,product_category_name\np1,toys\n",
    );
    write_plan(dir, "    - filename: report.csv\n      exporter: CSV\n");

    execute_plan(plan_path(dir)).unwrap();

    let csv = fs::read_to_string(dir.join("report.csv")).unwrap();
    let dates: Vec<&str> = csv
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap())
        .collect();
    assert_eq!(dates, vec!["2021-01-01", "2021-01-03"]);
}

#[test]
fn missing_required_column_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();

    // Orders file lacks the purchase timestamp column.
    write_file(dir, "orders.csv", "order_id,customer_id\no1,c1\n");
    write_file(
        dir,
        "order_items.csv",
        "order_id,product_id,price\no1,p1,10.00\n",
    );
    write_file(
        dir,
        "products.csv",
        "product_id,product_category_name\np1,toys\n",
    );
    write_plan(dir, "    - filename: report.csv\n      exporter: CSV\n");

    let err = execute_plan(plan_path(dir)).unwrap_err();
    assert!(err
        .to_string()
        .contains("missing required column 'order_purchase_timestamp'"));
}

#[test]
fn empty_input_produces_header_only_report() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();

    write_file(
        dir,
        "orders.csv",
        "order_id,customer_id,order_purchase_timestamp\n",
    );
    write_file(dir, "order_items.csv", "order_id,product_id,price\n");
    write_file(dir, "products.csv", "product_id,product_category_name\n");
    write_plan(dir, "    - filename: report.csv\n      exporter: CSV\n");

    execute_plan(plan_path(dir)).unwrap();

    let csv = fs::read_to_string(dir.join("report.csv")).unwrap();
    assert_eq!(csv.lines().count(), 1);
}

#[test]
fn markdown_and_custom_templates_render() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();

    write_file(
        dir,
        "orders.csv",
        "order_id,customer_id,order_purchase_timestamp\no1,c1,2021-01-01 10:00:00\n",
    );
    write_file(
        dir,
        "order_items.csv",
        "order_id,product_id,price\no1,p1,100.00\n",
    );
    write_file(
        dir,
        "products.csv",
        "product_id,product_category_name\np1,electronics\n",
    );
    let template_path = dir.join("report.hbs");
    write_file(
        dir,
        "report.hbs",
        "{{report_name}} covers {{day_count}} day(s)",
    );
    write_plan(
        dir,
        &format!(
            "    - filename: report.md\n      exporter: Markdown\n    - filename: report.txt\n      exporter:\n        Custom:\n          template: {}\n",
            template_path.to_str().unwrap()
        ),
    );

    execute_plan(plan_path(dir)).unwrap();

    let md = fs::read_to_string(dir.join("report.md")).unwrap();
    assert!(md.contains("# Test report"));
    assert!(md.contains("electronics (1.00)"));

    let txt = fs::read_to_string(dir.join("report.txt")).unwrap();
    assert_eq!(txt, "Test report covers 1 day(s)");
}
