use chrono::NaiveDate;
use indexmap::IndexMap;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::dataset::Dataset;

/// One row per purchased item, the flattened relation every aggregation
/// stage consumes. The purchase timestamp is already truncated to its
/// calendar date here; nothing downstream sees time-of-day.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderLine {
    pub purchase_date: NaiveDate,
    pub category: Option<String>,
    pub order_id: String,
    pub customer_id: String,
    pub item_price: Decimal,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DailyTotals {
    pub purchase_date: NaiveDate,
    pub total_orders: u64,
    pub total_customers: u64,
    pub total_revenue: Decimal,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CategoryDailyRevenue {
    pub purchase_date: NaiveDate,
    pub category: Option<String>,
    pub category_revenue: Decimal,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RankedCategory {
    pub purchase_date: NaiveDate,
    pub category: String,
    pub category_revenue: Decimal,
    pub rank: u32,
    pub day_revenue: Decimal,
    pub revenue_share: Decimal,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TopCategoriesRow {
    pub purchase_date: NaiveDate,
    pub top_1_category: Option<String>,
    pub top_1_share: Option<Decimal>,
    pub top_2_category: Option<String>,
    pub top_2_share: Option<Decimal>,
    pub top_3_category: Option<String>,
    pub top_3_share: Option<Decimal>,
}

impl TopCategoriesRow {
    fn empty(purchase_date: NaiveDate) -> Self {
        Self {
            purchase_date,
            top_1_category: None,
            top_1_share: None,
            top_2_category: None,
            top_2_share: None,
            top_3_category: None,
            top_3_share: None,
        }
    }
}

/// Final output row. All decimal fields are rounded to 2 places with
/// half-away-from-zero rounding; the top_k fields are None when fewer than
/// k distinct categories existed that day.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ReportRow {
    pub purchase_date: NaiveDate,
    pub total_orders: u64,
    pub total_customers: u64,
    pub total_revenue: Decimal,
    pub average_revenue_per_order: Decimal,
    pub top_1_category: Option<String>,
    pub top_1_percent_revenue: Option<Decimal>,
    pub top_2_category: Option<String>,
    pub top_2_percent_revenue: Option<Decimal>,
    pub top_3_category: Option<String>,
    pub top_3_percent_revenue: Option<Decimal>,
}

pub fn round2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Inner-join orders, order items and products into one row per item.
/// Items referencing a missing order or product are dropped, counted and
/// logged, never failed.
pub fn extract_order_lines(dataset: &Dataset) -> Vec<OrderLine> {
    let orders_by_id: HashMap<&str, &crate::dataset::Order> = dataset
        .orders
        .iter()
        .map(|o| (o.order_id.as_str(), o))
        .collect();
    let products_by_id: HashMap<&str, &crate::dataset::Product> = dataset
        .products
        .iter()
        .map(|p| (p.product_id.as_str(), p))
        .collect();

    let mut lines = Vec::with_capacity(dataset.order_items.len());
    let mut missing_orders = 0usize;
    let mut missing_products = 0usize;

    for item in &dataset.order_items {
        let order = match orders_by_id.get(item.order_id.as_str()) {
            Some(order) => order,
            None => {
                missing_orders += 1;
                continue;
            }
        };
        let product = match products_by_id.get(item.product_id.as_str()) {
            Some(product) => product,
            None => {
                missing_products += 1;
                continue;
            }
        };

        lines.push(OrderLine {
            purchase_date: order.purchase_ts.date(),
            category: product.category.clone(),
            order_id: order.order_id.clone(),
            customer_id: order.customer_id.clone(),
            item_price: item.price,
        });
    }

    if missing_orders > 0 || missing_products > 0 {
        warn!(
            "Dropped order items with dangling references: {} missing orders, {} missing products",
            missing_orders, missing_products
        );
    }
    debug!(
        "Extracted {} order lines from {} order items",
        lines.len(),
        dataset.order_items.len()
    );

    lines
}

/// Per-day distinct order count, distinct customer count and summed revenue.
/// Deliberately category-agnostic: an order spanning several categories must
/// still count once, so this never looks at the category column.
pub fn daily_totals(lines: &[OrderLine]) -> Vec<DailyTotals> {
    let mut by_date: BTreeMap<NaiveDate, (HashSet<&str>, HashSet<&str>, Decimal)> =
        BTreeMap::new();

    for line in lines {
        let entry = by_date.entry(line.purchase_date).or_default();
        entry.0.insert(line.order_id.as_str());
        entry.1.insert(line.customer_id.as_str());
        entry.2 += line.item_price;
    }

    by_date
        .into_iter()
        .map(|(date, (orders, customers, revenue))| DailyTotals {
            purchase_date: date,
            total_orders: orders.len() as u64,
            total_customers: customers.len() as u64,
            total_revenue: revenue,
        })
        .collect()
}

/// Revenue summed per (date, category). The uncategorized group is kept at
/// this stage; per-day group sums add up to the day's total revenue. It
/// drops out at ranking.
pub fn category_revenue(lines: &[OrderLine]) -> Vec<CategoryDailyRevenue> {
    let mut by_date: BTreeMap<NaiveDate, IndexMap<Option<String>, Decimal>> = BTreeMap::new();

    for line in lines {
        *by_date
            .entry(line.purchase_date)
            .or_default()
            .entry(line.category.clone())
            .or_insert(Decimal::ZERO) += line.item_price;
    }

    by_date
        .into_iter()
        .flat_map(|(date, categories)| {
            categories
                .into_iter()
                .map(move |(category, revenue)| CategoryDailyRevenue {
                    purchase_date: date,
                    category,
                    category_revenue: revenue,
                })
        })
        .collect()
}

/// Rank categories within each date by revenue descending, ties broken by
/// category name ascending; the ordering never depends on input order.
/// Uncategorized revenue is excluded from ranking and from the share
/// denominator.
pub fn rank_categories(rows: &[CategoryDailyRevenue]) -> Vec<RankedCategory> {
    let mut by_date: BTreeMap<NaiveDate, Vec<(String, Decimal)>> = BTreeMap::new();
    let mut uncategorized = 0usize;

    for row in rows {
        match &row.category {
            Some(name) => by_date
                .entry(row.purchase_date)
                .or_default()
                .push((name.clone(), row.category_revenue)),
            None => uncategorized += 1,
        }
    }
    if uncategorized > 0 {
        debug!(
            "{} uncategorized revenue groups excluded from category ranking",
            uncategorized
        );
    }

    let mut ranked = Vec::new();
    for (date, mut categories) in by_date {
        let day_revenue: Decimal = categories.iter().map(|(_, revenue)| *revenue).sum();
        categories.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        for (i, (category, revenue)) in categories.into_iter().enumerate() {
            // A day of all zero-priced lines leaves nothing to apportion.
            let revenue_share = if day_revenue.is_zero() {
                Decimal::ZERO
            } else {
                revenue / day_revenue
            };
            ranked.push(RankedCategory {
                purchase_date: date,
                category,
                category_revenue: revenue,
                rank: (i + 1) as u32,
                day_revenue,
                revenue_share,
            });
        }
    }

    ranked
}

/// Collapse ranked categories into one row per date with fixed rank-1/2/3
/// slots. A date keeps its single row even when fewer than three ranks
/// exist; the missing slots stay None.
pub fn top_categories(ranked: &[RankedCategory]) -> Vec<TopCategoriesRow> {
    let mut by_date: BTreeMap<NaiveDate, TopCategoriesRow> = BTreeMap::new();

    for entry in ranked.iter().filter(|entry| entry.rank <= 3) {
        let row = by_date
            .entry(entry.purchase_date)
            .or_insert_with(|| TopCategoriesRow::empty(entry.purchase_date));
        match entry.rank {
            1 => {
                row.top_1_category = Some(entry.category.clone());
                row.top_1_share = Some(entry.revenue_share);
            }
            2 => {
                row.top_2_category = Some(entry.category.clone());
                row.top_2_share = Some(entry.revenue_share);
            }
            3 => {
                row.top_3_category = Some(entry.category.clone());
                row.top_3_share = Some(entry.revenue_share);
            }
            _ => {}
        }
    }

    by_date.into_values().collect()
}

/// Inner-join daily totals with the top-category slots, compute the average
/// revenue per order and apply the 2-decimal rounding. Every date with at
/// least one categorized order line appears in both inputs; a date whose
/// lines are all uncategorized has no ranked row and is dropped by the join.
pub fn build_report(totals: &[DailyTotals], tops: &[TopCategoriesRow]) -> Vec<ReportRow> {
    let tops_by_date: HashMap<NaiveDate, &TopCategoriesRow> =
        tops.iter().map(|row| (row.purchase_date, row)).collect();

    let mut report = Vec::with_capacity(totals.len());
    for day in totals {
        let top = match tops_by_date.get(&day.purchase_date) {
            Some(top) => top,
            None => {
                debug!(
                    "No ranked categories for {}; day dropped by the report join",
                    day.purchase_date
                );
                continue;
            }
        };

        // total_orders >= 1 for every date that has order lines.
        let average = day.total_revenue / Decimal::from(day.total_orders);

        report.push(ReportRow {
            purchase_date: day.purchase_date,
            total_orders: day.total_orders,
            total_customers: day.total_customers,
            total_revenue: round2(day.total_revenue),
            average_revenue_per_order: round2(average),
            top_1_category: top.top_1_category.clone(),
            top_1_percent_revenue: top.top_1_share.map(round2),
            top_2_category: top.top_2_category.clone(),
            top_2_percent_revenue: top.top_2_share.map(round2),
            top_3_category: top.top_3_category.clone(),
            top_3_percent_revenue: top.top_3_share.map(round2),
        });
    }

    report.sort_by_key(|row| row.purchase_date);
    report
}

/// The whole pipeline: extraction feeds the totals and ranking branches
/// independently; the reshaped top-3 result joins back onto the totals.
pub fn run_pipeline(dataset: &Dataset) -> Vec<ReportRow> {
    let lines = extract_order_lines(dataset);
    let totals = daily_totals(&lines);
    let ranked = rank_categories(&category_revenue(&lines));
    let tops = top_categories(&ranked);
    let report = build_report(&totals, &tops);

    info!(
        "Report built: {} days from {} order lines",
        report.len(),
        lines.len()
    );
    report
}
