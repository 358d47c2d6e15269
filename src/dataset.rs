use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::StringRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data_loader::{
    OrderItemsLoadProfile, OrdersLoadProfile, ProductsLoadProfile, SchemaError,
};

/// The three input relations, exactly as the upstream store hands them over.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Dataset {
    pub orders: Vec<Order>,
    pub order_items: Vec<OrderItem>,
    pub products: Vec<Product>,
}

impl Dataset {
    pub fn stats(&self) -> String {
        format!(
            "Orders: {}, Order items: {}, Products: {}",
            self.orders.len(),
            self.order_items.len(),
            self.products.len()
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub purchase_ts: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderItem {
    pub order_id: String,
    pub product_id: String,
    pub price: Decimal,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Product {
    pub product_id: String,
    pub category: Option<String>,
}

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

fn parse_purchase_ts(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ts);
        }
    }
    // A bare date is accepted as midnight; only the date survives anyway.
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

fn required_value<'a>(
    record: &'a StringRecord,
    idx: usize,
    relation: &'static str,
    line: usize,
    field: &'static str,
) -> Result<&'a str, SchemaError> {
    match record.get(idx) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim()),
        _ => Err(SchemaError::MissingField {
            relation,
            line,
            field,
        }),
    }
}

impl Order {
    pub fn from_record(
        record: &StringRecord,
        profile: &OrdersLoadProfile,
        line: usize,
    ) -> Result<Self, SchemaError> {
        let order_id =
            required_value(record, profile.order_id_column, "orders", line, "order_id")?;
        let customer_id = required_value(
            record,
            profile.customer_id_column,
            "orders",
            line,
            "customer_id",
        )?;
        let raw_ts = required_value(
            record,
            profile.purchase_ts_column,
            "orders",
            line,
            "order_purchase_timestamp",
        )?;
        let purchase_ts = parse_purchase_ts(raw_ts).ok_or_else(|| SchemaError::InvalidField {
            relation: "orders",
            line,
            field: "order_purchase_timestamp",
            value: raw_ts.to_string(),
        })?;

        Ok(Order {
            order_id: order_id.to_string(),
            customer_id: customer_id.to_string(),
            purchase_ts,
        })
    }
}

impl OrderItem {
    pub fn from_record(
        record: &StringRecord,
        profile: &OrderItemsLoadProfile,
        line: usize,
    ) -> Result<Self, SchemaError> {
        let order_id = required_value(
            record,
            profile.order_id_column,
            "order_items",
            line,
            "order_id",
        )?;
        let product_id = required_value(
            record,
            profile.product_id_column,
            "order_items",
            line,
            "product_id",
        )?;
        let raw_price =
            required_value(record, profile.price_column, "order_items", line, "price")?;
        let price: Decimal = raw_price.parse().map_err(|_| SchemaError::InvalidField {
            relation: "order_items",
            line,
            field: "price",
            value: raw_price.to_string(),
        })?;
        // Declared schema: price is a non-negative decimal.
        if price.is_sign_negative() {
            return Err(SchemaError::InvalidField {
                relation: "order_items",
                line,
                field: "price",
                value: raw_price.to_string(),
            });
        }

        Ok(OrderItem {
            order_id: order_id.to_string(),
            product_id: product_id.to_string(),
            price,
        })
    }
}

impl Product {
    pub fn from_record(
        record: &StringRecord,
        profile: &ProductsLoadProfile,
        line: usize,
    ) -> Result<Self, SchemaError> {
        let product_id = required_value(
            record,
            profile.product_id_column,
            "products",
            line,
            "product_id",
        )?;
        let category = match record.get(profile.category_column) {
            Some(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() || trimmed.to_lowercase() == "null" {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            None => None,
        };

        Ok(Product {
            product_id: product_id.to_string(),
            category,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_parses_common_timestamp_formats() {
        let profile = OrdersLoadProfile::default();
        for ts in [
            "2021-01-01 10:00:00",
            "2021-01-01T10:00:00",
            "2021-01-01 10:00",
            "2021-01-01T10:00",
        ] {
            let record = StringRecord::from(vec!["o1", "c1", ts]);
            let order = Order::from_record(&record, &profile, 2).unwrap();
            assert_eq!(
                order.purchase_ts.date(),
                NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()
            );
        }
    }

    #[test]
    fn order_accepts_bare_date() {
        let profile = OrdersLoadProfile::default();
        let record = StringRecord::from(vec!["o1", "c1", "2021-01-01"]);
        let order = Order::from_record(&record, &profile, 2).unwrap();
        assert_eq!(order.purchase_ts.time(), NaiveTime::MIN);
    }

    #[test]
    fn order_rejects_garbage_timestamp() {
        let profile = OrdersLoadProfile::default();
        let record = StringRecord::from(vec!["o1", "c1", "yesterday"]);
        let err = Order::from_record(&record, &profile, 3).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InvalidField {
                field: "order_purchase_timestamp",
                line: 3,
                ..
            }
        ));
    }

    #[test]
    fn item_parses_price() {
        let profile = OrderItemsLoadProfile::default();
        let record = StringRecord::from(vec!["o1", "p1", "19.90"]);
        let item = OrderItem::from_record(&record, &profile, 2).unwrap();
        assert_eq!(item.price, dec!(19.90));
    }

    #[test]
    fn item_rejects_negative_price() {
        let profile = OrderItemsLoadProfile::default();
        let record = StringRecord::from(vec!["o1", "p1", "-1.00"]);
        let err = OrderItem::from_record(&record, &profile, 2).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { field: "price", .. }));
    }

    #[test]
    fn blank_or_null_category_becomes_none() {
        let profile = ProductsLoadProfile::default();
        for raw in ["", "  ", "null", "NULL"] {
            let record = StringRecord::from(vec!["p1", raw]);
            let product = Product::from_record(&record, &profile, 2).unwrap();
            assert_eq!(product.category, None);
        }
        let record = StringRecord::from(vec!["p1", "electronics"]);
        let product = Product::from_record(&record, &profile, 2).unwrap();
        assert_eq!(product.category.as_deref(), Some("electronics"));
    }

    #[test]
    fn dataset_stats_counts_relations() {
        let dataset = Dataset {
            orders: vec![],
            order_items: vec![],
            products: vec![Product {
                product_id: "p1".to_string(),
                category: None,
            }],
        };
        assert_eq!(dataset.stats(), "Orders: 0, Order items: 0, Products: 1");
    }
}
