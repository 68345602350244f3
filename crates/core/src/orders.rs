//! Order pricing and customer aggregates.
//!
//! Totals are computed once, when an order is placed. Aggregates such as a
//! customer's `totalSpent` are derived from stored orders at read time and
//! never persisted.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{OrderStatus, ProductId};

/// A purchased product captured at placement time.
///
/// Name and price are copied from the catalog so later catalog edits do not
/// change what the customer bought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
}

impl LineItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Tax and shipping configuration applied when pricing an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingRules {
    /// Fraction of the subtotal, e.g. `0.08` for 8%.
    pub tax_rate: Decimal,
    pub flat_shipping: Decimal,
    /// Subtotal at or above which shipping is free.
    pub free_shipping_threshold: Option<Decimal>,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::ZERO,
            flat_shipping: Decimal::ZERO,
            free_shipping_threshold: None,
        }
    }
}

/// Money columns of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Price a set of line items.
    ///
    /// Shipping is waived when `ships_free` is set (every product in the order
    /// ships free) or the subtotal reaches the configured threshold. Tax is
    /// charged on the subtotal and rounded to cents.
    #[must_use]
    pub fn compute(items: &[LineItem], ships_free: bool, rules: &PricingRules) -> Self {
        let subtotal: Decimal = items.iter().map(LineItem::line_total).sum();
        let tax = (subtotal * rules.tax_rate)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let over_threshold = rules
            .free_shipping_threshold
            .is_some_and(|threshold| subtotal >= threshold);
        let shipping_cost = if ships_free || over_threshold {
            Decimal::ZERO
        } else {
            rules.flat_shipping
        };

        Self {
            subtotal,
            tax,
            shipping_cost,
            total: subtotal + tax + shipping_cost,
        }
    }

    /// True when `total` equals `subtotal + tax + shippingCost`.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.total == self.subtotal + self.tax + self.shipping_cost
    }
}

/// Human-facing order reference, e.g. `PAW-20261019-048213`.
#[must_use]
pub fn format_order_number(placed_at: DateTime<Utc>, suffix: u32) -> String {
    format!("PAW-{}-{:06}", placed_at.format("%Y%m%d"), suffix % 1_000_000)
}

/// Per-customer aggregates derived from their orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerStats {
    /// Sum of totals for orders that count as revenue.
    pub total_spent: Decimal,
    /// Every order the customer placed, whatever its status.
    pub order_count: i64,
}

impl CustomerStats {
    /// Fold `(status, total)` pairs into customer aggregates.
    pub fn from_orders<I>(orders: I) -> Self
    where
        I: IntoIterator<Item = (OrderStatus, Decimal)>,
    {
        orders
            .into_iter()
            .fold(Self::default(), |mut stats, (status, total)| {
                stats.order_count += 1;
                if status.counts_as_revenue() {
                    stats.total_spent += total;
                }
                stats
            })
    }
}

/// Store-wide revenue: totals of every order that is not cancelled or refunded.
pub fn revenue<I>(orders: I) -> Decimal
where
    I: IntoIterator<Item = (OrderStatus, Decimal)>,
{
    orders
        .into_iter()
        .filter(|(status, _)| status.counts_as_revenue())
        .map(|(_, total)| total)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, cents: i64, quantity: i32) -> LineItem {
        LineItem {
            product_id: ProductId::new(id),
            name: format!("Item {id}"),
            price: Decimal::new(cents, 2),
            quantity,
        }
    }

    fn rules() -> PricingRules {
        PricingRules {
            tax_rate: Decimal::new(8, 2),
            flat_shipping: Decimal::new(599, 2),
            free_shipping_threshold: Some(Decimal::from(75)),
        }
    }

    #[test]
    fn test_totals_add_up() {
        let items = [item(1, 1_999, 2), item(2, 450, 1)];
        let totals = OrderTotals::compute(&items, false, &rules());

        assert_eq!(totals.subtotal, Decimal::new(4_448, 2));
        assert_eq!(totals.tax, Decimal::new(356, 2));
        assert_eq!(totals.shipping_cost, Decimal::new(599, 2));
        assert_eq!(totals.total, Decimal::new(5_403, 2));
        assert!(totals.is_consistent());
    }

    #[test]
    fn test_threshold_waives_shipping() {
        let totals = OrderTotals::compute(&[item(1, 8_000, 1)], false, &rules());
        assert_eq!(totals.shipping_cost, Decimal::ZERO);
        assert!(totals.is_consistent());
    }

    #[test]
    fn test_free_shipping_products_waive_shipping() {
        let totals = OrderTotals::compute(&[item(1, 1_000, 1)], true, &rules());
        assert_eq!(totals.shipping_cost, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(1_080, 2));
    }

    #[test]
    fn test_inconsistent_totals_detected() {
        let totals = OrderTotals {
            subtotal: Decimal::from(10),
            tax: Decimal::ONE,
            shipping_cost: Decimal::ZERO,
            total: Decimal::from(12),
        };
        assert!(!totals.is_consistent());
    }

    #[test]
    fn test_customer_stats_skip_side_exits_in_spend() {
        let stats = CustomerStats::from_orders([
            (OrderStatus::Delivered, Decimal::from(40)),
            (OrderStatus::Cancelled, Decimal::from(100)),
            (OrderStatus::Pending, Decimal::from(15)),
        ]);
        assert_eq!(stats.order_count, 3);
        assert_eq!(stats.total_spent, Decimal::from(55));
    }

    #[test]
    fn test_revenue_excludes_refunds() {
        let total = revenue([
            (OrderStatus::Shipped, Decimal::from(20)),
            (OrderStatus::Refunded, Decimal::from(20)),
        ]);
        assert_eq!(total, Decimal::from(20));
    }

    #[test]
    fn test_order_number_format() {
        let placed = DateTime::parse_from_rfc3339("2026-03-04T10:00:00Z")
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_default();
        assert_eq!(format_order_number(placed, 42), "PAW-20260304-000042");
    }
}
