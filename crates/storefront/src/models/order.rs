//! Orders as stored and as returned to shoppers and staff.

use chrono::{DateTime, Utc};
use serde::Serialize;

use pawfect_core::orders::{LineItem, OrderTotals};
use pawfect_core::{Address, Email, OrderId, OrderStatus, ProgressStep, UserId};

/// A placed order with its line items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: Option<UserId>,
    pub guest_email: Option<Email>,
    /// Account email for signed-in orders, guest email otherwise.
    pub email: Email,
    pub items: Vec<LineItem>,
    #[serde(flatten)]
    pub totals: OrderTotals,
    pub status: OrderStatus,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    #[serde(skip_serializing)]
    pub payment_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether `user` may view this order as its owner.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.user_id == Some(user)
    }
}

/// An order together with its progress tracker, as shown to its owner.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedOrder {
    #[serde(flatten)]
    pub order: Order,
    /// `None` for cancelled and refunded orders.
    pub progress: Option<[ProgressStep; 4]>,
}

impl From<Order> for TrackedOrder {
    fn from(order: Order) -> Self {
        let progress = order.status.progress();
        Self { order, progress }
    }
}

/// Fields required to insert an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: Option<UserId>,
    pub guest_email: Option<Email>,
    pub items: Vec<LineItem>,
    pub totals: OrderTotals,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
}
