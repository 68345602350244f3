//! Status enums and the order progress tracker.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// The happy path is `Pending → Processing → Shipped → Delivered`.
/// `Cancelled` and `Refunded` are terminal side exits. No transition table is
/// enforced: staff may set any status at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Every status, in display order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
        Self::Refunded,
    ];

    /// The ordered steps shown by the progress tracker.
    pub const TRACKED: [Self; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
    ];

    /// Returns true once no further fulfilment happens.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Refunded)
    }

    /// Returns true for the cancelled/refunded side exits.
    #[must_use]
    pub const fn is_side_exit(self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }

    /// Whether an order in this status contributes to revenue.
    #[must_use]
    pub const fn counts_as_revenue(self) -> bool {
        !self.is_side_exit()
    }

    /// Position on the tracked path, or `None` for side exits.
    #[must_use]
    pub const fn tracker_index(self) -> Option<usize> {
        match self {
            Self::Pending => Some(0),
            Self::Processing => Some(1),
            Self::Shipped => Some(2),
            Self::Delivered => Some(3),
            Self::Cancelled | Self::Refunded => None,
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Refunded => "Refunded",
        }
    }

    /// Compute the progress tracker for this status.
    ///
    /// Steps before the current one are completed and the current step is
    /// active; a delivered order has every step completed. Cancelled and
    /// refunded orders have no tracker at all.
    #[must_use]
    pub fn progress(self) -> Option<[ProgressStep; 4]> {
        let current = self.tracker_index()?;
        let delivered = self == Self::Delivered;

        Some(Self::TRACKED.map(|status| {
            let index = status.tracker_index().unwrap_or_default();
            let state = if index < current || delivered {
                StepState::Completed
            } else if index == current {
                StepState::Active
            } else {
                StepState::Upcoming
            };
            ProgressStep {
                status,
                label: status.label(),
                state,
            }
        }))
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// State of a single step in the progress tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Completed,
    Active,
    Upcoming,
}

/// One step of the order progress tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressStep {
    pub status: OrderStatus,
    pub label: &'static str,
    pub state: StepState,
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Shopper account.
    #[default]
    User,
    /// Staff account with access to `/api/admin`.
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "USER"),
            Self::Admin => write!(f, "ADMIN"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Self::User),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn states(status: OrderStatus) -> Vec<StepState> {
        status
            .progress()
            .unwrap()
            .iter()
            .map(|step| step.state)
            .collect()
    }

    #[test]
    fn test_side_exits_have_no_tracker() {
        assert!(OrderStatus::Cancelled.progress().is_none());
        assert!(OrderStatus::Refunded.progress().is_none());
    }

    #[test]
    fn test_tracker_follows_status_index() {
        use StepState::{Active, Completed, Upcoming};

        assert_eq!(
            states(OrderStatus::Pending),
            vec![Active, Upcoming, Upcoming, Upcoming]
        );
        assert_eq!(
            states(OrderStatus::Shipped),
            vec![Completed, Completed, Active, Upcoming]
        );
        assert_eq!(
            states(OrderStatus::Delivered),
            vec![Completed, Completed, Completed, Completed]
        );
    }

    #[test]
    fn test_tracker_consistent_for_every_tracked_status() {
        for status in OrderStatus::TRACKED {
            let current = status.tracker_index().unwrap();
            for (i, step) in status.progress().unwrap().iter().enumerate() {
                let reached = matches!(step.state, StepState::Completed | StepState::Active);
                assert_eq!(reached, i <= current, "{status} step {i}");
            }
        }
    }

    #[test]
    fn test_status_parse_and_display() {
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!("LOST".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_status_serde_uses_screaming_case() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");
    }

    #[test]
    fn test_revenue_excludes_side_exits() {
        assert!(OrderStatus::Delivered.counts_as_revenue());
        assert!(OrderStatus::Pending.counts_as_revenue());
        assert!(!OrderStatus::Cancelled.counts_as_revenue());
        assert!(!OrderStatus::Refunded.counts_as_revenue());
    }

    #[test]
    fn test_user_role_from_str() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("owner".parse::<UserRole>().is_err());
    }
}
