//! Vocabulary shared by the two outbound document tables.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Which outbound table a document lives in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum OutboundKind {
    SalesOrder,
    InternalTransfer,
}

impl OutboundKind {
    pub fn code_prefix(self) -> &'static str {
        match self {
            OutboundKind::SalesOrder => "EXP-SAL",
            OutboundKind::InternalTransfer => "EXP-INT",
        }
    }

    /// Table name recorded as the reference on reservations and ledger rows.
    pub fn reference_table(self) -> &'static str {
        match self {
            OutboundKind::SalesOrder => "sales_orders",
            OutboundKind::InternalTransfer => "transfers",
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundStatus {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "PENDING_APPROVAL")]
    PendingApproval,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    #[sea_orm(string_value = "CONFIRMED")]
    Confirmed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl OutboundStatus {
    pub fn can_transition_to(self, next: OutboundStatus) -> bool {
        use OutboundStatus::*;
        matches!(
            (self, next),
            (Draft, PendingApproval)
                | (Draft, Approved)
                | (PendingApproval, Approved)
                | (PendingApproval, Rejected)
                | (Approved, Confirmed)
                | (Draft, Cancelled)
                | (PendingApproval, Cancelled)
                | (Approved, Cancelled)
        )
    }
}

/// Fixed set of reasons a manager may give when rejecting a document.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionCode {
    #[sea_orm(string_value = "OUT_OF_STOCK")]
    OutOfStock,
    #[sea_orm(string_value = "CUSTOMER_ISSUE")]
    CustomerIssue,
    #[sea_orm(string_value = "PRICING_ERROR")]
    PricingError,
    #[sea_orm(string_value = "DUPLICATE_ORDER")]
    DuplicateOrder,
    #[sea_orm(string_value = "OTHER")]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_forward_transitions_are_allowed() {
        use OutboundStatus::*;
        assert!(Draft.can_transition_to(PendingApproval));
        assert!(Draft.can_transition_to(Approved));
        assert!(PendingApproval.can_transition_to(Rejected));
        assert!(!Approved.can_transition_to(Draft));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Draft.can_transition_to(Rejected));
    }

    #[test]
    fn kinds_map_to_prefixes_and_tables() {
        assert_eq!(OutboundKind::SalesOrder.code_prefix(), "EXP-SAL");
        assert_eq!(OutboundKind::InternalTransfer.code_prefix(), "EXP-INT");
        assert_eq!(OutboundKind::InternalTransfer.reference_table(), "transfers");
        assert_eq!(OutboundKind::SalesOrder.to_string(), "SALES_ORDER");
    }
}
