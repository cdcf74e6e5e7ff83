use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::LinkedAccount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "bill_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Paid,
    Unpaid,
    Overdue,
}

impl BillStatus {
    /// Unpaid and overdue bills count towards the amount due.
    pub fn is_due(&self) -> bool {
        matches!(self, BillStatus::Unpaid | BillStatus::Overdue)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Paid => "paid",
            BillStatus::Unpaid => "unpaid",
            BillStatus::Overdue => "overdue",
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paid" => Ok(BillStatus::Paid),
            "unpaid" => Ok(BillStatus::Unpaid),
            "overdue" => Ok(BillStatus::Overdue),
            other => Err(format!("unknown bill status: {}", other)),
        }
    }
}

/// A single billing record issued by a provider for one linked account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Bill {
    pub id: String,
    pub linked_account_id: String,
    pub provider_id: String,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub bill_date: DateTime<Utc>,
    pub status: BillStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    /// Providers may hand back bills without an id; these get one assigned
    /// before they are persisted.
    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }

    /// Stamp the bill with the account it was fetched for.
    ///
    /// Provider-issued ids are only unique within one account, so they are
    /// stored as `<linked_account_id>:<provider_bill_id>`.
    pub fn assign_to(&mut self, account: &LinkedAccount) {
        if self.has_id() {
            let provider_bill_id = self.id.trim();
            let prefix = format!("{}:", account.id);
            if !provider_bill_id.starts_with(&prefix) {
                self.id = format!("{}{}", prefix, provider_bill_id);
            }
        }
        self.linked_account_id = account.id.clone();
        self.provider_id = account.provider_id.clone();
    }
}

/// Aggregate view over a set of bills. Recomputed per request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillSummary {
    pub bills: Vec<Bill>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_due: Decimal,
    pub bill_count: usize,
}

impl BillSummary {
    pub fn empty() -> Self {
        Self {
            bills: Vec::new(),
            total_due: Decimal::ZERO,
            bill_count: 0,
        }
    }

    pub fn from_bills(bills: Vec<Bill>) -> Self {
        let total_due = bills
            .iter()
            .filter(|bill| bill.status.is_due())
            .map(|bill| bill.amount)
            .sum();

        Self {
            bill_count: bills.len(),
            total_due,
            bills,
        }
    }
}

impl Default for BillSummary {
    fn default() -> Self {
        Self::empty()
    }
}
