//! Payment record for an order.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

/// How the customer chose to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    PayPal,
    BankTransfer,
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "CreditCard",
            PaymentMethod::DebitCard => "DebitCard",
            PaymentMethod::PayPal => "PayPal",
            PaymentMethod::BankTransfer => "BankTransfer",
            PaymentMethod::CashOnDelivery => "CashOnDelivery",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CreditCard" => Ok(PaymentMethod::CreditCard),
            "DebitCard" => Ok(PaymentMethod::DebitCard),
            "PayPal" => Ok(PaymentMethod::PayPal),
            "BankTransfer" => Ok(PaymentMethod::BankTransfer),
            "CashOnDelivery" => Ok(PaymentMethod::CashOnDelivery),
            other => Err(DomainError::UnknownVariant {
                kind: "payment method",
                value: other.to_string(),
            }),
        }
    }
}

/// Payment lifecycle: `Pending` until the gateway answers, then terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Completed => "Completed",
            PaymentStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(PaymentStatus::Pending),
            "Completed" => Ok(PaymentStatus::Completed),
            "Failed" => Ok(PaymentStatus::Failed),
            other => Err(DomainError::UnknownVariant {
                kind: "payment status",
                value: other.to_string(),
            }),
        }
    }
}

/// The single payment attempt of an order.
///
/// `transaction_id` is present iff `Completed`; `failure_reason` iff `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub order_id: OrderId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Creates the pending payment recorded alongside a new order.
    pub fn pending(
        order_id: OrderId,
        amount: Money,
        method: PaymentMethod,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            amount,
            method,
            status: PaymentStatus::Pending,
            transaction_id: None,
            failure_reason: None,
            created_at: at,
            processed_at: None,
        }
    }

    /// Records a successful charge.
    pub fn complete(&mut self, transaction_id: impl Into<String>, at: DateTime<Utc>) {
        self.status = PaymentStatus::Completed;
        self.transaction_id = Some(transaction_id.into());
        self.failure_reason = None;
        self.processed_at = Some(at);
    }

    /// Records a declined or timed-out charge.
    pub fn fail(&mut self, reason: impl Into<String>, at: DateTime<Utc>) {
        self.status = PaymentStatus::Failed;
        self.transaction_id = None;
        self.failure_reason = Some(reason.into());
        self.processed_at = Some(at);
    }
}
