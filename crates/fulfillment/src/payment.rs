//! Payment gateway trait and implementations.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use domain::{Money, OrderId, PaymentMethod};
use rand::Rng;
use uuid::Uuid;

/// A charge request sent to the payment processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub order_id: OrderId,
    pub amount: Money,
    pub method: PaymentMethod,
}

/// Terminal outcome reported by the payment processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Completed { transaction_id: String },
    Failed { reason: String },
}

impl PaymentOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PaymentOutcome::Completed { .. })
    }
}

/// External payment processor.
///
/// Implementations must map their own transport or processor errors to
/// [`PaymentOutcome::Failed`]. The caller bounds the call with a timeout.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges `request.amount` for an order.
    async fn process(&self, request: PaymentRequest) -> PaymentOutcome;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    processed: Vec<PaymentRequest>,
    next_id: u32,
    fail_on_process: bool,
    delay: Option<Duration>,
}

/// Deterministic payment gateway for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<Mutex<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a gateway that approves every charge.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, InMemoryGatewayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Configures the gateway to decline every charge until reset.
    pub fn set_fail_on_process(&self, fail: bool) {
        self.state().fail_on_process = fail;
    }

    /// Makes every charge wait before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state().delay = delay;
    }

    /// Returns the number of charges attempted so far.
    pub fn processed_count(&self) -> usize {
        self.state().processed.len()
    }

    /// Returns the charges attempted so far, oldest first.
    pub fn processed(&self) -> Vec<PaymentRequest> {
        self.state().processed.clone()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn process(&self, request: PaymentRequest) -> PaymentOutcome {
        let delay = self.state().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.processed.push(request);

        if state.fail_on_process {
            return PaymentOutcome::Failed {
                reason: "Payment declined".to_string(),
            };
        }

        state.next_id += 1;
        PaymentOutcome::Completed {
            transaction_id: format!("TXN-{:06}", state.next_id),
        }
    }
}

/// Stand-in processor that approves a fixed share of charges at random.
#[derive(Debug, Clone)]
pub struct MockPaymentGateway {
    success_rate: f64,
}

impl MockPaymentGateway {
    /// Creates a mock that approves roughly `success_rate` of all charges.
    ///
    /// The rate is clamped to `0.0..=1.0`.
    pub fn new(success_rate: f64) -> Self {
        let success_rate = if success_rate.is_nan() {
            0.0
        } else {
            success_rate.clamp(0.0, 1.0)
        };
        Self { success_rate }
    }

    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new(0.9)
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    #[tracing::instrument(
        skip_all,
        fields(order_id = %request.order_id, amount = %request.amount)
    )]
    async fn process(&self, request: PaymentRequest) -> PaymentOutcome {
        let approved = rand::thread_rng().gen_bool(self.success_rate);
        tracing::debug!(method = ?request.method, approved, "processor decision");
        if approved {
            let id = Uuid::new_v4().simple().to_string()[..12].to_uppercase();
            PaymentOutcome::Completed {
                transaction_id: format!("TXN-{id}"),
            }
        } else {
            PaymentOutcome::Failed {
                reason: "Payment declined by processor".to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PaymentRequest {
        PaymentRequest {
            order_id: OrderId::new(),
            amount: Money::from_cents(4500),
            method: PaymentMethod::CreditCard,
        }
    }

    #[tokio::test]
    async fn test_sequential_transaction_ids() {
        let gateway = InMemoryPaymentGateway::new();

        let first = gateway.process(request()).await;
        let second = gateway.process(request()).await;

        assert_eq!(
            first,
            PaymentOutcome::Completed {
                transaction_id: "TXN-000001".to_string()
            }
        );
        assert_eq!(
            second,
            PaymentOutcome::Completed {
                transaction_id: "TXN-000002".to_string()
            }
        );
        assert_eq!(gateway.processed_count(), 2);
    }

    #[tokio::test]
    async fn test_fail_on_process() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_on_process(true);

        let outcome = gateway.process(request()).await;
        assert!(!outcome.is_completed());
        assert_eq!(gateway.processed_count(), 1);

        gateway.set_fail_on_process(false);
        assert!(gateway.process(request()).await.is_completed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_is_applied() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_delay(Some(Duration::from_secs(30)));

        let started = tokio::time::Instant::now();
        gateway.process(request()).await;
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_mock_extremes_are_deterministic() {
        let always = MockPaymentGateway::new(1.0);
        let never = MockPaymentGateway::new(0.0);

        for _ in 0..20 {
            match always.process(request()).await {
                PaymentOutcome::Completed { transaction_id } => {
                    assert!(transaction_id.starts_with("TXN-"));
                    assert_eq!(transaction_id.len(), 16);
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
            assert!(!never.process(request()).await.is_completed());
        }
    }

    #[test]
    fn test_mock_rate_is_clamped() {
        assert_eq!(MockPaymentGateway::new(3.0).success_rate(), 1.0);
        assert_eq!(MockPaymentGateway::new(-1.0).success_rate(), 0.0);
        assert_eq!(MockPaymentGateway::new(f64::NAN).success_rate(), 0.0);
        assert_eq!(MockPaymentGateway::default().success_rate(), 0.9);
    }
}
