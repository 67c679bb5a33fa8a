//! Checkout state machine.

use serde::{Deserialize, Serialize};

/// The stage a checkout has reached.
///
/// State transitions:
/// ```text
/// Validating ──► Reserving ──► AwaitingPayment ──► Finalizing ──► Done
///     │              │                                 │
///     └──────────────┴─────────────────────────────────┴──► Failed
/// ```
///
/// A declined payment still ends in `Done`: the order is finalized as
/// cancelled. `Failed` means the checkout returned an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckoutState {
    /// Reading the cart and checking stock. Nothing has been written.
    #[default]
    Validating,

    /// Creating the order and taking stock in one unit of work.
    Reserving,

    /// Waiting for the payment gateway, outside any unit of work.
    AwaitingPayment,

    /// Applying the payment outcome, with compensation on failure.
    Finalizing,

    /// The order was returned to the caller (terminal state).
    Done,

    /// The checkout was aborted with an error (terminal state).
    Failed { reason: String },
}

impl CheckoutState {
    /// Returns the stage that follows this one on the happy path.
    pub fn next(&self) -> Self {
        match self {
            CheckoutState::Validating => CheckoutState::Reserving,
            CheckoutState::Reserving => CheckoutState::AwaitingPayment,
            CheckoutState::AwaitingPayment => CheckoutState::Finalizing,
            CheckoutState::Finalizing | CheckoutState::Done => CheckoutState::Done,
            CheckoutState::Failed { reason } => CheckoutState::Failed {
                reason: reason.clone(),
            },
        }
    }

    /// Returns true if stock may have been taken by the time this stage is reached.
    pub fn holds_reservation(&self) -> bool {
        matches!(
            self,
            CheckoutState::AwaitingPayment | CheckoutState::Finalizing
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Done | CheckoutState::Failed { .. })
    }

    /// Aborts the checkout at this stage.
    pub fn fail(&self, reason: impl Into<String>) -> Self {
        CheckoutState::Failed {
            reason: reason.into(),
        }
    }

    /// The error that aborted the checkout, if it failed.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            CheckoutState::Failed { reason } => Some(reason),
            _ => None,
        }
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Validating => "Validating",
            CheckoutState::Reserving => "Reserving",
            CheckoutState::AwaitingPayment => "AwaitingPayment",
            CheckoutState::Finalizing => "Finalizing",
            CheckoutState::Done => "Done",
            CheckoutState::Failed { .. } => "Failed",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_validating() {
        assert_eq!(CheckoutState::default(), CheckoutState::Validating);
    }

    #[test]
    fn test_happy_path_order() {
        let mut state = CheckoutState::default();
        let mut seen = vec![state.clone()];
        while !state.is_terminal() {
            state = state.next();
            seen.push(state.clone());
        }
        assert_eq!(
            seen,
            vec![
                CheckoutState::Validating,
                CheckoutState::Reserving,
                CheckoutState::AwaitingPayment,
                CheckoutState::Finalizing,
                CheckoutState::Done,
            ]
        );
    }

    #[test]
    fn test_reservation_window() {
        assert!(!CheckoutState::Validating.holds_reservation());
        assert!(!CheckoutState::Reserving.holds_reservation());
        assert!(CheckoutState::AwaitingPayment.holds_reservation());
        assert!(CheckoutState::Finalizing.holds_reservation());
        assert!(!CheckoutState::Done.holds_reservation());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!CheckoutState::Validating.is_terminal());
        assert!(!CheckoutState::Finalizing.is_terminal());
        assert!(CheckoutState::Done.is_terminal());
        let failed = CheckoutState::Reserving.fail("out of stock");
        assert!(failed.is_terminal());
        assert_eq!(failed.next(), failed);
    }

    #[test]
    fn test_failed_state_keeps_reason() {
        let failed = CheckoutState::Finalizing.fail("database unavailable");
        assert_eq!(failed.failure_reason(), Some("database unavailable"));
        assert_eq!(failed.to_string(), "Failed");
        assert!(!failed.holds_reservation());
        assert_eq!(CheckoutState::Done.failure_reason(), None);

        let json = serde_json::to_string(&failed).unwrap();
        assert_eq!(json, r#"{"Failed":{"reason":"database unavailable"}}"#);
    }

    #[test]
    fn test_serialization() {
        let state = CheckoutState::AwaitingPayment;
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, "\"AwaitingPayment\"");
        let deserialized: CheckoutState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
    }
}
