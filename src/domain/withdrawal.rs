use crate::domain::account::{Balance, UserId};
use crate::domain::payment_method::{PaymentMethod, PaymentMethodSpec};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// The acting identity of an inbound event, as seen by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub display_name: String,
    pub handle: Option<String>,
}

impl Identity {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            display_name: user_id.to_string(),
            handle: None,
        }
    }
}

/// An in-progress withdrawal capture, waiting for the destination address.
#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawalDraft {
    pub method: PaymentMethod,
    /// Balance snapshot taken when the rail was selected.
    pub requested_amount: Balance,
    pub created_at: Instant,
}

impl WithdrawalDraft {
    pub fn new(method: PaymentMethod, requested_amount: Balance) -> Self {
        Self {
            method,
            requested_amount,
            created_at: Instant::now(),
        }
    }

    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= ttl
    }
}

/// A submitted withdrawal awaiting the administrator.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWithdrawal {
    pub id: Uuid,
    pub requested_amount: Balance,
    pub method: PaymentMethod,
    pub destination_address: String,
    pub requester: Identity,
}

impl PendingWithdrawal {
    pub fn from_draft(draft: &WithdrawalDraft, address: String, requester: Identity) -> Self {
        Self {
            id: Uuid::new_v4(),
            requested_amount: draft.requested_amount,
            method: draft.method,
            destination_address: address,
            requester,
        }
    }

    pub fn spec(&self) -> &'static PaymentMethodSpec {
        self.method.spec()
    }

    /// Payout after the rail's fee rate; always derived, never stored.
    pub fn final_amount(&self) -> Decimal {
        self.spec().final_amount(self.requested_amount)
    }
}

/// Administrator verdict on a pending withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

/// How a rejected withdrawal gives funds back to the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefundPolicy {
    /// Nothing is held at submission. Approval zeroes the balance and rejection
    /// overwrites it with the requested amount, discarding anything earned while
    /// the request was pending.
    #[default]
    Overwrite,
    /// The requested amount is debited at submission. Approval leaves the
    /// balance alone and rejection credits the amount back.
    AddBack,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pending_final_amount_is_derived() {
        let draft = WithdrawalDraft::new(
            PaymentMethod::Webmoney,
            Balance::new(dec!(10.00)).unwrap(),
        );
        let pending =
            PendingWithdrawal::from_draft(&draft, "Z123456789012".to_string(), Identity::new(3));
        assert_eq!(pending.final_amount(), dec!(9.00));
        assert_eq!(pending.requested_amount, draft.requested_amount);
    }

    #[test]
    fn test_draft_expiry() {
        let draft = WithdrawalDraft::new(PaymentMethod::Payeer, Balance::ZERO);
        let now = draft.created_at;
        assert!(!draft.is_expired(now, Duration::from_secs(60)));
        assert!(draft.is_expired(now + Duration::from_secs(60), Duration::from_secs(60)));
        assert!(draft.is_expired(now, Duration::ZERO));
    }

    #[test]
    fn test_refund_policy_serde_names() {
        let policy: RefundPolicy = serde_json::from_str("\"add-back\"").unwrap();
        assert_eq!(policy, RefundPolicy::AddBack);
        assert_eq!(
            serde_json::to_string(&RefundPolicy::Overwrite).unwrap(),
            "\"overwrite\""
        );
    }
}
