//! Withdrawal state machine:
//! `Idle -> MethodSelected -> AwaitingAddress -> Submitted -> Resolved`.

use crate::application::engine::Engine;
use crate::application::messages;
use crate::domain::account::{Amount, Balance, UserId};
use crate::domain::payment_method::PaymentMethod;
use crate::domain::ports::{Controls, MessageRef, Outbound};
use crate::domain::withdrawal::{Identity, PendingWithdrawal, RefundPolicy, WithdrawalDraft};
use crate::error::{EngineError, Result};
use std::time::Instant;
use tracing::{error, info, warn};

impl Engine {
    /// Entry check before the rail menu is shown.
    pub async fn request_withdrawal(&self, user: UserId) -> Result<Balance> {
        let balance = self.ledger.read(user).await?;
        if balance < self.rules.min_withdrawal {
            return Err(EngineError::Validation(messages::below_minimum(
                self.rules.min_withdrawal.value(),
                balance,
            )));
        }
        Ok(balance)
    }

    /// Opens an address capture for `method`, snapshotting the current balance.
    pub async fn select_method(
        &self,
        user: UserId,
        method: PaymentMethod,
    ) -> Result<WithdrawalDraft> {
        let balance = self.request_withdrawal(user).await?;
        let draft = WithdrawalDraft::new(method, balance);
        if self.drafts.put(user, draft.clone()).await?.is_some() {
            info!(user, %method, "Previous withdrawal draft replaced");
        }
        info!(user, %method, amount = %balance, "Awaiting withdrawal address");
        Ok(draft)
    }

    /// Validates `raw_address` and turns the user's draft into a pending request.
    ///
    /// A malformed address or a balance under the rail's floor leaves the draft
    /// in place. The pending record only survives if the administrator was
    /// actually notified.
    pub async fn submit_address(
        &self,
        requester: &Identity,
        raw_address: &str,
    ) -> Result<PendingWithdrawal> {
        let user = requester.user_id;
        let draft = self.live_draft(user).await?.ok_or_else(|| {
            EngineError::NotFound("Please start the withdrawal process again.".to_string())
        })?;

        let spec = draft.method.spec();
        let address = raw_address.trim();
        if !spec.validate_address(address) {
            return Err(EngineError::Validation(messages::invalid_address(spec)));
        }
        if !spec.meets_minimum(draft.requested_amount) {
            return Err(EngineError::Validation(messages::below_rail_minimum(
                spec,
                draft.requested_amount,
            )));
        }

        let pending = PendingWithdrawal::from_draft(&draft, address.to_string(), requester.clone());
        self.hold_funds(&pending).await?;
        let displaced = self.pending.put(user, pending.clone()).await?;

        if let Err(e) = self.notify_admin(&pending).await {
            error!(user, "Admin notification failed, withdrawal not recorded: {}", e);
            self.roll_back_submission(&pending, displaced).await?;
            return Err(e);
        }

        // The replaced request stays held until its successor is known to the admin.
        if let Some(displaced) = displaced {
            warn!(user, id = %displaced.id, "Pending withdrawal overwritten by a new submission");
            self.release_hold(&displaced).await?;
        }

        self.drafts.take_if(user, &|d: &WithdrawalDraft| *d == draft).await?;
        info!(
            user,
            method = %pending.method,
            amount = %pending.requested_amount,
            final_amount = %pending.final_amount(),
            "Withdrawal submitted"
        );
        Ok(pending)
    }

    /// Drops any open draft. Always succeeds; returns whether one existed.
    pub async fn cancel(&self, user: UserId) -> Result<bool> {
        let existed = self.drafts.take(user).await?.is_some();
        if existed {
            info!(user, "Withdrawal draft cancelled");
        }
        Ok(existed)
    }

    /// The user's pending request, if any.
    pub async fn list(&self, user: UserId) -> Result<Option<PendingWithdrawal>> {
        self.pending.get(user).await
    }

    /// Removes drafts older than the configured TTL.
    pub async fn sweep_expired_drafts(&self) -> Result<usize> {
        let now = Instant::now();
        let ttl = self.rules.draft_ttl;
        let expired = self
            .drafts
            .drain_where(&move |d: &WithdrawalDraft| d.is_expired(now, ttl))
            .await?;
        for (user, draft) in &expired {
            info!(user, method = %draft.method, "Withdrawal draft expired");
        }
        Ok(expired.len())
    }

    /// The user's draft, discarding it first if it has expired.
    async fn live_draft(&self, user: UserId) -> Result<Option<WithdrawalDraft>> {
        let now = Instant::now();
        let ttl = self.rules.draft_ttl;
        if let Some(stale) = self
            .drafts
            .take_if(user, &move |d: &WithdrawalDraft| d.is_expired(now, ttl))
            .await?
        {
            info!(user, method = %stale.method, "Withdrawal draft expired");
            return Ok(None);
        }
        self.drafts.get(user).await
    }

    /// Puts back whatever `pending` displaced, if `pending` is still the
    /// current request, and releases the holds that no longer back a request.
    async fn roll_back_submission(
        &self,
        pending: &PendingWithdrawal,
        displaced: Option<PendingWithdrawal>,
    ) -> Result<()> {
        let user = pending.requester.user_id;
        let id = pending.id;
        let is_unsent = move |current: &PendingWithdrawal| current.id == id;

        let removed = match displaced {
            Some(previous) => {
                let removed = self.pending.swap_if(user, &is_unsent, previous.clone()).await?;
                if removed.is_some() {
                    info!(user, id = %previous.id, "Previous pending withdrawal restored");
                } else {
                    // A later submission replaced ours; the earlier request is gone for good.
                    self.release_hold(&previous).await?;
                }
                removed
            }
            None => self.pending.take_if(user, &is_unsent).await?,
        };
        if removed.is_some() {
            self.release_hold(pending).await?;
        }
        Ok(())
    }

    async fn hold_funds(&self, pending: &PendingWithdrawal) -> Result<()> {
        if self.rules.refund_policy == RefundPolicy::AddBack {
            let amount = Amount::new(pending.requested_amount.value())?;
            let user = pending.requester.user_id;
            if let Err(e) = self.ledger.withdraw(user, amount).await {
                let balance = self.ledger.read(user).await?;
                warn!(user, "Withdrawal hold failed: {}", e);
                return Err(EngineError::Validation(messages::insufficient_for_hold(
                    pending.requested_amount,
                    balance,
                )));
            }
        }
        Ok(())
    }

    pub(super) async fn release_hold(&self, pending: &PendingWithdrawal) -> Result<()> {
        if self.rules.refund_policy == RefundPolicy::AddBack {
            let amount = Amount::new(pending.requested_amount.value())?;
            self.ledger.credit(pending.requester.user_id, amount).await?;
        }
        Ok(())
    }

    /// "Withdraw" menu entry and the balance view's inline button.
    pub(super) async fn show_withdrawal_menu(
        &self,
        user: UserId,
        origin: Option<MessageRef>,
    ) -> Result<()> {
        match self.request_withdrawal(user).await {
            Ok(_) => {
                self.respond(
                    user,
                    origin,
                    Outbound::text(messages::SELECT_METHOD).with_controls(Controls::WithdrawalMenu),
                )
                .await
            }
            // Inline buttons answer with a pop-up instead of a new message.
            Err(EngineError::Validation(message)) if origin.is_some() => {
                self.notifier.alert(user, &message).await
            }
            Err(e) => Err(e),
        }
    }

    pub(super) async fn prompt_for_address(
        &self,
        user: UserId,
        method: PaymentMethod,
        origin: Option<MessageRef>,
    ) -> Result<()> {
        let draft = self.select_method(user, method).await?;
        self.respond(
            user,
            origin,
            Outbound::text(messages::address_prompt(method.spec(), draft.requested_amount))
                .with_controls(Controls::CancelWithdraw),
        )
        .await
    }

    /// Text handler while a draft is open.
    pub(super) async fn capture_address(&self, requester: &Identity, text: &str) -> Result<()> {
        let user = requester.user_id;
        match self.submit_address(requester, text).await {
            Ok(pending) => {
                let menu = self.main_menu(user).await?;
                self.send(user, Outbound::text(messages::submitted(&pending)).with_controls(menu))
                    .await
            }
            // The draft survives validation failures; let the user retry or cancel.
            Err(EngineError::Validation(message)) => {
                self.send(
                    user,
                    Outbound::text(format!("❌ {message}")).with_controls(Controls::CancelWithdraw),
                )
                .await
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{fund, harness, harness_with, Harness};
    use crate::domain::withdrawal::Decision;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    const PAYEER: &str = "P1234567";

    #[tokio::test]
    async fn test_select_method_requires_global_minimum() {
        let Harness { engine, .. } = harness();
        fund(&engine, 1, dec!(4.99)).await;

        let result = engine.select_method(1, PaymentMethod::Payeer).await;
        match result {
            Err(EngineError::Validation(message)) => {
                assert!(message.contains("$5.00"));
                assert!(message.contains("$4.990"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(engine.draft(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_select_method_snapshots_balance() {
        let Harness { engine, .. } = harness();
        fund(&engine, 1, dec!(6.00)).await;

        let draft = engine.select_method(1, PaymentMethod::Payeer).await.unwrap();
        assert_eq!(draft.requested_amount, Balance::new(dec!(6.00)).unwrap());

        // Later earnings do not change the snapshot.
        fund(&engine, 1, dec!(1.00)).await;
        let stored = engine.draft(1).await.unwrap().unwrap();
        assert_eq!(stored.requested_amount, Balance::new(dec!(6.00)).unwrap());
    }

    #[tokio::test]
    async fn test_invalid_address_keeps_draft() {
        let Harness { engine, .. } = harness();
        fund(&engine, 1, dec!(6.00)).await;
        engine.select_method(1, PaymentMethod::Payeer).await.unwrap();

        let result = engine.submit_address(&Identity::new(1), "not-a-wallet").await;
        assert!(matches!(result, Err(EngineError::Validation(_))));
        assert!(engine.draft(1).await.unwrap().is_some());
        assert!(engine.pending_withdrawal(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rail_floor_rechecked_at_submission() {
        let Harness { engine, .. } = harness();
        fund(&engine, 1, dec!(10.00)).await;
        engine.select_method(1, PaymentMethod::UsdtTrc20).await.unwrap();

        let result = engine
            .submit_address(&Identity::new(1), "TXYZabcdefghijkmnopqrstuvwxyz12345")
            .await;
        match result {
            Err(EngineError::Validation(message)) => assert!(message.contains("$30.00")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(engine.draft(1).await.unwrap().is_some());
        assert_eq!(engine.balance(1).await.unwrap(), Balance::new(dec!(10.00)).unwrap());
    }

    #[tokio::test]
    async fn test_submit_without_draft() {
        let Harness { engine, .. } = harness();
        let result = engine.submit_address(&Identity::new(1), PAYEER).await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_submit_creates_pending_and_notifies_admin() {
        let Harness {
            engine, notifier, ..
        } = harness();
        fund(&engine, 1, dec!(10.00)).await;
        engine.select_method(1, PaymentMethod::Webmoney).await.unwrap();

        let pending = engine
            .submit_address(&Identity::new(1), "  Z123456789012 ")
            .await
            .unwrap();
        assert_eq!(pending.destination_address, "Z123456789012");
        assert_eq!(pending.final_amount(), dec!(9.00));
        assert!(engine.draft(1).await.unwrap().is_none());
        assert_eq!(engine.pending_withdrawal(1).await.unwrap(), Some(pending));

        let admin_messages = notifier.sent_to(engine.rules().admin_id);
        assert_eq!(admin_messages.len(), 1);
        assert_eq!(
            admin_messages[0].controls,
            Some(Controls::AdminDecision { requester: 1 })
        );
        // Overwrite policy holds nothing at submission.
        assert_eq!(engine.balance(1).await.unwrap(), Balance::new(dec!(10.00)).unwrap());
    }

    #[tokio::test]
    async fn test_failed_admin_notification_rolls_back() {
        let Harness {
            engine, notifier, ..
        } = harness();
        fund(&engine, 1, dec!(6.00)).await;
        engine.select_method(1, PaymentMethod::Payeer).await.unwrap();
        notifier.fail_for(engine.rules().admin_id);

        let result = engine.submit_address(&Identity::new(1), PAYEER).await;
        assert!(matches!(result, Err(EngineError::Dispatch(_))));
        assert!(engine.pending_withdrawal(1).await.unwrap().is_none());
        assert!(engine.draft(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let Harness { engine, .. } = harness();
        fund(&engine, 1, dec!(6.00)).await;
        engine.select_method(1, PaymentMethod::Payeer).await.unwrap();

        assert!(engine.cancel(1).await.unwrap());
        assert!(!engine.cancel(1).await.unwrap());
        assert!(engine.draft(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_draft_is_not_found() {
        let Harness { engine, .. } = harness_with(|rules| rules.draft_ttl = Duration::ZERO);
        fund(&engine, 1, dec!(6.00)).await;
        engine.select_method(1, PaymentMethod::Payeer).await.unwrap();

        let result = engine.submit_address(&Identity::new(1), PAYEER).await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
        assert!(engine.draft(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired_drafts() {
        let Harness { engine, .. } = harness_with(|rules| rules.draft_ttl = Duration::ZERO);
        fund(&engine, 1, dec!(6.00)).await;
        engine.select_method(1, PaymentMethod::Payeer).await.unwrap();
        assert_eq!(engine.sweep_expired_drafts().await.unwrap(), 1);

        let Harness { engine, .. } = harness();
        fund(&engine, 2, dec!(6.00)).await;
        engine.select_method(2, PaymentMethod::Payeer).await.unwrap();
        assert_eq!(engine.sweep_expired_drafts().await.unwrap(), 0);
        assert!(engine.draft(2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_add_back_holds_funds_at_submission() {
        let Harness { engine, .. } =
            harness_with(|rules| rules.refund_policy = RefundPolicy::AddBack);
        fund(&engine, 1, dec!(6.00)).await;
        engine.select_method(1, PaymentMethod::Payeer).await.unwrap();
        engine.submit_address(&Identity::new(1), PAYEER).await.unwrap();

        assert_eq!(engine.balance(1).await.unwrap(), Balance::ZERO);
    }

    #[tokio::test]
    async fn test_add_back_releases_hold_when_admin_unreachable() {
        let Harness {
            engine, notifier, ..
        } = harness_with(|rules| rules.refund_policy = RefundPolicy::AddBack);
        fund(&engine, 1, dec!(6.00)).await;
        engine.select_method(1, PaymentMethod::Payeer).await.unwrap();
        notifier.fail_for(engine.rules().admin_id);

        assert!(engine.submit_address(&Identity::new(1), PAYEER).await.is_err());
        assert_eq!(engine.balance(1).await.unwrap(), Balance::new(dec!(6.00)).unwrap());
    }

    #[tokio::test]
    async fn test_failed_resubmission_keeps_earlier_request() {
        let Harness {
            engine, notifier, ..
        } = harness();
        let admin = engine.rules().admin_id;
        fund(&engine, 1, dec!(6.00)).await;
        engine.select_method(1, PaymentMethod::Payeer).await.unwrap();
        let first = engine.submit_address(&Identity::new(1), PAYEER).await.unwrap();

        engine.select_method(1, PaymentMethod::Payeer).await.unwrap();
        notifier.fail_for(admin);
        let result = engine.submit_address(&Identity::new(1), "P7654321").await;
        assert!(matches!(result, Err(EngineError::Dispatch(_))));

        assert_eq!(engine.pending_withdrawal(1).await.unwrap(), Some(first.clone()));
        let resolved = engine
            .resolve(admin, 1, Decision::Approve)
            .await
            .unwrap();
        assert_eq!(resolved, first);
    }

    #[tokio::test]
    async fn test_add_back_failed_resubmission_restores_both_holds() {
        let Harness {
            engine, notifier, ..
        } = harness_with(|rules| rules.refund_policy = RefundPolicy::AddBack);
        fund(&engine, 1, dec!(6.00)).await;
        engine.select_method(1, PaymentMethod::Payeer).await.unwrap();
        let first = engine.submit_address(&Identity::new(1), PAYEER).await.unwrap();
        assert_eq!(engine.balance(1).await.unwrap(), Balance::ZERO);

        fund(&engine, 1, dec!(5.00)).await;
        engine.select_method(1, PaymentMethod::Payeer).await.unwrap();
        notifier.fail_for(engine.rules().admin_id);
        assert!(engine.submit_address(&Identity::new(1), "P7654321").await.is_err());

        // The first request still holds its 6.00; only the second hold came back.
        assert_eq!(engine.balance(1).await.unwrap(), Balance::new(dec!(5.00)).unwrap());
        assert_eq!(engine.pending_withdrawal(1).await.unwrap(), Some(first));
    }
}
