//! Administrator resolution of pending withdrawals.

use crate::application::engine::Engine;
use crate::application::messages;
use crate::domain::account::UserId;
use crate::domain::ports::{Controls, MessageRef, Outbound};
use crate::domain::withdrawal::{Decision, PendingWithdrawal, RefundPolicy};
use crate::error::{EngineError, Result};
use tracing::{info, warn};

impl Engine {
    /// Settles `requester`'s pending withdrawal.
    ///
    /// The pending record is taken before the ledger is touched, so a second
    /// resolution of the same request finds nothing and changes nothing.
    pub async fn resolve(
        &self,
        actor: UserId,
        requester: UserId,
        decision: Decision,
    ) -> Result<PendingWithdrawal> {
        if actor != self.rules.admin_id {
            warn!(actor, requester, ?decision, "Unauthorized withdrawal resolution");
            return Err(EngineError::Authorization(messages::NOT_AUTHORIZED.to_string()));
        }

        let pending = self.pending.take(requester).await?.ok_or_else(|| {
            EngineError::NotFound(messages::REQUEST_NO_LONGER_VALID.to_string())
        })?;

        let notice = match decision {
            Decision::Approve => {
                if self.rules.refund_policy == RefundPolicy::Overwrite {
                    let previous = self.ledger.debit_to_zero(requester).await?;
                    info!(requester, %previous, "Balance settled to zero");
                }
                messages::approved_to_user(&pending)
            }
            Decision::Reject => {
                match self.rules.refund_policy {
                    RefundPolicy::Overwrite => {
                        self.ledger
                            .restore(requester, pending.requested_amount)
                            .await?
                    }
                    RefundPolicy::AddBack => self.release_hold(&pending).await?,
                }
                messages::REJECTED_TO_USER.to_string()
            }
        };
        info!(
            requester,
            id = %pending.id,
            ?decision,
            method = %pending.method,
            amount = %pending.requested_amount,
            "Withdrawal resolved"
        );

        let menu = self.main_menu(requester).await?;
        if let Err(e) = self
            .notifier
            .send(requester, Outbound::text(notice).with_controls(menu))
            .await
        {
            warn!(requester, "Failed to notify user of resolution: {}", e);
        }
        Ok(pending)
    }

    /// Sends the approval prompt for `pending` to the administrator.
    pub async fn notify_admin(&self, pending: &PendingWithdrawal) -> Result<MessageRef> {
        let prompt = Outbound::text(messages::admin_prompt(pending)).with_controls(
            Controls::AdminDecision {
                requester: pending.requester.user_id,
            },
        );
        self.notifier
            .send(self.rules.admin_id, prompt)
            .await
            .map_err(|e| match e {
                dispatch @ EngineError::Dispatch(_) => dispatch,
                other => EngineError::Dispatch(other.to_string()),
            })
    }

    /// Approve/reject buttons on the admin prompt.
    pub(super) async fn resolve_from_prompt(
        &self,
        actor: UserId,
        requester: UserId,
        decision: Decision,
        origin: Option<MessageRef>,
    ) -> Result<()> {
        let outcome = match self.resolve(actor, requester, decision).await {
            Ok(pending) => match decision {
                Decision::Approve => messages::approved_to_admin(&pending),
                Decision::Reject => messages::rejected_to_admin(&pending),
            },
            Err(EngineError::Authorization(message)) => {
                return self.notifier.alert(actor, &message).await;
            }
            Err(EngineError::NotFound(message)) => message,
            Err(e) => return Err(e),
        };
        self.respond(actor, origin, Outbound::text(outcome)).await
    }

    pub(super) async fn test_admin(&self, actor: UserId) -> Result<()> {
        if actor != self.rules.admin_id {
            return Err(EngineError::Authorization(messages::ADMIN_ONLY.to_string()));
        }
        self.notifier
            .send(self.rules.admin_id, Outbound::text(messages::TEST_NOTIFICATION))
            .await
            .map_err(|e| EngineError::Dispatch(format!("Failed to send test notification: {e}")))?;
        info!(actor, "Admin test notification sent");
        self.send(actor, Outbound::text(messages::TEST_NOTIFICATION_SENT))
            .await
    }
}
