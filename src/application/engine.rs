use crate::application::messages;
use crate::config::Settings;
use crate::domain::account::{Amount, Balance, UserAccount, UserId};
use crate::domain::action::{Action, Button, InboundEvent, MenuItem};
use crate::domain::challenge::{AnswerGenerator, Challenge};
use crate::domain::ports::{
    Controls, KeyedStoreBox, LedgerBox, MessageRef, NotifierBox, Outbound, RendererBox,
};
use crate::domain::withdrawal::{PendingWithdrawal, RefundPolicy, WithdrawalDraft};
use crate::error::{EngineError, Result};
use crate::infrastructure::in_memory::{InMemoryLedger, InMemoryStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Business rules resolved from [`Settings`].
#[derive(Debug, Clone)]
pub struct Rules {
    pub admin_id: UserId,
    /// Contact handle shown in the help text.
    pub admin_username: String,
    pub reward: Amount,
    pub min_withdrawal: Balance,
    pub refund_policy: RefundPolicy,
    pub draft_ttl: Duration,
}

impl TryFrom<&Settings> for Rules {
    type Error = EngineError;

    fn try_from(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            admin_id: settings.admin.id,
            admin_username: settings.admin.username.clone(),
            reward: settings.reward()?,
            min_withdrawal: settings.min_withdrawal()?,
            refund_policy: settings.withdrawals.refund_policy,
            draft_ttl: settings.draft_ttl(),
        })
    }
}

/// The four per-user maps the engine operates over.
pub struct Stores {
    pub ledger: LedgerBox,
    pub challenges: KeyedStoreBox<Challenge>,
    pub drafts: KeyedStoreBox<WithdrawalDraft>,
    pub pending: KeyedStoreBox<PendingWithdrawal>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            ledger: Box::new(InMemoryLedger::new()),
            challenges: Box::new(InMemoryStore::new()),
            drafts: Box::new(InMemoryStore::new()),
            pending: Box::new(InMemoryStore::new()),
        }
    }
}

/// The session and ledger state machine.
///
/// `Engine` owns the stores and the transport ports. Every inbound event is an
/// independent unit of work, so one engine can be shared behind an `Arc` and
/// driven from many tasks at once; per-user consistency comes from the stores.
pub struct Engine {
    pub(super) rules: Rules,
    pub(super) ledger: LedgerBox,
    pub(super) challenges: KeyedStoreBox<Challenge>,
    pub(super) drafts: KeyedStoreBox<WithdrawalDraft>,
    pub(super) pending: KeyedStoreBox<PendingWithdrawal>,
    pub(super) notifier: NotifierBox,
    pub(super) renderer: RendererBox,
    pub(super) generator: AnswerGenerator,
}

impl Engine {
    /// Creates a new `Engine`.
    ///
    /// # Arguments
    ///
    /// * `rules` - Rewards, thresholds and the administrator identity.
    /// * `stores` - Ledger and per-user maps.
    /// * `notifier` - Outbound side of the messaging transport.
    /// * `renderer` - Challenge image collaborator.
    /// * `generator` - Source of challenge answers.
    pub fn new(
        rules: Rules,
        stores: Stores,
        notifier: NotifierBox,
        renderer: RendererBox,
        generator: AnswerGenerator,
    ) -> Self {
        Self {
            rules,
            ledger: stores.ledger,
            challenges: stores.challenges,
            drafts: stores.drafts,
            pending: stores.pending,
            notifier,
            renderer,
            generator,
        }
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Handles one inbound event.
    ///
    /// Never fails: handler faults are logged and turned into a user-facing
    /// failure message.
    pub async fn handle(&self, event: InboundEvent) {
        let user = event.identity.user_id;
        let action = event.action();
        debug!(user, ?action, "Dispatching event");

        if let Err(err) = self.dispatch(&event, action).await {
            self.report(user, &err).await;
        }
    }

    async fn dispatch(&self, event: &InboundEvent, action: Action) -> Result<()> {
        let user = event.identity.user_id;
        match action {
            Action::Start => {
                let menu = self.main_menu(user).await?;
                self.send(user, Outbound::text(messages::welcome(&self.rules)).with_controls(menu))
                    .await
            }
            Action::TestAdmin => self.test_admin(user).await,
            Action::Menu(MenuItem::StartWork) => self.start_work(user).await.map(|_| ()),
            Action::Menu(MenuItem::StopWork) => self.stop_work(user).await,
            Action::Menu(MenuItem::NewChallenge) | Action::Button(Button::NewChallenge) => {
                self.new_challenge(user).await.map(|_| ())
            }
            Action::Menu(MenuItem::Balance) => {
                let balance = self.ledger.read(user).await?;
                self.send(
                    user,
                    Outbound::text(messages::balance(balance, &self.rules))
                        .with_controls(Controls::BalanceWithdraw),
                )
                .await
            }
            Action::Menu(MenuItem::Help) => {
                let menu = self.main_menu(user).await?;
                self.send(user, Outbound::text(messages::help(&self.rules)).with_controls(menu))
                    .await
            }
            Action::Menu(MenuItem::WithdrawalList) => {
                let pending = self.list(user).await?;
                let menu = self.main_menu(user).await?;
                self.send(
                    user,
                    Outbound::text(messages::withdrawal_list(pending.as_ref())).with_controls(menu),
                )
                .await
            }
            Action::Menu(MenuItem::Withdraw) => self.show_withdrawal_menu(user, None).await,
            Action::Button(Button::ShowWithdrawal) => {
                self.show_withdrawal_menu(user, event.message).await
            }
            Action::Button(Button::ShowWithdrawalMenu) => {
                self.respond(
                    user,
                    event.message,
                    Outbound::text(messages::SELECT_METHOD).with_controls(Controls::WithdrawalMenu),
                )
                .await
            }
            Action::Button(Button::SelectMethod(method)) => {
                self.prompt_for_address(user, method, event.message).await
            }
            Action::Button(Button::WithdrawalHelp) => {
                self.respond(
                    user,
                    event.message,
                    Outbound::text(messages::withdrawal_methods_help())
                        .with_controls(Controls::BackToMethods),
                )
                .await
            }
            Action::Button(Button::Header) => Ok(()),
            Action::Button(Button::CancelWithdraw) => {
                self.cancel(user).await?;
                self.respond(user, event.message, Outbound::text(messages::WITHDRAWAL_CANCELLED))
                    .await
            }
            Action::Button(Button::Resolve {
                requester,
                decision,
            }) => {
                self.resolve_from_prompt(user, requester, decision, event.message)
                    .await
            }
            Action::Text(text) => self.handle_text(event, &text).await,
            Action::Unknown(payload) => {
                debug!(user, %payload, "Ignoring unrecognized event");
                Ok(())
            }
        }
    }

    /// Free text is an address while a draft is open, otherwise an answer.
    async fn handle_text(&self, event: &InboundEvent, text: &str) -> Result<()> {
        let user = event.identity.user_id;
        if self.drafts.get(user).await?.is_some() {
            return self.capture_address(&event.identity, text).await;
        }
        self.answer(user, text).await
    }

    /// Reads the current balance, zero for unknown users.
    pub async fn balance(&self, user: UserId) -> Result<Balance> {
        self.ledger.read(user).await
    }

    /// Snapshot of every account, ordered by user id.
    pub async fn accounts(&self) -> Result<Vec<UserAccount>> {
        self.ledger.accounts().await
    }

    pub async fn draft(&self, user: UserId) -> Result<Option<WithdrawalDraft>> {
        self.drafts.get(user).await
    }

    pub async fn pending_withdrawal(&self, user: UserId) -> Result<Option<PendingWithdrawal>> {
        self.pending.get(user).await
    }

    pub async fn live_challenge(&self, user: UserId) -> Result<Option<Challenge>> {
        self.challenges.get(user).await
    }

    /// Periodically removes expired withdrawal drafts.
    pub fn spawn_draft_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                match self.sweep_expired_drafts().await {
                    Ok(0) => {}
                    Ok(count) => info!(count, "Expired withdrawal drafts removed"),
                    Err(e) => error!("Draft sweep failed: {}", e),
                }
            }
        })
    }

    pub(super) async fn main_menu(&self, user: UserId) -> Result<Controls> {
        Ok(Controls::MainMenu {
            working: self.ledger.is_working(user).await?,
        })
    }

    pub(super) async fn send(&self, user: UserId, message: Outbound) -> Result<()> {
        self.notifier.send(user, message).await.map(|_| ())
    }

    /// Edits the message a button came from, or sends a new one.
    pub(super) async fn respond(
        &self,
        user: UserId,
        origin: Option<MessageRef>,
        message: Outbound,
    ) -> Result<()> {
        match origin {
            Some(target) => self.notifier.edit(user, target, message).await,
            None => self.send(user, message).await,
        }
    }

    async fn report(&self, user: UserId, err: &EngineError) {
        if err.is_user_facing() {
            info!(user, "Request refused: {}", err);
        } else {
            error!(user, "Request failed: {}", err);
        }

        let menu = self
            .main_menu(user)
            .await
            .unwrap_or(Controls::MainMenu { working: false });
        let message = Outbound::text(messages::failure(err)).with_controls(menu);
        if let Err(e) = self.notifier.send(user, message).await {
            warn!(user, "Failed to report error to user: {}", e);
        }
    }
}
