use super::account::{Amount, Balance, UserAccount, UserId};
use super::action::{Button, MenuItem};
use super::payment_method::PaymentMethod;
use super::withdrawal::Decision;
use crate::error::Result;
use async_trait::async_trait;

/// Per-user balance ledger. Every write for a given user is serialized.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Current balance, zero for unknown users.
    async fn read(&self, user: UserId) -> Result<Balance>;
    async fn credit(&self, user: UserId, amount: Amount) -> Result<Balance>;
    /// Checked debit; fails without touching the balance if funds are short.
    async fn withdraw(&self, user: UserId, amount: Amount) -> Result<Balance>;
    /// Sets the balance to zero and returns what it was.
    async fn debit_to_zero(&self, user: UserId) -> Result<Balance>;
    /// Overwrites the balance.
    async fn restore(&self, user: UserId, value: Balance) -> Result<()>;
    async fn set_working(&self, user: UserId, working: bool) -> Result<()>;
    async fn is_working(&self, user: UserId) -> Result<bool>;
    async fn accounts(&self) -> Result<Vec<UserAccount>>;
}

/// Map keyed by user id where each check-then-act runs atomically per key.
#[async_trait]
pub trait KeyedStore<V: Send + Sync + 'static>: Send + Sync {
    /// Stores `value`, returning whatever it replaced.
    async fn put(&self, user: UserId, value: V) -> Result<Option<V>>;
    async fn get(&self, user: UserId) -> Result<Option<V>>;
    async fn take(&self, user: UserId) -> Result<Option<V>>;
    /// Removes the entry only if `predicate` holds for it.
    async fn take_if(
        &self,
        user: UserId,
        predicate: &(dyn for<'a> Fn(&'a V) -> bool + Send + Sync),
    ) -> Result<Option<V>>;
    /// Replaces the entry with `value` only if `predicate` holds for it,
    /// returning the value that was swapped out.
    async fn swap_if(
        &self,
        user: UserId,
        predicate: &(dyn for<'a> Fn(&'a V) -> bool + Send + Sync),
        value: V,
    ) -> Result<Option<V>>;
    /// Removes every entry for which `predicate` holds and returns them.
    async fn drain_where(
        &self,
        predicate: &(dyn for<'a> Fn(&'a V) -> bool + Send + Sync),
    ) -> Result<Vec<(UserId, V)>>;
}

pub type LedgerBox = Box<dyn Ledger>;
pub type KeyedStoreBox<V> = Box<dyn KeyedStore<V>>;

/// Renders a visual challenge for an answer. The core only forwards the bytes.
#[async_trait]
pub trait ChallengeRenderer: Send + Sync {
    async fn render(&self, answer: &str) -> Result<Vec<u8>>;
}

/// Transport-assigned handle of a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef(pub u64);

/// Interactive controls attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Controls {
    /// Reply keyboard; the layout depends on whether the user is working.
    MainMenu { working: bool },
    /// Inline rail picker.
    WithdrawalMenu,
    CancelWithdraw,
    BackToMethods,
    /// Single "withdraw" button under the balance view.
    BalanceWithdraw,
    AdminDecision { requester: UserId },
}

impl Controls {
    /// Reply-keyboard rows; empty for inline controls.
    pub fn keyboard_rows(&self) -> Vec<Vec<MenuItem>> {
        match self {
            Controls::MainMenu { working: true } => {
                vec![vec![MenuItem::StopWork, MenuItem::NewChallenge]]
            }
            Controls::MainMenu { working: false } => vec![
                vec![MenuItem::StartWork, MenuItem::Balance],
                vec![MenuItem::Withdraw, MenuItem::Help],
                vec![MenuItem::WithdrawalList],
            ],
            _ => Vec::new(),
        }
    }

    /// Buttons carried by inline controls, row by row, as `(label, payload)`.
    pub fn inline_rows(&self) -> Vec<Vec<(String, Button)>> {
        match self {
            Controls::MainMenu { .. } => Vec::new(),
            Controls::WithdrawalMenu => {
                let mut rows = vec![vec![(
                    "💳 Select Payment Method 💳".to_string(),
                    Button::Header,
                )]];
                rows.extend(PaymentMethod::ALL.into_iter().map(|method| {
                    let spec = method.spec();
                    vec![(
                        format!("{} {}", spec.emoji, spec.name),
                        Button::SelectMethod(method),
                    )]
                }));
                rows.push(vec![
                    ("❌ Cancel".to_string(), Button::CancelWithdraw),
                    ("ℹ️ Info".to_string(), Button::WithdrawalHelp),
                ]);
                rows
            }
            Controls::CancelWithdraw => {
                vec![vec![("❌ Cancel".to_string(), Button::CancelWithdraw)]]
            }
            Controls::BackToMethods => {
                vec![vec![("🔙 Back".to_string(), Button::ShowWithdrawalMenu)]]
            }
            Controls::BalanceWithdraw => {
                vec![vec![("💳 Withdraw".to_string(), Button::ShowWithdrawal)]]
            }
            Controls::AdminDecision { requester } => vec![vec![
                (
                    "✅ Approve".to_string(),
                    Button::Resolve {
                        requester: *requester,
                        decision: Decision::Approve,
                    },
                ),
                (
                    "❌ Reject".to_string(),
                    Button::Resolve {
                        requester: *requester,
                        decision: Decision::Reject,
                    },
                ),
            ]],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub text: String,
    pub photo: Option<Vec<u8>>,
    pub controls: Option<Controls>,
}

impl Outbound {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            photo: None,
            controls: None,
        }
    }

    pub fn photo(caption: impl Into<String>, photo: Vec<u8>) -> Self {
        Self {
            text: caption.into(),
            photo: Some(photo),
            controls: None,
        }
    }

    pub fn with_controls(mut self, controls: Controls) -> Self {
        self.controls = Some(controls);
        self
    }
}

/// Outbound side of the messaging transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: UserId, message: Outbound) -> Result<MessageRef>;
    /// Replaces the content of an earlier message.
    async fn edit(&self, recipient: UserId, target: MessageRef, message: Outbound) -> Result<()>;
    /// Transient pop-up shown only to `recipient`.
    async fn alert(&self, recipient: UserId, text: &str) -> Result<()>;
}

pub type NotifierBox = Box<dyn Notifier>;
pub type RendererBox = Box<dyn ChallengeRenderer>;
