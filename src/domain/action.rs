//! Inbound events and the actions they decode to.
//!
//! Text labels and button payloads are parsed exactly once here; everything
//! downstream matches on [`Action`].

use crate::domain::account::UserId;
use crate::domain::payment_method::PaymentMethod;
use crate::domain::ports::MessageRef;
use crate::domain::withdrawal::{Decision, Identity};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Free text or a reply-keyboard label.
    Text,
    /// Inline button press carrying a payload.
    Button,
    /// Slash command, e.g. `/start`.
    Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub identity: Identity,
    pub kind: EventKind,
    pub payload: String,
    /// The message a button was attached to, if any.
    pub message: Option<MessageRef>,
}

impl InboundEvent {
    pub fn text(identity: Identity, text: impl Into<String>) -> Self {
        Self {
            identity,
            kind: EventKind::Text,
            payload: text.into(),
            message: None,
        }
    }

    pub fn button(identity: Identity, button: Button, message: Option<MessageRef>) -> Self {
        Self {
            identity,
            kind: EventKind::Button,
            payload: button.to_string(),
            message,
        }
    }

    pub fn command(identity: Identity, command: impl Into<String>) -> Self {
        Self {
            identity,
            kind: EventKind::Command,
            payload: command.into(),
            message: None,
        }
    }

    pub fn action(&self) -> Action {
        Action::decode(self.kind, &self.payload)
    }
}

/// Reply-keyboard entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    StartWork,
    StopWork,
    NewChallenge,
    Balance,
    Withdraw,
    Help,
    WithdrawalList,
}

impl MenuItem {
    pub const ALL: [MenuItem; 7] = [
        MenuItem::StartWork,
        MenuItem::StopWork,
        MenuItem::NewChallenge,
        MenuItem::Balance,
        MenuItem::Withdraw,
        MenuItem::Help,
        MenuItem::WithdrawalList,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuItem::StartWork => "▶️ Start Work",
            MenuItem::StopWork => "⏹️ Stop Work",
            MenuItem::NewChallenge => "🔄 New Captcha",
            MenuItem::Balance => "📊 My Balance",
            MenuItem::Withdraw => "💳 Withdraw",
            MenuItem::Help => "ℹ️ Help",
            MenuItem::WithdrawalList => "📋 Withdrawal List",
        }
    }

    /// Matches a label with or without its emoji prefix, ignoring case.
    fn from_label(text: &str) -> Option<Self> {
        let wanted = strip_decoration(text);
        MenuItem::ALL
            .into_iter()
            .find(|item| strip_decoration(item.label()).eq_ignore_ascii_case(wanted))
    }
}

fn strip_decoration(text: &str) -> &str {
    text.trim()
        .trim_start_matches(|c: char| !c.is_ascii_alphanumeric())
        .trim_end()
}

/// Inline button payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    ShowWithdrawal,
    SelectMethod(PaymentMethod),
    WithdrawalHelp,
    Header,
    CancelWithdraw,
    ShowWithdrawalMenu,
    NewChallenge,
    Resolve {
        requester: UserId,
        decision: Decision,
    },
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Button::ShowWithdrawal => f.write_str("show_withdrawal"),
            Button::SelectMethod(method) => write!(f, "withdraw_{}", method.id()),
            Button::WithdrawalHelp => f.write_str("withdrawal_help"),
            Button::Header => f.write_str("header_none"),
            Button::CancelWithdraw => f.write_str("cancel_withdraw"),
            Button::ShowWithdrawalMenu => f.write_str("show_withdrawal_menu"),
            Button::NewChallenge => f.write_str("new_captcha"),
            Button::Resolve {
                requester,
                decision: Decision::Approve,
            } => write!(f, "approve_{requester}"),
            Button::Resolve {
                requester,
                decision: Decision::Reject,
            } => write!(f, "reject_{requester}"),
        }
    }
}

impl FromStr for Button {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let button = match s {
            "show_withdrawal" => Button::ShowWithdrawal,
            "withdrawal_help" => Button::WithdrawalHelp,
            "header_none" => Button::Header,
            "cancel_withdraw" => Button::CancelWithdraw,
            "show_withdrawal_menu" => Button::ShowWithdrawalMenu,
            "new_captcha" => Button::NewChallenge,
            other => {
                if let Some(method) = other.strip_prefix("withdraw_") {
                    Button::SelectMethod(method.parse()?)
                } else if let Some(id) = other.strip_prefix("approve_") {
                    Button::Resolve {
                        requester: parse_requester(id)?,
                        decision: Decision::Approve,
                    }
                } else if let Some(id) = other.strip_prefix("reject_") {
                    Button::Resolve {
                        requester: parse_requester(id)?,
                        decision: Decision::Reject,
                    }
                } else {
                    return Err(format!("Unknown button payload: {other}"));
                }
            }
        };
        Ok(button)
    }
}

fn parse_requester(id: &str) -> Result<UserId, String> {
    id.parse()
        .map_err(|_| format!("Invalid requester id: {id}"))
}

/// Everything the engine knows how to handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Start,
    TestAdmin,
    Menu(MenuItem),
    Button(Button),
    /// Free text: a challenge answer or a withdrawal address.
    Text(String),
    Unknown(String),
}

impl Action {
    pub fn decode(kind: EventKind, payload: &str) -> Self {
        match kind {
            EventKind::Command => {
                let command = payload.trim().trim_start_matches('/');
                match command.split_whitespace().next().unwrap_or_default() {
                    "start" => Action::Start,
                    "testadmin" => Action::TestAdmin,
                    _ => Action::Unknown(payload.to_string()),
                }
            }
            EventKind::Button => match payload.trim().parse() {
                Ok(button) => Action::Button(button),
                Err(_) => Action::Unknown(payload.to_string()),
            },
            EventKind::Text => match MenuItem::from_label(payload) {
                Some(item) => Action::Menu(item),
                None => Action::Text(payload.to_string()),
            },
        }
    }
}
