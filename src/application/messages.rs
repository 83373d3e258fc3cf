//! User- and admin-facing message text.

use crate::application::engine::Rules;
use crate::domain::account::Balance;
use crate::domain::payment_method::{PaymentMethod, PaymentMethodSpec};
use crate::domain::withdrawal::PendingWithdrawal;
use crate::error::EngineError;
use rust_decimal::{Decimal, RoundingStrategy};

/// Balances and rewards are shown to the tenth of a cent.
const BALANCE_DP: u32 = 3;
/// Withdrawal amounts are shown in cents.
const AMOUNT_DP: u32 = 2;

pub const WAITING_FOR_CHALLENGE: &str = "⏳ Waiting for captcha...";
pub const WORK_STOPPED: &str = "⏹️ Work session stopped!";
pub const INCORRECT_ANSWER: &str = "❌ Incorrect. Try again.";
pub const START_WORK_FIRST: &str = "Please start work first!";
pub const SELECT_METHOD: &str = "Select withdrawal method:";
pub const WITHDRAWAL_CANCELLED: &str = "❌ Withdrawal cancelled";
pub const REQUEST_NO_LONGER_VALID: &str = "This withdrawal request is no longer valid.";
pub const NOT_AUTHORIZED: &str = "You are not authorized to perform this action.";
pub const ADMIN_ONLY: &str = "This command is only available to admins.";
pub const REJECTED_TO_USER: &str =
    "❌ Your withdrawal request has been rejected by admin.\nThe amount has been returned to your balance.";
pub const TEST_NOTIFICATION: &str =
    "🔔 *Test Notification*\n\nIf you see this message, admin notifications are working correctly!";
pub const TEST_NOTIFICATION_SENT: &str = "✅ Test notification sent! Check if you received it.";

/// Rounds half away from zero to `dp` places, then pads.
pub fn usd(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    format!("${:.*}", dp as usize, rounded)
}

pub fn welcome(rules: &Rules) -> String {
    format!(
        "🤑 *Welcome to CAPTCHA Earning Bot!*\n\n\
         Earn money by solving simple CAPTCHA tasks.\n\n\
         💰 Current rate: {} per CAPTCHA\n\
         💳 Minimum withdrawal: {}\n\n\
         ✅ Start now and turn your clicks into cash!",
        usd(rules.reward.value(), BALANCE_DP),
        usd(rules.min_withdrawal.value(), AMOUNT_DP)
    )
}

pub fn help(rules: &Rules) -> String {
    let mut text = format!(
        "▶️ *1. Start Working*\n\
         Tap Start Work to begin solving CAPTCHAs.\n\n\
         🧩 *2. Solve CAPTCHAs – Get Paid*\n\
         Each completed CAPTCHA earns you 💰 {}\n\n\
         📊 *3. Check Your Balance*\n\
         Tap My Balance anytime to see your current earnings.\n\n\
         💸 *4. Withdraw Your Earnings*\n\
         Once you reach {}, you can request a withdrawal.\n\n\
         📋 *5. Track Your Withdrawals*\n\
         See your pending withdrawal request in the Withdrawal List.",
        usd(rules.reward.value(), BALANCE_DP),
        usd(rules.min_withdrawal.value(), AMOUNT_DP)
    );
    if !rules.admin_username.is_empty() {
        text.push_str(&format!("\n\n❓ Questions? Contact {}", rules.admin_username));
    }
    text
}

pub fn challenge_caption(rules: &Rules) -> String {
    format!(
        "Type the characters you see to earn {}",
        usd(rules.reward.value(), BALANCE_DP)
    )
}

pub fn correct_answer(rules: &Rules) -> String {
    format!(
        "✅ Correct! You earned {}",
        usd(rules.reward.value(), BALANCE_DP)
    )
}

pub fn balance(balance: Balance, rules: &Rules) -> String {
    format!(
        "💰 *Your Balance*\n\nCurrent Balance: {}\nMinimum Withdrawal: {}",
        usd(balance.value(), BALANCE_DP),
        usd(rules.min_withdrawal.value(), AMOUNT_DP)
    )
}

pub fn below_minimum(minimum: Decimal, balance: Balance) -> String {
    format!(
        "Minimum withdrawal is {}\nYour balance: {}",
        usd(minimum, AMOUNT_DP),
        usd(balance.value(), BALANCE_DP)
    )
}

pub fn below_rail_minimum(spec: &PaymentMethodSpec, balance: Balance) -> String {
    format!(
        "Minimum withdrawal for {} is {}\nYour balance: {}",
        spec.name,
        usd(spec.min_withdrawal, AMOUNT_DP),
        usd(balance.value(), BALANCE_DP)
    )
}

pub fn insufficient_for_hold(requested: Balance, balance: Balance) -> String {
    format!(
        "Insufficient balance for {}\nYour balance: {}",
        usd(requested.value(), AMOUNT_DP),
        usd(balance.value(), BALANCE_DP)
    )
}

pub fn address_prompt(spec: &PaymentMethodSpec, balance: Balance) -> String {
    format!(
        "{} *{} Withdrawal*\n\n\
         💰 Your Balance: {}\n\
         📊 Minimum: {}\n\
         🔄 Fee: {}\n\n\
         📝 Enter your {} address:\n\
         Example: `{}`",
        spec.emoji,
        spec.name,
        usd(balance.value(), AMOUNT_DP),
        usd(spec.min_withdrawal, AMOUNT_DP),
        spec.fee_label(),
        spec.name,
        spec.address_example
    )
}

pub fn invalid_address(spec: &PaymentMethodSpec) -> String {
    format!(
        "Invalid {} address format. Please try again or cancel.",
        spec.name
    )
}

pub fn withdrawal_methods_help() -> String {
    let mut text = "💳 *Available Payment Methods*\n\n".to_string();
    for method in PaymentMethod::ALL {
        let spec = method.spec();
        text.push_str(&format!(
            "{} *{}*\n├ Min: {}\n└ {}\n\n",
            spec.emoji,
            spec.name,
            usd(spec.min_withdrawal, AMOUNT_DP),
            spec.fee_label()
        ));
    }
    text.push_str(
        "📝 *How to Withdraw:*\n\
         1️⃣ Select payment method\n\
         2️⃣ Enter your wallet address\n\
         3️⃣ Wait for admin approval\n\n\
         ⚠️ Double-check your wallet address!",
    );
    text
}

pub fn submitted(pending: &PendingWithdrawal) -> String {
    let spec = pending.spec();
    format!(
        "✅ Withdrawal request submitted!\n\
         Amount: {}\n\
         Final Amount: {}\n\
         Method: {}\n\
         Fee: {}\n\
         Address: {}\n\n\
         Please wait for admin approval.",
        usd(pending.requested_amount.value(), AMOUNT_DP),
        usd(pending.final_amount(), AMOUNT_DP),
        spec.name,
        spec.fee_label(),
        pending.destination_address
    )
}

pub fn withdrawal_list(pending: Option<&PendingWithdrawal>) -> String {
    let Some(pending) = pending else {
        return "📋 *Withdrawal History*\n\n\
                You have no pending withdrawal requests.\n\n\
                💡 To make a withdrawal, click '💳 Withdraw' when your balance reaches the minimum amount."
            .to_string();
    };
    let spec = pending.spec();
    format!(
        "📋 *Your Withdrawal Requests*\n\n\
         🔹 *Request Details:*\n\
         ├ Amount: {}\n\
         ├ Final Amount: {}\n\
         ├ Method: {} {}\n\
         ├ Address: `{}`\n\
         └ Status: ⏳ Pending Admin Approval\n\n\
         ℹ️ Admin will process your request soon.",
        usd(pending.requested_amount.value(), AMOUNT_DP),
        usd(pending.final_amount(), AMOUNT_DP),
        spec.emoji,
        spec.name,
        pending.destination_address
    )
}

pub fn admin_prompt(pending: &PendingWithdrawal) -> String {
    let spec = pending.spec();
    let requester = &pending.requester;
    format!(
        "🔔 *New Withdrawal Request*\n\n\
         👤 *User Information:*\n\
         ├ Name: {}\n\
         ├ Username: @{}\n\
         └ ID: `{}`\n\n\
         💰 *Transaction Details:*\n\
         ├ Method: {} {}\n\
         ├ Original Amount: {}\n\
         ├ Final Amount: {}\n\
         ├ Fee: {}\n\
         └ Address: `{}`\n\n\
         Use buttons below to approve or reject:",
        requester.display_name,
        requester.handle.as_deref().unwrap_or("-"),
        requester.user_id,
        spec.emoji,
        spec.name,
        usd(pending.requested_amount.value(), AMOUNT_DP),
        usd(pending.final_amount(), AMOUNT_DP),
        spec.fee_label(),
        pending.destination_address
    )
}

pub fn approved_to_user(pending: &PendingWithdrawal) -> String {
    let spec = pending.spec();
    format!(
        "✅ Your withdrawal request has been approved!\n\n\
         💰 *Transaction Details:*\n\
         ├ Amount: {}\n\
         ├ Final Amount: {}\n\
         ├ Method: {} {}\n\
         └ Address: `{}`",
        usd(pending.requested_amount.value(), AMOUNT_DP),
        usd(pending.final_amount(), AMOUNT_DP),
        spec.emoji,
        spec.name,
        pending.destination_address
    )
}

pub fn approved_to_admin(pending: &PendingWithdrawal) -> String {
    let spec = pending.spec();
    format!(
        "✅ Withdrawal approved and processed\n\n\
         👤 User ID: `{}`\n\
         💰 Amount: {}\n\
         🏦 Method: {} {}",
        pending.requester.user_id,
        usd(pending.final_amount(), AMOUNT_DP),
        spec.emoji,
        spec.name
    )
}

pub fn rejected_to_admin(pending: &PendingWithdrawal) -> String {
    let spec = pending.spec();
    format!(
        "❌ Withdrawal rejected\n\n\
         👤 User ID: `{}`\n\
         💰 Amount: {}\n\
         🏦 Method: {} {}",
        pending.requester.user_id,
        usd(pending.requested_amount.value(), AMOUNT_DP),
        spec.emoji,
        spec.name
    )
}

/// What the user sees when a handler fails.
pub fn failure(err: &EngineError) -> String {
    match err {
        EngineError::Validation(message)
        | EngineError::NotFound(message)
        | EngineError::Authorization(message) => format!("❌ {message}"),
        EngineError::Render(_) => "❌ Error generating CAPTCHA. Please try again.".to_string(),
        EngineError::Dispatch(_) => {
            "❌ Could not process your request. Please try again later.".to_string()
        }
        _ => "❌ An error occurred. Please try again later.".to_string(),
    }
}
