use crate::error::EngineError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;

/// Messaging-platform identity of a user.
pub type UserId = u64;

/// A non-negative monetary value.
///
/// Wraps `rust_decimal::Decimal` so ledger arithmetic never touches binary floats,
/// and keeps the constructor fallible so a negative balance cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal")]
pub struct Balance(Decimal);

/// A strictly positive monetary amount, used for credits and debits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, EngineError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(EngineError::Validation(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Balance {
    type Error = EngineError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, EngineError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(EngineError::Validation(
                "Balance cannot be negative".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Subtracts `amount`, or returns `None` if the result would go below zero.
    pub fn checked_sub(self, amount: Amount) -> Option<Self> {
        if self.0 >= amount.0 {
            Some(Self(self.0 - amount.0))
        } else {
            None
        }
    }
}

impl AddAssign<Amount> for Balance {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

// Forwards the formatter so callers can pick display precision, e.g. `{:.3}`.
impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Per-user ledger record.
///
/// Created lazily on first interaction and kept for the lifetime of the process.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct UserAccount {
    /// The messaging-platform identity of the user.
    pub user: UserId,
    /// Accumulated, not yet paid out credit.
    pub balance: Balance,
    /// Whether the user is in an active challenge-solving session.
    pub working: bool,
}

impl UserAccount {
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            balance: Balance::ZERO,
            working: false,
        }
    }

    /// Adds `amount` to the balance.
    pub fn credit(&mut self, amount: Amount) {
        self.balance += amount;
    }

    /// Removes `amount` from the balance if sufficient.
    pub fn withdraw(&mut self, amount: Amount) -> Result<(), EngineError> {
        match self.balance.checked_sub(amount) {
            Some(remaining) => {
                self.balance = remaining;
                Ok(())
            }
            None => Err(EngineError::Validation(
                "Insufficient funds".to_string(),
            )),
        }
    }

    /// Settles the whole balance.
    pub fn debit_to_zero(&mut self) {
        self.balance = Balance::ZERO;
    }

    /// Overwrites the balance with `value`.
    pub fn restore(&mut self, value: Balance) {
        self.balance = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(0.005)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_balance_rejects_negative() {
        assert!(Balance::new(dec!(0)).is_ok());
        assert!(Balance::new(dec!(-0.001)).is_err());
    }

    #[test]
    fn test_balance_deserialize_validates() {
        let balance: Balance = serde_json::from_str("\"6.50\"").unwrap();
        assert_eq!(balance, Balance::new(dec!(6.50)).unwrap());

        let negative = serde_json::from_str::<Balance>("\"-0.001\"");
        assert!(negative.unwrap_err().to_string().contains("negative"));

        let account: Result<UserAccount, _> =
            serde_json::from_str(r#"{"user":1,"balance":"-5","working":false}"#);
        assert!(account.is_err());
    }

    #[test]
    fn test_balance_checked_sub() {
        let balance = Balance::new(dec!(1.0)).unwrap();
        let half = Amount::new(dec!(0.5)).unwrap();
        let two = Amount::new(dec!(2.0)).unwrap();
        assert_eq!(balance.checked_sub(half), Some(Balance::new(dec!(0.5)).unwrap()));
        assert_eq!(balance.checked_sub(two), None);
    }

    #[test]
    fn test_balance_display_precision() {
        let balance = Balance::new(dec!(5.005)).unwrap();
        assert_eq!(format!("{:.3}", balance), "5.005");
        assert_eq!(format!("{:.2}", Balance::new(dec!(9)).unwrap()), "9.00");
    }

    #[test]
    fn test_account_credit_accumulates_without_drift() {
        let mut account = UserAccount::new(1);
        let reward = Amount::new(dec!(0.005)).unwrap();
        for _ in 0..1000 {
            account.credit(reward);
        }
        assert_eq!(account.balance, Balance::new(dec!(5.000)).unwrap());
    }

    #[test]
    fn test_account_withdraw_insufficient() {
        let mut account = UserAccount::new(1);
        account.credit(Amount::new(dec!(1.0)).unwrap());

        let result = account.withdraw(Amount::new(dec!(2.0)).unwrap());
        assert!(matches!(result, Err(EngineError::Validation(_))));
        assert_eq!(account.balance, Balance::new(dec!(1.0)).unwrap());
    }

    #[test]
    fn test_account_debit_to_zero_and_restore() {
        let mut account = UserAccount::new(7);
        account.credit(Amount::new(dec!(6.0)).unwrap());
        account.debit_to_zero();
        assert!(account.balance.is_zero());

        account.restore(Balance::new(dec!(6.0)).unwrap());
        assert_eq!(account.balance, Balance::new(dec!(6.0)).unwrap());
    }
}
