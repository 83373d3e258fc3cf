//! Static catalog of supported payout rails.

use crate::domain::account::Balance;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    Webmoney,
    Payeer,
    Airtm,
    BitcoinCash,
    UsdtTrc20,
}

/// Validation and fee rules for one rail.
#[derive(Debug)]
pub struct PaymentMethodSpec {
    pub method: PaymentMethod,
    pub name: &'static str,
    pub emoji: &'static str,
    pub min_withdrawal: Decimal,
    /// Signed fraction: `final = requested * (1 + fee_rate)`.
    pub fee_rate: Decimal,
    pub address_example: &'static str,
    address_pattern: Regex,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::Webmoney,
        PaymentMethod::Payeer,
        PaymentMethod::Airtm,
        PaymentMethod::BitcoinCash,
        PaymentMethod::UsdtTrc20,
    ];

    /// Identifier used in button payloads (`withdraw_<id>`).
    pub fn id(&self) -> &'static str {
        match self {
            PaymentMethod::Webmoney => "webmoney",
            PaymentMethod::Payeer => "payeer",
            PaymentMethod::Airtm => "airtm",
            PaymentMethod::BitcoinCash => "bitcoincash",
            PaymentMethod::UsdtTrc20 => "usdttrc20",
        }
    }

    pub fn spec(&self) -> &'static PaymentMethodSpec {
        let registry = registry();
        // ALL and the registry are built in the same order.
        &registry[*self as usize]
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|method| method.id() == s)
            .ok_or_else(|| format!("Unknown payment method: {s}"))
    }
}

impl PaymentMethodSpec {
    pub fn validate_address(&self, address: &str) -> bool {
        self.address_pattern.is_match(address)
    }

    pub fn meets_minimum(&self, amount: Balance) -> bool {
        amount.value() >= self.min_withdrawal
    }

    /// Applies the rail's fee rate to `requested`.
    ///
    /// A rate of `-0.10` yields 90% of the requested amount.
    pub fn final_amount(&self, requested: Balance) -> Decimal {
        requested.value() * (Decimal::ONE + self.fee_rate)
    }

    /// Human readable payout adjustment, e.g. "-10%" or "No fee".
    pub fn fee_label(&self) -> String {
        if self.fee_rate.is_zero() {
            "No fee".to_string()
        } else {
            let percent = (self.fee_rate * dec!(100)).normalize();
            format!("{percent:+}% payout adjustment")
        }
    }
}

static REGISTRY: OnceLock<Vec<PaymentMethodSpec>> = OnceLock::new();

fn registry() -> &'static [PaymentMethodSpec] {
    REGISTRY.get_or_init(build_registry)
}

fn build_registry() -> Vec<PaymentMethodSpec> {
    vec![
        PaymentMethodSpec {
            method: PaymentMethod::Webmoney,
            name: "Webmoney (WMZ)",
            emoji: "💰",
            min_withdrawal: dec!(0.50),
            fee_rate: dec!(-0.10),
            address_example: "Z123456789012",
            address_pattern: Regex::new(r"^Z\d{12}$").expect("valid Webmoney regex"),
        },
        PaymentMethodSpec {
            method: PaymentMethod::Payeer,
            name: "Payeer",
            emoji: "💳",
            min_withdrawal: dec!(0.50),
            fee_rate: Decimal::ZERO,
            address_example: "P1234567",
            address_pattern: Regex::new(r"^P\d{7,}$").expect("valid Payeer regex"),
        },
        PaymentMethodSpec {
            method: PaymentMethod::Airtm,
            name: "AirTM",
            emoji: "✈️",
            min_withdrawal: dec!(1.00),
            fee_rate: Decimal::ZERO,
            address_example: "name@example.com",
            address_pattern: Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
                .expect("valid AirTM regex"),
        },
        PaymentMethodSpec {
            method: PaymentMethod::BitcoinCash,
            name: "Bitcoin Cash",
            emoji: "💎",
            min_withdrawal: dec!(0.25),
            fee_rate: Decimal::ZERO,
            address_example: "bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a",
            address_pattern: Regex::new(r"^(bitcoincash:)?(q|p)[a-z0-9]{41}$")
                .expect("valid Bitcoin Cash regex"),
        },
        PaymentMethodSpec {
            method: PaymentMethod::UsdtTrc20,
            name: "USDT TRC20",
            emoji: "💲",
            min_withdrawal: dec!(30.00),
            fee_rate: Decimal::ZERO,
            address_example: "TXYZabcdefghijkmnopqrstuvwxyz12345",
            address_pattern: Regex::new(r"^T[A-Za-z1-9]{33}$").expect("valid TRC20 regex"),
        },
    ]
}
