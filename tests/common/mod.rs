#![allow(dead_code)]

use async_trait::async_trait;
use captcha_payout::application::engine::{Engine, Rules, Stores};
use captcha_payout::domain::account::{Amount, Balance, UserId};
use captcha_payout::domain::challenge::AnswerGenerator;
use captcha_payout::domain::ports::ChallengeRenderer;
use captcha_payout::domain::withdrawal::RefundPolicy;
use captcha_payout::error::{EngineError, Result};
pub use captcha_payout::interfaces::recording::RecordingNotifier;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

pub const ADMIN: UserId = 9000;
pub const SEED: u64 = 42;

pub fn rules(reward: Decimal, policy: RefundPolicy) -> Rules {
    Rules {
        admin_id: ADMIN,
        admin_username: "@payout_admin".to_string(),
        reward: Amount::new(reward).unwrap(),
        min_withdrawal: Balance::new(Decimal::new(500, 2)).unwrap(),
        refund_policy: policy,
        draft_ttl: Duration::from_secs(900),
    }
}

pub struct EchoRenderer;

#[async_trait]
impl ChallengeRenderer for EchoRenderer {
    async fn render(&self, answer: &str) -> Result<Vec<u8>> {
        if answer.is_empty() {
            return Err(EngineError::Render("empty answer".to_string()));
        }
        Ok(answer.as_bytes().to_vec())
    }
}

pub fn engine(rules: Rules) -> (Arc<Engine>, RecordingNotifier) {
    let notifier = RecordingNotifier::default();
    let engine = Engine::new(
        rules,
        Stores::in_memory(),
        Box::new(notifier.clone()),
        Box::new(EchoRenderer),
        AnswerGenerator::seeded(SEED),
    );
    (Arc::new(engine), notifier)
}

/// The answers a replay seeded with `seed` will issue, in order.
pub fn answers(seed: u64, count: usize) -> Vec<String> {
    let generator = AnswerGenerator::seeded(seed);
    (0..count)
        .map(|_| generator.next_challenge().expected_answer().to_string())
        .collect()
}

/// Writes a replay script with the `user, kind, payload, name, handle, message` header.
pub fn write_script(path: &Path, rows: &[(UserId, &str, &str)]) -> std::result::Result<(), csv::Error> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    wtr.write_record(["user", "kind", "payload", "name", "handle", "message"])?;
    for (user, kind, payload) in rows {
        wtr.write_record([user.to_string().as_str(), *kind, *payload])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_config(reward: &str, policy: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[admin]
id = {ADMIN}
username = "@payout_admin"

[rewards]
per_challenge = "{reward}"

[withdrawals]
min_withdrawal = "5.00"
refund_policy = "{policy}"
"#
    )
    .unwrap();
    file
}

/// One mutation applied to a ledger.
#[derive(Debug, Clone, Copy)]
pub enum LedgerOp {
    Credit(UserId, Decimal),
    Withdraw(UserId, Decimal),
    DebitToZero(UserId),
    Restore(UserId, Decimal),
}

/// A reproducible mix of ledger mutations over `users` accounts.
///
/// Amounts are positive with three decimals; withdrawals are drawn from the
/// same range as credits so many of them overdraw.
pub fn random_ops(seed: u64, count: usize, users: u64) -> Vec<LedgerOp> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let user = rng.gen_range(1..=users);
            let amount = Decimal::new(rng.gen_range(1..=20_000), 3);
            match rng.gen_range(0..10) {
                0..=4 => LedgerOp::Credit(user, amount),
                5..=7 => LedgerOp::Withdraw(user, amount),
                8 => LedgerOp::DebitToZero(user),
                _ => LedgerOp::Restore(user, amount),
            }
        })
        .collect()
}
