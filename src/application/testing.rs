//! In-crate test harness and renderer double.

use crate::application::engine::{Engine, Rules, Stores};
use crate::domain::account::{Amount, Balance, UserId};
use crate::domain::challenge::AnswerGenerator;
use crate::domain::ports::ChallengeRenderer;
use crate::domain::withdrawal::RefundPolicy;
use crate::error::{EngineError, Result};
pub use crate::interfaces::recording::RecordingNotifier;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub const ADMIN: UserId = 1000;

/// Renderer that returns the answer bytes, or fails on demand.
#[derive(Clone, Default)]
pub struct StubRenderer {
    failing: Arc<AtomicBool>,
}

impl StubRenderer {
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChallengeRenderer for StubRenderer {
    async fn render(&self, answer: &str) -> Result<Vec<u8>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::Render("font not found".to_string()));
        }
        Ok(answer.as_bytes().to_vec())
    }
}

pub struct Harness {
    pub engine: Engine,
    pub notifier: RecordingNotifier,
    pub renderer: StubRenderer,
}

pub fn rules() -> Rules {
    Rules {
        admin_id: ADMIN,
        admin_username: "@payout_admin".to_string(),
        reward: Amount::new(dec!(0.005)).unwrap(),
        min_withdrawal: Balance::new(dec!(5.00)).unwrap(),
        refund_policy: RefundPolicy::Overwrite,
        draft_ttl: Duration::from_secs(900),
    }
}

pub fn harness() -> Harness {
    harness_with(|_| {})
}

pub fn harness_with(customize: impl FnOnce(&mut Rules)) -> Harness {
    let mut rules = rules();
    customize(&mut rules);
    let notifier = RecordingNotifier::default();
    let renderer = StubRenderer::default();
    let engine = Engine::new(
        rules,
        Stores::in_memory(),
        Box::new(notifier.clone()),
        Box::new(renderer.clone()),
        AnswerGenerator::seeded(7),
    );
    Harness {
        engine,
        notifier,
        renderer,
    }
}

pub async fn fund(engine: &Engine, user: UserId, amount: Decimal) {
    engine
        .ledger
        .credit(user, Amount::new(amount).unwrap())
        .await
        .unwrap();
}
