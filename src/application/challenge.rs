//! Challenge lifecycle: `Idle -> Issued -> {Solved -> Issued | Abandoned -> Idle}`.

use crate::application::engine::Engine;
use crate::application::messages;
use crate::domain::account::{Balance, UserId};
use crate::domain::challenge::Challenge;
use crate::domain::ports::{Controls, Outbound};
use crate::error::{EngineError, Result};
use tracing::{debug, info, warn};

/// Result of checking a submitted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The challenge was consumed and the reward credited.
    Correct { balance: Balance },
    /// The challenge is still live; retries are unlimited.
    Incorrect,
    NoActiveChallenge,
}

impl Engine {
    /// Issues a fresh challenge and delivers it to the user.
    ///
    /// Only valid during a work session. Any previous challenge is discarded
    /// before rendering, so a failed render leaves nothing stale behind and
    /// never touches the ledger.
    pub async fn issue(&self, user: UserId) -> Result<Challenge> {
        self.ensure_working(user).await?;
        self.abandon(user).await?;

        let challenge = self.generator.next_challenge();
        let image = self
            .renderer
            .render(challenge.expected_answer())
            .await
            .map_err(|e| {
                warn!(user, "Challenge rendering failed: {}", e);
                match e {
                    render @ EngineError::Render(_) => render,
                    other => EngineError::Render(other.to_string()),
                }
            })?;

        self.challenges.put(user, challenge.clone()).await?;
        // A stop that landed while rendering must not leave this one live.
        if !self.ledger.is_working(user).await? {
            let issued = challenge.clone();
            self.challenges
                .take_if(user, &move |live: &Challenge| *live == issued)
                .await?;
            debug!(user, "Work stopped during issue, challenge dropped");
            return Err(EngineError::Validation(messages::START_WORK_FIRST.to_string()));
        }
        debug!(user, "Challenge issued");

        let menu = self.main_menu(user).await?;
        self.send(
            user,
            Outbound::photo(messages::challenge_caption(&self.rules), image).with_controls(menu),
        )
        .await?;
        Ok(challenge)
    }

    /// Checks `submitted` against the live challenge, ignoring case.
    ///
    /// A match consumes the challenge and credits the reward exactly once; the
    /// caller is expected to issue a replacement.
    pub async fn verify(&self, user: UserId, submitted: &str) -> Result<Verification> {
        let consumed = self
            .challenges
            .take_if(user, &|challenge: &Challenge| challenge.matches(submitted))
            .await?;

        if consumed.is_some() {
            let balance = self.ledger.credit(user, self.rules.reward).await?;
            info!(user, %balance, "Challenge solved");
            return Ok(Verification::Correct { balance });
        }

        if self.challenges.get(user).await?.is_some() {
            debug!(user, "Incorrect answer");
            Ok(Verification::Incorrect)
        } else {
            Ok(Verification::NoActiveChallenge)
        }
    }

    /// Discards any live challenge without reward.
    pub async fn abandon(&self, user: UserId) -> Result<()> {
        self.challenges.take(user).await?;
        Ok(())
    }

    pub async fn start_work(&self, user: UserId) -> Result<Challenge> {
        self.ledger.set_working(user, true).await?;
        info!(user, "Work session started");
        self.send(
            user,
            Outbound::text(messages::WAITING_FOR_CHALLENGE)
                .with_controls(Controls::MainMenu { working: true }),
        )
        .await?;
        self.issue(user).await
    }

    pub async fn stop_work(&self, user: UserId) -> Result<()> {
        self.ledger.set_working(user, false).await?;
        self.abandon(user).await?;
        info!(user, "Work session stopped");
        self.send(
            user,
            Outbound::text(messages::WORK_STOPPED)
                .with_controls(Controls::MainMenu { working: false }),
        )
        .await
    }

    /// Replaces the live challenge; only valid during a work session.
    pub async fn new_challenge(&self, user: UserId) -> Result<Challenge> {
        self.ensure_working(user).await?;
        self.send(
            user,
            Outbound::text(messages::WAITING_FOR_CHALLENGE)
                .with_controls(Controls::MainMenu { working: true }),
        )
        .await?;
        self.issue(user).await
    }

    async fn ensure_working(&self, user: UserId) -> Result<()> {
        if self.ledger.is_working(user).await? {
            Ok(())
        } else {
            Err(EngineError::Validation(messages::START_WORK_FIRST.to_string()))
        }
    }

    /// Text handler for answers: verify, reward, and keep the work loop going.
    pub(super) async fn answer(&self, user: UserId, text: &str) -> Result<()> {
        match self.verify(user, text).await? {
            Verification::Correct { .. } => {
                let menu = self.main_menu(user).await?;
                self.send(
                    user,
                    Outbound::text(messages::correct_answer(&self.rules)).with_controls(menu.clone()),
                )
                .await?;
                if !self.ledger.is_working(user).await? {
                    debug!(user, "Session ended, no replacement challenge");
                    return Ok(());
                }
                self.send(
                    user,
                    Outbound::text(messages::WAITING_FOR_CHALLENGE).with_controls(menu),
                )
                .await?;
                self.issue(user).await.map(|_| ())
            }
            Verification::Incorrect => {
                let menu = self.main_menu(user).await?;
                self.send(
                    user,
                    Outbound::text(messages::INCORRECT_ANSWER).with_controls(menu),
                )
                .await
            }
            Verification::NoActiveChallenge => {
                debug!(user, "Text without an active challenge ignored");
                Ok(())
            }
        }
    }
}
