//! Checkout wizard.
//!
//! ```text
//! auth     --authenticated-->      payment
//! payment  --select card|pix-->    card | pix
//! card|pix --back-->               payment
//! card|pix --payment succeeded-->  success
//! ```
//!
//! Entering `success` issues the token exactly once per flow lifecycle. Errors
//! are recorded on the flow (per field or as a banner) and also returned.

pub mod card;
pub mod pix;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::backend::Backend;
use crate::config::Config;
use crate::errors::{AppError, ErrorKind};
use crate::models::token::{ApiToken, TokenConfig};
use crate::models::user::{Credentials, Registration};
use crate::session::Session;

pub use card::CardForm;
pub use pix::{PixCharge, PixTick};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStep {
    Auth,
    Payment,
    Card,
    Pix,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Card,
    Pix,
}

impl std::str::FromStr for PaymentMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" => Ok(PaymentMethod::Card),
            "pix" => Ok(PaymentMethod::Pix),
            other => Err(AppError::InvalidInput(format!(
                "unknown payment method '{}', expected card or pix",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutEvent {
    Authenticated,
    SelectMethod(PaymentMethod),
    Back,
    PaymentSucceeded,
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CheckoutStep::Auth => "auth",
            CheckoutStep::Payment => "payment",
            CheckoutStep::Card => "card",
            CheckoutStep::Pix => "pix",
            CheckoutStep::Success => "success",
        };
        f.write_str(s)
    }
}

impl std::fmt::Display for CheckoutEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckoutEvent::Authenticated => f.write_str("authenticate"),
            CheckoutEvent::SelectMethod(PaymentMethod::Card) => f.write_str("select card"),
            CheckoutEvent::SelectMethod(PaymentMethod::Pix) => f.write_str("select pix"),
            CheckoutEvent::Back => f.write_str("go back"),
            CheckoutEvent::PaymentSucceeded => f.write_str("complete payment"),
        }
    }
}

impl CheckoutStep {
    /// Where a freshly opened checkout starts.
    pub fn initial(has_cached_user: bool) -> Self {
        if has_cached_user {
            CheckoutStep::Payment
        } else {
            CheckoutStep::Auth
        }
    }

    pub fn apply(self, event: CheckoutEvent) -> Result<Self, AppError> {
        use CheckoutEvent as E;
        use CheckoutStep as S;

        match (self, event) {
            (S::Auth, E::Authenticated) => Ok(S::Payment),
            (S::Payment, E::SelectMethod(PaymentMethod::Card)) => Ok(S::Card),
            (S::Payment, E::SelectMethod(PaymentMethod::Pix)) => Ok(S::Pix),
            (S::Card | S::Pix, E::Back) => Ok(S::Payment),
            (S::Card | S::Pix, E::PaymentSucceeded) => Ok(S::Success),
            (from, event) => Err(AppError::InvalidTransition {
                from: from.to_string(),
                event: event.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub enum AuthForm {
    Login(Credentials),
    Register(Registration),
}

impl AuthForm {
    fn credentials(&self) -> Credentials {
        match self {
            AuthForm::Login(c) => c.clone(),
            AuthForm::Register(r) => Credentials {
                email: r.email.clone(),
                password: r.password.clone(),
            },
        }
    }
}

/// Terminal result of the success step.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClaimOutcome {
    Created { token: ApiToken },
    /// The backend refused a second free order.
    AlreadyClaimed,
    Failed { message: String },
}

/// One-shot guard for token creation, keyed by an idempotency key that is
/// also sent to the backend.
#[derive(Debug)]
struct IdempotencyLatch {
    key: String,
    fired: bool,
}

impl IdempotencyLatch {
    fn new() -> Self {
        Self {
            key: Uuid::new_v4().to_string(),
            fired: false,
        }
    }

    /// Returns true only the first time.
    fn fire(&mut self) -> bool {
        !std::mem::replace(&mut self.fired, true)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CheckoutTiming {
    pub card_delay: Duration,
    pub pix_countdown_secs: u32,
}

impl From<&Config> for CheckoutTiming {
    fn from(cfg: &Config) -> Self {
        Self {
            card_delay: cfg.card_delay,
            pix_countdown_secs: cfg.pix_countdown_secs,
        }
    }
}

pub struct CheckoutFlow {
    backend: Arc<dyn Backend>,
    session: Session,
    config: TokenConfig,
    amount: Option<f64>,
    timing: CheckoutTiming,
    step: CheckoutStep,
    open: bool,
    banner: Option<String>,
    field_errors: BTreeMap<String, Vec<String>>,
    pix: Option<PixCharge>,
    latch: IdempotencyLatch,
    outcome: Option<ClaimOutcome>,
}

impl CheckoutFlow {
    /// Open the checkout for `config`. Starts at `payment` when a user is cached.
    pub fn open(session: Session, config: TokenConfig, timing: CheckoutTiming) -> Self {
        let step = CheckoutStep::initial(session.cached_user().is_some());
        tracing::debug!(%step, "checkout opened");
        Self {
            backend: session.backend().clone(),
            session,
            config,
            amount: None,
            timing,
            step,
            open: true,
            banner: None,
            field_errors: BTreeMap::new(),
            pix: None,
            latch: IdempotencyLatch::new(),
            outcome: None,
        }
    }

    /// Price shown on the pix charge, if known.
    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn field_errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.field_errors
    }

    pub fn pix_charge(&self) -> Option<&PixCharge> {
        self.pix.as_ref()
    }

    pub fn outcome(&self) -> Option<&ClaimOutcome> {
        self.outcome.as_ref()
    }

    pub fn idempotency_key(&self) -> &str {
        &self.latch.key
    }

    fn transition(&mut self, event: CheckoutEvent) -> Result<CheckoutStep, AppError> {
        let next = self.step.apply(event)?;
        tracing::debug!(from = %self.step, to = %next, "checkout transition");
        self.step = next;
        Ok(next)
    }

    fn clear_errors(&mut self) {
        self.banner = None;
        self.field_errors.clear();
    }

    fn record(&mut self, err: AppError) -> AppError {
        match err.kind() {
            ErrorKind::Validation => self.field_errors = err.field_errors(),
            _ => self.banner = Some(err.to_string()),
        }
        err
    }

    fn ensure_open(&self, event: &str) -> Result<(), AppError> {
        if self.open {
            Ok(())
        } else {
            Err(AppError::InvalidTransition {
                from: "closed".into(),
                event: event.to_string(),
            })
        }
    }

    fn expect_step(&self, expected: CheckoutStep, event: &str) -> Result<(), AppError> {
        self.ensure_open(event)?;
        if self.step == expected {
            Ok(())
        } else {
            Err(AppError::InvalidTransition {
                from: self.step.to_string(),
                event: event.to_string(),
            })
        }
    }

    /// Register-or-login, then log in through the session so the token and
    /// user get stored. Either failure leaves the flow at `auth`.
    pub async fn authenticate(&mut self, form: AuthForm) -> Result<CheckoutStep, AppError> {
        self.expect_step(CheckoutStep::Auth, "authenticate")?;
        self.clear_errors();

        let first = match &form {
            AuthForm::Register(r) => self.backend.register(r).await.map(|_| ()),
            AuthForm::Login(c) => self.backend.login(c).await.map(|_| ()),
        };
        if let Err(e) = first {
            return Err(self.record(e));
        }

        if let Err(e) = self.session.login(&form.credentials()).await {
            return Err(self.record(e));
        }

        self.transition(CheckoutEvent::Authenticated)
    }

    pub fn select_method(&mut self, method: PaymentMethod) -> Result<CheckoutStep, AppError> {
        self.ensure_open("select payment method")?;
        self.clear_errors();
        let step = self.transition(CheckoutEvent::SelectMethod(method))?;
        if method == PaymentMethod::Pix {
            self.pix = Some(PixCharge::new(self.amount, self.timing.pix_countdown_secs));
        }
        Ok(step)
    }

    pub fn back(&mut self) -> Result<CheckoutStep, AppError> {
        self.ensure_open("go back")?;
        self.clear_errors();
        let step = self.transition(CheckoutEvent::Back)?;
        self.pix = None;
        Ok(step)
    }

    /// Simulated card payment: any well-formed card succeeds after the fixed delay.
    pub async fn pay_with_card(&mut self, card: &CardForm) -> Result<&ClaimOutcome, AppError> {
        self.expect_step(CheckoutStep::Card, "pay with card")?;
        self.clear_errors();
        if let Err(e) = card.validate() {
            return Err(self.record(e));
        }

        tracing::info!(last4 = %card.last4(), "processing simulated card payment");
        tokio::time::sleep(self.timing.card_delay).await;

        self.transition(CheckoutEvent::PaymentSucceeded)?;
        self.claim_token().await
    }

    /// One countdown tick of the pix step. The transition to `success` happens
    /// on the tick that reaches zero and never again.
    pub fn pix_tick(&mut self) -> Result<PixTick, AppError> {
        self.ensure_open("tick pix countdown")?;
        let Some(charge) = self.pix.as_mut() else {
            return Err(AppError::InvalidTransition {
                from: self.step.to_string(),
                event: "tick pix countdown".into(),
            });
        };
        let tick = charge.tick();
        if tick == PixTick::Confirmed {
            self.transition(CheckoutEvent::PaymentSucceeded)?;
        }
        Ok(tick)
    }

    /// Run the pix countdown to completion at one tick per second, then claim.
    pub async fn await_pix_confirmation(&mut self) -> Result<&ClaimOutcome, AppError> {
        self.expect_step(CheckoutStep::Pix, "await pix confirmation")?;
        loop {
            match self.pix_tick()? {
                PixTick::Remaining(secs) => {
                    tracing::debug!(remaining = secs, "waiting for pix confirmation");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                PixTick::Confirmed | PixTick::Idle => break,
            }
        }
        self.claim_token().await
    }

    /// Create the token. The backend is called at most once per lifecycle;
    /// later calls return the recorded outcome.
    pub async fn claim_token(&mut self) -> Result<&ClaimOutcome, AppError> {
        self.expect_step(CheckoutStep::Success, "claim token")?;

        if !self.latch.fire() {
            return Ok(self.outcome.get_or_insert_with(|| ClaimOutcome::Failed {
                message: "token claim already attempted".into(),
            }));
        }

        let outcome = match self.session.require_token() {
            Err(e) => ClaimOutcome::Failed {
                message: e.to_string(),
            },
            Ok(auth) => match self
                .backend
                .create_token(&auth, &self.config, &self.latch.key)
                .await
            {
                Ok(token) => {
                    tracing::info!(idempotency_key = %self.latch.key, "token created");
                    ClaimOutcome::Created { token }
                }
                Err(AppError::FreeOrderAlreadyClaimed) => {
                    tracing::info!("free order already claimed");
                    ClaimOutcome::AlreadyClaimed
                }
                Err(e) => {
                    tracing::warn!(error = %e, "token creation failed");
                    self.banner = Some(e.to_string());
                    ClaimOutcome::Failed {
                        message: e.to_string(),
                    }
                }
            },
        };

        Ok(self.outcome.insert(outcome))
    }

    /// Close the modal. Every operation fails until [`reopen`](Self::reopen).
    pub fn close(&mut self) {
        tracing::debug!(step = %self.step, "checkout closed");
        self.open = false;
    }

    /// Reopen after a close: every piece of per-lifecycle state starts over.
    pub fn reopen(&mut self) {
        self.step = CheckoutStep::initial(self.session.cached_user().is_some());
        self.open = true;
        self.clear_errors();
        self.pix = None;
        self.latch = IdempotencyLatch::new();
        self.outcome = None;
    }
}
