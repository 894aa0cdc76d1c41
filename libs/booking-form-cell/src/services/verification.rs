use std::sync::LazyLock;

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use regex::Regex;
use tracing::{debug, info, instrument};

use shared_config::AppConfig;

use crate::error::BookingFormError;
use crate::models::{Channel, ChannelView, VerificationState};

static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10}$").expect("phone pattern is valid"));

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_REGEX.is_match(phone)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

pub fn validate_contact(channel: Channel, value: &str) -> Result<(), BookingFormError> {
    match channel {
        Channel::Phone if !is_valid_phone(value) => Err(BookingFormError::Validation(
            "Please enter a valid 10-digit phone number.".to_string(),
        )),
        Channel::Email if !is_valid_email(value) => Err(BookingFormError::Validation(
            "Please enter a valid email address.".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Delivers a one-time code to a contact and returns the code sent.
#[async_trait]
pub trait CodeIssuer: Send + Sync {
    async fn issue_code(&self, channel: Channel, target: &str) -> Result<String>;
}

/// Stand-in for SMS/email delivery: generates a 6-digit code and logs it.
#[derive(Debug, Clone, Default)]
pub struct MockCodeIssuer;

#[async_trait]
impl CodeIssuer for MockCodeIssuer {
    async fn issue_code(&self, channel: Channel, target: &str) -> Result<String> {
        let code = rand::thread_rng().gen_range(100_000..=999_999).to_string();
        info!("Sending {} verification code to {}: {}", channel, target, code);
        Ok(code)
    }
}

#[derive(Debug, Clone, Default)]
struct ChannelGate {
    state: VerificationState,
    expected_code: Option<String>,
    entered_code: Option<String>,
}

impl ChannelGate {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Independent Unverified -> CodeSent -> Verified machines for phone and
/// email, consulted at submission.
#[derive(Debug, Clone)]
pub struct VerificationGate {
    phone: ChannelGate,
    email: ChannelGate,
    required: Vec<Channel>,
}

impl VerificationGate {
    pub fn new(required: Vec<Channel>) -> Self {
        Self {
            phone: ChannelGate::default(),
            email: ChannelGate::default(),
            required,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let mut required = Vec::new();
        if config.require_phone_verification {
            required.push(Channel::Phone);
        }
        if config.require_email_verification {
            required.push(Channel::Email);
        }
        Self::new(required)
    }

    fn gate(&self, channel: Channel) -> &ChannelGate {
        match channel {
            Channel::Phone => &self.phone,
            Channel::Email => &self.email,
        }
    }

    fn gate_mut(&mut self, channel: Channel) -> &mut ChannelGate {
        match channel {
            Channel::Phone => &mut self.phone,
            Channel::Email => &mut self.email,
        }
    }

    pub fn state(&self, channel: Channel) -> VerificationState {
        self.gate(channel).state
    }

    pub fn is_required(&self, channel: Channel) -> bool {
        self.required.contains(&channel)
    }

    /// Validate `value`, have `issuer` send it a fresh code and wait for it.
    /// Requesting again while a code is outstanding replaces that code.
    #[instrument(skip(self, value, issuer))]
    pub async fn request_code(
        &mut self,
        channel: Channel,
        value: &str,
        issuer: &dyn CodeIssuer,
    ) -> Result<(), BookingFormError> {
        let state = self.state(channel);
        if state == VerificationState::Verified {
            return Err(BookingFormError::InvalidTransition {
                channel,
                state,
                action: "request a code for",
            });
        }

        validate_contact(channel, value)?;

        let code = issuer
            .issue_code(channel, value)
            .await
            .map_err(|e| BookingFormError::CodeDelivery {
                channel,
                reason: e.to_string(),
            })?;

        let gate = self.gate_mut(channel);
        gate.state = VerificationState::CodeSent;
        gate.expected_code = Some(code);
        gate.entered_code = None;
        debug!("{} verification code sent", channel);
        Ok(())
    }

    /// Compare `entered` with the outstanding code. A mismatch keeps the code
    /// outstanding; retries are unlimited.
    pub fn confirm_code(&mut self, channel: Channel, entered: &str) -> Result<(), BookingFormError> {
        let gate = self.gate_mut(channel);
        if gate.state != VerificationState::CodeSent {
            return Err(BookingFormError::InvalidTransition {
                channel,
                state: gate.state,
                action: "confirm",
            });
        }

        gate.entered_code = Some(entered.to_string());
        if gate.expected_code.as_deref() == Some(entered) {
            gate.state = VerificationState::Verified;
            gate.expected_code = None;
            info!("{} verified", channel);
            Ok(())
        } else {
            debug!("{} verification code mismatch", channel);
            Err(BookingFormError::VerificationMismatch { channel })
        }
    }

    pub fn cancel(&mut self, channel: Channel) -> Result<(), BookingFormError> {
        let gate = self.gate_mut(channel);
        if gate.state != VerificationState::CodeSent {
            return Err(BookingFormError::InvalidTransition {
                channel,
                state: gate.state,
                action: "cancel",
            });
        }
        gate.reset();
        Ok(())
    }

    /// The contact value behind `channel` was edited.
    pub fn contact_changed(&mut self, channel: Channel) {
        let gate = self.gate_mut(channel);
        if gate.state != VerificationState::Unverified {
            debug!("{} changed, verification reset", channel);
        }
        gate.reset();
    }

    /// First required channel that is not verified, in phone, email order.
    pub fn check(&self) -> Result<(), BookingFormError> {
        match Channel::ALL
            .into_iter()
            .find(|&channel| self.is_required(channel) && self.state(channel) != VerificationState::Verified)
        {
            Some(channel) => Err(BookingFormError::VerificationRequired { channel }),
            None => Ok(()),
        }
    }

    pub fn views(&self) -> Vec<ChannelView> {
        Channel::ALL
            .into_iter()
            .map(|channel| ChannelView {
                channel,
                state: self.state(channel),
                required: self.is_required(channel),
            })
            .collect()
    }
}
