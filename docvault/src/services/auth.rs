//! Login service
//!
//! Mobile number + OTP login, the persisted session the splash screen
//! restores, and logout.

use crate::config::{
    AUTH_TOKEN_KEY, MOBILE_NUMBER_LENGTH, OTP_LENGTH, OTP_RESEND_COOLDOWN_SECS, USER_DATA_KEY,
    USER_NAME_KEY,
};
use crate::error::{AppError, Result};
use crate::models::UserSession;
use crate::remote::OtpGateway;
use crate::storage::{load_json, store_json, PersistedStore};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// An OTP that has been sent, with its resend window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpChallenge {
    pub mobile_number: String,
    pub issued_at: DateTime<Utc>,
    pub resend_after: DateTime<Utc>,
}

impl OtpChallenge {
    fn issued(mobile_number: String, now: DateTime<Utc>) -> Self {
        Self {
            mobile_number,
            issued_at: now,
            resend_after: now + Duration::seconds(OTP_RESEND_COOLDOWN_SECS),
        }
    }

    pub fn can_resend(&self, now: DateTime<Utc>) -> bool {
        now >= self.resend_after
    }

    /// Whole seconds left on the resend timer
    pub fn seconds_until_resend(&self, now: DateTime<Utc>) -> i64 {
        (self.resend_after - now).num_seconds().max(0)
    }
}

/// Trimmed number if it is exactly ten digits
pub fn validate_mobile_number(raw: &str) -> Result<String> {
    let number = raw.trim();
    if number.is_empty() {
        return Err(AppError::Validation(
            "Please enter your mobile number.".to_string(),
        ));
    }
    if number.len() != MOBILE_NUMBER_LENGTH || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "Please enter a valid 10-digit mobile number.".to_string(),
        ));
    }
    Ok(number.to_string())
}

pub fn validate_otp(raw: &str) -> Result<String> {
    let otp = raw.trim();
    if otp.len() != OTP_LENGTH || !otp.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation("Please enter a 6-digit OTP.".to_string()));
    }
    Ok(otp.to_string())
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn PersistedStore>,
    gateway: Arc<dyn OtpGateway>,
}

impl AuthService {
    pub fn new(store: Arc<dyn PersistedStore>, gateway: Arc<dyn OtpGateway>) -> Self {
        Self { store, gateway }
    }

    pub async fn request_otp(&self, mobile_number: &str) -> Result<OtpChallenge> {
        let mobile_number = validate_mobile_number(mobile_number)?;

        self.gateway.request_otp(&mobile_number).await?;
        tracing::info!("OTP requested for {}", mobile_number);

        Ok(OtpChallenge::issued(mobile_number, Utc::now()))
    }

    /// Send a new code once the previous one's resend window has passed
    pub async fn resend_otp(&self, challenge: &OtpChallenge) -> Result<OtpChallenge> {
        let now = Utc::now();
        if !challenge.can_resend(now) {
            return Err(AppError::Validation(format!(
                "Please wait {} seconds before requesting a new OTP.",
                challenge.seconds_until_resend(now)
            )));
        }
        self.request_otp(&challenge.mobile_number).await
    }

    /// Check the code and persist the resulting session
    pub async fn verify_otp(&self, mobile_number: &str, otp: &str) -> Result<UserSession> {
        let mobile_number = validate_mobile_number(mobile_number)?;
        let otp = validate_otp(otp)?;

        let Some(verified) = self.gateway.verify_otp(&mobile_number, &otp).await? else {
            tracing::warn!("OTP rejected for {}", mobile_number);
            return Err(AppError::InvalidOtp);
        };

        let session = UserSession {
            user_id: verified.user_id.unwrap_or_else(|| mobile_number.clone()),
            user_name: verified
                .user_name
                .unwrap_or_else(|| default_user_name(&mobile_number)),
            token: Some(verified.token.clone()),
        };

        store_json(self.store.as_ref(), USER_DATA_KEY, &session).await?;
        store_json(self.store.as_ref(), AUTH_TOKEN_KEY, &verified.token).await?;
        store_json(self.store.as_ref(), USER_NAME_KEY, &session.user_name).await?;

        tracing::info!("User {} signed in", session.user_id);
        Ok(session)
    }

    /// The persisted session, if there is one with a token.
    ///
    /// Anything unreadable counts as signed out.
    pub async fn restore_session(&self) -> Option<UserSession> {
        match load_json::<UserSession>(self.store.as_ref(), USER_DATA_KEY).await {
            Ok(Some(session)) if session.token.is_some() => {
                tracing::info!("Restored session for {}", session.user_id);
                Some(session)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Could not read saved session: {}", e);
                None
            }
        }
    }

    /// Sign out, wiping everything this client persisted
    pub async fn logout(&self) -> Result<()> {
        self.store.clear().await?;
        tracing::info!("Signed out, local data cleared");
        Ok(())
    }
}

fn default_user_name(mobile_number: &str) -> String {
    let suffix = &mobile_number[mobile_number.len().saturating_sub(4)..];
    format!("User {}", suffix)
}
