//! OTP login gateway

use crate::config::STATIC_OTP_CODE;
use crate::error::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Identity handed back by a successful OTP check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedUser {
    pub token: String,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

#[async_trait]
pub trait OtpGateway: Send + Sync {
    /// Ask for a code to be sent to the number
    async fn request_otp(&self, mobile_number: &str) -> Result<()>;

    /// `Ok(None)` when the code is rejected
    async fn verify_otp(&self, mobile_number: &str, otp: &str) -> Result<Option<VerifiedUser>>;
}

/// Development gateway that accepts a fixed code and sends nothing
#[derive(Debug, Clone)]
pub struct StaticOtpGateway {
    code: String,
}

impl StaticOtpGateway {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

impl Default for StaticOtpGateway {
    fn default() -> Self {
        Self::new(STATIC_OTP_CODE)
    }
}

#[async_trait]
impl OtpGateway for StaticOtpGateway {
    async fn request_otp(&self, mobile_number: &str) -> Result<()> {
        tracing::info!("Static OTP issued for {}", mobile_number);
        Ok(())
    }

    async fn verify_otp(&self, mobile_number: &str, otp: &str) -> Result<Option<VerifiedUser>> {
        if otp != self.code {
            return Ok(None);
        }
        tracing::debug!("Static OTP accepted for {}", mobile_number);

        Ok(Some(VerifiedUser {
            token: format!("static-{}", Uuid::new_v4()),
            user_id: None,
            user_name: None,
        }))
    }
}
