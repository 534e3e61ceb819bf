use std::{fmt, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use shared::{
    error::FormError,
    protocol::{ClientCredentialsRequest, TokenResponse},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::settings::GraphSettings;

/// Tokens are replaced this long before the provider-reported expiry.
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_usable_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin < self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Client-credentials exchange against the tenant's token endpoint, caching
/// the result until shortly before it expires.
pub struct TokenProvider {
    http: Client,
    settings: Arc<GraphSettings>,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenProvider {
    pub fn new(http: Client, settings: Arc<GraphSettings>) -> Self {
        Self {
            http,
            settings,
            cached: Mutex::new(None),
        }
    }

    pub async fn acquire(&self) -> Result<AccessToken, FormError> {
        self.acquire_at(Utc::now()).await
    }

    pub(crate) async fn acquire_at(&self, now: DateTime<Utc>) -> Result<AccessToken, FormError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_usable_at(now, Duration::seconds(TOKEN_REFRESH_MARGIN_SECS)) {
                return Ok(token.clone());
            }
            debug!(expires_at = %token.expires_at, "cached token at refresh point");
        }

        let token = self.exchange(now).await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    async fn exchange(&self, now: DateTime<Utc>) -> Result<AccessToken, FormError> {
        let settings = &self.settings;
        let response = self
            .http
            .post(settings.token_url())
            .form(&ClientCredentialsRequest::new(
                &settings.client_id,
                &settings.client_secret,
                &settings.scope,
            ))
            .send()
            .await
            .map_err(|err| {
                warn!(error = %err, "identity provider unreachable");
                FormError::Authentication(format!("identity provider unreachable: {err}"))
            })?;

        let status = response.status();
        let body: TokenResponse = response.json().await.map_err(|err| {
            FormError::Authentication(format!(
                "unreadable token response (status {status}): {err}"
            ))
        })?;

        let access_token = match body.access_token {
            Some(token) if status.is_success() && !token.is_empty() => token,
            _ => {
                let reason = body
                    .error_description
                    .or(body.error)
                    .unwrap_or_else(|| format!("token endpoint answered {status}"));
                warn!(%status, tenant = %settings.tenant_id, "client credentials rejected");
                return Err(FormError::Authentication(reason));
            }
        };

        let lifetime = body.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let expires_at = Duration::try_seconds(lifetime)
            .and_then(|delta| now.checked_add_signed(delta))
            .ok_or_else(|| {
                warn!(expires_in = lifetime, "token lifetime out of range");
                FormError::Authentication(format!(
                    "token endpoint reported an unusable lifetime of {lifetime}s"
                ))
            })?;
        info!(tenant = %settings.tenant_id, %expires_at, "acquired workbook access token");
        Ok(AccessToken::new(access_token, expires_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_not_usable_inside_refresh_margin() {
        let now = Utc::now();
        let token = AccessToken::new("t", now + Duration::seconds(30));
        assert!(!token.is_usable_at(now, Duration::seconds(TOKEN_REFRESH_MARGIN_SECS)));
        assert!(token.is_usable_at(now, Duration::zero()));
    }

    #[test]
    fn debug_output_hides_bearer_secret() {
        let token = AccessToken::new("eyJ-very-secret", Utc::now());
        assert!(!format!("{token:?}").contains("eyJ-very-secret"));
    }
}
