use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::KakaoConfig;

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("request to provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{body}")]
    Upstream { status: u16, body: String },

    #[error("invalid provider url: {0}")]
    Url(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    pub refresh_token_expires_in: Option<i64>,
}

/// The parts of `/v2/user/me` this service reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KakaoUser {
    pub id: Option<i64>,
    pub kakao_account: Option<KakaoAccount>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KakaoAccount {
    pub email: Option<String>,
    pub profile: Option<KakaoProfile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KakaoProfile {
    pub nickname: Option<String>,
    pub profile_image_url: Option<String>,
}

impl KakaoUser {
    pub fn nickname(&self) -> Option<&str> {
        non_empty(self.profile()?.nickname.as_deref())
    }

    pub fn email(&self) -> Option<&str> {
        non_empty(self.kakao_account.as_ref()?.email.as_deref())
    }

    pub fn profile_image(&self) -> Option<&str> {
        non_empty(self.profile()?.profile_image_url.as_deref())
    }

    fn profile(&self) -> Option<&KakaoProfile> {
        self.kakao_account.as_ref()?.profile.as_ref()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Who to disconnect from the app.
#[derive(Debug, Clone)]
pub enum UnlinkTarget {
    AccessToken(String),
    /// Requires the admin key.
    UserId(String),
}

#[derive(Clone)]
pub struct KakaoClient {
    client: Client,
    config: KakaoConfig,
}

impl KakaoClient {
    pub fn new(config: KakaoConfig) -> Result<Self, OAuthError> {
        let client = Client::builder().timeout(PROVIDER_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    pub fn has_admin_key(&self) -> bool {
        self.config.admin_key.is_some()
    }

    pub fn authorize_url(&self, scope: Option<&str>, state: Option<&str>) -> Result<String, OAuthError> {
        let mut params = vec![
            ("response_type", "code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        if let Some(scope) = scope.filter(|s| !s.is_empty()) {
            params.push(("scope", scope));
        }
        if let Some(state) = state.filter(|s| !s.is_empty()) {
            params.push(("state", state));
        }

        let url = Url::parse_with_params(
            &format!("{}/oauth/authorize", self.config.auth_host),
            &params,
        )
        .map_err(|e| OAuthError::Url(e.to_string()))?;
        Ok(url.to_string())
    }

    pub async fn exchange_token(&self, code: &str) -> Result<TokenResponse, OAuthError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code", code),
        ];
        if let Some(secret) = self.config.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let response = self
            .client
            .post(format!("{}/oauth/token", self.config.auth_host))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        debug!(status = status.as_u16(), "token exchange answered");
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<TokenResponse>().await?)
    }

    pub async fn user_profile(&self, access_token: &str) -> Result<KakaoUser, OAuthError> {
        let response = self
            .client
            .get(self.api_url("/v2/user/me"))
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<KakaoUser>().await?)
    }

    /// Raw `/v2/user/me` status and body; non-JSON bodies come back as `{"raw": text}`.
    pub async fn profile_raw(&self, access_token: &str) -> Result<(u16, Value), OAuthError> {
        let response = self
            .client
            .get(self.api_url("/v2/user/me"))
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw": text }));
        Ok((status, body))
    }

    pub async fn logout(&self, access_token: &str) -> Result<(), OAuthError> {
        let response = self
            .client
            .post(self.api_url("/v1/user/logout"))
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::expect_ok(response).await
    }

    pub async fn unlink(&self, target: &UnlinkTarget) -> Result<(), OAuthError> {
        let request = self.client.post(self.api_url("/v1/user/unlink"));
        let request = match target {
            UnlinkTarget::AccessToken(token) => request.bearer_auth(token),
            UnlinkTarget::UserId(user_id) => {
                let admin_key = self.config.admin_key.as_deref().unwrap_or_default();
                request
                    .header("Authorization", format!("KakaoAK {admin_key}"))
                    .form(&[("target_id_type", "user_id"), ("target_id", user_id.as_str())])
            }
        };
        Self::expect_ok(request.send().await?).await
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_host, path)
    }

    async fn expect_ok(response: reqwest::Response) -> Result<(), OAuthError> {
        let status = response.status();
        if status == StatusCode::OK {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(OAuthError::Upstream {
            status: status.as_u16(),
            body,
        })
    }
}
