//! Login cookies and the `SessionUser` extractor.

use std::future::{Ready, ready};

use actix_web::cookie::{Cookie, time::Duration};
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest, HttpResponseBuilder, web};
use serde::{Deserialize, Serialize};

use crate::config::CookieConfig;
use crate::crypto::CookieSealer;
use crate::error::AppError;
use crate::state::AppState;

pub const ACCESS_TOKEN: &str = "k_at";
pub const REFRESH_TOKEN: &str = "k_rt";
pub const USER_ID: &str = "k_uid";
pub const EMAIL: &str = "k_email";
pub const PROFILE_IMAGE: &str = "k_profile";

pub const AUTH_COOKIES: [&str; 5] = [ACCESS_TOKEN, REFRESH_TOKEN, USER_ID, EMAIL, PROFILE_IMAGE];

const ACCESS_TOKEN_MAX_AGE: i64 = 60 * 60 * 8;
const LONG_MAX_AGE: i64 = 60 * 60 * 24 * 30;

/// Everything the OAuth callback learned about the user.
#[derive(Debug, Default)]
pub struct LoginCookies {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub profile_image: Option<String>,
}

pub fn build_cookie(
    config: &CookieConfig,
    name: &'static str,
    value: String,
    max_age_secs: i64,
    http_only: bool,
) -> Cookie<'static> {
    let mut builder = Cookie::build(name, value)
        .path("/")
        .max_age(Duration::seconds(max_age_secs))
        .http_only(http_only)
        .secure(config.secure)
        .same_site(config.same_site);
    if let Some(domain) = &config.domain {
        builder = builder.domain(domain.clone());
    }
    builder.finish()
}

/// A cookie that deletes `name`, matching the path, domain and SameSite it was set with.
pub fn removal_cookie(config: &CookieConfig, name: &'static str) -> Cookie<'static> {
    let mut cookie = build_cookie(config, name, String::new(), 0, true);
    cookie.make_removal();
    cookie
}

/// What the sealed `k_at` cookie carries: the provider token and the email the
/// provider reported for it. The email here, not the `k_email` cookie, is the
/// caller's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub access_token: String,
    pub email: Option<String>,
}

pub fn seal_session(sealer: &CookieSealer, token: &SessionToken) -> anyhow::Result<String> {
    sealer.seal(ACCESS_TOKEN, &serde_json::to_string(token)?)
}

/// Token and user id cookies are sealed; email and avatar stay plain so the SPA can read them.
pub fn set_login_cookies(
    response: &mut HttpResponseBuilder,
    config: &CookieConfig,
    sealer: &CookieSealer,
    login: &LoginCookies,
) -> anyhow::Result<()> {
    let session = SessionToken {
        access_token: login.access_token.clone(),
        email: login.email.clone(),
    };
    response.cookie(build_cookie(
        config,
        ACCESS_TOKEN,
        seal_session(sealer, &session)?,
        ACCESS_TOKEN_MAX_AGE,
        true,
    ));
    if let Some(refresh) = &login.refresh_token {
        response.cookie(build_cookie(
            config,
            REFRESH_TOKEN,
            sealer.seal(REFRESH_TOKEN, refresh)?,
            LONG_MAX_AGE,
            true,
        ));
    }
    if let Some(user_id) = &login.user_id {
        response.cookie(build_cookie(
            config,
            USER_ID,
            sealer.seal(USER_ID, user_id)?,
            LONG_MAX_AGE,
            true,
        ));
    }
    if let Some(email) = &login.email {
        response.cookie(build_cookie(config, EMAIL, email.clone(), LONG_MAX_AGE, false));
    }
    if let Some(image) = &login.profile_image {
        response.cookie(build_cookie(config, PROFILE_IMAGE, image.clone(), LONG_MAX_AGE, false));
    }
    Ok(())
}

pub fn clear_auth_cookies(response: &mut HttpResponseBuilder, config: &CookieConfig) {
    for name in AUTH_COOKIES {
        response.cookie(removal_cookie(config, name));
    }
}

/// Opens a sealed cookie. Missing, empty, forged or foreign values all read as `None`.
pub fn sealed_cookie(req: &HttpRequest, sealer: &CookieSealer, name: &str) -> Option<String> {
    let cookie = req.cookie(name)?;
    match sealer.open(name, cookie.value()) {
        Ok(value) if !value.is_empty() => Some(value),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(cookie = name, error = %e, "ignoring cookie that does not open");
            None
        }
    }
}

pub fn session_token(req: &HttpRequest, sealer: &CookieSealer) -> Option<SessionToken> {
    let raw = sealed_cookie(req, sealer, ACCESS_TOKEN)?;
    serde_json::from_str::<SessionToken>(&raw)
        .ok()
        .filter(|token| !token.access_token.is_empty())
}

/// The provider access token, if the request carries a `k_at` this process can open.
pub fn access_token(req: &HttpRequest, sealer: &CookieSealer) -> Option<String> {
    session_token(req, sealer).map(|token| token.access_token)
}

/// The provider user id from the sealed `k_uid` cookie.
pub fn user_id(req: &HttpRequest, sealer: &CookieSealer) -> Option<String> {
    sealed_cookie(req, sealer, USER_ID)
}

pub fn plain_cookie(req: &HttpRequest, name: &str) -> Option<String> {
    req.cookie(name)
        .map(|c| c.value().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A logged-in caller: a sealed `k_at` whose payload names an email.
///
/// A `k_email` cookie that disagrees with the sealed email is rejected.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub email: String,
    pub access_token: String,
}

impl SessionUser {
    fn extract(req: &HttpRequest) -> Result<Self, AppError> {
        let state = req
            .app_data::<web::Data<AppState>>()
            .ok_or_else(|| AppError::Internal("application state is not configured".into()))?;
        let unauthorized = || AppError::Unauthorized("not authenticated".into());

        let token = session_token(req, &state.sealer).ok_or_else(unauthorized)?;
        let email = token
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(unauthorized)?;
        if let Some(shown) = plain_cookie(req, EMAIL) {
            if shown != email {
                tracing::warn!("email cookie does not match the session");
                return Err(unauthorized());
            }
        }

        Ok(Self {
            email,
            access_token: token.access_token,
        })
    }
}

impl FromRequest for SessionUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::extract(req))
    }
}
