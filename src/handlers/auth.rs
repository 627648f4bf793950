use actix_web::http::{StatusCode, header};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::frontend::append_query;
use crate::handlers::non_blank;
use crate::kakao::{OAuthError, UnlinkTarget};
use crate::session::{self, LoginCookies};
use crate::state::AppState;

const DEFAULT_NICKNAME: &str = "friend";

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    scope: Option<String>,
    next: Option<String>,
}

pub async fn login(
    state: web::Data<AppState>,
    query: web::Query<LoginQuery>,
) -> AppResult<HttpResponse> {
    let scope = query
        .scope
        .as_deref()
        .unwrap_or(&state.config.kakao.default_scope);
    let return_url = state.frontend.build_front_url(query.next.as_deref());

    let authorize_url = state
        .kakao
        .authorize_url(Some(scope), Some(&return_url))
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(HttpResponse::TemporaryRedirect()
        .insert_header((header::LOCATION, authorize_url))
        .finish())
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

pub async fn callback(
    state: web::Data<AppState>,
    query: web::Query<CallbackQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();

    if let Some(error) = non_blank(query.error) {
        warn!(%error, "provider returned an authorization error");
        return Err(AppError::BadRequest(error));
    }
    let code = non_blank(query.code)
        .ok_or_else(|| AppError::BadRequest("missing authorization code".into()))?;

    let token = state.kakao.exchange_token(&code).await.map_err(|e| {
        warn!(error = %e, "token exchange failed");
        AppError::BadRequest(format!("token exchange error: {e}"))
    })?;
    let access_token = non_blank(token.access_token)
        .ok_or_else(|| AppError::BadRequest("no access_token from kakao".into()))?;

    let user = match state.kakao.user_profile(&access_token).await {
        Ok(user) => Some(user),
        Err(e) => {
            warn!(error = %e, "profile lookup failed, continuing login without it");
            None
        }
    };
    let nickname = user.as_ref().and_then(|u| u.nickname()).map(str::to_string);
    let email = user.as_ref().and_then(|u| u.email()).map(str::to_string);

    let mut next_url = state.frontend.resolve_return_url(query.state.as_deref());
    if !next_url.contains("login=success") && !next_url.contains("login%3Dsuccess") {
        next_url = append_query(&next_url, "login", "success");
    }
    if let Some(nickname) = &nickname {
        if !next_url.contains("nickname=") {
            next_url = append_query(&next_url, "nickname", nickname);
        }
    }
    if let Some(email) = &email {
        if !next_url.contains("email=") {
            next_url = append_query(&next_url, "email", email);
        }
    }

    let login = LoginCookies {
        access_token,
        refresh_token: non_blank(token.refresh_token),
        user_id: user.as_ref().and_then(|u| u.id).map(|id| id.to_string()),
        email,
        profile_image: user
            .as_ref()
            .and_then(|u| u.profile_image())
            .map(str::to_string),
    };

    let mut response = HttpResponse::TemporaryRedirect();
    response.insert_header((header::LOCATION, next_url));
    session::set_login_cookies(&mut response, &state.config.cookies, &state.sealer, &login)
        .map_err(|e| AppError::Internal(format!("sealing login cookies: {e}")))?;

    info!(
        has_profile = user.is_some(),
        has_email = login.email.is_some(),
        "login completed"
    );
    Ok(response.finish())
}

/// Passes the provider's `/v2/user/me` answer through untouched.
pub async fn profile(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    let Some(token) = session::access_token(&req, &state.sealer) else {
        return Ok(HttpResponse::Unauthorized().json(json!({ "error": "not_authenticated" })));
    };

    let (status, body) = state
        .kakao
        .profile_raw(&token)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok(HttpResponse::build(status).json(body))
}

pub async fn whoami(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let Some(token) = session::access_token(&req, &state.sealer) else {
        return HttpResponse::Ok().json(json!({ "logged_in": false }));
    };

    match state.kakao.user_profile(&token).await {
        Ok(user) => HttpResponse::Ok().json(json!({
            "logged_in": true,
            "id": user.id,
            "email": user.email(),
            "nickname": user.nickname(),
            "profile_image": user.profile_image(),
        })),
        Err(e) => {
            let error = match e {
                OAuthError::Upstream { body, .. } => body,
                other => other.to_string(),
            };
            HttpResponse::Unauthorized().json(json!({ "logged_in": false, "error": error }))
        }
    }
}

/// Lightweight check the SPA runs on load.
pub async fn session(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let not_logged_in = || HttpResponse::Unauthorized().json(json!({ "ok": false }));

    let Some(token) = session::access_token(&req, &state.sealer) else {
        return not_logged_in();
    };
    match state.kakao.user_profile(&token).await {
        Ok(user) => HttpResponse::Ok().json(json!({
            "ok": true,
            "user": { "nickname": user.nickname().unwrap_or(DEFAULT_NICKNAME) },
        })),
        Err(e) => {
            warn!(error = %e, "session check failed");
            not_logged_in()
        }
    }
}

pub async fn logout(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    if let Some(token) = session::access_token(&req, &state.sealer) {
        state.kakao.logout(&token).await.map_err(|e| {
            warn!(error = %e, "provider logout failed");
            AppError::Upstream(format!("kakao logout failed: {e}"))
        })?;
    }

    let mut response = HttpResponse::Ok();
    session::clear_auth_cookies(&mut response, &state.config.cookies);
    info!("logged out");
    Ok(response.json(json!({ "ok": true })))
}

/// Disconnects the app from the user's account, by token or, failing that,
/// by user id with the admin key.
pub async fn unlink(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    let token = session::access_token(&req, &state.sealer);
    let user_id = session::user_id(&req, &state.sealer);

    let target = match (token, user_id) {
        (Some(token), _) => UnlinkTarget::AccessToken(token),
        (None, Some(user_id)) if state.kakao.has_admin_key() => UnlinkTarget::UserId(user_id),
        _ => return Err(AppError::BadRequest("no token or user id to unlink".into())),
    };

    state.kakao.unlink(&target).await.map_err(|e| {
        warn!(error = %e, "provider unlink failed");
        AppError::Upstream(format!("kakao unlink failed: {e}"))
    })?;

    let mut response = HttpResponse::Ok();
    session::clear_auth_cookies(&mut response, &state.config.cookies);
    info!("account unlinked");
    Ok(response.json(json!({ "ok": true })))
}
