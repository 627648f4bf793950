mod common;

use actix_web::http::{StatusCode, header};
use actix_web::{App, test};
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_string_contains, header as header_eq, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use carebot::handlers::configure;
use carebot::session::{self, SessionToken};
use common::{FRONTEND, TestContext};

fn provider_env(server: &MockServer) -> Vec<(&'static str, String)> {
    vec![
        ("KAKAO_AUTH_HOST", server.uri()),
        ("KAKAO_API_HOST", server.uri()),
    ]
}

fn context_for(server: &MockServer, extra: &[(&str, &str)]) -> TestContext {
    let env = provider_env(server);
    let mut overrides: Vec<(&str, &str)> = env.iter().map(|(k, v)| (*k, v.as_str())).collect();
    overrides.extend_from_slice(extra);
    TestContext::with_env(&overrides)
}

fn profile_body() -> Value {
    json!({
        "id": 4242,
        "kakao_account": {
            "email": "daughter@example.com",
            "profile": {
                "nickname": "지은",
                "profile_image_url": "https://img.example/p.png"
            }
        }
    })
}

fn location(resp: &actix_web::dev::ServiceResponse) -> String {
    resp.headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

#[actix_web::test]
async fn login_redirects_to_provider_with_front_url_as_state() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::get()
        .uri("/auth/kakao/login?next=/mypage")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);

    let url = Url::parse(&location(&resp)).unwrap();
    assert_eq!(url.path(), "/oauth/authorize");
    let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(params.contains(&("client_id".into(), "test-client".into())));
    assert!(params.contains(&("response_type".into(), "code".into())));
    assert!(params.contains(&(
        "redirect_uri".into(),
        "https://api.example/auth/kakao/callback".into()
    )));
    assert!(params.contains(&("state".into(), format!("{FRONTEND}/#/mypage"))));
}

#[actix_web::test]
async fn login_ignores_foreign_next() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::get()
        .uri("/auth/kakao/login?next=https%3A%2F%2Fevil.example%2Fsteal")
        .to_request();
    let resp = test::call_service(&app, req).await;

    let url = Url::parse(&location(&resp)).unwrap();
    let state = url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert!(state.starts_with(FRONTEND));
    assert!(!state.contains("evil.example"));
}

#[actix_web::test]
async fn callback_without_code_is_bad_request() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::get().uri("/auth/kakao/callback").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "missing authorization code");
}

#[actix_web::test]
async fn callback_with_provider_error_is_bad_request() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::get()
        .uri("/auth/kakao/callback?error=access_denied&code=ignored")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "access_denied");
}

#[actix_web::test]
async fn callback_sets_cookies_and_redirects_with_profile() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("code=auth-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "token_type": "bearer",
            "expires_in": 21599
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/user/me"))
        .and(header_eq("Authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body()))
        .mount(&server)
        .await;

    let ctx = context_for(&server, &[]);
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let state = urlencoding::encode(&format!("{FRONTEND}/#/chat")).into_owned();
    let req = test::TestRequest::get()
        .uri(&format!("/auth/kakao/callback?code=auth-code&state={state}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);

    let next = location(&resp);
    assert!(next.starts_with(&format!("{FRONTEND}/#/chat?login=success")));
    assert!(next.contains("nickname=%EC%A7%80%EC%9D%80"));
    assert!(next.contains("email=daughter%40example.com"));

    let cookies: Vec<_> = resp.response().cookies().collect();
    let sealed = cookies
        .iter()
        .find(|c| c.name() == session::ACCESS_TOKEN)
        .unwrap();
    assert!(!sealed.value().contains("access-1"));
    let opened = ctx.state.sealer.open(session::ACCESS_TOKEN, sealed.value()).unwrap();
    let payload: SessionToken = serde_json::from_str(&opened).unwrap();
    assert_eq!(payload.access_token, "access-1");
    assert_eq!(payload.email.as_deref(), Some("daughter@example.com"));
    assert_eq!(sealed.http_only(), Some(true));

    let email = cookies.iter().find(|c| c.name() == session::EMAIL).unwrap();
    assert_eq!(email.value(), "daughter@example.com");
    let uid = cookies.iter().find(|c| c.name() == session::USER_ID).unwrap();
    assert_ne!(uid.value(), "4242");
    assert_eq!(ctx.state.sealer.open(session::USER_ID, uid.value()).unwrap(), "4242");
    assert_eq!(uid.http_only(), Some(true));
    assert!(cookies.iter().any(|c| c.name() == session::REFRESH_TOKEN));
}

#[actix_web::test]
async fn callback_survives_profile_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "access-2" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/user/me"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let ctx = context_for(&server, &[]);
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::get()
        .uri("/auth/kakao/callback?code=auth-code")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);

    let next = location(&resp);
    assert_eq!(next, format!("{FRONTEND}/#/?login=success"));

    let cookies: Vec<_> = resp.response().cookies().collect();
    assert!(cookies.iter().any(|c| c.name() == session::ACCESS_TOKEN));
    assert!(!cookies.iter().any(|c| c.name() == session::EMAIL));
}

#[actix_web::test]
async fn callback_reports_token_exchange_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string(r#"{"error_code":"KOE320"}"#),
        )
        .mount(&server)
        .await;

    let ctx = context_for(&server, &[]);
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::get()
        .uri("/auth/kakao/callback?code=stale")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("token exchange error"));
    assert!(detail.contains("KOE320"));
}

#[actix_web::test]
async fn whoami_without_cookie_is_logged_out() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::get().uri("/auth/kakao/whoami").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "logged_in": false }));
}

#[actix_web::test]
async fn whoami_reports_profile() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/user/me"))
        .and(header_eq("Authorization", "Bearer access-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body()))
        .mount(&server)
        .await;

    let ctx = context_for(&server, &[]);
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::get()
        .uri("/auth/kakao/whoami")
        .cookie(ctx.token_cookie("access-3"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["logged_in"], true);
    assert_eq!(body["id"], 4242);
    assert_eq!(body["nickname"], "지은");
    assert_eq!(body["email"], "daughter@example.com");
}

#[actix_web::test]
async fn forged_token_cookie_is_ignored() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::get()
        .uri("/auth/session")
        .cookie(actix_web::cookie::Cookie::new(session::ACCESS_TOKEN, "plain-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "ok": false }));
}

#[actix_web::test]
async fn session_falls_back_to_default_nickname() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/user/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1 })))
        .mount(&server)
        .await;

    let ctx = context_for(&server, &[]);
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::get()
        .uri("/auth/session")
        .cookie(ctx.token_cookie("access-4"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "ok": true, "user": { "nickname": "friend" } }));
}

#[actix_web::test]
async fn profile_requires_token() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::get().uri("/auth/kakao/profile").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "not_authenticated");
}

#[actix_web::test]
async fn profile_passes_provider_status_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/user/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "code": -401 })))
        .mount(&server)
        .await;

    let ctx = context_for(&server, &[]);
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::get()
        .uri("/auth/kakao/profile")
        .cookie(ctx.token_cookie("expired"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], -401);
}

#[actix_web::test]
async fn logout_calls_provider_and_clears_cookies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/user/logout"))
        .and(header_eq("Authorization", "Bearer access-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 4242 })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context_for(&server, &[]);
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/auth/kakao/logout")
        .cookie(ctx.token_cookie("access-5"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cleared: Vec<String> = resp
        .response()
        .cookies()
        .filter(|c| c.value().is_empty())
        .map(|c| c.name().to_string())
        .collect();
    for name in session::AUTH_COOKIES {
        assert!(cleared.iter().any(|c| c == name), "{name} not cleared");
    }

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "ok": true }));
}

#[actix_web::test]
async fn logout_without_token_still_clears_cookies() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::get().uri("/auth/kakao/logout").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.response().cookies().count(), session::AUTH_COOKIES.len());
}

#[actix_web::test]
async fn logout_provider_failure_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/user/logout"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&server)
        .await;

    let ctx = context_for(&server, &[]);
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/auth/kakao/logout")
        .cookie(ctx.token_cookie("access-6"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "kakao logout failed: invalid token");
}

#[actix_web::test]
async fn unlink_without_token_or_admin_key_is_bad_request() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/auth/kakao/unlink")
        .cookie(ctx.user_id_cookie("4242"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "no token or user id to unlink");
}

#[actix_web::test]
async fn unlink_by_user_id_uses_admin_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/user/unlink"))
        .and(header_eq("Authorization", "KakaoAK admin-secret"))
        .and(body_string_contains("target_id=4242"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 4242 })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context_for(&server, &[("KAKAO_ADMIN_KEY", "admin-secret")]);
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/auth/kakao/unlink")
        .cookie(ctx.user_id_cookie("4242"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn unlink_ignores_unsealed_user_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/user/unlink"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1 })))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = context_for(&server, &[("KAKAO_ADMIN_KEY", "admin-secret")]);
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/auth/kakao/unlink")
        .cookie(actix_web::cookie::Cookie::new(session::USER_ID, "1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "no token or user id to unlink");
}

#[actix_web::test]
async fn unlink_by_token_clears_cookies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/user/unlink"))
        .and(header_eq("Authorization", "Bearer access-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 4242 })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context_for(&server, &[("KAKAO_ADMIN_KEY", "admin-secret")]);
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    // the token takes precedence over the user id
    let req = test::TestRequest::get()
        .uri("/auth/kakao/unlink")
        .cookie(ctx.token_cookie("access-7"))
        .cookie(ctx.user_id_cookie("4242"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cleared: Vec<String> = resp
        .response()
        .cookies()
        .filter(|c| c.value().is_empty())
        .map(|c| c.name().to_string())
        .collect();
    for name in session::AUTH_COOKIES {
        assert!(cleared.iter().any(|c| c == name), "{name} not cleared");
    }

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "ok": true }));
}

#[actix_web::test]
async fn unlink_provider_failure_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/user/unlink"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&server)
        .await;

    let ctx = context_for(&server, &[]);
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/auth/kakao/unlink")
        .cookie(ctx.token_cookie("access-8"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "kakao unlink failed: invalid token");
}
