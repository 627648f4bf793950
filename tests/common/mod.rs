#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;

use actix_web::cookie::Cookie;
use actix_web::web;
use tempfile::TempDir;

use carebot::AppState;
use carebot::config::AppConfig;
use carebot::session::{self, SessionToken};
use carebot::store::Store;

pub const FRONTEND: &str = "https://front.example";
pub const EMAIL: &str = "daughter@example.com";

/// An `AppState` over a throwaway SQLite file. The temp dir lives as long as the context.
pub struct TestContext {
    pub dir: TempDir,
    pub state: web::Data<AppState>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    /// Provider calls go to `kakao_host`, which defaults to an address nothing listens on.
    pub fn with_env(overrides: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();

        let mut env: HashMap<String, String> = HashMap::new();
        env.insert(
            "DATABASE_URL".into(),
            dir.path().join("carebot.db").display().to_string(),
        );
        env.insert("KAKAO_CLIENT_ID".into(), "test-client".into());
        env.insert("KAKAO_AUTH_HOST".into(), "http://127.0.0.1:9".into());
        env.insert("KAKAO_API_HOST".into(), "http://127.0.0.1:9".into());
        env.insert("BACKEND_BASE".into(), "https://api.example".into());
        env.insert("FRONTEND_BASE".into(), FRONTEND.into());
        env.insert("USE_HASH_ROUTER".into(), "true".into());
        env.insert(
            "ANALYZE_PDF_PATH".into(),
            dir.path().join("missing.pdf").display().to_string(),
        );
        for (key, value) in overrides {
            env.insert((*key).to_string(), (*value).to_string());
        }

        let config = AppConfig::from_lookup(|key: &str| env.get(key).cloned()).unwrap();
        let store = Store::connect(&config.database).unwrap();
        store.run_migrations().unwrap();
        let state = web::Data::new(AppState::new(config, store).unwrap());

        Self { dir, state }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// A `k_at` cookie this state's sealer will accept, without an email in it.
    pub fn token_cookie(&self, token: &str) -> Cookie<'static> {
        self.sealed_session(token, None)
    }

    /// A `k_at` cookie for a logged-in user with `email`.
    pub fn session_cookie(&self, token: &str, email: &str) -> Cookie<'static> {
        self.sealed_session(token, Some(email))
    }

    pub fn user_id_cookie(&self, user_id: &str) -> Cookie<'static> {
        let sealed = self.state.sealer.seal(session::USER_ID, user_id).unwrap();
        Cookie::new(session::USER_ID, sealed)
    }

    fn sealed_session(&self, token: &str, email: Option<&str>) -> Cookie<'static> {
        let payload = SessionToken {
            access_token: token.to_string(),
            email: email.map(str::to_string),
        };
        let sealed = session::seal_session(&self.state.sealer, &payload).unwrap();
        Cookie::new(session::ACCESS_TOKEN, sealed)
    }

    pub fn email_cookie(&self, email: &str) -> Cookie<'static> {
        Cookie::new(session::EMAIL, email.to_string())
    }
}

const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556,
    556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, 1015, 667, 667, 722,
    722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722,
    667, 944, 667, 667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556, 278, 556,
    556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500,
    500, 334, 260, 334, 584,
];

/// A one-page PDF with each of `lines` (ASCII only) on its own text line.
pub fn text_pdf(lines: &[&str]) -> Vec<u8> {
    let mut content = String::from("BT\n/F1 12 Tf\n72 720 Td\n");
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            content.push_str("0 -20 Td\n");
        }
        let escaped = line
            .replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)");
        content.push_str(&format!("({escaped}) Tj\n"));
    }
    content.push_str("ET\n");

    let widths = HELVETICA_WIDTHS
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
            .to_string(),
        format!(
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding \
             /FirstChar 32 /LastChar 126 /Widths [{widths}] >>"
        ),
        format!("<< /Length {} >>\nstream\n{content}endstream", content.len()),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }

    let xref = pdf.len();
    let mut tail = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        tail.push_str(&format!("{offset:010} 00000 n \n"));
    }
    tail.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
        objects.len() + 1
    ));
    pdf.extend_from_slice(tail.as_bytes());
    pdf
}
