use anyhow::{Context, Result};

use crate::chat::ChatClient;
use crate::config::AppConfig;
use crate::crypto::CookieSealer;
use crate::frontend::FrontendUrls;
use crate::kakao::KakaoClient;
use crate::records::PdfRegistry;
use crate::store::Store;

/// Shared by every handler through `web::Data<AppState>`.
pub struct AppState {
    pub config: AppConfig,
    pub store: Store,
    pub kakao: KakaoClient,
    pub chat: ChatClient,
    pub sealer: CookieSealer,
    pub frontend: FrontendUrls,
    pub pdfs: PdfRegistry,
}

impl AppState {
    pub fn new(config: AppConfig, store: Store) -> Result<Self> {
        let sealer = match config.cookies.secret.as_deref() {
            Some(secret) => CookieSealer::from_base64(secret).context("COOKIE_SECRET")?,
            None => {
                tracing::warn!("COOKIE_SECRET is not set; login cookies will not survive a restart");
                CookieSealer::generate()
            }
        };

        let pdfs = match config.records.registry_file.as_deref() {
            Some(file) => PdfRegistry::load(file)?,
            None => PdfRegistry::default(),
        };

        let kakao = KakaoClient::new(config.kakao.clone()).context("building OAuth client")?;
        let chat = ChatClient::new(&config.chatbot).context("building chatbot client")?;
        let frontend = FrontendUrls::new(&config.frontend);

        Ok(Self {
            config,
            store,
            kakao,
            chat,
            sealer,
            frontend,
            pdfs,
        })
    }
}
