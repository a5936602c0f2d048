use chrono::NaiveDateTime;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Settings;
use crate::services::mail_service::Mailer;
use crate::utils::clock::Clock;
use crate::utils::tokens::TokenService;

/// Dépendances passées explicitement à chaque opération.
/// Construit une fois au démarrage (main.rs), partagé via `web::Data`.
#[derive(Clone)]
pub struct AppContext {
    pub db: DatabaseConnection,
    pub mailer: Arc<dyn Mailer>,
    pub clock: Arc<dyn Clock>,
    pub tokens: TokenService,
    pub settings: Arc<Settings>,
}

impl AppContext {
    pub fn new(
        db: DatabaseConnection,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        settings: Settings,
    ) -> Self {
        let tokens = TokenService::new(settings.secret_key.as_bytes(), clock.clone());
        Self {
            db,
            mailer,
            clock,
            tokens,
            settings: Arc::new(settings),
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.naive_now()
    }
}
