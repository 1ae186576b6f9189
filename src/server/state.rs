//! Server state shared across handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::Config;
use crate::error::LaurelError;
use crate::render::FontBook;
use crate::template::Template;

/// An uploaded template kept alive between requests.
pub struct TemplateSession {
    pub template: Template,
    /// Last time this session was accessed (for expiration).
    pub last_accessed: Instant,
}

impl TemplateSession {
    pub fn new(template: Template) -> Self {
        Self {
            template,
            last_accessed: Instant::now(),
        }
    }

    /// Update the last accessed time.
    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }

    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.last_accessed) >= ttl
    }
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: Config,
    /// Font faces, read-only after startup.
    pub fonts: Arc<FontBook>,
    /// Client for `http(s)` template URLs.
    pub http_client: reqwest::Client,
    pub templates: RwLock<HashMap<Uuid, TemplateSession>>,
}

impl AppState {
    pub fn new(config: Config, fonts: FontBook) -> Result<Self, LaurelError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("laurel/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LaurelError::Fetch(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            config,
            fonts: Arc::new(fonts),
            http_client,
            templates: RwLock::new(HashMap::new()),
        })
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.config.session_ttl_secs)
    }

    /// Clone the template of a live session, touching it.
    pub async fn template(&self, id: Uuid) -> Option<Template> {
        let mut sessions = self.templates.write().await;
        let session = sessions.get_mut(&id)?;
        session.touch();
        Some(session.template.clone())
    }

    /// Drop sessions idle for longer than the TTL. Returns how many were removed.
    pub async fn sweep_expired(&self, now: Instant) -> usize {
        let ttl = self.session_ttl();
        let mut sessions = self.templates.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now, ttl));
        before - sessions.len()
    }
}
