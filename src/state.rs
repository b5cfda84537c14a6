//! Application state: config, the generation orchestrator, and its local cache.
//!
//! This module owns:
//!   - the loaded config (prompts + limits, from TOML or defaults)
//!   - the orchestrator (which owns the generator and the cache)
//!   - quiz lookup for the play view
//!
//! Without GEMINI_API_KEY the app still serves cached content; generation
//! requests fail with `QuizError::Unavailable`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{load_app_config_from_env, AppConfig};
use crate::domain::Quiz;
use crate::error::QuizError;
use crate::gemini::{Gemini, TextGenerator};
use crate::generator::QuizGenerator;
use crate::orchestrator::Orchestrator;
use crate::storage::{JsonFileStore, KeyValueStore, LocalCache, MemoryStore};

/// Stand-in generator used when no API key is configured.
struct Unconfigured;

#[async_trait]
impl TextGenerator for Unconfigured {
    async fn generate_text(&self, _system: &str, _prompt: &str) -> Result<String, QuizError> {
        Err(QuizError::Unavailable)
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub orchestrator: Orchestrator,
    pub generation_enabled: bool,
}

impl AppState {
    /// Build state from env: load config, open the store, init Gemini.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_app_config_from_env().unwrap_or_default();

        let store: Arc<dyn KeyValueStore> = match std::env::var("QUIZ_STORE_PATH") {
            Ok(path) if !path.trim().is_empty() => {
                let store = JsonFileStore::new(path);
                info!(target: "quizly_backend", path = %store.path().display(), "Using JSON file store");
                Arc::new(store)
            }
            _ => {
                warn!(target: "quizly_backend", "QUIZ_STORE_PATH not set; cache lives in memory only");
                Arc::new(MemoryStore::new())
            }
        };

        let timeout = std::time::Duration::from_secs(config.limits.http_timeout_secs);
        let (llm, enabled): (Arc<dyn TextGenerator>, bool) = match Gemini::from_env(timeout) {
            Some(g) => {
                info!(target: "quizly_backend", base_url = %g.base_url, model = %g.model, "Gemini enabled.");
                (Arc::new(g), true)
            }
            None => {
                warn!(target: "quizly_backend", "Gemini disabled (no GEMINI_API_KEY). Serving cached quizzes only.");
                (Arc::new(Unconfigured), false)
            }
        };

        let mut state = Self::with_parts(llm, store, Arc::new(SystemClock), config);
        state.generation_enabled = enabled;
        state
    }

    /// Assemble state from explicit parts (tests, embedding).
    pub fn with_parts(
        llm: Arc<dyn TextGenerator>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: AppConfig,
    ) -> Self {
        let generator = QuizGenerator::new(llm, clock.clone(), config.prompts.clone(), &config.limits);
        let orchestrator = Orchestrator::new(generator, LocalCache::new(store), clock, config.limits.clone());
        Self { config, orchestrator, generation_enabled: true }
    }

    pub fn cache(&self) -> &LocalCache {
        self.orchestrator.cache()
    }

    /// Find a quiz for play: the hand-off slot first, then the last user quiz,
    /// then today's cached batch. Without an id, only the hand-off slot is used.
    #[instrument(level = "debug", skip(self))]
    pub async fn find_quiz(&self, id: Option<&str>) -> Option<Quiz> {
        let current = self.cache().load_current_quiz();
        let Some(id) = id else { return current };

        if let Some(q) = current.filter(|q| q.id == id) {
            return Some(q);
        }
        if let Some(q) = self.orchestrator.snapshot().await.quiz.filter(|q| q.id == id) {
            return Some(q);
        }
        self.cache().load_quizzes().into_iter().find(|q| q.id == id)
    }
}
