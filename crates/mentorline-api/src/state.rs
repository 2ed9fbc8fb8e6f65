//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! Services are generic over repository traits, but AppState pins them to the
//! SQLite implementations.

use std::path::PathBuf;
use std::sync::Arc;

use secrecy::SecretString;

use mentorline_core::{
    BillingPolicy, FanOut, Ledger, MeteringEngine, PaymentReconciler, PresenceTracker,
    SessionManager,
};
use mentorline_infra::config::load_config;
use mentorline_infra::sqlite::ledger::SqliteLedgerRepository;
use mentorline_infra::sqlite::mentor::SqliteMentorDirectory;
use mentorline_infra::sqlite::pool::{DatabasePool, database_url, default_data_dir};
use mentorline_infra::sqlite::presence::SqlitePresenceRepository;
use mentorline_infra::sqlite::session::SqliteSessionRepository;
use mentorline_types::config::EngineConfig;

use crate::auth::JwtConfig;
use crate::http::error::AppError;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteLedger = Ledger<SqliteLedgerRepository>;

pub type ConcreteReconciler = PaymentReconciler<SqliteLedgerRepository>;

pub type ConcreteSessionManager = SessionManager<SqliteSessionRepository, SqliteMentorDirectory>;

pub type ConcretePresenceTracker = PresenceTracker<SqlitePresenceRepository>;

pub type ConcreteMeteringEngine =
    MeteringEngine<SqliteSessionRepository, SqliteMentorDirectory, SqlitePresenceRepository>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<ConcreteLedger>,
    pub reconciler: Arc<ConcreteReconciler>,
    pub sessions: Arc<ConcreteSessionManager>,
    pub presence: Arc<ConcretePresenceTracker>,
    pub metering: Arc<ConcreteMeteringEngine>,
    pub fanout: Arc<FanOut>,
    pub config: Arc<EngineConfig>,
    /// Bearer token validation. Unset for CLI commands that never see a token.
    pub jwt: Option<JwtConfig>,
    /// Gateway key secret used to verify payment confirmations.
    pub payment_secret: Option<Arc<SecretString>>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: connect to DB, load config, wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = default_data_dir();

        tokio::fs::create_dir_all(&data_dir).await?;

        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;
        let config = load_config(&data_dir).await;

        let jwt = JwtConfig::from_env().ok();
        let payment_secret = std::env::var("MENTORLINE_PAYMENT_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(|s| Arc::new(SecretString::from(s)));

        Ok(Self::from_parts(db_pool, config, data_dir, jwt, payment_secret))
    }

    /// Wire services over an existing pool.
    pub fn from_parts(
        db_pool: DatabasePool,
        config: EngineConfig,
        data_dir: PathBuf,
        jwt: Option<JwtConfig>,
        payment_secret: Option<Arc<SecretString>>,
    ) -> Self {
        let fanout = Arc::new(FanOut::new());

        let ledger = Arc::new(Ledger::new(SqliteLedgerRepository::new(db_pool.clone())));
        let reconciler = Arc::new(PaymentReconciler::new(ledger.clone()));

        let sessions = Arc::new(SessionManager::new(
            SqliteSessionRepository::new(db_pool.clone()),
            SqliteMentorDirectory::new(db_pool.clone()),
        ));

        let presence = Arc::new(PresenceTracker::new(
            SqlitePresenceRepository::new(db_pool.clone()),
            fanout.clone(),
        ));

        let metering = Arc::new(MeteringEngine::new(
            sessions.clone(),
            presence.clone(),
            fanout.clone(),
            BillingPolicy::from(&config),
        ));

        Self {
            ledger,
            reconciler,
            sessions,
            presence,
            metering,
            fanout,
            config: Arc::new(config),
            jwt,
            payment_secret,
            data_dir,
            db_pool,
        }
    }

    /// Token settings, or an error if `MENTORLINE_JWT_SECRET` was not set.
    pub fn jwt(&self) -> Result<&JwtConfig, AppError> {
        self.jwt
            .as_ref()
            .ok_or_else(|| AppError::Internal("token validation is not configured".to_string()))
    }

    /// Gateway secret, or an error if `MENTORLINE_PAYMENT_SECRET` was not set.
    pub fn payment_secret(&self) -> Result<&SecretString, AppError> {
        self.payment_secret
            .as_deref()
            .ok_or_else(|| AppError::Internal("payment verification is not configured".to_string()))
    }
}
