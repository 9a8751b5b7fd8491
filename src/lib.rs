//! Gato Coffee Bar POS backend.
//!
//! Order entry and daily analytics for a single-till coffee bar: a session
//! gate (username/PIN), an order builder over the fixed menu, an order store
//! backed by SQLite documents, an incremental daily/monthly aggregate
//! maintainer, and the analytics derivations (totals, payment mix, chart
//! series, top products, CSV export). The `commands` module is the JSON
//! surface a UI bridge invokes.

use std::path::Path;

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod aggregates;
pub mod analytics;
pub mod auth;
pub mod cart;
pub mod commands;
pub mod datetime;
pub mod db;
pub mod error;
pub mod export;
pub mod menu;
pub mod orders;

pub use error::{PosError, PosResult};

/// Shared state handed to the command layer.
pub struct AppState {
    pub db: db::DbState,
}

impl AppState {
    /// Open the database under `data_dir`, run migrations, and restore the
    /// persisted session (logged for the shell's startup decision).
    pub fn init(data_dir: &Path) -> PosResult<Self> {
        let db = db::init(data_dir)?;

        match auth::load_session(&db)? {
            Some(user) => info!(user = %user, "restored persisted session"),
            None => info!("no persisted session, login required"),
        }

        Ok(AppState { db })
    }
}

/// Initialize structured logging (console + daily rolling file under
/// `log_dir`). Call once at process start.
pub fn init_logging(log_dir: &Path) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,gato_pos=debug"));

    std::fs::create_dir_all(log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir, "gato-pos");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // Keep the guard alive for the lifetime of the app; dropping it flushes
    // and closes the log file. Leaked since the app runs until process exit.
    std::mem::forget(guard);

    info!("Starting Gato POS v{}", env!("CARGO_PKG_VERSION"));
}
