//! Tutor Chat - terminal client for a remote language-tutor gateway
//!
//! The conversation session protocol lives in `conversation` and `dispatch`;
//! this binary wires it to the HTTP gateway client and the console
//! front-end.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod console;
mod conversation;
mod dispatch;
mod gateway;

use config::Config;
use console::Console;
use conversation::SessionState;
use dispatch::Dispatcher;
use gateway::HttpTutorGateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tutor_chat=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    let gateway = HttpTutorGateway::new(&config)?;

    let state = Arc::new(Mutex::new(SessionState::new()));
    let session_id = state.lock().await.id();
    tracing::info!("🎓 Session {} talking to {}", session_id, config.gateway_url);

    Console::new(Dispatcher::new(gateway), state).run().await
}
