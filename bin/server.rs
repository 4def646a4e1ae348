// Risk Control - Web Server
// REST API with Axum

use anyhow::{Context, Result};
use std::sync::Arc;

use risk_control::api::{build_router, AppState};
use risk_control::{db, logging, seed, AppConfig, RiskControl, RuleEngine};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let config = AppConfig::load()?;

    println!("🌐 Risk Control - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let conn = db::open(&config.server.database_path)?;
    tracing::info!(path = ?config.server.database_path, "database opened");

    if config.server.seed_demo_data {
        seed::seed_demo_data(&conn)?;
    }

    let engine = match &config.rules_dir {
        Some(dir) => RuleEngine::from_dir(dir)?,
        None => RuleEngine::with_default_rules()?,
    };
    tracing::info!(rules = engine.rule_count(), "rule engine ready");

    let control = RiskControl::new(Arc::new(engine), config.scoring.clone());
    let app = build_router(AppState::new(conn, control));

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind_addr))?;

    println!("\n🚀 Server running on http://{}", config.server.bind_addr);
    println!("   API: http://{}/api/risk-control/rules", config.server.bind_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server failed")?;

    Ok(())
}
