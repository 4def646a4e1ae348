use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use risk_control::{
    db, logging, seed, AppConfig, InferenceEngine, RiskControl, RiskError, RuleEngine, TransactionStatus,
};

const USAGE: &str = "Usage:
  risk-control init [db]           create the schema and load demo customers
  risk-control rules [dir]         validate and list rule packages
  risk-control screen <csv> [db]   screen a CSV batch of transactions";

fn main() -> Result<()> {
    logging::init();
    let config = AppConfig::load()?;
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("init") => run_init(db_path(&config, args.get(2))),
        Some("rules") => run_rules(args.get(2).map(PathBuf::from).or(config.rules_dir.clone())),
        Some("screen") => {
            let csv = args.get(2).context(USAGE)?;
            run_screen(&config, Path::new(csv), db_path(&config, args.get(3)))
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

fn db_path(config: &AppConfig, arg: Option<&String>) -> PathBuf {
    arg.map(PathBuf::from)
        .unwrap_or_else(|| config.server.database_path.clone())
}

fn engine_for(rules_dir: Option<&Path>) -> Result<RuleEngine> {
    match rules_dir {
        Some(dir) => RuleEngine::from_dir(dir),
        None => Ok(RuleEngine::with_default_rules()?),
    }
}

fn run_init(path: PathBuf) -> Result<()> {
    println!("🗄️  Risk Control - database setup");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let conn = db::open(&path)?;
    println!("✓ Schema ready at {:?} (WAL mode)", path);

    seed::seed_demo_data(&conn)?;
    println!("✓ Demo customers and accounts loaded");

    Ok(())
}

fn run_rules(rules_dir: Option<PathBuf>) -> Result<()> {
    let engine = engine_for(rules_dir.as_deref())?;

    println!("📜 {} rules loaded\n", engine.rule_count());
    for rule in engine.summaries() {
        println!(
            "{:<12} {:>4}  {:<32} {}{}",
            rule.package.as_str(),
            rule.salience,
            rule.id,
            rule.name,
            if rule.enabled { "" } else { " (disabled)" }
        );
    }

    Ok(())
}

fn run_screen(config: &AppConfig, csv_path: &Path, path: PathBuf) -> Result<()> {
    println!("🔎 Risk Control - batch screening");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let transactions = db::load_csv(csv_path)?;
    println!("✓ Loaded {} transactions from CSV\n", transactions.len());

    let conn = db::open(&path)?;
    let engine = engine_for(config.rules_dir.as_deref())?;
    let control = RiskControl::new(Arc::new(engine), config.scoring.clone());
    let monitor = control.transactions();

    let (mut approved, mut review, mut rejected, mut skipped) = (0, 0, 0, 0);
    for tx in transactions {
        let id = tx.transaction_id.clone();
        match monitor.process(&conn, tx) {
            Ok(result) => {
                match result.transaction.status {
                    TransactionStatus::Approved => approved += 1,
                    TransactionStatus::UnderReview => review += 1,
                    _ => rejected += 1,
                }
                println!(
                    "{:<20} {:<12} score {:>5.1}  {}",
                    id,
                    result.transaction.status.as_str(),
                    result.assessment.risk_score,
                    result.assessment.fired_rules.join(",")
                );
            }
            // Bad rows are reported and skipped; storage failures abort the batch
            Err(err @ (RiskError::Validation(_) | RiskError::NotFound { .. } | RiskError::Conflict(_))) => {
                skipped += 1;
                eprintln!("✗ {}: {}", id, err);
            }
            Err(err) => return Err(err.into()),
        }
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ Approved: {}", approved);
    println!("✓ Under review: {}", review);
    println!("✓ Rejected: {}", rejected);
    if skipped > 0 {
        println!("✗ Skipped: {}", skipped);
    }

    Ok(())
}
