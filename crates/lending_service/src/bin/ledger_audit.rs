//! Lending Core - Funds Ledger Audit
//!
//! Loads the company funds ledger, re-walks every entry and prints the
//! summary as JSON. Exits non-zero when an invariant is broken.
//!
//! # Usage
//!
//! ```bash
//! LENDING_DATABASE_URL=postgres://... cargo run --bin ledger-audit
//! ```
//!
//! # Environment Variables
//!
//! * `LENDING_DATABASE_URL` - PostgreSQL connection string (in-memory when unset)
//! * `LENDING_CURRENCY` - Ledger currency (default: KES)
//! * `LENDING_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! * `LENDING_LOG_FORMAT` - pretty or json (default: pretty)

use anyhow::{bail, Context};
use tracing::info;

use lending_service::{telemetry, LendingConfig, LendingCore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = LendingConfig::from_env().context("loading configuration")?;
    telemetry::init_tracing(&config).context("installing tracing subscriber")?;

    info!(currency = %config.currency, "starting funds ledger audit");
    let core = LendingCore::from_config(&config)
        .await
        .context("connecting the funds ledger")?;

    let audit = core.audit_funds().await.context("loading the funds ledger")?;
    println!("{}", serde_json::to_string_pretty(&audit)?);

    if let Some(problem) = audit.problem {
        bail!("funds ledger failed verification: {}", problem);
    }
    Ok(())
}
