// CDP harness - source inventory check
//
// Connects to the test-harness endpoint, waits for the runtime to be ready and lists every
// source the debugger announced. Sources named on the command line must be among them.

use anyhow::{bail, Result};
use cdp_harness::{HarnessConfig, Inspector, ScriptTable};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Tracing to stderr only - stdout carries the source list
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cdp_harness=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let required: Vec<String> = std::env::args().skip(1).collect();
    let config = HarnessConfig::from_env()?;
    info!("Connecting to {}", config.endpoint);

    let inspector = Inspector::new();
    let scripts = ScriptTable::subscribe(&inspector);

    // All sources are announced before the runtime reports ready
    inspector.ready(&config, scripts.clone()).await?;

    for source in scripts.sources() {
        println!("{}", source);
    }

    let missing: Vec<&String> = required
        .iter()
        .filter(|source| !scripts.contains_source(source))
        .collect();
    for source in &missing {
        error!("Source was never announced: {}", source);
    }
    if !missing.is_empty() {
        bail!("{} of {} required source(s) missing", missing.len(), required.len());
    }

    info!("{} source(s) announced", scripts.sources().len());
    Ok(())
}
