use std::sync::Arc;

use clap::Parser;
use hostmon::cli::{AgentArgs, CmdArgs, CollectorArgs, Command};
use hostmon::{Agent, Collector, JsonLinesSink, MemorySink, Sink, SystemSampler};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CmdArgs::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Agent(agent) => run_agent(agent).await?,
        Command::Collector(collector) => run_collector(collector).await?,
    }
    Ok(())
}

async fn run_agent(args: AgentArgs) -> hostmon::Result<()> {
    let config = args.agent_config();
    let settings = args.sampler_settings();
    config.validate()?;
    settings.validate()?;

    info!(
        server = %config.server,
        interval_secs = config.interval.as_secs(),
        local_address = %hostmon::address::local_address(),
        "Starting agent (Ctrl+C to stop)"
    );
    let sampler = SystemSampler::new(settings)?;
    let agent = Agent::new(config, sampler);
    agent.run(interrupted()).await?;
    Ok(())
}

async fn run_collector(args: CollectorArgs) -> hostmon::Result<()> {
    let sink: Arc<dyn Sink> = match &args.store {
        Some(path) => {
            let sink = JsonLinesSink::open(path)?;
            info!(store = %sink.path().display(), "Appending samples to file");
            Arc::new(sink)
        }
        None => {
            warn!(
                capacity = hostmon::constants::MEMORY_SINK_CAPACITY,
                "No --store given, only the most recent samples are kept in memory"
            );
            Arc::new(MemorySink::new())
        }
    };

    let collector = Collector::bind(&args.collector_config(), sink).await?;
    info!(addr = %collector.local_addr()?, "Starting collector (Ctrl+C to stop)");
    collector.run(interrupted()).await;
    Ok(())
}

/// Resolves on Ctrl+C. If the handler cannot be installed the loop runs
/// until the process is killed.
async fn interrupted() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Interrupt received, shutting down"),
        Err(e) => {
            warn!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await
        }
    }
}
