//! ktd: the key transparency epoch sequencer daemon.

mod queue;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sequencer::{Dispatcher, EntryMutator, Sequencer};
use trees::grpc::{GrpcLogClient, GrpcMapClient};

use crate::queue::GrpcQueue;

#[derive(Parser, Debug)]
#[command(name = "ktd", about = "Key transparency epoch sequencer")]
struct Args {
    /// gRPC endpoint of the verifiable map server.
    #[arg(long, env = "KTD_MAP_ADDR")]
    map_addr: String,

    /// gRPC endpoint of the verifiable log server.
    #[arg(long, env = "KTD_LOG_ADDR")]
    log_addr: String,

    /// gRPC endpoint of the mutation queue.
    #[arg(long, env = "KTD_QUEUE_ADDR")]
    queue_addr: String,

    /// Tree id of the directory map.
    #[arg(long, env = "KTD_MAP_ID")]
    map_id: i64,

    /// Tree id of the anchoring log.
    #[arg(long, env = "KTD_LOG_ID")]
    log_id: i64,

    /// Minimum seconds between epochs.
    #[arg(long, default_value_t = 5)]
    min_interval_secs: u64,

    /// Maximum seconds between epochs; an epoch is forced past this bound
    /// even when no mutations are pending.
    #[arg(long, default_value_t = 3600)]
    max_interval_secs: u64,

    /// Mutations pulled per epoch.
    #[arg(long, default_value_t = 1000)]
    page_size: i32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let map = GrpcMapClient::connect(args.map_addr, args.map_id).await?;
    let log = GrpcLogClient::connect(args.log_addr, args.log_id).await?;
    let source = GrpcQueue::connect(args.queue_addr, args.map_id, args.page_size).await?;

    let dispatcher = Arc::new(Dispatcher::new());
    let (summary_tx, mut summary_rx) = mpsc::channel(16);
    dispatcher.register(summary_tx).await;
    tokio::spawn(async move {
        while let Some(summary) = summary_rx.recv().await {
            info!(
                epoch = summary.epoch,
                mutations = summary.mutations.len(),
                "epoch published"
            );
        }
    });

    let sequencer = Sequencer::new(
        Arc::new(map),
        Arc::new(log),
        Arc::new(source),
        Arc::new(EntryMutator),
        dispatcher,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "signal handler failed");
        }
        let _ = shutdown_tx.send(true);
    });

    info!(
        map_id = args.map_id,
        log_id = args.log_id,
        min_interval_secs = args.min_interval_secs,
        max_interval_secs = args.max_interval_secs,
        "sequencer starting"
    );
    sequencer
        .run(
            Duration::from_secs(args.min_interval_secs),
            Duration::from_secs(args.max_interval_secs),
            shutdown_rx,
        )
        .await;
    Ok(())
}
