//! `chainaccess subscribe`: follow one stream until it ends, fails, or Ctrl-C.

use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;
use tracing::info;

use chainaccess_core::request::{AccountStatusFilter, BlockStatus, EventFilter, StartOptions};
use chainaccess_core::Identifier;
use chainaccess_stream::{AccessClient, CancellationToken, Subscription};
use chainaccess_ws::{WsTransport, WsTransportConfig};

use crate::config::AccessConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SubscribeKind {
    Blocks,
    BlockHeaders,
    BlockDigests,
    Events,
    ExecutionData,
    AccountStatuses,
}

#[derive(Debug, Args)]
pub struct SubscribeArgs {
    /// Access node WebSocket endpoint (overrides the config file)
    #[arg(long)]
    pub url: Option<String>,

    #[arg(long, conflicts_with_all = ["start_id", "latest"])]
    pub start_height: Option<u64>,
    /// Start block ID, 64 hex chars
    #[arg(long, conflicts_with = "latest")]
    pub start_id: Option<String>,
    #[arg(long)]
    pub latest: bool,

    /// Event type filter, repeatable (events, account-statuses)
    #[arg(long = "event-type")]
    pub event_types: Vec<String>,
    /// Address filter, repeatable (events, account-statuses)
    #[arg(long = "address")]
    pub addresses: Vec<String>,
    /// Contract filter, repeatable (events)
    #[arg(long = "contract")]
    pub contracts: Vec<String>,

    /// Blocks between heartbeats
    #[arg(long)]
    pub heartbeat: Option<u64>,
    /// finalized | sealed (blocks, block-headers, block-digests)
    #[arg(long, default_value = "finalized")]
    pub status: BlockStatus,
    /// First expected message index (account-statuses)
    #[arg(long)]
    pub message_index: Option<u64>,
}

impl SubscribeArgs {
    fn start(&self) -> Result<StartOptions> {
        let block_id = self
            .start_id
            .as_deref()
            .map(Identifier::from_str)
            .transpose()
            .context("invalid --start-id")?;
        Ok(StartOptions {
            block_id,
            height: self.start_height,
            latest: self.latest,
        })
    }
}

pub async fn run(kind: SubscribeKind, args: SubscribeArgs, cfg: AccessConfig) -> Result<()> {
    let transport_cfg = match (&args.url, cfg.transport) {
        (Some(url), Some(t)) => WsTransportConfig { url: url.clone(), ..t },
        (Some(url), None) => WsTransportConfig::new(url.clone()),
        (None, Some(t)) => t,
        (None, None) => bail!("no endpoint: pass --url or set transport.url in --config"),
    };

    let mut subscribe = cfg.subscribe;
    if let Some(hb) = args.heartbeat {
        subscribe.heartbeat_interval = hb;
    }
    if let Some(index) = args.message_index {
        subscribe.starting_message_index = index;
    }

    let client = AccessClient::new(WsTransport::new(transport_cfg)).with_subscribe_config(subscribe);
    let start = args.start()?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    match kind {
        SubscribeKind::Blocks => {
            drain(client.subscribe_blocks(&cancel, start, args.status).await?).await
        }
        SubscribeKind::BlockHeaders => {
            drain(client.subscribe_block_headers(&cancel, start, args.status).await?).await
        }
        SubscribeKind::BlockDigests => {
            drain(client.subscribe_block_digests(&cancel, start, args.status).await?).await
        }
        SubscribeKind::Events => {
            let filter = EventFilter {
                event_types: args.event_types,
                addresses: args.addresses,
                contracts: args.contracts,
            };
            drain(client.subscribe_events(&cancel, start, filter).await?).await
        }
        SubscribeKind::ExecutionData => {
            drain(client.subscribe_execution_data(&cancel, start).await?).await
        }
        SubscribeKind::AccountStatuses => {
            let filter = AccountStatusFilter {
                event_types: args.event_types,
                addresses: args.addresses,
            };
            drain(client.subscribe_account_statuses(&cancel, start, filter).await?).await
        }
    }
}

async fn drain<T: Serialize>(mut sub: Subscription<T>) -> Result<()> {
    while let Some(record) = sub.next().await {
        println!("{}", serde_json::to_string(&record)?);
    }
    let failure = sub.error().await;
    let stats = sub.stats();
    info!(
        kind = %sub.kind(),
        received = stats.messages_received,
        delivered = stats.records_delivered,
        outcome = ?stats.outcome,
        "subscription finished"
    );
    match failure {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
