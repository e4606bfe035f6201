#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

mod bridge;
mod cli;
mod config;
mod db;
mod discord;
mod gear;
mod parsers;
mod utils;
mod web;

use bridge::{BridgeSettings, RsvpBridge, reaction_channel};
use config::{Config, NotifyVia};
use discord::{DiscordClient, EventNotifier, WebhookNotifier};
use web::metrics::BridgeMetrics;
use web::{WebServer, WebState};

const SHUTDOWN_DRAIN_SECONDS: u64 = 10;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();

    let config = Config::load_from_file(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    config.validate(!args.no_discord)?;

    if args.check_config {
        println!("configuration at {} is valid", args.config.display());
        return Ok(());
    }

    utils::logging::init_tracing(&config.logging)?;
    info!("fc roster bridge starting up");

    let db_manager = Arc::new(db::DatabaseManager::new(&config.database).await?);
    db_manager.migrate().await?;
    info!(backend = ?db_manager.db_type(), "database ready");

    let metrics = Arc::new(BridgeMetrics::new());
    let (reaction_sender, reaction_rx) =
        reaction_channel(config.bridge.queue_capacity, metrics.clone());
    let rsvp_bridge = Arc::new(RsvpBridge::new(
        db_manager.member_store(),
        db_manager.rsvp_store(),
        BridgeSettings::from(&config.bridge),
        metrics.clone(),
    ));
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let mut bridge_handle = rsvp_bridge.spawn(reaction_rx, shutdown_rx);

    // the sender stays alive for the whole run so the consumer only stops on shutdown
    let discord_client = if args.no_discord {
        info!("discord gateway disabled from the command line");
        None
    } else {
        Some(Arc::new(DiscordClient::new(
            &config.discord,
            reaction_sender.clone(),
        )))
    };

    let notifier = build_notifier(&config, discord_client.as_ref())?;

    let discord_handle = discord_client.clone().map(|client| {
        tokio::spawn(async move {
            if let Err(e) = client.start().await {
                error!("discord client error: {}", e);
            }
        })
    });

    let mut web_handle = if config.web.enabled {
        let web_server = WebServer::new(
            config.web.clone(),
            WebState::new(db_manager.clone(), metrics.clone(), notifier),
        );
        Some(tokio::spawn(async move {
            if let Err(e) = web_server.start().await {
                error!("web server error: {}", e);
            }
        }))
    } else {
        None
    };

    let consumer_exited = {
        let web_done = async {
            match web_handle.as_mut() {
                Some(handle) => {
                    let _ = handle.await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                false
            }
            _ = web_done => {
                warn!("web server exited");
                false
            }
            _ = &mut bridge_handle => {
                warn!("reaction consumer exited");
                true
            }
        }
    };

    if let Some(client) = discord_client.as_ref() {
        client.stop().await?;
    }
    for handle in [discord_handle, web_handle].into_iter().flatten() {
        if !handle.is_finished() {
            handle.abort();
            let _ = handle.await;
        }
    }
    drop(discord_client);
    drop(reaction_sender);

    if !consumer_exited {
        let _ = shutdown_tx.send(());
        match tokio::time::timeout(Duration::from_secs(SHUTDOWN_DRAIN_SECONDS), bridge_handle)
            .await
        {
            Ok(_) => info!("in-flight reactions drained"),
            Err(_) => warn!(
                timeout_seconds = SHUTDOWN_DRAIN_SECONDS,
                "reaction consumer did not drain in time"
            ),
        }
    }

    info!("fc roster bridge shutting down");
    Ok(())
}

fn build_notifier(
    config: &Config,
    discord_client: Option<&Arc<DiscordClient>>,
) -> Result<Option<Arc<dyn EventNotifier>>> {
    match config.discord.notify_via {
        NotifyVia::Bot => Ok(discord_client.map(|client| client.clone() as Arc<dyn EventNotifier>)),
        NotifyVia::Webhook => {
            let raw = config
                .discord
                .webhook_url
                .as_deref()
                .ok_or_else(|| anyhow!("discord.webhook_url is not set"))?;
            let url = url::Url::parse(raw)?;
            Ok(Some(Arc::new(WebhookNotifier::new(url)?)))
        }
    }
}
