use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use serenity::all::{
    ChannelId, Client as SerenityClient, Context as SerenityContext, CreateMessage,
    EventHandler as SerenityEventHandler, GatewayIntents, Http, Message as SerenityMessage,
    Reaction, ReactionType, Ready,
};
use tokio::sync::{Mutex as AsyncMutex, RwLock, oneshot, watch};

use crate::bridge::{ReactionEvent, ReactionSender};
use crate::config::DiscordConfig;
use crate::parsers::discord_parser::{DECLINED_EMOJI, GOING_EMOJI, MAYBE_EMOJI};

pub mod webhook;

pub use self::webhook::WebhookNotifier;

const INITIAL_LOGIN_RETRY_SECONDS: u64 = 2;
const MAX_LOGIN_RETRY_SECONDS: u64 = 300;
const READY_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("discord gateway is not ready")]
    NotReady,
    #[error("discord.announce_channel_id is not configured")]
    MissingChannel,
    #[error("discord request failed: {0}")]
    Discord(String),
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Posts event announcements somewhere members can react to them.
#[async_trait]
pub trait EventNotifier: Send + Sync {
    /// Returns the id of the posted message, when the target reports one.
    async fn announce(&self, content: &str) -> Result<Option<String>, NotifyError>;
}

#[derive(Clone)]
pub struct DiscordClient {
    config: DiscordConfig,
    token: Arc<SecretString>,
    reactions: ReactionSender,
    login_state: Arc<AsyncMutex<DiscordLoginState>>,
    http: Arc<RwLock<Option<Arc<Http>>>>,
    stopped: Arc<watch::Sender<bool>>,
}

/// Guarded by a mutex that is only held for bookkeeping, never across the
/// gateway handshake.
#[derive(Default)]
struct DiscordLoginState {
    is_logged_in: bool,
    connecting: bool,
    gateway_task: Option<tokio::task::JoinHandle<()>>,
}

struct ReadySignalHandler {
    ready_sender: Arc<AsyncMutex<Option<oneshot::Sender<()>>>>,
    http_sender: Arc<AsyncMutex<Option<oneshot::Sender<Arc<Http>>>>>,
    reactions: ReactionSender,
}

#[serenity::async_trait]
impl SerenityEventHandler for ReadySignalHandler {
    async fn ready(&self, ctx: SerenityContext, ready: Ready) {
        info!(
            "discord gateway ready as {} ({})",
            ready.user.name, ready.user.id
        );
        if let Some(sender) = self.ready_sender.lock().await.take() {
            let _ = sender.send(());
        }
        if let Some(sender) = self.http_sender.lock().await.take() {
            let _ = sender.send(ctx.http);
        }
    }

    async fn message(&self, ctx: SerenityContext, msg: SerenityMessage) {
        if msg.author.bot || msg.content.trim() != "!ping" {
            return;
        }
        if let Err(err) = msg.channel_id.say(&ctx.http, "Pong!").await {
            warn!(channel_id = %msg.channel_id, "failed to answer ping: {err}");
        }
    }

    async fn reaction_add(&self, ctx: SerenityContext, add_reaction: Reaction) {
        let Some(user_id) = add_reaction.user_id else {
            debug!(message_id = %add_reaction.message_id, "reaction without user id, skipping");
            return;
        };

        let is_bot = match add_reaction.member.as_ref() {
            Some(member) => member.user.bot,
            None => match add_reaction.user(&ctx).await {
                Ok(user) => user.bot,
                Err(err) => {
                    warn!(user_id = %user_id, "failed to resolve reacting user: {err}");
                    return;
                }
            },
        };

        // bot reactions still go through the bridge, which rejects them
        // before touching the message body
        let message_body = if is_bot {
            String::new()
        } else {
            match add_reaction.message(&ctx).await {
                Ok(message) => message.content,
                Err(err) => {
                    warn!(
                        message_id = %add_reaction.message_id,
                        "failed to fetch reacted message: {err}"
                    );
                    return;
                }
            }
        };

        let event = build_reaction_event(
            user_id.get(),
            is_bot,
            message_body,
            &add_reaction.emoji,
            add_reaction.message_id.get(),
        );
        self.reactions.submit(event);
    }
}

pub(crate) fn reaction_emoji_name(emoji: &ReactionType) -> String {
    match emoji {
        ReactionType::Unicode(symbol) => symbol.clone(),
        ReactionType::Custom { name, .. } => name.clone().unwrap_or_default(),
        _ => String::new(),
    }
}

pub(crate) fn build_reaction_event(
    user_id: u64,
    is_bot: bool,
    message_body: String,
    emoji: &ReactionType,
    message_id: u64,
) -> ReactionEvent {
    ReactionEvent {
        actor_id: user_id.to_string(),
        is_bot,
        message_body,
        emoji: reaction_emoji_name(emoji),
        message_id: Some(message_id.to_string()),
    }
}

pub(crate) fn gateway_intents(use_privileged_intents: bool) -> GatewayIntents {
    let base = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MESSAGE_REACTIONS;
    if use_privileged_intents {
        base | GatewayIntents::MESSAGE_CONTENT
    } else {
        base
    }
}

impl DiscordClient {
    pub fn new(config: &DiscordConfig, reactions: ReactionSender) -> Self {
        info!("initializing discord client");
        Self {
            config: config.clone(),
            token: Arc::new(SecretString::from(config.bot_token.clone())),
            reactions,
            login_state: Arc::new(AsyncMutex::new(DiscordLoginState::default())),
            http: Arc::new(RwLock::new(None)),
            stopped: Arc::new(watch::Sender::new(false)),
        }
    }

    /// Connects the gateway and resolves once Discord sends Ready.
    pub async fn login(&self) -> Result<()> {
        {
            let mut state = self.login_state.lock().await;
            if state.is_logged_in {
                return Ok(());
            }
            if state.connecting {
                return Err(anyhow!("discord login already in progress"));
            }
            state.connecting = true;
        }

        let connected = self.connect().await;

        let mut state = self.login_state.lock().await;
        state.connecting = false;
        let (gateway_task, http) = connected?;
        if self.is_stopped() {
            gateway_task.abort();
            return Err(anyhow!("discord client stopped during login"));
        }

        state.is_logged_in = true;
        state.gateway_task = Some(gateway_task);
        *self.http.write().await = http;
        info!("discord bot login succeeded and gateway is connected");
        Ok(())
    }

    async fn connect(&self) -> Result<(tokio::task::JoinHandle<()>, Option<Arc<Http>>)> {
        let intents = gateway_intents(self.config.use_privileged_intents);

        let (ready_tx, ready_rx) = oneshot::channel();
        let (http_tx, http_rx) = oneshot::channel();
        let event_handler = ReadySignalHandler {
            ready_sender: Arc::new(AsyncMutex::new(Some(ready_tx))),
            http_sender: Arc::new(AsyncMutex::new(Some(http_tx))),
            reactions: self.reactions.clone(),
        };

        let mut gateway_client = SerenityClient::builder(self.token.expose_secret(), intents)
            .event_handler(event_handler)
            .await
            .map_err(|err| anyhow!("failed to build discord gateway client: {err}"))?;

        let gateway_task = tokio::spawn(async move {
            if let Err(err) = gateway_client.start_autosharded().await {
                error!("discord gateway stopped: {err}");
            }
        });

        let ready = tokio::select! {
            ready = tokio::time::timeout(Duration::from_secs(READY_TIMEOUT_SECONDS), ready_rx) => ready,
            _ = self.stop_requested() => {
                gateway_task.abort();
                return Err(anyhow!("discord client stopped during login"));
            }
        };

        match ready {
            Ok(Ok(())) => {
                let http = match tokio::time::timeout(Duration::from_secs(5), http_rx).await {
                    Ok(Ok(http)) => Some(http),
                    _ => None,
                };
                Ok((gateway_task, http))
            }
            Ok(Err(_)) => {
                gateway_task.abort();
                Err(anyhow!("discord gateway exited before receiving Ready event"))
            }
            Err(_) => {
                gateway_task.abort();
                Err(anyhow!("timed out waiting for discord Ready event"))
            }
        }
    }

    pub async fn start(&self) -> Result<()> {
        let mut retry_seconds = INITIAL_LOGIN_RETRY_SECONDS;

        loop {
            if self.is_stopped() {
                return Ok(());
            }
            match self.login().await {
                Ok(()) => {
                    info!("discord client is ready");
                    return Ok(());
                }
                Err(err) => {
                    error!(
                        "failed to start discord client: {err}. retrying in {} seconds",
                        retry_seconds
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(retry_seconds)) => {}
                        _ = self.stop_requested() => return Ok(()),
                    }
                    retry_seconds = next_retry_seconds(retry_seconds);
                }
            }
        }
    }

    /// Cancels a pending login or retry wait and disconnects the gateway.
    pub async fn stop(&self) -> Result<()> {
        self.stopped.send_replace(true);

        let mut state = self.login_state.lock().await;
        if let Some(gateway_task) = state.gateway_task.take() {
            gateway_task.abort();
            match gateway_task.await {
                Ok(()) => info!("discord gateway task exited"),
                Err(join_err) if join_err.is_cancelled() => {
                    info!("discord gateway task aborted")
                }
                Err(join_err) => {
                    error!("discord gateway task join error: {join_err}");
                }
            }
        }

        *self.http.write().await = None;
        if std::mem::take(&mut state.is_logged_in) {
            info!("discord client stopped");
        }
        Ok(())
    }

    fn is_stopped(&self) -> bool {
        *self.stopped.borrow()
    }

    async fn stop_requested(&self) {
        let mut stopped = self.stopped.subscribe();
        let _ = stopped.wait_for(|stopped| *stopped).await;
    }

    pub async fn is_ready(&self) -> bool {
        self.http.read().await.is_some()
    }
}

fn next_retry_seconds(current: u64) -> u64 {
    (current * 2).min(MAX_LOGIN_RETRY_SECONDS)
}

#[async_trait]
impl EventNotifier for DiscordClient {
    /// Posts to `announce_channel_id` and seeds the three RSVP reactions.
    async fn announce(&self, content: &str) -> Result<Option<String>, NotifyError> {
        let channel_id = self
            .config
            .announce_channel_id
            .ok_or(NotifyError::MissingChannel)?;
        let http = self.http.read().await.clone().ok_or(NotifyError::NotReady)?;

        let message = ChannelId::new(channel_id)
            .send_message(http.as_ref(), CreateMessage::new().content(content))
            .await
            .map_err(|err| NotifyError::Discord(err.to_string()))?;

        for emoji in [GOING_EMOJI, MAYBE_EMOJI, DECLINED_EMOJI] {
            if let Err(err) = message
                .react(http.as_ref(), ReactionType::Unicode(emoji.to_string()))
                .await
            {
                warn!(message_id = %message.id, "failed to seed rsvp reaction: {err}");
            }
        }

        info!(channel_id = channel_id, message_id = %message.id, "event announcement posted");
        Ok(Some(message.id.to_string()))
    }
}
