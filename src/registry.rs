//! Channel → game instance registry, exposed to the host as the `Quiz`
//! module.

use std::sync::Arc;

use anyhow::Context;
use dashmap::DashMap;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    bot::{Module, ModuleContext},
    error::GameError,
    game::{self, GameInstance, SharedGame},
    pool::{self, PoolSource},
};

/// Configuration block for the quiz module: channel identifier mapped to the
/// name of its game-definition file.
#[derive(Debug, Deserialize)]
struct QuizConfig {
    #[serde(rename = "Games", default)]
    games: IndexMap<String, String>,
}

/// Owns the per-channel game instances and forwards inbound channel messages
/// to the right one.
pub struct GameRegistry {
    nick: String,
    games: DashMap<String, SharedGame>,
}

impl GameRegistry {
    /// Empty registry for the bot identified by `nick`.
    pub fn new(nick: String) -> Self {
        Self {
            nick,
            games: DashMap::new(),
        }
    }

    /// Install a game instance for its channel.
    pub fn register(&self, game: SharedGame) {
        self.games.insert(game.channel().to_string(), game);
    }

    /// Build the registry from the `Quiz` module configuration, loading every
    /// channel's game definition. Any load failure is fatal.
    pub fn from_config(ctx: &ModuleContext, block: &serde_json::Value) -> anyhow::Result<Self> {
        let config: QuizConfig = serde_json::from_value(block.clone())
            .context("parsing the Quiz module configuration")?;

        let registry = Self::new(ctx.nick.clone());
        for (channel, source_name) in config.games {
            let path = pool::quiz_path(&source_name);
            let source = PoolSource::load(&path)
                .with_context(|| format!("loading quiz definition for `{channel}`"))?;
            info!(
                channel = %channel,
                source = %source_name,
                questions = source.len(),
                "quiz game registered"
            );
            registry.register(GameInstance::new(
                channel,
                path,
                source,
                ctx.prefix,
                Arc::clone(&ctx.sink),
                Arc::clone(&ctx.access),
            ));
        }

        Ok(registry)
    }

    /// Forward a channel message to its game instance.
    ///
    /// Messages from the bot itself and messages for channels without a
    /// registered instance are ignored.
    pub async fn route_channel_message(
        &self,
        channel: &str,
        sender: &str,
        text: &str,
    ) -> Result<(), GameError> {
        if sender == self.nick {
            return Ok(());
        }
        let Some(game) = self.games.get(channel).map(|entry| Arc::clone(entry.value())) else {
            debug!(channel, "no quiz game attached to channel");
            return Ok(());
        };
        game::handle_message(&game, sender, text).await
    }

    /// Number of registered channels.
    pub fn len(&self) -> usize {
        self.games.len()
    }

    /// Whether no channel has a game attached.
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

impl Module for GameRegistry {
    fn name(&self) -> &'static str {
        "Quiz"
    }

    fn on_channel_message<'a>(
        &'a self,
        channel: &'a str,
        sender: &'a str,
        text: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.route_channel_message(channel, sender, text)
                .await
                .map_err(Into::into)
        })
    }
}

/// Registration-table constructor for the quiz module.
pub fn build_module(
    ctx: &ModuleContext,
    block: &serde_json::Value,
) -> anyhow::Result<Box<dyn Module>> {
    Ok(Box::new(GameRegistry::from_config(ctx, block)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::{Path, PathBuf};

    use crate::access::AllowAll;
    use crate::game::GamePhase;
    use crate::transport::{ChatSink, TransportResult};

    #[derive(Default)]
    struct RecordingSink {
        sent: std::sync::Mutex<Vec<(String, String)>>,
    }

    impl ChatSink for RecordingSink {
        fn message<'a>(
            &'a self,
            channel: &'a str,
            text: &'a str,
        ) -> BoxFuture<'a, TransportResult<()>> {
            Box::pin(async move {
                self.sent
                    .lock()
                    .unwrap()
                    .push((channel.to_string(), text.to_string()));
                Ok(())
            })
        }
    }

    fn make_registry(channel: &str) -> (GameRegistry, SharedGame) {
        let source = PoolSource::parse(
            Path::new("test.json"),
            r#"{"questions": {"2+2?": {"answers": ["4"]}}, "join_wait": 1, "answer_wait": 1}"#,
        )
        .unwrap();
        let game = GameInstance::new(
            channel.to_string(),
            PathBuf::from("test.json"),
            source,
            '!',
            Arc::new(RecordingSink::default()),
            Arc::new(AllowAll),
        );
        let registry = GameRegistry::new("scoutix".to_string());
        registry.register(Arc::clone(&game));
        (registry, game)
    }

    #[tokio::test]
    async fn routes_messages_to_the_matching_channel() {
        let (registry, game) = make_registry("#quiz");

        registry
            .route_channel_message("#quiz", "alice", "!start")
            .await
            .unwrap();

        assert_eq!(game.snapshot().await.phase, GamePhase::New);
    }

    #[tokio::test]
    async fn ignores_messages_from_the_bot_itself() {
        let (registry, game) = make_registry("#quiz");

        registry
            .route_channel_message("#quiz", "scoutix", "!start")
            .await
            .unwrap();

        assert_eq!(game.snapshot().await.phase, GamePhase::Stopped);
    }

    #[tokio::test]
    async fn ignores_channels_without_an_instance() {
        let (registry, game) = make_registry("#quiz");

        registry
            .route_channel_message("#other", "alice", "!start")
            .await
            .unwrap();

        assert_eq!(game.snapshot().await.phase, GamePhase::Stopped);
    }

    #[tokio::test]
    async fn rejects_a_malformed_configuration_block() {
        let ctx = ModuleContext {
            nick: "scoutix".to_string(),
            prefix: '!',
            sink: Arc::new(RecordingSink::default()),
            access: Arc::new(AllowAll),
        };
        let block = serde_json::json!({"Games": ["not", "a", "map"]});

        assert!(GameRegistry::from_config(&ctx, &block).is_err());
    }

    #[tokio::test]
    async fn empty_configuration_builds_an_empty_registry() {
        let ctx = ModuleContext {
            nick: "scoutix".to_string(),
            prefix: '!',
            sink: Arc::new(RecordingSink::default()),
            access: Arc::new(AllowAll),
        };
        let block = serde_json::json!({"Games": {}});

        let registry = GameRegistry::from_config(&ctx, &block).unwrap();
        assert!(registry.is_empty());
    }
}
