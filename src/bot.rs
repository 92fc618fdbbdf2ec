//! Module dispatch host: the lifecycle-hook contract between the chat
//! transport and the feature modules, plus the explicit registration table.

use std::sync::Arc;

use anyhow::Context;
use futures::future::BoxFuture;
use tracing::{error, info};

use crate::{access::AccessPolicy, config::BotConfig, registry, transport::ChatSink};

/// Shared wiring handed to every module constructor.
pub struct ModuleContext {
    /// The bot's own identity, used to filter self-triggered events.
    pub nick: String,
    /// Command prefix character used by the host.
    pub prefix: char,
    /// Outbound messaging collaborator.
    pub sink: Arc<dyn ChatSink>,
    /// Control-access predicate injected into game instances.
    pub access: Arc<dyn AccessPolicy>,
}

/// Lifecycle hooks a feature module may implement.
///
/// Every hook has a default no-op body: a module that does not care about an
/// event simply leaves the default, and the host treats that as success.
pub trait Module: Send + Sync {
    /// Name of the module, matching its configuration key.
    fn name(&self) -> &'static str;

    /// Invoked once the bot is connected to the network.
    fn on_connect(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Invoked for every message the bot receives, private or in channel.
    fn on_message<'a>(
        &'a self,
        _sender: &'a str,
        _text: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Invoked for every channel message the bot receives.
    fn on_channel_message<'a>(
        &'a self,
        _channel: &'a str,
        _sender: &'a str,
        _text: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Constructor signature for a module: its configuration block in, a ready
/// module out.
pub type ModuleCtor = fn(&ModuleContext, &serde_json::Value) -> anyhow::Result<Box<dyn Module>>;

/// Registration table mapping configuration keys to module constructors.
///
/// Built once at compile time and consulted once at startup; configuration
/// keys with no entry here are a startup error.
const BUILTIN_MODULES: &[(&str, ModuleCtor)] = &[("Quiz", registry::build_module)];

/// The bot host: owns the configured modules and fans events out to them.
pub struct Bot {
    modules: Vec<Box<dyn Module>>,
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("modules", &self.modules.len())
            .finish()
    }
}

impl Bot {
    /// Build every configured module from the registration table.
    pub fn from_config(
        config: &BotConfig,
        sink: Arc<dyn ChatSink>,
        access: Arc<dyn AccessPolicy>,
    ) -> anyhow::Result<Self> {
        let ctx = ModuleContext {
            nick: config.connection.nick.clone(),
            prefix: config.command_prefix,
            sink,
            access,
        };

        let mut modules = Vec::with_capacity(config.modules.len());
        for (name, block) in &config.modules {
            let ctor = BUILTIN_MODULES
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, ctor)| *ctor)
                .with_context(|| format!("unknown module `{name}` in configuration"))?;
            let module = ctor(&ctx, block).with_context(|| format!("initialising module `{name}`"))?;
            info!(module = %name, "module registered");
            modules.push(module);
        }

        Ok(Self { modules })
    }

    /// Fan out the connect event.
    pub async fn on_connect(&self) {
        for module in &self.modules {
            if let Err(err) = module.on_connect().await {
                error!(module = module.name(), error = %err, "connect hook failed");
            }
        }
    }

    /// Fan out a message (private or in channel).
    pub async fn on_message(&self, sender: &str, text: &str) {
        for module in &self.modules {
            if let Err(err) = module.on_message(sender, text).await {
                error!(module = module.name(), error = %err, "message hook failed");
            }
        }
    }

    /// Fan out a channel message. A failing module aborts only its own
    /// in-flight handler; the other modules still see the event.
    pub async fn on_channel_message(&self, channel: &str, sender: &str, text: &str) {
        for module in &self.modules {
            if let Err(err) = module.on_channel_message(channel, sender, text).await {
                error!(
                    module = module.name(),
                    channel,
                    error = %err,
                    "channel message hook failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::access::AllowAll;
    use crate::transport::TransportResult;

    struct NullSink;

    impl ChatSink for NullSink {
        fn message<'a>(
            &'a self,
            _channel: &'a str,
            _text: &'a str,
        ) -> BoxFuture<'a, TransportResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn build(config_json: &str) -> anyhow::Result<Bot> {
        let config: BotConfig = serde_json::from_str(config_json).unwrap();
        Bot::from_config(&config, Arc::new(NullSink), Arc::new(AllowAll))
    }

    #[tokio::test]
    async fn builds_the_quiz_module_from_the_table() {
        let bot = build(r#"{"modules": {"Quiz": {"Games": {}}}}"#).unwrap();
        assert_eq!(bot.modules.len(), 1);
        assert_eq!(bot.modules[0].name(), "Quiz");
    }

    #[tokio::test]
    async fn unknown_module_keys_fail_at_startup() {
        let err = build(r#"{"modules": {"Dice": {}}}"#).unwrap_err();
        assert!(err.to_string().contains("unknown module `Dice`"));
    }

    #[tokio::test]
    async fn default_hooks_are_noops() {
        struct Inert;
        impl Module for Inert {
            fn name(&self) -> &'static str {
                "Inert"
            }
        }

        let bot = Bot {
            modules: vec![Box::new(Inert)],
        };
        bot.on_connect().await;
        bot.on_message("alice", "hello").await;
        bot.on_channel_message("#quiz", "alice", "hello").await;
    }
}
