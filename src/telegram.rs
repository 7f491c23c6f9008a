//! Telegram bot wiring
//!
//! Routes inbound commands and inline-keyboard callbacks to the operator
//! store, the monitor client, and the container reporter. Every inbound
//! event is checked against the allow-list before anything else happens.
//!
//! Uses explicit Dispatcher pattern for reliable message polling.

use anyhow::Result;
use std::sync::Arc;
use teloxide::{
    dispatching::{Dispatcher, UpdateFilterExt},
    dptree,
    error_handlers::LoggingErrorHandler,
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, Update},
};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::container::{ContainerReporter, DockerRuntime};
use crate::monitor::MonitorClient;
use crate::store::OperatorStore;

const DENIED_MSG: &str = "You are not authorized to use this bot.";
const WELCOME_MSG: &str =
    "Welcome! Use the buttons below to check the node status or set the operator.";
const HELP_MSG: &str = "Commands:\n\
    /start - Show the action menu\n\
    /status - Node uptime report\n\
    /set_operator <operator_id> - Change the tracked operator\n\
    /container - Local container run time\n\
    /help - This message";
const SET_OPERATOR_HINT: &str =
    "Please send me the new operator in the following format:\n/set_operator <operator_id>";

/// Inline-keyboard actions, decoded once at the transport boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    CheckStatus,
    SetOperator,
    ContainerStatus,
}

impl CallbackAction {
    /// Encode action as callback data string
    pub fn encode(&self) -> &'static str {
        match self {
            Self::CheckStatus => "check_status",
            Self::SetOperator => "set_operator",
            Self::ContainerStatus => "container_status",
        }
    }

    /// Decode callback data string to action
    pub fn decode(data: &str) -> Option<Self> {
        match data {
            "check_status" => Some(Self::CheckStatus),
            "set_operator" => Some(Self::SetOperator),
            "container_status" => Some(Self::ContainerStatus),
            _ => None,
        }
    }
}

struct BotData {
    allowed_users: Vec<i64>,
    /// Currently tracked operator; guarded so a set and a concurrent read
    /// never interleave mid-update
    operator: Mutex<Option<String>>,
    store: OperatorStore,
    monitor: MonitorClient,
    container: ContainerReporter,
}

impl BotData {
    fn is_allowed(&self, user_id: i64) -> bool {
        self.allowed_users.contains(&user_id)
    }
}

fn main_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "Check Status",
            CallbackAction::CheckStatus.encode(),
        )],
        vec![InlineKeyboardButton::callback(
            "Set Operator",
            CallbackAction::SetOperator.encode(),
        )],
        vec![InlineKeyboardButton::callback(
            "Container Status",
            CallbackAction::ContainerStatus.encode(),
        )],
    ])
}

/// Run the bot until the dispatcher stops
pub async fn run_bot(config: Config) -> Result<()> {
    let store = OperatorStore::new(&config.operator_state_path);
    let operator = match store.load().await {
        Ok(op) => op,
        Err(e) => {
            tracing::warn!("Could not read operator state: {} (starting unset)", e);
            None
        }
    };

    tracing::info!("===========================================");
    tracing::info!("  sophonbot - Starting...");
    tracing::info!("===========================================");
    tracing::info!("Allowed users: {:?}", config.allowed_users);
    tracing::info!("Monitor URL: {}", config.monitor_base_url);
    tracing::info!("Operator state: {:?}", config.operator_state_path);
    tracing::info!("Container: {}", config.container_name);
    tracing::info!(
        "Tracked operator: {}",
        operator.as_deref().unwrap_or("<unset>")
    );

    let bot = Bot::new(config.bot_token);

    // Verify bot token by calling getMe
    tracing::info!("Verifying bot token...");
    match bot.get_me().await {
        Ok(me) => {
            tracing::info!(
                "Bot authenticated: @{} (ID: {})",
                me.username.as_deref().unwrap_or("unknown"),
                me.id
            );
        }
        Err(e) => {
            tracing::error!("Failed to authenticate bot: {}", e);
            anyhow::bail!("Bot authentication failed: {}", e);
        }
    }

    // Delete any existing webhook to ensure polling works
    tracing::info!("Clearing webhook (if any)...");
    if let Err(e) = bot.delete_webhook().await {
        tracing::warn!("Failed to delete webhook: {} (continuing anyway)", e);
    }

    let handler_data = Arc::new(BotData {
        allowed_users: config.allowed_users,
        operator: Mutex::new(operator),
        store,
        monitor: MonitorClient::new(config.monitor_base_url),
        container: ContainerReporter::new(Box::new(DockerRuntime), config.container_name),
    });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(message_handler))
        .branch(Update::filter_callback_query().endpoint(callback_handler));

    tracing::info!("Starting dispatcher with long polling...");
    tracing::info!("===========================================");
    tracing::info!("  Bot is now LIVE - send a message!");
    tracing::info!("===========================================");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![handler_data])
        .default_handler(|upd| async move {
            tracing::debug!("Unhandled update: {:?}", upd);
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "Error in update handler",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::warn!("Dispatcher stopped");
    Ok(())
}

/// Message handler endpoint for the dispatcher
async fn message_handler(bot: Bot, msg: Message, data: Arc<BotData>) -> ResponseResult<()> {
    let user_id = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or(0);
    let chat_id = msg.chat.id.0;
    let text_preview = msg
        .text()
        .unwrap_or("<non-text>")
        .chars()
        .take(50)
        .collect::<String>();

    tracing::info!(
        ">>> Message received: user={}, chat={}, text={:?}",
        user_id,
        chat_id,
        text_preview
    );

    if let Err(e) = handle_message(bot, msg, data).await {
        tracing::error!("Error handling message: {}", e);
    }

    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, data: Arc<BotData>) -> Result<()> {
    let user_id = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or(0);
    let chat_id = msg.chat.id;

    if !data.is_allowed(user_id) {
        tracing::warn!("Unauthorized user: {}", user_id);
        bot.send_message(chat_id, DENIED_MSG).await?;
        return Ok(());
    }

    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            return handle_command(&bot, chat_id, &data, text).await;
        }
        tracing::debug!("Ignoring non-command text from user {}", user_id);
    }

    Ok(())
}

async fn handle_command(bot: &Bot, chat_id: ChatId, data: &BotData, text: &str) -> Result<()> {
    let parts: Vec<&str> = text.splitn(2, ' ').collect();
    let cmd = parts[0];
    let args = parts.get(1).copied().unwrap_or("");

    match cmd {
        "/start" => {
            bot.send_message(chat_id, WELCOME_MSG)
                .reply_markup(main_menu_keyboard())
                .await?;
        }

        "/help" => {
            bot.send_message(chat_id, HELP_MSG).await?;
        }

        "/set_operator" => {
            set_operator(bot, chat_id, data, args).await?;
        }

        "/status" => {
            bot.send_chat_action(chat_id, teloxide::types::ChatAction::Typing)
                .await?;
            let operator = data.operator.lock().await.clone();
            let report = data.monitor.fetch_uptime(operator.as_deref()).await;
            bot.send_message(chat_id, report).await?;
        }

        "/container" => {
            bot.send_chat_action(chat_id, teloxide::types::ChatAction::Typing)
                .await?;
            let report = data.container.report().await;
            bot.send_message(chat_id, report).await?;
        }

        _ => {
            bot.send_message(chat_id, "Unknown command. Send /help for the list of commands.")
                .await?;
        }
    }

    Ok(())
}

async fn set_operator(bot: &Bot, chat_id: ChatId, data: &BotData, args: &str) -> Result<()> {
    let candidate = args.trim();
    if candidate.is_empty() {
        bot.send_message(chat_id, "Please provide a valid operator.")
            .await?;
        return Ok(());
    }

    // Persist first; memory only reflects values that reached disk. The lock
    // is held across the write so concurrent sets serialize.
    let outcome = {
        let mut operator = data.operator.lock().await;
        match data.store.save(candidate).await {
            Ok(()) => {
                *operator = Some(candidate.to_string());
                Ok(())
            }
            Err(e) => Err(e),
        }
    };

    match outcome {
        Ok(()) => {
            tracing::info!("Operator set to {}", candidate);
            bot.send_message(chat_id, format!("Operator set to: {}", candidate))
                .await?;
        }
        Err(e) => {
            tracing::error!("Failed to persist operator: {}", e);
            bot.send_message(chat_id, format!("Failed to save operator: {}", e))
                .await?;
        }
    }

    Ok(())
}

/// Callback query handler for inline keyboard buttons
async fn callback_handler(bot: Bot, query: CallbackQuery, data: Arc<BotData>) -> ResponseResult<()> {
    let user_id = query.from.id.0 as i64;

    if !data.is_allowed(user_id) {
        tracing::warn!("Unauthorized callback from user: {}", user_id);
        bot.answer_callback_query(&query.id)
            .text(DENIED_MSG)
            .show_alert(true)
            .await?;
        return Ok(());
    }

    let callback_data = match &query.data {
        Some(d) => d.clone(),
        None => {
            bot.answer_callback_query(&query.id).await?;
            return Ok(());
        }
    };

    let chat_id = query.message.as_ref().map(|m| m.chat().id);

    tracing::info!("Callback query: user={}, data={}", user_id, callback_data);

    match CallbackAction::decode(&callback_data) {
        Some(CallbackAction::CheckStatus) => {
            if let Some(cid) = chat_id {
                let operator = data.operator.lock().await.clone();
                let report = data.monitor.fetch_uptime(operator.as_deref()).await;
                bot.send_message(cid, report).await?;
            }
        }

        Some(CallbackAction::SetOperator) => {
            if let Some(cid) = chat_id {
                bot.send_message(cid, SET_OPERATOR_HINT).await?;
            }
        }

        Some(CallbackAction::ContainerStatus) => {
            if let Some(cid) = chat_id {
                let report = data.container.report().await;
                bot.send_message(cid, report).await?;
            }
        }

        None => {
            tracing::debug!("Unknown callback tag: {}", callback_data);
        }
    }

    // Always acknowledge so the button stops showing as pending
    bot.answer_callback_query(&query.id).await?;
    Ok(())
}
