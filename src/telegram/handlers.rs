//! Dispatcher schema and handler chain builders.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{ChatKind, ChosenInlineResult, InlineQuery, LinkPreviewOptions, Message, ParseMode};

use crate::core::config;
use crate::download::fetcher::YtDlpFetcher;
use crate::download::orchestrator::{DownloadJob, DownloadOrchestrator, UiTarget};
use crate::resolver::{SongLookup, SongRecord, SongResolver};
use crate::storage::db::DbPool;
use crate::storage::stats;
use crate::telegram::bot::Command;
use crate::telegram::markup;
use crate::telegram::sink::TelegramSink;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Production orchestrator wiring.
pub type Orchestrator = DownloadOrchestrator<YtDlpFetcher, TelegramSink, SongResolver>;

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s]+").expect("Failed to compile URL regex"));

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<DbPool>,
    pub resolver: Arc<SongResolver>,
    pub orchestrator: Arc<Orchestrator>,
    pub bot_username: Option<String>,
}

/// Creates the main dispatcher schema for the bot.
///
/// The same schema is used in production and in integration tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_messages = deps.clone();
    let deps_inline = deps.clone();
    let deps_chosen = deps.clone();

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(message_handler(deps_messages))
        .branch(inline_query_handler(deps_inline))
        .branch(chosen_result_handler(deps_chosen))
        .branch(callback_handler())
}

/// Handler for bot commands (/start).
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command: {:?} from chat {}", cmd, msg.chat.id);
                match cmd {
                    Command::Start => {
                        let user_id = msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok()).unwrap_or(0);
                        stats::record_action(&deps.db_pool, user_id, "start", None);
                        send_tutorial(&bot, msg.chat.id, deps.bot_username.as_deref()).await?;
                    }
                }
                Ok(())
            }
        },
    ))
}

async fn send_tutorial(bot: &Bot, chat_id: ChatId, bot_username: Option<&str>) -> Result<(), teloxide::RequestError> {
    let handle = bot_username.unwrap_or("bot");
    let tutorial = format!(
        "👋 Hello! Here's how to use me in inline mode:\n\
         1️⃣ Type the bot's username in any chat, followed by a space.\n\
         2️⃣ Paste the URL of the song you want to share. For example: \
         <code>@{handle} https://www.youtube.com/watch?v=P_bPsPp_f1k</code>\n\
         3️⃣ You'll see a preview of the song information. Tap on it to send it to your chat.\n\n\
         You can also just send me a song link here and I'll fetch the audio.\n\n\
         🚀 Try it out now!"
    );
    bot.send_message(chat_id, tutorial).parse_mode(ParseMode::Html).await?;
    Ok(())
}

/// Handler for private messages carrying song URLs.
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| matches!(msg.chat.kind, ChatKind::Private(_)) && msg.text().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let text = msg.text().unwrap_or_default();

                if let Some(url) = URL_RE.find(text).map(|m| m.as_str().to_string()) {
                    handle_music_url(&bot, &msg, &deps, &url).await?;
                } else if !text.starts_with('/') {
                    bot.send_message(msg.chat.id, "Send me a song link, or use me inline to share music.")
                        .await?;
                }
                Ok(())
            }
        })
}

/// Resolves a shared URL and either starts a download or replies with the
/// platform-links card. Albums and sourceless tracks never enter the
/// download path.
async fn handle_music_url(bot: &Bot, msg: &Message, deps: &HandlerDeps, url: &str) -> Result<(), HandlerError> {
    let user_id = msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok()).unwrap_or(0);
    stats::record_action(&deps.db_pool, user_id, "share", Some(url));

    let Some(song) = deps.resolver.resolve_by_url(url).await else {
        bot.send_message(msg.chat.id, "Can't find music links for this URL...").await?;
        return Ok(());
    };

    if song.is_downloadable() {
        let status = bot
            .send_message(msg.chat.id, "⏳ Downloading the track...")
            .reply_markup(markup::downloading_keyboard())
            .await?;

        Arc::clone(&deps.orchestrator).begin(DownloadJob {
            canonical_url: song.canonical_url.clone(),
            source_url: song.download_source().map(str::to_string),
            target: UiTarget::Chat {
                chat_id: msg.chat.id.0,
                message_id: status.id.0,
            },
            requester_id: user_id,
        });
    } else {
        send_link_card(bot, msg.chat.id, &song, deps.bot_username.as_deref()).await?;
    }
    Ok(())
}

/// Share-only reply: the caption card with platform links, no audio.
async fn send_link_card(
    bot: &Bot,
    chat_id: ChatId,
    song: &SongRecord,
    bot_username: Option<&str>,
) -> Result<(), teloxide::RequestError> {
    let preview = LinkPreviewOptions {
        is_disabled: false,
        url: song.thumbnail_url.as_ref().and_then(|u| u.parse().ok()),
        prefer_small_media: false,
        prefer_large_media: true,
        show_above_text: true,
    };
    bot.send_message(chat_id, markup::song_caption(song, bot_username))
        .parse_mode(ParseMode::Html)
        .link_preview_options(preview)
        .await?;
    Ok(())
}

/// Handler for inline queries: URL resolution or free-text search.
fn inline_query_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_inline_query().endpoint(move |bot: Bot, q: InlineQuery| {
        let deps = deps.clone();
        async move {
            let query = q.query.trim().to_string();

            let results = if query.is_empty() {
                vec![markup::usage_hint_result(deps.bot_username.as_deref())]
            } else if URL_RE.is_match(&query) {
                match deps.resolver.resolve_by_url(&query).await {
                    Some(song) => {
                        let caption = markup::song_caption(&song, deps.bot_username.as_deref());
                        if song.is_downloadable() {
                            vec![markup::audio_result(&song, &caption)]
                        } else {
                            vec![markup::article_result(&song, &caption)]
                        }
                    }
                    None => vec![markup::not_found_result(&query)],
                }
            } else {
                search_results(&deps, &query).await
            };

            if let Err(e) = bot.answer_inline_query(q.id, results).await {
                log::warn!("Failed to answer inline query: {}", e);
            }
            Ok(())
        }
    })
}

/// Free-text inline search: Spotify hits, each re-resolved through Odesli
/// so the preview carries the full platform link set.
async fn search_results(deps: &HandlerDeps, query: &str) -> Vec<teloxide::types::InlineQueryResult> {
    let mut results = Vec::new();
    for hit in deps.resolver.search(query, config::search::INLINE_RESULT_LIMIT).await {
        if let Some(song) = deps.resolver.resolve_by_url(&hit.url).await {
            let caption = markup::song_caption(&song, deps.bot_username.as_deref());
            results.push(markup::article_result(&song, &caption));
        }
    }
    results
}

/// Handler for chosen inline results: this is where a download actually
/// starts. Only audio results carry a keyboard, so only they come back
/// with an `inline_message_id`.
fn chosen_result_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_chosen_inline_result().endpoint(move |chosen: ChosenInlineResult| {
        let deps = deps.clone();
        async move {
            let Some(inline_message_id) = chosen.inline_message_id.clone() else {
                return Ok(());
            };
            let requester_id = i64::try_from(chosen.from.id.0).unwrap_or(0);
            stats::record_action(&deps.db_pool, requester_id, "inline_download", Some(&chosen.result_id));

            let Some(song) = deps.resolver.resolve_by_url(&chosen.result_id).await else {
                log::warn!("Chosen result no longer resolves: {}", chosen.result_id);
                return Ok(());
            };
            if !song.is_downloadable() {
                return Ok(());
            }

            Arc::clone(&deps.orchestrator).begin(DownloadJob {
                canonical_url: song.canonical_url.clone(),
                source_url: song.download_source().map(str::to_string),
                target: UiTarget::Inline { inline_message_id },
                requester_id,
            });
            Ok(())
        }
    })
}

/// Handler for status-button presses: informational alerts only.
fn callback_handler() -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| async move {
        let answer = match q.data.as_deref() {
            Some(markup::CB_FAILED) => bot
                .answer_callback_query(q.id)
                .text("There was an error downloading the track. It might be too long or unavailable.")
                .show_alert(true),
            Some(markup::CB_DONE) => bot.answer_callback_query(q.id).text("The track is ready."),
            _ => bot
                .answer_callback_query(q.id)
                .text("Downloading the track, please wait...")
                .show_alert(true),
        };
        if let Err(e) = answer.await {
            log::warn!("Failed to answer callback query: {}", e);
        }
        Ok(())
    })
}
