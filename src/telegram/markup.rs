//! Captions, inline keyboards, and inline-query result builders.

use crate::core::config;
use crate::resolver::SongRecord;
use teloxide::types::{
    FileId, InlineKeyboardButton, InlineKeyboardMarkup, InlineQueryResult, InlineQueryResultArticle,
    InlineQueryResultCachedAudio, InputMessageContent, InputMessageContentText, LinkPreviewOptions, ParseMode,
};

/// Callback tokens for the status buttons. Fixed strings instead of raw
/// URLs: callback data is capped at 64 bytes by Telegram.
pub const CB_DOWNLOADING: &str = "dl:wait";
pub const CB_FAILED: &str = "dl:err";
pub const CB_DONE: &str = "dl:ok";

/// HTML caption shared by every delivery path:
/// `artist - title`, the platform link row, and the bot handle.
pub fn song_caption(song: &SongRecord, bot_username: Option<&str>) -> String {
    let links = song
        .platform_urls
        .iter()
        .map(|(platform, url)| format!("<a href='{}'>{}</a>", url, platform.as_str()))
        .collect::<Vec<_>>()
        .join(" | ");

    let mut caption = format!(
        "<code>{} - {}</code>\n\n🎸 {} 🎸",
        escape_html(&song.artist_name),
        escape_html(&song.title),
        links
    );
    if let Some(username) = bot_username {
        caption.push_str(&format!("\n\n@{}", username));
    }
    caption
}

pub fn downloading_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "⏳ Downloading...",
        CB_DOWNLOADING,
    )]])
}

pub fn failed_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback("❌ Download failed", CB_FAILED)]])
}

pub fn done_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "✅ Downloaded successfully!",
        CB_DONE,
    )]])
}

/// Inline result for a downloadable track: a placeholder audio that the
/// chosen-result job later edits into the real file. The result id is the
/// canonical URL, which is what the chosen-result handler re-resolves.
pub fn audio_result(song: &SongRecord, caption: &str) -> InlineQueryResult {
    InlineQueryResult::CachedAudio(
        InlineQueryResultCachedAudio::new(song.canonical_url.clone(), FileId(config::LOADING_AUDIO_ID.clone()))
            .caption(caption.to_string())
            .parse_mode(ParseMode::Html)
            .reply_markup(downloading_keyboard()),
    )
}

/// Inline result for share-only content (albums, tracks with no source,
/// free-text previews): an article that expands into the link message.
pub fn article_result(song: &SongRecord, caption: &str) -> InlineQueryResult {
    let preview = LinkPreviewOptions {
        is_disabled: false,
        url: song.thumbnail_url.as_ref().and_then(|u| u.parse().ok()),
        prefer_small_media: false,
        prefer_large_media: true,
        show_above_text: true,
    };
    let content = InputMessageContentText::new(caption.to_string())
        .parse_mode(ParseMode::Html)
        .link_preview_options(preview);

    let mut article = InlineQueryResultArticle::new(
        song.canonical_url.clone(),
        song.title.clone(),
        InputMessageContent::Text(content),
    )
    .description(format!("by {}", song.artist_name));
    if let Some(thumb) = song.thumbnail_url.as_ref().and_then(|u| u.parse().ok()) {
        article = article.thumbnail_url(thumb);
    }

    InlineQueryResult::Article(article)
}

/// Article shown when a URL does not resolve to any music links.
pub fn not_found_result(query: &str) -> InlineQueryResult {
    let preview = LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    };
    let content =
        InputMessageContentText::new(format!("Tried to share music link: {}", query)).link_preview_options(preview);

    InlineQueryResult::Article(InlineQueryResultArticle::new(
        "1",
        "Can't find music links...",
        InputMessageContent::Text(content),
    ))
}

/// Article shown for an empty inline query.
pub fn usage_hint_result(bot_username: Option<&str>) -> InlineQueryResult {
    let handle = bot_username.unwrap_or("bot");
    let content = InputMessageContentText::new(format!("@{} - share music via any links", handle));

    InlineQueryResult::Article(InlineQueryResultArticle::new(
        "0",
        "Paste song url or search query in the message field...",
        InputMessageContent::Text(content),
    ))
}

/// Minimal HTML escaping for text interpolated into captions.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
