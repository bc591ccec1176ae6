//! Telegram implementation of the orchestrator's `MediaSink` boundary.

use crate::core::error::{AppError, AppResult};
use crate::download::fetcher::FetchedAudio;
use crate::download::orchestrator::{DownloadJob, MediaSink, UiTarget};
use crate::resolver::SongRecord;
use crate::telegram::markup;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile, InputMedia, InputMediaAudio, MessageId, ParseMode};

/// Sends and edits the actual Telegram messages on behalf of download jobs.
///
/// Inline jobs upload through the requester's private chat (Telegram only
/// hands out a `file_id` for a sent message), then edit the inline message
/// in place. Chat jobs upload straight into the chat and flip the status
/// message's keyboard.
pub struct TelegramSink {
    bot: Bot,
    bot_username: Option<String>,
}

impl TelegramSink {
    pub fn new(bot: Bot, bot_username: Option<String>) -> Self {
        Self { bot, bot_username }
    }

    fn caption(&self, song: Option<&SongRecord>) -> Option<String> {
        song.map(|s| markup::song_caption(s, self.bot_username.as_deref()))
    }

    /// Replaces the inline placeholder audio with the cached one.
    async fn edit_inline_audio(&self, inline_message_id: &str, file_id: &str, song: Option<&SongRecord>) -> AppResult<()> {
        let mut media = InputMediaAudio::new(InputFile::file_id(FileId(file_id.to_string())));
        if let Some(caption) = self.caption(song) {
            media = media.caption(caption).parse_mode(ParseMode::Html);
        }
        self.bot
            .edit_message_media_inline(inline_message_id.to_string(), InputMedia::Audio(media))
            .await?;
        Ok(())
    }

    async fn send_cached_audio(&self, chat_id: i64, file_id: &str, song: Option<&SongRecord>) -> AppResult<()> {
        let mut request = self
            .bot
            .send_audio(ChatId(chat_id), InputFile::file_id(FileId(file_id.to_string())));
        if let Some(caption) = self.caption(song) {
            request = request.caption(caption).parse_mode(ParseMode::Html);
        }
        request.await?;
        Ok(())
    }

    async fn set_chat_markup(
        &self,
        chat_id: i64,
        message_id: i32,
        keyboard: teloxide::types::InlineKeyboardMarkup,
    ) -> AppResult<()> {
        self.bot
            .edit_message_reply_markup(ChatId(chat_id), MessageId(message_id))
            .reply_markup(keyboard)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MediaSink for TelegramSink {
    async fn deliver_cached(&self, job: &DownloadJob, file_id: &str, song: Option<&SongRecord>) -> AppResult<()> {
        match &job.target {
            UiTarget::Inline { inline_message_id } => self.edit_inline_audio(inline_message_id, file_id, song).await,
            UiTarget::Chat { chat_id, message_id } => {
                self.send_cached_audio(*chat_id, file_id, song).await?;
                self.set_chat_markup(*chat_id, *message_id, markup::done_keyboard()).await
            }
        }
    }

    async fn upload(&self, job: &DownloadJob, audio: &FetchedAudio, song: Option<&SongRecord>) -> AppResult<String> {
        // Inline targets upload via the requester's private chat; chat
        // targets get the audio in the chat itself, caption included.
        let (chat_id, with_caption) = match &job.target {
            UiTarget::Inline { .. } => (job.requester_id, false),
            UiTarget::Chat { chat_id, .. } => (*chat_id, true),
        };

        let mut request = self
            .bot
            .send_audio(ChatId(chat_id), InputFile::file(audio.path.clone()))
            .duration(audio.duration_secs)
            .performer(audio.performer.clone())
            .title(audio.title.clone());
        if let Some(thumb) = audio.thumbnail_url.as_ref().and_then(|u| u.parse().ok()) {
            request = request.thumbnail(InputFile::url(thumb));
        }
        if with_caption {
            if let Some(caption) = self.caption(song) {
                request = request.caption(caption).parse_mode(ParseMode::Html);
            }
        }

        let message = request.await?;
        message
            .audio()
            .map(|a| a.file.id.0.clone())
            .ok_or_else(|| AppError::Other("sent audio message carries no audio payload".to_string()))
    }

    async fn finish(&self, job: &DownloadJob, file_id: &str, song: Option<&SongRecord>) -> AppResult<()> {
        match &job.target {
            UiTarget::Inline { inline_message_id } => self.edit_inline_audio(inline_message_id, file_id, song).await,
            // The chat already received the audio during upload.
            UiTarget::Chat { chat_id, message_id } => {
                self.set_chat_markup(*chat_id, *message_id, markup::done_keyboard()).await
            }
        }
    }

    async fn fail(&self, job: &DownloadJob, reason: &str) -> AppResult<()> {
        let diagnostic = format!(
            "❌ Failed to download the track.\n\n<code>{}</code>",
            markup::escape_html(reason)
        );
        // Inline failures go to the requester's private chat; chat
        // failures land in the chat that asked.
        let notify_chat = match &job.target {
            UiTarget::Inline { .. } => job.requester_id,
            UiTarget::Chat { chat_id, .. } => *chat_id,
        };
        self.bot
            .send_message(ChatId(notify_chat), diagnostic)
            .parse_mode(ParseMode::Html)
            .await?;

        match &job.target {
            UiTarget::Inline { inline_message_id } => {
                self.bot
                    .edit_message_reply_markup_inline(inline_message_id.to_string())
                    .reply_markup(markup::failed_keyboard())
                    .await?;
                Ok(())
            }
            UiTarget::Chat { chat_id, message_id } => {
                self.set_chat_markup(*chat_id, *message_id, markup::failed_keyboard()).await
            }
        }
    }
}
