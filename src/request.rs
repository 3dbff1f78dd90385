//! Message admission and reply assembly
//!
//! Decides whether an incoming chat message becomes a hat request, and
//! turns a finished request back into something to post.

use hatbot_core::{ChannelId, UserId};
use hatbot_cv::traits::ChannelPolicyStore;
use hatbot_cv::{HatRequest, PipelineConfig, RequestOutcome, SourceImage, StoreError};
use log::debug;

pub const REPLY_TEXT: &str = "I put hats on those animals for you 🙂";

/// A file attached to a chat message, already downloaded.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// The parts of a chat message the bot looks at.
#[derive(Debug, Clone)]
pub struct Message {
    pub author: UserId,
    pub author_is_bot: bool,
    pub channel: ChannelId,
    pub attachments: Vec<Attachment>,
}

/// Turn a message into a hat request, or `None` if it should be ignored.
///
/// Bots and messages without attachments are dropped before the channel
/// policy is consulted.
pub async fn admit<C: ChannelPolicyStore>(
    message: Message,
    channels: &C,
    config: &PipelineConfig,
) -> Result<Option<HatRequest>, StoreError> {
    if message.author_is_bot || message.attachments.is_empty() {
        return Ok(None);
    }
    if !channels.is_enabled(&message.channel).await? {
        debug!("Channel {} is not enabled", message.channel);
        return Ok(None);
    }

    let images: Vec<SourceImage> = message
        .attachments
        .into_iter()
        .filter(|a| config.accepts_attachment(&a.filename))
        .map(|a| SourceImage::new(a.filename, a.bytes))
        .collect();
    if images.is_empty() {
        return Ok(None);
    }

    Ok(Some(HatRequest {
        user: message.author,
        images,
    }))
}

#[derive(Debug, Clone)]
pub struct ReplyFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// What gets posted back to the channel.
#[derive(Debug, Clone)]
pub struct Reply {
    pub channel: ChannelId,
    pub content: String,
    pub files: Vec<ReplyFile>,
}

impl Reply {
    /// Build the reply for a finished request; `None` if nothing was composited.
    pub fn from_outcome(
        channel: ChannelId,
        outcome: RequestOutcome,
        config: &PipelineConfig,
    ) -> Option<Self> {
        let content = format!("{} {}", outcome.user.mention(), REPLY_TEXT);
        let files: Vec<ReplyFile> = outcome
            .into_composites()
            .into_iter()
            .map(|image| ReplyFile {
                name: config.output_file_name(),
                bytes: image.bytes,
            })
            .collect();

        if files.is_empty() {
            None
        } else {
            Some(Self {
                channel,
                content,
                files,
            })
        }
    }
}
