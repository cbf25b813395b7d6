use std::path::Path;

use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::FileId;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::llm::TransientFile;
use crate::relay::RelayError;

/// Picks the image attached to `message`: the largest photo size, or a
/// document whose MIME type is `image/*`.
pub fn image_file_id(message: &Message) -> Option<FileId> {
    if let Some(photo) = message.photo().and_then(|sizes| sizes.last()) {
        return Some(photo.file.id.clone());
    }

    message
        .document()
        .filter(|document| {
            document
                .mime_type
                .as_ref()
                .is_some_and(|mime| mime.essence_str().starts_with("image/"))
        })
        .map(|document| document.file.id.clone())
}

/// Downloads the image of the replied-to message into `dir`. A missing reply
/// or a reply without an image is a usage error.
pub async fn download_reply_image(
    bot: &Bot,
    message: &Message,
    dir: &Path,
    usage: &str,
) -> Result<TransientFile, RelayError> {
    let file_id = message
        .reply_to_message()
        .and_then(image_file_id)
        .ok_or_else(|| RelayError::Usage(usage.to_string()))?;

    let file = bot
        .get_file(file_id)
        .await
        .map_err(|err| RelayError::Image(format!("failed to look up file: {err}")))?;

    let transient = TransientFile::create_in(dir, "tg-image-")
        .map_err(|err| RelayError::Image(format!("failed to create download file: {err}")))?;
    let mut destination = tokio::fs::File::create(transient.path())
        .await
        .map_err(|err| RelayError::Image(format!("failed to open download file: {err}")))?;
    bot.download_file(&file.path, &mut destination)
        .await
        .map_err(|err| RelayError::Image(format!("failed to download file: {err}")))?;
    destination
        .flush()
        .await
        .map_err(|err| RelayError::Image(format!("failed to write download file: {err}")))?;

    debug!(
        "Downloaded {} ({} bytes) to {}",
        file.path,
        file.size,
        transient.path().display()
    );
    Ok(transient)
}
