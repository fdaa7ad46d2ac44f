//! Uploads - Salvataggio su disco degli allegati di chat
//!
//! Gli allegati di chat vivono in una sottodirectory dedicata (`<upload_dir>/chat`) con nomi
//! `chat_<millis>-<uuid>.<ext>`, separati dai file di progetto.

use crate::core::AppError;
use crate::dtos::StoredAttachment;
use axum::body::Bytes;
use axum::extract::multipart::Field;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Dimensione massima di un allegato di chat
pub const MAX_CHAT_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

const CHAT_SUBDIR: &str = "chat";
const CHAT_PREFIX: &str = "chat_";

/// File ricevuto in una richiesta multipart, non ancora salvato
#[derive(Debug, Clone)]
pub struct PendingAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl PendingAttachment {
    /// Legge un campo file rifiutando con 413 appena supera `limit` byte
    pub async fn read_field(mut field: Field<'_>, limit: usize) -> Result<Self, AppError> {
        let file_name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| AppError::bad_request("Attachment must have a file name"))?;
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let mut buffer: Vec<u8> = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            if buffer.len() + chunk.len() > limit {
                warn!(file_name = %file_name, limit, "Attachment exceeds size limit");
                return Err(AppError::payload_too_large("Attachment too large").with_details(
                    format!("Attachments are limited to {} bytes", limit),
                ));
            }
            buffer.extend_from_slice(&chunk);
        }

        Ok(Self {
            file_name,
            content_type,
            bytes: Bytes::from(buffer),
        })
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn chat_dir(&self) -> PathBuf {
        self.root.join(CHAT_SUBDIR)
    }

    /// Scrive l'allegato nella directory di chat e ritorna i metadati da salvare nel messaggio
    #[instrument(skip(self, attachment), fields(file_name = %attachment.file_name, size = attachment.size()))]
    pub async fn store_chat_attachment(
        &self,
        attachment: &PendingAttachment,
    ) -> Result<StoredAttachment, AppError> {
        if attachment.size() > MAX_CHAT_ATTACHMENT_BYTES {
            return Err(AppError::payload_too_large("Attachment too large"));
        }

        let dir = self.chat_dir();
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(chat_file_name(&attachment.file_name));
        tokio::fs::write(&path, &attachment.bytes).await?;
        info!(path = %path.display(), "Chat attachment stored");

        Ok(StoredAttachment {
            path: path.to_string_lossy().into_owned(),
            original_name: attachment.file_name.clone(),
            mime_type: attachment.content_type.clone(),
            size: attachment.size() as i64,
        })
    }

    /// Rimuove un allegato già scritto (es. quando l'inserimento del messaggio fallisce)
    pub async fn discard(&self, stored: &StoredAttachment) {
        if let Err(e) = tokio::fs::remove_file(&stored.path).await {
            warn!(path = %stored.path, "Failed to remove orphan attachment: {:?}", e);
        } else {
            debug!(path = %stored.path, "Orphan attachment removed");
        }
    }
}

/// `chat_<millis>-<uuid>.<ext>`, l'estensione viene dal nome originale
fn chat_file_name(original_name: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "bin".to_string());

    format!(
        "{}{}-{}.{}",
        CHAT_PREFIX,
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        extension
    )
}
