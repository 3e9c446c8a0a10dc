use crate::{
    config::storage::{StorageConfig, ATTACHMENTS_DIR},
    error::{AppError, AppResult},
    models::{
        forum, forum_message, forum_message_attachment, forum_topic, ForumMessage,
        ForumMessageAttachment, ForumMessageAttachmentModel, ForumMessageModel,
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait,
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

/// Image types accepted as message attachments.
pub const ALLOWED_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

pub const PROHIBITED_FILE_TYPE: &str = "This file type is prohibited";

/// A file part received from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Name from the content disposition, reduced to its last path component.
    pub client_file_name: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn extension(&self) -> &str {
        file_extension(&self.client_file_name)
    }

    pub fn has_allowed_extension(&self) -> bool {
        is_allowed_extension(self.extension())
    }
}

/// Strip quotes and any directory part from a content-disposition filename.
pub fn client_file_name(raw: &str) -> &str {
    let trimmed = raw.trim().trim_matches('"').trim();
    trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
}

/// Extension including the leading dot, as received. Empty when there is none.
pub fn file_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if idx + 1 < file_name.len() => &file_name[idx..],
        _ => "",
    }
}

pub fn is_allowed_extension(extension: &str) -> bool {
    ALLOWED_EXTENSIONS
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(extension))
}

/// `<32 hex digits><extension>`, the name used both on disk and in the URL.
pub fn stored_file_name(id: Uuid, extension: &str) -> String {
    format!("{}{}", id.simple(), extension)
}

pub fn public_path(id: Uuid, extension: &str) -> String {
    format!("/{}/{}", ATTACHMENTS_DIR, stored_file_name(id, extension))
}

pub fn disk_path(storage: &StorageConfig, id: Uuid, extension: &str) -> PathBuf {
    storage
        .attachments_dir()
        .join(stored_file_name(id, extension))
}

/// The subtree whose attachments are about to disappear with a cascade delete.
#[derive(Debug, Clone, Copy)]
pub enum AttachmentScope {
    Category(Uuid),
    Forum(Uuid),
    Topic(Uuid),
    Message(Uuid),
    /// Every message written by the given user.
    Creator(Uuid),
}

/// Attachment rows below `scope`. Collected before a cascade delete so the
/// files can be removed afterwards.
pub async fn find_in_scope(
    db: &DatabaseConnection,
    scope: AttachmentScope,
) -> AppResult<Vec<ForumMessageAttachmentModel>> {
    let query = ForumMessageAttachment::find();
    let rows = match scope {
        AttachmentScope::Message(id) => {
            query
                .filter(forum_message_attachment::Column::ForumMessageId.eq(id))
                .all(db)
                .await?
        }
        AttachmentScope::Creator(id) => {
            query
                .inner_join(ForumMessage)
                .filter(forum_message::Column::CreatorId.eq(id))
                .all(db)
                .await?
        }
        AttachmentScope::Topic(id) => {
            query
                .inner_join(ForumMessage)
                .filter(forum_message::Column::ForumTopicId.eq(id))
                .all(db)
                .await?
        }
        AttachmentScope::Forum(id) => {
            query
                .inner_join(ForumMessage)
                .join(JoinType::InnerJoin, forum_message::Relation::ForumTopic.def())
                .filter(forum_topic::Column::ForumId.eq(id))
                .all(db)
                .await?
        }
        AttachmentScope::Category(id) => {
            query
                .inner_join(ForumMessage)
                .join(JoinType::InnerJoin, forum_message::Relation::ForumTopic.def())
                .join(JoinType::InnerJoin, forum_topic::Relation::Forum.def())
                .filter(forum::Column::ForumCategoryId.eq(id))
                .all(db)
                .await?
        }
    };
    Ok(rows)
}

pub struct AttachmentService {
    db: DatabaseConnection,
    storage: StorageConfig,
}

impl AttachmentService {
    pub fn new(db: DatabaseConnection, storage: StorageConfig) -> Self {
        Self { db, storage }
    }

    pub async fn list(
        &self,
        message_id: Option<Uuid>,
    ) -> AppResult<Vec<(ForumMessageAttachmentModel, Option<ForumMessageModel>)>> {
        let mut query = ForumMessageAttachment::find();
        if let Some(message_id) = message_id {
            query = query.filter(forum_message_attachment::Column::ForumMessageId.eq(message_id));
        }
        let rows = query
            .order_by_asc(forum_message_attachment::Column::CreatedAt)
            .find_also_related(ForumMessage)
            .all(&self.db)
            .await?;
        Ok(rows)
    }

    /// The attachment together with the message that owns it.
    pub async fn get_with_message(
        &self,
        id: Uuid,
    ) -> AppResult<(ForumMessageAttachmentModel, ForumMessageModel)> {
        match ForumMessageAttachment::find_by_id(id)
            .find_also_related(ForumMessage)
            .one(&self.db)
            .await?
        {
            Some((attachment, Some(message))) => Ok((attachment, message)),
            _ => Err(AppError::NotFound),
        }
    }

    /// Store a validated upload and record it against `message`.
    ///
    /// The file is written first with create-new semantics. A write failure
    /// leaves no row behind; a failed insert removes the written file.
    pub async fn create(
        &self,
        message: &ForumMessageModel,
        file_name: &str,
        upload: &UploadedFile,
    ) -> AppResult<ForumMessageAttachmentModel> {
        if !upload.has_allowed_extension() {
            return Err(AppError::Validation(PROHIBITED_FILE_TYPE.to_string()));
        }

        let id = Uuid::new_v4();
        let extension = upload.extension();

        fs::create_dir_all(self.storage.attachments_dir()).await?;
        let path = disk_path(&self.storage, id, extension);
        write_new_file(&path, &upload.data).await?;

        let new_attachment = forum_message_attachment::ActiveModel {
            id: sea_orm::ActiveValue::Set(id),
            forum_message_id: sea_orm::ActiveValue::Set(message.id),
            file_name: sea_orm::ActiveValue::Set(file_name.to_string()),
            file_path: sea_orm::ActiveValue::Set(public_path(id, extension)),
            created_at: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
        };

        match new_attachment.insert(&self.db).await {
            Ok(attachment) => {
                tracing::info!(
                    attachment_id = %attachment.id,
                    message_id = %message.id,
                    bytes = upload.data.len(),
                    "Stored attachment"
                );
                Ok(attachment)
            }
            Err(e) => {
                if let Err(cleanup) = remove_file_if_present(&path).await {
                    tracing::warn!("Failed to remove orphaned {}: {}", path.display(), cleanup);
                }
                Err(e.into())
            }
        }
    }

    pub async fn rename(
        &self,
        attachment: ForumMessageAttachmentModel,
        file_name: &str,
    ) -> AppResult<ForumMessageAttachmentModel> {
        let mut active: forum_message_attachment::ActiveModel = attachment.into();
        active.file_name = sea_orm::ActiveValue::Set(file_name.to_string());
        Ok(active.update(&self.db).await?)
    }

    /// Remove the stored file, then the row. A file that is already gone is
    /// not an error.
    pub async fn delete(&self, attachment: &ForumMessageAttachmentModel) -> AppResult<()> {
        remove_file_if_present(&self.stored_path(attachment)).await?;
        ForumMessageAttachment::delete_by_id(attachment.id)
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Best-effort cleanup after a cascade delete removed the rows.
    pub async fn remove_files(&self, attachments: &[ForumMessageAttachmentModel]) {
        for attachment in attachments {
            let path = self.stored_path(attachment);
            if let Err(e) = remove_file_if_present(&path).await {
                tracing::warn!("Failed to remove attachment file {}: {}", path.display(), e);
            }
        }
    }

    fn stored_path(&self, attachment: &ForumMessageAttachmentModel) -> PathBuf {
        disk_path(
            &self.storage,
            attachment.id,
            file_extension(&attachment.file_path),
        )
    }
}

async fn write_new_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(data).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}

async fn remove_file_if_present(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("forum_board_unit_{}", Uuid::new_v4().simple()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn extension_is_taken_from_last_dot() {
        assert_eq!(file_extension("cat.gif"), ".gif");
        assert_eq!(file_extension("archive.tar.gz"), ".gz");
        assert_eq!(file_extension("photo.PNG"), ".PNG");
        assert_eq!(file_extension("README"), "");
        assert_eq!(file_extension("trailing."), "");
    }

    #[test]
    fn allow_list_ignores_ascii_case() {
        for ok in [".jpg", ".jpeg", ".png", ".gif", ".PNG", ".Jpeg"] {
            assert!(is_allowed_extension(ok), "{ok} should be allowed");
        }
        for bad in [".exe", ".svg", ".webp", "", "png", ".png.exe"] {
            assert!(!is_allowed_extension(bad), "{bad} should be rejected");
        }
    }

    #[test]
    fn client_name_drops_quotes_and_directories() {
        assert_eq!(client_file_name("\"cat.gif\""), "cat.gif");
        assert_eq!(client_file_name("  photo.PNG "), "photo.PNG");
        assert_eq!(client_file_name("C:\\Users\\me\\cat.gif"), "cat.gif");
        assert_eq!(client_file_name("../../etc/passwd"), "passwd");
    }

    #[test]
    fn double_extension_is_judged_by_the_last_one() {
        let upload = UploadedFile {
            client_file_name: client_file_name("payload.gif.exe").to_string(),
            data: vec![],
        };
        assert!(!upload.has_allowed_extension());
    }

    #[test]
    fn paths_use_simple_hex_identifier() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            stored_file_name(id, ".gif"),
            "67e5504410b1426f9247bb680e5fe0c8.gif"
        );
        assert_eq!(
            public_path(id, ".PNG"),
            "/attachments/67e5504410b1426f9247bb680e5fe0c8.PNG"
        );
        let storage = StorageConfig::new("/srv/www");
        assert_eq!(
            disk_path(&storage, id, ".jpg"),
            PathBuf::from("/srv/www/attachments/67e5504410b1426f9247bb680e5fe0c8.jpg")
        );
    }

    #[test]
    fn public_path_extension_maps_back_to_disk_path() {
        let id = Uuid::new_v4();
        let public = public_path(id, ".jpeg");
        let storage = StorageConfig::new("/srv/www");
        assert_eq!(
            disk_path(&storage, id, file_extension(&public)),
            storage.attachments_dir().join(format!("{}.jpeg", id.simple()))
        );
    }

    #[tokio::test]
    async fn write_refuses_to_overwrite() {
        let dir = scratch_dir();
        let path = dir.join("exists.gif");
        write_new_file(&path, b"first").await.unwrap();
        let err = write_new_file(&path, b"second").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(&path).unwrap(), b"first");
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn removing_a_missing_file_is_fine() {
        let dir = scratch_dir();
        let path = dir.join("gone.png");
        remove_file_if_present(&path).await.unwrap();
        write_new_file(&path, b"x").await.unwrap();
        remove_file_if_present(&path).await.unwrap();
        assert!(!path.exists());
        std::fs::remove_dir_all(dir).unwrap();
    }
}
