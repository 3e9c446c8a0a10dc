pub mod forum;
pub mod forum_category;
pub mod forum_message;
pub mod forum_message_attachment;
pub mod forum_topic;
pub mod user;

pub use forum::{Entity as Forum, Model as ForumModel};
pub use forum_category::{Entity as ForumCategory, Model as ForumCategoryModel};
pub use forum_message::{Entity as ForumMessage, Model as ForumMessageModel};
pub use forum_message_attachment::{
    Entity as ForumMessageAttachment, Model as ForumMessageAttachmentModel,
};
pub use forum_topic::{Entity as ForumTopic, Model as ForumTopicModel};
pub use user::{Entity as User, Model as UserModel, Role};
