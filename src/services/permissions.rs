//! Who may change what.
//!
//! Topics and messages may be edited or deleted by their creator or by an
//! administrator. Anonymous requests may change nothing. Callers turn a
//! `false` into a not-found response, never a forbidden one.

use crate::middleware::auth::AuthUser;
use crate::models::{ForumMessageModel, ForumTopicModel};
use uuid::Uuid;

pub struct UserPermissions;

impl UserPermissions {
    pub fn can_edit_forum_topic(actor: Option<&AuthUser>, topic: &ForumTopicModel) -> bool {
        Self::is_creator_or_admin(actor, topic.creator_id)
    }

    pub fn can_edit_forum_message(actor: Option<&AuthUser>, message: &ForumMessageModel) -> bool {
        Self::is_creator_or_admin(actor, message.creator_id)
    }

    fn is_creator_or_admin(actor: Option<&AuthUser>, creator_id: Uuid) -> bool {
        match actor {
            Some(actor) => actor.is_admin() || actor.user_id == creator_id,
            None => false,
        }
    }
}
