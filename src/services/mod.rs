pub mod admin;
pub mod attachment;
pub mod auth;
pub mod bootstrap_admin;
pub mod category;
pub mod forum;
pub mod message;
pub mod permissions;
pub mod topic;

pub use permissions::UserPermissions;
