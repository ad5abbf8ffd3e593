//! Database entities.

#![allow(missing_docs)]

pub mod attention;
pub mod comment;
pub mod post;
pub mod post_commenter;
pub mod push_message;
pub mod push_settings;

pub use attention::Entity as Attention;
pub use comment::Entity as Comment;
pub use post::Entity as Post;
pub use post_commenter::Entity as PostCommenter;
pub use push_message::Entity as PushMessage;
pub use push_settings::Entity as PushSettings;
