//! Database repositories.

mod attention;
mod comment;
mod post;
mod post_commenter;
mod push_message;
mod push_settings;

pub use attention::AttentionRepository;
pub use comment::CommentRepository;
pub use post::{HOT_SCORE_SQL, PostRepository};
pub use post_commenter::PostCommenterRepository;
pub use push_message::PushMessageRepository;
pub use push_settings::PushSettingsRepository;
