//! Business logic services.

pub mod comment_cache;
pub mod commenter_name;
pub mod content;
pub mod dispatch;
pub mod email;
pub mod push;
pub mod ranking;

pub use comment_cache::CommentCache;
pub use commenter_name::{commenter_name, CommenterNameAllocator, AUTHOR_NAME};
pub use content::{ContentService, CreateCommentInput};
pub use dispatch::{
    EmailKind, EmailPayload, NoOpTaskDispatcher, PushNotificationPayload, TaskDispatcher,
};
pub use email::{EmailService, LogMailSender, MailSender, RenderedEmail, SmtpMailSender};
pub use push::{
    HttpPushDispatcher, NoOpPushDispatcher, PushDispatcher, PushNotificationService, PushRecord,
};
pub use ranking::{ColdStart, RankingCache};
