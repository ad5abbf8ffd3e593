//! Wire format of queued tasks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// Kinds of task the worker knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    /// Render and send an email.
    EmailSend,
    /// Fan out push notifications for a new comment.
    PushNotification,
}

impl TaskType {
    /// Name used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmailSend => "email:send",
            Self::PushNotification => "notification:push",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email:send" => Ok(Self::EmailSend),
            "notification:push" => Ok(Self::PushNotification),
            other => Err(QueueError::UnknownTaskType(other.to_string())),
        }
    }
}

/// A queued task.
///
/// The type is kept as a string on the wire so that a task written by a
/// newer producer still decodes and is reported as an unknown type rather
/// than as garbage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task type name.
    #[serde(rename = "type")]
    pub task_type: String,

    /// Type-specific payload, usually JSON. Base64 on the wire.
    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,

    /// Makes otherwise identical delayed tasks distinct set members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl Task {
    /// Create a new task.
    #[must_use]
    pub fn new(task_type: TaskType, payload: Vec<u8>) -> Self {
        Self {
            task_type: task_type.as_str().to_string(),
            payload,
            nonce: None,
        }
    }

    /// Attach a fresh nonce.
    #[must_use]
    pub fn with_nonce(mut self) -> Self {
        self.nonce = Some(ulid::Ulid::new().to_string());
        self
    }

    /// Resolve the task type.
    pub fn kind(&self) -> Result<TaskType, QueueError> {
        self.task_type.parse()
    }

    /// Serialize for the queue.
    pub fn encode(&self) -> Result<Vec<u8>, QueueError> {
        serde_json::to_vec(self).map_err(QueueError::Decode)
    }

    /// Parse bytes popped from the queue.
    pub fn decode(bytes: &[u8]) -> Result<Self, QueueError> {
        serde_json::from_slice(bytes).map_err(QueueError::Decode)
    }
}

mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64.decode(encoded).map_err(de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(TaskType::EmailSend.to_string(), "email:send");
        assert_eq!(
            "notification:push".parse::<TaskType>().unwrap(),
            TaskType::PushNotification
        );
        assert!(matches!(
            "sms:send".parse::<TaskType>(),
            Err(QueueError::UnknownTaskType(name)) if name == "sms:send"
        ));
    }

    #[test]
    fn test_envelope_keeps_payload_bytes() {
        let payload = br#"{"post_id":1}"#.to_vec();
        let task = Task::new(TaskType::PushNotification, payload.clone());

        let decoded = Task::decode(&task.encode().unwrap()).unwrap();
        assert_eq!(decoded.kind().unwrap(), TaskType::PushNotification);
        assert_eq!(decoded.payload, payload);
        assert_eq!(decoded.nonce, None);
    }

    #[test]
    fn test_payload_is_a_string_on_the_wire() {
        let task = Task::new(TaskType::EmailSend, b"{}".to_vec());
        let json: serde_json::Value = serde_json::from_slice(&task.encode().unwrap()).unwrap();
        assert_eq!(json["type"], "email:send");
        assert_eq!(json["payload"], "e30=");

        let bad = br#"{"type":"email:send","payload":"not base64!"}"#;
        assert!(matches!(Task::decode(bad), Err(QueueError::Decode(_))));
    }

    #[test]
    fn test_nonce_distinguishes_identical_tasks() {
        let a = Task::new(TaskType::EmailSend, b"{}".to_vec()).with_nonce();
        let b = Task::new(TaskType::EmailSend, b"{}".to_vec()).with_nonce();
        assert_ne!(a.encode().unwrap(), b.encode().unwrap());
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(Task::decode(b"\x00\x01"), Err(QueueError::Decode(_))));
    }
}
