use serde::{Deserialize, Serialize};

/// Storage model for a chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageRecord {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
    pub created_at: String,
    pub read_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
}

/// Unread messages from one sender
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnreadCount {
    pub sender_id: String,
    pub count: usize,
}
