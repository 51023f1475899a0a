use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use std::collections::VecDeque;
use strum_macros::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, Serialize)]
pub enum MessageType {
    Error,
    Warning,
    Info,
    Status,
}

#[derive(Clone, Debug, Serialize)]
pub struct StatusMessage {
    pub timestamp: DateTime<Utc>,
    pub message_type: MessageType,
    pub content: String,
}

impl StatusMessage {
    pub fn new(message_type: MessageType, content: String) -> Self {
        StatusMessage {
            timestamp: Utc::now(),
            message_type,
            content,
        }
    }
}

/// Session events, newest last. Every message also goes to the log.
pub struct MessageLog {
    messages: VecDeque<StatusMessage>,
    max_size: usize,
}

impl Default for MessageLog {
    fn default() -> Self {
        MessageLog::new(None)
    }
}

impl MessageLog {
    pub fn new(max_size: Option<usize>) -> Self {
        MessageLog {
            messages: VecDeque::new(),
            max_size: max_size.unwrap_or(500),
        }
    }

    pub fn add_message(&mut self, message: StatusMessage) {
        match message.message_type {
            MessageType::Error => error!("{}", message.content),
            MessageType::Warning => warn!("{}", message.content),
            MessageType::Info | MessageType::Status => info!("{}", message.content),
        }

        if self.messages.len() == self.max_size {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    pub fn get_all_messages(&self) -> Vec<StatusMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn count(&self, message_type: MessageType) -> usize {
        self.messages
            .iter()
            .filter(|message| message.message_type == message_type)
            .count()
    }

    pub fn size(&self) -> usize {
        self.messages.len()
    }
}
