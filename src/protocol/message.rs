//! Chat protocol messages
//!
//! Requests flow from a client to the hub, responses flow from the hub to
//! clients. Framing lives in [`super::codec`].

/// A message sent by a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Claim a display name, releasing any previous one
    ChangeName {
        /// Name to claim
        new_name: String,
    },
    /// Send text to every other connected session
    GlobalMessage {
        /// Message body
        text: String,
    },
    /// Send text to every session claiming `target_name`
    DirectMessage {
        /// Recipient name (case-insensitive)
        target_name: String,
        /// Message body
        text: String,
    },
    /// A request with a tag this server does not understand
    Unrecognized {
        /// Raw tag byte
        tag: u8,
    },
}

impl Request {
    /// Short name of the variant, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Request::ChangeName { .. } => "change_name",
            Request::GlobalMessage { .. } => "global_message",
            Request::DirectMessage { .. } => "direct_message",
            Request::Unrecognized { .. } => "unrecognized",
        }
    }

    pub fn change_name(new_name: impl Into<String>) -> Self {
        Request::ChangeName {
            new_name: new_name.into(),
        }
    }

    pub fn global(text: impl Into<String>) -> Self {
        Request::GlobalMessage { text: text.into() }
    }

    pub fn direct(target_name: impl Into<String>, text: impl Into<String>) -> Self {
        Request::DirectMessage {
            target_name: target_name.into(),
            text: text.into(),
        }
    }
}

/// A message pushed by the hub to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Chat text, with the sender's name if it had claimed one
    Notification {
        /// Message body
        text: String,
        /// Sender's display name, absent for anonymous senders and server notices
        sender: Option<String>,
    },
}

impl Response {
    /// Create a notification
    pub fn notification(text: impl Into<String>, sender: Option<String>) -> Self {
        Response::Notification {
            text: text.into(),
            sender,
        }
    }

    /// Create a notification with no sender (server-originated)
    pub fn notice(text: impl Into<String>) -> Self {
        Self::notification(text, None)
    }

    /// Message body
    pub fn text(&self) -> &str {
        match self {
            Response::Notification { text, .. } => text,
        }
    }

    /// Sender's display name, if any
    pub fn sender(&self) -> Option<&str> {
        match self {
            Response::Notification { sender, .. } => sender.as_deref(),
        }
    }
}
