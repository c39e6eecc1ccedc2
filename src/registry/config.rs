//! Registry configuration

/// What `direct_targets` does when nobody claims the requested name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownRecipientPolicy {
    /// Return an empty target set; the sender gets no signal
    #[default]
    Ignore,
    /// Return `RegistryError::UnknownRecipient`
    Reject,
}

/// Configuration for the client registry
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Routing-miss behavior for direct messages
    pub unknown_recipient: UnknownRecipientPolicy,
}

impl RegistryConfig {
    /// Set the routing-miss policy
    pub fn unknown_recipient(mut self, policy: UnknownRecipientPolicy) -> Self {
        self.unknown_recipient = policy;
        self
    }

    /// Shorthand for `unknown_recipient(UnknownRecipientPolicy::Reject)`
    pub fn reject_unknown_recipients(self) -> Self {
        self.unknown_recipient(UnknownRecipientPolicy::Reject)
    }
}
