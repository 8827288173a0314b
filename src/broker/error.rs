//! Broker error types

/// Error type for broker operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Topic is not registered (never created, or already torn down)
    NoSuchTopic(String),
    /// The broker's dispatch loop is gone
    BrokerClosed,
}

impl std::fmt::Display for BrokerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerError::NoSuchTopic(topic) => write!(f, "No such topic: {}", topic),
            BrokerError::BrokerClosed => write!(f, "Broker is closed"),
        }
    }
}

impl std::error::Error for BrokerError {}
