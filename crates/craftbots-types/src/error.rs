//! Error types for the shared data model.

/// Errors produced when parsing shared value types.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    /// A material name did not match any known material.
    #[error("unknown material: {0}")]
    UnknownMaterial(String),
}

/// Errors produced when building, validating or decoding a [`Message`].
///
/// [`Message`]: crate::message::Message
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The raw record was not a JSON object.
    #[error("message is not a JSON object")]
    NotAnObject,

    /// A required key was absent from the raw record.
    #[error("message is missing required field `{0}`")]
    MissingField(&'static str),

    /// A required text field was empty.
    #[error("message field `{0}` is empty")]
    EmptyField(&'static str),

    /// The payload was `null`.
    #[error("message payload is null")]
    NullPayload,

    /// The context was not a JSON object.
    #[error("message context must be an object")]
    ContextNotObject,

    /// The payload did not match the shape expected for its kind.
    #[error("invalid payload for {kind}: {source}")]
    Payload {
        /// Kind of the offending message.
        kind: String,
        /// Underlying decode error.
        source: serde_json::Error,
    },

    /// JSON encoding or decoding failed.
    #[error("message json error: {source}")]
    Json {
        /// Underlying serde error.
        #[from]
        source: serde_json::Error,
    },
}
