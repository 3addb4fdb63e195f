use thiserror::Error;

/// Errors returned by image generation operations.
#[derive(Error, Debug)]
pub enum GenError {
    /// The backend returned a non-success HTTP status.
    #[error("Request failed with status {status}: {body}")]
    Request { status: u16, body: String },

    /// The backend answered with a success status but the body was not the expected JSON.
    #[error("Failed to parse response JSON from {url}: {source}")]
    ResponseParse {
        url: String,
        source: serde_json::Error,
    },

    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    /// None of the known image fields were present in the response.
    #[error(
        "Response did not contain a recognized image URL field (output, url, image, data). Received keys: {}",
        available_keys.join(", ")
    )]
    UnrecognizedResponse { available_keys: Vec<String> },

    /// The backend answered with an empty array.
    #[error("Backend returned an empty response")]
    EmptyResponse,

    /// The response was well-formed but lacked data we need.
    #[error("{0}")]
    InvalidResponse(String),

    /// The backend reported the task as failed.
    #[error("Generation failed: {0}")]
    TaskFailed(String),

    /// The backend reported completion without a result reference.
    #[error("Task {task_id} completed without a result URL")]
    IncompleteResult { task_id: String },

    /// Polling ran out of attempts before the task reached a terminal state.
    #[error("Generation timed out after {attempts} status checks")]
    PollTimeout { attempts: u32 },

    /// The operation was cancelled by the caller.
    #[error("Generation was cancelled")]
    Cancelled,

    /// A required credential was not configured.
    #[error("{0}")]
    MissingCredential(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Prompt is empty")]
    EmptyPrompt,

    /// A generation is already running on this generator.
    #[error("A generation is already in progress")]
    Busy,

    /// Reading or writing persisted state failed.
    #[error("Storage error for key '{key}': {source}")]
    Storage {
        key: String,
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, GenError>;
