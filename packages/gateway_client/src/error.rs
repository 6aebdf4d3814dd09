use tokio_tungstenite::tungstenite;

/// Errors surfaced by the client library.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A send was attempted while the socket is not open. Nothing was written.
    #[error("not connected to the gateway")]
    NotConnected,

    #[error("message is {size} bytes, the gateway accepts at most {limit}")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("gateway is unavailable")]
    Unavailable,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("gateway api error: {0}")]
    Api(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Unavailable
        } else {
            Self::Api(err.to_string())
        }
    }

    pub fn from_tungstenite(err: tungstenite::Error) -> Self {
        let is_connect = match &err {
            tungstenite::Error::Io(io_err) => matches!(
                io_err.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        };
        if is_connect {
            Self::Unavailable
        } else {
            Self::Transport(err.to_string())
        }
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
