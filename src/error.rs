//! Error types shared by the encode and send stages.

use thiserror::Error;

/// パケットのエンコード/デコード失敗
#[derive(Debug, Error)]
pub enum EncodeError {
    /// JSON serialization or parsing failed.
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// OSC packet encoding or decoding failed.
    #[error("osc encoding failed: {0:?}")]
    Osc(rosc::OscError),

    /// Well-formed bytes that do not carry a joint payload.
    #[error("malformed packet: {0}")]
    Malformed(String),
}

impl EncodeError {
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }
}

impl From<rosc::OscError> for EncodeError {
    fn from(err: rosc::OscError) -> Self {
        Self::Osc(err)
    }
}

/// UDP送信の失敗（1データグラム単位）
#[derive(Debug, Error)]
pub enum SendError {
    /// The submission queue was full; the datagram was dropped.
    #[error("send queue full, datagram dropped")]
    QueueFull,

    /// The writer task has stopped.
    #[error("sender closed")]
    Closed,

    /// The socket reported an error for this datagram.
    #[error("udp send failed: {0}")]
    Io(#[from] std::io::Error),
}

/// 設定値の検証エラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("destination host must not be empty")]
    EmptyHost,

    #[error("destination port must be non-zero")]
    ZeroPort,

    #[error("queue_depth must be at least 1")]
    ZeroQueueDepth,

    #[error("source fps must be finite and within (0, 1000]")]
    InvalidFps,
}
