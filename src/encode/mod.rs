pub mod json;
pub mod osc;

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::delta::DeltaFrame;
use crate::error::EncodeError;

pub use json::{JsonEncoder, SnapshotPacket};
pub use osc::{build_joint_message, decode_joint_message, OscEncoder};

/// フレームを送信用バイト列へ変換する
///
/// 1フレームから何個のデータグラムが出るかは方式による（JSON: 1個、OSC: 関節数）
pub trait PacketEncoder: Send + Sync {
    fn encode(&self, frame: &DeltaFrame) -> Result<Vec<Vec<u8>>, EncodeError>;
}

/// エンコード方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// 1フレーム1個のJSONスナップショット
    #[default]
    Json,
    /// 関節ごとのOSCメッセージ
    Osc,
}

impl Encoding {
    pub fn encoder(self) -> Box<dyn PacketEncoder> {
        match self {
            Self::Json => Box::new(JsonEncoder),
            Self::Osc => Box::new(OscEncoder),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Osc => f.write_str("osc"),
        }
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "osc" => Ok(Self::Osc),
            other => Err(format!("unknown encoding '{}' (expected json or osc)", other)),
        }
    }
}
