//! Snapshot-JSON wire format: one UTF-8 object per frame.
//!
//! `{"timestamp": <seconds>, "joints": {"<name>": [x, y, z, qx, qy, qz, qw], ...}}`

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::PacketEncoder;
use crate::delta::DeltaFrame;
use crate::error::EncodeError;
use crate::skeleton::{JointTransform, SkeletonFrame};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPacket {
    pub timestamp: f64,
    pub joints: BTreeMap<String, [f32; 7]>,
}

impl SnapshotPacket {
    pub fn from_delta(frame: &DeltaFrame) -> Self {
        let joints = frame
            .joints
            .iter()
            .map(|(id, t)| (id.raw_name().to_string(), t.to_array()))
            .collect();
        Self {
            timestamp: frame.timestamp,
            joints,
        }
    }

    /// 非有限値は serde_json が null にしてしまうので送る前に弾く
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        if !self.timestamp.is_finite() {
            return Err(EncodeError::malformed("non-finite timestamp"));
        }
        if let Some((name, _)) = self
            .joints
            .iter()
            .find(|(_, values)| values.iter().any(|v| !v.is_finite()))
        {
            return Err(EncodeError::malformed(format!("non-finite value in {}", name)));
        }
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EncodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// 記録済みパケットをポーズソースのフレームとして読み直す
    pub fn to_skeleton_frame(&self) -> SkeletonFrame {
        SkeletonFrame::new(
            self.joints
                .iter()
                .map(|(name, values)| (name.clone(), JointTransform::from_array(*values)))
                .collect(),
        )
    }
}

/// 1フレーム = 1データグラム
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl PacketEncoder for JsonEncoder {
    fn encode(&self, frame: &DeltaFrame) -> Result<Vec<Vec<u8>>, EncodeError> {
        let bytes = SnapshotPacket::from_delta(frame).to_bytes()?;
        Ok(vec![bytes])
    }
}
