use rosc::{decoder, encoder, OscMessage, OscPacket, OscType};

use super::PacketEncoder;
use crate::delta::DeltaFrame;
use crate::error::EncodeError;
use crate::skeleton::{JointId, JointTransform, WIRE_PREFIX};

/// 関節1個分のOSCメッセージを構築
/// アドレス: /joint/<name>
/// 引数: x, y, z, qx, qy, qz, qw (float32 x7)
pub fn build_joint_message(joint: JointId, delta: &JointTransform, mirrored: bool) -> OscMessage {
    OscMessage {
        addr: joint.wire_address(mirrored),
        args: delta.to_array().into_iter().map(OscType::Float).collect(),
    }
}

/// OSCメッセージをバイト列にエンコード
pub fn encode_joint_message(msg: OscMessage) -> Result<Vec<u8>, EncodeError> {
    Ok(encoder::encode(&OscPacket::Message(msg))?)
}

/// 受信側: データグラムから (関節名, 7要素) を取り出す
pub fn decode_joint_message(bytes: &[u8]) -> Result<(String, [f32; 7]), EncodeError> {
    let (_, packet) = decoder::decode_udp(bytes)?;
    let msg = match packet {
        OscPacket::Message(msg) => msg,
        OscPacket::Bundle(_) => return Err(EncodeError::malformed("bundles are not supported")),
    };

    let name = msg
        .addr
        .strip_prefix(WIRE_PREFIX)
        .ok_or_else(|| EncodeError::malformed(format!("unexpected address {}", msg.addr)))?;

    if msg.args.len() != 7 {
        return Err(EncodeError::malformed(format!(
            "expected 7 arguments, got {}",
            msg.args.len()
        )));
    }
    let mut values = [0.0f32; 7];
    for (slot, arg) in values.iter_mut().zip(&msg.args) {
        *slot = match arg {
            OscType::Float(v) => *v,
            other => {
                return Err(EncodeError::malformed(format!(
                    "non-float argument {:?}",
                    other
                )))
            }
        };
    }
    Ok((name.to_string(), values))
}

/// 関節ごとに1データグラム。個別のエンコード失敗はその関節だけ捨てる
#[derive(Debug, Clone, Copy, Default)]
pub struct OscEncoder;

impl PacketEncoder for OscEncoder {
    fn encode(&self, frame: &DeltaFrame) -> Result<Vec<Vec<u8>>, EncodeError> {
        let mut out = Vec::with_capacity(frame.joints.len());
        for (joint, delta) in &frame.joints {
            let msg = build_joint_message(*joint, delta, frame.mirrored);
            match encode_joint_message(msg) {
                Ok(bytes) => out.push(bytes),
                Err(e) => log::warn!("dropping {}: {}", joint.raw_name(), e),
            }
        }
        Ok(out)
    }
}
