//! Rest-relative joint deltas.
//!
//! Pure per-call: the result depends only on the frame, the rest pose and
//! the mirror flag.

use crate::skeleton::{BodyPose, JointId, JointTransform, RestPose, SkeletonFrame};

/// 1フレーム分の差分。エンコーダへの入力
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaFrame {
    /// UNIX時刻（秒）
    pub timestamp: f64,
    /// 送信名を左右入れ替えるか
    pub mirrored: bool,
    /// JointId 昇順
    pub joints: Vec<(JointId, JointTransform)>,
}

impl DeltaFrame {
    pub fn new(timestamp: f64, mirrored: bool, joints: Vec<(JointId, JointTransform)>) -> Self {
        Self {
            timestamp,
            mirrored,
            joints,
        }
    }

    /// 生フレーム → 既知関節のみ → レスト差分
    pub fn from_frame(frame: &SkeletonFrame, rest: &RestPose, mirrored: bool, timestamp: f64) -> Self {
        let pose = BodyPose::from_frame(frame);
        Self::new(timestamp, mirrored, compute_deltas(&pose, rest, mirrored))
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

/// 1関節の差分
///
/// 回転: frame * rest^-1、位置: frame - rest。
/// mirrored のときは位置のXだけ符号反転し、回転には触れない
pub fn joint_delta(frame: &JointTransform, rest: &JointTransform, mirrored: bool) -> JointTransform {
    let rotation = frame.rotation * rest.rotation.inverse();
    let mut position = frame.position - rest.position;
    if mirrored {
        position.x = -position.x;
    }
    JointTransform::new(position, rotation)
}

/// フレーム全体の差分。レストポーズに無い関節は捨てる
pub fn compute_deltas(
    frame: &BodyPose,
    rest: &RestPose,
    mirrored: bool,
) -> Vec<(JointId, JointTransform)> {
    let mut deltas: Vec<(JointId, JointTransform)> = frame
        .iter()
        .filter_map(|(id, current)| match rest.get(id) {
            Some(base) => Some((id, joint_delta(current, base, mirrored))),
            None => {
                log::debug!("{} missing from rest pose, skipped", id.raw_name());
                None
            }
        })
        .collect();
    deltas.sort_by_key(|(id, _)| *id);
    deltas
}
