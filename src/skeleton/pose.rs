use std::collections::HashMap;

use super::joint::JointId;
use super::transform::JointTransform;

/// ポーズソースから届く1フレーム分の生データ（関節名 + 絶対変換）
#[derive(Debug, Clone, Default)]
pub struct SkeletonFrame {
    pub joints: Vec<(String, JointTransform)>,
}

impl SkeletonFrame {
    pub fn new(joints: Vec<(String, JointTransform)>) -> Self {
        Self { joints }
    }

    pub fn push(&mut self, name: impl Into<String>, transform: JointTransform) {
        self.joints.push((name.into(), transform));
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

/// 既知関節 → 変換。1関節1エントリ
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyPose {
    joints: HashMap<JointId, JointTransform>,
}

impl BodyPose {
    pub fn new() -> Self {
        Self::default()
    }

    /// 生フレームから構築。カタログ外の関節名は黙って捨てる
    pub fn from_frame(frame: &SkeletonFrame) -> Self {
        let joints = frame
            .joints
            .iter()
            .filter_map(|(name, t)| JointId::lookup(name).map(|id| (id, *t)))
            .collect();
        Self { joints }
    }

    pub fn insert(&mut self, joint: JointId, transform: JointTransform) {
        self.joints.insert(joint, transform);
    }

    pub fn get(&self, joint: JointId) -> Option<&JointTransform> {
        self.joints.get(&joint)
    }

    pub fn iter(&self) -> impl Iterator<Item = (JointId, &JointTransform)> {
        self.joints.iter().map(|(id, t)| (*id, t))
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

impl FromIterator<(JointId, JointTransform)> for BodyPose {
    fn from_iter<I: IntoIterator<Item = (JointId, JointTransform)>>(iter: I) -> Self {
        Self {
            joints: iter.into_iter().collect(),
        }
    }
}

/// セッション開始時に一度だけ取得する基準姿勢。以後変更しない
#[derive(Debug, Clone, PartialEq)]
pub struct RestPose(BodyPose);

impl RestPose {
    pub fn new(pose: BodyPose) -> Self {
        Self(pose)
    }

    pub fn from_frame(frame: &SkeletonFrame) -> Self {
        Self(BodyPose::from_frame(frame))
    }

    pub fn get(&self, joint: JointId) -> Option<&JointTransform> {
        self.0.get(joint)
    }

    pub fn pose(&self) -> &BodyPose {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
