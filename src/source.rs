//! Pose sources that stand in for the AR body-tracking session.

use std::f32::consts::TAU;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

use crate::encode::SnapshotPacket;
use crate::skeleton::{JointTransform, SkeletonFrame};

/// トラッキング更新ごとに1フレームを返す
pub trait PoseSource {
    fn next_frame(&mut self) -> Option<SkeletonFrame>;
}

/// Tポーズ基準のモデル座標（メートル）。カタログ外の関節も混ぜてある
const SKELETON: &[(&str, [f32; 3])] = &[
    ("root", [0.0, 0.0, 0.0]),
    ("hips_joint", [0.0, 0.0, 0.0]),
    ("spine_4_joint", [0.0, 0.3, 0.0]),
    ("spine_7_joint", [0.0, 0.45, 0.0]),
    ("neck_1_joint", [0.0, 0.55, 0.0]),
    ("head_joint", [0.0, 0.7, 0.0]),
    ("jaw_joint", [0.0, 0.65, 0.05]),
    ("left_shoulder_1_joint", [0.15, 0.5, 0.0]),
    ("left_arm_joint", [0.2, 0.5, 0.0]),
    ("left_forearm_joint", [0.45, 0.5, 0.0]),
    ("left_hand_joint", [0.7, 0.5, 0.0]),
    ("right_shoulder_1_joint", [-0.15, 0.5, 0.0]),
    ("right_arm_joint", [-0.2, 0.5, 0.0]),
    ("right_forearm_joint", [-0.45, 0.5, 0.0]),
    ("right_hand_joint", [-0.7, 0.5, 0.0]),
    ("left_upLeg_joint", [0.1, 0.0, 0.0]),
    ("left_leg_joint", [0.1, -0.45, 0.0]),
    ("left_foot_joint", [0.1, -0.9, 0.0]),
    ("left_toes_joint", [0.1, -0.95, 0.1]),
    ("right_upLeg_joint", [-0.1, 0.0, 0.0]),
    ("right_leg_joint", [-0.1, -0.45, 0.0]),
    ("right_foot_joint", [-0.1, -0.9, 0.0]),
    ("right_toes_joint", [-0.1, -0.95, 0.1]),
];

const LEFT_ARM: [&str; 3] = ["left_arm_joint", "left_forearm_joint", "left_hand_joint"];
const RIGHT_ARM: [&str; 3] = ["right_arm_joint", "right_forearm_joint", "right_hand_joint"];
const LEFT_PIVOT: [f32; 3] = [0.2, 0.5, 0.0];
const RIGHT_PIVOT: [f32; 3] = [-0.2, 0.5, 0.0];

/// 腕振りと上下動をする手続き的な骨格
pub struct SyntheticBody {
    fps: f32,
    frame_index: u64,
    /// 腕の振り幅（ラジアン）
    pub arm_amplitude: f32,
    /// 腰の上下幅（メートル）
    pub bob_amplitude: f32,
    /// 周期（Hz）
    pub frequency: f32,
}

impl SyntheticBody {
    pub fn new(fps: f32) -> Self {
        Self {
            fps,
            frame_index: 0,
            arm_amplitude: 0.6,
            bob_amplitude: 0.03,
            frequency: 0.5,
        }
    }

    /// 動きのない基準姿勢（セッション開始時のフレーム）
    pub fn rest_frame(&self) -> SkeletonFrame {
        self.frame_at(0.0, 0.0)
    }

    fn frame_at(&self, arm_angle: f32, bob: f32) -> SkeletonFrame {
        let mut frame = SkeletonFrame::default();
        for (name, base) in SKELETON {
            let (angle, pivot) = if LEFT_ARM.contains(name) {
                (arm_angle, LEFT_PIVOT)
            } else if RIGHT_ARM.contains(name) {
                (-arm_angle, RIGHT_PIVOT)
            } else {
                (0.0, *base)
            };
            let rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle);
            let pivot = Vector3::from(pivot);
            let position = pivot + rotation * (Vector3::from(*base) - pivot) + Vector3::new(0.0, bob, 0.0);
            let model = Isometry3::from_parts(Translation3::from(position), rotation).to_homogeneous();
            frame.push(*name, JointTransform::from_model_matrix(&model));
        }
        frame
    }
}

impl PoseSource for SyntheticBody {
    fn next_frame(&mut self) -> Option<SkeletonFrame> {
        self.frame_index += 1;
        let t = self.frame_index as f32 / self.fps;
        let phase = TAU * self.frequency * t;
        let arm_angle = self.arm_amplitude * phase.sin();
        let bob = self.bob_amplitude * (2.0 * phase).sin();
        Some(self.frame_at(arm_angle, bob))
    }
}

/// JSON Lines（1行 = スナップショットパケット1個）の記録を再生
pub struct ReplaySource {
    frames: Vec<SkeletonFrame>,
    next: usize,
    looping: bool,
}

impl ReplaySource {
    pub fn open<P: AsRef<Path>>(path: P, looping: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        Self::from_reader(BufReader::new(file), looping)
            .with_context(|| format!("failed to read recording {}", path.display()))
    }

    pub fn from_reader<R: BufRead>(reader: R, looping: bool) -> Result<Self> {
        let mut frames = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let packet = SnapshotPacket::decode(line.as_bytes())
                .with_context(|| format!("line {}", i + 1))?;
            frames.push(packet.to_skeleton_frame());
        }
        log::info!("loaded {} recorded frames", frames.len());
        Ok(Self {
            frames,
            next: 0,
            looping,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl PoseSource for ReplaySource {
    fn next_frame(&mut self) -> Option<SkeletonFrame> {
        if self.next >= self.frames.len() {
            if !self.looping || self.frames.is_empty() {
                return None;
            }
            self.next = 0;
        }
        let frame = self.frames[self.next].clone();
        self.next += 1;
        Some(frame)
    }
}
