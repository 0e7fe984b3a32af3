/// OSCアドレスの接頭辞
pub const WIRE_PREFIX: &str = "/joint/";

/// ストリーム対象のARKitボディ関節
///
/// 中央の関節は自分自身がミラー相手
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JointId {
    Root,
    Hips,
    Spine4,
    Neck1,
    Head,
    LeftShoulder1,
    RightShoulder1,
    LeftArm,
    RightArm,
    LeftForearm,
    RightForearm,
    LeftHand,
    RightHand,
    LeftUpLeg,
    RightUpLeg,
    LeftLeg,
    RightLeg,
    LeftFoot,
    RightFoot,
    LeftToes,
    RightToes,
}

impl JointId {
    pub const COUNT: usize = 21;

    pub const ALL: [JointId; Self::COUNT] = [
        Self::Root,
        Self::Hips,
        Self::Spine4,
        Self::Neck1,
        Self::Head,
        Self::LeftShoulder1,
        Self::RightShoulder1,
        Self::LeftArm,
        Self::RightArm,
        Self::LeftForearm,
        Self::RightForearm,
        Self::LeftHand,
        Self::RightHand,
        Self::LeftUpLeg,
        Self::RightUpLeg,
        Self::LeftLeg,
        Self::RightLeg,
        Self::LeftFoot,
        Self::RightFoot,
        Self::LeftToes,
        Self::RightToes,
    ];

    /// ARKitスケルトン定義上の関節名
    pub fn raw_name(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Hips => "hips_joint",
            Self::Spine4 => "spine_4_joint",
            Self::Neck1 => "neck_1_joint",
            Self::Head => "head_joint",
            Self::LeftShoulder1 => "left_shoulder_1_joint",
            Self::RightShoulder1 => "right_shoulder_1_joint",
            Self::LeftArm => "left_arm_joint",
            Self::RightArm => "right_arm_joint",
            Self::LeftForearm => "left_forearm_joint",
            Self::RightForearm => "right_forearm_joint",
            Self::LeftHand => "left_hand_joint",
            Self::RightHand => "right_hand_joint",
            Self::LeftUpLeg => "left_upLeg_joint",
            Self::RightUpLeg => "right_upLeg_joint",
            Self::LeftLeg => "left_leg_joint",
            Self::RightLeg => "right_leg_joint",
            Self::LeftFoot => "left_foot_joint",
            Self::RightFoot => "right_foot_joint",
            Self::LeftToes => "left_toes_joint",
            Self::RightToes => "right_toes_joint",
        }
    }

    /// 関節名から検索。カタログ外の名前は None（呼び出し側でスキップする）
    pub fn lookup(raw_name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|j| j.raw_name() == raw_name)
    }

    /// 左右反転の相手。mirror(mirror(j)) == j
    pub fn mirror(self) -> Self {
        match self {
            Self::Root => Self::Root,
            Self::Hips => Self::Hips,
            Self::Spine4 => Self::Spine4,
            Self::Neck1 => Self::Neck1,
            Self::Head => Self::Head,
            Self::LeftShoulder1 => Self::RightShoulder1,
            Self::RightShoulder1 => Self::LeftShoulder1,
            Self::LeftArm => Self::RightArm,
            Self::RightArm => Self::LeftArm,
            Self::LeftForearm => Self::RightForearm,
            Self::RightForearm => Self::LeftForearm,
            Self::LeftHand => Self::RightHand,
            Self::RightHand => Self::LeftHand,
            Self::LeftUpLeg => Self::RightUpLeg,
            Self::RightUpLeg => Self::LeftUpLeg,
            Self::LeftLeg => Self::RightLeg,
            Self::RightLeg => Self::LeftLeg,
            Self::LeftFoot => Self::RightFoot,
            Self::RightFoot => Self::LeftFoot,
            Self::LeftToes => Self::RightToes,
            Self::RightToes => Self::LeftToes,
        }
    }

    /// 送信時の名前: mirrored なら相手側の名前を使う
    pub fn wire_name(self, mirrored: bool) -> &'static str {
        if mirrored {
            self.mirror().raw_name()
        } else {
            self.raw_name()
        }
    }

    /// OSCアドレス (`/joint/<name>`)
    pub fn wire_address(self, mirrored: bool) -> String {
        format!("{}{}", WIRE_PREFIX, self.wire_name(mirrored))
    }
}
