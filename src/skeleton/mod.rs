pub mod joint;
pub mod pose;
pub mod transform;

pub use joint::{JointId, WIRE_PREFIX};
pub use pose::{BodyPose, RestPose, SkeletonFrame};
pub use transform::JointTransform;
