use nalgebra::{Matrix3, Matrix4, Quaternion, Rotation3, UnitQuaternion, Vector3};

/// 関節の位置と回転
///
/// 受信した絶対姿勢にも、レストポーズからの差分にも使う
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointTransform {
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl JointTransform {
    pub fn new(position: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self { position, rotation }
    }

    /// 原点、回転なし
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// 4x4のモデル変換行列から生成（列3が平行移動、左上3x3が回転）
    pub fn from_model_matrix(m: &Matrix4<f32>) -> Self {
        let position = Vector3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
        let basis: Matrix3<f32> = m.fixed_view::<3, 3>(0, 0).into_owned();
        let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_eps(
            &basis,
            1.0e-6,
            32,
            Rotation3::identity(),
        ));
        Self { position, rotation }
    }

    /// 送信用の7要素: x, y, z, qx, qy, qz, qw
    pub fn to_array(&self) -> [f32; 7] {
        let p = &self.position;
        let q = &self.rotation.coords;
        [p.x, p.y, p.z, q.x, q.y, q.z, q.w]
    }

    /// 7要素から復元。クォータニオンは正規化し、長さ0なら単位回転
    pub fn from_array(values: [f32; 7]) -> Self {
        let [x, y, z, qx, qy, qz, qw] = values;
        let q = Quaternion::new(qw, qx, qy, qz);
        let rotation = UnitQuaternion::try_new(q, 1e-12).unwrap_or_else(UnitQuaternion::identity);
        Self {
            position: Vector3::new(x, y, z),
            rotation,
        }
    }
}

impl Default for JointTransform {
    fn default() -> Self {
        Self::identity()
    }
}
