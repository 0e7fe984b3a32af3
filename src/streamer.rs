//! Per-frame pipeline: rest-relative deltas, encode, submit to the sender.
//!
//! One producer calls [`BodyStreamer::process_frame`] per tracked-body
//! update. Nothing here awaits the network.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use crate::delta::DeltaFrame;
use crate::encode::{Encoding, PacketEncoder};
use crate::sender::UdpSender;
use crate::skeleton::{RestPose, SkeletonFrame};

/// UNIX時刻（秒、小数）
pub fn now_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// エンコードして送信キューへ渡した
    Submitted,
    /// レストポーズ未取得のため破棄
    NoRestPose,
    /// エンコード失敗のため破棄
    EncodeFailed,
}

/// 1フレームの処理結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub status: FrameStatus,
    /// 差分を計算した関節数
    pub joints: usize,
    /// 送信キューへ渡したデータグラム数
    pub datagrams: usize,
}

impl FrameReport {
    fn dropped(status: FrameStatus) -> Self {
        Self {
            status,
            joints: 0,
            datagrams: 0,
        }
    }
}

pub struct BodyStreamer {
    rest: OnceLock<RestPose>,
    mirrored: bool,
    encoding: Encoding,
    encoder: Box<dyn PacketEncoder>,
    sender: UdpSender,
    /// レストポーズ取得前に届いて捨てたフレーム数
    frames_without_rest: AtomicU64,
}

impl BodyStreamer {
    pub fn new(sender: UdpSender, encoding: Encoding, mirrored: bool) -> Self {
        Self {
            rest: OnceLock::new(),
            mirrored,
            encoding,
            encoder: encoding.encoder(),
            sender,
            frames_without_rest: AtomicU64::new(0),
        }
    }

    /// セッション開始時の姿勢を基準として保存
    ///
    /// 保存できたら true。既に保存済み、または既知関節を含まないフレームなら false
    pub fn capture_rest_pose(&self, frame: &SkeletonFrame) -> bool {
        if self.rest.get().is_some() {
            log::warn!("rest pose already captured, ignoring");
            return false;
        }
        let rest = RestPose::from_frame(frame);
        if rest.is_empty() {
            log::warn!("rest frame has no known joints ({} raw), not captured", frame.len());
            return false;
        }
        let joints = rest.len();
        if self.rest.set(rest).is_err() {
            return false;
        }
        log::info!("rest pose captured ({} joints)", joints);
        true
    }

    pub fn rest_pose(&self) -> Option<&RestPose> {
        self.rest.get()
    }

    pub fn is_calibrated(&self) -> bool {
        self.rest.get().is_some()
    }

    pub fn frames_without_rest(&self) -> u64 {
        self.frames_without_rest.load(Ordering::Relaxed)
    }

    pub fn mirrored(&self) -> bool {
        self.mirrored
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// フレーム間で方式を切り替える
    pub fn set_encoding(&mut self, encoding: Encoding) {
        if encoding != self.encoding {
            log::info!("encoding {} -> {}", self.encoding, encoding);
            self.encoding = encoding;
            self.encoder = encoding.encoder();
        }
    }

    pub fn process_frame(&self, frame: &SkeletonFrame) -> FrameReport {
        self.process_frame_at(frame, now_seconds())
    }

    pub fn process_frame_at(&self, frame: &SkeletonFrame, timestamp: f64) -> FrameReport {
        let Some(rest) = self.rest.get() else {
            self.frames_without_rest.fetch_add(1, Ordering::Relaxed);
            log::debug!("frame before rest pose, dropped");
            return FrameReport::dropped(FrameStatus::NoRestPose);
        };

        let delta = DeltaFrame::from_frame(frame, rest, self.mirrored, timestamp);
        let datagrams = match self.encoder.encode(&delta) {
            Ok(d) => d,
            Err(e) => {
                log::error!("frame at {:.3} dropped: {}", timestamp, e);
                return FrameReport::dropped(FrameStatus::EncodeFailed);
            }
        };

        let count = datagrams.len();
        for datagram in datagrams {
            self.sender.send(datagram);
        }
        FrameReport {
            status: FrameStatus::Submitted,
            joints: delta.joints.len(),
            datagrams: count,
        }
    }

    pub fn sender(&self) -> &UdpSender {
        &self.sender
    }

    pub fn into_sender(self) -> UdpSender {
        self.sender
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{decode_joint_message, SnapshotPacket};
    use crate::sender::{ignore_failures, Endpoint, FailureCallback, Transport};
    use crate::skeleton::JointTransform;
    use nalgebra::{UnitQuaternion, Vector3};
    use std::future::Future;
    use std::io;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::UdpSocket;

    fn at(x: f32, y: f32, z: f32) -> JointTransform {
        JointTransform::new(Vector3::new(x, y, z), UnitQuaternion::identity())
    }

    fn rest_frame() -> SkeletonFrame {
        let mut frame = SkeletonFrame::default();
        frame.push("left_hand_joint", at(0.0, 0.0, 0.0));
        frame.push("right_hand_joint", at(0.0, 0.0, 0.0));
        frame.push("spine_7_joint", at(0.0, 0.0, 0.0));
        frame
    }

    fn live_frame() -> SkeletonFrame {
        let mut frame = SkeletonFrame::default();
        frame.push("left_hand_joint", at(1.0, 2.0, 3.0));
        frame.push("right_hand_joint", at(0.0, 0.0, 0.0));
        frame.push("spine_7_joint", at(9.0, 9.0, 9.0));
        frame
    }

    async fn loopback(encoding: Encoding, mirrored: bool) -> (BodyStreamer, UdpSocket) {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();
        let sender = UdpSender::connect(&Endpoint::new("127.0.0.1", port), 64, ignore_failures())
            .await
            .unwrap();
        (BodyStreamer::new(sender, encoding, mirrored), receiver)
    }

    async fn recv(socket: &UdpSocket) -> Vec<u8> {
        let mut buf = vec![0u8; 65535];
        let n = tokio::time::timeout(Duration::from_secs(2), socket.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        buf.truncate(n);
        buf
    }

    #[tokio::test]
    async fn test_frame_before_rest_is_dropped() {
        let (streamer, _rx) = loopback(Encoding::Json, false).await;
        let report = streamer.process_frame(&live_frame());
        assert_eq!(report.status, FrameStatus::NoRestPose);
        streamer.process_frame(&live_frame());
        assert_eq!(streamer.frames_without_rest(), 2);
        assert_eq!(streamer.sender().stats().submitted, 0);

        streamer.capture_rest_pose(&rest_frame());
        streamer.process_frame(&live_frame());
        assert_eq!(streamer.frames_without_rest(), 2);
    }

    #[tokio::test]
    async fn test_rest_pose_captured_once() {
        let (streamer, _rx) = loopback(Encoding::Json, false).await;
        assert!(!streamer.capture_rest_pose(&SkeletonFrame::default()));
        assert!(streamer.capture_rest_pose(&rest_frame()));
        assert!(!streamer.capture_rest_pose(&live_frame()));
        assert_eq!(streamer.rest_pose().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_json_frame_over_udp() {
        let (streamer, rx) = loopback(Encoding::Json, false).await;
        streamer.capture_rest_pose(&rest_frame());

        let report = streamer.process_frame_at(&live_frame(), 1000.0);
        assert_eq!(report.status, FrameStatus::Submitted);
        assert_eq!(report.joints, 2);
        assert_eq!(report.datagrams, 1);

        let packet = SnapshotPacket::decode(&recv(&rx).await).unwrap();
        assert_eq!(packet.timestamp, 1000.0);
        assert_eq!(packet.joints.len(), 2);
        assert_eq!(packet.joints["left_hand_joint"], [1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 1.0]);
        assert!(!packet.joints.contains_key("spine_7_joint"));
    }

    #[tokio::test]
    async fn test_mirrored_osc_frame_over_udp() {
        let (streamer, rx) = loopback(Encoding::Osc, true).await;
        streamer.capture_rest_pose(&rest_frame());

        let report = streamer.process_frame_at(&live_frame(), 0.0);
        assert_eq!(report.datagrams, 2);

        let mut received = Vec::new();
        for _ in 0..2 {
            received.push(decode_joint_message(&recv(&rx).await).unwrap());
        }
        received.sort_by(|a, b| a.0.cmp(&b.0));
        // OSC は left_hand の差分が right_hand のアドレスで、X反転して届く
        assert_eq!(received[0].0, "left_hand_joint");
        assert_eq!(received[1].0, "right_hand_joint");
        assert_eq!(&received[1].1[..3], &[-1.0f32, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn test_switch_encoding_between_frames() {
        let (mut streamer, _rx) = loopback(Encoding::Json, false).await;
        streamer.capture_rest_pose(&rest_frame());
        assert_eq!(streamer.process_frame(&live_frame()).datagrams, 1);

        streamer.set_encoding(Encoding::Osc);
        assert_eq!(streamer.encoding(), Encoding::Osc);
        assert_eq!(streamer.process_frame(&live_frame()).datagrams, 2);
    }

    struct Unreachable;

    impl Transport for Unreachable {
        fn send_datagram<'a>(
            &'a self,
            _buf: &'a [u8],
        ) -> impl Future<Output = io::Result<usize>> + Send + 'a {
            async { Err(io::Error::new(io::ErrorKind::ConnectionRefused, "no route")) }
        }
    }

    #[tokio::test]
    async fn test_unreachable_destination_keeps_streaming() {
        let failures = Arc::new(AtomicU64::new(0));
        let f = Arc::clone(&failures);
        let on_failure: FailureCallback = Arc::new(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        let sender = UdpSender::with_transport(Unreachable, 64, on_failure);
        let streamer = BodyStreamer::new(sender, Encoding::Json, false);
        streamer.capture_rest_pose(&rest_frame());

        for i in 0..3 {
            let report = streamer.process_frame_at(&live_frame(), i as f64);
            assert_eq!(report.status, FrameStatus::Submitted);
        }
        let stats = streamer.into_sender().close().await;
        assert_eq!(stats.submitted, 3);
        assert_eq!(stats.failed, 3);
        assert_eq!(failures.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_now_seconds_is_epoch_based() {
        // 2020-01-01 以降
        assert!(now_seconds() > 1_577_836_800.0);
    }
}
