use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::encode::Encoding;
use crate::error::ConfigError;
use crate::sender::Endpoint;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub receiver: ReceiverConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    /// 受信側のホスト（同一LAN上）
    #[serde(default = "default_host")]
    pub host: String,
    /// 受信側のUDPポート
    #[serde(default = "default_port")]
    pub port: u16,
    /// 左右反転（関節名の入れ替え + 位置Xの符号反転）
    #[serde(default)]
    pub mirrored: bool,
    /// "json" | "osc"
    #[serde(default)]
    pub encoding: Encoding,
    /// 送信キューの長さ。溢れた分は捨てる
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

fn default_host() -> String { "192.168.4.22".to_string() }
fn default_port() -> u16 { 12345 }
fn default_queue_depth() -> usize { 64 }

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            mirrored: false,
            encoding: Encoding::default(),
            queue_depth: default_queue_depth(),
        }
    }
}

impl StreamConfig {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// 手続き的に生成する骨格
    #[default]
    Synthetic,
    /// JSON Lines の記録を再生
    Replay,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    /// replay 時の記録ファイル
    #[serde(default = "default_replay_path")]
    pub path: String,
    #[serde(default = "default_fps")]
    pub fps: f32,
    /// 記録の末尾で先頭に戻る
    #[serde(default = "default_loop_replay")]
    pub loop_replay: bool,
}

fn default_replay_path() -> String { "recording.jsonl".to_string() }
fn default_fps() -> f32 { 60.0 }
fn default_loop_replay() -> bool { true }

/// 送信ループの上限レート
pub const MAX_FPS: f32 = 1000.0;

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            path: default_replay_path(),
            fps: default_fps(),
            loop_replay: default_loop_replay(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReceiverConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub encoding: Encoding,
    /// 1パケットごとに表示する関節数
    #[serde(default = "default_preview_joints")]
    pub preview_joints: usize,
}

fn default_bind() -> String { "0.0.0.0:12345".to_string() }
fn default_preview_joints() -> usize { 3 }

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            encoding: Encoding::default(),
            preview_joints: default_preview_joints(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// ファイルが無ければデフォルト値。あるのに不正ならエラー
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::warn!("{} not found; using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.stream.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.stream.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.stream.queue_depth == 0 {
            return Err(ConfigError::ZeroQueueDepth);
        }
        // 周期 1/fps がゼロや無限大になる値も弾く
        let fps = self.source.fps;
        if !fps.is_finite() || fps <= 0.0 || !(1.0 / fps).is_finite() || fps > MAX_FPS {
            return Err(ConfigError::InvalidFps);
        }
        Ok(())
    }
}
