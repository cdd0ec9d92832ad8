// src/types.rs
use std::fmt;

/// Channels per wire record: index 0 is the reference/status channel.
pub const CHANNEL_COUNT: usize = 9;
/// EEG channels carried after the reference channel.
pub const SIGNAL_CHANNELS: usize = 8;

// 一行数据解码后的 9 个通道读数
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub values: [f64; CHANNEL_COUNT],
}

impl Sample {
    pub fn new(values: [f64; CHANNEL_COUNT]) -> Self {
        Self { values }
    }

    /// Channels 1..=8, skipping the reference channel.
    pub fn signal(&self) -> [f64; SIGNAL_CHANNELS] {
        let mut out = [0.0; SIGNAL_CHANNELS];
        out.copy_from_slice(&self.values[1..]);
        out
    }
}

// 试次标签
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum ClassLabel {
    Left,
    Right,
}

impl ClassLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassLabel::Left => "Left",
            ClassLabel::Right => "Right",
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// 采集流程的阶段
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Phase {
    Idle,
    Rest,
    /// Blank fixation cross shown before a task cue.
    Cue,
    Left,
    Right,
    /// Pause after the Right task before the next round; the Right cue stays up.
    Hold,
    Finished,
}

impl Phase {
    pub fn class(&self) -> Option<ClassLabel> {
        match self {
            Phase::Left => Some(ClassLabel::Left),
            Phase::Right => Some(ClassLabel::Right),
            _ => None,
        }
    }
}

// 设备工作模式 (按钮文字与下发命令)
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum DeviceMode {
    #[default]
    Normal,
    Test,
}

impl DeviceMode {
    pub fn label(&self) -> &'static str {
        match self {
            DeviceMode::Normal => "Normal",
            DeviceMode::Test => "Test",
        }
    }

    /// Command that puts the device into this mode.
    pub fn command(&self) -> &'static str {
        match self {
            DeviceMode::Normal => "1",
            DeviceMode::Test => "3",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            DeviceMode::Normal => DeviceMode::Test,
            DeviceMode::Test => DeviceMode::Normal,
        }
    }
}

// 向设备发送文本命令的出口
pub trait CommandSink {
    fn send_line(&self, text: &str);
}
