// 信号链：分帧解码 -> 环形缓冲 -> 滤波 / 频谱 -> 显示帧
pub mod buffer;
pub mod error;
pub mod fft;
pub mod filter;
pub mod framer;
pub mod pipeline;
pub mod source;
// 公开导出这些模块里的结构体，方便外部调用
pub use buffer::RingBuffers;
pub use error::{DecodeError, FilterError};
pub use fft::{ChannelSpectrum, SpectrumBuilder};
pub use filter::{filtfilt_butterworth, FilterSpec};
pub use framer::{decode_sample, parse_channel_line, LineFramer};
pub use pipeline::{DisplayFrame, DisplayTransform};
pub use source::ByteSource;
#[cfg(test)]
pub use source::{ManualSource, SourceStep};
