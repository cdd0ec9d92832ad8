#[cfg(test)]
use std::collections::VecDeque;
use std::io::{self, Read};
use std::net::TcpStream;
/// Something the reader loop can pull raw bytes from.
///
/// Mirrors socket semantics: `Ok(0)` means nothing arrived, a `WouldBlock` or
/// `TimedOut` error is a receive timeout, anything else ends the session.
pub trait ByteSource: Send {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}
impl ByteSource for TcpStream {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }
}
/// One scripted step of a [`ManualSource`].
#[cfg(test)]
#[derive(Debug)]
pub enum SourceStep {
    Bytes(Vec<u8>),
    Timeout,
    Empty,
    Fail(io::ErrorKind),
}
#[cfg(test)]
impl SourceStep {
    pub fn text(s: &str) -> Self {
        SourceStep::Bytes(s.as_bytes().to_vec())
    }
}
/// In-memory scripted source for exercising the read loop.
///
/// Once the script is exhausted every read fails with `ConnectionAborted`.
#[cfg(test)]
pub struct ManualSource {
    queue: VecDeque<SourceStep>,
}
#[cfg(test)]
impl ManualSource {
    pub fn new(steps: impl IntoIterator<Item = SourceStep>) -> Self {
        Self {
            queue: steps.into_iter().collect(),
        }
    }
}
#[cfg(test)]
impl ByteSource for ManualSource {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.queue.pop_front() {
            Some(SourceStep::Bytes(mut bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    self.queue.push_front(SourceStep::Bytes(bytes.split_off(n)));
                }
                Ok(n)
            }
            Some(SourceStep::Timeout) => Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "scripted receive timeout",
            )),
            Some(SourceStep::Empty) => Ok(0),
            Some(SourceStep::Fail(kind)) => Err(io::Error::new(kind, "scripted failure")),
            None => Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "manual source drained",
            )),
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn oversized_chunks_are_split_across_reads() {
        let mut source = ManualSource::new([SourceStep::text("abcdef"), SourceStep::Empty]);
        let mut buf = [0u8; 4];
        assert_eq!(source.read_chunk(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(source.read_chunk(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(source.read_chunk(&mut buf).unwrap(), 0);
        let err = source.read_chunk(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionAborted);
    }
}
