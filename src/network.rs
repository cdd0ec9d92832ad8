// src/network.rs
use std::io::{ErrorKind, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};
use ndarray::Array2;

use crate::config::ReaderSettings;
use crate::drivers::{decode_sample, ByteSource, LineFramer, RingBuffers};
use crate::types::CommandSink;

/// Pause after an empty read so a silent peer does not spin the loop.
const EMPTY_READ_BACKOFF: Duration = Duration::from_millis(5);

// 读线程与 UI 线程共享的状态
#[derive(Clone)]
struct Shared {
    running: Arc<AtomicBool>,
    buffers: Arc<Mutex<RingBuffers>>,
    subscribers: Arc<Mutex<Vec<Sender<String>>>>,
}

impl Shared {
    fn new(capacity: usize) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            buffers: Arc::new(Mutex::new(RingBuffers::with_capacity(capacity))),
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn buffers(&self) -> MutexGuard<'_, RingBuffers> {
        self.buffers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, line: &str) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.retain(|tx| tx.send(line.to_owned()).is_ok());
    }
}

/// Background TCP reader for the ESP32 text stream.
///
/// Owns the socket and the ring buffers. Other components only see raw lines
/// (via [`NetworkReader::subscribe`]) and read-only snapshots
/// (via [`NetworkReader::get_latest`]).
pub struct NetworkReader {
    shared: Shared,
    source: Option<Box<dyn ByteSource>>,
    writer: Option<TcpStream>,
    chunk_size: usize,
    handle: Option<JoinHandle<()>>,
}

impl NetworkReader {
    /// Connects with a bounded timeout. Failure never propagates: the reader is
    /// simply not running and `start` does nothing.
    pub fn connect(settings: &ReaderSettings) -> Self {
        let mut reader = Self::idle(settings);
        match open_stream(settings) {
            Ok(stream) => {
                info!("✅ connected to {}:{}", settings.host, settings.port);
                reader.writer = stream.try_clone().ok();
                reader.source = Some(Box::new(stream));
                reader.shared.running.store(true, Ordering::SeqCst);
            }
            Err(err) => {
                error!("❌ cannot connect to {}:{}: {err}", settings.host, settings.port);
            }
        }
        reader
    }

    /// Runs the same read loop over a scripted byte source.
    #[cfg(test)]
    pub fn from_source(source: impl ByteSource + 'static, settings: &ReaderSettings) -> Self {
        let mut reader = Self::idle(settings);
        reader.source = Some(Box::new(source));
        reader.shared.running.store(true, Ordering::SeqCst);
        reader
    }

    fn idle(settings: &ReaderSettings) -> Self {
        Self {
            shared: Shared::new(settings.buffer_capacity),
            source: None,
            writer: None,
            chunk_size: settings.chunk_size.max(1),
            handle: None,
        }
    }

    /// Spawns the read loop. No-op when the connection failed or the loop already runs.
    pub fn start(&mut self) {
        let Some(source) = self.source.take() else {
            return;
        };
        let shared = self.shared.clone();
        let chunk_size = self.chunk_size;
        self.handle = Some(thread::spawn(move || read_loop(source, shared, chunk_size)));
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Every complete line received from now on, including non-data lines.
    pub fn subscribe(&self) -> Receiver<String> {
        let (tx, rx) = channel();
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(tx);
        rx
    }

    /// Newest `min(n, available)` samples per channel, `None` before the first sample.
    pub fn get_latest(&self, n: usize) -> Option<Array2<f64>> {
        self.shared.buffers().latest(n)
    }

    /// Best-effort write of `text` plus a newline; failures are only logged.
    pub fn send(&self, text: &str) {
        let Some(mut stream) = self.writer.as_ref() else {
            debug!("send dropped, no connection: {text:?}");
            return;
        };
        let payload = format!("{text}\n");
        if let Err(err) = stream.write_all(payload.as_bytes()) {
            debug!("send failed: {err}");
        }
    }

    /// Stops the loop, closes the socket and waits for the thread to exit.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(stream) = self.writer.take() {
            if let Err(err) = stream.shutdown(Shutdown::Both) {
                debug!("socket shutdown: {err}");
            }
        }
        self.source = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("reader thread panicked");
            }
        }
    }
}

impl CommandSink for NetworkReader {
    fn send_line(&self, text: &str) {
        self.send(text);
    }
}

impl Drop for NetworkReader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_stream(settings: &ReaderSettings) -> std::io::Result<TcpStream> {
    let mut last_err = None;
    for addr in (settings.host.as_str(), settings.port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, settings.connect_timeout()) {
            Ok(stream) => {
                stream.set_read_timeout(Some(settings.read_timeout()))?;
                stream.set_nodelay(true).ok();
                return Ok(stream);
            }
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(ErrorKind::AddrNotAvailable, "host resolved to no address")
    }))
}

fn read_loop(mut source: Box<dyn ByteSource>, shared: Shared, chunk_size: usize) {
    let mut framer = LineFramer::new();
    let mut buf = vec![0u8; chunk_size];
    let mut warned_empty = false;
    while shared.running.load(Ordering::SeqCst) {
        match source.read_chunk(&mut buf) {
            // Empty reads are not treated as a disconnect.
            Ok(0) => {
                if !warned_empty {
                    warn!("empty read from device, continuing");
                    warned_empty = true;
                }
                thread::sleep(EMPTY_READ_BACKOFF);
            }
            Ok(n) => {
                let lines = framer.push(&buf[..n]);
                let mut samples = Vec::with_capacity(lines.len());
                for line in &lines {
                    shared.publish(line);
                    match decode_sample(line) {
                        Ok(sample) => samples.push(sample),
                        Err(err) => debug!("⚠️ dropped line {line:?}: {err}"),
                    }
                }
                if !samples.is_empty() {
                    let mut buffers = shared.buffers();
                    for sample in &samples {
                        buffers.push(sample);
                    }
                }
            }
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => {
                if shared.running.load(Ordering::SeqCst) {
                    error!("⚠️ TCP receive error: {err}");
                }
                break;
            }
        }
    }
    shared.running.store(false, Ordering::SeqCst);
}
