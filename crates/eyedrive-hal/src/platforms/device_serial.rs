// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Serial port backed by an OS device node (`/dev/ttyACM0`, `COM4`, ...)
//!
//! Line settings (baud rate, parity) are expected to be configured by the OS
//! or udev rule; the board ships at 9600 8N1. Both directions run on
//! background threads: a reader pushes incoming bytes into a channel, and a
//! writer performs each write plus flush while the caller waits at most
//! `write_timeout` for the result.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{
    bounded, unbounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TryRecvError,
};
use tracing::{debug, info, trace, warn};

use crate::hal::SerialIO;

/// Writes that may wait behind a stalled one
const WRITE_QUEUE: usize = 4;

struct WriteRequest {
    seq: u64,
    data: Vec<u8>,
}

type WriteDone = (u64, io::Result<usize>);

/// Device-node serial port with background reader and writer threads
pub struct DeviceSerial {
    path: PathBuf,
    write_tx: Sender<WriteRequest>,
    done_rx: Receiver<WriteDone>,
    write_timeout: Duration,
    next_seq: u64,
    rx: Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
    disconnected: bool,
}

impl DeviceSerial {
    /// Open the device node for reading and writing and start the I/O threads
    ///
    /// A write that has not been flushed within `write_timeout` fails with
    /// [`io::ErrorKind::TimedOut`].
    pub fn open(path: impl AsRef<Path>, write_timeout: Duration) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = OpenOptions::new().read(true).write(true).open(&path)?;
        let reader = writer.try_clone()?;
        let port = Self::from_parts(path, reader, writer, write_timeout)?;
        info!(target: "eyedrive_hal", "Opened serial device {}", port.path.display());
        Ok(port)
    }

    fn from_parts<R, W>(path: PathBuf, reader: R, writer: W, write_timeout: Duration) -> io::Result<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let (tx, rx) = unbounded();
        let reader_path = path.clone();

        // The reader blocks in `read`; it exits on EOF, on error, or on the
        // first read after the port handle has been dropped.
        thread::Builder::new()
            .name(format!("serial-reader:{}", path.display()))
            .spawn(move || {
                let mut reader = reader;
                let mut buf = [0u8; 256];
                loop {
                    match reader.read(&mut buf) {
                        Ok(0) => {
                            debug!(target: "eyedrive_hal", "Serial EOF on {}", reader_path.display());
                            break;
                        }
                        Ok(n) => {
                            if tx.send(buf[..n].to_vec()).is_err() {
                                break;
                            }
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            warn!(target: "eyedrive_hal", "Serial read error on {}: {}", reader_path.display(), e);
                            break;
                        }
                    }
                }
            })?;

        let (write_tx, write_rx) = bounded::<WriteRequest>(WRITE_QUEUE);
        let (done_tx, done_rx) = unbounded::<WriteDone>();
        let writer_path = path.clone();

        // Exits once the port handle (and with it the request sender) is gone
        thread::Builder::new()
            .name(format!("serial-writer:{}", path.display()))
            .spawn(move || {
                let mut writer = writer;
                for request in write_rx.iter() {
                    let result = writer
                        .write_all(&request.data)
                        .and_then(|()| writer.flush())
                        .map(|()| request.data.len());
                    if let Err(e) = &result {
                        warn!(target: "eyedrive_hal", "Serial write error on {}: {}", writer_path.display(), e);
                    }
                    if done_tx.send((request.seq, result)).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            path,
            write_tx,
            done_rx,
            write_timeout,
            next_seq: 0,
            rx,
            pending: VecDeque::new(),
            disconnected: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn pump(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(chunk) => self.pending.extend(chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }
    }

    fn write_timed_out(&self) -> io::Error {
        io::Error::new(
            io::ErrorKind::TimedOut,
            format!("write to {} not done within {:?}", self.path.display(), self.write_timeout),
        )
    }

    fn writer_stopped(&self) -> io::Error {
        io::Error::new(
            io::ErrorKind::BrokenPipe,
            format!("serial writer for {} has stopped", self.path.display()),
        )
    }
}

impl SerialIO for DeviceSerial {
    type Error = io::Error;

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        let deadline = Instant::now() + self.write_timeout;
        self.next_seq += 1;
        let seq = self.next_seq;

        let request = WriteRequest {
            seq,
            data: data.to_vec(),
        };
        match self.write_tx.send_timeout(request, self.write_timeout) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => return Err(self.write_timed_out()),
            Err(SendTimeoutError::Disconnected(_)) => return Err(self.writer_stopped()),
        }

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.done_rx.recv_timeout(remaining) {
                Ok((done, result)) if done == seq => return result,
                // completion of an earlier write that already timed out
                Ok((done, _)) => trace!(target: "eyedrive_hal", "Late write #{} completed", done),
                Err(RecvTimeoutError::Timeout) => return Err(self.write_timed_out()),
                Err(RecvTimeoutError::Disconnected) => return Err(self.writer_stopped()),
            }
        }
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        self.pump();
        if self.pending.is_empty() && self.disconnected {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("serial reader for {} has stopped", self.path.display()),
            ));
        }

        let n = buffer.len().min(self.pending.len());
        for (slot, byte) in buffer.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    /// Every write is flushed by the writer thread before it completes
    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn is_timeout(error: &Self::Error) -> bool {
        error.kind() == io::ErrorKind::TimedOut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Sink that takes `delay` for every write
    struct SlowWriter {
        delay: Duration,
        written: Arc<AtomicUsize>,
    }

    impl Write for SlowWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            thread::sleep(self.delay);
            self.written.fetch_add(buf.len(), Ordering::SeqCst);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn port_with_writer(delay: Duration, timeout: Duration) -> (DeviceSerial, Arc<AtomicUsize>) {
        let written = Arc::new(AtomicUsize::new(0));
        let writer = SlowWriter {
            delay,
            written: Arc::clone(&written),
        };
        let port = DeviceSerial::from_parts(
            PathBuf::from("test-port"),
            io::empty(),
            writer,
            timeout,
        )
        .unwrap();
        (port, written)
    }

    #[test]
    fn test_open_missing_device_fails() {
        assert!(DeviceSerial::open("/nonexistent/ttyEYEDRIVE", Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_write_completes_within_timeout() {
        let (mut port, written) = port_with_writer(Duration::ZERO, Duration::from_millis(500));
        assert_eq!(port.write(b"F").unwrap(), 1);
        assert_eq!(port.write(b"LR").unwrap(), 2);
        assert_eq!(written.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_stalled_write_returns_after_timeout() {
        let (mut port, _) = port_with_writer(Duration::from_millis(400), Duration::from_millis(30));

        let started = Instant::now();
        let err = port.write(b"S").unwrap_err();
        assert!(DeviceSerial::is_timeout(&err));
        assert!(started.elapsed() < Duration::from_millis(200));
    }

    #[test]
    fn test_late_completion_is_not_taken_for_the_next_write() {
        let (mut port, _) = port_with_writer(Duration::from_millis(60), Duration::from_millis(20));
        assert!(port.write(b"S").is_err());

        // the first write finishes while this one waits; its result must be skipped
        thread::sleep(Duration::from_millis(80));
        let err = port.write(b"F").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[cfg(unix)]
    #[test]
    fn test_reads_are_non_blocking() {
        // /dev/null reads EOF immediately, so the reader thread ends and the
        // port reports the disconnect instead of blocking.
        let mut serial = DeviceSerial::open("/dev/null", Duration::from_millis(500)).unwrap();
        assert_eq!(serial.write(b"F").unwrap(), 1);

        let mut buf = [0u8; 8];
        let deadline = Instant::now() + Duration::from_secs(1);
        loop {
            match serial.read(&mut buf) {
                Ok(0) if Instant::now() < deadline => thread::sleep(Duration::from_millis(1)),
                Ok(n) => panic!("unexpected {} bytes from /dev/null", n),
                Err(e) => {
                    assert_eq!(e.kind(), io::ErrorKind::BrokenPipe);
                    break;
                }
            }
        }
    }
}
