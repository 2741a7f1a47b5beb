use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that remembers the last byte sent to `write`
pub struct RememberingStream<W> {
    inner: W,
    last_byte: Option<u8>,
}

impl<W: Write> RememberingStream<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            last_byte: None,
        }
    }

    pub fn last_byte(&self) -> Option<u8> {
        self.last_byte
    }

    /// Whether the next byte written would begin a line. An untouched stream counts.
    pub fn at_line_start(&self) -> bool {
        matches!(self.last_byte(), None | Some(b'\n'))
    }
}

impl<W: Write> Write for RememberingStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        if written > 0 {
            self.last_byte = Some(buf[written - 1]);
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Cloneable handle to the process error stream
///
/// Log lines and raw output (such as test runner progress) must share one
/// handle so the newline guard observes every byte.
#[derive(Clone)]
pub struct SharedStream {
    inner: Arc<Mutex<RememberingStream<Box<dyn Write + Send>>>>,
}

impl SharedStream {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RememberingStream::new(Box::new(writer)))),
        }
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    fn lock(&self) -> MutexGuard<'_, RememberingStream<Box<dyn Write + Send>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[allow(dead_code)]
    pub fn at_line_start(&self) -> bool {
        self.lock().at_line_start()
    }

    /// Write `line` so that it begins at the start of a line
    pub fn write_line(&self, line: &[u8]) -> io::Result<()> {
        let mut stream = self.lock();
        if !stream.at_line_start() {
            stream.write_all(b"\n")?;
        }
        stream.write_all(line)?;
        stream.flush()
    }
}

impl Write for SharedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

/// `MakeWriter` for log records that always start on a fresh line
#[derive(Clone)]
pub struct LogSink {
    stream: SharedStream,
}

impl LogSink {
    pub fn new(stream: SharedStream) -> Self {
        Self { stream }
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = LogRecordWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogRecordWriter {
            stream: self.stream.clone(),
            buf: Vec::new(),
        }
    }
}

/// Buffers one formatted record and hands it to the stream on drop
pub struct LogRecordWriter {
    stream: SharedStream,
    buf: Vec<u8>,
}

impl Write for LogRecordWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LogRecordWriter {
    fn drop(&mut self) {
        if !self.buf.is_empty() {
            // A record that cannot reach stderr has nowhere else to be reported.
            let _ = self.stream.write_line(&self.buf);
        }
    }
}
