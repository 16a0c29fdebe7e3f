//! Redirection policies for a child's standard streams, and the workers
//! that move data between those streams and application closures.

use super::TextEncoding;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::panic::{self, AssertUnwindSafe};

/// Size of the buffer used by binary output pumps.
pub const IO_BUFFER_SIZE: usize = 64 * 1024;

/// Where a child's standard input comes from.
pub enum InputRedirect<'a> {
    /// Chunks produced by the closure; an empty chunk ends the input.
    Binary(Box<dyn FnMut() -> Vec<u8> + Send + 'a>),
    /// Lines produced by the closure, each written with a trailing `\n`;
    /// `None` ends the input.
    Text(Box<dyn FnMut() -> Option<String> + Send + 'a>),
    /// Close the input immediately without writing anything.
    Null,
}

impl<'a> InputRedirect<'a> {
    pub fn binary(producer: impl FnMut() -> Vec<u8> + Send + 'a) -> Self {
        Self::Binary(Box::new(producer))
    }

    pub fn text(producer: impl FnMut() -> Option<String> + Send + 'a) -> Self {
        Self::Text(Box::new(producer))
    }

    /// Feed the given lines, then close the input.
    pub fn lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: Send + 'a,
    {
        let mut lines = lines.into_iter();
        Self::text(move || lines.next())
    }
}

impl std::fmt::Debug for InputRedirect<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binary(_) => f.write_str("InputRedirect::Binary"),
            Self::Text(_) => f.write_str("InputRedirect::Text"),
            Self::Null => f.write_str("InputRedirect::Null"),
        }
    }
}

/// Where one of a child's output streams goes.
pub enum OutputRedirect<'a> {
    /// Raw chunks, at most [`IO_BUFFER_SIZE`] bytes each.
    Binary(Box<dyn FnMut(&[u8]) + Send + 'a>),
    /// Whole lines without their terminator. `\n`, `\r\n` and a lone `\r`
    /// all end a line, so ffmpeg's carriage-return progress updates arrive
    /// one per call.
    Text(Box<dyn FnMut(&str) + Send + 'a>),
}

impl<'a> OutputRedirect<'a> {
    pub fn binary(consumer: impl FnMut(&[u8]) + Send + 'a) -> Self {
        Self::Binary(Box::new(consumer))
    }

    pub fn text(consumer: impl FnMut(&str) + Send + 'a) -> Self {
        Self::Text(Box::new(consumer))
    }

    /// Forward every line to `tracing` at debug level.
    pub fn log_lines(stream: &'static str) -> Self {
        Self::text(move |line| tracing::debug!(stream, "{}", line))
    }
}

impl std::fmt::Debug for OutputRedirect<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binary(_) => f.write_str("OutputRedirect::Binary"),
            Self::Text(_) => f.write_str("OutputRedirect::Text"),
        }
    }
}

/// Write everything the producer yields into `sink`, then close it.
///
/// A child that stops reading early closes its end of the pipe; the
/// resulting broken pipe ends the feed quietly instead of failing the run.
pub(crate) fn feed_input<W: Write>(redirect: InputRedirect<'_>, mut sink: W) -> io::Result<()> {
    let result = match redirect {
        InputRedirect::Binary(mut produce) => loop {
            let chunk = produce();
            if chunk.is_empty() {
                break Ok(());
            }
            if let Err(e) = sink.write_all(&chunk) {
                break Err(e);
            }
        },
        InputRedirect::Text(mut produce) => loop {
            let Some(mut line) = produce() else {
                break Ok(());
            };
            line.push('\n');
            if let Err(e) = sink.write_all(line.as_bytes()).and_then(|_| sink.flush()) {
                break Err(e);
            }
        },
        InputRedirect::Null => Ok(()),
    };

    match result.and_then(|_| sink.flush()) {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            tracing::debug!("child closed its input before the feed finished");
            Ok(())
        }
        other => other,
    }
}

/// Drain `source` to end-of-stream, handing each chunk or line to the
/// redirect's handler.
///
/// A panicking handler is disabled for the rest of the stream but draining
/// continues, so the child never blocks on a full pipe. Read failures are
/// returned.
pub(crate) fn pump_output<R: Read>(
    redirect: OutputRedirect<'_>,
    mut source: R,
    encoding: TextEncoding,
    stream: &'static str,
) -> io::Result<()> {
    let mut guard = HandlerGuard::new(stream);

    match redirect {
        OutputRedirect::Binary(mut handler) => {
            let mut buffer = vec![0u8; IO_BUFFER_SIZE];
            loop {
                let length = match source.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                };
                guard.invoke(|| handler(&buffer[..length]));
            }
        }
        OutputRedirect::Text(mut handler) => {
            let mut reader = LineReader::new(source);
            let mut raw = Vec::new();
            while reader.read_line(&mut raw)? {
                match encoding {
                    TextEncoding::Utf8 => {
                        let line = std::str::from_utf8(&raw)
                            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                        guard.invoke(|| handler(line));
                    }
                    TextEncoding::Utf8Lossy => {
                        let line = String::from_utf8_lossy(&raw);
                        guard.invoke(|| handler(&line));
                    }
                }
            }
        }
    }

    Ok(())
}

struct HandlerGuard {
    stream: &'static str,
    disabled: bool,
}

impl HandlerGuard {
    fn new(stream: &'static str) -> Self {
        Self {
            stream,
            disabled: false,
        }
    }

    fn invoke(&mut self, call: impl FnOnce()) {
        if self.disabled {
            return;
        }
        if panic::catch_unwind(AssertUnwindSafe(call)).is_err() {
            tracing::warn!(
                "{} handler panicked; discarding the rest of the stream",
                self.stream
            );
            self.disabled = true;
        }
    }
}

/// Line splitter over a byte stream that treats `\n`, `\r\n` and a lone
/// `\r` as terminators.
pub(crate) struct LineReader<R> {
    inner: BufReader<R>,
    skip_lf: bool,
}

impl<R: Read> LineReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner: BufReader::with_capacity(IO_BUFFER_SIZE, inner),
            skip_lf: false,
        }
    }

    /// Read the next line into `line`, without its terminator.
    ///
    /// Returns `false` at end-of-stream. A trailing unterminated line is
    /// still returned.
    pub(crate) fn read_line(&mut self, line: &mut Vec<u8>) -> io::Result<bool> {
        line.clear();
        loop {
            let available = match self.inner.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                return Ok(!line.is_empty());
            }

            if self.skip_lf {
                self.skip_lf = false;
                if available[0] == b'\n' {
                    self.inner.consume(1);
                    continue;
                }
            }

            match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(end) => {
                    line.extend_from_slice(&available[..end]);
                    self.skip_lf = available[end] == b'\r';
                    self.inner.consume(end + 1);
                    return Ok(true);
                }
                None => {
                    let length = available.len();
                    line.extend_from_slice(available);
                    self.inner.consume(length);
                }
            }
        }
    }
}
