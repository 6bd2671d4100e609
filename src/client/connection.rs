//! Channel Connection
//!
//! Line-oriented command/response framing over a duplex byte stream.
//! Commands go out as one write terminated by `\r\n`; responses are read one
//! byte at a time up to `\n` so that nothing past the current line is consumed.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::backend::{BackendError, BackendResult};
use crate::util::truncate_str;

/// Terminator appended to every command
const COMMAND_TERMINATOR: &[u8] = b"\r\n";

/// How much of a command line is kept in debug logs
const LOG_LINE_LIMIT: usize = 120;

/// Command family a connection is authorized for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Ingest,
    Search,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingest => "ingest",
            Self::Search => "search",
        }
    }
}

/// Read one response line, stripped of its terminator and trailing whitespace
///
/// Reads a single byte at a time and stops right after `\n`, so the next read
/// starts exactly at the following line. A stream that closes before any byte
/// arrives is a transport failure; a stream that closes mid-line yields the
/// partial line.
pub fn read_line<R: Read>(reader: &mut R) -> BackendResult<String> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        match reader.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                line.push(byte[0]);
                if byte[0] == b'\n' {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(BackendError::Transport(e)),
        }
    }

    if line.is_empty() {
        return Err(BackendError::Transport(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before a response line was received",
        )));
    }

    let text = String::from_utf8(line)
        .map_err(|_| BackendError::protocol("response line is not valid UTF-8"))?;
    Ok(text.trim_end().to_string())
}

/// Write a command followed by the line terminator as a single write
pub fn send_command<W: Write>(writer: &mut W, command: &str) -> BackendResult<()> {
    let mut buf = Vec::with_capacity(command.len() + COMMAND_TERMINATOR.len());
    buf.extend_from_slice(command.as_bytes());
    buf.extend_from_slice(COMMAND_TERMINATOR);

    writer.write_all(&buf)?;
    writer.flush()?;
    Ok(())
}

/// Open a TCP stream to the daemon, trying every resolved address in order
///
/// A zero timeout means "no timeout".
pub fn connect(
    host: &str,
    port: u16,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> BackendResult<TcpStream> {
    let addrs: Vec<_> = (host, port).to_socket_addrs()?.collect();
    if addrs.is_empty() {
        return Err(BackendError::Transport(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no address found for {}:{}", host, port),
        )));
    }

    let mut last_err = None;
    for addr in addrs {
        let attempt = if connect_timeout.is_zero() {
            TcpStream::connect(addr)
        } else {
            TcpStream::connect_timeout(&addr, connect_timeout)
        };

        match attempt {
            Ok(stream) => {
                let timeout = (!read_timeout.is_zero()).then_some(read_timeout);
                stream.set_read_timeout(timeout)?;
                stream.set_write_timeout(timeout)?;
                stream.set_nodelay(true)?;
                debug!("Connected to search daemon at {}", addr);
                return Ok(stream);
            }
            Err(e) => {
                debug!("Connection to {} failed: {}", addr, e);
                last_err = Some(e);
            }
        }
    }

    Err(BackendError::Transport(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::ConnectionRefused, "connection failed")
    })))
}

/// An authenticated connection to one channel of the daemon
///
/// The stream is owned, so dropping the connection closes it on every exit
/// path, including early returns through `?`.
#[derive(Debug)]
pub struct ChannelConnection<S: Read + Write = TcpStream> {
    stream: S,
    channel: Channel,
}

impl<S: Read + Write> ChannelConnection<S> {
    /// Run the handshake on a freshly opened stream
    ///
    /// Reads and discards the greeting, sends `START <channel> <password>` and
    /// reads the acknowledgement. An `ERR` or `ENDED` acknowledgement (bad
    /// password, unknown channel) is reported as a protocol error.
    pub fn start(mut stream: S, channel: Channel, password: &str) -> BackendResult<Self> {
        let greeting = read_line(&mut stream)?;
        debug!("Daemon greeting: {}", greeting);

        send_command(&mut stream, &format!("START {} {}", channel.as_str(), password))?;
        let ack = read_line(&mut stream)?;
        if is_error(&ack) || ack.starts_with("ENDED") {
            return Err(BackendError::protocol(format!(
                "{} channel refused: {}",
                channel.as_str(),
                ack
            )));
        }
        debug!("Channel {} started: {}", channel.as_str(), ack);

        Ok(Self { stream, channel })
    }

    /// The channel this connection was started on
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Send a command without reading a response
    pub fn send(&mut self, command: &str) -> BackendResult<()> {
        debug!(channel = self.channel.as_str(), "> {}", truncate_str(command, LOG_LINE_LIMIT));
        send_command(&mut self.stream, command)
    }

    /// Read the next response line
    pub fn read_line(&mut self) -> BackendResult<String> {
        let line = read_line(&mut self.stream)?;
        debug!(channel = self.channel.as_str(), "< {}", truncate_str(&line, LOG_LINE_LIMIT));
        Ok(line)
    }

    /// Send a command and read exactly one response line
    pub fn command(&mut self, command: &str) -> BackendResult<String> {
        self.send(command)?;
        self.read_line()
    }

    /// Give back the underlying stream
    pub fn into_inner(self) -> S {
        self.stream
    }
}

/// Whether a response line reports an error
pub fn is_error(line: &str) -> bool {
    line.split_whitespace().next() == Some("ERR")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// In-memory duplex stream: scripted input, captured writes
    #[derive(Debug)]
    struct ScriptedStream {
        input: Cursor<Vec<u8>>,
        writes: Vec<Vec<u8>>,
    }

    impl ScriptedStream {
        fn new(input: &str) -> Self {
            Self {
                input: Cursor::new(input.as_bytes().to_vec()),
                writes: Vec::new(),
            }
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes.push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_read_line_stops_at_terminator() {
        let mut stream = ScriptedStream::new("PENDING abc\r\nEVENT QUERY abc x y\r\n");

        assert_eq!(read_line(&mut stream).unwrap(), "PENDING abc");
        // the second line must still be fully available
        assert_eq!(stream.input.position(), 13);
        assert_eq!(read_line(&mut stream).unwrap(), "EVENT QUERY abc x y");
    }

    #[test]
    fn test_read_line_partial_line_at_eof() {
        let mut stream = ScriptedStream::new("RESULT 3");
        assert_eq!(read_line(&mut stream).unwrap(), "RESULT 3");
    }

    #[test]
    fn test_read_line_closed_stream_is_transport_error() {
        let mut stream = ScriptedStream::new("");
        let err = read_line(&mut stream).unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
        assert_eq!(err.kind(), "TransportError");
    }

    #[test]
    fn test_send_command_single_write_with_crlf() {
        let mut stream = ScriptedStream::new("");
        send_command(&mut stream, "FLUSHB documents idx").unwrap();

        assert_eq!(stream.writes.len(), 1);
        assert_eq!(stream.writes[0], b"FLUSHB documents idx\r\n");
    }

    #[test]
    fn test_start_handshake() {
        let stream = ScriptedStream::new(
            "CONNECTED <sonic-server v1.4.0>\r\nSTARTED ingest protocol(1) buffer(20000)\r\nOK\r\n",
        );

        let mut conn = ChannelConnection::start(stream, Channel::Ingest, "secret").unwrap();
        assert_eq!(conn.channel(), Channel::Ingest);
        assert_eq!(conn.command("PUSH documents idx a \"b\"").unwrap(), "OK");

        let stream = conn.into_inner();
        assert_eq!(stream.writes[0], b"START ingest secret\r\n");
        assert_eq!(stream.writes[1], b"PUSH documents idx a \"b\"\r\n");
    }

    #[test]
    fn test_start_rejected() {
        let stream = ScriptedStream::new(
            "CONNECTED <sonic-server v1.4.0>\r\nERR authentication_failed\r\n",
        );

        let err = ChannelConnection::start(stream, Channel::Search, "wrong").unwrap_err();
        assert_eq!(err.kind(), "ProtocolError");
        assert!(err.to_string().contains("authentication_failed"));
    }

    #[test]
    fn test_is_error() {
        assert!(is_error("ERR buffer_overflow"));
        assert!(!is_error("ERRATIC"));
        assert!(!is_error("OK"));
    }
}
