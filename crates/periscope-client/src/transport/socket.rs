//! Newline-delimited JSON sessions over TCP or Unix domain sockets.
//!
//! On connect the client writes a single handshake line,
//! `{"handshake": <identity>}`, and from then on every line in either
//! direction is one protocol message.

use std::io::{self, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use periscope_config::{ClientIdentity, Config, SocketEndpoint};
use serde::Serialize;
use tracing::debug;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

use super::framing::{read_frame, write_frame};
use super::{Connector, Duplex, MessageReceiver, MessageSender, TRANSPORT_TARGET, TransportError};

/// Time allowed for a TCP connection attempt before it counts as failed.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Stream types the socket connector can open.
enum SessionStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl SessionStream {
    fn try_clone(&self) -> io::Result<Self> {
        match self {
            Self::Tcp(stream) => stream.try_clone().map(Self::Tcp),
            #[cfg(unix)]
            Self::Unix(stream) => stream.try_clone().map(Self::Unix),
        }
    }

    fn shutdown(&self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            Self::Unix(stream) => stream.shutdown(Shutdown::Both),
        }
    }
}

impl Read for SessionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for SessionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

#[derive(Serialize)]
struct Handshake<'a> {
    handshake: &'a ClientIdentity,
}

/// Connector dialling a [`SocketEndpoint`].
#[derive(Debug, Clone)]
pub struct SocketConnector {
    endpoint: SocketEndpoint,
    connect_timeout: Duration,
}

impl SocketConnector {
    /// Creates a connector for `endpoint`.
    #[must_use]
    pub fn new(endpoint: SocketEndpoint) -> Self {
        Self {
            endpoint,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Creates a connector for the endpoint named in `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.desktop_endpoint().clone())
    }

    /// Overrides the TCP connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn open(&self) -> Result<SessionStream, TransportError> {
        match &self.endpoint {
            SocketEndpoint::Tcp { host, port } => self.open_tcp(host, *port),
            SocketEndpoint::Unix { path } => {
                #[cfg(unix)]
                {
                    UnixStream::connect(path.as_std_path())
                        .map(SessionStream::Unix)
                        .map_err(|source| TransportError::connect(self.describe(), source))
                }

                #[cfg(not(unix))]
                {
                    Err(TransportError::refused(
                        self.describe(),
                        format!("unix sockets are unsupported for {path}"),
                    ))
                }
            }
        }
    }

    fn open_tcp(&self, host: &str, port: u16) -> Result<SessionStream, TransportError> {
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|source| TransportError::connect(self.describe(), source))?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    return Ok(SessionStream::Tcp(stream));
                }
                Err(error) => last_error = Some(error),
            }
        }

        Err(match last_error {
            Some(source) => TransportError::connect(self.describe(), source),
            None => TransportError::refused(self.describe(), "no addresses resolved"),
        })
    }
}

impl Connector for SocketConnector {
    fn connect(&self, identity: &ClientIdentity) -> Result<Duplex, TransportError> {
        let mut stream = self.open()?;
        let handshake = serde_json::to_string(&Handshake {
            handshake: identity,
        })
        .map_err(|error| TransportError::Handshake(error.into()))?;
        write_frame(&mut stream, &handshake)?;
        debug!(
            target: TRANSPORT_TARGET,
            endpoint = %self.endpoint,
            "handshake sent"
        );

        let reader = stream.try_clone()?;
        let shutdown = stream.try_clone()?;
        Ok(Duplex::new(
            SocketSender {
                stream: Mutex::new(stream),
                shutdown,
            },
            SocketReceiver {
                reader: BufReader::new(reader),
            },
        ))
    }

    fn describe(&self) -> String {
        self.endpoint.to_string()
    }
}

/// Writing half of a socket session.
///
/// `shutdown` is a separate handle on the same socket so closing never waits
/// for a writer blocked on a peer that stopped reading.
struct SocketSender {
    stream: Mutex<SessionStream>,
    shutdown: SessionStream,
}

impl MessageSender for SocketSender {
    fn send(&self, message: &str) -> Result<(), TransportError> {
        let mut stream = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        write_frame(&mut *stream, message).map_err(TransportError::from)
    }

    fn close(&self) {
        if let Err(error) = self.shutdown.shutdown()
            && error.kind() != io::ErrorKind::NotConnected
        {
            debug!(target: TRANSPORT_TARGET, %error, "socket shutdown failed");
        }
    }
}

struct SocketReceiver {
    reader: BufReader<SessionStream>,
}

impl MessageReceiver for SocketReceiver {
    fn recv(&mut self) -> Result<Option<String>, TransportError> {
        read_frame(&mut self.reader)
    }
}
