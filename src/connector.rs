//! Opening authenticated sessions.

use std::io::{Read, Write};

use crate::client::{Client, Session};
use crate::config::Account;
use crate::error::{Error, Result};
use crate::store::MailStore;

#[cfg(feature = "native-tls")]
pub use self::tls::TlsConnector;

/// Something that can open an authenticated session for an [`Account`].
///
/// Failing to reach the server is an [`Error::Connect`], a rejected login an [`Error::Auth`].
pub trait Connector {
    /// The session type handed to the engine.
    type Store: MailStore;

    /// Connect and log in.
    fn open(&self, account: &Account) -> Result<Self::Store>;
}

/// Read the greeting on an already connected `stream` and log in as `account`.
///
/// This is the part of [`Connector::open`] that does not depend on the transport, and is what
/// custom connectors (a proxy, a local plaintext test server, ...) should call once they have a
/// stream.
pub fn login<T: Read + Write>(stream: T, account: &Account) -> Result<Session<T>> {
    let mut client = Client::new(stream);
    client.read_greeting().map_err(Error::Connect)?;
    client
        .login(&account.username, &account.password)
        .map_err(Error::Auth)
}

#[cfg(feature = "native-tls")]
mod tls {
    use std::io;
    use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
    use std::time::Duration;

    use native_tls::TlsStream;

    use super::{login, Connector};
    use crate::client::Session;
    use crate::config::Account;
    use crate::error::{Error, ProtocolError, ProtocolResult, Result};

    /// Implicit TLS over TCP, the usual way of talking to port 993.
    ///
    /// ```no_run
    /// # use mailtoken::{Account, Connector, TlsConnector};
    /// # fn main() -> Result<(), mailtoken::Error> {
    /// let account = Account::new("imap.example.com", "qa@example.com", "hunter2");
    /// let session = TlsConnector::new().open(&account)?;
    /// # Ok(())
    /// # }
    /// ```
    #[derive(Clone, Copy, Debug, Default)]
    pub struct TlsConnector {
        debug: bool,
    }

    impl TlsConnector {
        /// A connector that verifies certificates unless the account says otherwise.
        pub fn new() -> Self {
            TlsConnector::default()
        }

        /// Trace the protocol conversation of every session this connector opens.
        pub fn debug(mut self, debug: bool) -> Self {
            self.debug = debug;
            self
        }
    }

    impl Connector for TlsConnector {
        type Store = Session<TlsStream<TcpStream>>;

        fn open(&self, account: &Account) -> Result<Self::Store> {
            let tls = handshake(account).map_err(Error::Connect)?;
            let mut session = login(tls, account)?;
            session.debug = self.debug;
            Ok(session)
        }
    }

    fn handshake(account: &Account) -> ProtocolResult<TlsStream<TcpStream>> {
        let tcp = connect_tcp(account)?;

        let mut builder = native_tls::TlsConnector::builder();
        builder
            .danger_accept_invalid_certs(account.accept_invalid_certs)
            .danger_accept_invalid_hostnames(account.accept_invalid_certs);
        let ssl_conn = builder.build()?;

        Ok(ssl_conn.connect(&account.host, tcp)?)
    }

    fn connect_tcp(account: &Account) -> ProtocolResult<TcpStream> {
        let addr = (account.host.as_str(), account.port);
        let tcp = match account.connect_timeout {
            Some(timeout) => connect_all_timeout(addr, timeout)?,
            None => TcpStream::connect(addr)?,
        };

        // the handshake and every later command are bounded by these
        tcp.set_read_timeout(account.read_timeout)?;
        tcp.set_write_timeout(account.write_timeout)?;
        Ok(tcp)
    }

    // `TcpStream::connect_timeout` takes a single address, so resolve first and try each in turn
    fn connect_all_timeout<A: ToSocketAddrs>(addr: A, timeout: Duration) -> ProtocolResult<TcpStream> {
        let addrs: Vec<SocketAddr> = addr.to_socket_addrs()?.collect();

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(tcp) => return Ok(tcp),
                Err(error) => {
                    log::debug!("couldn't connect to {}: {}", addr, error);
                    last_error = Some(error);
                }
            }
        }

        Err(ProtocolError::Io(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "host name did not resolve to any address")
        })))
    }

}
