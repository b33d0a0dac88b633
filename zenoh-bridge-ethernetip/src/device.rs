//! Device session.
//!
//! A single task owns the TCP connection to the controller and serves
//! requests from a command channel, one at a time. [`DeviceSession`] is the
//! cloneable handle workers use to talk to it.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::cip::{
    self, CMD_REGISTER_SESSION, CMD_SEND_RR_DATA, CMD_UNREGISTER_SESSION, CipError,
    EncapsulationHeader, HEADER_LEN, RawValue, SymbolEntry, WireValue,
};
use crate::directory::Tag;

const COMMAND_QUEUE: usize = 32;

/// Tag-level access to a device.
pub trait TagSession: Send + Sync {
    /// Read the current value of a tag.
    fn read_tag(&self, tag: &Tag) -> impl Future<Output = Result<RawValue, CipError>> + Send;

    /// Write an encoded value to a tag, returning the device status.
    fn write_tag(
        &self,
        tag: &Tag,
        value: WireValue,
    ) -> impl Future<Output = Result<u8, CipError>> + Send;
}

/// A registered EtherNet/IP session over TCP.
pub struct CipClient {
    stream: TcpStream,
    session_handle: u32,
}

impl CipClient {
    /// Connect and register a session.
    pub async fn connect(addr: SocketAddr) -> Result<Self, CipError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;

        let mut client = Self {
            stream,
            session_handle: 0,
        };

        let (header, _) = client
            .transact(CMD_REGISTER_SESSION, &cip::register_session_data())
            .await?;
        if header.session_handle == 0 {
            return Err(CipError::Malformed(
                "device returned a null session handle".to_string(),
            ));
        }
        client.session_handle = header.session_handle;

        debug!(
            "Registered session 0x{:08X} with {}",
            client.session_handle, addr
        );
        Ok(client)
    }

    pub fn session_handle(&self) -> u32 {
        self.session_handle
    }

    async fn transact(
        &mut self,
        command: u16,
        data: &[u8],
    ) -> Result<(EncapsulationHeader, Vec<u8>), CipError> {
        let frame = cip::encapsulate(command, self.session_handle, data)?;
        self.stream.write_all(&frame).await?;

        let mut header = [0u8; HEADER_LEN];
        self.stream.read_exact(&mut header).await?;
        let header = EncapsulationHeader::decode(&header)?;

        let mut body = vec![0u8; header.length as usize];
        self.stream.read_exact(&mut body).await?;

        if header.command != command {
            return Err(CipError::Malformed(format!(
                "reply command 0x{:04X} does not match request 0x{:04X}",
                header.command, command
            )));
        }
        if header.status != 0 {
            return Err(CipError::Encapsulation(header.status));
        }

        Ok((header, body))
    }

    async fn request(&mut self, cip: &[u8]) -> Result<Vec<u8>, CipError> {
        let (_, body) = self
            .transact(CMD_SEND_RR_DATA, &cip::send_rr_data(cip)?)
            .await?;
        Ok(cip::unwrap_rr_data(&body)?.to_vec())
    }

    pub async fn read_tag(&mut self, name: &str) -> Result<RawValue, CipError> {
        let reply = self.request(&cip::read_tag_request(name, 1)?).await?;
        cip::parse_read_tag_reply(&reply)
    }

    pub async fn write_tag(&mut self, name: &str, value: &WireValue) -> Result<u8, CipError> {
        let reply = self.request(&cip::write_tag_request(name, value)?).await?;
        cip::parse_write_tag_reply(&reply)
    }

    /// Enumerate the controller symbol table, following partial transfers.
    pub async fn list_symbols(&mut self) -> Result<Vec<SymbolEntry>, CipError> {
        let mut symbols = Vec::new();
        let mut start = 0u32;

        loop {
            let reply = self.request(&cip::list_symbols_request(start)?).await?;
            let page = cip::parse_list_symbols_reply(&reply)?;
            let last = page.entries.last().map(|entry| entry.instance_id);
            symbols.extend(page.entries);

            match (page.more, last.and_then(|id| id.checked_add(1))) {
                (true, Some(next)) => start = next,
                _ => break,
            }
        }

        Ok(symbols)
    }

    /// Unregister the session and close the socket. The device sends no reply.
    pub async fn unregister(mut self) -> Result<(), CipError> {
        let frame = cip::encapsulate(CMD_UNREGISTER_SESSION, self.session_handle, &[])?;
        self.stream.write_all(&frame).await?;
        self.stream.shutdown().await?;
        Ok(())
    }
}

enum Command {
    Read {
        tag: String,
        reply: oneshot::Sender<Result<RawValue, CipError>>,
    },
    Write {
        tag: String,
        value: WireValue,
        reply: oneshot::Sender<Result<u8, CipError>>,
    },
    ListSymbols {
        reply: oneshot::Sender<Result<Vec<SymbolEntry>, CipError>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to the device session task.
#[derive(Debug, Clone)]
pub struct DeviceSession {
    tx: mpsc::Sender<Command>,
    endpoint: SocketAddr,
}

impl DeviceSession {
    /// Resolve the endpoint, open the session and start the session task.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, CipError> {
        let addr = resolve(host, port).await?;
        let client = within(timeout, CipClient::connect(addr)).await?;
        info!(
            "Connected to EtherNet/IP device {} (session 0x{:08X})",
            addr,
            client.session_handle()
        );

        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        let task = SessionTask {
            addr,
            timeout,
            client: Some(client),
            rx,
        };
        tokio::spawn(task.run());

        Ok(Self { tx, endpoint: addr })
    }

    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    /// Enumerate the controller's symbols.
    pub async fn list_symbols(&self) -> Result<Vec<SymbolEntry>, CipError> {
        self.call(|reply| Command::ListSymbols { reply }).await
    }

    /// Unregister and stop the session task.
    pub async fn close(&self) {
        let (reply, done) = oneshot::channel();
        if self.tx.send(Command::Close { reply }).await.is_ok() {
            let _ = done.await;
        }
    }

    async fn call<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<T, CipError>>) -> Command,
    ) -> Result<T, CipError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| CipError::SessionClosed)?;
        rx.await.map_err(|_| CipError::SessionClosed)?
    }
}

impl TagSession for DeviceSession {
    async fn read_tag(&self, tag: &Tag) -> Result<RawValue, CipError> {
        let name = tag.name.clone();
        self.call(|reply| Command::Read { tag: name, reply }).await
    }

    async fn write_tag(&self, tag: &Tag, value: WireValue) -> Result<u8, CipError> {
        let name = tag.name.clone();
        self.call(|reply| Command::Write {
            tag: name,
            value,
            reply,
        })
        .await
    }
}

struct SessionTask {
    addr: SocketAddr,
    timeout: Duration,
    client: Option<CipClient>,
    rx: mpsc::Receiver<Command>,
}

impl SessionTask {
    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Read { tag, reply } => {
                    let result = self.read(&tag).await;
                    let _ = reply.send(result);
                }
                Command::Write { tag, value, reply } => {
                    let result = self.write(&tag, &value).await;
                    let _ = reply.send(result);
                }
                Command::ListSymbols { reply } => {
                    let result = self.list_symbols().await;
                    let _ = reply.send(result);
                }
                Command::Close { reply } => {
                    self.shutdown().await;
                    let _ = reply.send(());
                    return;
                }
            }
        }

        self.shutdown().await;
    }

    async fn read(&mut self, tag: &str) -> Result<RawValue, CipError> {
        let timeout = self.timeout;
        let client = self.client().await?;
        let result = within(timeout, client.read_tag(tag)).await;
        self.check(result)
    }

    async fn write(&mut self, tag: &str, value: &WireValue) -> Result<u8, CipError> {
        let timeout = self.timeout;
        let client = self.client().await?;
        let result = within(timeout, client.write_tag(tag, value)).await;
        self.check(result)
    }

    async fn list_symbols(&mut self) -> Result<Vec<SymbolEntry>, CipError> {
        let timeout = self.timeout;
        let client = self.client().await?;
        let result = within(timeout, client.list_symbols()).await;
        self.check(result)
    }

    /// The live connection, reconnecting if the previous one failed.
    async fn client(&mut self) -> Result<&mut CipClient, CipError> {
        if self.client.is_none() {
            info!("Reconnecting to EtherNet/IP device {}", self.addr);
            let client = within(self.timeout, CipClient::connect(self.addr)).await?;
            self.client = Some(client);
        }
        self.client.as_mut().ok_or(CipError::SessionClosed)
    }

    fn check<T>(&mut self, result: Result<T, CipError>) -> Result<T, CipError> {
        match &result {
            Err(e) if e.is_connection_fault() => {
                warn!("Dropping connection to {}: {}", self.addr, e);
                self.client = None;
            }
            _ => {}
        }
        result
    }

    async fn shutdown(&mut self) {
        if let Some(client) = self.client.take() {
            match client.unregister().await {
                Ok(()) => info!("Closed EtherNet/IP session with {}", self.addr),
                Err(e) => debug!("Unregister failed: {}", e),
            }
        }
    }
}

async fn within<T>(
    timeout: Duration,
    fut: impl Future<Output = Result<T, CipError>>,
) -> Result<T, CipError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| CipError::Timeout(timeout))?
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, CipError> {
    let resolve_error = |message: String| CipError::Resolve {
        host: host.to_string(),
        message,
    };

    tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| resolve_error(e.to_string()))?
        .next()
        .ok_or_else(|| resolve_error("no addresses found".to_string()))
}
