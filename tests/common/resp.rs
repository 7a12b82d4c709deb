//! Scripted Redis server speaking just enough RESP for the relay.
//!
//! - `PING` answers `+PONG` (or a `-LOADING` error when configured)
//! - `BLPOP key secs` hands out payloads queued with [`MockRedis::push`],
//!   replying nil when none arrives within the requested wait
//! - Anything else (e.g. `CLIENT SETINFO` at connect) answers `+OK`

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct Shared {
    ping_ok: bool,
    commands: Mutex<Vec<String>>,
    payloads: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

/// In-process Redis stand-in bound to a local port.
pub struct MockRedis {
    pub addr: SocketAddr,
    shared: Arc<Shared>,
    payload_tx: mpsc::UnboundedSender<Vec<u8>>,
    accept_task: JoinHandle<()>,
}

impl MockRedis {
    /// Start a healthy server on an ephemeral port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock redis");
        Self::serve(listener, true)
    }

    /// Start a server whose `PING` fails, like a Redis still loading its dataset.
    pub async fn start_loading() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock redis");
        Self::serve(listener, false)
    }

    /// Start a healthy server on a specific address.
    pub async fn start_on(addr: SocketAddr) -> Self {
        let listener = TcpListener::bind(addr).await.expect("bind mock redis");
        Self::serve(listener, true)
    }

    fn serve(listener: TcpListener, ping_ok: bool) -> Self {
        let addr = listener.local_addr().expect("mock redis address");
        let (payload_tx, payload_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            ping_ok,
            commands: Mutex::new(Vec::new()),
            payloads: tokio::sync::Mutex::new(payload_rx),
        });

        let accept_shared = shared.clone();
        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let shared = accept_shared.clone();
                tokio::spawn(async move {
                    let _ = serve_connection(stream, shared).await;
                });
            }
        });

        Self {
            addr,
            shared,
            payload_tx,
            accept_task,
        }
    }

    /// `redis://` URL for this server.
    pub fn url(&self) -> String {
        format!("redis://{}/", self.addr)
    }

    /// Queue a raw element for the next `BLPOP`.
    pub fn push(&self, payload: impl Into<Vec<u8>>) {
        let _ = self.payload_tx.send(payload.into());
    }

    /// Upper-cased names of every command received so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.shared.commands.lock().unwrap().clone()
    }

    /// Number of `BLPOP` commands received so far.
    pub fn blpop_count(&self) -> usize {
        self.commands().iter().filter(|c| *c == "BLPOP").count()
    }
}

impl Drop for MockRedis {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn serve_connection(stream: TcpStream, shared: Arc<Shared>) -> io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);

    while let Some(args) = read_command(&mut reader).await? {
        let name = String::from_utf8_lossy(&args[0]).to_uppercase();
        shared.commands.lock().unwrap().push(name.clone());

        let reply = match name.as_str() {
            "PING" if shared.ping_ok => b"+PONG\r\n".to_vec(),
            "PING" => b"-LOADING Redis is loading the dataset in memory\r\n".to_vec(),
            "BLPOP" => {
                let key = args.get(1).cloned().unwrap_or_default();
                let secs: f64 = args
                    .get(2)
                    .and_then(|a| String::from_utf8_lossy(a).parse().ok())
                    .unwrap_or(0.0);

                let mut payloads = shared.payloads.lock().await;
                let next = if secs > 0.0 {
                    tokio::time::timeout(Duration::from_secs_f64(secs), payloads.recv())
                        .await
                        .ok()
                        .flatten()
                } else {
                    payloads.recv().await
                };

                match next {
                    Some(payload) => encode_pair(&key, &payload),
                    None => b"*-1\r\n".to_vec(),
                }
            }
            _ => b"+OK\r\n".to_vec(),
        };

        write.write_all(&reply).await?;
    }

    Ok(())
}

/// Read one command sent as an array of bulk strings; `None` on EOF.
async fn read_command<R>(reader: &mut R) -> io::Result<Option<Vec<Vec<u8>>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    let count = parse_header(&line, '*')?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        line.clear();
        reader.read_line(&mut line).await?;
        let len = parse_header(&line, '$')?;

        let mut buf = vec![0; len + 2];
        reader.read_exact(&mut buf).await?;
        buf.truncate(len);
        args.push(buf);
    }

    Ok(Some(args))
}

fn parse_header(line: &str, prefix: char) -> io::Result<usize> {
    line.trim_end()
        .strip_prefix(prefix)
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, format!("bad RESP header: {line:?}")))
}

fn encode_pair(key: &[u8], value: &[u8]) -> Vec<u8> {
    let mut out = b"*2\r\n".to_vec();
    for part in [key, value] {
        out.extend_from_slice(format!("${}\r\n", part.len()).as_bytes());
        out.extend_from_slice(part);
        out.extend_from_slice(b"\r\n");
    }
    out
}
