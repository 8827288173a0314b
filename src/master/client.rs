//! Master server list client

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::MasterError;

/// Default address of the public master server
pub const DEFAULT_MASTER_ADDR: &str = "sauerbraten.org:28787";

const LIST_REQUEST: &[u8] = b"list\n";
const ADD_SERVER_PREFIX: &str = "addserver ";

/// Client for the master server's line protocol
#[derive(Debug, Clone)]
pub struct MasterClient {
    addr: String,
    dial_timeout: Duration,
    read_timeout: Duration,
}

impl MasterClient {
    pub fn new(addr: impl Into<String>, dial_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            dial_timeout,
            read_timeout: dial_timeout,
        }
    }

    /// Set how long reading the whole list may take
    pub fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Fetch the list of registered game servers as `ip:port` addresses
    pub async fn server_list(&self) -> Result<Vec<String>, MasterError> {
        let mut stream = timeout(self.dial_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| MasterError::DialTimeout(self.addr.clone()))??;

        stream.write_all(LIST_REQUEST).await?;
        stream.flush().await?;

        let servers = timeout(self.read_timeout, read_list(&mut stream))
            .await
            .map_err(|_| MasterError::ReadTimeout(self.addr.clone()))??;

        tracing::debug!(master = %self.addr, servers = servers.len(), "Fetched server list");

        Ok(servers)
    }
}

async fn read_list(stream: &mut TcpStream) -> Result<Vec<String>, MasterError> {
    let mut lines = BufReader::new(stream).split(b'\n');
    let mut servers = Vec::new();

    while let Some(line) = lines.next_segment().await? {
        let line = String::from_utf8_lossy(&line);
        let line = line.trim_end_matches('\r');

        if line == "\0" {
            break;
        }
        if let Some(addr) = parse_add_server(line) {
            servers.push(addr);
        }
    }

    Ok(servers)
}

/// `addserver 12.23.34.45 28785` becomes `12.23.34.45:28785`
fn parse_add_server(line: &str) -> Option<String> {
    let rest = line.strip_prefix(ADD_SERVER_PREFIX)?;
    let mut fields = rest.split_whitespace();
    let ip = fields.next()?;
    let port = fields.next()?;
    Some(format!("{}:{}", ip, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_add_server() {
        assert_eq!(
            parse_add_server("addserver 12.23.34.45 28785").as_deref(),
            Some("12.23.34.45:28785")
        );
        assert_eq!(
            parse_add_server("addserver 1.2.3.4 1000  ").as_deref(),
            Some("1.2.3.4:1000")
        );
        assert_eq!(parse_add_server("addserver 1.2.3.4"), None);
        assert_eq!(parse_add_server("echo hello"), None);
        assert_eq!(parse_add_server(""), None);
    }

    async fn serve_once(reply: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 5];
            socket.read_exact(&mut request).await.unwrap();
            assert_eq!(&request, b"list\n");
            socket.write_all(reply).await.unwrap();
            // keep the connection open; the terminator ends the list
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        addr
    }

    #[tokio::test]
    async fn test_server_list_until_terminator() {
        let addr = serve_once(
            b"addserver 1.2.3.4 28785\naddserver 5.6.7.8 10000\r\nnote something\n\0\naddserver 9.9.9.9 1\n",
        )
        .await;

        let client = MasterClient::new(addr, Duration::from_secs(2));
        let servers = client.server_list().await.unwrap();

        assert_eq!(servers, vec!["1.2.3.4:28785", "5.6.7.8:10000"]);
    }

    #[tokio::test]
    async fn test_server_list_read_timeout() {
        let addr = serve_once(b"addserver 1.2.3.4 28785\n").await;

        let client = MasterClient::new(addr, Duration::from_secs(2))
            .read_timeout(Duration::from_millis(100));
        let err = client.server_list().await.unwrap_err();

        assert!(matches!(err, MasterError::ReadTimeout(_)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let client = MasterClient::new(addr, Duration::from_secs(2));
        let err = client.server_list().await.unwrap_err();

        assert!(matches!(err, MasterError::Io(_)));
    }
}
