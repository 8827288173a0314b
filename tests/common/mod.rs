//! In-process fake game server and master server

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use extinfo_relay::cubecode::PacketWriter;
use extinfo_relay::extinfo::{
    CLIENT_INFO_RESPONSE_CNS, CLIENT_INFO_RESPONSE_STATS, EXT_ACK, EXT_CLIENT_INFO, EXT_ERROR,
    EXT_TEAM_SCORES, EXT_UPTIME, EXT_VERSION, INFO_TYPE_BASIC, INFO_TYPE_EXTENDED,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};
use tokio::task::JoinHandle;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone)]
pub struct FakeClient {
    pub cn: i32,
    pub name: String,
    pub team: String,
    pub frags: i32,
}

impl FakeClient {
    pub fn new(cn: i32, name: &str, team: &str, frags: i32) -> Self {
        Self {
            cn,
            name: name.to_string(),
            team: team.to_string(),
            frags,
        }
    }
}

/// What the fake server reports; tests may change it while it runs
#[derive(Debug, Clone)]
pub struct FakeState {
    pub game_mode: i32,
    pub map: String,
    pub description: String,
    pub clients: Vec<FakeClient>,
    pub teams: Vec<(String, i32, Vec<i32>)>,
    pub uptime: i32,
    pub server_mod: Option<i32>,
    /// Send the 5-attribute basic info layout
    pub legacy_basic_info: bool,
    /// Leave out the stats packet of this client
    pub withhold_stats_of: Option<i32>,
    /// Ignore all requests
    pub silent: bool,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            game_mode: 11,
            map: "reissen".into(),
            description: "\x0c3fake \x0c7server".into(),
            clients: vec![
                FakeClient::new(0, "alpha", "good", 10),
                FakeClient::new(1, "bravo", "evil", 4),
                FakeClient::new(5, "charlie", "good", 7),
            ],
            teams: vec![
                ("good".into(), 3, vec![]),
                ("evil".into(), 1, vec![]),
            ],
            uptime: 3600,
            server_mod: Some(-8),
            legacy_basic_info: false,
            withhold_stats_of: None,
            silent: false,
        }
    }
}

/// UDP game server answering extinfo queries on `port + 1`
pub struct FakeGameServer {
    pub host: String,
    /// Game port; the info port is one above
    pub port: u16,
    pub state: Arc<Mutex<FakeState>>,
    handle: JoinHandle<()>,
}

impl FakeGameServer {
    pub async fn start(state: FakeState) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port() - 1;
        let state = Arc::new(Mutex::new(state));

        let shared = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            loop {
                let Ok((n, from)) = socket.recv_from(&mut buf).await else {
                    break;
                };
                let current = shared.lock().unwrap().clone();
                for reply in respond(&buf[..n], &current) {
                    let _ = socket.send_to(&reply, from).await;
                }
            }
        });

        Self {
            host: "127.0.0.1".into(),
            port,
            state,
            handle,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn update(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock().unwrap());
    }
}

impl Drop for FakeGameServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn is_team_mode(mode: i32) -> bool {
    !matches!(mode, 0 | 1 | 3 | 5 | 7)
}

fn respond(request: &[u8], state: &FakeState) -> Vec<Vec<u8>> {
    if state.silent || request.is_empty() {
        return vec![];
    }

    let reply = |body: &[u8]| [request, body].concat();

    match request {
        [INFO_TYPE_BASIC] => vec![reply(&basic_info(state))],
        [INFO_TYPE_EXTENDED, EXT_UPTIME] => {
            let mut w = PacketWriter::new();
            w.write_byte(EXT_ACK)
                .write_byte(EXT_VERSION)
                .write_int(state.uptime);
            vec![reply(&w.finish())]
        }
        [INFO_TYPE_EXTENDED, EXT_UPTIME, 1] => {
            let mut w = PacketWriter::new();
            w.write_byte(EXT_ACK)
                .write_byte(EXT_VERSION)
                .write_int(state.uptime);
            if let Some(code) = state.server_mod {
                w.write_int(code);
            }
            vec![reply(&w.finish())]
        }
        [INFO_TYPE_EXTENDED, EXT_TEAM_SCORES] => {
            let mut w = PacketWriter::new();
            w.write_byte(EXT_ACK).write_byte(EXT_VERSION);
            if !is_team_mode(state.game_mode) {
                w.write_byte(EXT_ERROR)
                    .write_int(state.game_mode)
                    .write_int(100);
                return vec![reply(&w.finish())];
            }
            w.write_byte(0).write_int(state.game_mode).write_int(100);
            for (name, score, bases) in &state.teams {
                w.write_string(name).write_int(*score);
                w.write_int(bases.len() as i32);
                for base in bases {
                    w.write_int(*base);
                }
            }
            vec![reply(&w.finish())]
        }
        [INFO_TYPE_EXTENDED, EXT_CLIENT_INFO, cn] => {
            let cn = *cn as i8 as i32;
            let clients: Vec<&FakeClient> = state
                .clients
                .iter()
                .filter(|c| cn == -1 || c.cn == cn)
                .collect();

            let mut w = PacketWriter::new();
            w.write_byte(EXT_ACK).write_byte(EXT_VERSION);
            if clients.is_empty() && cn != -1 {
                w.write_byte(EXT_ERROR);
                return vec![reply(&w.finish())];
            }

            w.write_byte(0).write_int(CLIENT_INFO_RESPONSE_CNS);
            for client in &clients {
                w.write_int(client.cn);
            }
            let mut replies = vec![reply(&w.finish())];

            // stats arrive in reverse order of the list
            for client in clients.iter().rev() {
                if state.withhold_stats_of == Some(client.cn) {
                    continue;
                }
                replies.push(reply(&client_stats(client)));
            }
            replies
        }
        _ => vec![],
    }
}

fn basic_info(state: &FakeState) -> Vec<u8> {
    let mut w = PacketWriter::new();
    w.write_int(state.clients.len() as i32);
    if state.legacy_basic_info {
        w.write_int(5);
    } else {
        w.write_int(7);
    }
    w.write_int(260)
        .write_int(state.game_mode)
        .write_int(300)
        .write_int(16)
        .write_int(0);
    if !state.legacy_basic_info {
        w.write_int(0).write_int(100);
    }
    w.write_string(&state.map).write_string(&state.description);
    w.finish().to_vec()
}

fn client_stats(client: &FakeClient) -> Vec<u8> {
    let mut w = PacketWriter::new();
    w.write_byte(EXT_ACK)
        .write_byte(EXT_VERSION)
        .write_byte(0)
        .write_int(CLIENT_INFO_RESPONSE_STATS)
        .write_int(client.cn)
        .write_int(25)
        .write_string(&client.name)
        .write_string(&client.team)
        .write_int(client.frags)
        .write_int(0)
        .write_int(2)
        .write_int(0)
        .write_int(33)
        .write_int(100)
        .write_int(0)
        .write_int(4)
        .write_int(0)
        .write_int(0)
        .write_byte(10)
        .write_byte(0)
        .write_byte(client.cn as u8);
    w.finish().to_vec()
}

/// TCP master server serving a mutable server list
pub struct FakeMaster {
    pub addr: String,
    pub servers: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl FakeMaster {
    pub async fn start(servers: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let servers = Arc::new(Mutex::new(servers));

        let shared = Arc::clone(&servers);
        let handle = tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let list = shared.lock().unwrap().clone();
                tokio::spawn(async move {
                    let mut request = [0u8; 5];
                    if socket.read_exact(&mut request).await.is_err() || &request != b"list\n" {
                        return;
                    }
                    let mut reply = String::new();
                    for server in list {
                        let (ip, port) = server.rsplit_once(':').unwrap();
                        reply.push_str(&format!("addserver {} {}\n", ip, port));
                    }
                    reply.push_str("\0\n");
                    let _ = socket.write_all(reply.as_bytes()).await;
                });
            }
        });

        Self {
            addr,
            servers,
            handle,
        }
    }

    pub fn set_servers(&self, servers: Vec<String>) {
        *self.servers.lock().unwrap() = servers;
    }
}

impl Drop for FakeMaster {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Poll `condition` until it holds or `within` elapses
pub async fn eventually<F, Fut>(within: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition().await
}
