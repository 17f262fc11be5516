//! End-to-end tests: real TCP clients against a running server.

use sketchsync_core::{Command, Editor, EditorCommunicator, Sketch};
use sketchsync_server::{ServerConfig, ServerHandle, SketchServer};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

const WAIT: Duration = Duration::from_secs(5);

async fn start_server(config: ServerConfig) -> (SocketAddr, ServerHandle) {
    let server = SketchServer::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let handle = server.handle();
    tokio::spawn(server.run());
    (addr, handle)
}

async fn start_default_server() -> (SocketAddr, ServerHandle) {
    start_server(ServerConfig::with_bind("127.0.0.1:0".parse().unwrap())).await
}

struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    /// Connect and consume the initial sketch.
    async fn connect(addr: SocketAddr) -> (Self, String) {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        let mut client = Self {
            lines: BufReader::new(reader).lines(),
            writer,
        };
        let initial = client.read_sketch().await;
        (client, initial)
    }

    async fn send_raw(&mut self, text: &str) {
        self.writer.write_all(text.as_bytes()).await.unwrap();
    }

    async fn send(&mut self, command: &Command) {
        self.send_raw(&format!("{}\n", command.encode())).await;
    }

    /// Read one full `Shapes are:` .. `end` block.
    async fn read_sketch(&mut self) -> String {
        tokio::time::timeout(WAIT, async {
            let mut block = Vec::new();
            while let Some(line) = self.lines.next_line().await.unwrap() {
                let done = line == "end";
                block.push(line);
                if done {
                    return block.join("\n");
                }
            }
            panic!("connection closed mid-sketch: {block:?}");
        })
        .await
        .expect("timed out waiting for sketch")
    }

    /// Read sketches until one satisfies `pred`.
    async fn read_until(&mut self, pred: impl Fn(&Sketch) -> bool) -> Sketch {
        loop {
            let sketch = Sketch::deserialize(&self.read_sketch().await).unwrap();
            if pred(&sketch) {
                return sketch;
            }
        }
    }
}

async fn wait_for_clients(handle: &ServerHandle, expected: usize) {
    tokio::time::timeout(WAIT, async {
        while handle.client_count().await.unwrap() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("client count never settled");
}

#[tokio::test]
async fn test_new_client_receives_empty_sketch() {
    let (addr, _handle) = start_default_server().await;
    let (_client, initial) = TestClient::connect(addr).await;
    assert_eq!(initial, "Shapes are:\nend");
}

#[tokio::test]
async fn test_draw_is_broadcast_to_every_client() {
    let (addr, handle) = start_default_server().await;
    let (mut a, _) = TestClient::connect(addr).await;
    let (mut b, _) = TestClient::connect(addr).await;
    wait_for_clients(&handle, 2).await;

    a.send_raw("DRAW\nsegment 0 0 10 10 -16776961\n").await;

    let expected = "Shapes are:\n0\tsegment 0 0 10 10 -16776961\nend";
    assert_eq!(a.read_sketch().await, expected);
    assert_eq!(b.read_sketch().await, expected);
}

#[tokio::test]
async fn test_late_joiner_gets_current_sketch() {
    let (addr, _handle) = start_default_server().await;
    let (mut a, _) = TestClient::connect(addr).await;
    a.send_raw("DRAW\nrectangle 1 2 30 40 -65536\n").await;
    a.read_sketch().await;

    let (_b, initial) = TestClient::connect(addr).await;
    assert_eq!(initial, "Shapes are:\n0\trectangle 1 2 30 40 -65536\nend");
}

#[tokio::test]
async fn test_concurrent_draws_from_two_clients() {
    let (addr, handle) = start_default_server().await;
    let (mut a, _) = TestClient::connect(addr).await;
    let (mut b, _) = TestClient::connect(addr).await;
    wait_for_clients(&handle, 2).await;

    tokio::join!(
        a.send_raw("DRAW\nrectangle 10 10 50 40 -16776961\n"),
        b.send_raw("DRAW\nellipse 60 60 90 80 -65536\n"),
    );

    let final_a = a.read_until(|s| s.len() == 2).await;
    let final_b = b.read_until(|s| s.len() == 2).await;
    assert_eq!(final_a, final_b);
    assert_eq!(final_a.ids().collect::<Vec<_>>(), vec![0, 1]);

    let mut kinds: Vec<_> = final_a.iter().map(|(_, shape)| shape.kind()).collect();
    kinds.sort();
    assert_eq!(kinds, vec!["ellipse", "rectangle"]);
}

#[tokio::test]
async fn test_move_recolor_delete_sequence() {
    let (addr, _handle) = start_default_server().await;
    let (mut a, _) = TestClient::connect(addr).await;

    a.send_raw("DRAW\nsegment 0 0 10 10 -16776961\n").await;
    a.read_sketch().await;

    a.send_raw("MOVE\n0 segment 5 5 15 15 -16776961\n").await;
    assert_eq!(
        a.read_sketch().await,
        "Shapes are:\n0\tsegment 5 5 15 15 -16776961\nend"
    );

    a.send_raw("RECOLOR\n0 -65536\n").await;
    assert_eq!(
        a.read_sketch().await,
        "Shapes are:\n0\tsegment 5 5 15 15 -65536\nend"
    );

    a.send_raw("DELETE\n0\n").await;
    assert_eq!(a.read_sketch().await, "Shapes are:\nend");
}

#[tokio::test]
async fn test_recolor_unknown_id_changes_nothing() {
    let (addr, handle) = start_default_server().await;
    let (mut a, _) = TestClient::connect(addr).await;
    a.send_raw("DRAW\nsegment 0 0 10 10 -16776961\n").await;
    let before = a.read_sketch().await;

    a.send_raw("RECOLOR\n99 -65536\n").await;
    assert_eq!(a.read_sketch().await, before);
    assert_eq!(handle.sketch().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_input_keeps_connection_open() {
    let (addr, _handle) = start_default_server().await;
    let (mut a, _) = TestClient::connect(addr).await;

    a.send_raw("BOGUS\n").await;
    a.send_raw("DRAW\ntriangle 1 2 3\n").await;
    a.send_raw("\nDRAW\nsegment 0 0 1 1 -16776961\n").await;

    assert_eq!(
        a.read_sketch().await,
        "Shapes are:\n0\tsegment 0 0 1 1 -16776961\nend"
    );
}

#[tokio::test]
async fn test_strict_mode_disconnects_on_malformed() {
    let mut config = ServerConfig::with_bind("127.0.0.1:0".parse().unwrap());
    config.disconnect_on_malformed = true;
    let (addr, handle) = start_server(config).await;
    let (mut a, _) = TestClient::connect(addr).await;
    wait_for_clients(&handle, 1).await;

    a.send_raw("BOGUS\n").await;
    let closed = tokio::time::timeout(WAIT, a.lines.next_line())
        .await
        .expect("server kept the connection open");
    assert!(matches!(closed, Ok(None) | Err(_)));
    wait_for_clients(&handle, 0).await;
}

#[tokio::test]
async fn test_disconnect_unregisters_client() {
    let (addr, handle) = start_default_server().await;
    let (a, _) = TestClient::connect(addr).await;
    let (mut b, _) = TestClient::connect(addr).await;
    wait_for_clients(&handle, 2).await;

    drop(a);
    wait_for_clients(&handle, 1).await;

    b.send_raw("DELETE\n0\n").await;
    assert_eq!(b.read_sketch().await, "Shapes are:\nend");

    drop(b);
    wait_for_clients(&handle, 0).await;
}

#[tokio::test]
async fn test_many_clients_get_distinct_increasing_ids() {
    let (addr, handle) = start_default_server().await;
    let clients = 16;

    let tasks: Vec<_> = (0..clients)
        .map(|i| {
            tokio::spawn(async move {
                let (mut client, _) = TestClient::connect(addr).await;
                client
                    .send_raw(&format!("DRAW\nsegment {i} {i} {} {} -16777216\n", i + 5, i + 5))
                    .await;
                client.read_until(|s| s.iter().any(|(_, shape)| {
                    shape.to_string() == format!("segment {i} {i} {} {} -16777216", i + 5, i + 5)
                }))
                .await;
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let sketch = handle.sketch().await.unwrap();
    assert_eq!(sketch.ids().collect::<Vec<_>>(), (0..clients).collect::<Vec<u32>>());
}

struct ChannelEditor {
    sketches: std::sync::mpsc::Sender<Sketch>,
}

impl Editor for ChannelEditor {
    fn set_sketch(&mut self, sketch: Sketch) {
        let _ = self.sketches.send(sketch);
    }

    fn repaint(&mut self) {}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_editor_communicator_against_server() {
    let (addr, _handle) = start_default_server().await;

    let result = tokio::task::spawn_blocking(move || {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut comm = EditorCommunicator::connect(addr, ChannelEditor { sketches: tx }).unwrap();
        let initial = rx.recv_timeout(WAIT).unwrap();
        assert!(initial.is_empty());

        let command = Command::parse_inline("DRAW freehand 0 0 4 4 4 4 8 2 -65536").unwrap();
        comm.send(&command).unwrap();
        let sketch = rx.recv_timeout(WAIT).unwrap();
        comm.disconnect();
        sketch
    })
    .await
    .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(
        result.get(0).map(|s| s.to_string()),
        Some("freehand 0 0 4 4 4 4 8 2 -65536".to_string())
    );
}
