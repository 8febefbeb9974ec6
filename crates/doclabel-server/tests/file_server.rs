//! File server start/stop contract over a real socket.

use std::time::Duration;

use doclabel_server::FileServer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn get(addr: std::net::SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_listener_is_bound_when_start_returns() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("doc")).unwrap();
    std::fs::write(dir.path().join("doc/page_1.png"), b"png").unwrap();

    let mut server = FileServer::start("127.0.0.1", 0, dir.path()).await.unwrap();
    let addr = server.local_addr();
    assert_ne!(addr.port(), 0);

    let health = get(addr, "/health").await;
    assert!(health.starts_with("HTTP/1.1 200"), "{health}");

    let image = get(addr, "/doc/page_1.png").await;
    assert!(image.starts_with("HTTP/1.1 200"), "{image}");
    assert!(image.ends_with("png"));

    server.stop(Duration::from_secs(5)).await.unwrap();
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_port_in_use_is_a_bind_error() {
    let dir = tempfile::tempdir().unwrap();
    let first = FileServer::start("127.0.0.1", 0, dir.path()).await.unwrap();
    let port = first.local_addr().port();

    let second = FileServer::start("127.0.0.1", port, dir.path()).await;
    assert!(matches!(
        second,
        Err(doclabel_server::SupervisorError::Bind { .. })
    ));
}
