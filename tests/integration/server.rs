//! HTTP surface over a real socket, with faked probes

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use dgwatch::config::{Config, ConfigStore};
use dgwatch::server::{serve_listener, AppState};

use crate::{checker, healthy_pair, target, FakeConnector, FakeNetwork};

async fn get(addr: std::net::SocketAddr, path: &str) -> (String, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        path
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    (head.to_string(), body.to_string())
}

fn config_with(names: &[&str]) -> Config {
    Config {
        databases: names.iter().map(|n| target(n)).collect(),
        ..Config::default()
    }
}

#[tokio::test]
async fn test_api_data_follows_config_snapshot() {
    let connector = healthy_pair(healthy_pair(FakeConnector::new(), "CRM"), "ERP");
    let (checker, _) = checker(FakeNetwork::new(), connector);

    let store = Arc::new(ConfigStore::new("config.toml", config_with(&["CRM"])));
    let state = Arc::new(AppState::new(store.clone(), checker));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let server = tokio::spawn(serve_listener(listener, state, shutdown.clone()));

    let (head, body) = get(addr, "/api/data").await;
    assert!(head.starts_with("HTTP/1.1 200"), "{}", head);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["code"], 200);
    assert_eq!(json["message"], "success");
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["name"], "CRM");
    assert_eq!(json["data"][0]["connections"], 10);

    store.replace(config_with(&["ERP", "CRM"]));

    let (_, body) = get(addr, "/api/data").await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let names: Vec<_> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["ERP", "CRM"]);

    let (head, body) = get(addr, "/health").await;
    assert!(head.starts_with("HTTP/1.1 200"));
    assert_eq!(body, "OK");

    let (head, _) = get(addr, "/index.html").await;
    assert!(head.starts_with("HTTP/1.1 404"), "{}", head);

    shutdown.cancel();
    server.await.unwrap().unwrap();
}
