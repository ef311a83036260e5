use std::borrow::Cow;
use std::process::Stdio;
use std::time::Duration;

use encoding_rs::GBK;
use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::debug;

/// Used when a zero timeout is passed to `ping_host`
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(3);
/// Used when a zero timeout is passed to `check_tcp_port`
pub const DEFAULT_PORT_TIMEOUT: Duration = Duration::from_secs(2);

/// Markers in `ping` output that mean at least one echo reply came back.
/// Matched against lowercased output; covers Linux/macOS and English or
/// Chinese Windows.
const REPLY_MARKERS: &[&str] = &[
    "1 received",
    "2 received",
    "1 packets received",
    "2 packets received",
    "bytes from",
    "received = 1",
    "received = 2",
    "已接收 = 1",
    "已接收 = 2",
    "来自",
];

/// Error from an ICMP reachability probe
#[derive(Debug, thiserror::Error)]
pub enum ReachabilityError {
    #[error("Address cannot be empty")]
    EmptyAddress,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Ping {host} timed out after {timeout:?}")]
    Timeout { host: String, timeout: Duration },
    #[error("Failed to run ping for {host}: {source}")]
    Spawn {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Ping {host} failed ({status}): {output}")]
    CommandFailed {
        host: String,
        status: String,
        output: String,
    },
    #[error("Ping {host} got no reply: {output}")]
    Unreachable { host: String, output: String },
}

/// Error from a TCP port probe
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Address cannot be empty")]
    EmptyAddress,
    #[error("Invalid port number: {0}")]
    InvalidPort(u16),
    #[error("Connect to {addr} timed out after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Check whether `host` answers ICMP echo requests.
///
/// The whole `ping` invocation is bounded by `timeout`; the child process is
/// killed if the deadline passes.
pub async fn ping_host(host: &str, timeout: Duration) -> Result<(), ReachabilityError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(ReachabilityError::EmptyAddress);
    }
    if host.starts_with('-') || host.chars().any(char::is_whitespace) {
        return Err(ReachabilityError::InvalidAddress(host.to_string()));
    }
    let timeout = if timeout.is_zero() {
        DEFAULT_PING_TIMEOUT
    } else {
        timeout
    };

    let mut cmd = Command::new("ping");
    cmd.args(ping_args(host))
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Err(_) => {
            return Err(ReachabilityError::Timeout {
                host: host.to_string(),
                timeout,
            })
        }
        Ok(Err(e)) => {
            return Err(ReachabilityError::Spawn {
                host: host.to_string(),
                source: e,
            })
        }
        Ok(Ok(output)) => output,
    };

    let mut raw = output.stdout;
    raw.extend_from_slice(&output.stderr);
    let text = decode_output(&raw);

    if has_reply(&text) {
        debug!(host = %host, "Ping reply received");
        return Ok(());
    }

    let text = text.trim().to_string();
    if output.status.success() {
        Err(ReachabilityError::Unreachable {
            host: host.to_string(),
            output: text,
        })
    } else {
        Err(ReachabilityError::CommandFailed {
            host: host.to_string(),
            status: output.status.to_string(),
            output: text,
        })
    }
}

#[cfg(windows)]
fn ping_args(host: &str) -> [&str; 5] {
    ["-n", "2", "-w", "1000", host]
}

#[cfg(not(windows))]
fn ping_args(host: &str) -> [&str; 5] {
    ["-c", "2", "-W", "1", host]
}

/// Normalize `ping` output to text.
///
/// UTF-8 is taken as is; otherwise the bytes are decoded as GBK (Chinese
/// Windows consoles). If neither works the output is decoded lossily so the
/// probe result never depends on the decoding step.
pub fn decode_output(raw: &[u8]) -> Cow<'_, str> {
    if let Ok(text) = std::str::from_utf8(raw) {
        return Cow::Borrowed(text);
    }
    if let Some(text) = GBK.decode_without_bom_handling_and_without_replacement(raw) {
        return text;
    }
    String::from_utf8_lossy(raw)
}

fn has_reply(text: &str) -> bool {
    let lower = text.to_lowercase();
    REPLY_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Check whether a TCP connection to `host:port` can be established
/// within `timeout`. The connection is closed immediately.
pub async fn check_tcp_port(host: &str, port: u16, timeout: Duration) -> Result<(), PortError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(PortError::EmptyAddress);
    }
    if port == 0 {
        return Err(PortError::InvalidPort(port));
    }
    let timeout = if timeout.is_zero() {
        DEFAULT_PORT_TIMEOUT
    } else {
        timeout
    };

    let addr = join_host_port(host, port);
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Err(_) => Err(PortError::Timeout { addr, timeout }),
        Ok(Err(e)) => Err(PortError::Connect { addr, source: e }),
        Ok(Ok(_stream)) => {
            debug!(addr = %addr, "Port open");
            Ok(())
        }
    }
}

/// Format `host:port`, bracketing IPv6 literals
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
