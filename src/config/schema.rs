use std::fmt;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Probe timeouts shared by every database
    #[serde(default)]
    pub probe: ProbeConfig,
    /// Monitored Data Guard pairs, in display order
    #[serde(default)]
    pub databases: Vec<DatabaseTarget>,
}

// ============================================================================
// Server / Logging
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
}

fn default_listen_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            listen_port: default_listen_port(),
        }
    }
}

impl ServerConfig {
    /// Socket address string (addr:port)
    pub fn addr(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Append log lines to this file instead of stdout
    #[serde(default)]
    pub filename: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            filename: None,
        }
    }
}

// ============================================================================
// Probe Configuration
// ============================================================================

/// Timeouts for the layered instance probe
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// ICMP reachability timeout (milliseconds)
    #[serde(default = "default_ping_timeout_ms")]
    pub ping_timeout_ms: u64,
    /// TCP port check timeout (milliseconds)
    #[serde(default = "default_port_timeout_ms")]
    pub port_timeout_ms: u64,
    /// Database connect timeout (seconds), also used as the call timeout
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_ping_timeout_ms() -> u64 {
    3000
}

fn default_port_timeout_ms() -> u64 {
    3000
}

fn default_connect_timeout_secs() -> u64 {
    5
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ping_timeout_ms: default_ping_timeout_ms(),
            port_timeout_ms: default_port_timeout_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ProbeConfig {
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn port_timeout(&self) -> Duration {
        Duration::from_millis(self.port_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

// ============================================================================
// Database Targets
// ============================================================================

/// One monitored database: load balancer, production and DR addresses
/// sharing a listener port, service and monitoring credentials.
#[derive(Clone, Deserialize)]
pub struct DatabaseTarget {
    /// Display name
    pub name: String,
    /// Load balancer address
    pub lb_ip: String,
    /// Production instance address
    pub prod_ip: String,
    /// Disaster recovery instance address
    pub dr_ip: String,
    /// Listener port
    #[serde(default = "default_oracle_port")]
    pub port: u16,
    /// Service name used in the connect string
    pub service_name: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn default_oracle_port() -> u16 {
    1521
}

impl fmt::Debug for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseTarget")
            .field("name", &self.name)
            .field("lb_ip", &self.lb_ip)
            .field("prod_ip", &self.prod_ip)
            .field("dr_ip", &self.dr_ip)
            .field("port", &self.port)
            .field("service_name", &self.service_name)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl DatabaseTarget {
    /// Check the fields the probes rely on, returning a description of the
    /// first problem found.
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            ("name", &self.name),
            ("lb_ip", &self.lb_ip),
            ("prod_ip", &self.prod_ip),
            ("dr_ip", &self.dr_ip),
            ("service_name", &self.service_name),
            ("username", &self.username),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(format!("database '{}': {} must not be empty", self.name, field));
            }
        }
        if self.port == 0 {
            return Err(format!("database '{}': port must not be 0", self.name));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            probe: ProbeConfig::default(),
            databases: Vec::new(),
        }
    }
}

impl Config {
    /// Validate every database target
    pub fn validate(&self) -> Result<(), String> {
        self.databases.iter().try_for_each(DatabaseTarget::validate)
    }
}
