//! Gateway configuration

use jt809_core::{Jt809Error, Jt809Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gateway configuration
///
/// Loaded from TOML with [`ServerConfig::from_toml_str`]; missing keys take
/// their defaults.
///
/// ```toml
/// user_id = 20180920
/// password = "20180920"
/// gnss_center_id = 20180920
/// main_link_address = "10.0.0.8:8090"
/// down_link_ip = "10.0.0.20"
/// down_link_port = 8091
/// login_encrypt_key = 256178
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Platform user id used for login and logout
    pub user_id: u32,
    /// Login password, at most 8 bytes
    pub password: String,
    /// Access code stamped into every header
    pub gnss_center_id: u32,
    /// `host:port` of the superior platform's main-link listener
    pub main_link_address: String,
    /// IP announced at login for the superior platform to dial back
    pub down_link_ip: String,
    /// Port the sub-link listener binds and announces; 0 picks a free port
    pub down_link_port: u16,
    /// Local IP the sub-link listener binds
    pub listen_ip: String,
    /// Encipher the login request with this key
    pub login_encrypt_key: Option<u32>,
    pub keepalive_interval_secs: u64,
    pub connect_timeout_secs: u64,
    /// Inbound packets buffered between the receive loops and the dispatcher
    pub mailbox_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            user_id: 0,
            password: String::new(),
            gnss_center_id: 0,
            main_link_address: String::new(),
            down_link_ip: "127.0.0.1".to_string(),
            down_link_port: 0,
            listen_ip: "0.0.0.0".to_string(),
            login_encrypt_key: None,
            keepalive_interval_secs: 50,
            connect_timeout_secs: 30,
            mailbox_capacity: 64,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document
    pub fn from_toml_str(s: &str) -> Jt809Result<Self> {
        toml::from_str(s).map_err(|e| Jt809Error::Configuration(e.to_string()))
    }

    pub fn with_user(mut self, user_id: u32, password: impl Into<String>) -> Self {
        self.user_id = user_id;
        self.password = password.into();
        self
    }

    pub fn with_gnss_center_id(mut self, gnss_center_id: u32) -> Self {
        self.gnss_center_id = gnss_center_id;
        self
    }

    pub fn with_main_link_address(mut self, address: impl Into<String>) -> Self {
        self.main_link_address = address.into();
        self
    }

    pub fn with_down_link(mut self, ip: impl Into<String>, port: u16) -> Self {
        self.down_link_ip = ip.into();
        self.down_link_port = port;
        self
    }

    pub fn with_listen_ip(mut self, ip: impl Into<String>) -> Self {
        self.listen_ip = ip.into();
        self
    }

    pub fn with_login_encrypt_key(mut self, key: Option<u32>) -> Self {
        self.login_encrypt_key = key;
        self
    }

    pub fn with_keepalive_interval_secs(mut self, secs: u64) -> Self {
        self.keepalive_interval_secs = secs;
        self
    }

    pub fn with_connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Address the sub-link listener binds
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.listen_ip, self.down_link_port)
    }

    /// Check the configuration before a session starts
    ///
    /// # Errors
    /// `Jt809Error::Configuration` naming the first offending field.
    pub fn validate(&self) -> Jt809Result<()> {
        if self.main_link_address.is_empty() {
            return Err(Jt809Error::Configuration(
                "main_link_address is required".to_string(),
            ));
        }
        if self.password.len() > 8 {
            return Err(Jt809Error::Configuration(format!(
                "password is {} bytes, at most 8 allowed",
                self.password.len()
            )));
        }
        if self.down_link_ip.is_empty() || self.down_link_ip.len() > 32 {
            return Err(Jt809Error::Configuration(format!(
                "down_link_ip {:?} must be 1 to 32 bytes",
                self.down_link_ip
            )));
        }
        if self.keepalive_interval_secs == 0 {
            return Err(Jt809Error::Configuration(
                "keepalive_interval_secs must be positive".to_string(),
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err(Jt809Error::Configuration(
                "connect_timeout_secs must be positive".to_string(),
            ));
        }
        if self.mailbox_capacity == 0 {
            return Err(Jt809Error::Configuration(
                "mailbox_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.keepalive_interval(), Duration::from_secs(50));
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
        assert_eq!(config.mailbox_capacity, 64);
        assert_eq!(config.login_encrypt_key, None);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml() {
        let config = ServerConfig::from_toml_str(
            r#"
            user_id = 20180920
            password = "20180920"
            gnss_center_id = 20180920
            main_link_address = "127.0.0.1:8090"
            down_link_ip = "127.0.0.1"
            down_link_port = 809
            login_encrypt_key = 256178
            keepalive_interval_secs = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.user_id, 20180920);
        assert_eq!(config.login_encrypt_key, Some(256178));
        assert_eq!(config.keepalive_interval_secs, 10);
        assert_eq!(config.connect_timeout_secs, 30);
        assert_eq!(config.listen_address(), "0.0.0.0:809");
        config.validate().unwrap();
    }

    #[test]
    fn test_bad_toml() {
        let err = ServerConfig::from_toml_str("user_id = \"abc\"").unwrap_err();
        assert!(matches!(err, Jt809Error::Configuration(_)));
    }

    #[test]
    fn test_validate() {
        let base = ServerConfig::new()
            .with_user(1, "pw")
            .with_main_link_address("127.0.0.1:8090");
        base.validate().unwrap();
        assert!(base.clone().with_user(1, "123456789").validate().is_err());
        assert!(base.clone().with_mailbox_capacity(0).validate().is_err());
        assert!(base.clone().with_keepalive_interval_secs(0).validate().is_err());
        assert!(base.with_down_link("", 1).validate().is_err());
    }
}
