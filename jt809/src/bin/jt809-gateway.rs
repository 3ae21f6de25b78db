//! JT/T 809 gateway: logs in to a superior platform and keeps the session up

use anyhow::{Context, Result};
use clap::Parser;
use jt809::server::{Jt809Server, ServerConfig};
use std::path::PathBuf;

/// JT/T 809 subordinate-platform gateway
#[derive(Parser, Debug)]
#[command(name = "jt809-gateway", author, version, about)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "JT809_CONFIG")]
    config: Option<PathBuf>,

    /// Superior platform main-link address, host:port
    #[arg(long)]
    main_link: Option<String>,

    /// Platform user id
    #[arg(long)]
    user_id: Option<u32>,

    /// Login password
    #[arg(long, env = "JT809_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Access code stamped into every header
    #[arg(long)]
    gnss_center_id: Option<u32>,

    /// IP the superior platform dials back for the sub link
    #[arg(long)]
    down_link_ip: Option<String>,

    /// Sub-link listen port, 0 for any
    #[arg(long)]
    down_link_port: Option<u16>,

    /// Encipher the login request with this key
    #[arg(long)]
    login_key: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn load_config(&self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                ServerConfig::from_toml_str(&text)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => ServerConfig::default(),
        };

        if let Some(address) = &self.main_link {
            config.main_link_address = address.clone();
        }
        if let Some(user_id) = self.user_id {
            config.user_id = user_id;
        }
        if let Some(password) = &self.password {
            config.password = password.clone();
        }
        if let Some(id) = self.gnss_center_id {
            config.gnss_center_id = id;
        }
        if let Some(ip) = &self.down_link_ip {
            config.down_link_ip = ip.clone();
        }
        if let Some(port) = self.down_link_port {
            config.down_link_port = port;
        }
        if self.login_key.is_some() {
            config.login_encrypt_key = self.login_key;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    let config = cli.load_config()?;
    let server = Jt809Server::new(config);
    server.on_connect(|| log::info!("Gateway online"));

    let stopper = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Interrupted, shutting down");
                stopper.shutdown().await;
            }
            Err(e) => log::error!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    server.run().await.context("session ended with an error")
}
