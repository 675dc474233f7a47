use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub fallback_addr: SocketAddr,
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub max_file_bytes: usize,
    pub max_request_bytes: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;
        let fallback_port: u16 = std::env::var("FALLBACK_PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse()
            .context("FALLBACK_PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://mediashelf.db?mode=rwc".to_string());

        let upload_dir =
            PathBuf::from(std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()));

        let max_file_mb: usize =
            std::env::var("MAX_FILE_MB").ok().and_then(|s| s.parse().ok()).unwrap_or(10);

        let max_request_mb: usize =
            std::env::var("MAX_REQUEST_MB").ok().and_then(|s| s.parse().ok()).unwrap_or(100);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            fallback_addr: format!("{host}:{fallback_port}")
                .parse()
                .context("HOST/FALLBACK_PORT")?,
            database_url,
            upload_dir,
            max_file_bytes: max_file_mb * 1024 * 1024,
            max_request_bytes: max_request_mb * 1024 * 1024,
        })
    }
}
