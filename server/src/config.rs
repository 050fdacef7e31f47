use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_STATIC_DIR: &str = "client/dist";
const DEFAULT_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 9000);

/// Server settings, read from `MITOSPACE_*` environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory holding `points2d.json` and `points4d.json`
    pub data_dir: PathBuf,
    /// Directory of the built web client
    pub static_dir: PathBuf,
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            addr: SocketAddr::from(DEFAULT_ADDR),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("MITOSPACE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("MITOSPACE_STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }
        if let Some(addr) = lookup("MITOSPACE_ADDR") {
            match addr.parse() {
                Ok(parsed) => config.addr = parsed,
                Err(e) => log::warn!("Ignoring MITOSPACE_ADDR={:?}: {}", addr, e),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_environment() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.addr.port(), 9000);
    }

    #[test]
    fn invalid_address_keeps_default() {
        let config = ServerConfig::from_lookup(|key| match key {
            "MITOSPACE_ADDR" => Some("not-an-address".to_string()),
            "MITOSPACE_DATA_DIR" => Some("/srv/mitospace".to_string()),
            _ => None,
        });
        assert_eq!(config.addr.port(), 9000);
        assert_eq!(config.data_dir, PathBuf::from("/srv/mitospace"));
    }
}
