use std::env;
use std::path::PathBuf;

/// Address the HTTP surface binds to, from `SQUADQA_HOST`.
pub struct Host {
    pub host: String,
    pub port: u16,
}

impl Host {
    pub fn from_env() -> Self {
        let host = env::var("SQUADQA_HOST").unwrap_or_else(|_| "127.0.0.1:5000".to_string());

        let (host, port) = if host.contains(':') {
            let parts: Vec<&str> = host.rsplitn(2, ':').collect();
            let port = parts[0].parse().unwrap_or(5000);
            let host = parts[1].to_string();
            (host, port)
        } else {
            (host, 5000)
        };

        Self { host, port }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Root directory for fine-tuned checkpoints, from `SQUADQA_MODELS`.
/// Each variant keeps its checkpoint in a subdirectory named after it.
pub fn models_dir() -> PathBuf {
    let mut path = env::var("SQUADQA_MODELS").unwrap_or_else(|_| "models".to_string());

    if path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            path = path.replace('~', &home.to_string_lossy());
        }
    }

    PathBuf::from(path)
}
