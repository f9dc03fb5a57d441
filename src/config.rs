use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};

use crate::error::AppError;

const DEFAULT_NOTIFY_TEMPLATE: &str = "New trip: {patient} from {origin} to {destination}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TripBackend {
    #[default]
    File,
    Sqlite,
}

impl FromStr for TripBackend {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "file" | "json" => Ok(TripBackend::File),
            "sqlite" | "table" => Ok(TripBackend::Sqlite),
            other => Err(AppError::Config(format!("unknown TRIP_BACKEND: {other}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub backend: TripBackend,
    pub data_root: PathBuf,
    pub repo_root: PathBuf,
    pub git_sync: bool,
    pub notify_recipient: Option<String>,
    pub notify_template: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://ambulance.db".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let backend = match env::var("TRIP_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => TripBackend::default(),
        };

        let data_root = env::var("DATA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let repo_root = match env::var("REPO_ROOT") {
            Ok(raw) => PathBuf::from(raw),
            Err(_) => env::current_dir()?,
        };

        let git_sync = env::var("GIT_SYNC")
            .map(|raw| matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let notify_recipient = env::var("NOTIFY_RECIPIENT")
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty());

        let notify_template =
            env::var("NOTIFY_TEMPLATE").unwrap_or_else(|_| DEFAULT_NOTIFY_TEMPLATE.to_string());

        Ok(Self {
            database_url,
            listen_addr,
            backend,
            data_root,
            repo_root,
            git_sync,
            notify_recipient,
            notify_template,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_parse_case_insensitively() {
        assert_eq!("FILE".parse::<TripBackend>().unwrap(), TripBackend::File);
        assert_eq!(" sqlite ".parse::<TripBackend>().unwrap(), TripBackend::Sqlite);
        assert!(matches!(
            "postgres".parse::<TripBackend>(),
            Err(AppError::Config(_))
        ));
    }
}
