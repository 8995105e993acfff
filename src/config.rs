use {
    crate::domain::{error::AuditError, id::SubjectId},
    std::{env, net::SocketAddr},
    url::Url,
};

pub const HUB_PATH: &str = "/hubs/audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl TryFrom<&str> for StoreBackend {
    type Error = AuditError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(AuditError::Config(format!(
                "AUDIT_STORE must be postgres or memory, got: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl ServerConfig {
    /// Reads `BIND_ADDR`, `AUDIT_STORE`, `DATABASE_URL` and `DB_MAX_CONNECTIONS`.
    pub fn from_env() -> Result<Self, AuditError> {
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .map_err(|e| AuditError::Config(format!("BIND_ADDR: {e}")))?;

        let store = match env::var("AUDIT_STORE") {
            Ok(value) => StoreBackend::try_from(value.as_str())?,
            Err(_) => StoreBackend::Postgres,
        };

        let database_url = env::var("DATABASE_URL").ok();
        if store == StoreBackend::Postgres && database_url.is_none() {
            return Err(AuditError::Config(
                "DATABASE_URL must be set when AUDIT_STORE=postgres".into(),
            ));
        }

        let max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(value) => value
                .parse()
                .map_err(|e| AuditError::Config(format!("DB_MAX_CONNECTIONS: {e}")))?,
            Err(_) => 20,
        };

        Ok(Self {
            bind_addr,
            store,
            database_url,
            max_connections,
        })
    }
}

/// Where a client reaches the REST API and the hub. Both share one base address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    api_base: String,
}

impl ClientConfig {
    pub fn new(api_base: &str) -> Result<Self, AuditError> {
        let url = Url::parse(api_base)
            .map_err(|e| AuditError::Config(format!("invalid API base address {api_base:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AuditError::Config(format!(
                "API base address must be http or https, got: {}",
                url.scheme()
            )));
        }
        Ok(Self {
            api_base: url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Reads `AUDIT_API_BASE`.
    pub fn from_env() -> Result<Self, AuditError> {
        let base = env::var("AUDIT_API_BASE")
            .map_err(|_| AuditError::Config("AUDIT_API_BASE must be set".into()))?;
        Self::new(&base)
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn hub_url(&self) -> Result<Url, AuditError> {
        let mut url = Url::parse(&format!("{}{HUB_PATH}", self.api_base))
            .map_err(|e| AuditError::Config(format!("hub url: {e}")))?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| AuditError::Config(format!("cannot use {scheme} for {url}")))?;
        Ok(url)
    }

    pub fn entries_url(&self, subject_id: SubjectId) -> Result<Url, AuditError> {
        Url::parse(&format!("{}/api/subjects/{subject_id}/entries", self.api_base))
            .map_err(|e| AuditError::Config(format!("entries url: {e}")))
    }
}
