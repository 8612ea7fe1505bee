use crate::CrawlerError;
use std::{fmt, path::Path, str::FromStr};

/// Database login read from a one-line file: `host user password database`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Credentials {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Credentials, CrawlerError> {
        let content = tokio::fs::read_to_string(path).await?;
        content.parse()
    }
}

impl FromStr for Credentials {
    type Err = CrawlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.lines().next().unwrap_or_default();
        let fields = line.split_whitespace().collect::<Vec<_>>();
        match fields.as_slice() {
            [host, user, password, database] => Ok(Credentials {
                host: host.to_string(),
                user: user.to_string(),
                password: password.to_string(),
                database: database.to_string(),
            }),
            _ => Err(CrawlerError::Credentials(format!(
                "expected 4 fields on the first line, found {}",
                fields.len()
            ))),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}
