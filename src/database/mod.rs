pub mod remote;
pub mod sqlite;
pub mod store;

pub use remote::RemoteStore;
pub use sqlite::SqliteStore;
pub use store::{DueFilter, Store};

use crate::config::{Backend, Settings};
use crate::error::{Error, Result};

/// Opens the backend selected in `settings`.
pub fn open_store(settings: &Settings) -> Result<Box<dyn Store>> {
    match settings.backend {
        Backend::Sqlite => Ok(Box::new(SqliteStore::open(&settings.sqlite.path)?)),
        Backend::Remote => {
            let remote = settings.remote.as_ref().ok_or_else(|| {
                Error::Config("backend = \"remote\" needs remote.url and remote.key".to_string())
            })?;
            Ok(Box::new(RemoteStore::new(remote)?))
        }
    }
}
