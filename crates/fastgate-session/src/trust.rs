//! The proxy allow-list.
//!
//! Only proxies whose id appears here may create or change login state.
//! The store is loaded once before the gate processes any message and is
//! read-only afterwards, so it needs no locking. An empty store trusts
//! nobody.

use std::collections::HashSet;
use std::path::Path;

use fastgate_protocol::ProxyId;
use uuid::Uuid;

use crate::SessionError;

/// Set of proxy identities allowed to send login actions.
#[derive(Debug, Clone, Default)]
pub struct ProxyTrustStore {
    allowed: HashSet<ProxyId>,
}

impl ProxyTrustStore {
    /// A store that trusts nobody.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a store from a list of ids.
    pub fn new(ids: impl IntoIterator<Item = ProxyId>) -> Self {
        Self {
            allowed: ids.into_iter().collect(),
        }
    }

    /// Parses the allowed-proxies file format: one UUID per line, blank
    /// lines and `#` comments skipped.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidProxyId`] for the first line that
    /// isn't a UUID. A partially valid file is never accepted.
    pub fn parse(contents: &str) -> Result<Self, SessionError> {
        let mut allowed = HashSet::new();
        for (idx, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let id = Uuid::parse_str(line).map_err(|_| SessionError::InvalidProxyId {
                line: idx + 1,
                value: line.to_string(),
            })?;
            allowed.insert(ProxyId(id));
        }
        Ok(Self { allowed })
    }

    /// Loads the allowed-proxies file.
    ///
    /// A missing file yields an empty store (fail closed) and a warning.
    ///
    /// # Errors
    /// I/O errors other than "not found", and malformed lines.
    pub fn load_file(path: &Path) -> Result<Self, SessionError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %path.display(),
                    "proxy file not found, no proxy will be trusted"
                );
                return Ok(Self::empty());
            }
            Err(e) => return Err(SessionError::Io(e)),
        };

        let store = Self::parse(&contents)?;
        tracing::info!(
            path = %path.display(),
            proxies = store.len(),
            "loaded allowed proxies"
        );
        Ok(store)
    }

    /// Whether messages from `id` may be acted on.
    pub fn is_trusted(&self, id: &ProxyId) -> bool {
        self.allowed.contains(id)
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}
