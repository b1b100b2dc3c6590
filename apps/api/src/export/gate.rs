//! Single-flight export gate: at most one export in flight per session.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::export::error::ExportError;

#[derive(Clone, Default)]
pub struct ExportGate {
    sessions: Arc<DashMap<String, ()>>,
}

impl ExportGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `session` as exporting. Fails while another permit for the
    /// same session is alive.
    pub fn acquire(&self, session: &str) -> Result<ExportPermit, ExportError> {
        match self.sessions.entry(session.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(());
                Ok(ExportPermit {
                    session: session.to_string(),
                    sessions: Arc::clone(&self.sessions),
                })
            }
            Entry::Occupied(_) => Err(ExportError::InProgress),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.sessions.len()
    }
}

pub struct ExportPermit {
    session: String,
    sessions: Arc<DashMap<String, ()>>,
}

impl Drop for ExportPermit {
    fn drop(&mut self) {
        self.sessions.remove(&self.session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_for_same_session_refused() {
        let gate = ExportGate::new();
        let _permit = gate.acquire("token-a").unwrap();
        assert!(matches!(gate.acquire("token-a"), Err(ExportError::InProgress)));
        assert!(gate.acquire("token-b").is_ok());
    }

    #[test]
    fn test_permit_drop_releases_session() {
        let gate = ExportGate::new();
        {
            let _permit = gate.acquire("anonymous").unwrap();
            assert_eq!(gate.in_flight(), 1);
        }
        assert_eq!(gate.in_flight(), 0);
        assert!(gate.acquire("anonymous").is_ok());
    }

    #[test]
    fn test_clones_share_registry() {
        let gate = ExportGate::new();
        let other = gate.clone();
        let _permit = gate.acquire("token-a").unwrap();
        assert!(other.acquire("token-a").is_err());
    }
}
