//=========================================================================
// Profile Store
//=========================================================================
//
// Player profiles, as seen by the menu states.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::{Arc, Mutex, MutexGuard};

use log::info;

//=== Internal Dependencies ===============================================

use crate::core::error::StateError;

//=== ProfileStore Trait ==================================================

/// Persistence collaborator for player profiles.
pub trait ProfileStore: Send {
    fn profiles(&self) -> Vec<String>;

    /// Profile currently in use.
    fn current(&self) -> Option<String>;

    fn create(&mut self, name: &str) -> Result<(), StateError>;

    fn delete(&mut self, name: &str) -> Result<(), StateError>;

    fn select(&mut self, name: &str) -> Result<(), StateError>;
}

/// Profile store shared between the application and the menu states.
pub type ProfileHandle = Arc<Mutex<dyn ProfileStore>>;

pub fn lock_profiles(
    store: &ProfileHandle,
) -> Result<MutexGuard<'_, dyn ProfileStore + 'static>, StateError> {
    store
        .lock()
        .map_err(|_| StateError::Profile("profile store lock poisoned".into()))
}

//=== MemoryProfileStore ==================================================

/// In-memory profile store.
#[derive(Debug, Clone, Default)]
pub struct MemoryProfileStore {
    profiles: Vec<String>,
    current: Option<String>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding `profiles`, the first one selected.
    pub fn with_profiles<I, S>(profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let profiles: Vec<String> = profiles.into_iter().map(Into::into).collect();
        Self {
            current: profiles.first().cloned(),
            profiles,
        }
    }
}

impl ProfileStore for MemoryProfileStore {
    fn profiles(&self) -> Vec<String> {
        self.profiles.clone()
    }

    fn current(&self) -> Option<String> {
        self.current.clone()
    }

    fn create(&mut self, name: &str) -> Result<(), StateError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StateError::Profile("profile name is empty".into()));
        }
        if self.profiles.iter().any(|p| p == name) {
            return Err(StateError::Profile(format!("profile '{}' already exists", name)));
        }

        info!("Created profile '{}'", name);
        self.profiles.push(name.to_string());
        self.current = Some(name.to_string());
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<(), StateError> {
        let position = self
            .profiles
            .iter()
            .position(|p| p == name)
            .ok_or_else(|| StateError::Profile(format!("no profile '{}'", name)))?;

        info!("Deleted profile '{}'", name);
        self.profiles.remove(position);
        if self.current.as_deref() == Some(name) {
            self.current = self.profiles.first().cloned();
        }
        Ok(())
    }

    fn select(&mut self, name: &str) -> Result<(), StateError> {
        if !self.profiles.iter().any(|p| p == name) {
            return Err(StateError::Profile(format!("no profile '{}'", name)));
        }
        self.current = Some(name.to_string());
        Ok(())
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_selects_new_profile() {
        let mut store = MemoryProfileStore::with_profiles(["alice"]);
        store.create("  bob ").unwrap();

        assert_eq!(store.profiles(), vec!["alice".to_string(), "bob".to_string()]);
        assert_eq!(store.current().as_deref(), Some("bob"));
    }

    #[test]
    fn create_rejects_empty_and_duplicate_names() {
        let mut store = MemoryProfileStore::with_profiles(["alice"]);
        assert!(store.create("   ").is_err());
        assert!(store.create("alice").is_err());
    }

    #[test]
    fn deleting_current_selects_first_remaining() {
        let mut store = MemoryProfileStore::with_profiles(["alice", "bob"]);
        store.select("bob").unwrap();
        store.delete("bob").unwrap();

        assert_eq!(store.current().as_deref(), Some("alice"));
        assert!(store.delete("bob").is_err());
    }
}
