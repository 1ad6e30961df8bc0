//! Flat `ciborium`-encoded file persistence (spec.md §6: "the
//! representation is opaque to collaborators"). Grounded on the
//! teacher's use of `ciborium` for MLS state in
//! `lockframe-core::mls::state`, adapted here to a single file instead
//! of a `redb` table since a node has exactly one state record, not a
//! keyed store.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use meshfr_core::{Persistence, PersistedState};

/// Errors loading or saving state to disk.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The state file could not be opened, read, or written.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The file's contents didn't decode as a [`PersistedState`].
    #[error("decode error: {0}")]
    Decode(#[from] ciborium::de::Error<std::io::Error>),
    /// The state could not be encoded for writing.
    #[error("encode error: {0}")]
    Encode(#[from] ciborium::ser::Error<std::io::Error>),
}

/// Loads and saves a single [`PersistedState`] from a flat file.
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    /// A persistence backend rooted at `path`. The file is created on
    /// first [`Self::save`]; until then, [`Self::load`] returns `None`.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Persistence for FilePersistence {
    type Error = PersistError;

    fn load(&mut self) -> Result<Option<PersistedState>, Self::Error> {
        if !self.path.exists() {
            return Ok(None);
        }
        let file = File::open(&self.path)?;
        let state = ciborium::de::from_reader(BufReader::new(file))?;
        Ok(Some(state))
    }

    fn save(&mut self, state: &PersistedState) -> Result<(), Self::Error> {
        let file = File::create(&self.path)?;
        ciborium::ser::into_writer(state, BufWriter::new(file))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshfr_core::DeviceRole;

    #[test]
    fn round_trips_through_a_temp_file() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("meshfr-node-persist-test-{}.cbor", std::process::id()));
        let mut store = FilePersistence::new(path.clone());

        assert!(store.load().unwrap().is_none());

        let state = PersistedState::unpaired(DeviceRole::Sensor);
        store.save(&state).unwrap();
        let loaded = store.load().unwrap().expect("state should now exist");
        assert_eq!(loaded, state);

        let _ = std::fs::remove_file(&path);
    }
}
