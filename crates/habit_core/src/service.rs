use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::habit::{migrate, Habit, HabitRecord, LegacyHabit};
use crate::store::{CollectionStore, StorageError, HABITS_KEY};

#[derive(Debug, Error)]
pub enum HabitStoreError {
    #[error("a habit with id `{0}` already exists")]
    DuplicateId(String),
    #[error("habit name must not be empty")]
    EmptyName,
    #[error("no habit with id `{0}`")]
    NotFound(String),
    #[error("payload is not a collection of habit records: {0}")]
    MalformedCollection(String),
    #[error("collection mixes current and legacy habit shapes")]
    MixedShapes,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Owner of the habit collection. Every mutation re-reads the durable
/// collection, applies the change, persists the whole collection, and only
/// then replaces the in-memory projection with the persisted result, so the
/// projection never drifts from storage. The projection's write guard is
/// held across the storage round trip, which serializes overlapping
/// mutations.
pub struct HabitService {
    store: Box<dyn CollectionStore>,
    habits: RwLock<Vec<Habit>>,
}

impl HabitService {
    pub fn new(store: Box<dyn CollectionStore>) -> Self {
        Self {
            store,
            habits: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of the in-memory projection.
    pub fn habits(&self) -> Vec<Habit> {
        self.habits.read().clone()
    }

    /// Read the persisted collection. A collection still in the legacy
    /// shape is upgraded and persisted before this returns, so migration
    /// runs at most once.
    pub fn load(&self) -> Result<Vec<Habit>, HabitStoreError> {
        let mut projection = self.habits.write();
        let records = self.store.read(HABITS_KEY)?;
        let habits = match decode(records)? {
            Decoded::Current(habits) => habits,
            Decoded::Legacy(legacy) => {
                info!(count = legacy.len(), "upgrading legacy habit records");
                let migrated = migrate(legacy, Utc::now());
                self.persist(&migrated)?;
                migrated
            }
        };
        *projection = habits.clone();
        Ok(habits)
    }

    /// Append a habit and return the full updated collection.
    pub fn add(&self, habit: Habit) -> Result<Vec<Habit>, HabitStoreError> {
        if habit.name.trim().is_empty() {
            return Err(HabitStoreError::EmptyName);
        }
        let mut projection = self.habits.write();
        let mut habits = self.read_for_update()?;
        if habits.iter().any(|existing| existing.id == habit.id) {
            return Err(HabitStoreError::DuplicateId(habit.id));
        }
        debug!(id = %habit.id, name = %habit.name, "adding habit");
        habits.push(habit);
        self.persist(&habits)?;
        *projection = habits.clone();
        Ok(habits)
    }

    /// Replace the habit with a matching id and return the full updated
    /// collection.
    pub fn edit(&self, habit: Habit) -> Result<Vec<Habit>, HabitStoreError> {
        if habit.name.trim().is_empty() {
            return Err(HabitStoreError::EmptyName);
        }
        let mut projection = self.habits.write();
        let mut habits = self.read_for_update()?;
        let Some(slot) = habits.iter_mut().find(|existing| existing.id == habit.id) else {
            return Err(HabitStoreError::NotFound(habit.id));
        };
        debug!(id = %habit.id, "editing habit");
        *slot = habit;
        self.persist(&habits)?;
        *projection = habits.clone();
        Ok(habits)
    }

    /// Overwrite the whole collection. This is the bulk-import integration
    /// point; payload validation happens before this is called.
    pub fn replace_all(&self, habits: Vec<Habit>) -> Result<Vec<Habit>, HabitStoreError> {
        let mut projection = self.habits.write();
        info!(count = habits.len(), "replacing habit collection");
        self.persist(&habits)?;
        *projection = habits.clone();
        Ok(habits)
    }

    /// Remove the habit with a matching id. An id with no match is a no-op
    /// that returns the collection unchanged.
    pub fn delete_by_id(&self, id: &str) -> Result<Vec<Habit>, HabitStoreError> {
        let mut projection = self.habits.write();
        let mut habits = self.read_for_update()?;
        let before = habits.len();
        habits.retain(|habit| habit.id != id);
        if habits.len() == before {
            warn!(id, "delete target missing, collection unchanged");
        } else {
            debug!(id, "deleting habit");
        }
        self.persist(&habits)?;
        *projection = habits.clone();
        Ok(habits)
    }

    /// Fresh durable read for a mutation. A legacy-shaped collection is
    /// upgraded in memory here; the mutation's own persist writes the
    /// current shape back.
    fn read_for_update(&self) -> Result<Vec<Habit>, HabitStoreError> {
        let records = self.store.read(HABITS_KEY)?;
        Ok(match decode(records)? {
            Decoded::Current(habits) => habits,
            Decoded::Legacy(legacy) => migrate(legacy, Utc::now()),
        })
    }

    fn persist(&self, habits: &[Habit]) -> Result<(), HabitStoreError> {
        let records = habits
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()
            .map_err(|err| HabitStoreError::MalformedCollection(err.to_string()))?;
        self.store.write(HABITS_KEY, &records)?;
        Ok(())
    }
}

enum Decoded {
    Current(Vec<Habit>),
    Legacy(Vec<LegacyHabit>),
}

/// Decode stored records. The shape is sniffed from the first record and
/// the collection must be homogeneous; a mix of shapes is rejected rather
/// than guessed at.
fn decode(records: Vec<Value>) -> Result<Decoded, HabitStoreError> {
    let records = records
        .into_iter()
        .map(serde_json::from_value::<HabitRecord>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| HabitStoreError::MalformedCollection(err.to_string()))?;

    let legacy_shape = matches!(records.first(), Some(HabitRecord::Legacy(_)));
    if legacy_shape {
        records
            .into_iter()
            .map(|record| match record {
                HabitRecord::Legacy(habit) => Ok(habit),
                HabitRecord::Current(_) => Err(HabitStoreError::MixedShapes),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Decoded::Legacy)
    } else {
        records
            .into_iter()
            .map(|record| match record {
                HabitRecord::Current(habit) => Ok(habit),
                HabitRecord::Legacy(_) => Err(HabitStoreError::MixedShapes),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Decoded::Current)
    }
}

/// Parse a bulk-import payload. Anything that is not a JSON array of
/// current-shape habit records is rejected, so a bad file can never reach
/// the store.
pub fn parse_collection(json: &str) -> Result<Vec<Habit>, HabitStoreError> {
    serde_json::from_str(json).map_err(|err| HabitStoreError::MalformedCollection(err.to_string()))
}

/// Serialize a collection for bulk export.
pub fn export_collection(habits: &[Habit]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(habits)
}
