//! Persisted choice history for a conversation session
//!
//! The conversation engine is the only writer. Downstream screens read the
//! list back as ordered `{stepIndex, choiceText}` records.

use super::{CHOICES_KEY, KeyValueStore};
use crate::conversation::UserChoice;
use crate::{Error, Result};

/// Append-only view of the choice history in a session store
pub struct ChoiceHistory<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> ChoiceHistory<'a> {
    /// Wrap a session-scoped store
    #[must_use]
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Load all recorded choices in the order they were made
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read or holds malformed data
    pub fn load(&self) -> Result<Vec<UserChoice>> {
        match self.store.get(CHOICES_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Append one choice to the end of the history
    ///
    /// # Errors
    ///
    /// Returns error if the choice does not follow the last recorded step,
    /// or if the store cannot be written
    pub fn append(&self, choice: &UserChoice) -> Result<()> {
        let mut choices = self.load()?;

        if let Some(last) = choices.last()
            && choice.step_index <= last.step_index
        {
            return Err(Error::Store(format!(
                "choice for step {} recorded after step {}",
                choice.step_index, last.step_index
            )));
        }

        choices.push(choice.clone());
        let json = serde_json::to_string(&choices)?;
        self.store.set(CHOICES_KEY, &json)?;

        tracing::debug!(
            step = choice.step_index,
            total = choices.len(),
            "persisted choice"
        );
        Ok(())
    }

    /// Drop the history, used when a new conversation starts
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be written
    pub fn clear(&self) -> Result<()> {
        self.store.remove(CHOICES_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_empty_history() {
        let store = MemoryStore::new();
        let history = ChoiceHistory::new(&store);
        assert!(history.load().unwrap().is_empty());
    }

    #[test]
    fn test_append_preserves_order() {
        let store = MemoryStore::new();
        let history = ChoiceHistory::new(&store);

        history.append(&UserChoice::new(1, "first")).unwrap();
        history.append(&UserChoice::new(3, "second")).unwrap();

        let loaded = history.load().unwrap();
        let steps: Vec<usize> = loaded.iter().map(|c| c.step_index).collect();
        assert_eq!(steps, vec![1, 3]);
        assert_eq!(loaded[1].choice_text, "second");
    }

    #[test]
    fn test_append_rejects_out_of_order() {
        let store = MemoryStore::new();
        let history = ChoiceHistory::new(&store);

        history.append(&UserChoice::new(2, "later")).unwrap();
        assert!(history.append(&UserChoice::new(2, "again")).is_err());
        assert!(history.append(&UserChoice::new(1, "earlier")).is_err());
        assert_eq!(history.load().unwrap().len(), 1);
    }

    #[test]
    fn test_reads_records_without_timestamp() {
        let store = MemoryStore::new();
        store
            .set(
                CHOICES_KEY,
                r#"[{"stepIndex":1,"choiceText":"calm"},{"stepIndex":3,"choiceText":"ready"}]"#,
            )
            .unwrap();

        let history = ChoiceHistory::new(&store);
        let loaded = history.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].step_index, 3);
        assert_eq!(loaded[1].choice_text, "ready");
        assert_eq!(loaded[0].recorded_at.timestamp(), 0);

        history.append(&UserChoice::new(4, "onward")).unwrap();
        assert_eq!(history.load().unwrap().len(), 3);
    }

    #[test]
    fn test_reads_timestamped_records() {
        let store = MemoryStore::new();
        store
            .set(
                CHOICES_KEY,
                r#"[{"stepIndex":1,"choiceText":"calm","recordedAt":"2024-01-01T00:00:00Z"}]"#,
            )
            .unwrap();

        let loaded = ChoiceHistory::new(&store).load().unwrap();
        assert_eq!(loaded[0].step_index, 1);
        assert_eq!(loaded[0].choice_text, "calm");
    }

    #[test]
    fn test_clear() {
        let store = MemoryStore::new();
        let history = ChoiceHistory::new(&store);
        history.append(&UserChoice::new(0, "x")).unwrap();
        history.clear().unwrap();
        assert!(history.load().unwrap().is_empty());
    }
}
