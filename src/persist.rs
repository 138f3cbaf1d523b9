use crate::ir::Snapshot;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Receives the serializable graph after every settled mutation.
///
/// Saving is fire-and-forget from the store's point of view: an error is
/// surfaced as a warning, and the in-memory graph stays authoritative.
pub trait Persistence {
    fn save(&mut self, topic_id: &str, snapshot: &Snapshot) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullPersistence;

impl Persistence for NullPersistence {
    fn save(&mut self, _topic_id: &str, _snapshot: &Snapshot) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Writes `<dir>/<topic_id>.json`, pretty-printed.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    dir: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, topic_id: &str) -> PathBuf {
        let safe: String = topic_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl Persistence for JsonFilePersistence {
    fn save(&mut self, topic_id: &str, snapshot: &Snapshot) -> anyhow::Result<()> {
        write_snapshot(&self.path_for(topic_id), snapshot)
    }
}

pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, snapshot)?;
    Ok(())
}

pub fn read_snapshot(path: &Path) -> anyhow::Result<Snapshot> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Keeps the latest snapshot per topic in memory. Clones share storage, so a
/// test can hand one clone to a store and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    saved: Rc<RefCell<BTreeMap<String, Snapshot>>>,
    saves: Rc<RefCell<usize>>,
    fail: Rc<RefCell<bool>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self, topic_id: &str) -> Option<Snapshot> {
        self.saved.borrow().get(topic_id).cloned()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.borrow()
    }

    /// Makes subsequent saves fail, to exercise the warning path.
    pub fn set_failing(&self, failing: bool) {
        *self.fail.borrow_mut() = failing;
    }
}

impl Persistence for MemoryPersistence {
    fn save(&mut self, topic_id: &str, snapshot: &Snapshot) -> anyhow::Result<()> {
        if *self.fail.borrow() {
            return Err(anyhow::anyhow!("storage unavailable"));
        }
        self.saved
            .borrow_mut()
            .insert(topic_id.to_string(), snapshot.clone());
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Graph, Node, Position};

    #[test]
    fn file_persistence_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonFilePersistence::new(dir.path());
        let mut graph = Graph::new();
        graph.insert_node(Node::new("n1", "Cell", "concept", Position::new(1.0, 2.0)));
        sink.save("topic/1", &graph.snapshot()).unwrap();

        let path = sink.path_for("topic/1");
        assert!(path.ends_with("topic_1.json"));
        let back = read_snapshot(&path).unwrap();
        assert_eq!(back, graph.snapshot());
    }

    #[test]
    fn memory_persistence_shares_state_between_clones() {
        let observer = MemoryPersistence::new();
        let mut sink = observer.clone();
        sink.save("t", &Snapshot::default()).unwrap();
        assert_eq!(observer.save_count(), 1);
        observer.set_failing(true);
        assert!(sink.save("t", &Snapshot::default()).is_err());
        assert_eq!(observer.save_count(), 1);
    }
}
