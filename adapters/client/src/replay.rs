use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use sweepview_system_poller::{Snapshot, SnapshotSource, TransportError};

/// Snapshot source stepping through a simulation dump.
///
/// A dump holds consecutive grids, each opening with a line that starts with
/// `[[` and closing with a line that ends with `]]`. Lines outside of a grid
/// are ignored. Every fetch serves the next grid; once the dump is exhausted
/// the final grid is served again.
#[derive(Clone, Debug)]
pub struct ReplaySource {
    steps: Vec<String>,
    cursor: usize,
}

impl ReplaySource {
    /// Loads a dump from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read simulation dump at {}", path.display()))?;
        Self::from_dump(&contents)
            .with_context(|| format!("invalid simulation dump at {}", path.display()))
    }

    /// Splits dump contents into grid steps.
    pub fn from_dump(contents: &str) -> Result<Self> {
        let mut steps = Vec::new();
        let mut current: Option<Vec<&str>> = None;
        for line in contents.lines().map(str::trim) {
            if line.starts_with("[[") {
                current = Some(Vec::new());
            }
            let Some(rows) = current.as_mut() else {
                continue;
            };
            rows.push(line);
            if line.ends_with("]]") {
                steps.push(rows.join("\n"));
                current = None;
            }
        }

        if current.is_some() {
            bail!("simulation dump ends inside an unterminated grid");
        }
        if steps.is_empty() {
            bail!("simulation dump contains no grids");
        }

        Ok(Self { steps, cursor: 0 })
    }

    /// Number of grids in the dump.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Reports whether the dump holds no grids. Loaded dumps never do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl SnapshotSource for ReplaySource {
    fn fetch(&mut self) -> Result<Snapshot, TransportError> {
        let step = self
            .steps
            .get(self.cursor)
            .or_else(|| self.steps.last())
            .ok_or(TransportError::Exhausted)?;
        if self.cursor < self.steps.len() {
            self.cursor += 1;
        }
        Ok(Snapshot::raw(step.clone()))
    }
}
