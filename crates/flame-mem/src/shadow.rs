//! Capability-restricted view over a subset of an agent's variables.

use std::collections::HashSet;
use std::sync::Arc;

use flame_core::{FlameError, FlameResult};

use crate::iterator::MemoryIterator;
use crate::store::AgentMemory;

/// A permissions filter over [`AgentMemory`], used by
/// exactly one task. A shadow never owns vectors.
pub struct AgentShadow {
    memory: Arc<AgentMemory>,
    readable: HashSet<String>,
    writable: HashSet<String>,
}

impl AgentShadow {
    pub fn new(memory: Arc<AgentMemory>) -> Self {
        Self { memory, readable: HashSet::new(), writable: HashSet::new() }
    }

    pub fn memory(&self) -> &AgentMemory {
        &self.memory
    }

    /// Grant access to variable `name`. `writable` implies readable too.
    ///
    /// Raises `UnknownVariable` if `name` is not registered on the
    /// underlying agent memory, `LogicError` if `name` was already allowed
    /// on this shadow.
    pub fn allow_access(&mut self, name: &str, writable: bool) -> FlameResult<()> {
        if !self.memory.contains_var(name) {
            return Err(FlameError::UnknownVariable(name.to_string()));
        }
        if self.readable.contains(name) {
            return Err(FlameError::LogicError(format!(
                "variable '{name}' already allowed on this shadow"
            )));
        }
        self.readable.insert(name.to_string());
        if writable {
            self.writable.insert(name.to_string());
        }
        Ok(())
    }

    pub fn is_readable(&self, name: &str) -> bool {
        self.readable.contains(name)
    }

    pub fn is_writable(&self, name: &str) -> bool {
        self.writable.contains(name)
    }

    /// An iterator over the full population.
    pub fn memory_iterator(&self) -> FlameResult<MemoryIterator<'_>> {
        let n = self.memory.population_size()?;
        MemoryIterator::new(self, 0, n)
    }

    /// An iterator over `[offset, offset + count)`.
    ///
    /// Raises `InvalidArgument` if the window runs past the population
    /// size.
    pub fn memory_iterator_windowed(&self, offset: usize, count: usize) -> FlameResult<MemoryIterator<'_>> {
        let n = self.memory.population_size()?;
        if offset
            .checked_add(count)
            .map(|end| end > n)
            .unwrap_or(true)
        {
            return Err(FlameError::InvalidArgument(format!(
                "window [{offset}, {offset}+{count}) exceeds population size {n}"
            )));
        }
        MemoryIterator::new(self, offset, count)
    }

    pub(crate) fn readable_names(&self) -> impl Iterator<Item = &String> {
        self.readable.iter()
    }
}
