//! Per-agent-type memory registry: name → typed column, with a
//! register-then-freeze lifecycle.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use flame_core::{FlameError, FlameResult};

use crate::vector::{TypedVector, VectorHandle};

/// A per-agent-type map from variable name to typed
/// column, registered before the population is loaded and frozen
/// thereafter.
///
/// # Lifecycle
///
/// Variables may be registered only while `registration_closed` is
/// `false`. [`AgentMemory::hint_population`] closes registration and
/// reserves `n` on every column. After closure the set of variables is
/// frozen; columns grow solely by append during population load, then
/// stay constant through every iteration until
/// [`AgentMemory::compact_dead_rows`] is called between iterations.
pub struct AgentMemory {
    agent_name: String,
    vars: HashMap<String, Box<dyn VectorHandle>>,
    order: Vec<String>,
    registration_closed: AtomicBool,
    population_size: AtomicUsize,
    population_size_valid: AtomicBool,
    alive: TypedVector<bool>,
}

impl AgentMemory {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            vars: HashMap::new(),
            order: Vec::new(),
            registration_closed: AtomicBool::new(false),
            population_size: AtomicUsize::new(0),
            population_size_valid: AtomicBool::new(false),
            alive: TypedVector::new(),
        }
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    /// Register a variable of type `T`.
    ///
    /// Raises `LogicError` if called after [`hint_population`](Self::hint_population),
    /// or if `name` is already registered.
    pub fn register_var<T: Clone + Send + Sync + 'static>(
        &mut self,
        name: impl Into<String>,
    ) -> FlameResult<()> {
        if self.registration_closed.load(Ordering::Acquire) {
            return Err(FlameError::LogicError(format!(
                "cannot register var after population is hinted: {}",
                self.agent_name
            )));
        }
        let name = name.into();
        if self.vars.contains_key(&name) {
            return Err(FlameError::LogicError(format!(
                "variable '{name}' already registered on agent '{}'",
                self.agent_name
            )));
        }
        self.order.push(name.clone());
        self.vars.insert(name, Box::new(TypedVector::<T>::new()));
        Ok(())
    }

    /// Close registration and reserve `n` rows on every column.
    pub fn hint_population(&mut self, n: usize) {
        self.registration_closed.store(true, Ordering::Release);
        for v in self.vars.values() {
            v.reserve(n);
        }
        self.alive.reserve(n);
        self.population_size_valid.store(false, Ordering::Release);
    }

    pub fn registration_closed(&self) -> bool {
        self.registration_closed.load(Ordering::Acquire)
    }

    /// `true` if `name` names a registered variable.
    pub fn contains_var(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Typed access to a registered column.
    ///
    /// Raises `UnknownVariable` if `name` is not registered, `TypeMismatch`
    /// if it was registered with a different element type.
    pub fn get_vector<T: Clone + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> FlameResult<&TypedVector<T>> {
        let handle = self
            .vars
            .get(name)
            .ok_or_else(|| FlameError::UnknownVariable(name.to_string()))?;
        if handle.elem_type_id() != TypeId::of::<T>() {
            return Err(FlameError::TypeMismatch(format!(
                "variable '{name}' is not of the requested type"
            )));
        }
        Ok(handle
            .as_any()
            .downcast_ref::<TypedVector<T>>()
            .expect("type tag checked above"))
    }

    pub(crate) fn vector_handle(&self, name: &str) -> FlameResult<&dyn VectorHandle> {
        self.vars
            .get(name)
            .map(|b| b.as_ref())
            .ok_or_else(|| FlameError::UnknownVariable(name.to_string()))
    }

    /// Append a new agent row as alive; population loaders call this once
    /// per row before pushing column values via [`get_vector`](Self::get_vector).
    pub fn push_row_alive(&self) {
        self.alive.push(true);
    }

    /// Mark row `row` dead. Called by task execution on a `Dead` return;
    /// the row is only actually removed by a later
    /// [`compact_dead_rows`](Self::compact_dead_rows) call between
    /// iterations.
    pub fn mark_dead(&self, row: usize) {
        self.alive.set(row, false);
    }

    pub fn is_alive(&self, row: usize) -> bool {
        self.alive.get(row)
    }

    /// Length of any column, i.e. the current population size. In debug
    /// builds, additionally verifies every column has equal length and
    /// raises `InternalConsistency` if not.
    pub fn population_size(&self) -> FlameResult<usize> {
        if self.population_size_valid.load(Ordering::Acquire) {
            return Ok(self.population_size.load(Ordering::Acquire));
        }
        let mut lengths = self.vars.values().map(|v| v.len());
        let first = lengths.next().unwrap_or(0);
        if cfg!(debug_assertions) {
            for len in lengths {
                if len != first {
                    return Err(FlameError::InternalConsistency(format!(
                        "agent '{}' columns have mismatched lengths",
                        self.agent_name
                    )));
                }
            }
        }
        self.population_size.store(first, Ordering::Release);
        self.population_size_valid.store(true, Ordering::Release);
        Ok(first)
    }

    /// Remove every row marked dead since the last compaction. Must only be
    /// called between iterations, never while a task is running against
    /// this agent's memory.
    pub fn compact_dead_rows(&self) -> FlameResult<usize> {
        let n = self.population_size()?;
        let keep: Vec<bool> = (0..n).map(|i| self.is_alive(i)).collect();
        let removed = keep.iter().filter(|k| !**k).count();
        if removed == 0 {
            return Ok(0);
        }
        for name in &self.order {
            self.vars.get(name).expect("registered").retain_indices(&keep);
        }
        self.alive.retain_indices(&keep);
        self.population_size_valid.store(false, Ordering::Release);
        Ok(removed)
    }
}
