use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::RegistryError;
use crate::tool::{Executor, Function, Tool, ToolSpec};

#[derive(Debug, Default)]
struct RegistryState {
    functions: BTreeMap<String, Function>,
    tools: BTreeMap<String, Tool>,
}

/// Per-client map from name to function or tool descriptor.
///
/// Lookups clone the descriptor out; executors are reference counted, so no
/// lock is held while one runs.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    state: RwLock<RegistryState>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_function(&self, function: Function) -> Result<(), RegistryError> {
        function.validate()?;
        let mut state = write_unpoisoned(&self.state);
        if state.functions.contains_key(&function.name) {
            return Err(RegistryError::AlreadyRegistered {
                kind: "function",
                name: function.name,
            });
        }
        state.functions.insert(function.name.clone(), function);
        Ok(())
    }

    pub fn delete_function(&self, name: &str) -> bool {
        write_unpoisoned(&self.state).functions.remove(name).is_some()
    }

    pub fn get_function(&self, name: &str) -> Option<Function> {
        read_unpoisoned(&self.state).functions.get(name).cloned()
    }

    pub fn count_functions(&self) -> usize {
        read_unpoisoned(&self.state).functions.len()
    }

    /// Registers `tool`. A function-kind tool also registers its function,
    /// and fails without side effects if either name is taken.
    pub fn create_tool(&self, tool: Tool) -> Result<(), RegistryError> {
        tool.validate()?;
        let mut state = write_unpoisoned(&self.state);
        if state.tools.contains_key(&tool.name) {
            return Err(RegistryError::AlreadyRegistered {
                kind: "tool",
                name: tool.name,
            });
        }

        if let ToolSpec::Function(function) = &tool.spec {
            if state.functions.contains_key(&function.name) {
                return Err(RegistryError::AlreadyRegistered {
                    kind: "function",
                    name: function.name.clone(),
                });
            }
            state
                .functions
                .insert(function.name.clone(), function.clone());
        }

        state.tools.insert(tool.name.clone(), tool);
        Ok(())
    }

    /// Removes `name`, together with the function a function-kind tool
    /// registered.
    pub fn delete_tool(&self, name: &str) -> bool {
        let mut state = write_unpoisoned(&self.state);
        let Some(tool) = state.tools.remove(name) else {
            return false;
        };
        if let ToolSpec::Function(function) = &tool.spec {
            state.functions.remove(&function.name);
        }
        true
    }

    pub fn get_tool(&self, name: &str) -> Option<Tool> {
        read_unpoisoned(&self.state).tools.get(name).cloned()
    }

    pub fn count_tools(&self) -> usize {
        read_unpoisoned(&self.state).tools.len()
    }

    /// Executor for a `function_call` named `name`.
    ///
    /// `None` when no function has that name, `Some(None)` when it is
    /// registered without an executor.
    pub fn function_executor(&self, name: &str) -> Option<Option<Executor>> {
        let state = read_unpoisoned(&self.state);
        state
            .functions
            .get(name)
            .map(|function| function.executor.clone())
    }

    /// Executor for a `custom_tool_call` named `name`, shaped like
    /// [`ToolRegistry::function_executor`]. Only custom tools match.
    pub fn custom_executor(&self, name: &str) -> Option<Option<Executor>> {
        let state = read_unpoisoned(&self.state);
        state
            .tools
            .get(name)
            .filter(|tool| matches!(tool.spec, ToolSpec::Custom { .. }))
            .map(|tool| tool.custom_executor.clone())
    }
}

fn read_unpoisoned<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_unpoisoned<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
