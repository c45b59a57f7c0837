//! Materializer registry: operation kind -> implementation.
//!
//! The registry is populated once at startup. Each kind string is interned
//! into a dense [`OpId`]; the engine resolves a node's kind to an `OpId`
//! before touching the cache, so an unknown kind fails explicitly instead of
//! surfacing as a lookup miss deep inside evaluation.
//!
//! Materializers receive their already-resolved inputs plus a
//! [`MaterializeContext`], the only sanctioned way to touch the workspace.
//! Every file read through the context is recorded in the execution's
//! [`FileLog`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{CoreError, MaterializationError};
use crate::file_log::FileLog;
use crate::id::OpId;
use crate::node::LiteralData;
use crate::value::Value;
use crate::workspace::Workspace;

/// Inputs handed to a materializer.
#[derive(Debug, Clone, Copy)]
pub enum Inputs<'a> {
    /// Literal nodes receive their decoded data.
    Literal(&'a LiteralData),
    /// Derived nodes receive their dependency values, in declared order.
    Derived(&'a [Arc<Value>]),
}

impl<'a> Inputs<'a> {
    pub fn literal(&self) -> Result<&'a LiteralData, MaterializationError> {
        match *self {
            Inputs::Literal(data) => Ok(data),
            Inputs::Derived(_) => Err(MaterializationError::msg(
                "expected a literal node, got a derived node",
            )),
        }
    }

    pub fn deps(&self) -> Result<&'a [Arc<Value>], MaterializationError> {
        match *self {
            Inputs::Derived(deps) => Ok(deps),
            Inputs::Literal(_) => Err(MaterializationError::msg(
                "expected a derived node, got a literal node",
            )),
        }
    }

    /// Dependencies, requiring exactly `arity` of them.
    pub fn exactly(&self, arity: usize) -> Result<&'a [Arc<Value>], MaterializationError> {
        let deps = self.deps()?;
        if deps.len() != arity {
            return Err(MaterializationError::msg(format!(
                "expected {arity} dependencies, got {}",
                deps.len()
            )));
        }
        Ok(deps)
    }

    pub fn str_at(&self, index: usize) -> Result<&'a str, MaterializationError> {
        let dep = self.dep(index)?;
        dep.as_str().ok_or_else(|| type_mismatch(index, "Str", dep))
    }

    pub fn u64_at(&self, index: usize) -> Result<u64, MaterializationError> {
        let dep = self.dep(index)?;
        dep.as_u64().ok_or_else(|| type_mismatch(index, "unsigned integer", dep))
    }

    pub fn dep(&self, index: usize) -> Result<&'a Value, MaterializationError> {
        let deps = self.deps()?;
        deps.get(index).map(Arc::as_ref).ok_or_else(|| {
            MaterializationError::msg(format!(
                "missing dependency {index} (have {})",
                deps.len()
            ))
        })
    }
}

fn type_mismatch(index: usize, expected: &str, got: &Value) -> MaterializationError {
    MaterializationError::msg(format!(
        "dependency {index}: expected {expected}, got {}",
        got.type_name()
    ))
}

/// Per-invocation context: workspace access with file-read accounting.
pub struct MaterializeContext<'a> {
    workspace: &'a Workspace,
    files: &'a mut FileLog,
}

impl<'a> MaterializeContext<'a> {
    pub fn new(workspace: &'a Workspace, files: &'a mut FileLog) -> Self {
        MaterializeContext { workspace, files }
    }

    pub fn workspace(&self) -> &Workspace {
        self.workspace
    }

    /// Records `path` as an input without reading it.
    pub fn record(&mut self, path: impl AsRef<Path>) {
        self.files.record(path.as_ref());
    }

    /// Reads a workspace file. The path is recorded even if reading fails,
    /// so a later appearance of the file invalidates the build.
    pub fn read(&mut self, path: impl AsRef<Path>) -> Result<Vec<u8>, MaterializationError> {
        let path = path.as_ref();
        self.record(path);
        std::fs::read(self.workspace.resolve(path))
            .map_err(|e| MaterializationError::io(path, e))
    }

    pub fn read_to_string(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<String, MaterializationError> {
        let path = path.as_ref();
        self.record(path);
        std::fs::read_to_string(self.workspace.resolve(path))
            .map_err(|e| MaterializationError::io(path, e))
    }

    /// Checks for a regular file. Recorded either way: absence is an input too.
    pub fn is_file(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        self.record(path);
        self.workspace.resolve(path).is_file()
    }
}

/// A registered operation implementation.
pub trait Materializer {
    fn materialize(
        &self,
        inputs: Inputs<'_>,
        ctx: &mut MaterializeContext<'_>,
    ) -> Result<Value, MaterializationError>;
}

impl<F> Materializer for F
where
    F: Fn(Inputs<'_>, &mut MaterializeContext<'_>) -> Result<Value, MaterializationError>,
{
    fn materialize(
        &self,
        inputs: Inputs<'_>,
        ctx: &mut MaterializeContext<'_>,
    ) -> Result<Value, MaterializationError> {
        self(inputs, ctx)
    }
}

/// Interned map from operation kind to implementation.
#[derive(Default)]
pub struct Registry {
    ops: IndexMap<String, Box<dyn Materializer>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// A registry with every builtin kind registered.
    pub fn with_builtins() -> Self {
        let mut registry = Registry::new();
        crate::builtins::register_builtins(&mut registry);
        registry
    }

    /// Registers a function or closure under `kind`.
    pub fn register<F>(&mut self, kind: &str, materializer: F) -> Result<OpId, CoreError>
    where
        F: Fn(Inputs<'_>, &mut MaterializeContext<'_>) -> Result<Value, MaterializationError>
            + 'static,
    {
        self.register_boxed(kind, Box::new(materializer))
    }

    /// Registers a trait object under `kind`. Each kind may be registered once.
    pub fn register_boxed(
        &mut self,
        kind: &str,
        materializer: Box<dyn Materializer>,
    ) -> Result<OpId, CoreError> {
        if self.ops.contains_key(kind) {
            return Err(CoreError::DuplicateOperation {
                kind: kind.to_string(),
            });
        }
        let (index, _) = self.ops.insert_full(kind.to_string(), materializer);
        Ok(OpId(index as u32))
    }

    pub fn lookup(&self, kind: &str) -> Option<OpId> {
        self.ops.get_index_of(kind).map(|index| OpId(index as u32))
    }

    pub fn name(&self, op: OpId) -> Option<&str> {
        self.ops.get_index(op.index()).map(|(kind, _)| kind.as_str())
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.ops.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> + '_ {
        self.ops.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Dispatches to the implementation for `op`, tagging errors with its kind.
    pub fn invoke(
        &self,
        op: OpId,
        inputs: Inputs<'_>,
        ctx: &mut MaterializeContext<'_>,
    ) -> Result<Value, MaterializationError> {
        let (kind, materializer) = self.ops.get_index(op.index()).ok_or_else(|| {
            MaterializationError::msg(format!("no operation registered under id {op}"))
        })?;
        materializer
            .materialize(inputs, ctx)
            .map_err(|e| e.with_kind(kind))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kinds", &self.ops.keys().collect::<Vec<_>>())
            .finish()
    }
}
