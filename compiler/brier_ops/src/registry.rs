//! Operator registry.
//!
//! A name → descriptor map. The process-wide registry is built once with
//! the built-ins and shared read-only afterwards; embedders that need extra
//! operators build their own and share it with [`OperatorRegistry::into_shared`]
//! before creating a script.
//!
//! `inspect` describes operators of the registry it lives in, so it is
//! only added when a registry is shared.

use std::sync::{Arc, OnceLock, Weak};

use brier_ir::{Rank, Scalar, Value};
use rustc_hash::FxHashMap;

use crate::builtins;
use crate::errors::{type_mismatch, unknown_operator, EvalError, EvalResult};
use crate::operator::{Arity, Operand, OperatorDef};

static GLOBAL_REGISTRY: OnceLock<Arc<OperatorRegistry>> = OnceLock::new();

#[derive(Default)]
pub struct OperatorRegistry {
    ops: FxHashMap<String, Arc<OperatorDef>>,
}

impl OperatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in operator except `inspect`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for def in builtins::all() {
            let previous = registry.ops.insert(def.name().to_string(), Arc::new(def));
            debug_assert!(previous.is_none(), "built-in operator registered twice");
        }
        registry
    }

    /// Register a named operator.
    pub fn register<F>(
        &mut self,
        name: &str,
        rank_in: Rank,
        rank_out: Rank,
        arity: usize,
        func: F,
    ) -> Result<Arc<OperatorDef>, EvalError>
    where
        F: Fn(&Value, Option<&Operand>) -> EvalResult + Send + Sync + 'static,
    {
        let arity = Arity::try_from(arity).map_err(|arity| EvalError::UnsupportedArity {
            name: name.to_string(),
            arity,
        })?;
        self.insert(OperatorDef::new(name, rank_in, rank_out, arity, func))
    }

    /// Register a fully built descriptor.
    pub fn insert(&mut self, def: OperatorDef) -> Result<Arc<OperatorDef>, EvalError> {
        if self.ops.contains_key(def.name()) {
            return Err(EvalError::DuplicateOperatorName {
                name: def.name().to_string(),
            });
        }
        let def = Arc::new(def);
        self.ops.insert(def.name().to_string(), Arc::clone(&def));
        Ok(def)
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<OperatorDef>, EvalError> {
        self.ops
            .get(name)
            .cloned()
            .ok_or_else(|| unknown_operator(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.ops.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Describe a registered operator as a row:
    /// `{name, rankin, rankout, arity, operand}`.
    pub fn describe(&self, name: &str) -> EvalResult {
        let def = self.lookup(name)?;
        Ok(Value::dict_from([
            ("name", Scalar::str(def.name())),
            ("rankin", Scalar::Float(def.rank_in().as_f64())),
            ("rankout", Scalar::Float(def.rank_out().as_f64())),
            ("arity", Scalar::Int(i64::from(def.arity().count()))),
            ("operand", Scalar::str(def.operand_name().unwrap_or_default())),
        ]))
    }

    /// Freeze the registry for sharing between scripts and threads, adding
    /// `inspect` unless an operator of that name is already registered.
    pub fn into_shared(mut self) -> Arc<OperatorRegistry> {
        Arc::new_cyclic(|shared| {
            if !self.contains(INSPECT) {
                let def = Arc::new(inspect_def(shared.clone()));
                self.ops.insert(INSPECT.to_string(), def);
            }
            self
        })
    }
}

const INSPECT: &str = "inspect";

/// `inspect`: an operator name in, its description out.
fn inspect_def(registry: Weak<OperatorRegistry>) -> OperatorDef {
    OperatorDef::new(INSPECT, Rank::Scalar, Rank::Row, Arity::Nullary, move |arg, _| {
        let name = match arg.as_scalar() {
            Some(Scalar::Str(name)) => name,
            _ => return Err(type_mismatch(INSPECT, "an operator name", arg.kind_name())),
        };
        match registry.upgrade() {
            Some(registry) => registry.describe(name),
            None => Err(unknown_operator(name)),
        }
    })
}

/// The shared registry of built-in operators.
pub fn global_registry() -> Arc<OperatorRegistry> {
    Arc::clone(GLOBAL_REGISTRY.get_or_init(|| OperatorRegistry::with_builtins().into_shared()))
}
