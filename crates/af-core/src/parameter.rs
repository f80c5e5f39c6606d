//! Named scalar parameters.
//!
//! A `ParameterSet` owns every parameter of one analysis session. Field
//! functions, assemblers and the flutter engine refer to entries by
//! [`ParamId`] and never own them.

use crate::{AfError, AfResult, ParamId, Real, ensure_finite};
use std::collections::HashMap;

/// A named mutable scalar used as a physical quantity or design variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    id: ParamId,
    name: String,
    value: Real,
}

impl Parameter {
    pub fn id(&self) -> ParamId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Real {
        self.value
    }
}

/// Registry of parameters with unique names.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    params: Vec<Parameter>,
    by_name: HashMap<String, ParamId>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new parameter. Names must be unique within the set.
    pub fn add(&mut self, name: impl Into<String>, value: Real) -> AfResult<ParamId> {
        let name = name.into();
        if name.is_empty() {
            return Err(AfError::InvalidArg {
                what: "parameter name must not be empty",
            });
        }
        if self.by_name.contains_key(&name) {
            return Err(AfError::DuplicateName { name });
        }
        ensure_finite(value, "parameter value")?;

        let id = ParamId::from_index(self.params.len())?;
        self.by_name.insert(name.clone(), id);
        self.params.push(Parameter { id, name, value });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn contains(&self, id: ParamId) -> bool {
        id.index() < self.params.len()
    }

    pub fn get(&self, id: ParamId) -> AfResult<&Parameter> {
        let index = id.index();
        self.params.get(index).ok_or(AfError::IndexOob {
            what: "parameter id",
            index,
            len: self.params.len(),
        })
    }

    pub fn value(&self, id: ParamId) -> AfResult<Real> {
        self.get(id).map(Parameter::value)
    }

    pub fn name(&self, id: ParamId) -> AfResult<&str> {
        self.get(id).map(Parameter::name)
    }

    pub fn set(&mut self, id: ParamId, value: Real) -> AfResult<()> {
        ensure_finite(value, "parameter value")?;
        let index = id.index();
        let len = self.params.len();
        let param = self.params.get_mut(index).ok_or(AfError::IndexOob {
            what: "parameter id",
            index,
            len,
        })?;
        param.value = value;
        Ok(())
    }

    /// Look up a parameter id by name; a miss reports the valid names.
    pub fn id(&self, name: &str) -> AfResult<ParamId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| AfError::UnknownName {
                name: name.to_string(),
                valid: self.names().map(str::to_string).collect(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    /// Copy of this set with one value replaced.
    pub fn with_value(&self, id: ParamId, value: Real) -> AfResult<Self> {
        let mut copy = self.clone();
        copy.set(id, value)?;
        Ok(copy)
    }
}
