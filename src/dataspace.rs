//! Shared dimensions and the registry that scopes them.
//!
//! A [`DataspaceRegistry`] is created per group-definition session and is
//! handed (by cheap clone) to every [`ArrayCreator`](crate::creator::ArrayCreator)
//! participating in the definition. The registry guarantees that a dimension
//! name means the same thing everywhere: re-registering a name with a
//! different domain or data type is a conflict, not an override.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::dtype::Dtype;
use crate::{Error, Result};

/// Typed min/max bounds of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum Domain {
    Int { min: i64, max: i64 },
    UInt { min: u64, max: u64 },
    Float { min: f64, max: f64 },
}

impl Domain {
    /// Number of coordinates in an integer domain, `None` for float domains.
    pub fn size(&self) -> Option<u64> {
        match self {
            Domain::Int { min, max } => {
                u64::try_from(max.checked_sub(*min)?).ok()?.checked_add(1)
            }
            Domain::UInt { min, max } => max.checked_sub(*min)?.checked_add(1),
            Domain::Float { .. } => None,
        }
    }

    fn is_ordered(&self) -> bool {
        match self {
            Domain::Int { min, max } => min <= max,
            Domain::UInt { min, max } => min <= max,
            Domain::Float { min, max } => min <= max,
        }
    }

    fn matches_dtype(&self, dtype: Dtype) -> bool {
        match self {
            Domain::Int { .. } => dtype.is_signed_integer(),
            Domain::UInt { .. } => dtype.is_unsigned_integer(),
            Domain::Float { .. } => dtype.is_float(),
        }
    }

    pub(crate) fn check(&self, dtype: Dtype) -> Result<()> {
        if !self.is_ordered() {
            return Err(Error::schema(format!("domain {self:?} has min > max")));
        }
        if !self.matches_dtype(dtype) {
            return Err(Error::schema(format!(
                "domain {self:?} is incompatible with data type {dtype}"
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Domain::Int { min, max } => write!(f, "[{min}, {max}]"),
            Domain::UInt { min, max } => write!(f, "[{min}, {max}]"),
            Domain::Float { min, max } => write!(f, "[{min}, {max}]"),
        }
    }
}

/// A named dimension shared between array creators.
///
/// `domain == None` models a dimension whose extent is not fixed at
/// definition time (coordinate dimensions); such dimensions are only usable
/// in sparse arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedDim {
    pub name: String,
    pub domain: Option<Domain>,
    pub dtype: Dtype,
}

impl SharedDim {
    pub fn new(name: impl Into<String>, domain: Option<Domain>, dtype: Dtype) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::schema("dimension name must not be empty"));
        }
        if let Some(domain) = &domain {
            domain.check(dtype)?;
        }
        Ok(Self {
            name,
            domain,
            dtype,
        })
    }
}

/// Interned handle to a registry entry; stable across renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DimId(usize);

#[derive(Debug, Default)]
struct RegistryInner {
    dims: Vec<SharedDim>,
    by_name: HashMap<String, usize>,
    // array-creator names using each dimension, in first-use order
    referents: Vec<Vec<String>>,
}

/// Registry of shared dimensions for one group-definition session.
///
/// Clones are cheap handles onto the same state. The registry is
/// deliberately not `Send`: definition sessions are single threaded.
#[derive(Debug, Clone, Default)]
pub struct DataspaceRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl DataspaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dimension, or verify an existing registration.
    ///
    /// Registering a name that already exists is a no-op when domain and
    /// data type match exactly, and a conflict otherwise. A failed call
    /// does not mutate the registry.
    pub fn register(
        &self,
        name: impl Into<String>,
        domain: Option<Domain>,
        dtype: Dtype,
    ) -> Result<()> {
        let dim = SharedDim::new(name, domain, dtype)?;
        let mut inner = self.inner.borrow_mut();
        if let Some(&id) = inner.by_name.get(&dim.name) {
            let existing = &inner.dims[id];
            if existing.domain != dim.domain || existing.dtype != dim.dtype {
                return Err(Error::conflict(format!(
                    "dimension {:?} redefined with incompatible domain/type: \
                     have ({:?}, {}), got ({:?}, {})",
                    dim.name, existing.domain, existing.dtype, dim.domain, dim.dtype
                )));
            }
            return Ok(());
        }
        let id = inner.dims.len();
        inner.by_name.insert(dim.name.clone(), id);
        inner.dims.push(dim);
        inner.referents.push(Vec::new());
        Ok(())
    }

    /// Look up a dimension by name.
    pub fn get(&self, name: &str) -> Result<SharedDim> {
        let inner = self.inner.borrow();
        inner
            .by_name
            .get(name)
            .map(|&id| inner.dims[id].clone())
            .ok_or_else(|| Error::not_found("shared dimension", name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.borrow().by_name.contains_key(name)
    }

    /// Number of registered dimensions.
    pub fn len(&self) -> usize {
        self.inner.borrow().dims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered dimension names in registration order.
    pub fn dim_names(&self) -> Vec<String> {
        self.inner
            .borrow()
            .dims
            .iter()
            .map(|dim| dim.name.clone())
            .collect()
    }

    /// Rename a dimension; array creators referencing it observe the new
    /// name immediately.
    pub fn rename(&self, old: &str, new: impl Into<String>) -> Result<()> {
        let new = new.into();
        if new.is_empty() {
            return Err(Error::schema("dimension name must not be empty"));
        }
        let mut inner = self.inner.borrow_mut();
        if inner.by_name.contains_key(&new) {
            return Err(Error::conflict(format!(
                "cannot rename dimension {old:?}: name {new:?} is already registered"
            )));
        }
        let id = *inner
            .by_name
            .get(old)
            .ok_or_else(|| Error::not_found("shared dimension", old))?;
        inner.by_name.remove(old);
        inner.by_name.insert(new.clone(), id);
        inner.dims[id].name = new;
        Ok(())
    }

    /// Names of the array creators using a dimension, in first-use order.
    pub fn arrays_using(&self, name: &str) -> Result<Vec<String>> {
        let inner = self.inner.borrow();
        let id = *inner
            .by_name
            .get(name)
            .ok_or_else(|| Error::not_found("shared dimension", name))?;
        Ok(inner.referents[id].clone())
    }

    pub(crate) fn resolve(&self, name: &str) -> Result<DimId> {
        self.inner
            .borrow()
            .by_name
            .get(name)
            .map(|&id| DimId(id))
            .ok_or_else(|| Error::not_found("shared dimension", name))
    }

    pub(crate) fn dim(&self, id: DimId) -> SharedDim {
        self.inner.borrow().dims[id.0].clone()
    }

    pub(crate) fn mark_used(&self, id: DimId, array_name: &str) {
        let mut inner = self.inner.borrow_mut();
        let referents = &mut inner.referents[id.0];
        if !referents.iter().any(|name| name == array_name) {
            referents.push(array_name.to_string());
        }
    }
}
