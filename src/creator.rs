//! Incremental definition of array schemas.
//!
//! An [`ArrayCreator`] references shared dimensions in a
//! [`DataspaceRegistry`] by name, accumulates attribute definitions, and
//! materializes an immutable [`ArraySchema`] with
//! [`to_schema`](ArrayCreator::to_schema) or persists it with
//! [`create`](ArrayCreator::create). Creators stay mutable and reusable
//! after creation; building is not consuming.

use zarrs::storage::ReadableWritableListableStorage;

use crate::dataspace::{DataspaceRegistry, DimId, Domain};
use crate::dtype::Dtype;
use crate::filter::Filter;
use crate::schema::{ArraySchema, AttributeSchema, DimensionSchema};
use crate::{storage, Error, Result};

/// Definition of one attribute, mutable until the schema is built.
#[derive(Debug, Clone)]
pub struct AttrCreator {
    name: String,
    dtype: Dtype,
    filters: Vec<Filter>,
    fill: Option<serde_json::Number>,
    nullable: bool,
}

impl AttrCreator {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn set_filters(&mut self, filters: Vec<Filter>) {
        self.filters = filters;
    }

    pub fn fill(&self) -> Option<&serde_json::Number> {
        self.fill.as_ref()
    }

    pub fn set_fill(&mut self, fill: Option<serde_json::Number>) {
        self.fill = fill;
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    pub fn set_nullable(&mut self, nullable: bool) {
        self.nullable = nullable;
    }

    fn to_schema(&self) -> AttributeSchema {
        AttributeSchema {
            name: self.name.clone(),
            dtype: self.dtype,
            filters: self.filters.clone(),
            fill: self.fill.clone(),
            nullable: self.nullable,
        }
    }
}

/// Per-array descriptor of one dimension: a registry reference plus the
/// array-local tile size and filter pipeline.
#[derive(Debug, Clone)]
pub struct DimCreator {
    registry: DataspaceRegistry,
    id: DimId,
    tile: Option<u64>,
    filters: Vec<Filter>,
}

impl DimCreator {
    /// Current name of the referenced shared dimension; registry renames
    /// are visible here.
    pub fn name(&self) -> String {
        self.registry.dim(self.id).name
    }

    pub fn domain(&self) -> Option<Domain> {
        self.registry.dim(self.id).domain
    }

    pub fn dtype(&self) -> Dtype {
        self.registry.dim(self.id).dtype
    }

    pub fn tile(&self) -> Option<u64> {
        self.tile
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    fn to_schema(&self) -> DimensionSchema {
        let dim = self.registry.dim(self.id);
        DimensionSchema {
            name: dim.name,
            domain: dim.domain,
            dtype: dim.dtype,
            tile: self.tile,
            filters: self.filters.clone(),
        }
    }
}

/// Builder for one multi-attribute array schema.
#[derive(Debug, Clone)]
pub struct ArrayCreator {
    registry: DataspaceRegistry,
    name: String,
    dims: Vec<DimCreator>,
    attrs: Vec<AttrCreator>,
    sparse: bool,
}

impl ArrayCreator {
    /// Create an array creator referencing shared dimensions by name.
    ///
    /// Validates that the dimension list is non-empty, free of duplicates
    /// and fully resolvable in `registry`.
    pub fn new<'a>(
        registry: &DataspaceRegistry,
        name: impl Into<String>,
        dim_names: impl IntoIterator<Item = &'a str>,
        sparse: bool,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::schema("array name must not be empty"));
        }
        let dim_names: Vec<&str> = dim_names.into_iter().collect();
        if dim_names.is_empty() {
            return Err(Error::schema(format!(
                "array {name:?} requires at least one dimension"
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for dim_name in &dim_names {
            if !seen.insert(*dim_name) {
                return Err(Error::conflict(format!(
                    "duplicate dimension name {dim_name:?} in array {name:?}"
                )));
            }
        }
        let mut dims = Vec::with_capacity(dim_names.len());
        for dim_name in &dim_names {
            let id = registry.resolve(dim_name)?;
            dims.push(DimCreator {
                registry: registry.clone(),
                id,
                tile: None,
                filters: Vec::new(),
            });
        }
        for dim in &dims {
            registry.mark_used(dim.id, &name);
        }
        Ok(Self {
            registry: registry.clone(),
            name,
            dims,
            attrs: Vec::new(),
            sparse,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sparse(&self) -> bool {
        self.sparse
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    pub fn nattr(&self) -> usize {
        self.attrs.len()
    }

    /// Set per-dimension tile sizes; the tuple length must match the
    /// dimension count and every tile must be nonzero.
    pub fn set_tiles(&mut self, tiles: &[u64]) -> Result<()> {
        if tiles.len() != self.dims.len() {
            return Err(Error::ShapeMismatch {
                got: tiles.len(),
                dims: self.dims.len(),
            });
        }
        if tiles.contains(&0) {
            return Err(Error::schema("tile sizes must be nonzero"));
        }
        for (dim, &tile) in self.dims.iter_mut().zip(tiles) {
            dim.tile = Some(tile);
        }
        Ok(())
    }

    /// Set the filter pipeline of one dimension.
    pub fn set_dim_filters(&mut self, dim_name: &str, filters: Vec<Filter>) -> Result<()> {
        let dim = self
            .dims
            .iter_mut()
            .find(|dim| dim.name() == dim_name)
            .ok_or_else(|| Error::not_found("dimension", dim_name))?;
        dim.filters = filters;
        Ok(())
    }

    /// Per-dimension descriptors in dimension order.
    pub fn domain_creator(&self) -> &[DimCreator] {
        &self.dims
    }

    /// Add an attribute definition.
    ///
    /// Fails without mutating when `name` collides with an existing
    /// attribute or with a dimension of this creator.
    pub fn add_attr_creator(
        &mut self,
        name: impl Into<String>,
        dtype: Dtype,
        filters: Vec<Filter>,
    ) -> Result<&mut AttrCreator> {
        let name = name.into();
        self.check_attr_name(&name)?;
        self.attrs.push(AttrCreator {
            name,
            dtype,
            filters,
            fill: None,
            nullable: false,
        });
        Ok(self.attrs.last_mut().expect("just pushed"))
    }

    fn check_attr_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::schema("attribute name must not be empty"));
        }
        if self.attrs.iter().any(|attr| attr.name == name) {
            return Err(Error::conflict(format!(
                "attribute {name:?} already exists in array {:?}",
                self.name
            )));
        }
        if self.dims.iter().any(|dim| dim.name() == name) {
            return Err(Error::conflict(format!(
                "attribute name {name:?} collides with a dimension of array {:?}",
                self.name
            )));
        }
        Ok(())
    }

    pub fn attr_creator(&self, name: &str) -> Result<&AttrCreator> {
        self.attrs
            .iter()
            .find(|attr| attr.name == name)
            .ok_or_else(|| Error::not_found("attribute", name))
    }

    pub fn attr_creator_mut(&mut self, name: &str) -> Result<&mut AttrCreator> {
        self.attrs
            .iter_mut()
            .find(|attr| attr.name == name)
            .ok_or_else(|| Error::not_found("attribute", name))
    }

    /// Attribute creators in insertion order.
    pub fn attr_creators(&self) -> impl Iterator<Item = &AttrCreator> {
        self.attrs.iter()
    }

    /// Rename an attribute, with the same collision rules as
    /// [`add_attr_creator`](ArrayCreator::add_attr_creator).
    pub fn rename_attr(&mut self, old: &str, new: impl Into<String>) -> Result<()> {
        let new = new.into();
        self.attr_creator(old)?;
        if new != old {
            self.check_attr_name(&new)?;
        }
        self.attr_creator_mut(old)
            .expect("checked above")
            .name = new;
        Ok(())
    }

    /// Combine dimension and attribute descriptors into an immutable
    /// schema.
    pub fn to_schema(&self) -> Result<ArraySchema> {
        if self.attrs.is_empty() {
            return Err(Error::schema("no attributes defined"));
        }
        let schema = ArraySchema {
            dims: self.dims.iter().map(DimCreator::to_schema).collect(),
            attrs: self.attrs.iter().map(AttrCreator::to_schema).collect(),
            sparse: self.sparse,
        };
        schema.check()?;
        Ok(schema)
    }

    /// Build the schema and persist it at `path`.
    ///
    /// The creator remains usable afterwards, e.g. for re-creation at a
    /// different path.
    pub fn create(&self, storage: &ReadableWritableListableStorage, path: &str) -> Result<()> {
        let schema = self.to_schema()?;
        storage::create_array(storage, path, &schema)
    }

    /// The registry this creator resolves its dimensions against.
    pub fn registry(&self) -> &DataspaceRegistry {
        &self.registry
    }
}

impl std::fmt::Display for ArrayCreator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dims: Vec<String> = self.dims.iter().map(|dim| dim.name()).collect();
        let attrs: Vec<&str> = self.attrs.iter().map(|attr| attr.name.as_str()).collect();
        write!(
            f,
            "ArrayCreator({}: dims=[{}], attrs=[{}], {})",
            self.name,
            dims.join(", "),
            attrs.join(", "),
            if self.sparse { "sparse" } else { "dense" }
        )
    }
}
