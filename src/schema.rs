//! Immutable array and group schemas.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use zarrs::storage::ReadableWritableListableStorage;

use crate::dataspace::Domain;
use crate::dtype::Dtype;
use crate::filter::Filter;
use crate::{storage, Error, Result};

/// Reserved member name of the array holding group-level metadata.
pub const METADATA_ARRAY_NAME: &str = "__cf_metadata";

/// One dimension of an array schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionSchema {
    pub name: String,
    pub domain: Option<Domain>,
    pub dtype: Dtype,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
}

/// One attribute of an array schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSchema {
    pub name: String,
    pub dtype: Dtype,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
}

/// Immutable description of one multi-attribute array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArraySchema {
    pub dims: Vec<DimensionSchema>,
    pub attrs: Vec<AttributeSchema>,
    #[serde(default)]
    pub sparse: bool,
}

impl ArraySchema {
    /// Validate the structural invariants of this schema.
    pub fn check(&self) -> Result<()> {
        if self.dims.is_empty() {
            return Err(Error::schema("array schema requires at least one dimension"));
        }
        let mut dim_names = std::collections::HashSet::new();
        for dim in &self.dims {
            if !dim_names.insert(dim.name.as_str()) {
                return Err(Error::conflict(format!(
                    "duplicate dimension name {:?}",
                    dim.name
                )));
            }
            if let Some(domain) = &dim.domain {
                domain.check(dim.dtype)?;
            }
            if dim.tile == Some(0) {
                return Err(Error::schema(format!(
                    "dimension {:?} has a zero tile size",
                    dim.name
                )));
            }
            if !self.sparse {
                let sized = dim.domain.is_some_and(|domain| domain.size().is_some());
                if !sized {
                    return Err(Error::schema(format!(
                        "dense arrays require a sized integer domain; dimension {:?} has none",
                        dim.name
                    )));
                }
            }
        }
        if self.attrs.is_empty() {
            return Err(Error::schema("no attributes defined"));
        }
        let mut attr_names = std::collections::HashSet::new();
        for attr in &self.attrs {
            if !attr_names.insert(attr.name.as_str()) {
                return Err(Error::conflict(format!(
                    "duplicate attribute name {:?}",
                    attr.name
                )));
            }
            if dim_names.contains(attr.name.as_str()) {
                return Err(Error::conflict(format!(
                    "attribute name {:?} collides with a dimension name",
                    attr.name
                )));
            }
        }
        Ok(())
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    pub fn nattr(&self) -> usize {
        self.attrs.len()
    }

    pub fn dim(&self, name: &str) -> Option<&DimensionSchema> {
        self.dims.iter().find(|dim| dim.name == name)
    }

    pub fn attr(&self, name: &str) -> Option<&AttributeSchema> {
        self.attrs.iter().find(|attr| attr.name == name)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Extent of a dense array, one length per dimension.
    pub fn shape(&self) -> Result<Vec<u64>> {
        self.dims
            .iter()
            .map(|dim| {
                dim.domain
                    .and_then(|domain| domain.size())
                    .ok_or_else(|| {
                        Error::schema(format!(
                            "dimension {:?} has no fixed extent",
                            dim.name
                        ))
                    })
            })
            .collect()
    }
}

impl fmt::Display for ArraySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<&str> = self.dims.iter().map(|d| d.name.as_str()).collect();
        let attrs: Vec<&str> = self.attrs.iter().map(|a| a.name.as_str()).collect();
        write!(
            f,
            "ArraySchema(dims=[{}], attrs=[{}], {})",
            dims.join(", "),
            attrs.join(", "),
            if self.sparse { "sparse" } else { "dense" }
        )
    }
}

/// Serialized form of [`GroupSchema`]; the attribute index is derived, not
/// stored.
#[derive(Serialize, Deserialize)]
struct GroupSchemaDocument {
    arrays: Vec<(String, ArraySchema)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata_schema: Option<ArraySchema>,
}

/// A named collection of array schemas plus one optional metadata-array
/// schema.
///
/// The attribute index maps each attribute name to the member arrays that
/// contain it, in the order the members were supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "GroupSchemaDocument", into = "GroupSchemaDocument")]
pub struct GroupSchema {
    arrays: Vec<(String, ArraySchema)>,
    metadata_schema: Option<ArraySchema>,
    attr_index: BTreeMap<String, Vec<String>>,
}

impl TryFrom<GroupSchemaDocument> for GroupSchema {
    type Error = Error;

    fn try_from(document: GroupSchemaDocument) -> Result<Self> {
        GroupSchema::new(document.arrays, document.metadata_schema)
    }
}

impl From<GroupSchema> for GroupSchemaDocument {
    fn from(schema: GroupSchema) -> Self {
        Self {
            arrays: schema.arrays,
            metadata_schema: schema.metadata_schema,
        }
    }
}

impl GroupSchema {
    /// Build a group schema from `(name, schema)` pairs and an optional
    /// metadata-array schema.
    pub fn new(
        arrays: impl IntoIterator<Item = (String, ArraySchema)>,
        metadata_schema: Option<ArraySchema>,
    ) -> Result<Self> {
        let arrays: Vec<(String, ArraySchema)> = arrays.into_iter().collect();
        let mut seen = std::collections::HashSet::new();
        for (name, _) in &arrays {
            if name == METADATA_ARRAY_NAME {
                return Err(Error::conflict(format!(
                    "array name {METADATA_ARRAY_NAME:?} is reserved for the metadata array"
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::conflict(format!("duplicate array name {name:?}")));
            }
        }
        let attr_index = build_attr_index(&arrays);
        Ok(Self {
            arrays,
            metadata_schema,
            attr_index,
        })
    }

    /// Like [`GroupSchema::new`], synthesizing the default metadata schema.
    pub fn with_default_metadata(
        arrays: impl IntoIterator<Item = (String, ArraySchema)>,
    ) -> Result<Self> {
        Self::new(arrays, Some(Self::default_metadata_schema()))
    }

    /// The metadata schema used when none is supplied explicitly: a dense
    /// single-cell array.
    pub fn default_metadata_schema() -> ArraySchema {
        ArraySchema {
            dims: vec![DimensionSchema {
                name: "dim".to_string(),
                domain: Some(Domain::Int { min: 0, max: 0 }),
                dtype: Dtype::Int32,
                tile: Some(1),
                filters: Vec::new(),
            }],
            attrs: vec![AttributeSchema {
                name: "attr".to_string(),
                dtype: Dtype::Int32,
                filters: Vec::new(),
                fill: None,
                nullable: false,
            }],
            sparse: false,
        }
    }

    /// Number of member arrays (the metadata array is not a member).
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ArraySchema> {
        self.arrays
            .iter()
            .find(|(array_name, _)| array_name == name)
            .map(|(_, schema)| schema)
    }

    /// Member `(name, schema)` pairs in supplied order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArraySchema)> {
        self.arrays
            .iter()
            .map(|(name, schema)| (name.as_str(), schema))
    }

    pub fn metadata_schema(&self) -> Option<&ArraySchema> {
        self.metadata_schema.as_ref()
    }

    /// Member arrays containing attribute `name`, in supplied order; empty
    /// when no member has it.
    pub fn arrays_with_attr(&self, name: &str) -> &[String] {
        self.attr_index
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr_index.contains_key(name)
    }

    /// Validate every member schema and the metadata schema.
    pub fn check(&self) -> Result<()> {
        for (name, schema) in &self.arrays {
            schema
                .check()
                .map_err(|err| Error::schema(format!("array {name:?}: {err}")))?;
        }
        if let Some(metadata_schema) = &self.metadata_schema {
            metadata_schema
                .check()
                .map_err(|err| Error::schema(format!("metadata array: {err}")))?;
        }
        Ok(())
    }

    /// Load the schema of the group at `path`.
    ///
    /// Fails when `path` is not a cf group. Members are enumerated in
    /// sorted name order; the reserved metadata member populates
    /// [`GroupSchema::metadata_schema`] instead of the member set.
    pub fn load(storage: &ReadableWritableListableStorage, path: &str) -> Result<Self> {
        if storage::object_type(storage, path)? != Some(storage::ObjectType::Group) {
            return Err(Error::schema(format!("{path:?} is not a group")));
        }
        let mut arrays = Vec::new();
        let mut metadata_schema = None;
        for (name, member_path) in storage::members(storage, path)? {
            let schema = storage::load_array_schema(storage, &member_path)?;
            if name == METADATA_ARRAY_NAME {
                metadata_schema = Some(schema);
            } else {
                arrays.push((name, schema));
            }
        }
        Self::new(arrays, metadata_schema)
    }

    /// Load a group schema from an explicit name→path map instead of
    /// enumerating a group container.
    ///
    /// The reserved key [`METADATA_ARRAY_NAME`] names the metadata array.
    pub fn load_virtual(
        storage: &ReadableWritableListableStorage,
        array_paths: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let mut arrays = Vec::new();
        let mut metadata_schema = None;
        for (name, member_path) in array_paths {
            let schema = storage::load_array_schema(storage, &member_path)?;
            if name == METADATA_ARRAY_NAME {
                metadata_schema = Some(schema);
            } else {
                arrays.push((name, schema));
            }
        }
        Self::new(arrays, metadata_schema)
    }
}

fn build_attr_index(arrays: &[(String, ArraySchema)]) -> BTreeMap<String, Vec<String>> {
    let mut index: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (array_name, schema) in arrays {
        for attr in &schema.attrs {
            index
                .entry(attr.name.clone())
                .or_default()
                .push(array_name.clone());
        }
    }
    index
}

impl PartialEq for GroupSchema {
    fn eq(&self, other: &Self) -> bool {
        if self.arrays.len() != other.arrays.len() {
            return false;
        }
        // map equality: member order is presentation, not identity
        self.metadata_schema == other.metadata_schema
            && self
                .arrays
                .iter()
                .all(|(name, schema)| other.get(name) == Some(schema))
    }
}

impl std::ops::Index<&str> for GroupSchema {
    type Output = ArraySchema;

    fn index(&self, name: &str) -> &Self::Output {
        self.get(name)
            .unwrap_or_else(|| panic!("no array named {name:?} in group schema"))
    }
}

impl fmt::Display for GroupSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "GroupSchema(")?;
        for (name, schema) in &self.arrays {
            writeln!(f, "  {name}: {schema},")?;
        }
        match &self.metadata_schema {
            Some(schema) => writeln!(f, "  metadata: {schema},")?,
            None => writeln!(f, "  metadata: none,")?,
        }
        write!(f, ")")
    }
}
