//! Runtime access to a group of arrays.
//!
//! A [`Group`] opens a storage location, loads the group schema, binds the
//! metadata array when present, and optionally resolves exactly one member
//! array from the constructor hints. All owned handles flush and release
//! when the group is closed or dropped, innermost first.

use zarrs::storage::ReadableWritableListableStorage;

use crate::metadata::{ArrayMetadata, AttrMetadata, MetadataMap};
use crate::schema::{ArraySchema, GroupSchema, METADATA_ARRAY_NAME};
use crate::{storage, Error, Result};

/// Hints selecting the member array a [`Group`] opens.
///
/// With an `array` hint the named member is opened directly. With only an
/// `attr` hint the member containing that attribute is opened, provided
/// exactly one exists. With neither, no member is opened.
#[derive(Debug, Clone, Default)]
pub struct GroupOpenOptions {
    pub array: Option<String>,
    pub attr: Option<String>,
}

impl GroupOpenOptions {
    pub fn array(mut self, name: impl Into<String>) -> Self {
        self.array = Some(name.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>) -> Self {
        self.attr = Some(name.into());
        self
    }
}

/// One member array opened within a [`Group`].
pub struct OpenArray {
    storage: ReadableWritableListableStorage,
    name: String,
    path: String,
    schema: ArraySchema,
    meta: MetadataMap,
}

impl OpenArray {
    fn open(
        storage: &ReadableWritableListableStorage,
        name: &str,
        path: String,
        schema: ArraySchema,
    ) -> Result<Self> {
        let meta = MetadataMap::open(storage, path.clone())?;
        Ok(Self {
            storage: storage.clone(),
            name: name.to_string(),
            path,
            schema,
            meta,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn schema(&self) -> &ArraySchema {
        &self.schema
    }

    /// The array's key-value metadata.
    pub fn meta(&self) -> &MetadataMap {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut MetadataMap {
        &mut self.meta
    }

    /// Open the zarr array backing one attribute (or, for sparse arrays, a
    /// dimension) for data access through the engine.
    pub fn attr_array(
        &self,
        name: &str,
    ) -> Result<zarrs::array::Array<dyn zarrs::storage::ReadableWritableListableStorageTraits>>
    {
        if !self.schema.has_attr(name) && self.schema.dim(name).is_none() {
            return Err(Error::not_found("attribute", name));
        }
        storage::open_child_array(&self.storage, &self.path, name)
    }

    fn close(mut self) -> Result<()> {
        self.meta.flush()
    }
}

impl std::fmt::Debug for OpenArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenArray")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("schema", &self.schema)
            .finish()
    }
}

/// Open handle to a group of arrays.
pub struct Group {
    path: String,
    schema: GroupSchema,
    meta: Option<MetadataMap>,
    array: Option<OpenArray>,
    attr_hint: Option<String>,
}

impl Group {
    /// Open the group at `path` without selecting a member array.
    pub fn open(storage: &ReadableWritableListableStorage, path: &str) -> Result<Self> {
        Self::open_with(storage, path, GroupOpenOptions::default())
    }

    /// Open the group at `path`, resolving a member array from `options`.
    pub fn open_with(
        storage: &ReadableWritableListableStorage,
        path: &str,
        options: GroupOpenOptions,
    ) -> Result<Self> {
        let schema = GroupSchema::load(storage, path)?;
        let meta = if schema.metadata_schema().is_some() {
            Some(MetadataMap::open(
                storage,
                storage::join_path(path, METADATA_ARRAY_NAME),
            )?)
        } else {
            None
        };

        let array_name = match (&options.array, &options.attr) {
            (Some(array_name), _) => {
                if schema.get(array_name).is_none() {
                    return Err(Error::not_found("array", array_name.clone()));
                }
                Some(array_name.clone())
            }
            (None, Some(attr_name)) => match schema.arrays_with_attr(attr_name) {
                [] => return Err(Error::not_found("array with attribute", attr_name.clone())),
                [single] => Some(single.clone()),
                several => {
                    return Err(Error::Ambiguous {
                        name: attr_name.clone(),
                        arrays: several.to_vec(),
                    });
                }
            },
            (None, None) => None,
        };
        if let (Some(array_name), Some(attr_name)) = (&array_name, &options.attr) {
            let member = schema.get(array_name).expect("resolved above");
            if !member.has_attr(attr_name) {
                return Err(Error::not_found("attribute", attr_name.clone()));
            }
        }

        let array = match array_name {
            Some(array_name) => {
                let member_schema = schema.get(&array_name).expect("resolved above").clone();
                let member_path = storage::join_path(path, &array_name);
                Some(OpenArray::open(
                    storage,
                    &array_name,
                    member_path,
                    member_schema,
                )?)
            }
            None => None,
        };

        log::debug!("opened group at {path}");
        Ok(Self {
            path: path.to_string(),
            schema,
            meta,
            array,
            attr_hint: options.attr,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn schema(&self) -> &GroupSchema {
        &self.schema
    }

    /// Whether this group has a metadata array.
    pub fn has_metadata_array(&self) -> bool {
        self.meta.is_some()
    }

    /// The group's key-value metadata, absent when the group has no
    /// metadata array. That absence is not an error.
    pub fn meta(&self) -> Option<&MetadataMap> {
        self.meta.as_ref()
    }

    pub fn meta_mut(&mut self) -> Option<&mut MetadataMap> {
        self.meta.as_mut()
    }

    /// The member array opened by the constructor hints.
    pub fn array(&self) -> Result<&OpenArray> {
        self.array
            .as_ref()
            .ok_or_else(|| Error::state("no array is open in this context"))
    }

    pub fn array_mut(&mut self) -> Result<&mut OpenArray> {
        self.array
            .as_mut()
            .ok_or_else(|| Error::state("no array is open in this context"))
    }

    /// Array-level metadata of the open array (attribute-scoped keys
    /// hidden).
    pub fn array_metadata(&mut self) -> Result<ArrayMetadata<'_>> {
        let array = self
            .array
            .as_mut()
            .ok_or_else(|| Error::state("no array is open in this context"))?;
        Ok(ArrayMetadata::new(array.meta_mut()))
    }

    /// Metadata of the unambiguous attribute of the open array: the `attr`
    /// hint when one was given, or the single attribute of a
    /// single-attribute array.
    pub fn attr_metadata(&mut self) -> Result<AttrMetadata<'_>> {
        let attr_hint = self.attr_hint.clone();
        let array = self
            .array
            .as_mut()
            .ok_or_else(|| Error::state("no array is open in this context"))?;
        let attr_name = match attr_hint {
            Some(attr_name) => attr_name,
            None => match array.schema().attrs.as_slice() {
                [single] => single.name.clone(),
                _ => {
                    return Err(Error::state(format!(
                        "array {:?} has multiple attributes; attribute name required",
                        array.name()
                    )));
                }
            },
        };
        Ok(AttrMetadata::new(array.meta_mut(), &attr_name))
    }

    /// Metadata of a named attribute of the open array, regardless of
    /// ambiguity.
    pub fn get_attr_metadata(&mut self, name: &str) -> Result<AttrMetadata<'_>> {
        let array = self
            .array
            .as_mut()
            .ok_or_else(|| Error::state("no array is open in this context"))?;
        if !array.schema().has_attr(name) {
            return Err(Error::not_found("attribute", name));
        }
        Ok(AttrMetadata::new(array.meta_mut(), name))
    }

    /// Flush and release every owned handle, innermost first.
    ///
    /// Dropping the group does the same best-effort; `close` surfaces
    /// write errors.
    pub fn close(mut self) -> Result<()> {
        if let Some(array) = self.array.take() {
            array.close()?;
        }
        if let Some(meta) = self.meta.take() {
            meta.close()?;
        }
        Ok(())
    }

    /// Create a group at `path` from a schema: the marker node, one member
    /// array per schema entry, and the metadata array when the schema has
    /// one.
    pub fn create(
        storage: &ReadableWritableListableStorage,
        path: &str,
        schema: &GroupSchema,
    ) -> Result<()> {
        schema.check()?;
        if storage::node_exists(storage, path)? {
            return Err(Error::conflict(format!("{path:?} already holds an object")));
        }
        storage::create_group_node(storage, path)?;
        for (name, array_schema) in schema.iter() {
            storage::create_array(storage, &storage::join_path(path, name), array_schema)?;
        }
        if let Some(metadata_schema) = schema.metadata_schema() {
            storage::create_array(
                storage,
                &storage::join_path(path, METADATA_ARRAY_NAME),
                metadata_schema,
            )?;
        }
        Ok(())
    }

    /// Create the arrays of a "virtual" group: the metadata array at
    /// `path` itself and each member at `<path>_<name>`.
    #[deprecated(note = "create the arrays separately and load with GroupSchema::load_virtual")]
    pub fn create_virtual(
        storage: &ReadableWritableListableStorage,
        path: &str,
        schema: &GroupSchema,
    ) -> Result<()> {
        schema.check()?;
        if let Some(metadata_schema) = schema.metadata_schema() {
            storage::create_array(storage, path, metadata_schema)?;
        }
        for (name, array_schema) in schema.iter() {
            storage::create_array(storage, &format!("{path}_{name}"), array_schema)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("path", &self.path)
            .field("members", &self.schema.len())
            .field("has_metadata_array", &self.has_metadata_array())
            .field(
                "open_array",
                &self.array.as_ref().map(|array| array.name()),
            )
            .finish()
    }
}
