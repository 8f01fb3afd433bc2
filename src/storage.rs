//! Facade over the `zarrs` storage collaborator.
//!
//! A cf "array" is persisted as a container zarr group whose attributes
//! carry the schema document, with one zarr array child per attribute
//! (dense) or per attribute and per dimension (sparse coordinates). A cf
//! "group" is a zarr group marked with [`GROUP_MARKER_KEY`] that contains
//! such containers. Everything here goes through public `zarrs` APIs; no
//! bytes are interpreted by this layer.

use zarrs::array::ArrayBuilder;
use zarrs::group::GroupBuilder;
use zarrs::metadata::v3::NodeMetadataV3;
use zarrs::node::{meta_key_v3, NodePath};
use zarrs::storage::{discover_children, ReadableWritableListableStorage, StorePrefix};

use crate::filter::to_codecs;
use crate::schema::ArraySchema;
use crate::{Error, Result};

/// Zarr attribute key holding the schema document of a cf array.
pub const SCHEMA_KEY: &str = "cf_array_schema";
/// Zarr attribute key marking a cf group, holding the format version.
pub const GROUP_MARKER_KEY: &str = "cf_group";
/// Zarr attribute key holding the key-value metadata of a cf array.
pub const META_KEY: &str = "cf_meta";

/// Version of the on-store layout, written into [`GROUP_MARKER_KEY`].
pub const FORMAT_VERSION: u32 = 1;

/// Chunk length for the growable 1-d arrays backing sparse members.
const SPARSE_CHUNK_LEN: u64 = 1024;

/// What a path addresses, as far as the cf layer is concerned.
///
/// Plain zarr nodes and empty locations are neither: [`object_type`]
/// returns `None` for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Array,
    Group,
}

/// Join a child name onto a node path.
pub(crate) fn join_path(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    format!("{base}/{name}")
}

fn node_path(path: &str) -> Result<NodePath> {
    path.try_into().map_err(Error::from)
}

/// Read and parse `<path>/zarr.json`, if present.
fn node_metadata(
    storage: &ReadableWritableListableStorage,
    path: &str,
) -> Result<Option<NodeMetadataV3>> {
    let key = meta_key_v3(&node_path(path)?);
    let Some(bytes) = storage.get(&key)? else {
        return Ok(None);
    };
    let metadata: NodeMetadataV3 = serde_json::from_slice(&bytes)?;
    Ok(Some(metadata))
}

/// The attributes of the container group at `path`, or `None` when the
/// node is absent or not a group.
pub(crate) fn container_attributes(
    storage: &ReadableWritableListableStorage,
    path: &str,
) -> Result<Option<serde_json::Map<String, serde_json::Value>>> {
    match node_metadata(storage, path)? {
        Some(NodeMetadataV3::Group(group)) => Ok(Some(group.attributes)),
        _ => Ok(None),
    }
}

/// Classify the object at `path`.
pub fn object_type(
    storage: &ReadableWritableListableStorage,
    path: &str,
) -> Result<Option<ObjectType>> {
    let Some(attributes) = container_attributes(storage, path)? else {
        return Ok(None);
    };
    if attributes.contains_key(SCHEMA_KEY) {
        Ok(Some(ObjectType::Array))
    } else if attributes.contains_key(GROUP_MARKER_KEY) {
        Ok(Some(ObjectType::Group))
    } else {
        Ok(None)
    }
}

pub(crate) fn node_exists(storage: &ReadableWritableListableStorage, path: &str) -> Result<bool> {
    Ok(node_metadata(storage, path)?.is_some())
}

/// Create the marker group of a cf group at `path`.
pub(crate) fn create_group_node(
    storage: &ReadableWritableListableStorage,
    path: &str,
) -> Result<()> {
    let mut attributes = serde_json::Map::new();
    attributes.insert(
        GROUP_MARKER_KEY.to_string(),
        serde_json::Value::from(FORMAT_VERSION),
    );
    GroupBuilder::new()
        .attributes(attributes)
        .build(storage.clone(), path)?
        .store_metadata()?;
    log::debug!("created cf group at {path}");
    Ok(())
}

/// Materialize a cf array at `path` from its schema.
///
/// Fails with a conflict when `path` already holds a zarr node. Storage
/// engine failures propagate unchanged.
pub fn create_array(
    storage: &ReadableWritableListableStorage,
    path: &str,
    schema: &ArraySchema,
) -> Result<()> {
    schema.check()?;
    if node_exists(storage, path)? {
        return Err(Error::conflict(format!("{path:?} already holds an object")));
    }

    let mut attributes = serde_json::Map::new();
    attributes.insert(SCHEMA_KEY.to_string(), serde_json::to_value(schema)?);
    attributes.insert(
        META_KEY.to_string(),
        serde_json::Value::Object(Default::default()),
    );
    GroupBuilder::new()
        .attributes(attributes)
        .build(storage.clone(), path)?
        .store_metadata()?;

    if schema.sparse {
        // growable 1-d coordinate array per dimension, value array per attribute
        for dim in &schema.dims {
            build_child(
                storage,
                &join_path(path, &dim.name),
                vec![0],
                vec![dim.tile.unwrap_or(SPARSE_CHUNK_LEN)],
                dim.dtype.to_zarr(),
                dim.dtype.default_fill(),
                &dim.filters,
                None,
            )?;
        }
        for attr in &schema.attrs {
            let fill = match &attr.fill {
                Some(number) => attr.dtype.fill_from_number(number)?,
                None => attr.dtype.default_fill(),
            };
            build_child(
                storage,
                &join_path(path, &attr.name),
                vec![0],
                vec![SPARSE_CHUNK_LEN],
                attr.dtype.to_zarr(),
                fill,
                &attr.filters,
                None,
            )?;
        }
    } else {
        let shape = schema.shape()?;
        let chunks: Vec<u64> = schema
            .dims
            .iter()
            .zip(&shape)
            .map(|(dim, &len)| dim.tile.unwrap_or(len))
            .collect();
        let dim_names: Vec<String> = schema.dims.iter().map(|dim| dim.name.clone()).collect();
        for attr in &schema.attrs {
            let fill = match &attr.fill {
                Some(number) => attr.dtype.fill_from_number(number)?,
                None => attr.dtype.default_fill(),
            };
            build_child(
                storage,
                &join_path(path, &attr.name),
                shape.clone(),
                chunks.clone(),
                attr.dtype.to_zarr(),
                fill,
                &attr.filters,
                Some(dim_names.clone()),
            )?;
        }
    }
    log::debug!(
        "created cf array at {path} ({} dims, {} attrs, {})",
        schema.ndim(),
        schema.nattr(),
        if schema.sparse { "sparse" } else { "dense" }
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn build_child(
    storage: &ReadableWritableListableStorage,
    path: &str,
    shape: Vec<u64>,
    chunks: Vec<u64>,
    data_type: zarrs::array::DataType,
    fill_value: zarrs::array::FillValue,
    filters: &[crate::filter::Filter],
    dimension_names: Option<Vec<String>>,
) -> Result<()> {
    let chunk_grid = chunks
        .iter()
        .map(|&c| std::num::NonZeroU64::try_from(c))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|err| Error::schema(format!("invalid chunk shape: {err:?}")))?;
    let mut builder = ArrayBuilder::new(shape, chunk_grid, data_type, fill_value);
    builder.bytes_to_bytes_codecs(to_codecs(filters)?);
    builder.dimension_names(dimension_names);
    builder.build(storage.clone(), path)?.store_metadata()?;
    Ok(())
}

/// Load the schema document of the cf array at `path`.
pub fn load_array_schema(
    storage: &ReadableWritableListableStorage,
    path: &str,
) -> Result<ArraySchema> {
    let schema_value = container_attributes(storage, path)?
        .and_then(|mut attributes| attributes.remove(SCHEMA_KEY))
        .ok_or_else(|| Error::not_found("array", path))?;
    Ok(serde_json::from_value(schema_value)?)
}

/// Open the child zarr array backing one attribute or dimension of the cf
/// array at `array_path`.
pub fn open_child_array(
    storage: &ReadableWritableListableStorage,
    array_path: &str,
    child: &str,
) -> Result<zarrs::array::Array<dyn zarrs::storage::ReadableWritableListableStorageTraits>> {
    zarrs::array::Array::open(storage.clone(), &join_path(array_path, child)).map_err(Error::from)
}

/// Enumerate the cf-array members of the group at `path` as sorted
/// `(name, path)` pairs.
///
/// Children that are not cf arrays (plain zarr nodes, nested groups,
/// stray directories) are skipped rather than rejected.
pub(crate) fn members(
    storage: &ReadableWritableListableStorage,
    path: &str,
) -> Result<Vec<(String, String)>> {
    let prefix: StorePrefix = (&node_path(path)?).try_into().map_err(Error::storage)?;
    let mut names: Vec<String> = Vec::new();
    for child in discover_children(storage, &prefix)? {
        if let Some(name) = child.as_str().trim_end_matches('/').rsplit('/').next() {
            names.push(name.to_string());
        }
    }
    names.sort_unstable();
    let mut members = Vec::new();
    for name in names {
        let member_path = join_path(path, &name);
        if object_type(storage, &member_path)? == Some(ObjectType::Array) {
            members.push((name, member_path));
        }
    }
    Ok(members)
}

/// Read the key-value metadata object of the cf array at `path`.
pub(crate) fn read_meta(
    storage: &ReadableWritableListableStorage,
    path: &str,
) -> Result<serde_json::Map<String, serde_json::Value>> {
    let attributes =
        container_attributes(storage, path)?.ok_or_else(|| Error::not_found("array", path))?;
    match attributes.get(META_KEY) {
        Some(serde_json::Value::Object(map)) => Ok(map.clone()),
        _ => Ok(Default::default()),
    }
}

/// Write back the key-value metadata object of the cf array at `path`.
pub(crate) fn write_meta(
    storage: &ReadableWritableListableStorage,
    path: &str,
    meta: &serde_json::Map<String, serde_json::Value>,
) -> Result<()> {
    let mut group = zarrs::group::Group::open(storage.clone(), path)?;
    group.attributes_mut().insert(
        META_KEY.to_string(),
        serde_json::Value::Object(meta.clone()),
    );
    group.store_metadata()?;
    Ok(())
}
