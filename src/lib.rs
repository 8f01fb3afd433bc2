//! NetCDF-style groups of arrays for [`zarrs`].
//!
//! `zarrs_cf` is a convenience layer over the `zarrs` storage engine. It
//! adds what multi-variable scientific datasets need and zarr itself does
//! not model:
//!
//! - **shared dimensions**: a [`DataspaceRegistry`] scopes named, typed,
//!   domain-checked dimensions reused across array definitions;
//! - **multi-attribute array schemas**: an [`ArrayCreator`] aggregates
//!   shared dimensions and attribute definitions into an immutable
//!   [`ArraySchema`] persisted as one zarr array per attribute;
//! - **groups of arrays**: a [`GroupSchema`] aggregates named array
//!   schemas plus an optional metadata array and answers which member
//!   arrays contain an attribute; a [`Group`] opens such a location,
//!   resolves one member from constructor hints and exposes key-value
//!   metadata;
//! - **NetCDF dimension conversion** (feature `netcdf`): policies turning
//!   NetCDF dimensions and coordinate variables into shared dimensions.
//!
//! All storage-format engineering stays in `zarrs`; this crate only writes
//! schema documents into zarr attributes and creates ordinary zarr nodes.

pub mod creator;
pub mod dataspace;
pub mod dtype;
mod error;
pub mod filter;
pub mod group;
pub mod metadata;
#[cfg(feature = "netcdf")]
pub mod netcdf4;
pub mod schema;
pub mod storage;

pub use zarrs;

pub use creator::{ArrayCreator, AttrCreator, DimCreator};
pub use dataspace::{DataspaceRegistry, Domain, SharedDim};
pub use dtype::Dtype;
pub use error::{Error, Result};
pub use filter::Filter;
pub use group::{Group, GroupOpenOptions, OpenArray};
pub use metadata::{ArrayMetadata, AttrMetadata, MetadataMap};
pub use schema::{
    ArraySchema, AttributeSchema, DimensionSchema, GroupSchema, METADATA_ARRAY_NAME,
};
