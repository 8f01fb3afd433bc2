//! Conversion of NetCDF dimensions into shared dimensions.
//!
//! Only the dimension-conversion policy lives here: inspecting a NetCDF
//! dimension or coordinate variable, inferring the shared-dimension domain
//! (fixed, unlimited, scalar, coordinate) and extracting the dimension's
//! values for writing, either as a sparse index enumeration or a dense
//! slice. Requires the `netcdf` feature.

use std::ops::Range;

use crate::dataspace::{DataspaceRegistry, Domain};
use crate::dtype::Dtype;
use crate::{Error, Result};

/// A NetCDF file or group, as a dimension/variable lookup source.
///
/// NetCDF dimension scoping applies: a dimension defined in an ancestor
/// group is visible from its children. Variables are looked up in the
/// given group only.
#[derive(Clone, Copy)]
pub enum DimSource<'a> {
    File(&'a netcdf::File),
    Group(&'a netcdf::Group<'a>),
}

impl<'a> From<&'a netcdf::File> for DimSource<'a> {
    fn from(file: &'a netcdf::File) -> Self {
        Self::File(file)
    }
}

impl<'a> From<&'a netcdf::Group<'a>> for DimSource<'a> {
    fn from(group: &'a netcdf::Group<'a>) -> Self {
        Self::Group(group)
    }
}

impl<'a> DimSource<'a> {
    fn dimension(&self, name: &str) -> Option<netcdf::Dimension<'a>> {
        match self {
            DimSource::File(file) => file.dimension(name),
            DimSource::Group(group) => group.dimension(name),
        }
    }

    fn variable(&self, name: &str) -> Option<netcdf::Variable<'a>> {
        match self {
            DimSource::File(file) => file.variable(name),
            DimSource::Group(group) => group.variable(name),
        }
    }
}

/// Values extracted for one dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum DimensionValues {
    /// Sparse enumeration of integer indices.
    Indices(Vec<u64>),
    /// Sparse enumeration of coordinate values.
    Coordinates(Vec<f64>),
    /// Dense contiguous slice.
    Slice(Range<u64>),
}

impl DimensionValues {
    pub fn len(&self) -> u64 {
        match self {
            DimensionValues::Indices(indices) => indices.len() as u64,
            DimensionValues::Coordinates(coords) => coords.len() as u64,
            DimensionValues::Slice(range) => range.end.saturating_sub(range.start),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn index_domain(size: u64, dtype: Dtype) -> Result<Domain> {
    if size == 0 {
        return Err(Error::schema("dimension size must be nonzero"));
    }
    if dtype.is_unsigned_integer() {
        Ok(Domain::UInt {
            min: 0,
            max: size - 1,
        })
    } else if dtype.is_signed_integer() {
        let max = i64::try_from(size - 1)
            .map_err(|_| Error::schema(format!("dimension size {size} overflows {dtype}")))?;
        Ok(Domain::Int { min: 0, max })
    } else {
        Err(Error::schema(format!(
            "index dimensions require an integer data type, got {dtype}"
        )))
    }
}

fn variable_dtype(var: &netcdf::Variable<'_>) -> Result<Dtype> {
    use netcdf::types::{FloatType, IntType, NcVariableType};
    match var.vartype() {
        NcVariableType::Int(IntType::I8) => Ok(Dtype::Int8),
        NcVariableType::Int(IntType::I16) => Ok(Dtype::Int16),
        NcVariableType::Int(IntType::I32) => Ok(Dtype::Int32),
        NcVariableType::Int(IntType::I64) => Ok(Dtype::Int64),
        NcVariableType::Int(IntType::U8) => Ok(Dtype::UInt8),
        NcVariableType::Int(IntType::U16) => Ok(Dtype::UInt16),
        NcVariableType::Int(IntType::U32) => Ok(Dtype::UInt32),
        NcVariableType::Int(IntType::U64) => Ok(Dtype::UInt64),
        NcVariableType::Float(FloatType::F32) => Ok(Dtype::Float32),
        NcVariableType::Float(FloatType::F64) => Ok(Dtype::Float64),
        other => Err(Error::unsupported(format!(
            "variable {:?} has unsupported type {other:?}",
            var.name()
        ))),
    }
}

/// Converts a NetCDF dimension into an index dimension.
///
/// Fixed dimensions get the domain `[0, size - 1]`; unlimited dimensions
/// are bounded by the supplied maximum size instead.
#[derive(Debug, Clone)]
pub struct NetCdfDimToDimConverter {
    input_name: String,
    input_size: u64,
    unlimited: bool,
    domain: Domain,
    dtype: Dtype,
}

impl NetCdfDimToDimConverter {
    /// Inspect `dim` and register the resulting shared dimension.
    pub fn from_netcdf(
        registry: &DataspaceRegistry,
        dim: &netcdf::Dimension<'_>,
        max_size: u64,
        dtype: Dtype,
    ) -> Result<Self> {
        let unlimited = dim.is_unlimited();
        let input_size = dim.len() as u64;
        let domain = if unlimited {
            index_domain(max_size, dtype)?
        } else {
            index_domain(input_size, dtype)?
        };
        registry.register(dim.name(), Some(domain), dtype)?;
        Ok(Self {
            input_name: dim.name(),
            input_size,
            unlimited,
            domain,
            dtype,
        })
    }

    pub fn name(&self) -> &str {
        &self.input_name
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    /// Size of the input dimension when the converter was built.
    pub fn input_size(&self) -> u64 {
        self.input_size
    }

    pub fn is_unlimited(&self) -> bool {
        self.unlimited
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    /// Extract the current index range of the dimension in `source`.
    ///
    /// The dimension is resolved by name in the source group (ancestor
    /// dimensions are visible). An unlimited dimension with no data is an
    /// error, as is a current size beyond the bounded domain.
    pub fn get_values(&self, source: DimSource<'_>, sparse: bool) -> Result<DimensionValues> {
        let dim = source
            .dimension(&self.input_name)
            .ok_or_else(|| Error::not_found("dimension", self.input_name.clone()))?;
        let len = dim.len() as u64;
        if len == 0 {
            return Err(Error::schema(format!(
                "dimension {:?} has no data",
                self.input_name
            )));
        }
        let max_len = self.domain.size().expect("index domains are sized");
        if len > max_len {
            return Err(Error::OutOfRange {
                dim: self.input_name.clone(),
                len,
                max: max_len,
            });
        }
        Ok(if sparse {
            DimensionValues::Indices((0..len).collect())
        } else {
            DimensionValues::Slice(0..len)
        })
    }
}

impl std::fmt::Display for NetCdfDimToDimConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "NetCdfDimToDimConverter({} [{}{}] -> {} {})",
            self.input_name,
            self.input_size,
            if self.unlimited { ", unlimited" } else { "" },
            self.domain,
            self.dtype
        )
    }
}

/// Converts a NetCDF coordinate variable into an unbounded dimension.
///
/// The dimension has no domain at definition time; its values come from
/// the coordinate variable and are sparse-only.
#[derive(Debug, Clone)]
pub struct NetCdfCoordToDimConverter {
    input_name: String,
    input_dtype: Dtype,
}

impl NetCdfCoordToDimConverter {
    /// Inspect the coordinate variable `var` and register the resulting
    /// shared dimension.
    pub fn from_netcdf(
        registry: &DataspaceRegistry,
        var: &netcdf::Variable<'_>,
    ) -> Result<Self> {
        let dims = var.dimensions();
        if dims.len() != 1 || dims[0].name() != var.name() {
            return Err(Error::schema(format!(
                "variable {:?} is not a coordinate variable",
                var.name()
            )));
        }
        let dtype = variable_dtype(var)?;
        registry.register(var.name(), None, dtype)?;
        Ok(Self {
            input_name: var.name(),
            input_dtype: dtype,
        })
    }

    pub fn name(&self) -> &str {
        &self.input_name
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn input_dtype(&self) -> Dtype {
        self.input_dtype
    }

    /// Coordinate dimensions have no domain until data is written.
    pub fn domain(&self) -> Option<Domain> {
        None
    }

    pub fn dtype(&self) -> Dtype {
        self.input_dtype
    }

    /// Read the coordinate values from `source`.
    ///
    /// Returns `None` when the variable holds no data yet. Dense
    /// extraction is unsupported: coordinates have no index grid.
    pub fn get_values(
        &self,
        source: DimSource<'_>,
        sparse: bool,
    ) -> Result<Option<DimensionValues>> {
        let var = source
            .variable(&self.input_name)
            .ok_or_else(|| Error::not_found("variable", self.input_name.clone()))?;
        if var.dimensions().len() != 1 {
            return Err(Error::schema(format!(
                "variable {:?} is not one dimensional",
                self.input_name
            )));
        }
        let len: usize = var.dimensions().iter().map(|dim| dim.len()).product();
        if len == 0 {
            return Ok(None);
        }
        if !sparse {
            return Err(Error::unsupported(
                "coordinate dimensions only support sparse value extraction",
            ));
        }
        let values: Vec<f64> = var.get_values(..)?;
        Ok(Some(DimensionValues::Coordinates(values)))
    }
}

impl std::fmt::Display for NetCdfCoordToDimConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "NetCdfCoordToDimConverter({} {})",
            self.input_name, self.input_dtype
        )
    }
}

/// Maps all scalar NetCDF variables onto one single-cell dimension.
#[derive(Debug, Clone)]
pub struct NetCdfScalarToDimConverter {
    name: String,
    dtype: Dtype,
}

impl NetCdfScalarToDimConverter {
    /// Register a single-cell dimension with the given name.
    pub fn create(
        registry: &DataspaceRegistry,
        name: impl Into<String>,
        dtype: Dtype,
    ) -> Result<Self> {
        let name = name.into();
        let domain = index_domain(1, dtype)?;
        registry.register(name.clone(), Some(domain), dtype)?;
        Ok(Self { name, dtype })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> Domain {
        match self.dtype.is_signed_integer() {
            true => Domain::Int { min: 0, max: 0 },
            false => Domain::UInt { min: 0, max: 0 },
        }
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    /// The single index of the scalar cell.
    pub fn get_values(&self, _source: DimSource<'_>, sparse: bool) -> Result<DimensionValues> {
        Ok(if sparse {
            DimensionValues::Indices(vec![0])
        } else {
            DimensionValues::Slice(0..1)
        })
    }
}

impl std::fmt::Display for NetCdfScalarToDimConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NetCdfScalarToDimConverter({} {})", self.name, self.dtype)
    }
}

/// The closed set of dimension conversion policies.
#[derive(Debug, Clone)]
pub enum NetCdfDimConverter {
    Dim(NetCdfDimToDimConverter),
    Coord(NetCdfCoordToDimConverter),
    Scalar(NetCdfScalarToDimConverter),
}

impl NetCdfDimConverter {
    /// Select the conversion policy for `dim` by inspecting `source`: a
    /// 1-d coordinate variable of the same name converts as coordinates,
    /// anything else as an index dimension.
    pub fn from_dimension(
        registry: &DataspaceRegistry,
        source: DimSource<'_>,
        dim: &netcdf::Dimension<'_>,
        max_size: u64,
        index_dtype: Dtype,
    ) -> Result<Self> {
        if let Some(var) = source.variable(&dim.name()) {
            let dims = var.dimensions();
            if dims.len() == 1 && dims[0].name() == var.name() {
                return Ok(Self::Coord(NetCdfCoordToDimConverter::from_netcdf(
                    registry, &var,
                )?));
            }
        }
        Ok(Self::Dim(NetCdfDimToDimConverter::from_netcdf(
            registry, dim, max_size, index_dtype,
        )?))
    }

    pub fn name(&self) -> &str {
        match self {
            NetCdfDimConverter::Dim(converter) => converter.name(),
            NetCdfDimConverter::Coord(converter) => converter.name(),
            NetCdfDimConverter::Scalar(converter) => converter.name(),
        }
    }

    pub fn domain(&self) -> Option<Domain> {
        match self {
            NetCdfDimConverter::Dim(converter) => Some(converter.domain()),
            NetCdfDimConverter::Coord(converter) => converter.domain(),
            NetCdfDimConverter::Scalar(converter) => Some(converter.domain()),
        }
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            NetCdfDimConverter::Dim(converter) => converter.dtype(),
            NetCdfDimConverter::Coord(converter) => converter.dtype(),
            NetCdfDimConverter::Scalar(converter) => converter.dtype(),
        }
    }

    /// Extract the dimension's values from `source`.
    ///
    /// `None` only occurs for a coordinate variable holding no data.
    pub fn get_values(
        &self,
        source: DimSource<'_>,
        sparse: bool,
    ) -> Result<Option<DimensionValues>> {
        match self {
            NetCdfDimConverter::Dim(converter) => {
                converter.get_values(source, sparse).map(Some)
            }
            NetCdfDimConverter::Coord(converter) => converter.get_values(source, sparse),
            NetCdfDimConverter::Scalar(converter) => {
                converter.get_values(source, sparse).map(Some)
            }
        }
    }
}
