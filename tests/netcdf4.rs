#![cfg(feature = "netcdf")]

use std::path::PathBuf;

use zarrs_cf::netcdf4::{
    DimSource, DimensionValues, NetCdfCoordToDimConverter, NetCdfDimConverter,
    NetCdfDimToDimConverter, NetCdfScalarToDimConverter,
};
use zarrs_cf::{DataspaceRegistry, Domain, Dtype, Error};

fn scratch_file(tmp: &tempfile::TempDir, name: &str) -> PathBuf {
    env_logger::try_init().ok();
    tmp.path().join(name)
}

#[test]
fn coord_converter_properties() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = scratch_file(&tmp, "example.nc");
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_unlimited_dimension("value").unwrap();
        let mut var = file.add_variable::<f64>("value", &["value"]).unwrap();
        var.put_values(&[0.5f64; 8], 0..8).unwrap();
    }
    let file = netcdf::open(&path).unwrap();
    let var = file.variable("value").unwrap();
    let registry = DataspaceRegistry::new();
    let converter = NetCdfCoordToDimConverter::from_netcdf(&registry, &var).unwrap();
    assert_eq!(converter.name(), "value");
    assert_eq!(converter.domain(), None);
    assert_eq!(converter.dtype(), Dtype::Float64);
    assert_eq!(converter.input_name(), "value");
    assert_eq!(converter.input_dtype(), Dtype::Float64);
    assert!(!converter.to_string().is_empty());
    // the shared dimension is registered without a domain
    assert_eq!(registry.get("value").unwrap().domain, None);
}

#[test]
fn coord_converter_get_values() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = scratch_file(&tmp, "example.nc");
    let data: Vec<f64> = (0..8).map(|i| i as f64 / 8.0).collect();
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_unlimited_dimension("value").unwrap();
        let mut var = file.add_variable::<f64>("value", &["value"]).unwrap();
        var.put_values(&data, 0..8).unwrap();
    }
    let file = netcdf::open(&path).unwrap();
    let registry = DataspaceRegistry::new();
    let converter =
        NetCdfCoordToDimConverter::from_netcdf(&registry, &file.variable("value").unwrap())
            .unwrap();
    let values = converter.get_values((&file).into(), true).unwrap();
    assert_eq!(values, Some(DimensionValues::Coordinates(data)));
}

#[test]
fn coord_converter_no_data() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = scratch_file(&tmp, "example.nc");
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_unlimited_dimension("value").unwrap();
        file.add_variable::<f64>("value", &["value"]).unwrap();
    }
    let file = netcdf::open(&path).unwrap();
    let registry = DataspaceRegistry::new();
    let converter =
        NetCdfCoordToDimConverter::from_netcdf(&registry, &file.variable("value").unwrap())
            .unwrap();
    assert_eq!(converter.get_values((&file).into(), true).unwrap(), None);
}

#[test]
fn coord_converter_dense_unsupported() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = scratch_file(&tmp, "example.nc");
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_unlimited_dimension("value").unwrap();
        let mut var = file.add_variable::<f64>("value", &["value"]).unwrap();
        var.put_values(&[0.25f64; 8], 0..8).unwrap();
    }
    let file = netcdf::open(&path).unwrap();
    let registry = DataspaceRegistry::new();
    let converter =
        NetCdfCoordToDimConverter::from_netcdf(&registry, &file.variable("value").unwrap())
            .unwrap();
    assert!(matches!(
        converter.get_values((&file).into(), false),
        Err(Error::Unsupported(_))
    ));
}

#[test]
fn coord_converter_missing_variable() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = scratch_file(&tmp, "example.nc");
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_unlimited_dimension("value").unwrap();
        file.add_variable::<f64>("value", &["value"]).unwrap();
        file.add_group("group1").unwrap();
    }
    let file = netcdf::open(&path).unwrap();
    let registry = DataspaceRegistry::new();
    let converter =
        NetCdfCoordToDimConverter::from_netcdf(&registry, &file.variable("value").unwrap())
            .unwrap();
    let group = file.group("group1").unwrap().unwrap();
    assert!(matches!(
        converter.get_values(DimSource::Group(&group), true),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn coord_converter_wrong_rank() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = scratch_file(&tmp, "example.nc");
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_unlimited_dimension("value").unwrap();
        file.add_variable::<f64>("value", &["value"]).unwrap();
        let mut group = file.add_group("group1").unwrap();
        // a scalar variable shadowing the coordinate name
        group.add_variable::<f64>("value", &[]).unwrap();
    }
    let file = netcdf::open(&path).unwrap();
    let registry = DataspaceRegistry::new();
    let converter =
        NetCdfCoordToDimConverter::from_netcdf(&registry, &file.variable("value").unwrap())
            .unwrap();
    let group = file.group("group1").unwrap().unwrap();
    assert!(matches!(
        converter.get_values(DimSource::Group(&group), true),
        Err(Error::Schema(_))
    ));
}

#[test]
fn dim_converter_fixed_properties() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = scratch_file(&tmp, "example.nc");
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_dimension("row", 8).unwrap();
    }
    let file = netcdf::open(&path).unwrap();
    let registry = DataspaceRegistry::new();
    let converter = NetCdfDimToDimConverter::from_netcdf(
        &registry,
        &file.dimension("row").unwrap(),
        1000,
        Dtype::UInt64,
    )
    .unwrap();
    assert_eq!(converter.input_name(), "row");
    assert_eq!(converter.input_size(), 8);
    assert!(!converter.is_unlimited());
    assert_eq!(converter.name(), "row");
    assert_eq!(converter.domain(), Domain::UInt { min: 0, max: 7 });
    assert_eq!(converter.dtype(), Dtype::UInt64);
    assert!(!converter.to_string().is_empty());
    assert!(registry.contains("row"));
}

#[test]
fn dim_converter_fixed_get_values() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = scratch_file(&tmp, "example.nc");
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_dimension("row", 8).unwrap();
        file.add_group("group1").unwrap();
    }
    let file = netcdf::open(&path).unwrap();
    let registry = DataspaceRegistry::new();
    let converter = NetCdfDimToDimConverter::from_netcdf(
        &registry,
        &file.dimension("row").unwrap(),
        1000,
        Dtype::UInt64,
    )
    .unwrap();

    let sparse = converter.get_values((&file).into(), true).unwrap();
    assert_eq!(sparse, DimensionValues::Indices((0..8).collect()));
    let dense = converter.get_values((&file).into(), false).unwrap();
    assert_eq!(dense, DimensionValues::Slice(0..8));

    // dimensions of ancestor groups are visible from subgroups
    let group = file.group("group1").unwrap().unwrap();
    let from_subgroup = converter.get_values(DimSource::Group(&group), true).unwrap();
    assert_eq!(from_subgroup, DimensionValues::Indices((0..8).collect()));
}

#[test]
fn dim_converter_missing_dimension() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = scratch_file(&tmp, "example.nc");
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_dimension("row", 8).unwrap();
    }
    let registry = DataspaceRegistry::new();
    let converter = {
        let file = netcdf::open(&path).unwrap();
        NetCdfDimToDimConverter::from_netcdf(
            &registry,
            &file.dimension("row").unwrap(),
            1000,
            Dtype::UInt64,
        )
        .unwrap()
    };
    let other_path = scratch_file(&tmp, "no_dims.nc");
    {
        let mut file = netcdf::create(&other_path).unwrap();
        file.add_group("group").unwrap();
    }
    let file = netcdf::open(&other_path).unwrap();
    let group = file.group("group").unwrap().unwrap();
    assert!(matches!(
        converter.get_values(DimSource::Group(&group), false),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn dim_converter_unlimited_properties() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = scratch_file(&tmp, "example.nc");
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_unlimited_dimension("row").unwrap();
    }
    let file = netcdf::open(&path).unwrap();
    let registry = DataspaceRegistry::new();
    let converter = NetCdfDimToDimConverter::from_netcdf(
        &registry,
        &file.dimension("row").unwrap(),
        100,
        Dtype::UInt64,
    )
    .unwrap();
    assert_eq!(converter.input_name(), "row");
    assert_eq!(converter.input_size(), 0);
    assert!(converter.is_unlimited());
    assert_eq!(converter.domain(), Domain::UInt { min: 0, max: 99 });
    assert_eq!(converter.dtype(), Dtype::UInt64);
}

#[test]
fn dim_converter_unlimited_no_data() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = scratch_file(&tmp, "example.nc");
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_unlimited_dimension("row").unwrap();
    }
    let file = netcdf::open(&path).unwrap();
    let registry = DataspaceRegistry::new();
    let converter = NetCdfDimToDimConverter::from_netcdf(
        &registry,
        &file.dimension("row").unwrap(),
        100,
        Dtype::UInt64,
    )
    .unwrap();
    for sparse in [true, false] {
        assert!(matches!(
            converter.get_values((&file).into(), sparse),
            Err(Error::Schema(_))
        ));
    }
}

#[test]
fn dim_converter_unlimited_get_values() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = scratch_file(&tmp, "example.nc");
    let data: Vec<i32> = (0..10).collect();
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_unlimited_dimension("row").unwrap();
        let mut var = file.add_variable::<i32>("data", &["row"]).unwrap();
        var.put_values(&data, 0..10).unwrap();
    }
    let file = netcdf::open(&path).unwrap();
    let registry = DataspaceRegistry::new();
    let converter = NetCdfDimToDimConverter::from_netcdf(
        &registry,
        &file.dimension("row").unwrap(),
        100,
        Dtype::UInt64,
    )
    .unwrap();
    assert_eq!(
        converter.get_values((&file).into(), true).unwrap(),
        DimensionValues::Indices((0..10).collect())
    );
    assert_eq!(
        converter.get_values((&file).into(), false).unwrap(),
        DimensionValues::Slice(0..10)
    );
}

/// An unlimited dimension bounded to 10 must accept 10 values and reject
/// 11.
#[test]
fn dim_converter_bounded_size() {
    let tmp = tempfile::TempDir::new().unwrap();
    for (len, ok) in [(10usize, true), (11, false)] {
        let path = scratch_file(&tmp, &format!("example_{len}.nc"));
        let data: Vec<i32> = (0..len as i32).collect();
        {
            let mut file = netcdf::create(&path).unwrap();
            file.add_unlimited_dimension("row").unwrap();
            let mut var = file.add_variable::<i32>("data", &["row"]).unwrap();
            var.put_values(&data, 0..len).unwrap();
        }
        let file = netcdf::open(&path).unwrap();
        let registry = DataspaceRegistry::new();
        let converter = NetCdfDimToDimConverter::from_netcdf(
            &registry,
            &file.dimension("row").unwrap(),
            10,
            Dtype::UInt64,
        )
        .unwrap();
        let result = converter.get_values((&file).into(), true);
        if ok {
            assert_eq!(
                result.unwrap(),
                DimensionValues::Indices((0..10).collect())
            );
        } else {
            match result {
                Err(Error::OutOfRange { len, max, .. }) => {
                    assert_eq!((len, max), (11, 10));
                }
                other => panic!("expected an out-of-range error, got {other:?}"),
            }
        }
    }
}

#[test]
fn scalar_converter() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = scratch_file(&tmp, "example.nc");
    {
        netcdf::create(&path).unwrap();
    }
    let file = netcdf::open(&path).unwrap();
    let registry = DataspaceRegistry::new();
    let converter =
        NetCdfScalarToDimConverter::create(&registry, "__scalars", Dtype::UInt32).unwrap();
    assert_eq!(converter.name(), "__scalars");
    assert_eq!(converter.domain(), Domain::UInt { min: 0, max: 0 });
    assert_eq!(converter.dtype(), Dtype::UInt32);
    assert!(!converter.to_string().is_empty());
    assert_eq!(
        converter.get_values((&file).into(), true).unwrap(),
        DimensionValues::Indices(vec![0])
    );
    assert_eq!(
        converter.get_values((&file).into(), false).unwrap(),
        DimensionValues::Slice(0..1)
    );
}

#[test]
fn converter_selection_by_inspection() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = scratch_file(&tmp, "example.nc");
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_dimension("x", 4).unwrap();
        file.add_dimension("time", 6).unwrap();
        let mut var = file.add_variable::<f64>("time", &["time"]).unwrap();
        var.put_values(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 0..6).unwrap();
    }
    let file = netcdf::open(&path).unwrap();
    let registry = DataspaceRegistry::new();

    // plain dimension converts by index
    let x = NetCdfDimConverter::from_dimension(
        &registry,
        (&file).into(),
        &file.dimension("x").unwrap(),
        100,
        Dtype::UInt64,
    )
    .unwrap();
    assert!(matches!(x, NetCdfDimConverter::Dim(_)));
    assert_eq!(x.domain(), Some(Domain::UInt { min: 0, max: 3 }));

    // a coordinate variable of the same name converts by value
    let time = NetCdfDimConverter::from_dimension(
        &registry,
        (&file).into(),
        &file.dimension("time").unwrap(),
        100,
        Dtype::UInt64,
    )
    .unwrap();
    assert!(matches!(time, NetCdfDimConverter::Coord(_)));
    assert_eq!(time.domain(), None);
    assert_eq!(time.dtype(), Dtype::Float64);
    let values = time.get_values((&file).into(), true).unwrap();
    assert_eq!(
        values,
        Some(DimensionValues::Coordinates(vec![
            0.0, 1.0, 2.0, 3.0, 4.0, 5.0
        ]))
    );

    // both shared dimensions are registered for later array creation
    assert_eq!(registry.len(), 2);
}

#[test]
fn incompatible_redefinition_through_converters() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = scratch_file(&tmp, "example.nc");
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_dimension("row", 8).unwrap();
    }
    let file = netcdf::open(&path).unwrap();
    let registry = DataspaceRegistry::new();
    let dim = file.dimension("row").unwrap();
    NetCdfDimToDimConverter::from_netcdf(&registry, &dim, 1000, Dtype::UInt64).unwrap();
    // identical conversion re-registers as a no-op
    NetCdfDimToDimConverter::from_netcdf(&registry, &dim, 1000, Dtype::UInt64).unwrap();
    // a different dtype conflicts
    assert!(matches!(
        NetCdfDimToDimConverter::from_netcdf(&registry, &dim, 1000, Dtype::UInt32),
        Err(Error::Conflict(_))
    ));
}
