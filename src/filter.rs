use std::sync::Arc;

use serde::{Deserialize, Serialize};
use zarrs::array::codec::{Bz2Codec, Bz2CompressionLevel, GzipCodec, ZstdCodec};
use zarrs_codec::BytesToBytesCodecTraits;

use crate::{Error, Result};

/// One compression filter in a pipeline.
///
/// Filters apply per attribute (value arrays) and per dimension (sparse
/// coordinate arrays), and convert to zarr bytes-to-bytes codecs when the
/// array is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum Filter {
    Gzip {
        #[serde(default = "default_gzip_level")]
        level: u32,
    },
    Zstd {
        #[serde(default = "default_zstd_level")]
        level: i32,
        #[serde(default)]
        checksum: bool,
    },
    Bz2 {
        #[serde(default = "default_bz2_level")]
        level: u32,
    },
}

fn default_gzip_level() -> u32 {
    6
}

fn default_zstd_level() -> i32 {
    3
}

fn default_bz2_level() -> u32 {
    9
}

impl Filter {
    /// Convert to a zarr bytes-to-bytes codec.
    pub fn to_codec(&self) -> Result<Arc<dyn BytesToBytesCodecTraits>> {
        match self {
            Filter::Gzip { level } => Ok(Arc::new(GzipCodec::new(*level).map_err(|_| {
                Error::schema(format!("invalid gzip compression level {level}"))
            })?)),
            Filter::Zstd { level, checksum } => Ok(Arc::new(ZstdCodec::new(*level, *checksum))),
            Filter::Bz2 { level } => Ok(Arc::new(Bz2Codec::new(
                Bz2CompressionLevel::new(*level)
                    .map_err(|_| Error::schema(format!("invalid bz2 compression level {level}")))?,
            ))),
        }
    }
}

/// Convert a filter pipeline to its codec chain, preserving order.
pub fn to_codecs(filters: &[Filter]) -> Result<Vec<Arc<dyn BytesToBytesCodecTraits>>> {
    filters.iter().map(Filter::to_codec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_round_trip() {
        let pipeline = vec![
            Filter::Zstd {
                level: 6,
                checksum: false,
            },
            Filter::Gzip { level: 5 },
        ];
        let json = serde_json::to_string(&pipeline).unwrap();
        let back: Vec<Filter> = serde_json::from_str(&json).unwrap();
        assert_eq!(pipeline, back);
    }

    #[test]
    fn level_defaults() {
        let filter: Filter = serde_json::from_str("{\"type\":\"gzip\"}").unwrap();
        assert_eq!(filter, Filter::Gzip { level: 6 });
    }

    #[test]
    fn invalid_level_rejected() {
        assert!(Filter::Gzip { level: 100 }.to_codec().is_err());
        assert!(Filter::Bz2 { level: 0 }.to_codec().is_err());
    }
}
