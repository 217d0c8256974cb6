#[cfg(feature = "download")]
mod download;
mod geojson;

#[cfg(feature = "download")]
pub(crate) use download::*;
pub(crate) use geojson::*;
