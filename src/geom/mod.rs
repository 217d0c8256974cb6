mod bbox;
mod geom;
pub(crate) mod proj;

pub(crate) use geom::Geometries;
pub use proj::{Crs, Projector};
