mod io;
mod layer;
mod municipality;

pub use layer::MunicipalityLayer;
pub use municipality::{Municipality, MunicipalityId, UrbanFlag};
