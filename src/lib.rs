#![doc = "Municipality lookup, popup and location status logic for the obcine map"]
mod common;
mod config;
mod geom;
mod municipality;
mod session;

#[doc(inline)]
pub use config::SessionConfig;

#[doc(inline)]
pub use geom::{Crs, Projector};

#[doc(inline)]
pub use municipality::{Municipality, MunicipalityId, MunicipalityLayer, UrbanFlag};

#[doc(inline)]
pub use session::{
    generate_location_styles, AnimationHandle, GeolocationError, LocationStatus, LocationTracker,
    MapSession, MarkerAnimator, MarkerStyle, PanelKind, Popup, PopupContent, Selection, StatusPanel,
};
