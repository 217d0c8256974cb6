use std::sync::Arc;

use geo::Coord;
use serde::Serialize;

use crate::municipality::{Municipality, MunicipalityId, UrbanFlag};

/// The highlighted municipality. Holds zero or one entry; setting replaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection(Option<MunicipalityId>);

impl Selection {
    #[inline] pub fn get(&self) -> Option<MunicipalityId> { self.0 }

    #[inline] pub fn clear(&mut self) { self.0 = None; }

    #[inline] pub fn set(&mut self, id: MunicipalityId) { self.0 = Some(id); }

    #[inline] pub fn is_empty(&self) -> bool { self.0.is_none() }

    #[inline] pub fn len(&self) -> usize { usize::from(self.0.is_some()) }
}

/// Text shown in the info popup for a clicked municipality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupContent {
    pub name: Arc<str>,
    pub area_km2: f64,
    pub urban: UrbanFlag,
}

impl PopupContent {
    pub fn new(municipality: &Municipality) -> Self {
        Self {
            name: municipality.name.clone(),
            area_km2: municipality.area_km2,
            urban: municipality.urban,
        }
    }

    /// Name, area and urban lines as plain text.
    pub fn lines(&self) -> [String; 3] {
        [
            self.name.to_string(),
            format!("{} km2", self.area_km2),
            format!("Mestna: {}", self.urban),
        ]
    }

    /// Popup body markup. The name is escaped; the other fields are generated.
    pub fn to_html(&self) -> String {
        let mut html = String::with_capacity(64 + self.name.len());
        html.push_str("<h3>");
        escape_html_into(&self.name, &mut html);
        html.push_str(&format!("</h3><p>Površina: {} km2</p><p>Mestna: {}</p>", self.area_km2, self.urban));
        html
    }
}

fn escape_html_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}

/// Popup overlay state. Hidden whenever `position` is `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Popup {
    position: Option<Coord<f64>>,
    content: Option<PopupContent>,
}

impl Popup {
    #[inline] pub fn position(&self) -> Option<Coord<f64>> { self.position }

    #[inline] pub fn content(&self) -> Option<&PopupContent> { self.content.as_ref() }

    #[inline] pub fn is_visible(&self) -> bool { self.position.is_some() }

    pub(crate) fn show(&mut self, at: Coord<f64>, content: PopupContent) {
        self.position = Some(at);
        self.content = Some(content);
    }

    pub(crate) fn hide(&mut self) {
        self.position = None;
        self.content = None;
    }
}
