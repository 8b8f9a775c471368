use serde::{Deserialize, Serialize};

use crate::models::common::Bounds;
use crate::models::name::{self, ObjectSettings};

/// A named rectangular output region of the document. Each artboard maps to
/// one responsive breakpoint unit in the generated markup.
///
/// Artboard names are used as addressing keys but the host does not enforce
/// uniqueness; duplicates are disambiguated downstream by appending the
/// rounded width.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artboard {
    pub name: String,
    pub rect: Bounds,
}

impl Artboard {
    /// Artboards whose names start with `-` are suppressed from output.
    pub fn is_usable(&self) -> bool {
        !self.name.starts_with('-')
    }

    /// The annotation-free, keyword-safe artboard name.
    pub fn clean_name(&self) -> String {
        name::clean_object_name(&self.name)
    }

    /// Settings parsed from the artboard name annotation
    /// (e.g. `Artboard1:600,fixed`).
    pub fn settings(&self) -> ObjectSettings {
        name::parse_object_name(&self.name)
    }

    /// The effective output width: the explicit override from the name
    /// annotation, or the measured rectangle width.
    pub fn effective_width(&self) -> f64 {
        self.settings()
            .width()
            .unwrap_or_else(|| self.rect.to_css_box().width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_override_beats_measured_width() {
        let ab = Artboard {
            name: "Hero:600".to_string(),
            rect: Bounds::new(0.0, 0.0, 320.0, -240.0),
        };
        assert_eq!(ab.effective_width(), 600.0);

        let plain = Artboard {
            name: "Hero".to_string(),
            rect: Bounds::new(0.0, 0.0, 320.0, -240.0),
        };
        assert_eq!(plain.effective_width(), 320.0);
    }

    #[test]
    fn suppression_marker_disables_artboard() {
        let ab = Artboard {
            name: "-scratch".to_string(),
            rect: Bounds::new(0.0, 0.0, 100.0, -100.0),
        };
        assert!(!ab.is_usable());
    }
}
