//! Decoded font tables consumed by the shaper.

pub mod aat;
pub mod ankr;
pub mod cmap;
pub mod kern;
pub mod kerx;
pub mod morx;

/// Every table the shaper reads.
///
/// Optional tables that are missing simply disable the matching stage.
#[derive(Clone, Debug, Default)]
pub struct Tables {
    pub cmap: cmap::CharacterMap,
    pub metrics: cmap::Metrics,
    pub morx: Option<morx::Table>,
    pub kerx: Option<kerx::Table>,
    pub kern: Option<kern::Table>,
    pub ankr: Option<ankr::Table>,
    pub contour_points: Option<ankr::ContourPoints>,
}
