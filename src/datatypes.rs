use crate::error::StressmapError;

/// A node position in model space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One stress result row for an (element, node) pair within a load case.
///
/// Mirrors the plate stress record of an OP2 results file: fiber distance,
/// two normal components, in-plane shear, principal angle, two principal
/// stresses, and the equivalent von Mises stress.
#[derive(Debug, Clone)]
pub struct StressRow {
    pub element: u32,
    pub node: u32,
    pub fiber_distance: f64,
    pub oxx: f64,
    pub oyy: f64,
    pub txy: f64,
    pub angle: f64,
    pub omax: f64,
    pub omin: f64,
    pub von_mises: f64,
}

/// A load case and the stress rows it produced
#[derive(Debug, Clone)]
pub struct LoadCase {
    pub id: u32,
    pub rows: Vec<StressRow>,
}

/// Stress measures available for outlier flagging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StressMeasure {
    NormalX,
    NormalY,
    VonMises,
}

impl StressMeasure {
    pub const ALL: [StressMeasure; 3] = [
        StressMeasure::NormalX,
        StressMeasure::NormalY,
        StressMeasure::VonMises,
    ];

    /// Returns the short key used to select this measure
    pub fn key(&self) -> &'static str {
        match self {
            StressMeasure::NormalX => "oxx",
            StressMeasure::NormalY => "oyy",
            StressMeasure::VonMises => "von_mises",
        }
    }

    /// Returns the human-readable description of this measure
    pub fn description(&self) -> &'static str {
        match self {
            StressMeasure::NormalX => "Normal stress x direction",
            StressMeasure::NormalY => "Normal stress y direction",
            StressMeasure::VonMises => "Equivalent von Mises stress",
        }
    }

    /// Resolves a measure from its short key
    ///
    /// # Arguments
    /// * `key` - The measure key, e.g. "oxx" or "von_mises"
    ///
    /// # Returns
    /// The matching StressMeasure, or an input error naming the offending
    /// value and the valid options
    pub fn from_key(key: &str) -> Result<StressMeasure, StressmapError> {
        match key {
            "oxx" => Ok(StressMeasure::NormalX),
            "oyy" => Ok(StressMeasure::NormalY),
            "von_mises" => Ok(StressMeasure::VonMises),
            _ => Err(StressmapError::Input(format!(
                "Invalid stress measure '{}'. Valid options are: oxx, oyy, von_mises",
                key
            ))),
        }
    }

    /// Reads this measure's component out of a stress row
    pub fn component(&self, row: &StressRow) -> f64 {
        match self {
            StressMeasure::NormalX => row.oxx,
            StressMeasure::NormalY => row.oyy,
            StressMeasure::VonMises => row.von_mises,
        }
    }
}
