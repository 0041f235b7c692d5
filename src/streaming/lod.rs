//! Distance-based level of detail selection.
//!
//! A [`LodTable`] is an ordered list of mesh LODs, each visible up to a
//! distance threshold. Thresholds are squared once when the table is built so
//! the per-frame lookup compares squared distances directly.

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
pub use crate::mesh::MAX_LOD;

/// One row of the LOD table
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelOfDetail {
    /// Mesh LOD built for this level (`0..MAX_LOD`)
    pub lod: usize,
    /// Chunks closer than this use this level
    pub visible_distance_threshold: f32,
}

impl LevelOfDetail {
    pub fn new(lod: usize, visible_distance_threshold: f32) -> Self {
        Self { lod, visible_distance_threshold }
    }

    pub fn sqr_visible_distance_threshold(&self) -> f32 {
        self.visible_distance_threshold * self.visible_distance_threshold
    }
}

/// Validated, ascending table of [`LevelOfDetail`]s
#[derive(Clone, Debug, PartialEq)]
pub struct LodTable {
    levels: Vec<LevelOfDetail>,
    sqr_thresholds: Vec<f32>,
}

impl LodTable {
    /// Build a table, rejecting empty tables, LODs `>= MAX_LOD`, repeated
    /// LODs, and thresholds that are not positive and strictly ascending.
    ///
    /// # Examples
    /// ```
    /// use terrastream::streaming::lod::{LevelOfDetail, LodTable};
    ///
    /// let table = LodTable::new(vec![
    ///     LevelOfDetail::new(0, 100.0),
    ///     LevelOfDetail::new(1, 300.0),
    ///     LevelOfDetail::new(2, 600.0),
    /// ]).unwrap();
    ///
    /// assert_eq!(table.required_level(50.0 * 50.0), Some(0));
    /// assert_eq!(table.required_level(100.0 * 100.0), Some(1));
    /// assert_eq!(table.required_level(700.0 * 700.0), None);
    /// ```
    pub fn new(levels: Vec<LevelOfDetail>) -> Result<Self> {
        if levels.is_empty() {
            return Err(Error::Config("LOD table is empty".into()));
        }

        let mut previous = 0.0_f32;
        let mut seen = [false; MAX_LOD];
        for (index, level) in levels.iter().enumerate() {
            if level.lod >= MAX_LOD {
                return Err(Error::Config(format!(
                    "LOD table entry {} uses lod {} (max {})",
                    index,
                    level.lod,
                    MAX_LOD - 1
                )));
            }
            if std::mem::replace(&mut seen[level.lod], true) {
                return Err(Error::Config(format!(
                    "LOD table entry {} repeats lod {}; each lod may appear once",
                    index, level.lod
                )));
            }
            let threshold = level.visible_distance_threshold;
            if !(threshold.is_finite() && threshold > previous) {
                return Err(Error::Config(format!(
                    "LOD table entry {} threshold {} must be positive and greater than {}",
                    index, threshold, previous
                )));
            }
            previous = threshold;
        }

        let sqr_thresholds = levels.iter().map(LevelOfDetail::sqr_visible_distance_threshold).collect();
        Ok(Self { levels, sqr_thresholds })
    }

    pub fn levels(&self) -> &[LevelOfDetail] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Mesh LOD for table index `level`
    pub fn lod(&self, level: usize) -> usize {
        self.levels[level].lod
    }

    /// Squared threshold for table index `level`
    pub fn sqr_threshold(&self, level: usize) -> f32 {
        self.sqr_thresholds[level]
    }

    /// Largest threshold; chunks further away are not visible
    pub fn max_view_distance(&self) -> f32 {
        self.levels[self.levels.len() - 1].visible_distance_threshold
    }

    /// Index of the first level whose squared threshold is strictly greater
    /// than `sqr_distance`, or `None` when the distance is out of range.
    #[inline]
    pub fn required_level(&self, sqr_distance: f32) -> Option<usize> {
        self.sqr_thresholds.iter().position(|&t| t > sqr_distance)
    }
}

impl Default for LodTable {
    fn default() -> Self {
        Self {
            levels: vec![
                LevelOfDetail::new(0, 200.0),
                LevelOfDetail::new(1, 400.0),
                LevelOfDetail::new(2, 600.0),
            ],
            sqr_thresholds: vec![200.0 * 200.0, 400.0 * 400.0, 600.0 * 600.0],
        }
    }
}
