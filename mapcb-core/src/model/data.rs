//! Plotted data and the coordinate hand-off between projections.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use compact_str::CompactString;

use crate::error::{CallbackError, CallbackResult};
use crate::model::payload::PointPayload;

static NEXT_COLLECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a plotted collection, compared against the picked artist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionId(u64);

impl CollectionId {
    fn next() -> Self {
        Self(NEXT_COLLECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identifier of a single data point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataId {
    Int(i64),
    Text(CompactString),
}

impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for DataId {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for DataId {
    fn from(v: &str) -> Self {
        Self::Text(v.into())
    }
}

/// Named map projection, e.g. `"EPSG:4326"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Crs(CompactString);

impl Crs {
    pub fn new<S: Into<CompactString>>(name: S) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::new("EPSG:4326")
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coordinate transform between two projections.
pub trait Reprojector {
    fn reproject(&self, from: &Crs, to: &Crs, pos: (f64, f64)) -> CallbackResult<(f64, f64)>;
}

/// Only supports equal projections.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityReprojector;

impl Reprojector for IdentityReprojector {
    fn reproject(&self, from: &Crs, to: &Crs, pos: (f64, f64)) -> CallbackResult<(f64, f64)> {
        if from == to {
            Ok(pos)
        } else {
            Err(CallbackError::ReprojectionUnsupported {
                from: from.0.clone(),
                to: to.0.clone(),
            })
        }
    }
}

/// Adapts a closure; `None` means the pair of projections is unsupported.
pub struct FnReprojector<F>(pub F);

impl<F> Reprojector for FnReprojector<F>
where
    F: Fn(&Crs, &Crs, (f64, f64)) -> Option<(f64, f64)>,
{
    fn reproject(&self, from: &Crs, to: &Crs, pos: (f64, f64)) -> CallbackResult<(f64, f64)> {
        (self.0)(from, to, pos).ok_or_else(|| CallbackError::ReprojectionUnsupported {
            from: from.0.clone(),
            to: to.0.clone(),
        })
    }
}

impl<F> fmt::Debug for FnReprojector<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnReprojector").finish_non_exhaustive()
    }
}

/// Identity transform when the projections match, otherwise delegate.
pub fn reproject_point(
    reprojector: &dyn Reprojector,
    from: &Crs,
    to: &Crs,
    pos: (f64, f64),
) -> CallbackResult<(f64, f64)> {
    if from == to {
        return Ok(pos);
    }
    reprojector.reproject(from, to, pos)
}

/// Parallel per-point arrays of a plotted dataset.
#[derive(Debug, Clone)]
pub struct DataCollection {
    id: CollectionId,
    x: Vec<f64>,
    y: Vec<f64>,
    ids: Vec<DataId>,
    values: Vec<f64>,
}

impl DataCollection {
    pub fn new(
        x: Vec<f64>,
        y: Vec<f64>,
        ids: Vec<DataId>,
        values: Vec<f64>,
    ) -> CallbackResult<Self> {
        let expected = x.len();
        for (field, found) in [("y", y.len()), ("ids", ids.len()), ("values", values.len())] {
            if found != expected {
                return Err(CallbackError::MismatchedData {
                    field,
                    expected,
                    found,
                });
            }
        }

        Ok(Self {
            id: CollectionId::next(),
            x,
            y,
            ids,
            values,
        })
    }

    /// Collection with ids `0..n`.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = ((f64, f64), f64)>,
    {
        let mut x = Vec::new();
        let mut y = Vec::new();
        let mut values = Vec::new();
        for ((px, py), value) in points {
            x.push(px);
            y.push(py);
            values.push(value);
        }
        let ids = (0..x.len() as i64).map(DataId::Int).collect();

        Self {
            id: CollectionId::next(),
            x,
            y,
            ids,
            values,
        }
    }

    pub fn id(&self) -> CollectionId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Pick payload for `index`, or `None` when out of range.
    pub fn point(&self, index: usize) -> Option<PointPayload> {
        Some(PointPayload {
            pos: (*self.x.get(index)?, *self.y.get(index)?),
            id: Some(self.ids.get(index)?.clone()),
            value: Some(*self.values.get(index)?),
            index: Some(index),
        })
    }

    /// Index of the closest point, limited to `max_distance` if given.
    pub fn nearest(&self, pos: (f64, f64), max_distance: Option<f64>) -> Option<usize> {
        let (index, dist_sq) = self
            .x
            .iter()
            .zip(&self.y)
            .map(|(x, y)| (x - pos.0).powi(2) + (y - pos.1).powi(2))
            .enumerate()
            .filter(|(_, d)| !d.is_nan())
            .min_by(|a, b| a.1.total_cmp(&b.1))?;

        match max_distance {
            Some(limit) if dist_sq > limit * limit => None,
            _ => Some(index),
        }
    }
}
