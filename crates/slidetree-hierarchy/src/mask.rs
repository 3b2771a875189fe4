//! Mask algebra for derived views.
//!
//! A view selects positions of its kind-filtered object list through an
//! optional [`Mask`]: a [`Slice`] (negative indices
//! and steps included) or an explicit list of positions. Selecting from a
//! masked view composes the two restrictions into one mask over the base
//! list, so a slice of a slice never materializes the intermediate list.
//!
//! # Invariants
//!
//! - Composition is exact: `apply(compose(a, b), xs) == apply(b, apply(a, xs))`
//!   as long as `xs` is the list the outer mask was resolved against.
//! - Slices never have a zero step; index lists are never empty.
//! - Resolved ranges are re-expressed with an open stop when a negative step
//!   runs past position zero, so they are never mistaken for end-relative
//!   indices.

use std::fmt;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use crate::error::{HierarchyError, HierarchyResult};

/// A slice `start:stop:step`, every part optional; negatives count from the end.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Slice {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: Option<isize>,
}

impl Slice {
    /// Selects every position.
    pub const FULL: Slice = Slice::new(None, None, None);

    /// Selects nothing.
    pub const EMPTY: Slice = Slice::new(Some(0), Some(0), Some(1));

    pub const fn new(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> Self {
        Self { start, stop, step }
    }

    /// Replace the step.
    pub fn with_step(mut self, step: isize) -> Self {
        self.step = Some(step);
        self
    }

    fn check(&self) -> HierarchyResult<()> {
        if self.step == Some(0) {
            return Err(HierarchyError::InvalidMask("slice step cannot be zero".into()));
        }
        Ok(())
    }

    /// Resolve against a sequence of `len` items: `(start, stop, step)`
    /// clamped to the sequence bounds.
    pub fn indices(&self, len: usize) -> HierarchyResult<(isize, isize, isize)> {
        self.check()?;
        let step = self.step.unwrap_or(1);
        let len = len as isize;
        let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };
        let clamp = |bound: Option<isize>, default: isize| match bound {
            None => default,
            Some(b) if b < 0 => (b + len).max(lower),
            Some(b) => b.min(upper),
        };
        let start = clamp(self.start, if step < 0 { upper } else { lower });
        let stop = clamp(self.stop, if step < 0 { lower } else { upper });
        Ok((start, stop, step))
    }
}

impl From<Range<isize>> for Slice {
    fn from(range: Range<isize>) -> Self {
        Self::new(Some(range.start), Some(range.end), None)
    }
}

impl From<RangeFrom<isize>> for Slice {
    fn from(range: RangeFrom<isize>) -> Self {
        Self::new(Some(range.start), None, None)
    }
}

impl From<RangeTo<isize>> for Slice {
    fn from(range: RangeTo<isize>) -> Self {
        Self::new(None, Some(range.end), None)
    }
}

impl From<RangeFull> for Slice {
    fn from(_: RangeFull) -> Self {
        Self::FULL
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |p: Option<isize>| p.map(|v| v.to_string()).unwrap_or_default();
        write!(f, "{}:{}", part(self.start), part(self.stop))?;
        if let Some(step) = self.step {
            write!(f, ":{step}")?;
        }
        Ok(())
    }
}

/// A resolved arithmetic progression of positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progression {
    pub start: isize,
    pub step: isize,
    pub len: usize,
}

impl Progression {
    /// `0, 1, .., len - 1`.
    pub fn upto(len: usize) -> Self {
        Self {
            start: 0,
            step: 1,
            len,
        }
    }

    /// The `i`-th position. `i` must be below `len`.
    pub fn get(&self, i: usize) -> isize {
        self.start + i as isize * self.step
    }

    /// Position at a possibly end-relative index.
    pub fn index(&self, index: isize) -> HierarchyResult<isize> {
        Ok(self.get(normalize(index, self.len)?))
    }

    /// Select from this progression the way a slice selects from a list.
    ///
    /// A single-position result always gets step 1; its step selects nothing
    /// and may be arbitrarily large.
    pub fn slice(&self, slice: &Slice) -> HierarchyResult<Progression> {
        let (start, stop, step) = slice.indices(self.len)?;
        let len = span(start, stop, step);
        if len == 0 {
            return Ok(Self::upto(0));
        }
        let first = start
            .checked_mul(self.step)
            .and_then(|offset| self.start.checked_add(offset))
            .ok_or_else(overflow)?;
        let step = if len == 1 {
            1
        } else {
            self.step.checked_mul(step).ok_or_else(overflow)?
        };
        Ok(Self {
            start: first,
            step,
            len,
        })
    }

    /// A slice selecting exactly these positions from a list the
    /// progression was resolved against.
    ///
    /// The stop is left open when it would be negative or out of `isize`
    /// range; either way it lies beyond the list in the step's direction.
    pub fn to_slice(&self) -> Slice {
        if self.len == 0 {
            return Slice::EMPTY;
        }
        let stop = isize::try_from(self.len)
            .ok()
            .and_then(|len| len.checked_mul(self.step))
            .and_then(|extent| self.start.checked_add(extent))
            .filter(|stop| *stop >= 0);
        Slice::new(Some(self.start), stop, Some(self.step))
    }

    pub fn positions(self) -> impl Iterator<Item = isize> {
        (0..self.len).map(move |i| self.get(i))
    }
}

/// Number of positions in `start..stop` by `step` (`step != 0`).
fn span(start: isize, stop: isize, step: isize) -> usize {
    let distance = if step > 0 { stop - start } else { start - stop };
    if distance <= 0 {
        return 0;
    }
    (distance as usize - 1) / step.unsigned_abs() + 1
}

fn overflow() -> HierarchyError {
    HierarchyError::InvalidMask("slice arithmetic overflows isize".into())
}

/// Resolve an end-relative index against `len`.
pub fn normalize(index: isize, len: usize) -> HierarchyResult<usize> {
    let resolved = if index < 0 { index + len as isize } else { index };
    if (0..len as isize).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(HierarchyError::IndexOutOfRange { index, len })
    }
}

/// The restriction attached to a derived view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mask {
    Range(Slice),
    Indices(Vec<isize>),
}

impl fmt::Display for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range(slice) => write!(f, "{slice}"),
            Self::Indices(indices) => write!(f, "{indices:?}"),
        }
    }
}

/// What a caller selects from a view: a slice or a list of positions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Slice(Slice),
    Indices(Vec<isize>),
}

impl Selection {
    fn validated(self) -> HierarchyResult<Self> {
        match &self {
            Self::Slice(slice) => slice.check()?,
            Self::Indices(indices) if indices.is_empty() => {
                return Err(HierarchyError::InvalidMask("index list cannot be empty".into()))
            }
            Self::Indices(_) => {}
        }
        Ok(self)
    }
}

impl From<Slice> for Selection {
    fn from(slice: Slice) -> Self {
        Self::Slice(slice)
    }
}

impl From<Vec<isize>> for Selection {
    fn from(indices: Vec<isize>) -> Self {
        Self::Indices(indices)
    }
}

impl From<&[isize]> for Selection {
    fn from(indices: &[isize]) -> Self {
        Self::Indices(indices.to_vec())
    }
}

/// Compose an existing mask with a further selection.
///
/// `total_len` yields the length of the unmasked list; it is only called
/// when the outer mask is a range that must be resolved.
pub fn compose<F>(outer: Option<&Mask>, inner: Selection, total_len: F) -> HierarchyResult<Mask>
where
    F: FnOnce() -> HierarchyResult<usize>,
{
    let inner = inner.validated()?;
    match (outer, inner) {
        (None, Selection::Slice(slice)) => Ok(Mask::Range(slice)),
        (None, Selection::Indices(indices)) => Ok(Mask::Indices(indices)),
        (Some(Mask::Range(outer)), inner) => {
            let base = Progression::upto(total_len()?).slice(outer)?;
            match inner {
                Selection::Slice(slice) => Ok(Mask::Range(base.slice(&slice)?.to_slice())),
                Selection::Indices(indices) => indices
                    .iter()
                    .map(|&i| base.index(i))
                    .collect::<HierarchyResult<_>>()
                    .map(Mask::Indices),
            }
        }
        (Some(Mask::Indices(outer)), Selection::Slice(slice)) => {
            let picked: Vec<isize> = Progression::upto(outer.len())
                .slice(&slice)?
                .positions()
                .map(|p| outer[p as usize])
                .collect();
            if picked.is_empty() {
                Ok(Mask::Range(Slice::EMPTY))
            } else {
                Ok(Mask::Indices(picked))
            }
        }
        (Some(Mask::Indices(outer)), Selection::Indices(indices)) => indices
            .iter()
            .map(|&i| normalize(i, outer.len()).map(|k| outer[k]))
            .collect::<HierarchyResult<_>>()
            .map(Mask::Indices),
    }
}

/// Materialize a mask against a concrete list.
pub fn apply<T: Clone>(mask: Option<&Mask>, items: &[T]) -> HierarchyResult<Vec<T>> {
    match mask {
        None => Ok(items.to_vec()),
        Some(Mask::Range(slice)) => Ok(Progression::upto(items.len())
            .slice(slice)?
            .positions()
            .map(|p| items[p as usize].clone())
            .collect()),
        Some(Mask::Indices(indices)) => indices
            .iter()
            .map(|&i| normalize(i, items.len()).map(|k| items[k].clone()))
            .collect(),
    }
}
