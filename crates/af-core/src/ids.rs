//! Parameter identifiers.

use crate::{AfError, AfResult};
use std::fmt;
use std::num::NonZeroU32;

/// Position of a `Parameter` inside its `ParameterSet`.
///
/// Stored one-based so `Option<ParamId>` is the same size as `ParamId`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(NonZeroU32);

impl ParamId {
    /// Id of the parameter stored at `index`. Fails once the index no
    /// longer fits the compact representation.
    pub fn from_index(index: usize) -> AfResult<Self> {
        u32::try_from(index)
            .ok()
            .and_then(|i| i.checked_add(1))
            .and_then(NonZeroU32::new)
            .map(Self)
            .ok_or(AfError::CapacityExceeded {
                what: "parameter ids",
                index,
            })
    }

    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl fmt::Debug for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParamId({})", self.index())
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index())
    }
}
