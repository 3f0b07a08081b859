use crate::error::BufferError;

/// Batch-size policy for a [`BatchingBuffer`](crate::BatchingBuffer),
/// fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// No ceiling: the buffer keeps growing until a reader drains it.
    Unbounded,
    /// Delivery is forced once the buffer holds this many values;
    /// further writes wait until a reader takes the batch.
    Bounded(usize),
}

impl Capacity {
    /// The numeric limit, or `None` for [`Capacity::Unbounded`].
    pub fn limit(&self) -> Option<usize> {
        match self {
            Capacity::Unbounded => None,
            Capacity::Bounded(n) => Some(*n),
        }
    }

    /// Whether a buffer of `len` values has hit the ceiling.
    pub(crate) fn is_reached(&self, len: usize) -> bool {
        match self {
            Capacity::Unbounded => false,
            Capacity::Bounded(n) => len >= *n,
        }
    }
}

/// Integer encoding for config-driven callers: `-1` means unbounded,
/// positive values are a bounded capacity. Zero (unbuffered) and any
/// other negative value are invalid.
impl TryFrom<i64> for Capacity {
    type Error = BufferError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match raw {
            -1 => Ok(Capacity::Unbounded),
            n if n > 0 => Ok(Capacity::Bounded(n as usize)),
            _ => Err(BufferError::InvalidCapacity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit() {
        assert_eq!(Capacity::Unbounded.limit(), None);
        assert_eq!(Capacity::Bounded(8).limit(), Some(8));
    }

    #[test]
    fn test_is_reached() {
        assert!(!Capacity::Unbounded.is_reached(usize::MAX));
        assert!(!Capacity::Bounded(3).is_reached(2));
        assert!(Capacity::Bounded(3).is_reached(3));
        assert!(Capacity::Bounded(3).is_reached(4));
    }

    #[test]
    fn test_try_from_sentinel() {
        assert_eq!(Capacity::try_from(-1), Ok(Capacity::Unbounded));
        assert_eq!(Capacity::try_from(5), Ok(Capacity::Bounded(5)));
        assert_eq!(Capacity::try_from(0), Err(BufferError::InvalidCapacity));
        assert_eq!(Capacity::try_from(-2), Err(BufferError::InvalidCapacity));
    }
}
