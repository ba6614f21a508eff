/// Half-open range of character (not byte) offsets into a text snapshot.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Result<Self, SpanError> {
        if start > end {
            Err(SpanError::Inverted { start, end })
        } else if start == end {
            Err(SpanError::Empty { at: start })
        } else {
            Ok(Self { start, end })
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SpanError {
    #[error("span start {start} is after its end {end}")]
    Inverted { start: usize, end: usize },
    #[error("span at {at} is empty")]
    Empty { at: usize },
}
