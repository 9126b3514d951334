use std::fmt;
use std::io::{self, Read};

use crate::error::IonResult;

const DISCARD_CHUNK: usize = 4096;

/// Where the cursor's bytes come from.
pub(crate) enum Source {
    /// All of the input is already in the cursor's buffer.
    Fixed,
    Stream(Box<dyn Read>),
}

/// The outcome of one attempt to pull bytes from a source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Input {
    Bytes(usize),
    /// Nothing is available right now; more may arrive later.
    Pending,
    /// Nothing more will ever arrive.
    Exhausted,
}

impl Source {
    pub(crate) fn is_fixed(&self) -> bool {
        matches!(self, Source::Fixed)
    }

    /// Reads once into `buffer`. A zero-length read means "no data yet" for a continuable source
    /// and end of stream otherwise.
    pub(crate) fn read_into(&mut self, buffer: &mut [u8], continuable: bool) -> IonResult<Input> {
        let reader = match self {
            Source::Fixed => return Ok(Input::Exhausted),
            Source::Stream(reader) => reader,
        };
        loop {
            return match reader.read(buffer) {
                Ok(0) if continuable => Ok(Input::Pending),
                Ok(0) => Ok(Input::Exhausted),
                Ok(read) => Ok(Input::Bytes(read)),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if continuable && e.kind() == io::ErrorKind::WouldBlock => {
                    Ok(Input::Pending)
                }
                Err(e) => Err(e.into()),
            };
        }
    }

    /// Reads and drops up to `count` bytes, returning how many were dropped and the outcome of the
    /// last read.
    pub(crate) fn discard(&mut self, count: usize, continuable: bool) -> IonResult<(usize, Input)> {
        let mut scratch = [0u8; DISCARD_CHUNK];
        let mut discarded = 0;
        while discarded < count {
            let want = (count - discarded).min(DISCARD_CHUNK);
            match self.read_into(&mut scratch[..want], continuable)? {
                Input::Bytes(read) => discarded += read,
                other => return Ok((discarded, other)),
            }
        }
        Ok((discarded, Input::Bytes(discarded)))
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Fixed => f.write_str("Fixed"),
            Source::Stream(_) => f.write_str("Stream"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn zero_reads_depend_on_mode() {
        let mut buffer = [0u8; 4];
        let mut blocking = Source::Stream(Box::new(Cursor::new(vec![])));
        assert_eq!(blocking.read_into(&mut buffer, false).unwrap(), Input::Exhausted);
        let mut continuable = Source::Stream(Box::new(Cursor::new(vec![])));
        assert_eq!(continuable.read_into(&mut buffer, true).unwrap(), Input::Pending);
        assert_eq!(Source::Fixed.read_into(&mut buffer, true).unwrap(), Input::Exhausted);
    }

    #[test]
    fn discard_stops_at_the_end_of_input() {
        let mut source = Source::Stream(Box::new(Cursor::new(vec![7u8; 10_000])));
        assert_eq!(source.discard(5_000, true).unwrap(), (5_000, Input::Bytes(5_000)));
        assert_eq!(source.discard(6_000, true).unwrap(), (5_000, Input::Pending));
    }
}
