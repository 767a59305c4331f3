//! Log stream cursors

use std::fmt;
use std::str::FromStr;

use crate::errors::ShipyardError;

/// Position of an entry within a log stream
///
/// Encoded as `<millis>-<seq>`. Ordering is by milliseconds, then sequence,
/// which is also the append order of the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cursor {
    pub millis: u64,
    pub seq: u64,
}

impl Cursor {
    /// Position before the first entry of any stream
    pub const ZERO: Cursor = Cursor { millis: 0, seq: 0 };

    pub fn new(millis: u64, seq: u64) -> Self {
        Self { millis, seq }
    }

    /// Cursor for an entry appended at `now_millis` after `self`
    ///
    /// Never goes backwards, even if the wall clock does.
    pub fn successor(&self, now_millis: u64) -> Cursor {
        if now_millis > self.millis {
            Cursor::new(now_millis, 0)
        } else {
            Cursor::new(self.millis, self.seq + 1)
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.seq)
    }
}

impl FromStr for Cursor {
    type Err = ShipyardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ShipyardError::invalid(format!("Invalid cursor: {}", s));
        let (millis, seq) = match s.split_once('-') {
            Some((millis, seq)) => (millis, seq),
            None => (s, "0"),
        };
        Ok(Cursor {
            millis: millis.parse().map_err(|_| invalid())?,
            seq: seq.parse().map_err(|_| invalid())?,
        })
    }
}

/// Where a tail starts reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailStart {
    /// Only entries appended after the tail opens
    Latest,

    /// Every entry strictly after this cursor
    After(Cursor),
}

impl TailStart {
    /// Parse the `from` query value; absent or `$` means latest
    pub fn parse(from: Option<&str>) -> Result<Self, ShipyardError> {
        match from.map(str::trim) {
            None | Some("") | Some(shipyard_api::TAIL_FROM_LATEST) => Ok(TailStart::Latest),
            Some(cursor) => Ok(TailStart::After(cursor.parse()?)),
        }
    }
}
