use std::fmt;

/// The four codes that together identify one base-station sector:
/// mobile country code, mobile network code, location area code, cell id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TowerId {
    pub mcc: u16,
    pub mnc: u16,
    pub lac: i64,
    pub cid: i64,
}

impl fmt::Display for TowerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.mcc, self.mnc, self.lac, self.cid)
    }
}

/// A resolved tower position as stored in the local cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TowerLocation {
    pub tower: TowerId,
    pub lat: f64,
    pub lon: f64,
}

/// Where a resolved position came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Remote,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Cache => write!(f, "cache"),
            Source::Remote => write!(f, "remote"),
        }
    }
}

/// Outcome of a single resolution attempt. Faults inside the resolver are
/// folded into these variants; none of them escape as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found { lat: f64, lon: f64, source: Source },
    NetworkUnavailable,
    RemoteError { detail: String },
    NotFound,
}
