//! Zone data model
//!
//! Record sets and records as exchanged with the DNS controller, plus the
//! ephemeral values produced by one reconciliation pass.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// DNS record type that forms load-balancing groups
pub const LOAD_BALANCED_TYPE: &str = "A";

/// A single address in a record set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Record data; for A records this is the probe target
    pub content: String,

    /// Published serving state
    #[serde(default)]
    pub disabled: bool,
}

impl Record {
    /// Create an enabled record
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            disabled: false,
        }
    }

    /// Set the disabled flag
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Parse the record content as an IP address
    pub fn address(&self) -> Option<IpAddr> {
        self.content.trim().parse().ok()
    }
}

/// A group of records sharing one owner name and type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    /// Owner name (e.g. "api.example.")
    pub name: String,

    /// DNS RR type (e.g. "A")
    #[serde(rename = "type")]
    pub record_type: String,

    /// Time-to-live in seconds
    #[serde(default)]
    pub ttl: u32,

    /// Ordered records
    #[serde(default)]
    pub records: Vec<Record>,

    /// Controller-side comments, carried through a replace untouched
    #[serde(default)]
    pub comments: Vec<serde_json::Value>,
}

impl RecordSet {
    /// Create an empty record set
    pub fn new(name: impl Into<String>, record_type: impl Into<String>, ttl: u32) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            ttl,
            records: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Append a record
    pub fn with_record(mut self, record: Record) -> Self {
        self.records.push(record);
        self
    }

    /// Whether this set is a load-balancing group: type A with more than one record
    pub fn is_eligible(&self) -> bool {
        self.record_type == LOAD_BALANCED_TYPE && self.records.len() > 1
    }

    /// Current disabled flags, in record order
    pub fn disabled_flags(&self) -> Vec<bool> {
        self.records.iter().map(|r| r.disabled).collect()
    }
}

/// Identity of a record set within the controller
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordSetKey {
    pub zone: String,
    pub name: String,
    pub record_type: String,
}

impl RecordSetKey {
    pub fn new(zone: &str, record_set: &RecordSet) -> Self {
        Self {
            zone: zone.to_string(),
            name: record_set.name.clone(),
            record_type: record_set.record_type.to_ascii_uppercase(),
        }
    }
}

impl fmt::Display for RecordSetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zone, self.name, self.record_type)
    }
}

/// Identity of a record inside a record set for one pass
///
/// Carried alongside each probe so results are matched back by identity,
/// not re-derived from array position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub index: usize,
    pub content: String,
}

/// Reachability statistic for one address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    /// Probe target
    pub address: IpAddr,
    /// Echo requests sent
    pub sent: u32,
    /// Echo replies received within the window
    pub received: u32,
}

impl ProbeResult {
    pub fn new(address: IpAddr, sent: u32, received: u32) -> Self {
        Self {
            address,
            sent,
            received,
        }
    }

    /// Result recorded when the probe could not run at all
    pub fn unreachable(address: IpAddr) -> Self {
        Self::new(address, 0, 0)
    }

    pub fn is_reachable(&self) -> bool {
        self.received > 0
    }

    /// The disabled flag this result dictates: disabled iff nothing came back
    pub fn desired_disabled(&self) -> bool {
        !self.is_reachable()
    }
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.address, self.received, self.sent)
    }
}

/// Per-record result of one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordVerdict {
    pub key: RecordKey,
    /// `None` when the content is not an address or the probe never ran
    pub probe: Option<ProbeResult>,
    pub was_disabled: bool,
    pub disabled: bool,
}

impl RecordVerdict {
    pub fn flipped(&self) -> bool {
        self.was_disabled != self.disabled
    }
}

/// Outcome of reconciling one record set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationOutcome {
    /// The record set with updated flags
    pub record_set: RecordSet,
    /// True iff at least one record's flag differs from its pre-pass value
    pub changed: bool,
    pub verdicts: Vec<RecordVerdict>,
}

impl ReconciliationOutcome {
    /// Records whose flag flipped in this pass
    pub fn flipped(&self) -> impl Iterator<Item = &RecordVerdict> {
        self.verdicts.iter().filter(|v| v.flipped())
    }
}
