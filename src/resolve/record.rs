//! Per-host DNS record bundles.
//!
//! A [`DnsRecord`] is the unit that flows from the resolver client through
//! the pool to the output stage, and (in wildcard mode) in and out of the
//! host store as an opaque byte string.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::config::QuestionType;

static RCODE_NAMES: Lazy<HashMap<u16, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (0, "NOERROR"),
        (1, "FORMERR"),
        (2, "SERVFAIL"),
        (3, "NXDOMAIN"),
        (4, "NOTIMP"),
        (5, "REFUSED"),
        (6, "YXDOMAIN"),
        (7, "YXRRSET"),
        (8, "NXRRSET"),
        (9, "NOTAUTH"),
        (10, "NOTZONE"),
        (16, "BADVERS"),
        (17, "BADKEY"),
        (18, "BADTIME"),
        (19, "BADMODE"),
        (20, "BADNAME"),
        (21, "BADALG"),
        (22, "BADTRUNC"),
        (23, "BADCOOKIE"),
    ])
});

/// The printable name of a DNS response code.
pub fn rcode_name(code: u16) -> Option<&'static str> {
    RCODE_NAMES.get(&code).copied()
}

/// Parses a response-code name (case-insensitive) back to its numeric value.
pub fn rcode_from_name(name: &str) -> Option<u16> {
    let upper = name.trim().to_uppercase();
    RCODE_NAMES
        .iter()
        .find(|(_, v)| **v == upper)
        .map(|(k, _)| *k)
}

/// Ordered chain of intermediate resolver responses, root side first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceData {
    /// One record bundle per traced suffix.
    pub records: Vec<DnsRecord>,
}

/// The result of resolving one host: union of answers across every
/// configured question type, plus response metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsRecord {
    /// Origin host the answers belong to.
    pub host: String,
    /// When the response was received; the UNIX epoch marks an unset value.
    pub timestamp: DateTime<Utc>,
    /// Textual rendering of the answer records.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub raw: String,
    /// Numeric DNS response code.
    pub status_code: u16,
    /// A answers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub a: Vec<String>,
    /// AAAA answers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aaaa: Vec<String>,
    /// CNAME answers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cname: Vec<String>,
    /// PTR answers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ptr: Vec<String>,
    /// MX exchange answers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mx: Vec<String>,
    /// NS answers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ns: Vec<String>,
    /// SOA answers (`mname rname` per record).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub soa: Vec<String>,
    /// TXT answers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub txt: Vec<String>,
    /// Recursion chain, present only when tracing is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceData>,
}

impl Default for DnsRecord {
    fn default() -> Self {
        Self {
            host: String::new(),
            timestamp: DateTime::UNIX_EPOCH,
            raw: String::new(),
            status_code: 0,
            a: Vec::new(),
            aaaa: Vec::new(),
            cname: Vec::new(),
            ptr: Vec::new(),
            mx: Vec::new(),
            ns: Vec::new(),
            soa: Vec::new(),
            txt: Vec::new(),
            trace: None,
        }
    }
}

impl DnsRecord {
    /// A fresh bundle for `host`, stamped with the current time.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            timestamp: Utc::now(),
            ..Default::default()
        }
    }

    /// Whether the pool must drop this result (empty host or unset
    /// timestamp).
    pub fn is_discardable(&self) -> bool {
        self.host.is_empty() || self.timestamp == DateTime::UNIX_EPOCH
    }

    /// The answer list for one question type.
    pub fn answers(&self, qtype: QuestionType) -> &[String] {
        match qtype {
            QuestionType::A => &self.a,
            QuestionType::Aaaa => &self.aaaa,
            QuestionType::Cname => &self.cname,
            QuestionType::Ptr => &self.ptr,
            QuestionType::Mx => &self.mx,
            QuestionType::Ns => &self.ns,
            QuestionType::Soa => &self.soa,
            QuestionType::Txt => &self.txt,
        }
    }

    /// Appends one answer to the list for `qtype`.
    pub fn push_answer(&mut self, qtype: QuestionType, value: String) {
        match qtype {
            QuestionType::A => self.a.push(value),
            QuestionType::Aaaa => self.aaaa.push(value),
            QuestionType::Cname => self.cname.push(value),
            QuestionType::Ptr => self.ptr.push(value),
            QuestionType::Mx => self.mx.push(value),
            QuestionType::Ns => self.ns.push(value),
            QuestionType::Soa => self.soa.push(value),
            QuestionType::Txt => self.txt.push(value),
        }
    }

    /// Serializes to the opaque byte form stored in the host store.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Deserializes the opaque byte form.
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// The JSON output-mode form.
    pub fn json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DnsRecord {
        DnsRecord {
            host: "example.com".into(),
            timestamp: Utc::now(),
            raw: "example.com.\t300\tIN\tA\t93.184.216.34".into(),
            status_code: 0,
            a: vec!["93.184.216.34".into()],
            cname: vec!["edge.example.net.".into()],
            txt: vec!["v=spf1 -all".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_store_round_trip_preserves_fields() {
        let record = sample();
        let bytes = record.to_bytes().unwrap();
        let restored = DnsRecord::from_bytes(&bytes).unwrap();
        assert_eq!(restored, record);
    }

    #[test]
    fn test_default_is_discardable() {
        assert!(DnsRecord::default().is_discardable());
        let mut record = DnsRecord::new("example.com");
        assert!(!record.is_discardable());
        record.host.clear();
        assert!(record.is_discardable());
    }

    #[test]
    fn test_answers_accessor_matches_push() {
        let mut record = DnsRecord::new("example.com");
        record.push_answer(QuestionType::Mx, "mx1.example.com.".into());
        record.push_answer(QuestionType::Mx, "mx2.example.com.".into());
        assert_eq!(record.answers(QuestionType::Mx).len(), 2);
        assert!(record.answers(QuestionType::A).is_empty());
    }

    #[test]
    fn test_rcode_tables() {
        assert_eq!(rcode_name(0), Some("NOERROR"));
        assert_eq!(rcode_name(3), Some("NXDOMAIN"));
        assert_eq!(rcode_name(12345), None);
        assert_eq!(rcode_from_name("nxdomain"), Some(3));
        assert_eq!(rcode_from_name("SERVFAIL"), Some(2));
        assert_eq!(rcode_from_name("nonsense"), None);
    }

    #[test]
    fn test_json_omits_empty_sections() {
        let record = sample();
        let json = record.json().unwrap();
        assert!(json.contains("\"a\""));
        assert!(!json.contains("\"aaaa\""));
        assert!(!json.contains("\"trace\""));
    }
}
