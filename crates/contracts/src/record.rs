//! Record - the unit of ingestion

use serde::{Deserialize, Serialize};

/// A structured record bound for a named destination.
///
/// The payload is an opaque map-like value; the destination key is derived
/// from the source topic by the ingesting connector. Ownership moves from
/// the producer into the destination queue on enqueue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Destination key (e.g. a table name)
    pub destination: String,

    /// Opaque structured payload
    pub value: serde_json::Value,
}

impl Record {
    /// Create a new record for the given destination
    pub fn new(destination: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            destination: destination.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_new() {
        let record = Record::new("orders", json!({"id": 1}));
        assert_eq!(record.destination, "orders");
        assert_eq!(record.value["id"], 1);
    }

    #[test]
    fn test_record_round_trip() {
        let record = Record::new("orders", json!({"id": 1, "qty": 3}));
        let text = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&text).unwrap();
        assert_eq!(back, record);
    }
}
