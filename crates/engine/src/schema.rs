// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Auto-increment bookkeeping persisted in the `__schema__` collection
//!
//! One document per table: `{name, auto: {seq, field_names}}`. CREATE
//! TABLE upserts the entry; INSERT bumps `auto.seq` atomically and
//! stamps every listed field with the new sequence value.

use serde::{Deserialize, Serialize};

/// Name of the auxiliary bookkeeping collection
pub const SCHEMA_COLLECTION: &str = "__schema__";

/// One `__schema__` document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub name: String,
    #[serde(default)]
    pub auto: Option<AutoSequence>,
}

/// Monotonic per-table sequence state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoSequence {
    pub seq: i64,
    #[serde(default)]
    pub field_names: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_decodes_schema_document() {
        let doc = doc! {
            "_id": bson::oid::ObjectId::new(),
            "name": "auth_user",
            "auto": { "seq": 3, "field_names": ["id"] },
        };
        let entry: SchemaEntry = bson::from_document(doc).unwrap();
        assert_eq!(entry.name, "auth_user");
        let auto = entry.auto.unwrap();
        assert_eq!(auto.seq, 3);
        assert_eq!(auto.field_names, vec!["id"]);
    }

    #[test]
    fn test_entry_without_auto() {
        let entry: SchemaEntry = bson::from_document(doc! { "name": "plain" }).unwrap();
        assert!(entry.auto.is_none());
    }
}
