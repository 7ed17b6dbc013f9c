//! Canonical serialization for the structured backends
//!
//! The memory and relational stores do not share the filesystem's framed
//! text format; their content addresses are computed over a canonical JSON
//! rendering of the logical fields instead. Two backends therefore never
//! need to agree byte-for-byte, only on logical content identity within one
//! backend.
//!
//! Blob bytes are base64-encoded (JSON cannot carry raw bytes); tree records
//! are expected in their persisted (name-sorted) order.

use crate::artifacts::objects::git_object::ObjectContent;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde_json::json;

/// Render the canonical byte form whose SHA-1 is the object's identity on a
/// structured backend. Deterministic for a given logical content.
pub fn canonical_bytes(content: &ObjectContent) -> Vec<u8> {
    let value = match content {
        ObjectContent::Blob(data) => json!(["blob", BASE64_STANDARD.encode(data)]),
        ObjectContent::Tree(records) => {
            let records: Vec<_> = records
                .iter()
                .map(|record| {
                    json!([
                        record.mode.as_str(),
                        record.name,
                        record.id.as_ref()
                    ])
                })
                .collect();
            json!(["tree", records])
        }
        ObjectContent::Commit(commit) => {
            let parents: Vec<_> = commit.parents.iter().map(|p| p.as_ref()).collect();
            json!([
                "commit",
                commit.tree.as_ref(),
                parents,
                commit.author.display(),
                commit.committer.as_ref().map(|c| c.display()),
                commit.subject
            ])
        }
    };

    value.to_string().into_bytes()
}
