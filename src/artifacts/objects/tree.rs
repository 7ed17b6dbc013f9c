//! Tree payload codec
//!
//! A tree payload is a concatenation of records, each
//! `<mode> <name>\0<20-byte-binary-id>`, with no separator beyond the
//! embedded NUL and the fixed binary id length. Names are measured in bytes
//! (non-ASCII names count by encoding, not by characters).
//!
//! Decoding is strict: it must consume the payload exactly, and duplicate
//! names within one tree are a format error. Decoded record order is
//! preserved, so a loaded tree re-encodes to identical bytes; newly built
//! trees sort their records by name for a canonical serialization.

use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::ObjectError;
use bytes::Bytes;
use derive_new::new;
use std::collections::HashSet;
use std::io::{BufRead, Write};

/// One (mode, name, id) record of a tree.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct TreeRecord {
    pub mode: EntryMode,
    pub name: String,
    pub id: ObjectId,
}

/// Decode a tree payload, consuming it exactly.
///
/// Any leftover or short bytes, and any duplicate entry name, is
/// `InvalidTreeData` naming the offending tree.
pub fn decode_entries(payload: &[u8], tree_id: &ObjectId) -> anyhow::Result<Vec<TreeRecord>> {
    let mut reader = payload;
    let mut records = Vec::new();
    let mut seen_names = HashSet::new();

    // Reuse scratch buffers to reduce allocs
    let mut mode_bytes = Vec::new();
    let mut name_bytes = Vec::new();

    loop {
        mode_bytes.clear();
        let n = reader.read_until(b' ', &mut mode_bytes)?;
        if n == 0 {
            break; // clean EOF: no more records
        }
        if mode_bytes.pop() != Some(b' ') {
            return Err(invalid_tree(tree_id).into());
        }

        name_bytes.clear();
        let n = reader.read_until(b'\0', &mut name_bytes)?;
        if n == 0 || name_bytes.pop() != Some(b'\0') {
            return Err(invalid_tree(tree_id).into());
        }

        let mode = std::str::from_utf8(&mode_bytes)?;
        let name = std::str::from_utf8(&name_bytes)?.to_owned();
        let mode = EntryMode::try_parse(mode, &name)?;

        let id = ObjectId::read_h40_from(&mut reader).map_err(|_| invalid_tree(tree_id))?;

        if !seen_names.insert(name.clone()) {
            return Err(invalid_tree(tree_id).into());
        }

        records.push(TreeRecord::new(mode, name, id));
    }

    Ok(records)
}

/// Encode records into the tree wire payload, in the given order.
pub fn encode_entries(records: &[TreeRecord]) -> anyhow::Result<Bytes> {
    let mut payload = Vec::new();

    for record in records {
        payload.write_all(record.mode.as_str().as_bytes())?;
        payload.push(b' ');
        payload.write_all(record.name.as_bytes())?;
        payload.push(0);
        record.id.write_h40_to(&mut payload)?;
    }

    Ok(Bytes::from(payload))
}

/// Name-sorted copy of the records, the canonical order for created trees.
pub fn sorted_by_name(records: &[TreeRecord]) -> Vec<TreeRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    sorted
}

fn invalid_tree(tree_id: &ObjectId) -> ObjectError {
    ObjectError::InvalidTreeData {
        id: tree_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::entry_mode::FileMode;
    use pretty_assertions::assert_eq;

    fn some_id() -> ObjectId {
        ObjectId::digest_of(b"blob 4\0some")
    }

    fn record_bytes(mode: &str, name: &str, id: &ObjectId) -> Vec<u8> {
        let mut bytes = format!("{mode} {name}\0").into_bytes();
        id.write_h40_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn decode_then_encode_reproduces_identical_bytes() {
        let id = some_id();
        let payload = record_bytes("100644", "file1", &id);

        let records = decode_entries(&payload, &some_id()).unwrap();
        assert_eq!(
            records,
            vec![TreeRecord::new(
                EntryMode::File(FileMode::Regular),
                "file1".to_string(),
                id
            )]
        );

        let encoded = encode_entries(&records).unwrap();
        assert_eq!(encoded.as_ref(), payload.as_slice());
    }

    #[test]
    fn preserves_on_disk_record_order() {
        let id = some_id();
        let mut payload = record_bytes("100644", "zeta", &id);
        payload.extend(record_bytes("40000", "alpha", &id));

        let records = decode_entries(&payload, &some_id()).unwrap();
        assert_eq!(records[0].name, "zeta");
        assert_eq!(records[1].name, "alpha");
        assert_eq!(encode_entries(&records).unwrap().as_ref(), payload.as_slice());
    }

    #[test]
    fn residual_bytes_are_a_format_error() {
        let id = some_id();
        let mut payload = record_bytes("100644", "file1", &id);
        payload.push(b'x');

        let err = decode_entries(&payload, &some_id()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ObjectError>(),
            Some(ObjectError::InvalidTreeData { .. })
        ));
    }

    #[test]
    fn truncated_id_is_a_format_error() {
        let id = some_id();
        let mut payload = record_bytes("100644", "file1", &id);
        payload.truncate(payload.len() - 3);

        assert!(decode_entries(&payload, &some_id()).is_err());
    }

    #[test]
    fn duplicate_names_are_a_format_error() {
        let id = some_id();
        let mut payload = record_bytes("100644", "file1", &id);
        payload.extend(record_bytes("100755", "file1", &id));

        let err = decode_entries(&payload, &some_id()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ObjectError>(),
            Some(ObjectError::InvalidTreeData { .. })
        ));
    }

    #[test]
    fn unknown_mode_is_invalid_mode() {
        let id = some_id();
        let payload = record_bytes("100600", "file1", &id);

        let err = decode_entries(&payload, &some_id()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ObjectError>(),
            Some(ObjectError::InvalidMode { .. })
        ));
    }

    #[test]
    fn non_ascii_names_round_trip_by_bytes() {
        let id = some_id();
        let records = vec![TreeRecord::new(
            EntryMode::File(FileMode::Regular),
            "ação.txt".to_string(),
            id,
        )];

        let payload = encode_entries(&records).unwrap();
        let back = decode_entries(&payload, &some_id()).unwrap();
        assert_eq!(back, records);
    }
}
