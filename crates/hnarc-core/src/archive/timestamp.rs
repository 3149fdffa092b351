//! Content timestamps: the newest `time` (items) or `created` (users) value.

use serde_json::Value;

use crate::partition::KeyKind;

use super::ArchiveError;

/// Timestamp field of one parsed record, if present and a non-negative integer.
pub fn record_timestamp(record: &Value, kind: KeyKind) -> Option<u64> {
    record.get(kind.timestamp_field()).and_then(Value::as_u64)
}

/// Newest timestamp over `records` (raw JSON texts). Records without a usable
/// timestamp are skipped; if none has one the bundle is rejected.
pub fn content_timestamp<'a, I>(records: I, kind: KeyKind, archive: &str) -> Result<u64, ArchiveError>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut newest: Option<u64> = None;
    for (index, raw) in records.into_iter().enumerate() {
        let value: Value = serde_json::from_slice(raw).map_err(|source| ArchiveError::Malformed {
            archive: archive.to_string(),
            index,
            source,
        })?;
        match record_timestamp(&value, kind) {
            Some(ts) => newest = Some(newest.map_or(ts, |n| n.max(ts))),
            None => tracing::debug!(archive, index, "record has no {} field", kind.timestamp_field()),
        }
    }
    newest.ok_or(ArchiveError::NoTimestamp {
        archive: archive.to_string(),
        field: kind.timestamp_field(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(v: &[&str]) -> Vec<Vec<u8>> {
        v.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn newest_item_time() {
        let recs = raw(&[
            r#"{"id":1,"time":100}"#,
            r#"{"id":2,"time":300}"#,
            r#"{"id":3,"time":200}"#,
        ]);
        let ts = content_timestamp(recs.iter().map(Vec::as_slice), KeyKind::Items, "1-3.zst").unwrap();
        assert_eq!(ts, 300);
    }

    #[test]
    fn skips_records_without_time() {
        let recs = raw(&[
            r#"{"id":1,"time":100}"#,
            r#"{"id":2,"time":150}"#,
            r#"{"id":3,"deleted":true}"#,
        ]);
        let ts = content_timestamp(recs.iter().map(Vec::as_slice), KeyKind::Items, "1-3.zst").unwrap();
        assert_eq!(ts, 150);
    }

    #[test]
    fn users_use_created() {
        let recs = raw(&[r#"{"id":"pg","created":1160418092,"karma":155111}"#]);
        let ts = content_timestamp(recs.iter().map(Vec::as_slice), KeyKind::Users, "pg.json").unwrap();
        assert_eq!(ts, 1_160_418_092);
        assert!(content_timestamp(recs.iter().map(Vec::as_slice), KeyKind::Items, "pg.json").is_err());
    }

    #[test]
    fn no_timestamp_is_error() {
        let recs = raw(&[r#"{"id":5,"deleted":true}"#, r#"{"id":6,"time":"soon"}"#]);
        let err = content_timestamp(recs.iter().map(Vec::as_slice), KeyKind::Items, "5-6.zst").unwrap_err();
        assert!(matches!(err, ArchiveError::NoTimestamp { field: "time", .. }));
        assert_eq!(err.to_string(), "5-6.zst: no record carries a `time` timestamp");
    }

    #[test]
    fn malformed_record_is_error() {
        let recs = raw(&[r#"{"id":1,"time":1}"#, r#"{"id":2,"#]);
        let err = content_timestamp(recs.iter().map(Vec::as_slice), KeyKind::Items, "1-2.zst").unwrap_err();
        assert!(matches!(err, ArchiveError::Malformed { index: 1, .. }));
    }

    #[test]
    fn empty_input_is_error() {
        assert!(content_timestamp(Vec::<&[u8]>::new(), KeyKind::Items, "x").is_err());
    }
}
