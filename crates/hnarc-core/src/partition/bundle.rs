//! Bundles and bundle groups.

use super::key::FetchKey;

/// Contiguous keys archived as one unit. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// Position of this bundle within its chunk.
    pub seq: usize,
    pub keys: Vec<FetchKey>,
}

impl Bundle {
    pub fn first(&self) -> &FetchKey {
        &self.keys[0]
    }

    pub fn last(&self) -> &FetchKey {
        &self.keys[self.keys.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Bundles whose fetches are issued together and whose results are flushed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleGroup {
    pub seq: usize,
    pub bundles: Vec<Bundle>,
}

impl BundleGroup {
    /// All keys of the group, in bundle then key order.
    pub fn keys(&self) -> impl Iterator<Item = &FetchKey> {
        self.bundles.iter().flat_map(|b| b.keys.iter())
    }

    pub fn key_count(&self) -> usize {
        self.bundles.iter().map(Bundle::len).sum()
    }

    /// `first-last` label for logs and error reports.
    pub fn range_label(&self) -> String {
        match (self.bundles.first(), self.bundles.last()) {
            (Some(a), Some(b)) => format!("{}-{}", a.first(), b.last()),
            _ => "empty".to_string(),
        }
    }
}

/// Split `keys` into bundles of `bundle_size` (the final one may be shorter).
pub fn split_bundles(keys: Vec<FetchKey>, bundle_size: usize) -> Vec<Bundle> {
    let size = bundle_size.max(1);
    let mut out = Vec::with_capacity(keys.len().div_ceil(size));
    let mut iter = keys.into_iter().peekable();
    while iter.peek().is_some() {
        let keys: Vec<FetchKey> = iter.by_ref().take(size).collect();
        out.push(Bundle {
            seq: out.len(),
            keys,
        });
    }
    out
}

/// Group consecutive bundles, `per_group` at a time, preserving order.
pub fn group_bundles(bundles: Vec<Bundle>, per_group: usize) -> Vec<BundleGroup> {
    let size = per_group.max(1);
    let mut out = Vec::with_capacity(bundles.len().div_ceil(size));
    let mut iter = bundles.into_iter().peekable();
    while iter.peek().is_some() {
        let bundles: Vec<Bundle> = iter.by_ref().take(size).collect();
        out.push(BundleGroup {
            seq: out.len(),
            bundles,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(first: u64, last: u64) -> Vec<FetchKey> {
        (first..=last).map(FetchKey::Id).collect()
    }

    #[test]
    fn split_0_to_249_by_100() {
        let bundles = split_bundles(ids(0, 249), 100);
        assert_eq!(bundles.len(), 3);
        assert_eq!(bundles[0].first(), &FetchKey::Id(0));
        assert_eq!(bundles[0].last(), &FetchKey::Id(99));
        assert_eq!(bundles[1].first(), &FetchKey::Id(100));
        assert_eq!(bundles[1].last(), &FetchKey::Id(199));
        assert_eq!(bundles[2].first(), &FetchKey::Id(200));
        assert_eq!(bundles[2].last(), &FetchKey::Id(249));
        assert_eq!(bundles[2].len(), 50);
        assert_eq!(bundles[2].seq, 2);
    }

    #[test]
    fn groups_of_ten_bundles() {
        let bundles = split_bundles(ids(0, 2_549), 100);
        let groups = group_bundles(bundles, 10);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].key_count(), 1_000);
        assert_eq!(groups[2].key_count(), 550);
        assert_eq!(groups[2].bundles.len(), 6);
        assert_eq!(groups[1].range_label(), "1000-1999");
        let first_of_each: Vec<_> = groups.iter().map(|g| g.seq).collect();
        assert_eq!(first_of_each, vec![0, 1, 2]);
    }

    #[test]
    fn group_keys_in_order() {
        let groups = group_bundles(split_bundles(ids(10, 14), 2), 2);
        let keys: Vec<String> = groups[0].keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["10", "11", "12", "13"]);
        assert_eq!(groups[1].range_label(), "14-14");
    }

    #[test]
    fn empty_input_has_no_bundles() {
        assert!(split_bundles(Vec::new(), 100).is_empty());
        assert!(group_bundles(Vec::new(), 10).is_empty());
    }
}
