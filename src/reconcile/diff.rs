//! Three-way diff between live and desired windows, keyed by normalized path

use std::collections::HashSet;

use crate::types::{PathKey, WindowDescriptor};

/// Partition of one reconciliation's inputs
///
/// `extra` borrows from the live set, `missing` and `matched` from the desired
/// set. Handles in `matched` are the saved (stale) ones; fresh handles are
/// bound after the settle wait.
#[derive(Debug, Default)]
pub struct LayoutDiff<'a> {
    /// Live windows whose path is not desired
    pub extra: Vec<&'a WindowDescriptor>,
    /// Desired windows whose path is not live
    pub missing: Vec<&'a WindowDescriptor>,
    /// Desired windows whose path is already live
    pub matched: Vec<&'a WindowDescriptor>,
}

impl<'a> LayoutDiff<'a> {
    pub fn compute(live: &'a [WindowDescriptor], desired: &'a [WindowDescriptor]) -> Self {
        let desired_keys: HashSet<PathKey> = desired.iter().map(WindowDescriptor::key).collect();
        let live_keys: HashSet<PathKey> = live.iter().map(WindowDescriptor::key).collect();

        let extra = live
            .iter()
            .filter(|window| !desired_keys.contains(&window.key()))
            .collect();

        let (matched, missing): (Vec<&WindowDescriptor>, Vec<&WindowDescriptor>) = desired
            .iter()
            .partition(|window| live_keys.contains(&window.key()));

        Self {
            extra,
            missing,
            matched,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.extra.is_empty() && self.missing.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Rect, WindowHandle};

    fn window(path: &str, handle: u64) -> WindowDescriptor {
        WindowDescriptor::new(path, WindowHandle(handle), Rect::new(0, 0, 100, 100))
    }

    fn paths(windows: &[&WindowDescriptor]) -> Vec<String> {
        windows.iter().map(|w| w.path.clone()).collect()
    }

    #[test]
    fn test_example_scenario() {
        let live = vec![window(r"C:\A", 1), window(r"C:\B", 2)];
        let desired = vec![window(r"C:\B", 0), window(r"C:\C", 0)];
        let diff = LayoutDiff::compute(&live, &desired);

        assert_eq!(paths(&diff.extra), vec![r"C:\A"]);
        assert_eq!(paths(&diff.missing), vec![r"C:\C"]);
        assert_eq!(paths(&diff.matched), vec![r"C:\B"]);
    }

    #[test]
    fn test_match_is_case_insensitive_and_ignores_handles() {
        let live = vec![window("/Home/Me/Docs", 41)];
        let desired = vec![window("/home/me/docs/", 7)];
        let diff = LayoutDiff::compute(&live, &desired);

        assert!(diff.extra.is_empty());
        assert!(diff.missing.is_empty());
        assert_eq!(diff.matched.len(), 1);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_partition_covers_both_sides_without_overlap() {
        let cases: Vec<(Vec<&str>, Vec<&str>)> = vec![
            (vec![], vec![]),
            (vec!["/a"], vec![]),
            (vec![], vec!["/a"]),
            (vec!["/a", "/b", "/c"], vec!["/B", "/d"]),
            (vec!["/a", "/a", "/b"], vec!["/a", "/c", "/c"]),
        ];

        for (live_paths, desired_paths) in cases {
            let live: Vec<_> = live_paths.iter().map(|p| window(p, 1)).collect();
            let desired: Vec<_> = desired_paths.iter().map(|p| window(p, 0)).collect();
            let diff = LayoutDiff::compute(&live, &desired);

            // missing ∪ matched = desired
            assert_eq!(diff.missing.len() + diff.matched.len(), desired.len());

            // extra ∪ (live windows sharing a matched path) = live
            let matched_keys: HashSet<PathKey> = diff.matched.iter().map(|w| w.key()).collect();
            let live_matched = live.iter().filter(|w| matched_keys.contains(&w.key())).count();
            assert_eq!(diff.extra.len() + live_matched, live.len());

            // pairwise disjoint by path
            let extra_keys: HashSet<PathKey> = diff.extra.iter().map(|w| w.key()).collect();
            let missing_keys: HashSet<PathKey> = diff.missing.iter().map(|w| w.key()).collect();
            assert!(extra_keys.is_disjoint(&missing_keys));
            assert!(extra_keys.is_disjoint(&matched_keys));
            assert!(missing_keys.is_disjoint(&matched_keys));
        }
    }

    #[test]
    fn test_live_duplicates_of_desired_path_are_not_extra() {
        let live = vec![window("/a", 1), window("/a", 2)];
        let desired = vec![window("/a", 0)];
        let diff = LayoutDiff::compute(&live, &desired);
        assert!(diff.extra.is_empty());
        assert_eq!(diff.matched.len(), 1);
    }

    #[test]
    fn test_empty_desired_closes_everything() {
        let live = vec![window("/a", 1), window("/b", 2)];
        let diff = LayoutDiff::compute(&live, &[]);
        assert_eq!(diff.extra.len(), 2);
        assert!(diff.missing.is_empty());
        assert!(diff.matched.is_empty());
    }
}
