use std::collections::BTreeSet;

use crate::detect::Detection;

/// Distinct labels seen during one stream session.
///
/// The set only grows. It is created empty with each session and only the
/// session loop can add to it; outside the crate it is read-only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UniqueLabelSet {
    labels: BTreeSet<String>,
}

impl UniqueLabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Labels in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.labels.iter().cloned().collect()
    }

    /// Union in the labels of `detections`. Returns how many were new.
    pub(crate) fn merge(&mut self, detections: &[Detection]) -> usize {
        let before = self.labels.len();
        for det in detections {
            if !self.labels.contains(&det.label) {
                self.labels.insert(det.label.clone());
            }
        }
        self.labels.len() - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dets(labels: &[&str]) -> Vec<Detection> {
        labels.iter().map(|l| Detection::new(*l, 0.9)).collect()
    }

    #[test]
    fn merge_is_a_set_union() {
        let mut set = UniqueLabelSet::new();
        assert_eq!(set.merge(&dets(&["cat"])), 1);
        assert_eq!(set.merge(&dets(&["dog", "cat", "dog"])), 1);
        assert_eq!(set.merge(&dets(&[])), 0);
        assert_eq!(set.to_vec(), vec!["cat", "dog"]);
        assert!(set.contains("dog"));
        assert!(!set.contains("bird"));
    }

    #[test]
    fn merge_order_does_not_matter() {
        let batches = [dets(&["b", "a"]), dets(&["c"]), dets(&["a", "d"])];

        let mut forward = UniqueLabelSet::new();
        for batch in &batches {
            forward.merge(batch);
        }
        let mut backward = UniqueLabelSet::new();
        for batch in batches.iter().rev() {
            backward.merge(batch);
        }
        assert_eq!(forward, backward);
        assert_eq!(forward.iter().collect::<Vec<_>>(), vec!["a", "b", "c", "d"]);
    }
}
