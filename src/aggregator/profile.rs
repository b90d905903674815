//! Merged stack-trace sample tree.

use super::snapshot::{ProfileNodeSnapshot, ProfileSnapshot};
use crate::model::StackProfile;

#[derive(Debug, Clone, Default)]
struct ProfileNode {
    frame: String,
    sample_count: u64,
    children: Vec<ProfileNode>,
}

impl ProfileNode {
    fn new(frame: &str) -> Self {
        Self {
            frame: frame.to_string(),
            sample_count: 0,
            children: Vec::new(),
        }
    }

    fn to_snapshot(&self) -> ProfileNodeSnapshot {
        ProfileNodeSnapshot {
            frame: self.frame.clone(),
            sample_count: self.sample_count,
            children: self.children.iter().map(ProfileNode::to_snapshot).collect(),
        }
    }
}

/// Stack samples of many transactions merged into one call tree
///
/// Stacks sharing a prefix share the nodes of that prefix. Each node counts
/// the samples whose stack passed through it.
#[derive(Debug, Clone, Default)]
pub struct MutableProfile {
    roots: Vec<ProfileNode>,
    sample_count: u64,
}

impl MutableProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of samples merged
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Merge every sample of a transaction's profile
    pub fn merge(&mut self, profile: &StackProfile) {
        for sample in &profile.samples {
            if sample.frames.is_empty() || sample.count == 0 {
                continue;
            }
            self.add_stack(&sample.frames, sample.count);
        }
    }

    fn add_stack(&mut self, frames: &[String], count: u64) {
        self.sample_count += count;
        let mut level = &mut self.roots;
        for frame in frames {
            let position = match level.iter().position(|n| &n.frame == frame) {
                Some(position) => position,
                None => {
                    level.push(ProfileNode::new(frame));
                    level.len() - 1
                }
            };
            let node = &mut level[position];
            node.sample_count += count;
            level = &mut node.children;
        }
    }

    pub fn to_snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            sample_count: self.sample_count,
            roots: self.roots.iter().map(ProfileNode::to_snapshot).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StackSample;

    #[test]
    fn test_shared_prefix_shares_nodes() {
        let mut profile = MutableProfile::new();
        profile.merge(&StackProfile {
            samples: vec![
                StackSample::new(&["main", "handle", "query"], 3),
                StackSample::new(&["main", "handle", "render"], 1),
            ],
        });
        profile.merge(&StackProfile {
            samples: vec![StackSample::new(&["main", "idle"], 2)],
        });

        let snapshot = profile.to_snapshot();

        assert_eq!(snapshot.sample_count, 6);
        assert_eq!(snapshot.roots.len(), 1);
        let main = &snapshot.roots[0];
        assert_eq!(main.sample_count, 6);
        assert_eq!(main.children.len(), 2);
        assert_eq!(main.children[0].frame, "handle");
        assert_eq!(main.children[0].sample_count, 4);
        assert_eq!(main.children[1].sample_count, 2);
    }

    #[test]
    fn test_empty_samples_are_ignored() {
        let mut profile = MutableProfile::new();
        profile.merge(&StackProfile {
            samples: vec![StackSample::new(&[], 5), StackSample::new(&["main"], 0)],
        });

        assert_eq!(profile.sample_count(), 0);
        assert!(profile.to_snapshot().roots.is_empty());
    }
}
