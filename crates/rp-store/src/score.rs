use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// An `f64` score carrying the IEEE-754 total order, so it can key ordered
/// collections. Callers reject non-finite scores before they reach the
/// index, but the order is total for any input.
#[derive(Debug, Clone, Copy)]
pub struct Score(f64);

impl Score {
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Member -> score map with an ordered mirror.
///
/// The mirror keeps entries sorted by (score ascending, member ascending),
/// which makes rank a range count. Two members with an equal score compare
/// by member identity, so rank is stable across repeated updates with the
/// same score.
///
/// Rank lookup walks the ordered mirror up to the entry, O(rank). No
/// order-statistics tree: working sets here are small and insertion stays
/// logarithmic.
#[derive(Debug, Default)]
pub struct ScoreIndex {
    by_member: HashMap<String, Score>,
    ordered: BTreeSet<(Score, String)>,
}

impl ScoreIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_member.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_member.is_empty()
    }

    /// Insert `member` with `score`, or move it to the new score if already
    /// present. Returns the member's rank immediately after the mutation.
    /// Re-adding with an unchanged score leaves the mirror untouched.
    pub fn add_or_update(&mut self, member: &str, score: f64) -> usize {
        let score = Score::new(score);
        if let Some(&old) = self.by_member.get(member) {
            if old == score {
                return self.position(old, member);
            }
            self.ordered.remove(&(old, member.to_owned()));
        }
        self.by_member.insert(member.to_owned(), score);
        self.ordered.insert((score, member.to_owned()));
        self.position(score, member)
    }

    /// Zero-based rank of `member` under (score, member) ascending order.
    #[must_use]
    pub fn rank(&self, member: &str) -> Option<usize> {
        let score = *self.by_member.get(member)?;
        Some(self.position(score, member))
    }

    #[must_use]
    pub fn score(&self, member: &str) -> Option<f64> {
        self.by_member.get(member).map(|s| s.get())
    }

    /// Remove `member`. Returns whether it was present.
    pub fn remove(&mut self, member: &str) -> bool {
        let Some(score) = self.by_member.remove(member) else {
            return false;
        };
        self.ordered.remove(&(score, member.to_owned()));
        true
    }

    /// Members in rank order within the index range [start, stop], both
    /// inclusive; negative indexes count from the highest rank.
    #[must_use]
    pub fn range(&self, start: i64, stop: i64) -> Vec<(String, f64)> {
        let len = self.ordered.len() as i64;
        let s = normalize_index(start, len);
        let e = normalize_index(stop, len);
        if s > e || s >= self.ordered.len() {
            return Vec::new();
        }
        let take = e - s + 1;
        self.ordered
            .iter()
            .skip(s)
            .take(take)
            .map(|(score, member)| (member.clone(), score.get()))
            .collect()
    }

    fn position(&self, score: Score, member: &str) -> usize {
        self.ordered.range(..(score, member.to_owned())).count()
    }
}

fn normalize_index(index: i64, len: i64) -> usize {
    if index < 0 {
        let adjusted = len.saturating_add(index);
        if adjusted < 0 { 0 } else { adjusted as usize }
    } else {
        index as usize
    }
}
