//! Random media selection

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Seedable random picker over immutable pool snapshots
pub struct Picker {
    rng: StdRng,
}

impl Picker {
    /// A fixed seed makes every selection reproducible
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Pick a random item, avoiding excluded ones unless nothing else is left
    pub fn pick_distinct<'a, T, F>(&mut self, pool: &'a [T], excluded: F) -> Option<&'a T>
    where
        F: Fn(&T) -> bool,
    {
        let candidates: Vec<&T> = pool.iter().filter(|item| !excluded(item)).collect();
        if candidates.is_empty() {
            pool.choose(&mut self.rng)
        } else {
            candidates.choose(&mut self.rng).copied()
        }
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}

/// Shuffled, non-repeating queue over a path pool.
///
/// Every path is handed out once per round; a new round starts when the
/// queue runs dry and never opens with the path that closed the last one.
#[derive(Debug, Default)]
pub struct ShuffleQueue {
    queue: VecDeque<String>,
    last: Option<String>,
}

impl ShuffleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, pool: &[String], picker: &mut Picker) -> Option<String> {
        if pool.is_empty() {
            self.clear();
            return None;
        }

        // Pool may have been edited since the last refill
        self.queue.retain(|path| pool.contains(path));

        if self.queue.is_empty() {
            let mut round = pool.to_vec();
            picker.shuffle(&mut round);
            if round.len() > 1 && round.first() == self.last.as_ref() {
                let end = round.len() - 1;
                round.swap(0, end);
            }
            self.queue.extend(round);
        }

        let next = self.queue.pop_front()?;
        self.last = Some(next.clone());
        Some(next)
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn pool(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pick_distinct_avoids_excluded() {
        let mut picker = Picker::new(Some(1));
        let items = pool(&["a", "b"]);
        for _ in 0..50 {
            let picked = picker.pick_distinct(&items, |p| p == "a").unwrap();
            assert_eq!(picked, "b");
        }
    }

    #[test]
    fn test_pick_distinct_single_item_pool() {
        let mut picker = Picker::new(Some(1));
        let items = pool(&["only"]);
        assert_eq!(picker.pick_distinct(&items, |p| p == "only").unwrap(), "only");
        let empty: Vec<String> = Vec::new();
        assert!(picker.pick_distinct(&empty, |_| false).is_none());
    }

    #[test]
    fn test_queue_covers_pool_each_round() {
        let mut picker = Picker::new(Some(42));
        let mut queue = ShuffleQueue::new();
        let items = pool(&["a", "b", "c", "d"]);
        for _ in 0..5 {
            let round: HashSet<String> = (0..4).map(|_| queue.next(&items, &mut picker).unwrap()).collect();
            assert_eq!(round.len(), 4);
        }
    }

    #[test]
    fn test_queue_never_repeats_back_to_back() {
        let mut picker = Picker::new(Some(7));
        let mut queue = ShuffleQueue::new();
        let items = pool(&["a", "b", "c"]);
        let mut previous = queue.next(&items, &mut picker);
        for _ in 0..100 {
            let next = queue.next(&items, &mut picker);
            assert_ne!(next, previous);
            previous = next;
        }
    }

    #[test]
    fn test_queue_follows_pool_edits() {
        let mut picker = Picker::new(Some(3));
        let mut queue = ShuffleQueue::new();
        let _ = queue.next(&pool(&["a", "b", "c"]), &mut picker);
        let edited = pool(&["z"]);
        assert_eq!(queue.next(&edited, &mut picker).as_deref(), Some("z"));
        assert_eq!(queue.next(&[], &mut picker), None);
    }
}
