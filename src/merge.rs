//! Combining several record streams into one.

use rand::{Rng, RngExt};

/// Concatenates `streams`, or with `shuffle` interleaves them by picking a
/// non-exhausted stream uniformly at random on every pull.
pub fn merge<I, R>(streams: Vec<I>, shuffle: bool, rng: R) -> Merge<I, R>
where
    I: Iterator,
    R: Rng,
{
    Merge {
        streams,
        shuffle,
        rng,
    }
}

/// Lazy merge; see [`merge`].
pub struct Merge<I, R> {
    streams: Vec<I>,
    shuffle: bool,
    rng: R,
}

impl<I, R> Iterator for Merge<I, R>
where
    I: Iterator,
    R: Rng,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.streams.is_empty() {
            let index = if self.shuffle {
                self.rng.random_range(0..self.streams.len())
            } else {
                0
            };
            match self.streams[index].next() {
                Some(item) => return Some(item),
                None => {
                    // Keep the remaining order for the sequential case.
                    self.streams.remove(index);
                }
            }
        }
        None
    }
}
