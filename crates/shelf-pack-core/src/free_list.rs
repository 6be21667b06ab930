use crate::model::Bin;

/// Reclaimed bins waiting to be reused.
///
/// Every entry has a refcount of zero and no entry in the atlas index. The physical
/// slot of a bin is never discarded, only handed out again.
#[derive(Debug, Clone, Default)]
pub struct FreeList {
    bins: Vec<Bin>,
}

impl FreeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bin> {
        self.bins.iter()
    }

    pub(crate) fn push(&mut self, bin: Bin) {
        debug_assert_eq!(bin.refcount, 0, "live bin pushed to the free list");
        self.bins.push(bin);
    }

    /// Finds the free bin best suited to hold a `w` x `h` request.
    ///
    /// Only bins whose capacity covers the request are candidates. A bin whose
    /// capacity matches exactly is returned immediately; otherwise the candidate
    /// with the smallest `(maxh - h) * (maxw - w)` wins, earliest on ties.
    pub fn best_fit(&self, w: u32, h: u32) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for (i, bin) in self.bins.iter().enumerate() {
            if bin.maxw == w && bin.maxh == h {
                return Some(i);
            }
            if w > bin.maxw || h > bin.maxh {
                continue;
            }
            let waste = u64::from(bin.maxh - h) * u64::from(bin.maxw - w);
            if best.is_none_or(|(_, best_waste)| waste < best_waste) {
                best = Some((i, waste));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Removes the bin at `index`, keeping the order of the rest.
    pub(crate) fn take(&mut self, index: usize) -> Bin {
        self.bins.remove(index)
    }

    pub(crate) fn clear(&mut self) {
        self.bins.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BinId;

    fn free_bin(id: u64, maxw: u32, maxh: u32) -> Bin {
        Bin::new(BinId::from(id), 0, 0, maxw, maxh)
    }

    #[test]
    fn exact_match_short_circuits() {
        let mut list = FreeList::new();
        list.push(free_bin(1, 12, 11));
        list.push(free_bin(2, 10, 10));
        list.push(free_bin(3, 10, 10));
        assert_eq!(list.best_fit(10, 10), Some(1));
    }

    #[test]
    fn picks_minimum_waste_and_keeps_first_on_ties() {
        let mut list = FreeList::new();
        list.push(free_bin(1, 8, 8));
        list.push(free_bin(2, 14, 14));
        list.push(free_bin(3, 12, 12));
        list.push(free_bin(4, 12, 12));
        // (12-10)*(12-10) = 4 beats (14-10)*(14-10) = 16; bin 1 is too small.
        assert_eq!(list.best_fit(10, 10), Some(2));
    }

    #[test]
    fn waste_is_product_of_leftovers() {
        let mut list = FreeList::new();
        list.push(free_bin(1, 20, 30));
        list.push(free_bin(2, 10, 30));
        // Bin 2 wastes (30-10)*(10-10) = 0 against 200 for bin 1.
        assert_eq!(list.best_fit(10, 10), Some(1));
    }

    #[test]
    fn no_candidate_when_capacity_is_too_small() {
        let mut list = FreeList::new();
        list.push(free_bin(1, 10, 10));
        assert_eq!(list.best_fit(10, 13), None);
        assert_eq!(list.best_fit(11, 10), None);
        assert_eq!(list.take(0).id, BinId::from(1u64));
        assert!(list.is_empty());
    }
}
