use crate::config::ShelfPackConfig;
use crate::error::{Result, ShelfPackError};
use crate::free_list::FreeList;
use crate::model::{Bin, BinId, Layout, PackOptions, PackRequest, PackStats};
use crate::shelf::Shelf;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument, trace};

/// Growable atlas allocator using Shelf Best Height Fit.
///
/// Requests are served, in order of preference, from reclaimed bins on the free
/// list, from existing shelves (exact height first, then least height waste), and
/// finally from a new shelf stacked under the last one. With `auto_resize` the
/// atlas doubles its smaller side when nothing fits and tries again.
///
/// Bins are reference counted and addressed by [`BinId`]; dropping the last
/// reference moves a bin to the free list where its slot can be reused.
///
/// The allocator does no internal locking. Share it behind a mutex or keep one per
/// thread.
#[derive(Debug, Clone)]
pub struct ShelfPack {
    width: u32,
    height: u32,
    auto_resize: bool,
    shelves: Vec<Shelf>,
    free_list: FreeList,
    index: HashMap<BinId, Bin>,
    next_id: u64,
    height_histogram: BTreeMap<u32, u32>,
}

impl Default for ShelfPack {
    fn default() -> Self {
        Self::new(ShelfPackConfig::default())
    }
}

impl ShelfPack {
    /// Creates an empty atlas. Zero dimensions fall back to the default of 64.
    pub fn new(cfg: ShelfPackConfig) -> Self {
        let cfg = cfg.normalized();
        Self {
            width: cfg.width,
            height: cfg.height,
            auto_resize: cfg.auto_resize,
            shelves: Vec::new(),
            free_list: FreeList::new(),
            index: HashMap::new(),
            next_id: 1,
            height_histogram: BTreeMap::new(),
        }
    }

    /// Creates a fixed-size atlas (no auto-resize).
    pub fn with_size(width: u32, height: u32) -> Self {
        Self::new(
            ShelfPackConfig::builder()
                .with_dimensions(width, height)
                .build(),
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn auto_resize(&self) -> bool {
        self.auto_resize
    }

    pub fn shelves(&self) -> &[Shelf] {
        &self.shelves
    }

    pub fn free_bins(&self) -> &FreeList {
        &self.free_list
    }

    /// Live bins ordered by id.
    pub fn bins(&self) -> Vec<&Bin> {
        let mut bins: Vec<&Bin> = self.index.values().collect();
        bins.sort_by(|a, b| a.id.cmp(&b.id));
        bins
    }

    pub fn bin_count(&self) -> usize {
        self.index.len()
    }

    pub fn contains(&self, id: &BinId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get_bin(&self, id: &BinId) -> Option<&Bin> {
        self.index.get(id)
    }

    /// Number of live bins per height.
    pub fn height_histogram(&self) -> &BTreeMap<u32, u32> {
        &self.height_histogram
    }

    /// Places a single `w` x `h` bin and returns a copy of it.
    ///
    /// If `id` already names a live bin, that bin is returned as is and its refcount
    /// is left alone. Without an id, one is synthesized from an internal counter.
    ///
    /// Returns [`ShelfPackError::OutOfSpace`] when the request does not fit a
    /// fixed-size atlas; in that case nothing is modified. Without an id, fails
    /// with [`ShelfPackError::InvalidId`] once the id counter is exhausted.
    pub fn pack_one(&mut self, w: u32, h: u32, id: Option<BinId>) -> Result<Bin> {
        if w == 0 || h == 0 {
            return Err(ShelfPackError::InvalidDimensions {
                width: w,
                height: h,
            });
        }
        if let Some(bin) = id.as_ref().and_then(|id| self.index.get(id)) {
            return Ok(bin.clone());
        }

        let (id, next_id) = self.claim_id(id)?;
        loop {
            if let Some(bin) = self.try_place(w, h, &id) {
                self.next_id = next_id;
                return Ok(bin);
            }
            if !self.auto_resize || !self.grow(w, h) {
                return Err(ShelfPackError::OutOfSpace);
            }
        }
    }

    /// Packs a batch of requests in input order and shrinks the atlas to fit.
    ///
    /// Requests with a zero dimension or that do not fit are skipped, so the result
    /// may be shorter than the input. With `options.in_place`, every placed request
    /// gets its `x`, `y` and `id` filled in.
    #[instrument(level = "debug", skip_all, fields(requests = requests.len()))]
    pub fn pack(&mut self, requests: &mut [PackRequest], options: PackOptions) -> Vec<Bin> {
        let mut results = Vec::with_capacity(requests.len());
        for req in requests.iter_mut() {
            if req.w == 0 || req.h == 0 {
                trace!(w = req.w, h = req.h, "skipping request without dimensions");
                continue;
            }
            match self.pack_one(req.w, req.h, req.id.clone()) {
                Ok(bin) => {
                    if options.in_place {
                        req.x = Some(bin.x);
                        req.y = Some(bin.y);
                        req.id = Some(bin.id.clone());
                    }
                    results.push(bin);
                }
                Err(err) => trace!(w = req.w, h = req.h, %err, "skipping request"),
            }
        }
        self.shrink();
        results
    }

    /// Shrinks the atlas to the bounding box of its shelves.
    ///
    /// Width becomes the widest used shelf extent and height the sum of shelf
    /// heights. Placed bins are never invalidated. Does nothing without shelves.
    pub fn shrink(&mut self) {
        if self.shelves.is_empty() {
            return;
        }
        let width = self
            .shelves
            .iter()
            .map(Shelf::used_width)
            .max()
            .unwrap_or(0);
        let height = self.shelves_height();
        debug!(
            from_w = self.width,
            from_h = self.height,
            to_w = width,
            to_h = height,
            "shrink atlas"
        );
        self.width = width;
        self.height = height;
        for shelf in &mut self.shelves {
            shelf.fit_width(width);
        }
    }

    /// Grows the atlas to `width` x `height`.
    ///
    /// Returns `false` and leaves the atlas untouched if either dimension is smaller
    /// than the current one.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width < self.width || height < self.height {
            return false;
        }
        self.width = width;
        self.height = height;
        for shelf in &mut self.shelves {
            shelf.resize(width);
        }
        true
    }

    /// Adds a reference to a live bin and returns the new refcount.
    ///
    /// Returns 0 if `id` does not name a live bin.
    pub fn ref_bin(&mut self, id: &BinId) -> u32 {
        match self.index.get_mut(id) {
            Some(bin) => {
                bin.refcount += 1;
                bin.refcount
            }
            None => 0,
        }
    }

    /// Drops a reference to a live bin and returns the new refcount.
    ///
    /// When the count reaches zero the bin leaves the index and its slot goes to the
    /// free list. Unknown or already released ids return 0 without any change.
    pub fn unref_bin(&mut self, id: &BinId) -> u32 {
        let Some(bin) = self.index.get_mut(id) else {
            return 0;
        };
        bin.refcount -= 1;
        if bin.refcount > 0 {
            return bin.refcount;
        }
        if let Some(bin) = self.index.remove(id) {
            if let Some(count) = self.height_histogram.get_mut(&bin.h) {
                *count -= 1;
                if *count == 0 {
                    self.height_histogram.remove(&bin.h);
                }
            }
            trace!(id = %bin.id, x = bin.x, y = bin.y, "bin released to free list");
            self.free_list.push(bin);
        }
        0
    }

    /// Drops all shelves, bins and free entries.
    ///
    /// Dimensions and the auto-resize policy are kept. The id counter keeps
    /// counting, so synthesized ids are not handed out twice.
    pub fn clear(&mut self) {
        self.shelves.clear();
        self.free_list.clear();
        self.index.clear();
        self.height_histogram.clear();
    }

    /// Serializable snapshot of the current state.
    pub fn snapshot(&self) -> Layout {
        Layout {
            width: self.width,
            height: self.height,
            auto_resize: self.auto_resize,
            shelves: self.shelves.clone(),
            bins: self.bins().into_iter().cloned().collect(),
            free_bins: self.free_list.iter().cloned().collect(),
        }
    }

    pub fn stats(&self) -> PackStats {
        self.snapshot().stats()
    }

    fn shelves_height(&self) -> u32 {
        self.shelves.iter().map(Shelf::height).sum()
    }

    /// Resolves the id for a new bin and the counter value to store once it is placed.
    ///
    /// Synthesized ids skip numbers held by live bins; running off the end of the
    /// counter is an [`ShelfPackError::InvalidId`].
    fn claim_id(&self, id: Option<BinId>) -> Result<(BinId, u64)> {
        if let Some(id) = id {
            let next = match id.as_numeric() {
                Some(n) => self.next_id.max(n.saturating_add(1)),
                None => self.next_id,
            };
            return Ok((id, next));
        }
        let mut n = self.next_id;
        while self.index.contains_key(&BinId::Numeric(n)) {
            n = n
                .checked_add(1)
                .ok_or_else(|| ShelfPackError::InvalidId("id counter exhausted".into()))?;
        }
        Ok((BinId::Numeric(n), n.saturating_add(1)))
    }

    fn try_place(&mut self, w: u32, h: u32, id: &BinId) -> Option<Bin> {
        if let Some(i) = self.free_list.best_fit(w, h) {
            let mut bin = self.free_list.take(i);
            trace!(%id, x = bin.x, y = bin.y, maxw = bin.maxw, maxh = bin.maxh, "reuse free bin");
            bin.id = id.clone();
            bin.w = w;
            bin.h = h;
            bin.maxw = bin.maxw.max(w);
            bin.maxh = bin.maxh.max(h);
            return Some(self.commit(bin));
        }

        let mut best: Option<(usize, u32)> = None;
        let mut exact = None;
        for (i, shelf) in self.shelves.iter().enumerate() {
            if h == shelf.height() && w <= shelf.free() {
                exact = Some(i);
                break;
            }
            if h > shelf.height() || w > shelf.free() {
                continue;
            }
            let waste = shelf.height() - h;
            if best.is_none_or(|(_, best_waste)| waste < best_waste) {
                best = Some((i, waste));
            }
        }
        if let Some(i) = exact.or(best.map(|(i, _)| i)) {
            return self.alloc_on_shelf(i, w, h, id);
        }

        let y = self.shelves_height();
        if h <= self.height.saturating_sub(y) && w <= self.width {
            trace!(y, height = h, "new shelf");
            self.shelves.push(Shelf::new(y, self.width, h));
            return self.alloc_on_shelf(self.shelves.len() - 1, w, h, id);
        }
        None
    }

    fn alloc_on_shelf(&mut self, index: usize, w: u32, h: u32, id: &BinId) -> Option<Bin> {
        let bin = self.shelves[index].alloc(w, h, id.clone())?;
        trace!(%id, x = bin.x, y = bin.y, w, h, "placed on shelf");
        Some(self.commit(bin))
    }

    /// Takes the first reference on a freshly placed bin and indexes it.
    fn commit(&mut self, mut bin: Bin) -> Bin {
        bin.refcount = 1;
        *self.height_histogram.entry(bin.h).or_insert(0) += 1;
        self.index.insert(bin.id.clone(), bin.clone());
        bin
    }

    /// Doubles whichever side is smaller (width first on a tie), and any side the
    /// request does not fit. Returns `false` if the new size would overflow.
    fn grow(&mut self, w: u32, h: u32) -> bool {
        let mut width = self.width;
        let mut height = self.height;
        if self.width <= self.height || w > self.width {
            match w.max(self.width).checked_mul(2) {
                Some(v) => width = v,
                None => return false,
            }
        }
        if self.height < self.width || h > self.height {
            match h.max(self.height).checked_mul(2) {
                Some(v) => height = v,
                None => return false,
            }
        }
        debug!(
            from_w = self.width,
            from_h = self.height,
            to_w = width,
            to_h = height,
            "grow atlas"
        );
        self.resize(width, height)
    }
}
