// Memoized image probing. Layout reruns after mutations, so the same
// sources are asked for again and again; each one is probed once.

use crate::layout::ImageProbe;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

pub struct CachedProbe {
    inner: Box<dyn ImageProbe>,
    widths: RefCell<HashMap<String, Option<u32>>>,
    misses: Cell<usize>,
}

impl CachedProbe {
    pub fn new(inner: Box<dyn ImageProbe>) -> Self {
        Self {
            inner,
            widths: RefCell::new(HashMap::new()),
            misses: Cell::new(0),
        }
    }

    /// Number of lookups that reached the wrapped probe.
    pub fn misses(&self) -> usize {
        self.misses.get()
    }

    pub fn len(&self) -> usize {
        self.widths.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.borrow().is_empty()
    }
}

impl ImageProbe for CachedProbe {
    fn intrinsic_width(&self, src: &str) -> Option<u32> {
        if let Some(&width) = self.widths.borrow().get(src) {
            return width;
        }
        self.misses.set(self.misses.get() + 1);
        let width = self.inner.intrinsic_width(src);
        // Unknown sources are cached too; a missing file stays missing.
        self.widths.borrow_mut().insert(src.to_string(), width);
        width
    }
}
