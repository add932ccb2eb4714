//! Solution history for every emitter.
//!
//! Entries are indexed by `(emitter, time, slot, component)` where `time`
//! runs over `[-window, num_steps]`. Negative times are the pre-seeded past
//! that the retarded interactions read before stepping begins; `time = 0` is
//! the last seeded step. Slot [`History::VALUE`] holds the solution and slot
//! [`History::DERIVATIVE`] its time derivative.
//!
//! Storage is a single `Array4` with an explicit base offset, so every
//! access is bounds-checked against the allocated extent.
//!
//! Every history carries a process-unique [`id`](History::id) and a write
//! stamp per time index ([`revision`](History::revision)). Consumers that
//! cache work derived from a time index key it on both, so a different
//! history or a rewritten entry is never mistaken for the cached one.

use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::{s, Array1, Array4, ArrayView1, ArrayView2, ArrayViewMut1};
use num_complex::Complex64;

static NEXT_HISTORY_ID: AtomicU64 = AtomicU64::new(0);

/// Ground-state population component of a two-level density matrix.
pub const RHO_00: usize = 0;
/// Coherence component of a two-level density matrix.
pub const RHO_01: usize = 1;

#[derive(Debug)]
pub struct History {
    data: Array4<Complex64>,
    window: usize,
    id: u64,
    /// Last value handed out to `stamps`.
    clock: u64,
    /// Write stamp of every stored time index.
    stamps: Vec<u64>,
}

/// A clone is a separate buffer and gets its own identity.
impl Clone for History {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            window: self.window,
            id: NEXT_HISTORY_ID.fetch_add(1, Ordering::Relaxed),
            clock: self.clock,
            stamps: self.stamps.clone(),
        }
    }
}

impl History {
    pub const VALUE: usize = 0;
    pub const DERIVATIVE: usize = 1;

    /// History for two-component density-matrix solutions.
    pub fn new(num_emitters: usize, window: usize, num_steps: usize) -> Self {
        Self::with_components(num_emitters, window, num_steps, 2)
    }

    /// History with an arbitrary number of components per solution vector.
    pub fn with_components(
        num_emitters: usize,
        window: usize,
        num_steps: usize,
        num_components: usize,
    ) -> Self {
        let num_t = window + num_steps + 1;
        Self {
            data: Array4::zeros((num_emitters, num_t, 2, num_components)),
            window,
            id: NEXT_HISTORY_ID.fetch_add(1, Ordering::Relaxed),
            clock: 0,
            stamps: vec![0; num_t],
        }
    }

    pub fn num_emitters(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn num_components(&self) -> usize {
        self.data.shape()[3]
    }

    /// Depth of the pre-seeded past.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Earliest valid time index (`-window`).
    pub fn first_index(&self) -> i64 {
        -(self.window as i64)
    }

    /// Latest valid time index (`num_steps`).
    pub fn last_index(&self) -> i64 {
        self.data.shape()[1] as i64 - 1 - self.window as i64
    }

    /// Number of stored time indices.
    pub fn time_extent(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn contains(&self, time: i64) -> bool {
        (self.first_index()..=self.last_index()).contains(&time)
    }

    /// Process-unique identity of this buffer.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Write stamp of time index `time`. It changes whenever any slot of any
    /// emitter at `time` is handed out for writing.
    pub fn revision(&self, time: i64) -> u64 {
        self.stamps[self.offset(time)]
    }

    fn touch(&mut self, t: usize) {
        self.clock += 1;
        self.stamps[t] = self.clock;
    }

    #[inline]
    fn offset(&self, time: i64) -> usize {
        assert!(
            self.contains(time),
            "time index {} outside history [{}, {}]",
            time,
            self.first_index(),
            self.last_index()
        );
        (time + self.window as i64) as usize
    }

    /// Solution or derivative vector of one emitter at one time.
    pub fn get(&self, emitter: usize, time: i64, slot: usize) -> ArrayView1<'_, Complex64> {
        let t = self.offset(time);
        self.data.slice(s![emitter, t, slot, ..])
    }

    pub fn get_mut(&mut self, emitter: usize, time: i64, slot: usize) -> ArrayViewMut1<'_, Complex64> {
        let t = self.offset(time);
        self.touch(t);
        self.data.slice_mut(s![emitter, t, slot, ..])
    }

    /// Both slots of one emitter at one time, shaped `(slot, component)`.
    pub fn entry(&self, emitter: usize, time: i64) -> ArrayView2<'_, Complex64> {
        let t = self.offset(time);
        self.data.slice(s![emitter, t, .., ..])
    }

    /// Write `value` into a slot.
    pub fn set(&mut self, emitter: usize, time: i64, slot: usize, value: &Array1<Complex64>) {
        self.get_mut(emitter, time, slot).assign(value);
    }

    /// Set the value slot of every emitter at every time to `value`, and the
    /// derivative slot to zero.
    pub fn fill(&mut self, value: &Array1<Complex64>) {
        let num_t = self.time_extent();
        for t in 0..num_t {
            self.touch(t);
        }
        for e in 0..self.num_emitters() {
            for t in 0..num_t {
                self.data
                    .slice_mut(s![e, t, Self::VALUE, ..])
                    .assign(value);
                self.data
                    .slice_mut(s![e, t, Self::DERIVATIVE, ..])
                    .fill(Complex64::new(0.0, 0.0));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_index_range() {
        let h = History::new(3, 4, 10);
        assert_eq!(h.first_index(), -4);
        assert_eq!(h.last_index(), 10);
        assert_eq!(h.time_extent(), 15);
        assert!(h.contains(-4) && h.contains(10));
        assert!(!h.contains(-5) && !h.contains(11));
    }

    #[test]
    fn test_set_and_get() {
        let mut h = History::new(2, 2, 3);
        let v = array![Complex64::new(1.0, 0.0), Complex64::new(0.0, 2.0)];
        h.set(1, -2, History::VALUE, &v);
        assert_eq!(h.get(1, -2, History::VALUE), v.view());
        assert_eq!(h.get(0, -2, History::VALUE)[RHO_01], Complex64::new(0.0, 0.0));
        assert_eq!(h.entry(1, -2)[[History::VALUE, RHO_01]], Complex64::new(0.0, 2.0));
    }

    #[test]
    fn test_fill_clears_derivatives() {
        let mut h = History::with_components(2, 1, 2, 3);
        h.get_mut(0, 0, History::DERIVATIVE)[2] = Complex64::new(5.0, 0.0);
        h.fill(&array![Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0), Complex64::new(0.5, 0.0)]);
        assert_eq!(h.get(1, 2, History::VALUE)[2], Complex64::new(0.5, 0.0));
        assert_eq!(h.get(0, 0, History::DERIVATIVE)[2], Complex64::new(0.0, 0.0));
    }

    #[test]
    fn test_writes_bump_only_their_time_index() {
        let mut h = History::new(2, 2, 4);
        let before: Vec<u64> = (-2..=4).map(|t| h.revision(t)).collect();

        h.set(1, 3, History::DERIVATIVE, &array![Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)]);
        let after_set = h.revision(3);
        assert_ne!(after_set, before[5]);
        for t in (-2..=4).filter(|&t| t != 3) {
            assert_eq!(h.revision(t), before[(t + 2) as usize]);
        }

        h.get_mut(0, 3, History::VALUE)[RHO_01] = Complex64::new(2.0, 0.0);
        assert_ne!(h.revision(3), after_set);

        let written = h.revision(3);
        let _ = h.get(0, 3, History::VALUE);
        let _ = h.entry(1, 3);
        assert_eq!(h.revision(3), written);

        let stamp = h.revision(-2);
        h.fill(&array![Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)]);
        assert_ne!(h.revision(-2), stamp);
    }

    #[test]
    fn test_clone_has_its_own_identity() {
        let h = History::new(1, 1, 1);
        let other = History::new(1, 1, 1);
        let copy = h.clone();
        assert_ne!(h.id(), other.id());
        assert_ne!(h.id(), copy.id());
        assert_eq!(copy.get(0, 1, History::VALUE), h.get(0, 1, History::VALUE));
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_panics() {
        let h = History::new(1, 2, 2);
        let _ = h.get(0, -3, History::VALUE);
    }
}
