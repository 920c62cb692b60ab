use std::sync::atomic::{AtomicU64, Ordering};

/// An `f64` stored as its raw bit pattern inside an `AtomicU64`.
///
/// Additions go through a compare-and-swap loop on the bits, so concurrent
/// `fetch_add` calls never lose an update.
#[derive(Debug, Default)]
pub struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    pub fn store(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    /// Adds `delta` and returns the new value.
    pub fn fetch_add(&self, delta: f64) -> f64 {
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let next = f64::from_bits(current) + delta;
            match self.bits.compare_exchange_weak(
                current,
                next.to_bits(),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(observed) => current = observed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn store_then_load() {
        let value = AtomicF64::new(1.5);
        assert_eq!(value.load(), 1.5);
        value.store(-2.25);
        assert_eq!(value.load(), -2.25);
    }

    #[test]
    fn concurrent_adds_are_not_lost() {
        let value = AtomicF64::default();
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..10_000 {
                        value.fetch_add(0.5);
                    }
                });
            }
        });
        // 0.5 steps stay exactly representable at this magnitude
        assert_eq!(value.load(), 40_000.0);
    }
}
