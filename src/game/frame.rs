//! Frame Throttle
//!
//! Lets per-tick code run something every N seconds without keeping its own
//! timer. State lives on the entity, keyed by the calling source location and
//! the requested period, so the same `every(0.5, ..)` line keeps hitting the
//! same timer tick after tick.

use std::collections::HashMap;
use std::panic::Location;

/// Accumulated time toward one periodic callback
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub accumulated: f32,
    pub period: f32,
}

impl Frame {
    /// A new frame starts with this tick's delta and never fires on creation.
    pub fn new(period: f32, delta: f32) -> Self {
        Self {
            accumulated: delta,
            period,
        }
    }

    /// Add `delta`. Returns true (and resets) when the period has elapsed.
    pub fn advance(&mut self, delta: f32) -> bool {
        self.accumulated += delta;
        if self.accumulated >= self.period {
            self.accumulated = 0.0;
            true
        } else {
            false
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct FrameKey {
    file: &'static str,
    line: u32,
    column: u32,
    period_bits: u32,
}

impl FrameKey {
    fn new(location: &'static Location<'static>, period: f32) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
            period_bits: period.to_bits(),
        }
    }
}

/// Per-entity frame timers
#[derive(Debug, Default)]
pub struct FrameStore {
    frames: HashMap<FrameKey, Frame>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn tick(&mut self, location: &'static Location<'static>, period: f32, delta: f32) -> bool {
        let key = FrameKey::new(location, period);
        match self.frames.get_mut(&key) {
            Some(frame) => frame.advance(delta),
            None => {
                self.frames.insert(key, Frame::new(period, delta));
                false
            }
        }
    }
}

/// Handed to update hooks for the current tick
pub struct FrameHelper<'a> {
    store: &'a mut FrameStore,
    delta: f32,
}

impl<'a> FrameHelper<'a> {
    pub fn new(store: &'a mut FrameStore, delta: f32) -> Self {
        Self { store, delta }
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Run `callback` once every `period` seconds. Returns whether it ran.
    #[track_caller]
    pub fn every(&mut self, period: f32, callback: impl FnOnce()) -> bool {
        let fired = self.store.tick(Location::caller(), period, self.delta);
        if fired {
            callback();
        }
        fired
    }
}
