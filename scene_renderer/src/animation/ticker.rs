// animation/ticker.rs - Shared frame clock with removable listeners

use std::time::Duration;

use linked_hash_map::LinkedHashMap;

/// Handle returned by [`Ticker::add`], used to unregister the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// One frame of the shared clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickEvent {
    /// Seconds since the ticker started
    pub time: f64,
    /// Seconds since the previous frame
    pub delta: f64,
    pub frame: u64,
}

impl TickEvent {
    /// `delta` as a `Duration`; a delta too large to represent counts as no time
    pub fn delta_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.delta).unwrap_or_default()
    }
}

/// Returns false to unregister itself after the current frame
type TickFn = Box<dyn FnMut(&TickEvent) -> bool>;

/// Frame clock driving every per-frame animation on the page.
///
/// Listeners run in registration order. The ticker does not own a clock;
/// the host feeds it timestamps through [`Ticker::tick`].
pub struct Ticker {
    listeners: LinkedHashMap<ListenerId, TickFn>,
    next_id: u64,
    last_time: Option<f64>,
    frame: u64,
}

impl Ticker {
    pub fn new() -> Self {
        Self {
            listeners: LinkedHashMap::new(),
            next_id: 0,
            last_time: None,
            frame: 0,
        }
    }

    pub fn add<F>(&mut self, mut listener: F) -> ListenerId
    where
        F: FnMut(&TickEvent) + 'static,
    {
        self.add_until(move |event| {
            listener(event);
            true
        })
    }

    /// Register a listener that stays until it returns false
    pub fn add_until<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&TickEvent) -> bool + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.insert(id, Box::new(listener));
        id
    }

    /// Unregister a listener; returns false if it was already gone
    pub fn remove(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Dispatch one frame at `time` seconds. Time going backwards yields a
    /// zero delta rather than a negative one; non-finite times are dropped.
    pub fn tick(&mut self, time: f64) {
        if !time.is_finite() {
            log::warn!("Ignoring tick at non-finite time {}", time);
            return;
        }
        let delta = self.last_time.map_or(0.0, |last| (time - last).max(0.0));
        self.last_time = Some(time);

        let event = TickEvent {
            time,
            delta,
            frame: self.frame,
        };
        self.frame += 1;

        let mut finished = Vec::new();
        for (id, listener) in self.listeners.iter_mut() {
            if !listener(&event) {
                finished.push(*id);
            }
        }
        for id in finished {
            self.listeners.remove(&id);
        }
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}
