// page/events.rs - Window-level resize and pointer listeners

use linked_hash_map::LinkedHashMap;
use super::Viewport;

/// Pointer position in viewport (client) coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub client_x: f32,
    pub client_y: f32,
}

type ResizeFn = Box<dyn FnMut(&Viewport)>;
type PointerFn = Box<dyn FnMut(&PointerEvent, &Viewport)>;

/// `window.addEventListener` for the two events the effects consume
pub struct WindowEvents {
    resize: LinkedHashMap<u64, ResizeFn>,
    pointer_move: LinkedHashMap<u64, PointerFn>,
    next_id: u64,
}

/// Which listener list an id belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowListener {
    Resize(u64),
    PointerMove(u64),
}

impl WindowEvents {
    pub fn new() -> Self {
        Self {
            resize: LinkedHashMap::new(),
            pointer_move: LinkedHashMap::new(),
            next_id: 0,
        }
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn on_resize<F>(&mut self, listener: F) -> WindowListener
    where
        F: FnMut(&Viewport) + 'static,
    {
        let id = self.allocate();
        self.resize.insert(id, Box::new(listener));
        WindowListener::Resize(id)
    }

    pub fn on_pointer_move<F>(&mut self, listener: F) -> WindowListener
    where
        F: FnMut(&PointerEvent, &Viewport) + 'static,
    {
        let id = self.allocate();
        self.pointer_move.insert(id, Box::new(listener));
        WindowListener::PointerMove(id)
    }

    pub fn remove(&mut self, listener: WindowListener) -> bool {
        match listener {
            WindowListener::Resize(id) => self.resize.remove(&id).is_some(),
            WindowListener::PointerMove(id) => self.pointer_move.remove(&id).is_some(),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.resize.len() + self.pointer_move.len()
    }

    pub fn dispatch_resize(&mut self, viewport: &Viewport) {
        for (_, listener) in self.resize.iter_mut() {
            listener(viewport);
        }
    }

    pub fn dispatch_pointer_move(&mut self, event: &PointerEvent, viewport: &Viewport) {
        for (_, listener) in self.pointer_move.iter_mut() {
            listener(event, viewport);
        }
    }
}

impl Default for WindowEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_dispatch_and_remove() {
        let mut events = WindowEvents::new();
        let resized = Rc::new(Cell::new(0.0f32));
        let moved = Rc::new(Cell::new(0.0f32));

        let r = resized.clone();
        let resize_id = events.on_resize(move |vp| r.set(vp.width));
        let m = moved.clone();
        let move_id = events.on_pointer_move(move |ev, _| m.set(ev.client_x));
        assert_eq!(events.listener_count(), 2);

        let vp = Viewport { width: 320.0, height: 200.0, scroll_y: 0.0 };
        events.dispatch_resize(&vp);
        events.dispatch_pointer_move(&PointerEvent { client_x: 12.0, client_y: 3.0 }, &vp);
        assert_eq!(resized.get(), 320.0);
        assert_eq!(moved.get(), 12.0);

        assert!(events.remove(resize_id));
        assert!(events.remove(move_id));
        assert!(!events.remove(move_id));
        assert_eq!(events.listener_count(), 0);
    }
}
