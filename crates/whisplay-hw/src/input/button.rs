//! Push-button edge watcher and callback dispatch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::debounce::{ButtonEvent, Debouncer, Polarity};
use crate::Result;

/// A button line that reports level changes.
pub trait EdgeSource: Send + 'static {
    /// Waits up to `timeout` for an edge and returns the level after it, or
    /// `None` if the line stayed quiet.
    fn wait_edge(&mut self, timeout: Duration) -> Result<Option<bool>>;

    /// Reads the live line level.
    fn is_high(&mut self) -> Result<bool>;
}

type Callback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Handlers {
    press: Option<Callback>,
    release: Option<Callback>,
}

struct Shared {
    handlers: Mutex<Handlers>,
    pressed: AtomicBool,
    running: AtomicBool,
}

impl Shared {
    fn dispatch(&self, event: ButtonEvent) {
        self.pressed.store(event == ButtonEvent::Pressed, Ordering::SeqCst);
        debug!("Button {:?}", event);

        // Run the callback outside the lock so it may re-register handlers.
        let callback = {
            let handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
            match event {
                ButtonEvent::Pressed => handlers.press.clone(),
                ButtonEvent::Released => handlers.release.clone(),
            }
        };
        if let Some(callback) = callback {
            callback();
        }
    }
}

/// Debounced push-button with press/release callbacks.
///
/// Edges are watched on a dedicated thread; callbacks run on that thread.
pub struct Button {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Button {
    /// Starts watching `source`.
    pub fn spawn<E: EdgeSource>(
        mut source: E,
        polarity: Polarity,
        debounce: Duration,
    ) -> Result<Self> {
        let pressed = polarity.is_pressed(source.is_high()?);
        let shared = Arc::new(Shared {
            handlers: Mutex::new(Handlers::default()),
            pressed: AtomicBool::new(pressed),
            running: AtomicBool::new(true),
        });

        let debouncer = Debouncer::new(debounce, pressed);
        let worker_shared = shared.clone();
        let worker = thread::Builder::new()
            .name("whisplay-button".to_string())
            .spawn(move || watch(source, polarity, debouncer, worker_shared))?;

        info!("Button watcher started ({:?}, {:?} debounce)", polarity, debounce);
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Registers the press callback, replacing any previous one.
    pub fn on_press<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.handlers().press = Some(Arc::new(callback));
    }

    /// Registers the release callback, replacing any previous one.
    pub fn on_release<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.handlers().release = Some(Arc::new(callback));
    }

    /// Removes both callbacks.
    pub fn clear_callbacks(&self) {
        *self.handlers() = Handlers::default();
    }

    /// Debounced pressed state.
    pub fn is_pressed(&self) -> bool {
        self.shared.pressed.load(Ordering::SeqCst)
    }

    /// Stops the watcher thread and drops the callbacks.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Button watcher panicked");
            }
        }
        self.clear_callbacks();
    }

    fn handlers(&self) -> std::sync::MutexGuard<'_, Handlers> {
        self.shared
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Button {
    fn drop(&mut self) {
        self.stop();
    }
}

fn watch<E: EdgeSource>(
    mut source: E,
    polarity: Polarity,
    mut debouncer: Debouncer,
    shared: Arc<Shared>,
) {
    let origin = Instant::now();
    // Poll at the debounce interval so a quiet line settles within two windows.
    let poll = debouncer.window().max(Duration::from_millis(1));

    while shared.running.load(Ordering::SeqCst) {
        let event = match source.wait_edge(poll) {
            Ok(Some(high)) => debouncer.on_edge(origin.elapsed(), polarity.is_pressed(high)),
            Ok(None) => match source.is_high() {
                Ok(high) => debouncer.settle(origin.elapsed(), polarity.is_pressed(high)),
                Err(e) => {
                    warn!("Button level read failed: {}", e);
                    None
                }
            },
            Err(e) => {
                warn!("Button edge read failed: {}; input disabled", e);
                break;
            }
        };
        if let Some(event) = event {
            shared.dispatch(event);
        }
    }
    debug!("Button watcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::mock_button;
    use std::sync::atomic::AtomicUsize;

    fn counters(button: &Button) -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let presses = Arc::new(AtomicUsize::new(0));
        let releases = Arc::new(AtomicUsize::new(0));
        let p = presses.clone();
        button.on_press(move || {
            p.fetch_add(1, Ordering::SeqCst);
        });
        let r = releases.clone();
        button.on_release(move || {
            r.fetch_add(1, Ordering::SeqCst);
        });
        (presses, releases)
    }

    #[test]
    fn test_press_and_release_callbacks() {
        let (source, line) = mock_button(false);
        let button = Button::spawn(source, Polarity::ActiveHigh, Duration::from_millis(20)).unwrap();
        let (presses, releases) = counters(&button);

        line.set(true);
        thread::sleep(Duration::from_millis(80));
        assert!(button.is_pressed());
        line.set(false);
        thread::sleep(Duration::from_millis(80));

        assert_eq!(presses.load(Ordering::SeqCst), 1);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert!(!button.is_pressed());
    }

    #[test]
    fn test_active_low_polarity() {
        let (source, line) = mock_button(true);
        let button = Button::spawn(source, Polarity::ActiveLow, Duration::from_millis(20)).unwrap();
        assert!(!button.is_pressed());
        let (presses, _) = counters(&button);

        line.set(false);
        thread::sleep(Duration::from_millis(80));
        assert_eq!(presses.load(Ordering::SeqCst), 1);
        assert!(button.is_pressed());
    }

    #[test]
    fn test_fast_tap_collapses() {
        let (source, line) = mock_button(false);
        let button = Button::spawn(source, Polarity::ActiveHigh, Duration::from_millis(50)).unwrap();
        let (presses, releases) = counters(&button);

        line.set(true);
        line.set(false);
        line.set(true);
        line.set(false);
        thread::sleep(Duration::from_millis(300));

        assert_eq!(presses.load(Ordering::SeqCst), 1);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert!(!button.is_pressed());
    }

    #[test]
    fn test_missing_callbacks_are_noops() {
        let (source, line) = mock_button(false);
        let mut button =
            Button::spawn(source, Polarity::ActiveHigh, Duration::from_millis(10)).unwrap();
        line.set(true);
        thread::sleep(Duration::from_millis(50));
        assert!(button.is_pressed());
        button.stop();
    }

    #[test]
    fn test_callback_replacement() {
        let (source, line) = mock_button(false);
        let button = Button::spawn(source, Polarity::ActiveHigh, Duration::from_millis(10)).unwrap();
        let (first, _) = counters(&button);
        let second = Arc::new(AtomicUsize::new(0));
        let s = second.clone();
        button.on_press(move || {
            s.fetch_add(1, Ordering::SeqCst);
        });

        line.set(true);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
