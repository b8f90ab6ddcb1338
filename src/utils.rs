use wasm_bindgen::prelude::*;
use std::{
    collections::VecDeque,
    future::Future,
    sync::{Arc, Mutex, atomic::{AtomicBool, Ordering}},
};


#[cfg(target_arch = "wasm32")]
#[macro_export]
macro_rules! log {
    ( $( $t:tt )* ) => {
        web_sys::console::log_1(&format!( $( $t )* ).into())
    }
}

// host-side builds (unit tests) have no browser console
#[cfg(not(target_arch = "wasm32"))]
#[macro_export]
macro_rules! log {
    ( $( $t:tt )* ) => {
        eprintln!( $( $t )* )
    }
}


#[wasm_bindgen(module = "/helper.js")]
extern "C" {
    pub fn get_canvas_width() -> u32;
    pub fn get_canvas_height() -> u32;
    pub fn get_time_milliseconds() -> f64;
    pub fn get_query_param(name: &str) -> String;
}


/// Enable better error messages if our code ever panics
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}


/// Sets error flag and message for an egui window
#[inline(always)]
pub fn set_error_for_egui(flag: &Arc<AtomicBool>, msg: &Arc<Mutex<String>>, s: String) {
    flag.store(true, Ordering::Relaxed);
    if let Ok(mut mutex) = msg.lock() {
        if !mutex.is_empty() {
            *mutex += "\n";
        }
        *mutex += s.as_str();
    }
}


/// Executes an asyncs Future on the current thread
#[inline(always)]
pub fn execute_future<F: Future<Output = ()> + 'static>(f: F) {
    wasm_bindgen_futures::spawn_local(f);
}


/// Moving average over the last `window` samples
pub struct IncrementalMA {
    window: usize,
    samples: VecDeque<f64>,
    sum: f64,
}
impl IncrementalMA {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
            sum: 0.0,
        }
    }

    /// Adds a sample and returns the current average
    pub fn add(&mut self, x: f64) -> f64 {
        if !x.is_finite() {
            return self.average();
        }
        if self.samples.len() == self.window {
            if let Some(old) = self.samples.pop_front() {
                self.sum -= old;
            }
        }
        self.samples.push_back(x);
        self.sum += x;
        self.average()
    }

    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.sum / self.samples.len() as f64
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_average_drops_old_samples() {
        let mut ma = IncrementalMA::new(3);
        assert_eq!(ma.average(), 0.0);
        assert_eq!(ma.add(3.0), 3.0);
        assert_eq!(ma.add(6.0), 4.5);
        assert_eq!(ma.add(9.0), 6.0);
        assert_eq!(ma.add(12.0), 9.0);
    }

    #[test]
    fn moving_average_ignores_infinite_samples() {
        let mut ma = IncrementalMA::new(10);
        ma.add(60.0);
        assert_eq!(ma.add(f64::INFINITY), 60.0);
    }

    #[test]
    fn error_messages_accumulate() {
        let flag = Arc::new(AtomicBool::new(false));
        let msg = Arc::new(Mutex::new(String::new()));
        set_error_for_egui(&flag, &msg, "first".to_string());
        set_error_for_egui(&flag, &msg, "second".to_string());
        assert!(flag.load(Ordering::Relaxed));
        assert_eq!(*msg.lock().unwrap(), "first\nsecond");
    }
}
