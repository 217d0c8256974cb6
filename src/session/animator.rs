use std::{
    sync::mpsc::{self, RecvTimeoutError, Sender},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, bail, Result};
use serde::Serialize;

/// One frame of the pulsing user-location marker: a filled circle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerStyle {
    pub radius: u32,
    pub fill: &'static str,
    pub stroke: &'static str,
    pub stroke_width: u32,
}

impl MarkerStyle {
    pub fn circle(radius: u32) -> Self {
        Self { radius, fill: "white", stroke: "red", stroke_width: 1 }
    }
}

/// Styles with radii from `max_radius` down to `min_radius`, inclusive.
pub fn generate_location_styles(max_radius: u32, min_radius: u32) -> Vec<MarkerStyle> {
    (min_radius..=max_radius).rev().map(MarkerStyle::circle).collect()
}

/// Cycles through marker styles. The last style is never shown:
/// the index wraps modulo `len - 1`.
#[derive(Debug, Clone)]
pub struct MarkerAnimator {
    styles: Vec<MarkerStyle>,
    idx: usize,
}

impl MarkerAnimator {
    pub fn new(styles: Vec<MarkerStyle>) -> Result<Self> {
        if styles.len() < 2 {
            bail!("marker animation needs at least 2 styles, got {}", styles.len());
        }
        Ok(Self { styles, idx: 0 })
    }

    #[inline] pub fn index(&self) -> usize { self.idx }

    #[inline] pub fn current(&self) -> &MarkerStyle { &self.styles[self.idx] }

    #[inline] pub fn styles(&self) -> &[MarkerStyle] { &self.styles }

    /// Number of steps before the sequence repeats.
    #[inline] pub fn cycle_len(&self) -> usize { self.styles.len() - 1 }

    /// Advance one frame and return the style to apply.
    pub fn step(&mut self) -> &MarkerStyle {
        self.idx = (self.idx + 1) % self.cycle_len();
        &self.styles[self.idx]
    }

    /// Run the animation on a background thread, calling `on_step` every `period`.
    /// The returned handle stops the thread when stopped or dropped.
    pub fn spawn<F>(mut self, period: Duration, mut on_step: F) -> Result<AnimationHandle>
    where
        F: FnMut(&MarkerStyle) + Send + 'static,
    {
        if period.is_zero() {
            bail!("animation period must be positive");
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread = thread::Builder::new()
            .name("marker-animator".into())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => on_step(self.step()),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                self
            })
            .map_err(|e| anyhow!("failed to spawn animation thread: {e}"))?;

        tracing::debug!(?period, "marker animation started");
        Ok(AnimationHandle { stop_tx: Some(stop_tx), thread: Some(thread) })
    }
}

/// Owner of a running marker animation.
#[derive(Debug)]
pub struct AnimationHandle {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<MarkerAnimator>>,
}

impl AnimationHandle {
    #[inline]
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the animation and return the animator in its final state.
    pub fn stop(mut self) -> Result<MarkerAnimator> {
        self.shutdown()?.ok_or_else(|| anyhow!("animation already stopped"))
    }

    fn shutdown(&mut self) -> Result<Option<MarkerAnimator>> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(()); // The thread may already have exited.
        }
        let Some(thread) = self.thread.take() else { return Ok(None) };
        let animator = thread.join().map_err(|_| anyhow!("animation thread panicked"))?;
        tracing::debug!(index = animator.index(), "marker animation stopped");
        Ok(Some(animator))
    }
}

impl Drop for AnimationHandle {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("{e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn default_styles_span_twelve_to_three() {
        let styles = generate_location_styles(12, 3);
        let radii: Vec<u32> = styles.iter().map(|s| s.radius).collect();
        assert_eq!(radii, vec![12, 11, 10, 9, 8, 7, 6, 5, 4, 3]);
        assert!(styles.iter().all(|s| s.fill == "white" && s.stroke == "red" && s.stroke_width == 1));
    }

    #[test]
    fn rejects_short_sequences() {
        assert!(MarkerAnimator::new(Vec::new()).is_err());
        assert!(MarkerAnimator::new(generate_location_styles(3, 3)).is_err());
        assert!(MarkerAnimator::new(generate_location_styles(4, 3)).is_ok());
    }

    #[test]
    fn cycles_with_period_len_minus_one() {
        for n in 2..=12u32 {
            let mut animator = MarkerAnimator::new(generate_location_styles(n, 1)).unwrap();
            let len = animator.styles().len();
            let period = len - 1;

            let first: Vec<usize> = (0..period).map(|_| { animator.step(); animator.index() }).collect();
            let second: Vec<usize> = (0..period).map(|_| { animator.step(); animator.index() }).collect();
            assert_eq!(first, second, "n = {n}");
            assert!(first.iter().all(|&i| i < len - 1), "n = {n}");
            assert_eq!(*first.last().unwrap(), 0, "n = {n}");
        }
    }

    #[test]
    fn two_styles_stay_on_first() {
        let mut animator = MarkerAnimator::new(generate_location_styles(2, 1)).unwrap();
        for _ in 0..5 {
            assert_eq!(animator.step().radius, 2);
        }
    }

    #[test]
    fn step_returns_applied_style() {
        let mut animator = MarkerAnimator::new(generate_location_styles(12, 3)).unwrap();
        assert_eq!(animator.current().radius, 12);
        assert_eq!(animator.step().radius, 11);
        assert_eq!(animator.step().radius, 10);
    }

    #[test]
    fn spawned_animation_stops() {
        let animator = MarkerAnimator::new(generate_location_styles(12, 3)).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let handle = animator
            .spawn(Duration::from_millis(5), move |style| sink.lock().unwrap().push(style.radius))
            .unwrap();
        std::thread::sleep(Duration::from_millis(60));
        assert!(handle.is_running());

        let animator = handle.stop().unwrap();
        let count = seen.lock().unwrap().len();
        assert!(count > 0);

        // No more steps after stop.
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(seen.lock().unwrap().len(), count);
        assert_eq!(animator.index(), count % animator.cycle_len());
    }

    #[test]
    fn dropping_handle_stops_animation() {
        let animator = MarkerAnimator::new(generate_location_styles(12, 3)).unwrap();
        let seen = Arc::new(Mutex::new(0usize));
        let sink = seen.clone();

        let handle = animator
            .spawn(Duration::from_millis(5), move |_| *sink.lock().unwrap() += 1)
            .unwrap();
        std::thread::sleep(Duration::from_millis(40));
        drop(handle);

        let count = *seen.lock().unwrap();
        assert!(count > 0);
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(*seen.lock().unwrap(), count);
        // The closure, and with it the sink, went away with the thread.
        assert_eq!(Arc::strong_count(&seen), 1);
    }

    #[test]
    fn zero_period_is_rejected() {
        let animator = MarkerAnimator::new(generate_location_styles(12, 3)).unwrap();
        assert!(animator.spawn(Duration::ZERO, |_| {}).is_err());
    }
}
