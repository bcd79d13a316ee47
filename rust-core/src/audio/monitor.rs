//! Lock-free monitor queue for processed frames
//!
//! Bounded single-producer/single-consumer queue of whole frames. The audio
//! callback pushes without blocking and drops the frame when the queue is
//! full; a visualization consumer drains it at its own pace.

use ringbuf::{HeapConsumer, HeapProducer, HeapRb};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Create a monitor queue holding up to `capacity` frames of `frame_size` samples
pub fn monitor_queue(capacity: usize, frame_size: usize) -> (MonitorProducer, MonitorConsumer) {
    let capacity = capacity.max(1);
    let frame_size = frame_size.max(1);

    let rb = HeapRb::<f64>::new(capacity * frame_size);
    let (producer, consumer) = rb.split();
    let dropped = Arc::new(AtomicU64::new(0));

    (
        MonitorProducer {
            producer,
            frame_size,
            dropped: Arc::clone(&dropped),
        },
        MonitorConsumer {
            consumer,
            frame_size,
            capacity,
            dropped,
        },
    )
}

/// Producer end (audio callback)
pub struct MonitorProducer {
    producer: HeapProducer<f64>,
    frame_size: usize,
    dropped: Arc<AtomicU64>,
}

impl MonitorProducer {
    /// Push one frame without blocking
    ///
    /// # Returns
    /// `false` if the frame was dropped (queue full or wrong frame length)
    pub fn try_push(&mut self, frame: &[f64]) -> bool {
        if frame.len() != self.frame_size || self.producer.free_len() < self.frame_size {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        self.producer.push_slice(frame);
        true
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }
}

/// Consumer end (visualization)
pub struct MonitorConsumer {
    consumer: HeapConsumer<f64>,
    frame_size: usize,
    capacity: usize,
    dropped: Arc<AtomicU64>,
}

impl MonitorConsumer {
    /// Pop the oldest frame into `frame` (must be `frame_size` long)
    ///
    /// # Returns
    /// `false` if no complete frame is queued
    pub fn pop_into(&mut self, frame: &mut [f64]) -> bool {
        if frame.len() != self.frame_size || self.consumer.len() < self.frame_size {
            return false;
        }
        self.consumer.pop_slice(frame) == self.frame_size
    }

    /// Pop the oldest frame
    pub fn pop(&mut self) -> Option<Vec<f64>> {
        let mut frame = vec![0.0; self.frame_size];
        self.pop_into(&mut frame).then_some(frame)
    }

    /// Drain the queue, keeping only the newest frame
    pub fn pop_latest(&mut self) -> Option<Vec<f64>> {
        let mut latest = None;
        while let Some(frame) = self.pop() {
            latest = Some(frame);
        }
        latest
    }

    /// Discard everything queued
    pub fn clear(&mut self) {
        let mut frame = vec![0.0; self.frame_size];
        while self.pop_into(&mut frame) {}
    }

    /// Number of complete frames queued
    pub fn len(&self) -> usize {
        self.consumer.len() / self.frame_size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity in frames
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Frames dropped by the producer so far
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_order() {
        let (mut producer, mut consumer) = monitor_queue(4, 3);

        assert!(producer.try_push(&[1.0, 2.0, 3.0]));
        assert!(producer.try_push(&[4.0, 5.0, 6.0]));
        assert_eq!(consumer.len(), 2);

        assert_eq!(consumer.pop(), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(consumer.pop(), Some(vec![4.0, 5.0, 6.0]));
        assert_eq!(consumer.pop(), None);
    }

    #[test]
    fn test_full_queue_drops_newest() {
        let (mut producer, mut consumer) = monitor_queue(2, 2);

        assert!(producer.try_push(&[1.0, 1.0]));
        assert!(producer.try_push(&[2.0, 2.0]));
        assert!(!producer.try_push(&[3.0, 3.0]));

        assert_eq!(consumer.len(), 2);
        assert!(consumer.len() <= consumer.capacity());
        assert_eq!(consumer.dropped(), 1);
        assert_eq!(consumer.pop(), Some(vec![1.0, 1.0]));

        // Space again after a pop
        assert!(producer.try_push(&[4.0, 4.0]));
        assert_eq!(consumer.pop_latest(), Some(vec![4.0, 4.0]));
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_wrong_frame_length_rejected() {
        let (mut producer, consumer) = monitor_queue(2, 4);
        assert!(!producer.try_push(&[1.0, 2.0]));
        assert!(consumer.is_empty());
        assert_eq!(consumer.dropped(), 1);
    }

    #[test]
    fn test_cross_thread_frames_stay_whole() {
        let (mut producer, mut consumer) = monitor_queue(10, 64);

        let handle = std::thread::spawn(move || {
            for i in 0..200 {
                let frame = vec![i as f64; 64];
                producer.try_push(&frame);
            }
        });
        handle.join().unwrap();

        let mut last = -1.0;
        while let Some(frame) = consumer.pop() {
            assert!(frame.iter().all(|&x| x == frame[0]));
            assert!(frame[0] > last);
            last = frame[0];
        }
        assert_eq!(consumer.dropped(), 190);
    }
}
