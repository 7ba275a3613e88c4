//! Metering snapshots and their lock-free publication
//!
//! The pipeline fills a [`MeteringSnapshot`] at every metering interval and
//! pushes it, together with any [`DiagnosticEvent`]s, through `rtrb`
//! single-producer/single-consumer ring buffers. The audio side never waits:
//! when a queue is full the newest item is dropped and a shared counter
//! increments.

use automaster_dynamics::MAX_BANDS;
use automaster_loudness::LUFS_FLOOR;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::classifier::MaterialClassification;

/// Default snapshot queue capacity (about 6 s of 100 ms snapshots)
pub const SNAPSHOT_QUEUE_CAPACITY: usize = 64;

/// Diagnostic queue capacity
pub const DIAGNOSTIC_QUEUE_CAPACITY: usize = 256;

/// Meter readings at the end of one metering interval
///
/// Loudness values read [`LUFS_FLOOR`] (negative infinity) until enough audio
/// has been measured; peaks read negative infinity for digital silence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeteringSnapshot {
    /// Integrated loudness of the input (LUFS)
    pub integrated_lufs: f64,
    /// Short-term (3 s) loudness of the input (LUFS)
    pub short_term_lufs: f64,
    /// Momentary (400 ms) loudness of the input (LUFS)
    pub momentary_lufs: f64,
    /// Running true peak of the input (dBTP)
    pub true_peak_dbtp: f64,
    /// Correlation between the first two channels over the interval
    pub phase_correlation: f64,
    /// Gain reduction per band (dB, <= 0); only the first `band_count` are used
    pub band_gain_reduction_db: [f64; MAX_BANDS],
    /// Number of active bands
    pub band_count: usize,
    /// Running true peak of the output (dBTP)
    pub output_true_peak_dbtp: f64,
    /// Loudness trim currently applied (dB)
    pub trim_db: f64,
    /// Limiter gain reduction (dB, <= 0)
    pub limiter_gain_reduction_db: f64,
    /// Loudness range of the input (LU)
    pub loudness_range_lu: f64,
    /// Latest material classification
    pub material: Option<MaterialClassification>,
    /// Non-finite input samples replaced with silence so far
    pub sanitized_samples: u64,
    /// Blocks that overran their real-time budget so far
    pub late_blocks: u64,
    /// Snapshots lost to a full queue so far
    pub dropped_snapshots: u64,
    /// Frames processed since construction or the last reset
    pub position_frames: u64,
}

impl MeteringSnapshot {
    /// Snapshot of a pipeline that has not processed anything
    pub fn empty(band_count: usize) -> Self {
        Self {
            integrated_lufs: LUFS_FLOOR,
            short_term_lufs: LUFS_FLOOR,
            momentary_lufs: LUFS_FLOOR,
            true_peak_dbtp: f64::NEG_INFINITY,
            phase_correlation: 1.0,
            band_gain_reduction_db: [0.0; MAX_BANDS],
            band_count: band_count.min(MAX_BANDS),
            output_true_peak_dbtp: f64::NEG_INFINITY,
            trim_db: 0.0,
            limiter_gain_reduction_db: 0.0,
            loudness_range_lu: 0.0,
            material: None,
            sanitized_samples: 0,
            late_blocks: 0,
            dropped_snapshots: 0,
            position_frames: 0,
        }
    }

    /// Gain reduction of the active bands
    pub fn band_gain_reductions(&self) -> &[f64] {
        &self.band_gain_reduction_db[..self.band_count]
    }
}

/// Abnormal condition observed on the audio thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticEvent {
    /// NaN or infinite input samples were replaced with silence
    NonFiniteSamples {
        /// Samples replaced in the block
        count: usize,
        /// Frame position of the block start
        position_frames: u64,
    },
    /// A block did not match the configured channel layout and was zeroed
    ChannelMismatch {
        /// Configured channel count
        expected: usize,
        /// Channel count (planar) or sample count (interleaved) received
        actual: usize,
    },
    /// Processing a block took longer than the audio it contained
    LateBlock {
        /// Time spent processing (microseconds)
        elapsed_us: u64,
        /// Duration of the block (microseconds)
        budget_us: u64,
    },
    /// A queued command could not be applied
    RejectedCommand {
        /// Command name
        command: &'static str,
    },
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFiniteSamples {
                count,
                position_frames,
            } => write!(
                f,
                "{} non-finite samples zeroed at frame {}",
                count, position_frames
            ),
            Self::ChannelMismatch { expected, actual } => write!(
                f,
                "block does not match {} channels (got {}); block zeroed",
                expected, actual
            ),
            Self::LateBlock {
                elapsed_us,
                budget_us,
            } => write!(
                f,
                "block took {} us against a {} us budget",
                elapsed_us, budget_us
            ),
            Self::RejectedCommand { command } => write!(f, "command {} was rejected", command),
        }
    }
}

/// Streaming correlation between two channels
///
/// Pearson correlation over each metering interval: 1.0 is mono compatible,
/// 0.0 uncorrelated, -1.0 cancels in mono. Silence or a constant channel
/// reads 1.0.
#[derive(Debug, Clone)]
pub struct PhaseCorrelation {
    sum_l: f64,
    sum_r: f64,
    sum_ll: f64,
    sum_rr: f64,
    sum_lr: f64,
    count: u64,
    last: f64,
}

impl Default for PhaseCorrelation {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseCorrelation {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self {
            sum_l: 0.0,
            sum_r: 0.0,
            sum_ll: 0.0,
            sum_rr: 0.0,
            sum_lr: 0.0,
            count: 0,
            last: 1.0,
        }
    }

    /// Add one pair of samples
    #[inline]
    pub fn push(&mut self, left: f64, right: f64) {
        self.sum_l += left;
        self.sum_r += right;
        self.sum_ll += left * left;
        self.sum_rr += right * right;
        self.sum_lr += left * right;
        self.count += 1;
    }

    /// Close the interval and return its correlation
    pub fn finish(&mut self) -> f64 {
        if self.count > 0 {
            let n = self.count as f64;
            let mean_l = self.sum_l / n;
            let mean_r = self.sum_r / n;
            let var_l = self.sum_ll / n - mean_l * mean_l;
            let var_r = self.sum_rr / n - mean_r * mean_r;
            let cov = self.sum_lr / n - mean_l * mean_r;

            let std_l = var_l.max(0.0).sqrt();
            let std_r = var_r.max(0.0).sqrt();
            self.last = if std_l < 1e-10 || std_r < 1e-10 {
                1.0
            } else {
                (cov / (std_l * std_r)).clamp(-1.0, 1.0)
            };
        }

        let last = self.last;
        *self = Self { last, ..Self::new() };
        last
    }

    /// Correlation of the last closed interval
    pub fn value(&self) -> f64 {
        self.last
    }

    /// Clear the accumulator and the last value
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Audio-side end of the metering queues
pub struct MeterPublisher {
    snapshots: rtrb::Producer<MeteringSnapshot>,
    diagnostics: rtrb::Producer<DiagnosticEvent>,
    dropped_snapshots: Arc<AtomicU64>,
    dropped_diagnostics: Arc<AtomicU64>,
}

impl MeterPublisher {
    /// Push a snapshot; returns `false` if the queue was full and it was dropped
    #[inline]
    pub fn publish(&mut self, snapshot: MeteringSnapshot) -> bool {
        if self.snapshots.push(snapshot).is_ok() {
            true
        } else {
            self.dropped_snapshots.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Push a diagnostic; returns `false` if the queue was full and it was dropped
    #[inline]
    pub fn report(&mut self, event: DiagnosticEvent) -> bool {
        if self.diagnostics.push(event).is_ok() {
            true
        } else {
            self.dropped_diagnostics.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Snapshots dropped so far
    pub fn dropped_snapshots(&self) -> u64 {
        self.dropped_snapshots.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for MeterPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeterPublisher")
            .field("snapshot_slots", &self.snapshots.slots())
            .field("dropped_snapshots", &self.dropped_snapshots())
            .finish_non_exhaustive()
    }
}

/// Control-side end of the metering queues
pub struct MeterReceiver {
    snapshots: rtrb::Consumer<MeteringSnapshot>,
    diagnostics: rtrb::Consumer<DiagnosticEvent>,
    dropped_snapshots: Arc<AtomicU64>,
    dropped_diagnostics: Arc<AtomicU64>,
}

impl MeterReceiver {
    /// Oldest pending snapshot
    pub fn try_recv(&mut self) -> Option<MeteringSnapshot> {
        self.snapshots.pop().ok()
    }

    /// Drain the queue, keeping only the newest snapshot
    pub fn latest(&mut self) -> Option<MeteringSnapshot> {
        let mut latest = None;
        while let Ok(snapshot) = self.snapshots.pop() {
            latest = Some(snapshot);
        }
        latest
    }

    /// Iterate over pending snapshots, oldest first
    pub fn snapshots(&mut self) -> impl Iterator<Item = MeteringSnapshot> + '_ {
        std::iter::from_fn(move || self.snapshots.pop().ok())
    }

    /// Iterate over pending diagnostics, logging each one
    pub fn diagnostics(&mut self) -> impl Iterator<Item = DiagnosticEvent> + '_ {
        std::iter::from_fn(move || {
            let event = self.diagnostics.pop().ok()?;
            tracing::warn!(?event, "{}", event);
            Some(event)
        })
    }

    /// Snapshots dropped because this receiver fell behind
    pub fn dropped_snapshots(&self) -> u64 {
        self.dropped_snapshots.load(Ordering::Relaxed)
    }

    /// Diagnostics dropped because this receiver fell behind
    pub fn dropped_diagnostics(&self) -> u64 {
        self.dropped_diagnostics.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for MeterReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeterReceiver")
            .field("pending_snapshots", &self.snapshots.slots())
            .field("pending_diagnostics", &self.diagnostics.slots())
            .field("dropped_snapshots", &self.dropped_snapshots())
            .finish()
    }
}

/// Create a connected publisher/receiver pair
///
/// `snapshot_capacity` bounds the snapshot queue (at least one slot);
/// diagnostics use [`DIAGNOSTIC_QUEUE_CAPACITY`].
pub fn metering_channel(snapshot_capacity: usize) -> (MeterPublisher, MeterReceiver) {
    let (snapshot_tx, snapshot_rx) = rtrb::RingBuffer::new(snapshot_capacity.max(1));
    let (diagnostic_tx, diagnostic_rx) = rtrb::RingBuffer::new(DIAGNOSTIC_QUEUE_CAPACITY);
    let dropped_snapshots = Arc::new(AtomicU64::new(0));
    let dropped_diagnostics = Arc::new(AtomicU64::new(0));

    (
        MeterPublisher {
            snapshots: snapshot_tx,
            diagnostics: diagnostic_tx,
            dropped_snapshots: Arc::clone(&dropped_snapshots),
            dropped_diagnostics: Arc::clone(&dropped_diagnostics),
        },
        MeterReceiver {
            snapshots: snapshot_rx,
            diagnostics: diagnostic_rx,
            dropped_snapshots,
            dropped_diagnostics,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_of_identical_and_inverted_channels() {
        let mut corr = PhaseCorrelation::new();
        for i in 0..480 {
            let x = (i as f64 * 0.1).sin();
            corr.push(x, x);
        }
        assert!((corr.finish() - 1.0).abs() < 1e-9);

        for i in 0..480 {
            let x = (i as f64 * 0.1).sin();
            corr.push(x, -x);
        }
        assert!((corr.finish() + 1.0).abs() < 1e-9);
        assert!((corr.value() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn silence_reads_fully_correlated() {
        let mut corr = PhaseCorrelation::new();
        for _ in 0..100 {
            corr.push(0.0, 0.0);
        }
        assert_eq!(corr.finish(), 1.0);

        // One silent channel has no variance either
        for i in 0..100 {
            corr.push((i as f64).sin(), 0.0);
        }
        assert_eq!(corr.finish(), 1.0);
    }

    #[test]
    fn empty_interval_keeps_last_value() {
        let mut corr = PhaseCorrelation::new();
        for i in 0..100 {
            let x = (i as f64 * 0.3).sin();
            corr.push(x, -x);
        }
        let value = corr.finish();
        assert_eq!(corr.finish(), value);

        corr.reset();
        assert_eq!(corr.value(), 1.0);
    }

    #[test]
    fn snapshots_arrive_in_order() {
        let (mut publisher, mut receiver) = metering_channel(4);
        for position in 0..3 {
            let snapshot = MeteringSnapshot {
                position_frames: position,
                ..MeteringSnapshot::empty(7)
            };
            assert!(publisher.publish(snapshot));
        }

        let positions: Vec<u64> = receiver.snapshots().map(|s| s.position_frames).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn full_queue_drops_newest() {
        let (mut publisher, mut receiver) = metering_channel(2);
        for position in 0..5 {
            publisher.publish(MeteringSnapshot {
                position_frames: position,
                ..MeteringSnapshot::empty(4)
            });
        }
        assert_eq!(publisher.dropped_snapshots(), 3);
        assert_eq!(receiver.dropped_snapshots(), 3);
        assert_eq!(receiver.latest().map(|s| s.position_frames), Some(1));
    }

    #[test]
    fn diagnostics_drain() {
        let (mut publisher, mut receiver) = metering_channel(1);
        publisher.report(DiagnosticEvent::ChannelMismatch {
            expected: 2,
            actual: 3,
        });
        publisher.report(DiagnosticEvent::NonFiniteSamples {
            count: 4,
            position_frames: 1024,
        });

        let events: Vec<_> = receiver.diagnostics().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1].to_string(),
            "4 non-finite samples zeroed at frame 1024"
        );
        assert_eq!(receiver.dropped_diagnostics(), 0);
    }

    #[test]
    fn empty_snapshot_reads_floor() {
        let snapshot = MeteringSnapshot::empty(5);
        assert_eq!(snapshot.integrated_lufs, LUFS_FLOOR);
        assert_eq!(snapshot.band_gain_reductions(), &[0.0; 5]);
        assert!(snapshot.material.is_none());
    }

    #[test]
    fn snapshot_serializes() {
        let json = serde_json::to_value(MeteringSnapshot::empty(2)).unwrap();
        assert_eq!(json["band_count"], 2);
        // Non-finite readings serialize as null
        assert!(json["integrated_lufs"].is_null());
    }
}
