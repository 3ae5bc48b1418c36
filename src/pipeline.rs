//! The stream loop: read, window, analyze, smooth, encode, send
//!
//! Single-threaded and strictly sequential. The only blocking call is the
//! block read; everything else runs inline before the next read.

use std::io::Read;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::audio::{BlockReader, LevelSmoother, ReadOutcome, RingWindow, SpectrumAnalyzer, UnderrunPolicy};
use crate::config::AppConfig;
use crate::error::{AnalysisError, Result};
use crate::network::{DestinationSet, DispatchReport, Dispatcher, Transport};
use crate::protocol::AudioSyncPacket;

/// Stream loop lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Init,
    Running,
    Shutdown,
}

/// Why a cycle produced no packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Short or empty read under [`UnderrunPolicy::Skip`]
    Underrun,
    /// The analyzer rejected the block
    Analysis(AnalysisError),
}

/// Result of one cycle
#[derive(Debug)]
pub enum CycleOutcome {
    Sent(DispatchReport),
    Skipped(SkipReason),
}

/// Counters returned when the loop stops
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub cycles: u64,
    pub packets: u64,
    pub skipped: u64,
    pub underruns: u64,
}

/// Loop options taken from [`crate::config::StreamConfig`]
#[derive(Debug, Clone)]
pub struct LoopOptions {
    pub underrun_policy: UnderrunPolicy,
    pub exit_on_eof: bool,
    pub stats_interval: u64,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            underrun_policy: UnderrunPolicy::Reuse,
            exit_on_eof: false,
            stats_interval: 0,
        }
    }
}

/// Drives one cycle per block read from `R`, sending through `T`
pub struct StreamLoop<R, T: Transport = UdpSocket> {
    reader: BlockReader<R>,
    window: RingWindow,
    analyzer: SpectrumAnalyzer,
    smoother: LevelSmoother,
    dispatcher: Dispatcher<T>,
    options: LoopOptions,
    state: LoopState,
    summary: StreamSummary,
    at_eof: bool,
}

impl<R: Read> StreamLoop<R, UdpSocket> {
    /// INIT: build the window, resolve destinations and open the socket.
    ///
    /// Any failure here is a startup error for the caller.
    pub fn from_config(config: &AppConfig, source: R) -> Result<Self> {
        config.validate()?;

        let destinations = DestinationSet::from_config(&config.wled)?;
        match &destinations {
            DestinationSet::Multicast(group) => {
                tracing::info!("Sending to WLED via multicast ({})", group);
            }
            DestinationSet::Unicast(targets) => {
                tracing::info!("Sending to {} WLED controller(s):", targets.len());
                for target in targets {
                    tracing::info!("  - {}", target);
                }
            }
        }

        let dispatcher = Dispatcher::open(destinations)?;
        let options = LoopOptions {
            underrun_policy: config.stream.underrun_policy(),
            exit_on_eof: config.stream.exit_on_eof,
            stats_interval: config.stream.stats_interval,
        };

        Ok(Self::new(
            source,
            config.audio.sample_rate,
            config.audio.buffer_size,
            config.audio.chunk_size,
            dispatcher,
            options,
        ))
    }
}

impl<R: Read, T: Transport> StreamLoop<R, T> {
    pub fn new(
        source: R,
        sample_rate: u32,
        buffer_size: usize,
        chunk_size: usize,
        dispatcher: Dispatcher<T>,
        options: LoopOptions,
    ) -> Self {
        let window = RingWindow::with_buffer_size(buffer_size, chunk_size);
        tracing::debug!(
            "Ring window: {} blocks of {} bytes",
            window.capacity(),
            window.chunk_size()
        );

        Self {
            reader: BlockReader::new(source, chunk_size),
            window,
            analyzer: SpectrumAnalyzer::new(sample_rate),
            smoother: LevelSmoother::new(),
            dispatcher,
            options,
            state: LoopState::Init,
            summary: StreamSummary::default(),
            at_eof: false,
        }
    }

    /// Run one cycle.
    ///
    /// Read errors other than interrupts are returned; analysis and send
    /// failures are not.
    pub fn step(&mut self) -> Result<CycleOutcome> {
        self.state = LoopState::Running;
        self.summary.cycles += 1;

        let outcome = self.reader.read_block()?;
        match outcome {
            ReadOutcome::Full(block) => {
                self.at_eof = false;
                self.window.push(block);
            }
            ReadOutcome::Partial(len) => {
                self.at_eof = true;
                tracing::debug!("Discarding {} trailing bytes", len);
                if let Some(skip) = self.underrun() {
                    return Ok(skip);
                }
            }
            ReadOutcome::Empty => {
                self.at_eof = true;
                if let Some(skip) = self.underrun() {
                    return Ok(skip);
                }
            }
        }

        let block = self.window.analysis_block();
        let analysis = match self.analyzer.analyze(&block) {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!("Invalid FFT data, skipping block: {}", e);
                self.summary.skipped += 1;
                return Ok(CycleOutcome::Skipped(SkipReason::Analysis(e)));
            }
        };

        let smoothed = self.smoother.update(analysis.raw_level);
        let packet = AudioSyncPacket::from_analysis(&analysis, smoothed).encode();
        let report = self.dispatcher.dispatch(&packet);
        self.summary.packets += 1;

        if self.options.stats_interval > 0 && self.summary.packets % self.options.stats_interval == 0 {
            self.log_stats();
        }

        Ok(CycleOutcome::Sent(report))
    }

    fn underrun(&mut self) -> Option<CycleOutcome> {
        self.summary.underruns += 1;
        match self.options.underrun_policy {
            UnderrunPolicy::Reuse => None,
            UnderrunPolicy::Skip => {
                self.summary.skipped += 1;
                Some(CycleOutcome::Skipped(SkipReason::Underrun))
            }
        }
    }

    /// Loop until `running` is cleared, or until end of stream when
    /// `exit_on_eof` is set.
    ///
    /// Without `exit_on_eof` an exhausted stream keeps cycling on the last
    /// window contents.
    pub fn run(&mut self, running: &AtomicBool) -> Result<StreamSummary> {
        tracing::info!("Stream loop started");

        let result = loop {
            if !running.load(Ordering::SeqCst) {
                tracing::info!("Interrupt received, stopping stream loop");
                break Ok(());
            }
            if let Err(e) = self.step() {
                break Err(e);
            }
            if self.at_eof && self.options.exit_on_eof {
                tracing::info!("Input stream ended");
                break Ok(());
            }
        };

        self.state = LoopState::Shutdown;
        self.log_stats();
        result.map(|()| self.summary.clone())
    }

    fn log_stats(&self) {
        let stats = self.dispatcher.stats();
        tracing::info!(
            "Stats: {} cycles, {} packets, {} skipped, {} underruns, {} sends ok, {} failed, smoothed level {:.1}",
            self.summary.cycles,
            self.summary.packets,
            self.summary.skipped,
            self.summary.underruns,
            stats.packets_sent,
            stats.send_failures,
            self.smoother.level()
        );
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn summary(&self) -> &StreamSummary {
        &self.summary
    }

    pub fn smoothed_level(&self) -> f64 {
        self.smoother.level()
    }

    pub fn window(&self) -> &RingWindow {
        &self.window
    }

    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }
}
