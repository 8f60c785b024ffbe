use crate::clock::Clock;
use crate::config::Config;
use crate::network::{Link, ReportError, TransmissionRecord, Transmitter};
use crate::processing::detectors::Sample;
use crate::processing::sampler::PulseSampler;
use crate::processing::triggers::{BackoffTrigger, IntervalTrigger, RateTrigger};
use crate::sensor::{PulseSensor, SensorError};
use crate::status::{LedState, StatusIndicator};
use crate::utils::log::log_csv;
use log::{debug, info, warn};

const TRANSMISSION_LOG: &str = "transmissions.csv";
const TRANSMISSION_LOG_HEADERS: [&str; 5] = ["ts", "outcome", "bpm", "beats", "detail"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    /// The sample source has no more data.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmissionOutcome {
    Sent,
    /// Nothing to report yet.
    NoData,
    /// Link known to be down, attempt deferred to the next slot.
    Deferred,
    /// Delivery failed and was dropped.
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReporterStats {
    pub samples: usize,
    pub sensor_errors: usize,
    pub peaks: usize,
    pub transmission_slots: usize,
    pub transmissions_sent: usize,
    pub transmissions_failed: usize,
    pub transmissions_deferred: usize,
    pub connectivity_checks: usize,
    pub reconnect_attempts: usize,
}

// REPORTER COMPONENT ----------------------------------------------------------

/// The node's single control loop: samples the sensor, feeds the peak
/// detector, reports on a fixed interval and keeps the link alive.
pub struct Reporter<S, T, L, I> {
    config: Config,
    sensor: S,
    transmitter: T,
    link: L,
    indicator: I,
    sampler: PulseSampler,
    triggers: Option<Triggers>,
    backoff: BackoffTrigger,
    last_sample_ms: Option<u64>,
    stats: ReporterStats,
}

struct Triggers {
    sample: RateTrigger,
    transmission: IntervalTrigger,
    connectivity: IntervalTrigger,
}

impl<S, T, L, I> Reporter<S, T, L, I>
where
    S: PulseSensor,
    T: Transmitter,
    L: Link,
    I: StatusIndicator,
{
    pub fn new(config: &Config, sensor: S, transmitter: T, link: L, indicator: I) -> Self {
        Self {
            sampler: PulseSampler::new(config),
            backoff: BackoffTrigger::new(
                config.schedule.reconnect_backoff_min_ms,
                config.schedule.reconnect_backoff_max_ms,
            ),
            config: config.clone(),
            sensor,
            transmitter,
            link,
            indicator,
            triggers: None,
            last_sample_ms: None,
            stats: ReporterStats::default(),
        }
    }

    /// Runs until the sample source is exhausted. Live sources never are.
    pub fn run<C: Clock>(&mut self, clock: &C) -> &ReporterStats {
        info!(
            "reporter started: {} -> {}",
            self.sensor.describe(),
            self.transmitter.describe()
        );
        loop {
            if self.step(clock.now_ms()) == StepOutcome::Exhausted {
                break;
            }
            clock.sleep_until(self.next_wakeup_ms());
        }
        info!("sample source exhausted, reporter stopped: {:?}", self.stats);
        &self.stats
    }

    /// Does everything due at `now_ms`: at most one sample, then the
    /// transmission and connectivity slots.
    pub fn step(&mut self, now_ms: u64) -> StepOutcome {
        if self.triggers.is_none() {
            self.start(now_ms);
        }

        if self.sample_due(now_ms) && self.sample(now_ms) == StepOutcome::Exhausted {
            return StepOutcome::Exhausted;
        }

        if self.transmission_due(now_ms) {
            self.transmit(now_ms);
        }

        if self.connectivity_due(now_ms) {
            self.check_connectivity(now_ms);
        } else if !self.link.is_connected()
            && self.backoff.next_attempt_ms().is_some()
            && self.backoff.evaluate(now_ms)
        {
            self.try_reconnect(now_ms);
        }

        StepOutcome::Continue
    }

    /// Earliest time any trigger needs the loop again.
    pub fn next_wakeup_ms(&self) -> u64 {
        let Some(triggers) = &self.triggers else {
            return 0;
        };
        let mut next = triggers
            .sample
            .next_due_ms()
            .min(triggers.transmission.next_due_ms())
            .min(triggers.connectivity.next_due_ms());
        if !self.link.is_connected() {
            if let Some(retry) = self.backoff.next_attempt_ms() {
                next = next.min(retry);
            }
        }
        next
    }

    pub fn stats(&self) -> &ReporterStats {
        &self.stats
    }

    pub fn sampler(&self) -> &PulseSampler {
        &self.sampler
    }

    pub fn transmitter(&self) -> &T {
        &self.transmitter
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    fn start(&mut self, now_ms: u64) {
        self.triggers = Some(Triggers {
            sample: RateTrigger::new(self.config.sampling.sample_rate_hz, now_ms),
            transmission: IntervalTrigger::new(self.config.schedule.transmission_interval_ms, now_ms),
            connectivity: IntervalTrigger::new(self.config.schedule.wifi_check_interval_ms, now_ms),
        });

        info!(
            "joining '{}' (pulse pin GPIO{}, status pin GPIO{})",
            self.config.network.ssid, self.config.hardware.pulse_pin, self.config.hardware.led_pin
        );
        self.indicator.set(LedState::Connecting);
        self.try_reconnect(now_ms);
    }

    fn sample_due(&mut self, now_ms: u64) -> bool {
        self.triggers
            .as_mut()
            .map_or(false, |t| t.sample.evaluate(now_ms))
    }

    fn transmission_due(&mut self, now_ms: u64) -> bool {
        self.triggers
            .as_mut()
            .map_or(false, |t| t.transmission.evaluate(now_ms))
    }

    fn connectivity_due(&mut self, now_ms: u64) -> bool {
        self.triggers
            .as_mut()
            .map_or(false, |t| t.connectivity.evaluate(now_ms))
    }

    fn sample(&mut self, now_ms: u64) -> StepOutcome {
        let value = match self.sensor.read() {
            Ok(value) => value,
            Err(SensorError::Exhausted) => return StepOutcome::Exhausted,
            Err(e) => {
                self.stats.sensor_errors += 1;
                debug!("sample skipped at {} ms: {}", now_ms, e);
                return StepOutcome::Continue;
            }
        };

        // An interval measured across a dropout would be meaningless.
        let max_gap = self.config.aggregation.ibi_valid_max_ms as u64;
        if let Some(last) = self.last_sample_ms {
            if now_ms.saturating_sub(last) > max_gap {
                warn!("no samples for {} ms, restarting peak timing", now_ms - last);
                self.sampler.reset_detector();
            }
        }
        self.last_sample_ms = Some(now_ms);
        self.stats.samples += 1;

        if self.sampler.process_sample(Sample::new(now_ms, value)).is_some() {
            self.stats.peaks += 1;
            if self.config.debug.led_status {
                self.indicator.set(LedState::Beat);
            }
        }
        StepOutcome::Continue
    }

    /// One transmission slot. Failures are logged and dropped.
    pub fn transmit(&mut self, now_ms: u64) -> TransmissionOutcome {
        self.stats.transmission_slots += 1;

        let Some(summary) = self.sampler.summary() else {
            debug!("nothing to report at {} ms", now_ms);
            return TransmissionOutcome::NoData;
        };
        let record = TransmissionRecord::new(&self.config.network.device_id, now_ms, &summary);

        let result = if self.link.is_connected() {
            self.transmitter.send(&record)
        } else {
            Err(ReportError::NetworkUnavailable("link is down".to_string()))
        };

        let (outcome, detail) = match result {
            Ok(()) => {
                self.stats.transmissions_sent += 1;
                debug!("sent {:.1} bpm over {} beats", record.bpm, record.beats);
                self.set_link_led(true);
                (TransmissionOutcome::Sent, String::new())
            }
            Err(ReportError::NetworkUnavailable(reason)) if !self.link.is_connected() => {
                self.stats.transmissions_deferred += 1;
                debug!("transmission deferred: {}", reason);
                (TransmissionOutcome::Deferred, reason)
            }
            Err(e) => {
                self.stats.transmissions_failed += 1;
                warn!("transmission dropped: {}", e);
                if self.config.debug.led_status {
                    self.indicator.set(LedState::Error);
                }
                (TransmissionOutcome::Failed, e.to_string())
            }
        };

        if self.config.debug.debug_mode {
            self.audit(&record, outcome, &detail);
        }
        outcome
    }

    fn audit(&self, record: &TransmissionRecord, outcome: TransmissionOutcome, detail: &str) {
        let ts = record.ts.to_string();
        let bpm = format!("{:.1}", record.bpm);
        let beats = record.beats.to_string();
        let outcome = format!("{:?}", outcome).to_lowercase();
        let row = [ts.as_str(), outcome.as_str(), bpm.as_str(), beats.as_str(), detail];
        if let Err(e) = log_csv(
            &self.config.debug.log_dir,
            TRANSMISSION_LOG,
            &TRANSMISSION_LOG_HEADERS,
            &row,
        ) {
            warn!("cannot write transmission log: {}", e);
        }
    }

    fn check_connectivity(&mut self, now_ms: u64) {
        self.stats.connectivity_checks += 1;
        if self.link.check() {
            self.backoff.record_success();
            self.set_link_led(true);
            return;
        }

        self.set_link_led(false);
        if self.backoff.evaluate(now_ms) {
            self.try_reconnect(now_ms);
        }
    }

    fn try_reconnect(&mut self, now_ms: u64) {
        self.stats.reconnect_attempts += 1;
        match self.link.reconnect() {
            Ok(()) => {
                info!("connected to '{}'", self.config.network.ssid);
                self.backoff.record_success();
                self.set_link_led(true);
            }
            Err(e) => {
                self.backoff.record_failure(now_ms);
                warn!(
                    "reconnect failed ({}), next attempt in {} ms",
                    e,
                    self.backoff
                        .next_attempt_ms()
                        .map_or(0, |at| at.saturating_sub(now_ms))
                );
                self.set_link_led(false);
            }
        }
    }

    fn set_link_led(&mut self, online: bool) {
        if self.config.debug.led_status {
            self.indicator.set(if online {
                LedState::Online
            } else {
                LedState::Offline
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimulatedClock;
    use crate::sensor::SimulatedSensor;
    use crate::status::NullIndicator;
    use std::collections::VecDeque;

    /// Square pulse train sampled at whatever times the reporter asks for.
    struct PulseTrain {
        period_ms: u64,
        clock_ms: u64,
        step_ms: u64,
        limit: Option<usize>,
        reads: usize,
        failing: VecDeque<usize>,
    }

    impl PulseTrain {
        fn new(period_ms: u64) -> Self {
            Self {
                period_ms,
                clock_ms: 0,
                step_ms: 10,
                limit: None,
                reads: 0,
                failing: VecDeque::new(),
            }
        }
    }

    impl PulseSensor for PulseTrain {
        fn read(&mut self) -> Result<u16, SensorError> {
            if self.limit.map_or(false, |limit| self.reads >= limit) {
                return Err(SensorError::Exhausted);
            }
            let t = self.clock_ms;
            self.clock_ms += self.step_ms;
            self.reads += 1;
            if self.failing.front() == Some(&self.reads) {
                self.failing.pop_front();
                return Err(SensorError::Read("adc busy".to_string()));
            }
            Ok(if t % self.period_ms < 30 { 3000 } else { 1500 })
        }

        fn describe(&self) -> String {
            "pulse train".to_string()
        }
    }

    #[derive(Default)]
    struct RecordingTransmitter {
        sent: Vec<TransmissionRecord>,
        fail: bool,
    }

    impl Transmitter for RecordingTransmitter {
        fn send(&mut self, record: &TransmissionRecord) -> Result<(), ReportError> {
            if self.fail {
                return Err(ReportError::TransmissionFailure("503".to_string()));
            }
            self.sent.push(record.clone());
            Ok(())
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }

    /// Link whose reachability follows a script of check results.
    struct ScriptedLink {
        up: bool,
        script: VecDeque<bool>,
        reconnects: usize,
    }

    impl ScriptedLink {
        fn up() -> Self {
            Self {
                up: true,
                script: VecDeque::new(),
                reconnects: 0,
            }
        }

        fn scripted(results: &[bool]) -> Self {
            Self {
                up: false,
                script: results.iter().copied().collect(),
                reconnects: 0,
            }
        }

        fn next(&mut self) -> bool {
            self.up = self.script.pop_front().unwrap_or(self.up);
            self.up
        }
    }

    impl Link for ScriptedLink {
        fn check(&mut self) -> bool {
            self.next()
        }

        fn is_connected(&self) -> bool {
            self.up
        }

        fn reconnect(&mut self) -> Result<(), ReportError> {
            self.reconnects += 1;
            if self.next() {
                Ok(())
            } else {
                Err(ReportError::NetworkUnavailable("no ap".to_string()))
            }
        }
    }

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.debug.debug_mode = false;
        config
    }

    fn drive<S, T, L, I>(reporter: &mut Reporter<S, T, L, I>, until_ms: u64)
    where
        S: PulseSensor,
        T: Transmitter,
        L: Link,
        I: StatusIndicator,
    {
        let mut t = 0;
        while t <= until_ms {
            reporter.step(t);
            t += 10;
        }
    }

    #[test]
    fn transmits_on_exact_interval_grid() {
        let config = quiet_config();
        let mut reporter = Reporter::new(
            &config,
            PulseTrain::new(800),
            RecordingTransmitter::default(),
            ScriptedLink::up(),
            NullIndicator,
        );
        drive(&mut reporter, 10_000);

        assert_eq!(reporter.stats().transmission_slots, 10);
        let times: Vec<u64> = reporter.transmitter().sent.iter().map(|r| r.ts).collect();
        // The first slot at 1000 ms has only one interval (0 -> 800), so all slots report.
        assert_eq!(times, (1..=10).map(|k| k * 1000).collect::<Vec<_>>());
        let last = reporter.transmitter().sent.last().unwrap();
        assert!((last.bpm - 75.0).abs() < 1e-9);
        assert_eq!(last.device_id, "pulse-node-01");
    }

    #[test]
    fn slots_do_not_depend_on_peak_count() {
        let config = quiet_config();
        let mut fast = Reporter::new(
            &config,
            PulseTrain::new(400),
            RecordingTransmitter::default(),
            ScriptedLink::up(),
            NullIndicator,
        );
        let mut slow = Reporter::new(
            &config,
            PulseTrain::new(1500),
            RecordingTransmitter::default(),
            ScriptedLink::up(),
            NullIndicator,
        );
        drive(&mut fast, 6_000);
        drive(&mut slow, 6_000);
        assert!(fast.stats().peaks > slow.stats().peaks);
        assert_eq!(fast.stats().transmission_slots, 6);
        assert_eq!(slow.stats().transmission_slots, 6);
    }

    #[test]
    fn empty_buffer_sends_nothing() {
        let config = quiet_config();
        let mut reporter = Reporter::new(
            &config,
            PulseTrain::new(5_000),
            RecordingTransmitter::default(),
            ScriptedLink::up(),
            NullIndicator,
        );
        drive(&mut reporter, 3_000);
        assert_eq!(reporter.stats().peaks, 1);
        assert_eq!(reporter.stats().transmission_slots, 3);
        assert!(reporter.transmitter().sent.is_empty());
    }

    #[test]
    fn failed_transmission_is_dropped_not_retried() {
        let config = quiet_config();
        let transmitter = RecordingTransmitter {
            fail: true,
            ..RecordingTransmitter::default()
        };
        let mut reporter = Reporter::new(
            &config,
            PulseTrain::new(800),
            transmitter,
            ScriptedLink::up(),
            NullIndicator,
        );
        drive(&mut reporter, 5_000);
        assert_eq!(reporter.stats().transmission_slots, 5);
        assert_eq!(reporter.stats().transmissions_failed, 5);
        assert_eq!(reporter.stats().transmissions_sent, 0);
    }

    #[test]
    fn down_link_defers_and_backs_off() {
        let config = quiet_config();
        // Attempts at 0 and 1000 ms fail, the one at 3000 ms succeeds.
        let link = ScriptedLink::scripted(&[false, false, true]);
        let mut reporter = Reporter::new(
            &config,
            PulseTrain::new(800),
            RecordingTransmitter::default(),
            link,
            NullIndicator,
        );
        drive(&mut reporter, 6_000);

        assert_eq!(reporter.link().reconnects, 3);
        assert!(reporter.link().is_connected());
        let stats = reporter.stats();
        // The 3000 ms slot runs before that step's reconnect, so it is deferred too.
        assert_eq!(stats.transmissions_deferred, 3);
        assert_eq!(stats.transmissions_sent, 3);
        assert_eq!(stats.transmissions_failed, 0);
    }

    #[test]
    fn connectivity_check_runs_on_its_own_period() {
        let mut config = quiet_config();
        config.schedule.wifi_check_interval_ms = 2_000;
        let mut reporter = Reporter::new(
            &config,
            PulseTrain::new(800),
            RecordingTransmitter::default(),
            ScriptedLink::up(),
            NullIndicator,
        );
        drive(&mut reporter, 9_990);
        assert_eq!(reporter.stats().connectivity_checks, 4);
        assert_eq!(reporter.stats().transmission_slots, 9);
    }

    #[test]
    fn sensor_errors_skip_only_their_tick() {
        let config = quiet_config();
        let mut sensor = PulseTrain::new(800);
        sensor.failing = VecDeque::from(vec![5, 6, 7]);
        let mut reporter = Reporter::new(
            &config,
            sensor,
            RecordingTransmitter::default(),
            ScriptedLink::up(),
            NullIndicator,
        );
        drive(&mut reporter, 990);
        assert_eq!(reporter.stats().sensor_errors, 3);
        assert_eq!(reporter.stats().samples, 97);
    }

    #[test]
    fn sample_rate_not_dividing_a_second_is_honoured() {
        let mut config = quiet_config();
        config.sampling.sample_rate_hz = 600;
        let mut reporter = Reporter::new(
            &config,
            SimulatedSensor::with_seed(72.0, 600, 1),
            RecordingTransmitter::default(),
            ScriptedLink::up(),
            NullIndicator,
        );
        for t in 0..10_000 {
            reporter.step(t);
        }

        assert_eq!(reporter.stats().samples, 6_000);
        let bpm = reporter.sampler().summary().unwrap().bpm;
        assert!((bpm - 72.0).abs() < 2.0, "measured {} bpm", bpm);
    }

    #[test]
    fn long_dropout_does_not_produce_an_interval() {
        let config = quiet_config();
        let mut sensor = PulseTrain::new(800);
        // Reads 101..=320 cover 1000..3190 ms.
        sensor.failing = (101..=320).collect();
        let mut reporter = Reporter::new(
            &config,
            sensor,
            RecordingTransmitter::default(),
            ScriptedLink::up(),
            NullIndicator,
        );
        drive(&mut reporter, 3_500);

        assert_eq!(reporter.stats().peaks, 3);
        assert_eq!(reporter.sampler().intervals().to_vec(), vec![800]);
    }

    #[test]
    fn run_stops_when_source_is_exhausted() {
        let config = quiet_config();
        let mut sensor = PulseTrain::new(800);
        sensor.limit = Some(1_000);
        let mut reporter = Reporter::new(
            &config,
            sensor,
            RecordingTransmitter::default(),
            ScriptedLink::up(),
            NullIndicator,
        );
        let clock = SimulatedClock::new();
        let stats = reporter.run(&clock).clone();

        assert_eq!(stats.samples, 1_000);
        assert_eq!(stats.peaks, 13);
        // Samples cover 0..=9990 ms; the read at 10000 ms finds the source empty first.
        assert_eq!(stats.transmission_slots, 9);
        assert_eq!(clock.now_ms(), 10_000);
    }

    #[test]
    fn debug_mode_writes_transmission_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.debug.log_dir = dir.path().to_str().unwrap().to_string();
        let mut reporter = Reporter::new(
            &config,
            PulseTrain::new(800),
            RecordingTransmitter::default(),
            ScriptedLink::up(),
            NullIndicator,
        );
        drive(&mut reporter, 2_000);

        let log = std::fs::read_to_string(dir.path().join(TRANSMISSION_LOG)).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines[0], "ts,outcome,bpm,beats,detail");
        assert!(lines[1].starts_with("1000,sent,75.0,1,"));
        assert!(lines[2].starts_with("2000,sent,75.0,2,"));
    }
}
