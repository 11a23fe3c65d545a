use crate::collectors::{CpuTicks, NetCounters, RawCounterSample};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Rates derived from two consecutive counter samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RateMetrics {
    pub cpu_percent: f64,
    pub tx_bytes_per_sec: u64,
    pub rx_bytes_per_sec: u64,
}

/// Last good reading of one counter group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline<T> {
    pub timestamp: DateTime<Utc>,
    pub counters: T,
}

/// Turns cumulative counters into rates. Never fails: degenerate inputs produce zero rates.
///
/// Network and CPU keep separate baselines. A group missing from a sample reports zero
/// and leaves its baseline alone, so the next good reading is differenced against the
/// last good one instead of against nothing.
#[derive(Debug, Default)]
pub struct RateCalculator {
    net: Option<Baseline<NetCounters>>,
    cpu: Option<Baseline<CpuTicks>>,
}

impl RateCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a known previous sample instead of bootstrapping.
    pub fn with_prior(prior: RawCounterSample) -> Self {
        let timestamp = prior.timestamp;
        Self {
            net: prior.net.map(|counters| Baseline { timestamp, counters }),
            cpu: prior.cpu.map(|counters| Baseline { timestamp, counters }),
        }
    }

    pub fn net_baseline(&self) -> Option<&Baseline<NetCounters>> {
        self.net.as_ref()
    }

    pub fn cpu_baseline(&self) -> Option<&Baseline<CpuTicks>> {
        self.cpu.as_ref()
    }

    /// Compute rates against the stored baselines, then make each group present in
    /// `sample` the new baseline for that group.
    pub fn update(&mut self, sample: RawCounterSample) -> RateMetrics {
        let timestamp = sample.timestamp;
        let mut metrics = RateMetrics::default();

        if let Some(current) = sample.net {
            let prior = self.net.replace(Baseline {
                timestamp,
                counters: current,
            });
            if let Some(prior) = prior {
                if let Some(dt_ms) = elapsed_ms(prior.timestamp, timestamp) {
                    let (then, now) = (prior.counters, current);
                    metrics.tx_bytes_per_sec = per_second(then.tx_bytes, now.tx_bytes, dt_ms);
                    metrics.rx_bytes_per_sec = per_second(then.rx_bytes, now.rx_bytes, dt_ms);
                }
            }
        }

        if let Some(current) = sample.cpu {
            let prior = self.cpu.replace(Baseline {
                timestamp,
                counters: current,
            });
            if let Some(prior) = prior.filter(|p| elapsed_ms(p.timestamp, timestamp).is_some()) {
                metrics.cpu_percent = cpu_percent(&prior.counters, &current);
            }
        }

        metrics
    }
}

/// Milliseconds from `from` to `to`, or `None` when time did not move forward.
fn elapsed_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> Option<u64> {
    let dt_ms = (to - from).num_milliseconds();
    (dt_ms > 0).then_some(dt_ms as u64)
}

/// Floor of the per-second rate. A counter that went backwards yields zero.
fn per_second(prior: u64, current: u64, dt_ms: u64) -> u64 {
    let delta = current.saturating_sub(prior) as u128;
    (delta * 1000 / dt_ms as u128).min(u64::MAX as u128) as u64
}

/// Busy share of the ticks elapsed between two readings, in [0, 100].
pub fn cpu_percent(prior: &CpuTicks, current: &CpuTicks) -> f64 {
    let total_delta = current.total().saturating_sub(prior.total());
    if total_delta == 0 {
        return 0.0;
    }
    let idle_delta = current.idle_total().saturating_sub(prior.idle_total());
    let busy_delta = total_delta.saturating_sub(idle_delta);
    (100.0 * busy_delta as f64 / total_delta as f64).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn sample(secs: i64, tx: u64, rx: u64) -> RawCounterSample {
        RawCounterSample::new(at(secs), tx, rx, CpuTicks::default())
    }

    fn with_ticks(mut sample: RawCounterSample, cpu: CpuTicks) -> RawCounterSample {
        sample.cpu = Some(cpu);
        sample
    }

    fn ticks(user: u64, idle: u64, iowait: u64, system: u64) -> CpuTicks {
        CpuTicks {
            user,
            idle,
            iowait,
            system,
            ..CpuTicks::default()
        }
    }

    #[test]
    fn test_first_update_returns_zero_rates() {
        let mut calc = RateCalculator::new();
        let first = with_ticks(sample(0, 9_999_999, 8_888_888), ticks(500, 500, 0, 0));
        assert_eq!(calc.update(first), RateMetrics::default());
        assert_eq!(
            calc.net_baseline().map(|b| b.counters.tx_bytes),
            Some(9_999_999)
        );
        assert_eq!(
            calc.cpu_baseline().map(|b| b.counters),
            Some(ticks(500, 500, 0, 0))
        );
    }

    #[test]
    fn test_network_rate_scenario() {
        let mut calc = RateCalculator::new();
        calc.update(sample(0, 1000, 2000));
        let rates = calc.update(sample(5, 1500, 2600));
        assert_eq!(rates.tx_bytes_per_sec, 100);
        assert_eq!(rates.rx_bytes_per_sec, 120);
    }

    #[test]
    fn test_network_rate_floors() {
        let mut calc = RateCalculator::with_prior(sample(0, 0, 0));
        let rates = calc.update(sample(3, 10, 11));
        assert_eq!(rates.tx_bytes_per_sec, 3);
        assert_eq!(rates.rx_bytes_per_sec, 3);
    }

    #[test]
    fn test_counter_rollback_clamps_to_zero() {
        let mut calc = RateCalculator::with_prior(sample(0, 5000, 5000));
        let rates = calc.update(sample(10, 100, 6000));
        assert_eq!(rates.tx_bytes_per_sec, 0);
        assert_eq!(rates.rx_bytes_per_sec, 100);
    }

    #[test]
    fn test_zero_elapsed_time_yields_zero_rates() {
        let prior = with_ticks(sample(7, 0, 0), ticks(100, 900, 0, 0));
        let mut calc = RateCalculator::with_prior(prior);

        let same_tick = with_ticks(sample(7, 5000, 5000), ticks(200, 950, 0, 0));
        assert_eq!(calc.update(same_tick), RateMetrics::default());
    }

    #[test]
    fn test_clock_going_backwards_yields_zero_rates() {
        let mut calc = RateCalculator::with_prior(sample(10, 0, 0));
        assert_eq!(calc.update(sample(4, 5000, 5000)), RateMetrics::default());
        // the backwards sample becomes the new baseline
        assert_eq!(calc.update(sample(5, 5100, 5100)).tx_bytes_per_sec, 100);
    }

    #[test]
    fn test_sub_second_interval() {
        let mut calc = RateCalculator::with_prior(sample(0, 0, 0));
        let mut next = sample(0, 500, 250);
        next.timestamp = at(0) + Duration::milliseconds(500);
        let rates = calc.update(next);
        assert_eq!(rates.tx_bytes_per_sec, 1000);
        assert_eq!(rates.rx_bytes_per_sec, 500);
    }

    #[test]
    fn test_cpu_percent_scenario() {
        let prior = ticks(100, 900, 0, 0);
        let current = ticks(150, 930, 0, 20);
        assert_eq!(current.total() - prior.total(), 100);
        assert_eq!(cpu_percent(&prior, &current), 70.0);
    }

    #[test]
    fn test_cpu_percent_counts_iowait_as_idle() {
        let prior = ticks(0, 0, 0, 0);
        let current = ticks(25, 50, 25, 0);
        assert_eq!(cpu_percent(&prior, &current), 25.0);
    }

    #[test]
    fn test_cpu_percent_zero_total_delta() {
        let t = ticks(100, 900, 10, 5);
        assert_eq!(cpu_percent(&t, &t), 0.0);
    }

    #[test]
    fn test_cpu_percent_stays_in_range() {
        let prior = ticks(10, 10, 10, 10);
        for (user, idle, iowait, system) in [(10, 500, 10, 10), (900, 10, 10, 10), (11, 11, 11, 11)] {
            let pct = cpu_percent(&prior, &ticks(user, idle, iowait, system));
            assert!((0.0..=100.0).contains(&pct), "{pct} out of range");
        }
        assert_eq!(cpu_percent(&prior, &ticks(900, 10, 10, 10)), 100.0);
        assert_eq!(cpu_percent(&prior, &ticks(10, 500, 10, 10)), 0.0);
    }

    #[test]
    fn test_cpu_rollback_yields_zero() {
        let prior = ticks(1000, 1000, 0, 0);
        let current = ticks(10, 10, 0, 0);
        assert_eq!(cpu_percent(&prior, &current), 0.0);
    }

    #[test]
    fn test_state_tracks_most_recent_sample() {
        let mut calc = RateCalculator::new();
        calc.update(sample(0, 0, 0));
        calc.update(sample(1, 100, 100));
        let rates = calc.update(sample(2, 300, 100));
        assert_eq!(rates.tx_bytes_per_sec, 200);
        assert_eq!(rates.rx_bytes_per_sec, 0);
        assert_eq!(calc.net_baseline().map(|b| b.counters.tx_bytes), Some(300));
    }

    #[test]
    fn test_missing_network_keeps_previous_baseline() {
        let busy = |secs, user| with_ticks(sample(secs, 10_000_000_000, 0), ticks(user, 0, 0, 0));
        let mut calc = RateCalculator::new();
        calc.update(busy(0, 0));
        calc.update(busy(10, 1000));

        let mut outage = with_ticks(sample(20, 0, 0), ticks(2000, 0, 0, 0));
        outage.net = None;
        let rates = calc.update(outage);
        assert_eq!((rates.tx_bytes_per_sec, rates.rx_bytes_per_sec), (0, 0));
        assert_eq!(rates.cpu_percent, 100.0);
        assert_eq!(calc.net_baseline().map(|b| b.timestamp), Some(at(10)));

        // 1000 bytes over the 20s since the last good reading
        let rates = calc.update(with_ticks(
            sample(30, 10_000_001_000, 0),
            ticks(3000, 0, 0, 0),
        ));
        assert_eq!(rates.tx_bytes_per_sec, 50);
        assert_eq!(rates.rx_bytes_per_sec, 0);
    }

    #[test]
    fn test_missing_cpu_keeps_previous_baseline() {
        let mut calc = RateCalculator::new();
        calc.update(with_ticks(sample(0, 0, 0), ticks(100, 900, 0, 0)));

        let mut outage = sample(10, 1000, 0);
        outage.cpu = None;
        let rates = calc.update(outage);
        assert_eq!(rates.cpu_percent, 0.0);
        assert_eq!(rates.tx_bytes_per_sec, 100);
        assert_eq!(
            calc.cpu_baseline().map(|b| b.counters),
            Some(ticks(100, 900, 0, 0))
        );

        // an idle machine stays idle after recovery
        let rates = calc.update(with_ticks(sample(20, 2000, 0), ticks(101, 1899, 0, 0)));
        assert!(rates.cpu_percent < 1.0, "{}", rates.cpu_percent);
        assert_eq!(rates.tx_bytes_per_sec, 100);
    }

    #[test]
    fn test_fully_unavailable_sample_changes_nothing() {
        let mut calc = RateCalculator::with_prior(with_ticks(sample(0, 500, 500), ticks(1, 1, 0, 0)));
        assert_eq!(
            calc.update(RawCounterSample::unavailable(at(10))),
            RateMetrics::default()
        );
        assert_eq!(calc.net_baseline().map(|b| b.timestamp), Some(at(0)));
        assert_eq!(calc.cpu_baseline().map(|b| b.timestamp), Some(at(0)));
    }

    #[test]
    fn test_group_first_seen_after_outage_only_seeds() {
        let mut calc = RateCalculator::new();
        let mut cpu_only = with_ticks(sample(0, 0, 0), ticks(10, 10, 0, 0));
        cpu_only.net = None;
        calc.update(cpu_only);
        assert!(calc.net_baseline().is_none());

        let rates = calc.update(sample(10, 5000, 5000));
        assert_eq!((rates.tx_bytes_per_sec, rates.rx_bytes_per_sec), (0, 0));
        assert_eq!(calc.net_baseline().map(|b| b.timestamp), Some(at(10)));
    }
}
