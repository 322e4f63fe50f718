use std::collections::BTreeMap;

/// Counters, gauges and histograms for the engine's loading activity.
///
/// Sorted maps keep snapshots stable so they can be diffed in logs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metrics {
    counters: BTreeMap<&'static str, u64>,
    gauges: BTreeMap<&'static str, i64>,
    histograms: BTreeMap<&'static str, Histogram>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Histogram {
    pub count: u64,
    pub sum: i64,
    pub min: i64,
    pub max: i64,
}

impl Histogram {
    pub fn record(&mut self, value: i64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64 / self.count as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub counters: Vec<(&'static str, u64)>,
    pub gauges: Vec<(&'static str, i64)>,
    pub histograms: Vec<(&'static str, Histogram)>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn inc(&mut self, name: &'static str) {
        *self.counters.entry(name).or_insert(0) += 1;
    }

    pub fn gauge(&self, name: &str) -> Option<i64> {
        self.gauges.get(name).copied()
    }

    pub fn set_gauge(&mut self, name: &'static str, value: i64) {
        self.gauges.insert(name, value);
    }

    pub fn record(&mut self, name: &'static str, value: i64) {
        self.histograms.entry(name).or_default().record(value);
    }

    pub fn histogram(&self, name: &str) -> Option<Histogram> {
        self.histograms.get(name).copied()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self.counters.iter().map(|(k, v)| (*k, *v)).collect(),
            gauges: self.gauges.iter().map(|(k, v)| (*k, *v)).collect(),
            histograms: self.histograms.iter().map(|(k, v)| (*k, *v)).collect(),
        }
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (name, value) in &self.counters {
            writeln!(f, "{name} = {value}")?;
        }
        for (name, value) in &self.gauges {
            writeln!(f, "{name} = {value}")?;
        }
        for (name, h) in &self.histograms {
            writeln!(
                f,
                "{name}: count={} min={} max={} sum={}",
                h.count, h.min, h.max, h.sum
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Histogram, Metrics};

    #[test]
    fn counters_accumulate() {
        let mut m = Metrics::new();
        m.inc("fetch.started");
        m.inc("fetch.started");
        assert_eq!(m.counter("fetch.started"), 2);
        assert_eq!(m.counter("fetch.stale"), 0);
    }

    #[test]
    fn gauges_overwrite() {
        let mut m = Metrics::new();
        assert_eq!(m.gauge("cache.bytes"), None);
        m.set_gauge("cache.bytes", 10);
        m.set_gauge("cache.bytes", 4);
        assert_eq!(m.gauge("cache.bytes"), Some(4));
    }

    #[test]
    fn histogram_tracks_extremes_and_mean() {
        let mut h = Histogram::default();
        assert_eq!(h.mean(), None);
        h.record(120);
        h.record(30);
        h.record(90);
        assert_eq!((h.count, h.min, h.max, h.sum), (3, 30, 120, 240));
        assert_eq!(h.mean(), Some(80.0));
    }

    #[test]
    fn snapshot_is_sorted_by_name() {
        let mut m = Metrics::new();
        m.inc("transition.commit");
        m.inc("cache.hit");
        m.record("fetch.latency_ms", 40);

        let snap = m.snapshot();
        assert_eq!(
            snap.counters,
            vec![("cache.hit", 1), ("transition.commit", 1)]
        );
        assert!(snap.to_string().contains("fetch.latency_ms: count=1"));
    }
}
