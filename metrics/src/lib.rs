/*
 * Copyright 2020 Nikhil Marathe <nsm.nikhil@gmail.com>
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Scoped timing metrics.
//!
//! A `scoped_metric!("name")` statement records how long the rest of the enclosing scope took.
//! Recording is off until [`enable`] is called, in which case the macro costs one atomic load.
//! Metrics are kept per thread; scanning and planning run on the configuration thread, so that is
//! where [`dump`] should be called from.

use std::{
    cell::RefCell,
    fmt,
    sync::atomic::{AtomicBool, Ordering},
    thread_local,
    time::{Duration, Instant},
};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub name: &'static str,
    pub count: usize,
    /// Total time in microseconds.
    pub total: u128,
}

impl Summary {
    fn record(&mut self, elapsed: Duration) {
        self.count += 1;
        self.total += elapsed.as_micros();
    }

    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total as f64 / self.count as f64
        }
    }
}

pub struct ScopedMetric {
    index: usize,
    start: Instant,
}

impl ScopedMetric {
    pub fn new(index: usize) -> Self {
        ScopedMetric {
            index,
            start: Instant::now(),
        }
    }
}

impl Drop for ScopedMetric {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        METRICS.with(|m| m.borrow_mut().record(self.index, elapsed));
    }
}

#[derive(Debug, Default)]
struct Metrics {
    summaries: Vec<Summary>,
}

impl Metrics {
    fn register(&mut self, name: &'static str) -> usize {
        // Registration happens once per call site per thread, but two call sites may share a name.
        if let Some(index) = self.summaries.iter().position(|s| s.name == name) {
            return index;
        }
        self.summaries.push(Summary {
            name,
            ..Default::default()
        });
        self.summaries.len() - 1
    }

    fn record(&mut self, index: usize, elapsed: Duration) {
        self.summaries[index].record(elapsed);
    }
}

impl Metrics {
    /// Summaries that were hit at least once, slowest first. Ties keep registration order.
    fn ranked(&self) -> Vec<&Summary> {
        let mut ranked: Vec<&Summary> = self.summaries.iter().filter(|s| s.count > 0).collect();
        ranked.sort_by(|a, b| b.total.cmp(&a.total));
        ranked
    }
}

/// One row per metric, slowest first, with its share of the time all metrics recorded. Scopes
/// nest, so shares add up to more than 100% when they do.
impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ranked = self.ranked();
        let width = ranked
            .iter()
            .map(|s| s.name.len())
            .chain(Some("metric".len()))
            .max()
            .unwrap_or_default();
        let all: u128 = ranked.iter().map(|s| s.total).sum();

        writeln!(
            f,
            "{:<width$}  {:>6}  {:>11}  {:>9}  {:>6}",
            "metric",
            "count",
            "total (us)",
            "avg (us)",
            "share",
            width = width
        )?;
        for summary in ranked {
            let share = if all == 0 {
                0.0
            } else {
                summary.total as f64 * 100.0 / all as f64
            };
            writeln!(
                f,
                "{:<width$}  {:>6}  {:>11}  {:>9.1}  {:>5.1}%",
                summary.name,
                summary.count,
                summary.total,
                summary.average(),
                share,
                width = width
            )?;
        }
        Ok(())
    }
}

#[macro_export]
macro_rules! scoped_metric {
    ($name:literal) => {
        let _scoped_metric = if $crate::is_enabled() {
            thread_local! {
                static METRIC_INDEX: usize = $crate::register($name);
            }
            ::core::option::Option::Some($crate::ScopedMetric::new(
                METRIC_INDEX.with(|index| *index),
            ))
        } else {
            ::core::option::Option::None
        };
    };
}

thread_local! {
    static METRICS: RefCell<Metrics> = RefCell::new(Metrics::default());
}
static ENABLED: AtomicBool = AtomicBool::new(false);

pub fn enable() {
    ENABLED.store(true, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Registers `name` for the current thread. Used by `scoped_metric!`.
pub fn register(name: &'static str) -> usize {
    METRICS.with(|m| m.borrow_mut().register(name))
}

/// The metrics recorded so far on this thread, in registration order.
pub fn snapshot() -> Vec<Summary> {
    METRICS.with(|m| m.borrow().summaries.clone())
}

pub fn dump() {
    METRICS.with(|m| {
        eprintln!("{}", m.borrow());
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn timed_twice() {
        for _ in 0..2 {
            scoped_metric!("timed_twice");
        }
    }

    #[test]
    fn records_only_when_enabled() {
        // Thread local, so other tests in this binary do not interfere.
        std::thread::spawn(|| {
            timed_twice();
            assert!(snapshot().is_empty());
            enable();
            timed_twice();
            let summaries = snapshot();
            let summary = summaries
                .iter()
                .find(|s| s.name == "timed_twice")
                .expect("metric registered");
            assert_eq!(summary.count, 2);
        })
        .join()
        .expect("thread succeeded");
    }

    #[test]
    fn shared_names_share_a_slot() {
        let mut metrics = Metrics::default();
        let a = metrics.register("stat");
        let b = metrics.register("read");
        let c = metrics.register("stat");
        assert_eq!(a, c);
        assert_ne!(a, b);
        metrics.record(a, Duration::from_micros(10));
        metrics.record(c, Duration::from_micros(30));
        assert_eq!(metrics.summaries[a].count, 2);
        assert_eq!(metrics.summaries[a].total, 40);
        assert_eq!(metrics.summaries[a].average(), 20.0);
        assert_eq!(metrics.summaries[b].average(), 0.0);
    }

    #[test]
    fn table_ranks_by_total_time() {
        let mut metrics = Metrics::default();
        let scan = metrics.register("scan");
        let plan = metrics.register("plan");
        metrics.register("never_hit");
        metrics.record(scan, Duration::from_micros(25));
        metrics.record(plan, Duration::from_micros(50));
        metrics.record(plan, Duration::from_micros(25));

        let table = metrics.to_string();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(
            lines,
            vec![
                "metric   count   total (us)   avg (us)   share",
                "plan         2           75       37.5   75.0%",
                "scan         1           25       25.0   25.0%",
            ]
        );
    }
}
