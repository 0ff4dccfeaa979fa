//! Per-connection outcomes collected by the orchestrators.

use std::ops::AddAssign;

use crate::{PixelflutError, Result};

/// Counters kept by one connection worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Frames fully written to the connection.
    pub frames_sent: u64,
    /// Completed passes over the worker's chunk.
    pub cycles: u64,
    /// Frames read from the connection, valid or not.
    pub frames_received: u64,
    /// Frames written into the canvas.
    pub pixels_applied: u64,
    /// Frames skipped because they did not match the response grammar.
    pub malformed: u64,
    /// Frames skipped because they pointed outside the canvas.
    pub out_of_bounds: u64,
}

impl AddAssign for WorkerStats {
    fn add_assign(&mut self, rhs: Self) {
        self.frames_sent += rhs.frames_sent;
        self.cycles += rhs.cycles;
        self.frames_received += rhs.frames_received;
        self.pixels_applied += rhs.pixels_applied;
        self.malformed += rhs.malformed;
        self.out_of_bounds += rhs.out_of_bounds;
    }
}

/// How one connection ended.
#[derive(Debug)]
pub struct WorkerReport {
    /// Index of the connection within its operation.
    pub connection: usize,
    pub outcome: Result<WorkerStats>,
}

/// Joined outcome of every connection of a [`flut`](crate::flut) or fetch.
#[derive(Debug, Default)]
pub struct Report {
    pub workers: Vec<WorkerReport>,
}

/// Outcome of [`flut`](crate::flut).
pub type FlutReport = Report;

/// Outcome of a fetch, returned by [`FetchHandle::finish`](crate::FetchHandle::finish).
pub type FetchReport = Report;

impl Report {
    /// Failed connections with their error.
    pub fn errors(&self) -> impl Iterator<Item = (usize, &PixelflutError)> {
        self.workers
            .iter()
            .filter_map(|w| w.outcome.as_ref().err().map(|e| (w.connection, e)))
    }

    /// `true` if no connection failed.
    pub fn is_clean(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Sum of the counters of every connection that ended cleanly.
    pub fn totals(&self) -> WorkerStats {
        let mut totals = WorkerStats::default();
        for stats in self.workers.iter().filter_map(|w| w.outcome.as_ref().ok()) {
            totals += *stats;
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_aggregates() {
        let report = Report {
            workers: vec![
                WorkerReport {
                    connection: 0,
                    outcome: Ok(WorkerStats {
                        frames_sent: 10,
                        cycles: 2,
                        ..WorkerStats::default()
                    }),
                },
                WorkerReport {
                    connection: 1,
                    outcome: Err(PixelflutError::Stopped),
                },
                WorkerReport {
                    connection: 2,
                    outcome: Ok(WorkerStats {
                        frames_sent: 5,
                        cycles: 1,
                        ..WorkerStats::default()
                    }),
                },
            ],
        };

        assert!(!report.is_clean());
        let failed: Vec<usize> = report.errors().map(|(i, _)| i).collect();
        assert_eq!(failed, vec![1]);
        assert_eq!(report.totals().frames_sent, 15);
        assert_eq!(report.totals().cycles, 3);
    }
}
