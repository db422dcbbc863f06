use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

#[cfg(feature = "indicatif")]
use indicatif::{ProgressBar, ProgressStyle};

use crate::collect::overpass::filters::InfrastructureFilter;
use crate::geo_core::Shape;
use crate::measure::{LengthSource, Measurer, ResultRow};

#[cfg(feature = "indicatif")]
fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>4}/{len:4} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

/// One boundary to measure, optionally as of a past date.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub name: String,
    pub date: Option<String>,
}

/// One job per name, latest data.
pub fn current_jobs<S: AsRef<str>>(names: &[S]) -> Vec<Job> {
    names
        .iter()
        .map(|name| Job {
            name: name.as_ref().to_string(),
            date: None,
        })
        .collect()
}

/// Every name for every date; dates are the outer loop.
pub fn historic_jobs<S: AsRef<str>, D: AsRef<str>>(names: &[S], dates: &[D]) -> Vec<Job> {
    dates
        .iter()
        .flat_map(|date| {
            names.iter().map(move |name| Job {
                name: name.as_ref().to_string(),
                date: Some(date.as_ref().to_string()),
            })
        })
        .collect()
}

/// Receives finished rows as they are produced.
pub trait ResultSink {
    fn write_row(&mut self, row: &ResultRow) -> Result<()>;
}

/// CSV rows: name, [date], road length, cycle length, ratio, one column per filter.
/// Flushed after every row so an interrupted batch keeps what it measured.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    with_date: bool,
}

impl CsvSink<File> {
    pub fn create(path: &Path, filters: &[InfrastructureFilter], with_date: bool) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        Self::from_writer(file, filters, with_date)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(writer: W, filters: &[InfrastructureFilter], with_date: bool) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);

        let mut header = vec!["name"];
        if with_date {
            header.push("date");
        }
        header.extend(["road_length", "cycle_length", "ratio"]);
        header.extend(filters.iter().map(|f| f.name));
        writer.write_record(&header).context("Failed to write CSV header")?;
        writer.flush().context("Failed to flush CSV header")?;

        Ok(CsvSink { writer, with_date })
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e.error()))
    }
}

impl<W: Write> ResultSink for CsvSink<W> {
    fn write_row(&mut self, row: &ResultRow) -> Result<()> {
        let mut record = vec![row.name.clone()];
        if self.with_date {
            record.push(row.date.clone().unwrap_or_default());
        }
        record.push(row.road_length.to_string());
        record.push(row.cycle_length.to_string());
        record.push(row.ratio.to_string());
        record.extend(row.lengths.iter().map(|l| l.to_string()));

        self.writer
            .write_record(&record)
            .with_context(|| format!("Failed to write CSV row for {}", row.name))?;
        self.writer.flush().context("Failed to flush CSV row")?;
        Ok(())
    }
}

/// A job that produced no row.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub name: String,
    pub date: Option<String>,
    pub error: String,
    /// The boundary itself is unusable, so every date of it fails the same way.
    pub invalid_boundary: bool,
}

impl BatchFailure {
    fn new(job: &Job, error: &crate::Error) -> Self {
        BatchFailure {
            name: job.name.clone(),
            date: job.date.clone(),
            error: error.to_string(),
            invalid_boundary: error.is_geometry(),
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub rows: usize,
    pub failures: Vec<BatchFailure>,
}

/// Measures jobs one after another. A failing job is recorded and skipped;
/// only a sink error stops the batch.
pub struct BatchRunner<'a, S: LengthSource> {
    measurer: &'a Measurer,
    source: &'a mut S,
    filters: &'a [InfrastructureFilter],
    pause: Duration,
}

impl<'a, S: LengthSource> BatchRunner<'a, S> {
    pub fn new(measurer: &'a Measurer, source: &'a mut S, filters: &'a [InfrastructureFilter]) -> Self {
        BatchRunner {
            measurer,
            source,
            filters,
            pause: Duration::ZERO,
        }
    }

    /// Sleep between two jobs.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Run every job, loading boundaries through `load`.
    /// Fragments are prepared once per name and reused across dates.
    pub fn run<L>(&mut self, jobs: &[Job], mut load: L, sink: &mut dyn ResultSink) -> Result<BatchReport>
    where
        L: FnMut(&str) -> crate::Result<Shape>,
    {
        let mut report = BatchReport::default();
        let mut fragments: HashMap<String, Vec<String>> = HashMap::new();

        #[cfg(feature = "indicatif")]
        let pb = {
            let pb = ProgressBar::new(jobs.len() as u64);
            pb.set_style(progress_style());
            pb
        };

        for (index, job) in jobs.iter().enumerate() {
            #[cfg(feature = "indicatif")]
            pb.set_message(job.name.clone());

            if index > 0 && !self.pause.is_zero() {
                std::thread::sleep(self.pause);
            }

            if !fragments.contains_key(&job.name) {
                let prepared = load(&job.name).and_then(|shape| self.measurer.fragments(shape));
                match prepared {
                    Ok(prepared) => {
                        fragments.insert(job.name.clone(), prepared);
                    }
                    Err(e) => {
                        let failure = BatchFailure::new(job, &e);
                        if failure.invalid_boundary {
                            warn!(name = %job.name, error = %e, "skipping invalid boundary");
                        } else {
                            warn!(name = %job.name, error = %e, "skipping boundary");
                        }
                        report.failures.push(failure);
                        #[cfg(feature = "indicatif")]
                        pb.inc(1);
                        continue;
                    }
                }
            }
            let Some(prepared) = fragments.get(&job.name) else {
                continue;
            };

            let date = job.date.as_deref();
            match Measurer::sum_lengths(prepared, self.source, self.filters, date) {
                Ok(totals) => {
                    let row = ResultRow::from_lengths(&job.name, date, totals);
                    info!(
                        name = %row.name,
                        date = date.unwrap_or("latest"),
                        road = row.road_length,
                        cycle = row.cycle_length,
                        ratio = row.ratio,
                        "boundary measured"
                    );
                    sink.write_row(&row)?;
                    report.rows += 1;
                }
                Err(e) => {
                    warn!(name = %job.name, date = date.unwrap_or("latest"), error = %e, "measurement failed");
                    report.failures.push(BatchFailure::new(job, &e));
                }
            }

            #[cfg(feature = "indicatif")]
            pb.inc(1);
        }

        #[cfg(feature = "indicatif")]
        pb.finish_with_message("done");

        Ok(report)
    }
}
