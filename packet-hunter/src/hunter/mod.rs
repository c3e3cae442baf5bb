pub mod naming;

use std::fmt;
use std::fmt::Formatter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use packet_hunter_schemas::cli_models::HuntSettings;
use packet_hunter_schemas::filter_config::{FilterConfig, FilterConfigError, FilterSpec};
use crate::error::HunterError;
use crate::hunter::naming::{extract_file_name, list_captures, list_fragments, merged_file_name};
use crate::tools::{mergecap, tshark, CommandRunner};

/// Format of the timestamp shared by every file written during one hunt
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// The stages a hunt moves through. A hunt that fails before `DestinationsReady` never touches the
/// destination, the error is returned from `PacketHunter::new` instead and there is no hunter to
/// hold a stage. `Failed` is where `run` leaves a hunt it had to abandon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuntStage {
    Init,
    Validated,
    FiltersLoaded,
    DestinationsReady,
    Extracting,
    Merging,
    Done,
    Failed,
}

impl fmt::Display for HuntStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            HuntStage::Init => "init",
            HuntStage::Validated => "validated",
            HuntStage::FiltersLoaded => "filters loaded",
            HuntStage::DestinationsReady => "destinations ready",
            HuntStage::Extracting => "extracting",
            HuntStage::Merging => "merging",
            HuntStage::Done => "done",
            HuntStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What happened during a hunt. Tool failures do not stop the hunt, they are kept here so the
/// caller can decide what to do with them.
#[derive(Debug, Default)]
pub struct RunReport {
    pub captures: usize,
    pub extractions: usize,
    pub merges: usize,
    pub fragments_removed: usize,
    pub failures: Vec<HunterError>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} capture(s), {} extraction(s), {} merge(s), {} fragment(s) removed, {} failure(s)",
            self.captures, self.extractions, self.merges, self.fragments_removed, self.failures.len(),
        )
    }
}

/// One hunt over a capture file or a folder of captures. Constructing the hunter checks the
/// inputs, reads the filters and prepares a folder per filter in the destination; `run` then
/// extracts and, for a folder of captures, merges.
pub struct PacketHunter {
    source: PathBuf,
    destination: PathBuf,
    config: PathBuf,
    filters: Vec<FilterSpec>,
    date_time: String,
    batch: bool,
    stage: HuntStage,
    settings: HuntSettings,
    runner: Arc<dyn CommandRunner + Send + Sync>,
}

impl PacketHunter {
    pub async fn new(
        source: PathBuf,
        destination: PathBuf,
        config: PathBuf,
        filter_override: Option<&[String]>,
        settings: HuntSettings,
        runner: Arc<dyn CommandRunner + Send + Sync>,
    ) -> Result<Self, HunterError> {
        let date_time = chrono::Local::now().format(DATE_TIME_FORMAT).to_string();
        let mut hunter = Self {
            source,
            destination,
            config,
            filters: Vec::new(),
            date_time,
            batch: false,
            stage: HuntStage::Init,
            settings,
            runner,
        };
        hunter.verify_files()?;
        hunter.read_filters(filter_override).await?;
        hunter.create_destination().await?;
        Ok(hunter)
    }

    pub fn filters(&self) -> &[FilterSpec] {
        &self.filters
    }

    pub fn date_time(&self) -> &str {
        &self.date_time
    }

    pub fn is_batch(&self) -> bool {
        self.batch
    }

    pub fn stage(&self) -> HuntStage {
        self.stage
    }

    fn set_stage(&mut self, stage: HuntStage) {
        tracing::debug!("hunt stage: {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    /// Both the source and the config must exist. A source folder means a batch hunt that ends
    /// with merging the extracts of every capture.
    fn verify_files(&mut self) -> Result<(), HunterError> {
        if !self.source.exists() {
            return Err(HunterError::SourceNotFound { path: self.source.clone() });
        }
        if !self.config.exists() {
            return Err(HunterError::ConfigNotFound { path: self.config.clone() });
        }
        self.batch = self.source.is_dir();
        self.set_stage(HuntStage::Validated);
        Ok(())
    }

    async fn read_filters(&mut self, filter_override: Option<&[String]>) -> Result<(), HunterError> {
        let malformed = |source: FilterConfigError| HunterError::ConfigMalformed {
            path: self.config.clone(),
            source,
        };
        let config = FilterConfig::load_from_file(&self.config).await.map_err(malformed)?;
        self.filters = config.select(filter_override);
        tracing::info!(
            "loaded {} filter(s) from {}: {}",
            self.filters.len(),
            self.config.display(),
            self.filters.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(", "),
        );
        self.set_stage(HuntStage::FiltersLoaded);
        Ok(())
    }

    /// Make sure every filter has a folder in the destination. Existing folders and their
    /// contents are left alone.
    async fn create_destination(&mut self) -> Result<(), HunterError> {
        for filter in &self.filters {
            let filter_dir = self.destination.join(&filter.name);
            tokio::fs::create_dir_all(&filter_dir)
                .await
                .map_err(|err| HunterError::io("creating destination folder", &filter_dir, err))?;
        }
        self.set_stage(HuntStage::DestinationsReady);
        Ok(())
    }

    /// Run the hunt to completion. Only errors that prevent the hunt from continuing at all are
    /// returned, tool failures are in the report.
    pub async fn run(&mut self) -> Result<RunReport, HunterError> {
        match self.run_stages().await {
            Ok(report) => {
                self.set_stage(HuntStage::Done);
                tracing::info!("hunt finished: {report}");
                Ok(report)
            }
            Err(err) => {
                self.set_stage(HuntStage::Failed);
                Err(err)
            }
        }
    }

    async fn run_stages(&mut self) -> Result<RunReport, HunterError> {
        let mut report = RunReport::default();
        self.set_stage(HuntStage::Extracting);
        if self.batch {
            let captures = list_captures(&self.source, &self.settings.capture_extension)?;
            if captures.is_empty() {
                tracing::warn!(
                    "no *.{} captures found in {}",
                    self.settings.capture_extension,
                    self.source.display(),
                );
            }
            for capture in &captures {
                self.extract_filter(capture, &mut report).await?;
            }
            self.set_stage(HuntStage::Merging);
            self.merge_filters(&mut report).await?;
        } else {
            self.extract_filter(&self.source, &mut report).await?;
        }
        Ok(report)
    }

    /// Run every filter over one capture.
    pub async fn extract_filter(&self, source: &Path, report: &mut RunReport) -> Result<(), HunterError> {
        tracing::info!("Stage: extracting packets from {}", source.display());
        report.captures += 1;
        for filter in &self.filters {
            let output = self.destination
                .join(&filter.name)
                .join(extract_file_name(source, &self.date_time, self.batch));
            let cmd = tshark::extract_command(&self.settings.tshark, source, &filter.expression, &output)?;
            match self.runner.run(cmd).await {
                Ok(_) => {
                    tracing::debug!("filter {} written to {}", filter.name, output.display());
                    report.extractions += 1;
                }
                Err(err) => {
                    tracing::error!("filter {} failed on {}: {err:#}", filter.name, source.display());
                    report.failures.push(err);
                }
            }
        }
        Ok(())
    }

    /// Merge the fragments of every filter, see `merge_packets`.
    pub async fn merge_filters(&self, report: &mut RunReport) -> Result<(), HunterError> {
        tracing::info!("Stage: merging extracted packets");
        for filter in &self.filters {
            self.merge_packets(&filter.name, report).await?;
        }
        Ok(())
    }

    /// Merge all fragments in a filter's folder into `all-<filter>-<time>.<ext>` and remove the
    /// fragments. If mergecap fails the fragments are kept so nothing extracted is lost.
    pub async fn merge_packets(&self, filter_name: &str, report: &mut RunReport) -> Result<(), HunterError> {
        let merge_path = self.destination.join(filter_name);
        let fragments = list_fragments(&merge_path, &self.settings.capture_extension)?;
        if fragments.is_empty() {
            tracing::warn!("no fragments to merge for filter {filter_name}, skipping");
            return Ok(());
        }

        let destination = merge_path.join(merged_file_name(
            filter_name,
            &self.date_time,
            &self.settings.capture_extension,
        ));
        let cmd = mergecap::merge_command(&self.settings.mergecap, &destination, &fragments)?;
        if let Err(err) = self.runner.run(cmd).await {
            tracing::error!("merging {} fragment(s) for filter {filter_name} failed, keeping them: {err:#}", fragments.len());
            report.failures.push(err);
            return Ok(());
        }
        report.merges += 1;
        tracing::info!("merged {} fragment(s) into {}", fragments.len(), destination.display());

        for fragment in fragments {
            match tokio::fs::remove_file(&fragment).await {
                Ok(_) => report.fragments_removed += 1,
                Err(err) => {
                    tracing::error!("could not remove fragment {}: {err:#}", fragment.display());
                    report.failures.push(HunterError::io("removing fragment", fragment, err));
                }
            }
        }
        Ok(())
    }
}
