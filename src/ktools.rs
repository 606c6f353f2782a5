//! External ktools binaries: FM input conversion and the loss pipeline
//!
//! The loss pipeline is
//! `gultobin -S 1 < guls.csv | fmcalc -p <run dir> [-n] -a <rule> | tee ils.bin | fmtocsv > ils.csv`,
//! spawned stage by stage with the pipes wired explicitly. Every stage's exit
//! status is checked; the CSV output only appears once all stages succeeded.
//!
//! `fmcalc -p <dir>` reads `<dir>/fm_programme.bin` and friends, plus
//! `items.bin` and `coverages.bin`, so every binary input goes straight into
//! the run directory.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::fm::FmFile;
use crate::gul::GulFile;

/// fmcalc allocation rule: back-allocate to items by the previous level's allocation
pub const ALLOCATE_TO_ITEMS_BY_PREVIOUS_LEVEL_ALLOC_ID: u32 = 2;

/// Samples per event passed to gultobin; each item carries one sample
pub const SAMPLE_SIZE: u32 = 1;

/// Locates the ktools executables
#[derive(Debug, Clone, Default)]
pub struct Ktools {
    /// Searched first; anything not found there resolves through PATH
    bin_dir: Option<PathBuf>,
}

/// Inputs and outputs of one fmcalc run
#[derive(Debug, Clone)]
pub struct FmRun<'a> {
    pub guls: &'a Path,
    /// Directory holding the binary FM, items and coverages files
    pub run_dir: &'a Path,
    /// Raw binary fmcalc output
    pub snapshot: &'a Path,
    pub output: &'a Path,
    pub net: bool,
    pub alloc_rule: u32,
}

impl Ktools {
    pub fn new(bin_dir: Option<PathBuf>) -> Self {
        Self { bin_dir }
    }

    pub fn program(&self, name: &str) -> PathBuf {
        match &self.bin_dir {
            Some(dir) if dir.join(name).is_file() => dir.join(name),
            _ => PathBuf::from(name),
        }
    }

    /// Convert the FM, items and coverages CSV files in `input_dir` into `<run_dir>/*.bin`
    pub fn convert_fm_inputs(&self, input_dir: &Path, run_dir: &Path) -> Result<()> {
        fs::create_dir_all(run_dir)?;

        let gul = GulFile::ALL
            .iter()
            .filter_map(|f| f.binary_converter().map(|c| (c, f.file_name(), f.binary_file_name())));
        let fm = FmFile::ALL
            .iter()
            .filter_map(|f| f.binary_converter().map(|c| (c, f.file_name(), f.binary_file_name())));

        for (converter, csv_name, bin_name) in gul.chain(fm) {
            let target = run_dir.join(bin_name);
            let status = Command::new(self.program(converter))
                .stdin(File::open(input_dir.join(csv_name))?)
                .stdout(File::create(&target)?)
                .status()?;
            if !status.success() {
                return Err(Error::Execution {
                    stage: converter.to_string(),
                    status,
                });
            }
            debug!("{} -> {}", converter, target.display());
        }

        info!("Converted FM inputs into {}", run_dir.display());
        Ok(())
    }

    /// Run the loss pipeline; on any failure no output file is left behind
    pub fn run_fm_pipeline(&self, run: &FmRun<'_>) -> Result<()> {
        if run.output.exists() {
            fs::remove_file(run.output)?;
        }
        let partial = partial_path(run.output);

        info!(
            "Running gultobin -S {} < {} | fmcalc -p {}{} -a {} | tee {} | fmtocsv > {}",
            SAMPLE_SIZE,
            run.guls.display(),
            run.run_dir.display(),
            if run.net { " -n" } else { "" },
            run.alloc_rule,
            run.snapshot.display(),
            run.output.display()
        );

        let outcome = self.spawn_and_wait(run, &partial);
        match outcome {
            Ok(()) => {
                fs::rename(&partial, run.output)?;
                Ok(())
            }
            Err(e) => {
                if partial.exists() {
                    if let Err(cleanup) = fs::remove_file(&partial) {
                        warn!("Could not remove {}: {}", partial.display(), cleanup);
                    }
                }
                Err(e)
            }
        }
    }

    fn spawn_and_wait(&self, run: &FmRun<'_>, partial: &Path) -> Result<()> {
        let guls = File::open(run.guls)?;
        let csv_out = File::create(partial)?;
        let mut pipeline = Pipeline::default();

        let mut gultobin = Command::new(self.program("gultobin"));
        gultobin
            .arg("-S")
            .arg(SAMPLE_SIZE.to_string())
            .stdin(guls)
            .stdout(Stdio::piped());
        let stream = pipeline.spawn("gultobin", gultobin)?;

        let mut fmcalc = Command::new(self.program("fmcalc"));
        fmcalc.arg("-p").arg(run.run_dir);
        if run.net {
            fmcalc.arg("-n");
        }
        fmcalc
            .arg("-a")
            .arg(run.alloc_rule.to_string())
            .stdin(stream)
            .stdout(Stdio::piped());
        let stream = pipeline.spawn("fmcalc", fmcalc)?;

        let mut tee = Command::new(self.program("tee"));
        tee.arg(run.snapshot).stdin(stream).stdout(Stdio::piped());
        let stream = pipeline.spawn("tee", tee)?;

        let mut fmtocsv = Command::new(self.program("fmtocsv"));
        fmtocsv.stdin(stream).stdout(csv_out);
        pipeline.spawn_last("fmtocsv", fmtocsv)?;

        pipeline.wait()
    }
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    output.with_file_name(name)
}

/// Children of a running pipeline, in stage order
#[derive(Default)]
struct Pipeline {
    stages: Vec<(&'static str, Child)>,
}

impl Pipeline {
    /// Spawn a stage whose stdout feeds the next one
    ///
    /// Takes the command by value so the parent's copies of the stage's pipe
    /// ends close as soon as it is running.
    fn spawn(&mut self, stage: &'static str, command: Command) -> Result<ChildStdout> {
        self.spawn_last(stage, command)?;
        let child = &mut self
            .stages
            .last_mut()
            .ok_or_else(|| io::Error::other("no stage spawned"))?
            .1;
        Ok(child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other(format!("{} stdout not captured", stage)))?)
    }

    fn spawn_last(&mut self, stage: &'static str, mut command: Command) -> Result<()> {
        match command.spawn() {
            Ok(child) => {
                self.stages.push((stage, child));
                Ok(())
            }
            Err(e) => {
                self.abort();
                Err(e.into())
            }
        }
    }

    fn abort(&mut self) {
        for (_, child) in &mut self.stages {
            let _ = child.kill();
            let _ = child.wait();
        }
        self.stages.clear();
    }

    /// Wait for every stage and report the one that failed
    ///
    /// Upstream stages are killed by SIGPIPE when a later stage exits early,
    /// so the furthest-downstream stage that exited with a code is reported.
    /// Stages that only died of a signal are reported when nothing else failed.
    fn wait(mut self) -> Result<()> {
        let mut failures = Vec::new();
        for (stage, mut child) in self.stages.drain(..) {
            let status = child.wait()?;
            debug!("{} exited with {}", stage, status);
            if !status.success() {
                failures.push((stage, status));
            }
        }

        let failed = failures
            .iter()
            .rev()
            .find(|(_, status)| status.code().is_some())
            .or(failures.first());
        match failed {
            Some(&(stage, status)) => Err(Error::Execution {
                stage: stage.to_string(),
                status,
            }),
            None => Ok(()),
        }
    }
}
