use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use dayflow_core::{DiagnosticsSummary, SchedulerEngine, WorkSettings};

use crate::common::{resolve_path, PlannerFile};

#[derive(Args)]
pub struct DiagnosticsArgs {
    /// Planner file (JSON)
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// Write the summary to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: DiagnosticsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let path = resolve_path(&args.file);
    let planner = PlannerFile::load(&path)?;
    let inputs = planner.to_inputs(WorkSettings::load_or_default());

    let (result, last_error) = match SchedulerEngine::new().compute(&inputs) {
        Ok(result) => (result, None),
        Err(err) => (Default::default(), Some(err.to_string())),
    };
    let summary = DiagnosticsSummary::from_result(&result, last_error, Utc::now());
    let json = summary.to_json()?;

    match args.output {
        Some(out) => {
            std::fs::write(&out, json)?;
            println!("wrote {}", out.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
