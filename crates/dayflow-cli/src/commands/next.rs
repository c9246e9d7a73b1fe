use std::path::PathBuf;

use clap::Args;
use dayflow_core::{select_next, SchedulerEngine, WorkSettings};

use crate::common::{fmt_time, resolve_path, PlannerFile};

#[derive(Args)]
pub struct NextArgs {
    /// Planner file (JSON)
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// Skip cursor: how many upcoming items to cycle past
    #[arg(short, long, default_value_t = 0)]
    pub skip: usize,
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: NextArgs) -> Result<(), Box<dyn std::error::Error>> {
    let path = resolve_path(&args.file);
    let planner = PlannerFile::load(&path)?;
    let inputs = planner.to_inputs(WorkSettings::load_or_default());
    let result = SchedulerEngine::new().compute(&inputs)?;

    match select_next(&result, args.skip, &inputs) {
        Some(next) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&next)?);
            } else {
                let context = next
                    .workflow_name
                    .as_deref()
                    .map(|wf| format!(" ({wf})"))
                    .unwrap_or_default();
                println!(
                    "{}  {}{} -- {} min, {} logged",
                    fmt_time(next.start),
                    next.title,
                    context,
                    next.duration_minutes,
                    next.logged_minutes
                );
            }
        }
        None => println!("nothing next"),
    }
    Ok(())
}
