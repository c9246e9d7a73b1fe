use std::path::PathBuf;

use clap::Args;
use dayflow_core::{ScheduledItemKind, SchedulerEngine, WorkSettings};

use crate::common::{fmt_time, resolve_path, PlannerFile};

#[derive(Args)]
pub struct PlanArgs {
    /// Planner file (JSON)
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// Print the full ScheduleResult as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: PlanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let path = resolve_path(&args.file);
    let planner = PlannerFile::load(&path)?;
    let inputs = planner.to_inputs(WorkSettings::load_or_default());
    let result = SchedulerEngine::new().compute(&inputs)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.scheduled.is_empty() {
        println!("nothing scheduled");
    }
    for item in &result.scheduled {
        let tag = match item.kind {
            ScheduledItemKind::Task => "task",
            ScheduledItemKind::WorkflowStep => "step",
            ScheduledItemKind::Meeting => "meet",
            ScheduledItemKind::Break => "rest",
            ScheduledItemKind::BlockedTime => "hold",
            ScheduledItemKind::AsyncWait => "wait",
        };
        println!(
            "{} - {}  [{}] {} ({} min)",
            fmt_time(item.start),
            fmt_time(item.end),
            tag,
            item.name,
            item.duration_minutes
        );
    }

    if !result.unscheduled.is_empty() {
        println!("\nunscheduled:");
        for entry in &result.unscheduled {
            println!("  {} ({} min): {}", entry.name, entry.duration_minutes, entry.reason);
        }
    }
    for conflict in &result.conflicts {
        println!("conflict: {}", conflict.message);
    }
    for warning in &result.debug_info.warnings {
        println!("warning: {warning}");
    }
    Ok(())
}
