use std::path::PathBuf;

use clap::Subcommand;
use dayflow_core::Task;

use crate::common::{resolve_path, PlannerFile};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task to the planner file
    Add {
        /// Task name
        name: String,
        /// Estimated duration in minutes
        #[arg(short, long)]
        minutes: u32,
        /// Work type id
        #[arg(short, long, default_value = "focus")]
        work_type: String,
        /// Importance (0-100)
        #[arg(long, default_value_t = 50)]
        importance: u32,
        /// Urgency (0-100)
        #[arg(long, default_value_t = 50)]
        urgency: u32,
        /// Planner file (JSON)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// List tasks
    List {
        #[arg(long)]
        json: bool,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Mark a task completed
    Done {
        /// Task id
        id: String,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TaskAction::Add {
            name,
            minutes,
            work_type,
            importance,
            urgency,
            file,
        } => {
            let path = resolve_path(&file);
            let mut planner = PlannerFile::load(&path)?;
            let task = Task::new(name, minutes, work_type).with_priority(importance, urgency);
            println!("added {}", task.id);
            planner.tasks.push(task);
            planner.save(&path)?;
        }
        TaskAction::List { json, file } => {
            let path = resolve_path(&file);
            let planner = PlannerFile::load(&path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&planner.tasks)?);
            } else {
                for task in &planner.tasks {
                    let mark = if task.completed { "x" } else { " " };
                    println!(
                        "[{mark}] {}  {} ({} min, {})",
                        task.id, task.name, task.duration_minutes, task.work_type_id
                    );
                }
            }
        }
        TaskAction::Done { id, file } => {
            let path = resolve_path(&file);
            let mut planner = PlannerFile::load(&path)?;
            let task = planner
                .tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| format!("no task with id '{id}'"))?;
            task.completed = true;
            planner.save(&path)?;
            println!("completed {id}");
        }
    }
    Ok(())
}
