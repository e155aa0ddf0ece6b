use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use progtrack_core::{Status, TaskInput};

use crate::output::{emit, Format};
use crate::{App, UpdateArgs};

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Create a task
    Create {
        #[arg(long)]
        project: String,

        #[arg(long)]
        name: String,

        /// Planned equipment count
        #[arg(long)]
        equipment: Option<i64>,

        #[arg(long)]
        engineering: Option<String>,

        /// 0 = high, 1 = normal, 2 = low
        #[arg(long)]
        priority: Option<i32>,

        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Patch task fields
    Update {
        id: String,

        #[command(flatten)]
        fields: UpdateArgs,
    },

    /// Set status (todo | in-progress | done)
    Status { id: String, status: Status },

    /// Set completion rate (0-100)
    Rate { id: String, rate: i32 },

    /// Set installed equipment count
    Actual { id: String, count: i64 },

    /// Carve planned equipment out of a task into a new subtask
    Split {
        id: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        equipment: i64,
    },

    /// Recompute a task from its subtasks
    Reconcile { id: String },

    /// Show a task with its subtasks and equipment distribution
    Show { id: String },

    /// List tasks
    List {
        #[arg(long)]
        project: Option<String>,
    },

    /// Delete a task and its subtasks
    Delete { id: String },
}

pub async fn run(app: &App, format: Format, command: TaskCommand) -> Result<()> {
    match command {
        TaskCommand::Create {
            project,
            name,
            equipment,
            engineering,
            priority,
            start,
            end,
        } => {
            let task = app
                .create_task(TaskInput {
                    name,
                    project_id: project,
                    engineering_id: engineering,
                    priority,
                    equipment_count: equipment,
                    planned_start: start,
                    planned_end: end,
                    ..TaskInput::default()
                })
                .await?;
            emit(format, &task)
        }
        TaskCommand::Update { id, fields } => emit(format, &app.update_task(&id, fields.into()).await?),
        TaskCommand::Status { id, status } => {
            emit(format, &app.update_task_status(&id, status).await?)
        }
        TaskCommand::Rate { id, rate } => emit(format, &app.update_task_completion(&id, rate).await?),
        TaskCommand::Actual { id, count } => {
            emit(format, &app.set_task_actual_equipment(&id, count).await?)
        }
        TaskCommand::Split {
            id,
            name,
            equipment,
        } => emit(format, &app.split_task(&id, &name, equipment).await?),
        TaskCommand::Reconcile { id } => emit(format, &app.reconcile_task(&id).await?),
        TaskCommand::Show { id } => emit(format, &app.task_progress(&id).await?),
        TaskCommand::List { project } => emit(format, &app.list_tasks(project.as_deref()).await?),
        TaskCommand::Delete { id } => {
            app.delete_task(&id).await?;
            if format == Format::Text {
                println!("deleted task {id}");
            }
            Ok(())
        }
    }
}
