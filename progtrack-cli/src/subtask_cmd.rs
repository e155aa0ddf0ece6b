use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Subcommand;
use progtrack_core::{ActualEquipmentUpdate, Status, SubtaskInput};
use std::io::Read;
use std::path::PathBuf;

use crate::output::{emit, Format};
use crate::{App, UpdateArgs};

#[derive(Subcommand, Debug)]
pub enum SubtaskCommand {
    /// Create a subtask under a task
    Create {
        #[arg(long)]
        task: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        equipment: Option<i64>,

        #[arg(long)]
        actual: Option<i64>,

        /// Template the subtask was stamped from
        #[arg(long)]
        template: Option<String>,

        #[arg(long)]
        priority: Option<i32>,

        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Patch subtask fields
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

    /// Apply `[{"id": .., "actual_equipment_count": ..}]` from a JSON file (`-` for stdin)
    Batch { file: PathBuf },

    Show { id: String },

    /// List the subtasks of a task
    List { task: String },

    Delete { id: String },
}

fn read_batch(file: &PathBuf) -> Result<Vec<ActualEquipmentUpdate>> {
    let raw = if file.as_os_str() == "-" {
        let mut s = String::new();
        std::io::stdin()
            .read_to_string(&mut s)
            .context("read batch from stdin")?;
        s
    } else {
        std::fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?
    };
    serde_json::from_str(&raw).context("parse batch JSON")
}

pub async fn run(app: &App, format: Format, command: SubtaskCommand) -> Result<()> {
    match command {
        SubtaskCommand::Create {
            task,
            name,
            equipment,
            actual,
            template,
            priority,
            start,
            end,
        } => {
            let created = app
                .create_subtask(SubtaskInput {
                    task_id: task,
                    parent_template_id: template,
                    name,
                    priority,
                    equipment_count: equipment,
                    actual_equipment_count: actual,
                    planned_start: start,
                    planned_end: end,
                    ..SubtaskInput::default()
                })
                .await?;
            emit(format, &created)
        }
        SubtaskCommand::Update { id, fields } => {
            emit(format, &app.update_subtask(&id, fields.into()).await?)
        }
        SubtaskCommand::Status { id, status } => {
            emit(format, &app.update_subtask_status(&id, status).await?)
        }
        SubtaskCommand::Rate { id, rate } => {
            emit(format, &app.update_subtask_completion(&id, rate).await?)
        }
        SubtaskCommand::Actual { id, count } => {
            emit(format, &app.set_subtask_actual_equipment(&id, count).await?)
        }
        SubtaskCommand::Batch { file } => {
            let updates = read_batch(&file)?;
            emit(format, &app.batch_update_actual_equipment(&updates).await?)
        }
        SubtaskCommand::Show { id } => emit(format, &app.get_subtask(&id).await?),
        SubtaskCommand::List { task } => emit(format, &app.list_subtasks(&task).await?),
        SubtaskCommand::Delete { id } => emit(format, &app.delete_subtask(&id).await?),
    }
}
