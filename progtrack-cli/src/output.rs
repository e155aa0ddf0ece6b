use anyhow::{Context, Result};
use clap::ValueEnum;
use progtrack_core::{BatchOutcome, ParentSync, Reconciled, Subtask, Task, TaskProgress};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// Short human-readable rendering for `--format text`.
pub trait Render {
    fn render(&self) -> String;
}

pub fn emit<T: Serialize + Render>(format: Format, value: &T) -> Result<()> {
    match format {
        Format::Json => {
            let json = serde_json::to_string_pretty(value).context("serialize output")?;
            println!("{json}");
        }
        Format::Text => println!("{}", value.render()),
    }
    Ok(())
}

fn dates(start: Option<chrono::NaiveDate>, end: Option<chrono::NaiveDate>) -> String {
    match (start, end) {
        (None, None) => String::new(),
        (s, e) => format!(
            "  {}..{}",
            s.map(|d| d.to_string()).unwrap_or_default(),
            e.map(|d| d.to_string()).unwrap_or_default()
        ),
    }
}

impl Render for Task {
    fn render(&self) -> String {
        format!(
            "{}  {:<11} {:>3}%  {}/{}  {} [{}]{}",
            self.id,
            self.progress.status.to_string(),
            self.progress.completion_rate,
            self.progress.actual_equipment_count,
            self.progress.equipment_count,
            self.name,
            self.project_id,
            dates(self.planned_start, self.planned_end)
        )
    }
}

impl Render for Subtask {
    fn render(&self) -> String {
        format!(
            "{}  {:<11} {:>3}%  {}/{}  {}{}",
            self.id,
            self.progress.status.to_string(),
            self.progress.completion_rate,
            self.progress.actual_equipment_count,
            self.progress.equipment_count,
            self.name,
            dates(self.planned_start, self.planned_end)
        )
    }
}

impl<T: Render> Render for Vec<T> {
    fn render(&self) -> String {
        if self.is_empty() {
            return "(none)".to_string();
        }
        self.iter().map(Render::render).collect::<Vec<_>>().join("\n")
    }
}

impl Render for ParentSync {
    fn render(&self) -> String {
        match self {
            ParentSync::Updated(task) => format!("parent updated: {}", task.render()),
            ParentSync::Skipped(reason) => format!("parent skipped: {reason:?}"),
        }
    }
}

impl<T: Render> Render for Reconciled<T> {
    fn render(&self) -> String {
        format!("{}\n{}", self.entity.render(), self.parent.render())
    }
}

impl Render for BatchOutcome {
    fn render(&self) -> String {
        let mut lines: Vec<String> = self.subtasks.iter().map(Render::render).collect();
        for (task_id, sync) in &self.parents {
            lines.push(format!("{task_id}: {}", sync.render()));
        }
        lines.join("\n")
    }
}

impl Render for TaskProgress {
    fn render(&self) -> String {
        let mut out = self.task.render();
        let d = &self.distribution;
        out.push_str(&format!(
            "\nequipment: planned {} allocated {} remaining {} actual {}{}",
            d.planned,
            d.allocated,
            d.remaining,
            d.actual,
            if d.over_allocated { " (over-allocated)" } else { "" }
        ));
        if !self.in_sync {
            out.push_str("\nstored progress is stale; run `progtrack task reconcile`");
        }
        for s in &self.subtasks {
            out.push_str("\n  ");
            out.push_str(&s.render());
        }
        out
    }
}
