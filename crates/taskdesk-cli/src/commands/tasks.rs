use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Subcommand};
use std::path::PathBuf;
use taskdesk_core::task::{NewTask, Task, TaskFilter, TaskPriority, TaskStats, TaskStatus, TaskUpdate};
use taskdesk_infrastructure::ConfigService;

use super::utils::open_signed_in;

#[derive(Subcommand)]
pub enum TaskAction {
    /// List your tasks
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Print board statistics instead of the list
        #[arg(long)]
        stats: bool,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a task
    Create {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long, value_parser = parse_priority)]
        priority: Option<TaskPriority>,
        /// YYYY-MM-DD or RFC 3339
        #[arg(long)]
        due: Option<String>,
        /// User id of the assignee
        #[arg(long)]
        assign: Option<i64>,
    },
    /// Change fields of a task
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long, value_parser = parse_status)]
        status: Option<TaskStatus>,
        #[arg(short, long, value_parser = parse_priority)]
        priority: Option<TaskPriority>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        assign: Option<i64>,
    },
    /// Delete a task
    Delete { id: i64 },
    /// Attach a file to a task
    Attach { id: i64, file: PathBuf },
}

#[derive(Args)]
pub struct FilterArgs {
    #[arg(short, long, value_parser = parse_status)]
    status: Option<TaskStatus>,
    #[arg(short, long, value_parser = parse_priority)]
    priority: Option<TaskPriority>,
    /// Only tasks assigned to this user id
    #[arg(long)]
    assignee: Option<i64>,
    /// Substring of title or description
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    overdue: bool,
}

impl From<FilterArgs> for TaskFilter {
    fn from(args: FilterArgs) -> Self {
        TaskFilter {
            status: args.status,
            priority: args.priority,
            assigned_to: args.assignee,
            search: args.search,
            overdue_only: args.overdue,
        }
    }
}

fn parse_status(value: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse(value).ok_or_else(|| {
        format!("unknown status '{value}' (expected open, in_progress, completed or closed)")
    })
}

fn parse_priority(value: &str) -> Result<TaskPriority, String> {
    TaskPriority::parse(value)
        .ok_or_else(|| format!("unknown priority '{value}' (expected low, medium, high or urgent)"))
}

pub async fn run(config_service: &ConfigService, action: TaskAction) -> Result<()> {
    let app = open_signed_in(config_service).await?;
    let tasks = app.tasks();

    match action {
        TaskAction::List {
            filter,
            stats,
            json,
        } => {
            let all = tasks.list_for_current_user().await.context("Failed to list tasks")?;
            let now = Utc::now();
            if stats {
                let stats = TaskStats::compute(&all, now);
                if json {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                } else {
                    print_stats(&stats);
                }
                return Ok(());
            }

            let selected = TaskFilter::from(filter).apply(&all, now);
            if json {
                println!("{}", serde_json::to_string_pretty(&selected)?);
            } else if selected.is_empty() {
                println!("No tasks.");
            } else {
                for task in selected {
                    print_task(task, now);
                }
            }
        }
        TaskAction::Create {
            title,
            description,
            priority,
            due,
            assign,
        } => {
            let task = NewTask {
                description,
                priority: priority.unwrap_or_default(),
                due_date: due,
                assigned_to: assign,
                ..NewTask::new(title)
            };
            let created = tasks.create(&task).await.context("Failed to create task")?;
            println!("✅ Created task #{}: {}", created.id, created.title);
        }
        TaskAction::Update {
            id,
            title,
            description,
            status,
            priority,
            due,
            assign,
        } => {
            let update = TaskUpdate {
                title,
                description,
                status,
                priority,
                due_date: due,
                assigned_to: assign,
                organisation_id: None,
            };
            if update.is_empty() {
                anyhow::bail!("Nothing to update; pass at least one field");
            }
            let updated = tasks.update(id, &update).await.context("Failed to update task")?;
            println!("✅ Updated task #{} [{}]", updated.id, updated.status);
        }
        TaskAction::Delete { id } => {
            tasks.delete(id).await.context("Failed to delete task")?;
            println!("🗑️  Deleted task #{id}");
        }
        TaskAction::Attach { id, file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let file_name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .context("Attachment path has no file name")?;
            let attachment = tasks
                .upload_attachment(id, &file_name, bytes)
                .await
                .context("Failed to upload attachment")?;
            println!("📎 Attached {} to task #{id}", attachment.file_name);
        }
    }

    Ok(())
}

fn print_task(task: &Task, now: chrono::DateTime<Utc>) {
    let due = match task.due_date.as_deref() {
        Some(due) if task.is_overdue_at(now) => format!("  due {due} (overdue)"),
        Some(due) => format!("  due {due}"),
        None => String::new(),
    };
    println!(
        "#{:<5} {:<12} {:<7} {}{}",
        task.id,
        task.status.label(),
        task.priority.label(),
        task.title,
        due
    );
}

fn print_stats(stats: &TaskStats) {
    println!("Total:     {}", stats.total);
    for status in TaskStatus::ALL {
        println!("{:<11}{}", format!("{}:", status.label()), stats.count(status));
    }
    println!("Overdue:   {}", stats.overdue);
    println!("Completed: {:.0}%", stats.completion_rate * 100.0);
}
