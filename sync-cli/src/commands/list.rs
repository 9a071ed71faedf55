//! Show tasks.

use anyhow::Result;
use sync_types::{PriorityFilter, StatusFilter, Task};

use crate::config::Settings;
use crate::session::Session;

/// Run the list command.
pub async fn run(settings: &Settings, priority: PriorityFilter, status: StatusFilter) -> Result<()> {
    let session = Session::open(settings).await?;
    session.sync.set_filter_priority(priority);
    session.sync.set_filter_status(status);

    let state = session.sync.state();
    let visible = state.visible_tasks();
    if visible.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    for task in &visible {
        println!("{}", format_task_line(task));
    }
    if visible.len() < state.tasks().len() {
        println!();
        println!(
            "{} of {} tasks shown (priority: {}, status: {})",
            visible.len(),
            state.tasks().len(),
            priority,
            status
        );
    }
    Ok(())
}

/// One line per task: completion box, due date, priority, title, id.
fn format_task_line(task: &Task) -> String {
    let mark = if task.completed { "[x]" } else { "[ ]" };
    let due = if task.due_date.is_empty() {
        "----------"
    } else {
        task.due_date.as_str()
    };
    let mut line = format!(
        "{} {} {:<6} {}  ({})",
        mark,
        due,
        task.priority.as_str(),
        task.title,
        task.id
    );
    if !task.description.is_empty() {
        line.push_str("\n      ");
        line.push_str(&task.description);
    }
    line
}
