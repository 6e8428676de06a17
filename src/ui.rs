use colored::Colorize;
use std::time::{Duration, Instant};
use taskgraph::Observer;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair, padding the key to `width`
pub fn kv(key: &str, value: &str, width: usize) {
    println!("  {}  {}", format!("{key:<width$}").cyan(), value.dimmed());
}

/// Print a step indicator
pub fn step(msg: &str) {
    println!("{} {}", "→".blue().bold(), msg);
}

/// Format an elapsed time for task summaries
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else if secs >= 1 {
        format!("{:.1}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    }
}

// ============================================================================
// Task progress
// ============================================================================

/// Prints task progress to the terminal.
#[derive(Default)]
pub struct TaskReporter {
    started: Vec<(String, Instant)>,
}

impl TaskReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Observer for TaskReporter {
    fn on_task_start(&mut self, task: &str) {
        println!("{} {}", "▶".cyan().bold(), task.bold());
        self.started.push((task.to_string(), Instant::now()));
    }

    fn on_task_finish(&mut self, task: &str, outcome: &taskgraph::Result<()>) {
        let elapsed = match self.started.pop() {
            Some((name, start)) if name == task => format_duration(start.elapsed()),
            _ => String::new(),
        };
        match outcome {
            Ok(()) => success(&format!("{task} {}", elapsed.dimmed())),
            Err(_) => error(&format!("{task} failed {}", elapsed.dimmed())),
        }
    }

    fn on_deferred(&mut self, _task: &str, label: &str) {
        dim(&format!("cleanup: {label}"));
    }

    fn on_deferred_failed(&mut self, task: &str, label: &str, err: &anyhow::Error) {
        warn(&format!("{task}: cleanup '{label}' failed: {err:#}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m05s");
    }

    #[test]
    fn test_reporter_pairs_start_and_finish() {
        let mut reporter = TaskReporter::new();
        reporter.on_task_start("install");
        reporter.on_task_start("deploy");
        reporter.on_task_finish("deploy", &Ok(()));
        assert_eq!(reporter.started.len(), 1);
        reporter.on_task_finish("install", &Ok(()));
        assert!(reporter.started.is_empty());
    }
}
