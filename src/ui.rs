use colored::{ColoredString, Colorize};
use reconcile::{Phase, Status};

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

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Colored phase label
pub fn phase(status: &Status) -> ColoredString {
    let label = status.phase.to_string();
    match status.phase {
        Phase::Done => label.green(),
        Phase::Failed => label.red(),
        Phase::Reconciling => label.yellow(),
    }
}

/// Truncate a message for one-line display, keeping the start
pub fn truncate(msg: &str, max_len: usize) -> String {
    if msg.chars().count() <= max_len {
        msg.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let head: String = msg.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::Stage;

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate("short", 20), "short");
        assert_eq!(truncate("exact", 5), "exact");
    }

    #[test]
    fn test_truncate_long() {
        assert_eq!(truncate("secret 'db_pass' not found", 12), "secret 'd...");
    }

    #[test]
    fn test_truncate_edge_cases() {
        assert_eq!(truncate("test", 3), "...");
        assert_eq!(truncate("", 10), "");
    }

    #[test]
    fn test_phase_label_text() {
        colored::control::set_override(false);
        assert_eq!(phase(&Status::done("1.5.0")).to_string(), "Done");
        assert_eq!(
            phase(&Status::failed(Stage::Init, "exit 1")).to_string(),
            "Failed"
        );
    }
}
