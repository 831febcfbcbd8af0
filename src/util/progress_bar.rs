
use indicatif::{ProgressState, ProgressStyle};

/// Template for per-sample progress; sample-level jobs are long, so rate is not shown
const PROGRESS_TEMPLATE: &str = "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({percent}); ETA: {eta_precise} {msg}";

/// Shared function to pull our progress bar styling
pub fn get_progress_style() -> ProgressStyle {
    match ProgressStyle::with_template(PROGRESS_TEMPLATE) {
        Ok(style) => style
            .with_key("percent", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                write!(w, "{:.1}%", state.fraction() * 100.0).unwrap()
            })
            .progress_chars("##-"),
        // fall back to the plain bar if indicatif rejects the template
        Err(_) => ProgressStyle::default_bar()
    }
}
