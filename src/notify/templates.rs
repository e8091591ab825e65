//! Subjects and bodies of the mails the monitor sends.

use std::time::Duration;

use crate::line::LogLine;

/// Mail sent when errors were logged under a context.
#[must_use]
pub fn error_report<L: AsRef<LogLine>>(
    service: &str,
    context: &str,
    lines: &[L],
) -> (String, String) {
    let subject = format!("{service}: Error during process \"{context}\"");

    let logs: String = lines
        .iter()
        .map(|line| {
            let line = line.as_ref();
            format!("{} {}\n", line.timestamp().unwrap_or("-"), line.message())
        })
        .collect();

    let body = format!(
        "Errors were logged during the process identified as \"{context}\". \
         All logs associated with the process follow.\n\n\
         ==== BEGIN LOGS ASSOCIATED WITH CONTEXT \"{context}\" ====\n\n\
         {logs}"
    );

    (subject, body)
}

/// Mail sent when the log source has gone quiet.
#[must_use]
pub fn inactivity(service: &str, threshold: Duration) -> (String, String) {
    let seconds = format_seconds(threshold);
    let subject = format!("{service}: Nothing logged in {seconds} seconds");
    let body = format!(
        "Nothing has been logged by {service} for a little over {seconds} seconds.\n\
         Check that the log file still exists and is still being written to.\n"
    );
    (subject, body)
}

/// Mail sent when the monitor itself failed.
#[must_use]
pub fn self_diagnostic(service: &str, description: &str) -> (String, String) {
    let subject = format!("{service}: Error in log monitoring system");
    let body = format!(
        "The log monitor hit an error while processing the logs of {service}. \
         Some alerts may have been missed.\n\n\
         ==== BEGIN MONITORING SYSTEM ERROR ====\n\n\
         {description}\n"
    );
    (subject, body)
}

fn format_seconds(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs.fract() == 0.0 {
        format!("{}", duration.as_secs())
    } else {
        format!("{secs}")
    }
}
