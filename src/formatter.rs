use rand::seq::SliceRandom;
use serde::Serialize;

use crate::collector::ErrorReport;
use crate::incident::Incident;

const UNKNOWN_KIND: &str = "UnknownError";
const UNKNOWN_MESSAGE: &str = "An unknown error occurred. Refer to the full Traceback.";

/// Friendly opening lines for the issue body. Pure decoration.
pub const LEAD_INS: &[&str] = &[
    "Oh no! Something went wrong!",
    "Oops! An error occurred.",
    "Uh-oh! We hit a snag.",
    "Yikes! An error happened.",
    "Something broke! We're on it.",
    "Whoops! That didn't go as planned.",
    "Oh dear! An unexpected error occurred.",
    "Drat! Something went wrong.",
    "Snap! We encountered an issue.",
    "Oh snap! An error occurred.",
    "Hmmm... Something isn't right.",
    "Oh no! We've run into a problem.",
    "Oopsie! Something went wrong.",
    "Oh crumbs! An error occurred.",
    "Oh fiddlesticks! Something broke.",
    "Oh bother! We hit a snag.",
    "Oh no! The app encountered an issue.",
    "Oops! Looks like something crashed.",
    "Oh no! Something unexpected happened.",
    "Oh dear! We encountered a hiccup.",
    "Yikes! That wasn't supposed to happen.",
    "Oh no! Something's not working as expected.",
    "Oops! We ran into a technical issue.",
    "Oh no! The app tripped over something.",
    "Whoops! Something went sideways.",
    "Oh no! We've encountered a glitch.",
    "Oops! Something didn't go as planned.",
    "Oh no! We've hit a roadblock.",
    "Oops! Something went off the rails.",
    "Oh no! We've encountered turbulence.",
    "Oops! Something's gone awry.",
    "Oh no! We've hit a bump in the road.",
    "Oops! Something's not quite right.",
    "Oh no! We've run into a snag.",
    "Oops! Something's acting up.",
    "Oh no! We've encountered a hiccup in the system.",
    "Oops! Something's misbehaving.",
    "Oh no! We've hit a technical snag.",
    "Oops! Something's gone haywire.",
    "Oh no! We've encountered a gremlin in the system.",
];

/// Picks the opening line. Swappable so tests get a fixed body.
pub type LeadIn = fn() -> &'static str;

pub fn random_lead_in() -> &'static str {
    LEAD_INS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(LEAD_INS[0])
}

/// Title and body of an issue; also the JSON payload sent to the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueDraft {
    pub title: String,
    pub body: String,
}

/// `"<Kind>: <message> at <file>, line <line>"` from the innermost frame.
pub fn issue_title(incident: Option<&Incident>) -> String {
    match incident {
        Some(Incident {
            kind,
            message,
            location: Some(loc),
            ..
        }) => format!("{kind}: {message} at {}, line {}", loc.file, loc.line),
        Some(Incident { kind, message, .. }) => format!("{kind}: {message}"),
        None => format!("{UNKNOWN_KIND}: {UNKNOWN_MESSAGE}"),
    }
}

pub fn issue_body(report: &ErrorReport, incident: Option<&Incident>, lead_in: &str) -> String {
    let (kind, message) = match incident {
        Some(i) => (i.kind.as_str(), i.message.as_str()),
        None => (UNKNOWN_KIND, UNKNOWN_MESSAGE),
    };
    let (file, line) = match incident.and_then(|i| i.location.as_ref()) {
        Some(loc) => (loc.file.clone(), loc.line.to_string()),
        None => ("unknown".to_string(), "unknown".to_string()),
    };
    let os = &report.os_data;
    let net = &report.network_info;

    let sections = [
        lead_in.to_string(),
        "Not to fear, we have reported the error!".to_string(),
        String::new(),
        "# Summary".to_string(),
        String::new(),
        format!("Error type: {kind}"),
        format!("Error message: {message}"),
        format!("File: {file}"),
        format!("Line: {line}"),
        String::new(),
        "# Error Details".to_string(),
        String::new(),
        format!("App Name: {}", report.app_name),
        format!("App Version: {}", report.app_version),
        format!("Timestamp: {}", report.timestamp),
        format!(
            "Command-Line Arguments: {}",
            serde_json::to_string(&report.command_line_args).unwrap_or_default()
        ),
        "Environment Variables (300 Char Limit):".to_string(),
        serde_json::to_string_pretty(&report.environment_variables).unwrap_or_default(),
        "Installed Packages:".to_string(),
        serde_json::to_string_pretty(&report.installed_packages).unwrap_or_default(),
        "Network Information:".to_string(),
        format!("- Hostname: {}", net.hostname),
        format!("- IP Address: {}", net.ip_address),
        "OS Information:".to_string(),
        format!(
            "- OS: {} {} (Version: {})",
            os.os_name, os.os_release, os.os_version
        ),
        format!("- Architecture: {}", os.architecture),
        format!("- Machine: {}", os.machine),
        format!("- Processor: {}", os.processor),
        format!("- Runtime Version: {}", os.runtime_version),
        String::new(),
        "Traceback:".to_string(),
        "```".to_string(),
        "Captured by the error reporter:".to_string(),
        String::new(),
        "-- TRACEBACK START --".to_string(),
        String::new(),
        report.traceback.clone().unwrap_or_default(),
        String::new(),
        "-- TRACEBACK END --".to_string(),
        "```".to_string(),
        String::new(),
        "User Notes:".to_string(),
        report.user_notes.clone().unwrap_or_default(),
        String::new(),
        "Thank you for helping us improve our app!".to_string(),
        "### CAPTURED BY ERROR REPORTER".to_string(),
    ];

    sections.join("\n")
}

pub fn render_issue(report: &ErrorReport, incident: Option<&Incident>, lead_in: &str) -> IssueDraft {
    IssueDraft {
        title: issue_title(incident),
        body: issue_body(report, incident, lead_in),
    }
}

/// Standalone reports go out exactly as the user typed them.
pub fn standalone_draft(title: String, description: String) -> IssueDraft {
    IssueDraft {
        title,
        body: description,
    }
}
