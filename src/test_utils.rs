use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use crate::config::{self, InstallPaths, StoredConfig, Token};
use crate::console::Console;
use crate::secrets;

/// Write `key.key` and `errorconfig.json` into `dir`, letting the caller
/// tweak the stored config before it is written.
pub fn write_install(dir: &Path, token: &str, edit: impl FnOnce(&mut StoredConfig)) -> InstallPaths {
    let paths = InstallPaths::new(dir);
    let key = secrets::generate_key(&paths.key_file()).unwrap();
    let sealed = secrets::encrypt(token, &key).unwrap();
    let mut stored = StoredConfig::initial("Demo App", "octo/demo", sealed);
    edit(&mut stored);
    config::write_stored_config(&paths.config_file(), &stored).unwrap();
    paths
}

/// A validated config without touching the filesystem.
pub fn reporter_config(api_base: &str) -> config::ReporterConfig {
    config::ReporterConfig {
        app_name: "Demo App".to_string(),
        app_version: "1.0.0".to_string(),
        error_screen_text: config::default_error_screen_text(),
        enable_standalone: true,
        github_repo: "octo/demo".to_string(),
        token: Token::new("ghp_test"),
        ui_colors: config::UiColors::default(),
        settings: config::Settings {
            api_base: api_base.to_string(),
            timeout_secs: 5,
            ..config::Settings::default()
        },
    }
}

/// An API base that refuses connections.
pub const UNREACHABLE_API: &str = "http://127.0.0.1:1";

/// Serve exactly one HTTP request with the given status line and body.
/// Returns the base URL and a receiver yielding the raw request text.
pub fn fake_tracker(status: &str, body: &str) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    thread::spawn(move || {
        let Ok((stream, _)) = listener.accept() else {
            return;
        };
        let mut reader = BufReader::new(stream);
        let mut request = String::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap_or(0) == 0 {
                break;
            }
            if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap_or(0);
            }
            request.push_str(&line);
            if line == "\r\n" {
                break;
            }
        }
        let mut payload = vec![0u8; content_length];
        let _ = reader.read_exact(&mut payload);
        request.push_str(&String::from_utf8_lossy(&payload));

        let mut stream = reader.into_inner();
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();
        let _ = tx.send(request);
    });

    (format!("http://{addr}"), rx)
}

/// In-memory [`Console`] that replays scripted answers and records output.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    pub lines: Vec<(String, String)>,
    pub prompts: Vec<String>,
}

impl ScriptedConsole {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    /// True if any printed line contains `needle`.
    pub fn printed(&self, needle: &str) -> bool {
        self.lines.iter().any(|(_, text)| text.contains(needle))
    }

    fn next_answer(&mut self, label: &str) -> anyhow::Result<String> {
        self.prompts.push(label.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted answer for '{label}'"))
    }
}

impl Console for ScriptedConsole {
    fn say(&mut self, style: &str, text: &str) {
        self.lines.push((style.to_string(), text.to_string()));
    }

    fn prompt(&mut self, _style: &str, label: &str) -> anyhow::Result<String> {
        self.next_answer(label)
    }

    fn prompt_secret(&mut self, label: &str) -> anyhow::Result<String> {
        self.next_answer(label)
    }
}
