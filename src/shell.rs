use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe, PanicHookInfo};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;

use crate::collector::Collector;
use crate::config::{self, CONFIG_FILE, InstallPaths, ReporterConfig};
use crate::console::{Console, TerminalConsole};
use crate::delivery::{self, DeliveryOutcome, IssueTracker};
use crate::formatter::{self, IssueDraft, LeadIn};
use crate::incident::Incident;

type PanicHook = dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static;

thread_local! {
    static CAUGHT_PANIC: RefCell<Option<Incident>> = const { RefCell::new(None) };
    /// Depth of `supervise` calls active on this thread.
    static SUPERVISING: Cell<u32> = const { Cell::new(0) };
}

/// Capture panics raised on supervising threads and hand every other panic
/// to the hook that was installed before. Returns that hook for restoring.
fn install_capture_hook() -> Arc<Box<PanicHook>> {
    let previous = Arc::new(panic::take_hook());
    let chained = Arc::clone(&previous);
    panic::set_hook(Box::new(move |info| {
        if SUPERVISING.with(Cell::get) > 0 {
            let incident = Incident::from_panic(info);
            CAUGHT_PANIC.with(|slot| *slot.borrow_mut() = Some(incident));
        } else {
            (**chained)(info);
        }
    }));
    previous
}

// A capture hook left behind by overlapping calls on other threads only
// captures while its own caller is supervising, so restoring out of order
// leaves a hook that forwards everything else.
fn restore_hook(previous: Arc<Box<PanicHook>>) {
    drop(panic::take_hook());
    match Arc::try_unwrap(previous) {
        Ok(hook) => panic::set_hook(hook),
        Err(shared) => panic::set_hook(Box::new(move |info| (**shared)(info))),
    }
}

/// Files crash reports for a host application, in exception or standalone mode.
pub struct Reporter<C: Console = TerminalConsole> {
    config: ReporterConfig,
    paths: InstallPaths,
    tracker: IssueTracker,
    collector: Collector,
    console: C,
    lead_in: LeadIn,
}

impl Reporter<TerminalConsole> {
    /// Build a reporter from an already validated configuration.
    pub fn new(config: ReporterConfig, paths: InstallPaths) -> Self {
        let tracker = IssueTracker::new(&config.settings.api_base, config.settings.timeout());
        let collector = Collector::new(config.settings.env_allow_list.clone());
        Self {
            config,
            paths,
            tracker,
            collector,
            console: TerminalConsole::new(),
            lead_in: formatter::random_lead_in,
        }
    }

    /// Load and validate the install in `dir`. Nothing can be reported
    /// unless this succeeds.
    pub fn from_install_dir(dir: impl Into<PathBuf>) -> crate::Result<Self> {
        let paths = InstallPaths::new(dir);
        let config = config::load(&paths)?;
        Ok(Self::new(config, paths))
    }
}

impl<C: Console> Reporter<C> {
    pub fn with_console<D: Console>(self, console: D) -> Reporter<D> {
        Reporter {
            config: self.config,
            paths: self.paths,
            tracker: self.tracker,
            collector: self.collector,
            console,
            lead_in: self.lead_in,
        }
    }

    pub fn with_lead_in(mut self, lead_in: LeadIn) -> Self {
        self.lead_in = lead_in;
        self
    }

    /// Components listed under "Installed Packages", e.g. the host's crates.
    pub fn with_dependencies<I, K, V>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.collector = self.collector.with_dependencies(deps);
        self
    }

    pub fn with_tracker(mut self, tracker: IssueTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    // --- Exception mode -------------------------------------------------

    /// Run `body`, reporting any panic or error that escapes it.
    ///
    /// Exits 0 once the incident has been filed or saved locally, 1 if even
    /// the local fallback failed.
    #[track_caller]
    pub fn run<F, E>(&mut self, body: F) -> ExitCode
    where
        F: FnOnce() -> std::result::Result<(), E>,
        E: fmt::Display + fmt::Debug,
    {
        match self.supervise(body) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "could not report incident");
                self.console.say("red", &format!("Error: {e:#}"));
                ExitCode::FAILURE
            }
        }
    }

    /// Like [`run`](Self::run) but returns the delivery outcome, `None` when
    /// `body` finished cleanly.
    #[track_caller]
    pub fn supervise<F, E>(&mut self, body: F) -> Result<Option<DeliveryOutcome>>
    where
        F: FnOnce() -> std::result::Result<(), E>,
        E: fmt::Display + fmt::Debug,
    {
        CAUGHT_PANIC.with(|slot| slot.borrow_mut().take());
        let previous = install_capture_hook();
        SUPERVISING.with(|depth| depth.set(depth.get() + 1));
        let result = panic::catch_unwind(AssertUnwindSafe(body));
        SUPERVISING.with(|depth| depth.set(depth.get() - 1));
        restore_hook(previous);

        let incident = match result {
            Ok(Ok(())) => return Ok(None),
            Ok(Err(err)) => Incident::from_error(&err),
            Err(payload) => CAUGHT_PANIC
                .with(|slot| slot.borrow_mut().take())
                .unwrap_or_else(|| Incident::from_payload(&*payload)),
        };
        self.handle_incident(&incident).map(Some)
    }

    /// Report an error the host caught itself. The location recorded is the
    /// caller's.
    #[track_caller]
    pub fn report_error<E: fmt::Display + fmt::Debug>(
        &mut self,
        err: &E,
    ) -> Result<DeliveryOutcome> {
        let incident = Incident::from_error(err);
        self.handle_incident(&incident)
    }

    /// Collect, show the error screen, ask for notes, format and deliver.
    pub fn handle_incident(&mut self, incident: &Incident) -> Result<DeliveryOutcome> {
        tracing::info!(kind = %incident.kind, message = %incident.message, "handling incident");
        let mut report = self.collector.collect(&self.config, Some(incident));

        let notes = self.show_error_screen(incident);
        report.user_notes = (!notes.trim().is_empty()).then_some(notes);

        let draft = formatter::render_issue(&report, Some(incident), (self.lead_in)());
        self.deliver(&draft)
    }

    fn show_error_screen(&mut self, incident: &Incident) -> String {
        let colors = &self.config.ui_colors;
        self.console
            .say(&colors.title, &format!("Error in {}", self.config.app_name));
        self.console.say(&colors.text, &self.config.error_screen_text);
        self.console.say(&colors.text, "Traceback:");
        self.console.say("", &incident.traceback);

        self.console
            .prompt(&colors.input, "Add any additional details (optional)")
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "no user notes collected");
                String::new()
            })
    }

    // --- Standalone mode ------------------------------------------------

    /// Prompt for a title and description and file them as-is.
    ///
    /// Returns `None` without prompting when standalone mode is disabled.
    pub fn standalone(&mut self) -> Result<Option<DeliveryOutcome>> {
        if !self.config.enable_standalone {
            self.console
                .say("red", "Standalone mode is disabled in the configuration.");
            self.console.say(
                "yellow",
                &format!("Developer note: If you want standalone mode, enable it in {CONFIG_FILE}"),
            );
            self.console.say("yellow", "Exiting...");
            return Ok(None);
        }

        let colors = &self.config.ui_colors;
        self.console.say(
            &colors.title,
            &format!("Welcome to {} Bug Reporter", self.config.app_name),
        );
        self.console
            .say(&colors.text, "Please describe the issue you encountered.");
        let title = self.console.prompt(&colors.input, "Issue Title")?;
        let description = self.console.prompt(&colors.input, "Issue Description")?;

        let draft = formatter::standalone_draft(title, description);
        self.deliver(&draft).map(Some)
    }

    fn deliver(&mut self, draft: &IssueDraft) -> Result<DeliveryOutcome> {
        let outcome = delivery::deliver(
            &self.tracker,
            draft,
            &self.config.github_repo,
            self.config.token.expose(),
            self.paths.root(),
            &mut self.console,
        )?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests;
