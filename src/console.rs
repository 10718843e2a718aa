//! Line-oriented terminal front end for interactive mode.
//!
//! Input lines and worker results arrive on two channels and are handled one
//! at a time on the foreground thread, so session state is never touched from
//! a worker. Each command word maps to a handler in a table built once in
//! [`Console::new`].

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::thread;

use crossbeam_channel::{Receiver, Sender, select, unbounded};
use tracing::debug;

use crate::checker::UpdateRecord;
use crate::config::Config;
use crate::context::AppContext;
use crate::desktop::create_desktop_entry;
use crate::errors::AppError;
use crate::history::DEFAULT_RECENT;
use crate::notify::APP_TITLE;
use crate::orchestrator::{UiEvent, filter_excluded};
use crate::service::ServiceState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

type Handler = fn(&mut Console, &str) -> Result<Flow, AppError>;

struct Action {
    handler: Handler,
    usage: &'static str,
    help: &'static str,
}

pub struct Console {
    ctx: AppContext,
    actions: BTreeMap<&'static str, Action>,
    events_tx: Sender<UiEvent>,
    events_rx: Receiver<UiEvent>,
    updates: Vec<UpdateRecord>,
    refreshing: bool,
    applying: bool,
}

impl Console {
    pub fn new(ctx: AppContext) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            ctx,
            actions: action_table(),
            events_tx,
            events_rx,
            updates: Vec::new(),
            refreshing: false,
            applying: false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.refreshing || self.applying
    }

    pub fn updates(&self) -> &[UpdateRecord] {
        &self.updates
    }

    /// Runs until `quit` or end of input. Work still in flight at end of
    /// input is waited for, since it cannot be cancelled.
    pub fn run(mut self) -> Result<(), AppError> {
        self.show_home();
        self.start_refresh();

        let input = spawn_input_reader();
        let events = self.events_rx.clone();
        prompt();
        loop {
            select! {
                recv(input) -> line => match line {
                    Ok(line) => {
                        if self.dispatch(&line) == Flow::Quit {
                            break;
                        }
                        prompt();
                    }
                    Err(_) => break,
                },
                recv(events) -> event => {
                    if let Ok(event) = event {
                        self.handle_event(event);
                        prompt();
                    }
                }
            }
        }

        while self.is_busy() {
            match self.events_rx.recv() {
                Ok(event) => self.handle_event(event),
                Err(_) => break,
            }
        }
        Ok(())
    }

    /// Looks the first word up in the action table and runs it. Errors are
    /// reported and the session carries on.
    pub fn dispatch(&mut self, line: &str) -> Flow {
        let line = line.trim();
        if line.is_empty() {
            return Flow::Continue;
        }
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let Some(action) = self.actions.get(word) else {
            println!("Unknown command '{}'. Type 'help' for a list.", word);
            return Flow::Continue;
        };
        let handler = action.handler;
        match handler(self, rest.trim()) {
            Ok(flow) => flow,
            Err(e) => {
                eprintln!("Error: {}", e);
                Flow::Continue
            }
        }
    }

    pub fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::UpdatesReady(updates) => {
                self.refreshing = false;
                self.updates = updates;
                self.show_updates();
            }
            UiEvent::ApplyFinished(result) => {
                self.applying = false;
                if result.success {
                    println!("Finished!");
                } else {
                    println!("Failed!");
                    let message = result.message.trim();
                    if !message.is_empty() {
                        println!("{}", message);
                    }
                }
                self.start_refresh();
            }
        }
    }

    fn start_refresh(&mut self) {
        self.refreshing = true;
        println!("Checking...");
        self.ctx
            .orchestrator
            .refresh_updates(&self.ctx.config, self.events_tx.clone());
    }

    fn show_home(&self) {
        let specs = &self.ctx.specs;
        println!("Welcome, {}", capitalize(&specs.user));
        println!("{} Workstation", self.ctx.orchestrator.profile().name);
        println!("  Processor: {}", specs.cpu);
        println!("  Graphics:  {}", specs.gpu);
        println!("  Memory:    {}", specs.ram);
    }

    fn show_updates(&self) {
        if self.updates.is_empty() {
            println!("System Up To Date. No updates found.");
            return;
        }
        println!("{} update(s) available:", self.updates.len());
        for update in &self.updates {
            println!("  {:<32} {}", update.package_name, update.detail);
        }
        println!("Type 'apply' to install them.");
    }

    fn set_flag(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        let value = parse_switch(value)?;
        let field: fn(&mut Config, bool) = match key {
            "notifications" => |c, v| c.notifications = v,
            "auto_update" => |c, v| c.auto_update = v,
            "check_flatpaks" => |c, v| c.check_flatpaks = v,
            other => return Err(usage_error(&format!("unknown setting '{}'", other))),
        };
        self.ctx
            .store
            .update(&mut self.ctx.config, |c| field(c, value))
    }
}

fn action_table() -> BTreeMap<&'static str, Action> {
    let entries: [(&'static str, Handler, &'static str, &'static str); 12] = [
        ("refresh", cmd_refresh, "refresh", "Check for updates"),
        ("list", cmd_list, "list", "Show the last update check"),
        ("apply", cmd_apply, "apply", "Install all listed updates"),
        ("history", cmd_history, "history", "Show recent update runs"),
        (
            "service",
            cmd_service,
            "service",
            "Install or remove the daily background check",
        ),
        ("settings", cmd_settings, "settings", "Show current settings"),
        (
            "set",
            cmd_set,
            "set KEY VALUE",
            "Change notifications|auto_update|check_flatpaks (on/off) or terminal",
        ),
        ("exclude", cmd_exclude, "exclude a, b, c", "Set the ignored packages"),
        ("test-notify", cmd_test_notify, "test-notify", "Send a test notification"),
        ("desktop", cmd_desktop, "desktop", "Create an application menu entry"),
        ("specs", cmd_specs, "specs", "Show hardware information"),
        ("help", cmd_help, "help", "Show this list"),
    ];
    let mut table: BTreeMap<&'static str, Action> = entries
        .into_iter()
        .map(|(name, handler, usage, help)| (name, Action { handler, usage, help }))
        .collect();
    for name in ["quit", "exit"] {
        table.insert(
            name,
            Action {
                handler: cmd_quit,
                usage: name,
                help: "Leave",
            },
        );
    }
    table
}

fn cmd_refresh(console: &mut Console, _: &str) -> Result<Flow, AppError> {
    if console.is_busy() {
        println!("Busy, please wait.");
    } else {
        console.start_refresh();
    }
    Ok(Flow::Continue)
}

fn cmd_list(console: &mut Console, _: &str) -> Result<Flow, AppError> {
    if console.refreshing {
        println!("Checking...");
    } else {
        console.show_updates();
    }
    Ok(Flow::Continue)
}

fn cmd_apply(console: &mut Console, _: &str) -> Result<Flow, AppError> {
    if console.is_busy() {
        println!("Busy, please wait.");
    } else if console.updates.is_empty() {
        println!("Nothing to apply.");
    } else {
        console.applying = true;
        println!("Installing...");
        console
            .ctx
            .orchestrator
            .apply_updates(&console.ctx.config, console.events_tx.clone());
    }
    Ok(Flow::Continue)
}

fn cmd_history(console: &mut Console, _: &str) -> Result<Flow, AppError> {
    for line in console.ctx.orchestrator.history().read_recent(DEFAULT_RECENT)? {
        println!("  {}", line);
    }
    Ok(Flow::Continue)
}

fn cmd_service(console: &mut Console, _: &str) -> Result<Flow, AppError> {
    match console.ctx.trigger.toggle()? {
        ServiceState::Installed => println!("Service active!"),
        ServiceState::NotInstalled => println!("Service disabled"),
    }
    Ok(Flow::Continue)
}

fn cmd_settings(console: &mut Console, _: &str) -> Result<Flow, AppError> {
    let config = &console.ctx.config;
    let service = console.ctx.trigger.status();
    println!(
        "  Background service: {:?} (type 'service' to {})",
        service,
        service.action_label().to_lowercase()
    );
    println!("  notifications:      {}", on_off(config.notifications));
    println!("  auto_update:        {}", on_off(config.auto_update));
    println!("  check_flatpaks:     {}", on_off(config.check_flatpaks));
    println!("  terminal:           {}", config.terminal);
    println!("  exclude:            {}", config.exclude.join(", "));
    Ok(Flow::Continue)
}

fn cmd_set(console: &mut Console, args: &str) -> Result<Flow, AppError> {
    let (key, value) = args
        .split_once(char::is_whitespace)
        .map(|(k, v)| (k, v.trim()))
        .ok_or_else(|| usage_error("set KEY VALUE"))?;
    if key == "terminal" {
        let terminal = value.to_string();
        console
            .ctx
            .store
            .update(&mut console.ctx.config, |c| c.terminal = terminal)?;
    } else {
        console.set_flag(key, value)?;
    }
    debug!("Saved setting {}", key);
    Ok(Flow::Continue)
}

fn cmd_exclude(console: &mut Console, args: &str) -> Result<Flow, AppError> {
    console
        .ctx
        .store
        .update(&mut console.ctx.config, |c| c.set_exclude_from_text(args))?;
    let exclude = console.ctx.config.exclude_set();
    console.updates = filter_excluded(std::mem::take(&mut console.updates), &exclude);
    Ok(Flow::Continue)
}

fn cmd_test_notify(console: &mut Console, _: &str) -> Result<Flow, AppError> {
    console
        .ctx
        .notifier
        .notify(APP_TITLE, "This is a test notification!");
    Ok(Flow::Continue)
}

fn cmd_desktop(console: &mut Console, _: &str) -> Result<Flow, AppError> {
    let path = create_desktop_entry(&console.ctx.paths.applications_dir, &console.ctx.executable)?;
    println!("Created {}! Check your app menu.", path.display());
    Ok(Flow::Continue)
}

fn cmd_specs(console: &mut Console, _: &str) -> Result<Flow, AppError> {
    console.show_home();
    Ok(Flow::Continue)
}

fn cmd_help(console: &mut Console, _: &str) -> Result<Flow, AppError> {
    for action in console.actions.values() {
        println!("  {:<18} {}", action.usage, action.help);
    }
    Ok(Flow::Continue)
}

fn cmd_quit(_: &mut Console, _: &str) -> Result<Flow, AppError> {
    Ok(Flow::Quit)
}

fn spawn_input_reader() -> Receiver<String> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn prompt() {
    print!("sysdupd> ");
    let _ = io::stdout().flush();
}

fn parse_switch(value: &str) -> Result<bool, AppError> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(usage_error(&format!("expected on or off, got '{}'", other))),
    }
}

fn usage_error(message: &str) -> AppError {
    AppError::Other(format!("usage: {}", message).into())
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
