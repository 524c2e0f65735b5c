use ld_harness::paths::AppPaths;
use ld_harness::{Command, Config, Harness, HarnessError, Presenter, SampleStats, Snapshot};
use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

mod ui;

const ECHO_INTERVAL: Duration = Duration::from_millis(50);

// The main entry point for the command-line test harness.
fn main() -> ExitCode {
    println!("==============================");
    println!("  Light Dip Detector Harness  ");
    println!("==============================");

    // Overrides are applied all or nothing, so a bad one is fatal rather than
    // silently dropping the good ones.
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[ERROR] {}. Fix or unset the LDH_* variables.", e);
            return ExitCode::FAILURE;
        }
    };

    match init_logging() {
        Ok(log_file) => println!("Logging to {}", log_file.display()),
        Err(e) => eprintln!("[WARNING] Logging disabled: {}", e),
    }

    // Prompt the user for the device address, keeping the configured one on empty input.
    let config = prompt_for_host(config);

    // Without a socket there is nothing to drive, so this is fatal.
    let harness = match Harness::start(&config) {
        Ok(harness) => harness,
        Err(e) => {
            eprintln!("[ERROR] Could not open UDP transport: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Harness started. Device: {}", harness.remote());

    // Main menu loop.
    loop {
        println!("\nSelect mode:");
        println!("  1. Terminal UI");
        println!("  2. Line Mode");
        println!("  3. Exit");

        let Some(choice) = prompt("> ") else { break };

        match choice.trim() {
            "1" => {
                if let Err(e) = ui::run(&harness, config.plot_range.clone()) {
                    eprintln!("[ERROR] {}", e);
                }
            }
            "2" => run_line_mode(&harness),
            "3" => break,
            _ => eprintln!("[ERROR] Invalid choice. Please enter 1, 2, or 3."),
        }
    }

    harness.shutdown();
    ExitCode::SUCCESS
}

// Logs go to a file; the terminal belongs to the UI.
fn init_logging() -> Result<std::path::PathBuf, HarnessError> {
    let paths = AppPaths::new()?;
    let log_file = paths.log_file();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .map_err(|e| HarnessError::Paths(format!("{}: {}", log_file.display(), e)))?;

    let level = std::env::var("LDH_LOG")
        .ok()
        .and_then(|v| tracing::Level::from_str(v.trim()).ok())
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .with_thread_names(true)
        .try_init()
        .map_err(|e| HarnessError::Paths(e.to_string()))?;
    Ok(log_file)
}

fn prompt(text: &str) -> Option<String> {
    print!("{}", text);
    let _ = io::stdout().flush();
    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line),
    }
}

fn prompt_for_host(config: Config) -> Config {
    let question = format!("Enter device address (default: {}): ", config.host);
    let Some(input) = prompt(&question) else {
        return config;
    };

    match input.trim() {
        "" => config,
        host => {
            let candidate = config.clone().with_host(host);
            match candidate.endpoint() {
                Ok(_) => candidate,
                Err(_) => {
                    eprintln!("[WARNING] Invalid address '{}'. Using {}.", host, config.host);
                    config
                }
            }
        }
    }
}

// Prints the sample summary at each due refresh. The text itself is echoed live.
struct Console;

impl Presenter for Console {
    fn refresh(&mut self, snapshot: &Snapshot) {
        if snapshot.received == 0 {
            println!("(no reply yet)");
            return;
        }
        match SampleStats::of(&snapshot.samples) {
            Some(stats) => println!(
                "DATA: {} samples, min {:.3}, max {:.3}, avg {:.3}",
                stats.count, stats.min, stats.max, stats.mean
            ),
            None => println!("DATA: none"),
        }
    }
}

// Tracks how much of the current reply has been printed.
#[derive(Debug, Default)]
struct ReplyEcho {
    generation: u64,
    shown: usize,
}

impl ReplyEcho {
    /// Returns the text that arrived since the last call, if any.
    fn take_new(&mut self, snapshot: &Snapshot) -> Option<String> {
        if snapshot.generation != self.generation || snapshot.text.len() < self.shown {
            self.generation = snapshot.generation;
            self.shown = 0;
        }
        // Appends only ever extend the buffer, so the printed part is a prefix.
        let tail = snapshot.text.get(self.shown..).unwrap_or(&snapshot.text);
        self.shown = snapshot.text.len();
        let tail = tail.trim_start();
        (!tail.is_empty()).then(|| tail.to_string())
    }
}

// Prints reply text as it arrives, including replies that miss the refresh.
fn echo_replies(harness: &Harness, done: &AtomicBool) {
    let mut echo = ReplyEcho::default();
    // Whatever is buffered from before line mode is not news.
    echo.take_new(&harness.snapshot());
    while !done.load(Ordering::Relaxed) {
        if let Some(text) = echo.take_new(&harness.snapshot()) {
            println!("{}", text);
        }
        thread::sleep(ECHO_INTERVAL);
    }
}

// Handles the line mode: one command per line.
fn run_line_mode(harness: &Harness) {
    let done = AtomicBool::new(false);
    thread::scope(|scope| {
        scope.spawn(|| echo_replies(harness, &done));
        read_commands(harness);
        done.store(true, Ordering::Relaxed);
    });
}

fn read_commands(harness: &Harness) {
    println!("\n--- Line Mode ---");
    println!("Enter a command (help, ?, count, length, dips, history, blank, stop),");
    println!("an empty line for the history shortcut, or 'back' to return to the main menu.");
    print!("> ");
    let _ = io::stdout().flush();

    let mut console = Console;
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(input) = line else { break };
        let input = input.trim();

        if input == "back" {
            break;
        }

        let command = if input.is_empty() {
            Ok(Command::SHORTCUT)
        } else {
            input.parse::<Command>()
        };

        match command.and_then(|c| harness.send(c).map(|()| c)) {
            Ok(command) => {
                println!("TX message: {:?}", command.outbound());
                // Wait out the refresh delay, then summarize what arrived.
                if let Some(wait) = harness.time_until_refresh() {
                    thread::sleep(wait);
                }
                harness.poll_refresh(&mut console);
            }
            Err(HarnessError::UnknownCommand(name)) => {
                eprintln!("[ERROR] Unknown command '{}'.", name)
            }
            Err(e) => eprintln!("[ERROR] {}", e),
        }

        print!("> ");
        let _ = io::stdout().flush();
    }
}
