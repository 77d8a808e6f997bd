use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Local;
use clap::{Parser, Subcommand};

use taskflow::config::{self, TaskflowConfig};
use taskflow::core::day::Day;
use taskflow::core::task::TaskDraft;
use taskflow::error::{SessionError, TaskError};
use taskflow::session::{FixedLocation, NoLocation, SessionManager, SessionState, SystemDeviceProbe};
use taskflow::store::FileStore;
use taskflow::store::tasks::TaskRepository;
use taskflow::view::{self, Notice};

type Store = Arc<FileStore>;

/// Exit status of every command turned back by the session guard.
const LOGGED_OUT: ExitCode = ExitCode::FAILURE;

#[derive(Parser)]
#[command(name = "taskflow", version, about = "Track your weekly progress with ease")]
struct Cli {
    /// Config file (default: ~/.config/taskflow/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the task and session data
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a session, capturing device and location details
    Login {
        #[arg(default_value = "")]
        username: String,
    },
    /// End the session and clear its details
    Logout,
    /// Show session details and the weekly task list
    Dashboard,
    /// Add a task
    Add {
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_parser = parse_day)]
        day: Option<Day>,
    },
    /// Edit a task; omitted fields keep their current value
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_day)]
        day: Option<Day>,
    },
    /// Delete a task
    Delete { id: String },
    /// Show the weekly task list
    List,
    /// Show the full edit history of a task
    History { id: String },
}

fn parse_day(s: &str) -> Result<Day, String> {
    Day::parse(s).ok_or_else(|| format!("'{}' is not a day of the week", s))
}

fn init_logging(config: &TaskflowConfig) {
    use log::Log;

    // Journal logging (`journalctl --user -t taskflow -f`).
    // taskflow targets at info/debug (per config), everything else at warn.
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("taskflow") {
                let max = if taskflow::debug_logging() { log::LevelFilter::Debug } else { log::LevelFilter::Info };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }
        fn flush(&self) {
            self.inner.flush();
        }
    }

    taskflow::set_debug_logging(config.debug_logging);

    let journal = match systemd_journal_logger::JournalLog::new() {
        Ok(journal) => journal.with_syslog_identifier("taskflow".to_string()),
        Err(_) => return,
    };
    if log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })).is_ok() {
        // Global max must be Debug so taskflow debug logs can pass through when toggled
        log::set_max_level(log::LevelFilter::Debug);
    }
}

fn report(notice: Notice) {
    if notice.is_error() {
        eprintln!("{}", notice);
    } else {
        println!("{}", notice);
    }
}

fn login_hint() {
    eprintln!("Not logged in. Run `taskflow login <username>` first.");
}

struct App {
    config: TaskflowConfig,
    sessions: SessionManager<Store>,
    tasks: TaskRepository<Store>,
}

impl App {
    fn new(config: TaskflowConfig) -> Self {
        let store = Arc::new(FileStore::new(config.data_directory.clone()));
        Self {
            sessions: SessionManager::new(Arc::clone(&store), config.geolocation_timeout()),
            tasks: TaskRepository::new(store),
            config,
        }
    }

    /// The dashboard guard. `None` means the user was sent back to login.
    fn require_session(&self) -> Result<Option<SessionState>, Box<dyn std::error::Error>> {
        match self.sessions.state()? {
            SessionState::LoggedOut => {
                login_hint();
                Ok(None)
            }
            state => Ok(Some(state)),
        }
    }

    fn dashboard(&self) -> Result<ExitCode, Box<dyn std::error::Error>> {
        let Some(SessionState::LoggedIn { username, record }) = self.require_session()? else {
            return Ok(LOGGED_OUT);
        };
        let tasks = self.tasks.list()?;
        print!("{}", view::render_dashboard(&username, record.as_ref(), &tasks, &Local));
        Ok(ExitCode::SUCCESS)
    }

    async fn run(&self, command: Command) -> Result<ExitCode, Box<dyn std::error::Error>> {
        match command {
            Command::Login { username } => {
                let result = match self.config.location {
                    Some(here) => {
                        self.sessions
                            .login(&username, &SystemDeviceProbe, &FixedLocation(here))
                            .await
                    }
                    None => self.sessions.login(&username, &SystemDeviceProbe, &NoLocation).await,
                };
                if let Err(SessionError::Validation(e)) = &result {
                    report(Notice::error(e.to_string()));
                    return Ok(ExitCode::FAILURE);
                }
                result?;
                report(Notice::success("Login successful!"));

                tokio::time::sleep(self.config.redirect_delay()).await;
                self.dashboard()
            }
            Command::Logout => {
                self.sessions.logout()?;
                report(Notice::success("Logged out."));
                println!("Run `taskflow login <username>` to start a new session.");
                Ok(ExitCode::SUCCESS)
            }
            Command::Dashboard => self.dashboard(),
            Command::List => {
                if self.require_session()?.is_none() {
                    return Ok(LOGGED_OUT);
                }
                print!("{}", view::render_week(&self.tasks.list()?, &Local));
                Ok(ExitCode::SUCCESS)
            }
            Command::History { id } => {
                if self.require_session()?.is_none() {
                    return Ok(LOGGED_OUT);
                }
                match self.tasks.get(&id)? {
                    Some(task) => {
                        print!("{}", view::render_history(&task, &Local));
                        Ok(ExitCode::SUCCESS)
                    }
                    None => task_failure(TaskError::NotFound(id)),
                }
            }
            Command::Add { title, description, day } => {
                if self.require_session()?.is_none() {
                    return Ok(LOGGED_OUT);
                }
                match self.tasks.create(&TaskDraft::new(title, description, day)) {
                    Ok(task) => {
                        report(Notice::success("Task added successfully!"));
                        println!("{}", task.id);
                        Ok(ExitCode::SUCCESS)
                    }
                    Err(e) => task_failure(e),
                }
            }
            Command::Edit { id, title, description, day } => {
                if self.require_session()?.is_none() {
                    return Ok(LOGGED_OUT);
                }
                let Some(current) = self.tasks.get(&id)? else {
                    return task_failure(TaskError::NotFound(id));
                };
                let mut draft = TaskDraft::from_task(&current);
                if let Some(title) = title {
                    draft.title = title;
                }
                if let Some(description) = description {
                    draft.description = description;
                }
                if day.is_some() {
                    draft.day = day;
                }
                match self.tasks.update(&id, &draft) {
                    Ok(update) => {
                        report(Notice::success("Task updated successfully!"));
                        if !update.changed.is_empty() {
                            let fields: Vec<_> = update.changed.iter().map(|f| f.as_str()).collect();
                            println!("Changed: {}", fields.join(", "));
                        }
                        Ok(ExitCode::SUCCESS)
                    }
                    Err(e) => task_failure(e),
                }
            }
            Command::Delete { id } => {
                if self.require_session()?.is_none() {
                    return Ok(LOGGED_OUT);
                }
                match self.tasks.delete(&id) {
                    Ok(_) => {
                        report(Notice::success("Task deleted successfully!"));
                        Ok(ExitCode::SUCCESS)
                    }
                    Err(e) => task_failure(e),
                }
            }
        }
    }
}

/// Validation and lookup failures become notices; store failures propagate.
fn task_failure(e: TaskError) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match e {
        TaskError::Store(store) => Err(store.into()),
        other => {
            report(Notice::error(other.to_string()));
            Ok(ExitCode::FAILURE)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let (mut config, config_error) = match TaskflowConfig::load(&config_path) {
        Ok(config) => (config, None),
        Err((e, defaults)) => (defaults, Some(e)),
    };
    if let Some(dir) = cli.data_dir {
        config.data_directory = dir;
    }

    init_logging(&config);

    if let Some(e) = config_error {
        log::warn!("Using default settings: {}", e);
    }

    if let Err(e) = config.ensure_dirs() {
        log::error!("Failed to create data directory: {}", e);
    }

    let app = App::new(config);
    match app.run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{}", e);
            report(Notice::error(e.to_string()));
            ExitCode::FAILURE
        }
    }
}
