use crate::common::GlobalOpts;
use crate::session::{self, BeanArg};
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use scriptbridge_config::Config;
use scriptbridge_core::{HostValue, Manager};
use scriptbridge_logger as logger;
use std::fs;
use std::path::PathBuf;

/// How the script text is handed to the engine.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Run the script for its side effects
    Exec,
    /// Run the script and print the value of its last expression
    Eval,
    /// Interactive mode: only the first line is run
    Iexec,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Exec => "exec",
            Mode::Eval => "eval",
            Mode::Iexec => "iexec",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RunCommand {
    /// Script file to run
    pub file: PathBuf,

    /// Language id; inferred from the file extension when omitted
    #[arg(short, long)]
    pub lang: Option<String>,

    #[arg(short, long, value_enum, default_value_t = Mode::Exec)]
    pub mode: Mode,

    /// Declare a bean visible to the script (repeatable)
    #[arg(short, long = "bean", value_name = "NAME[:TYPE]=VALUE")]
    pub beans: Vec<BeanArg>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn handle_run(cmd: RunCommand, _opts: &GlobalOpts) -> Result<()> {
    let config = Config::load().context("Failed to load config")?;
    let manager = session::open(&config);
    let result = run_script(&manager, &cmd);
    manager.terminate();
    let value = result?;

    if cmd.json {
        println!("{}", session::render(&value, true));
    } else if cmd.mode == Mode::Eval {
        println!("{}", session::render(&value, false));
    }
    Ok(())
}

/// Run `cmd.file` through `manager`; exec and iexec yield `Null`.
pub fn run_script(manager: &Manager, cmd: &RunCommand) -> Result<HostValue> {
    let text = fs::read_to_string(&cmd.file)
        .with_context(|| format!("Failed to read script {}", cmd.file.display()))?;
    let language = match &cmd.lang {
        Some(lang) => lang.clone(),
        None => manager.language_for_path(&cmd.file)?,
    };
    let source_name = cmd.file.display().to_string();

    for bean in &cmd.beans {
        bean.declare(manager);
    }

    logger::set_current_script(Some(source_name.clone()));
    logger::debug(&format!(
        "Running {} with '{}' in {} mode",
        source_name,
        language,
        cmd.mode.as_str()
    ));
    let result = match cmd.mode {
        Mode::Exec => manager
            .exec(&language, &source_name, 1, 1, &text)
            .map(|()| HostValue::Null),
        Mode::Eval => manager.eval(&language, &source_name, 1, 1, &text),
        Mode::Iexec => manager
            .iexec(&language, &source_name, 1, 1, &text)
            .map(|()| HostValue::Null),
    };
    logger::set_current_script(None);
    let value = result?;
    logger::info(&format!("Finished {}", source_name));
    Ok(value)
}
