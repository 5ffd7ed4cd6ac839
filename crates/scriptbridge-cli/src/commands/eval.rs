use crate::common::GlobalOpts;
use crate::session::{self, BeanArg};
use anyhow::{Context, Result};
use clap::Args;
use scriptbridge_config::Config;
use scriptbridge_core::{HostValue, Manager};
use scriptbridge_logger as logger;

/// Source name reported for expressions given on the command line
const EVAL_SOURCE: &str = "<command line>";

#[derive(Args, Debug, Clone)]
pub struct EvalCommand {
    /// Expression (or statements) to evaluate
    pub expr: String,

    /// Language id; defaults to `default-language` from the config
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Declare a bean visible to the expression (repeatable)
    #[arg(short, long = "bean", value_name = "NAME[:TYPE]=VALUE")]
    pub beans: Vec<BeanArg>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn handle_eval(cmd: EvalCommand, _opts: &GlobalOpts) -> Result<()> {
    let config = Config::load().context("Failed to load config")?;
    let manager = session::open(&config);
    let result = evaluate(&manager, &config, &cmd);
    manager.terminate();
    println!("{}", session::render(&result?, cmd.json));
    Ok(())
}

pub fn evaluate(manager: &Manager, config: &Config, cmd: &EvalCommand) -> Result<HostValue> {
    let language = cmd
        .lang
        .clone()
        .unwrap_or_else(|| config.default_language().to_string());
    for bean in &cmd.beans {
        bean.declare(manager);
    }
    logger::step(&format!("Evaluating with '{}': {}", language, cmd.expr));
    Ok(manager.eval(&language, EVAL_SOURCE, 1, 1, &cmd.expr)?)
}
