use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use turing_sim::{
    analyze, CommandGenerator, ControllerConfig, Expression, Outcome, Preset, PresetLoader,
    PresetManager, RuleGenerator, RunController, Status, MAX_EXECUTION_STEPS,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None, arg_required_else_help = true)]
#[command(after_help = "EXAMPLES:
  turing-sim-cli list --search unary
  turing-sim-cli list --dir presets
  turing-sim-cli run --preset \"Binary Increment\" --input 1111 --trace
  turing-sim-cli math \"3 - 2\"
  cat machine.tm | turing-sim-cli run")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file with controller settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Stop after this many applied steps. 0 runs without a limit.
    #[arg(long, global = true, env = "TURING_SIM_MAX_STEPS", default_value_t = MAX_EXECUTION_STEPS)]
    max_steps: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in presets, or the presets found in a directory.
    List {
        /// Only show presets whose name or description contains this text.
        #[arg(short, long)]
        search: Option<String>,
        /// Load and list every .tm and .json preset in this directory instead.
        #[arg(long, conflicts_with = "search")]
        dir: Option<PathBuf>,
    },
    /// Run a preset until it halts.
    Run {
        /// Built-in preset name (case-insensitive).
        #[arg(short, long, conflicts_with = "file")]
        preset: Option<String>,
        /// Preset file (.tm or .json). Without --preset or --file, the preset is read from stdin.
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Replace the preset's initial tape.
        #[arg(short, long)]
        input: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Evaluate a unary arithmetic expression such as "3+2" or "5 - 7".
    Math {
        expression: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Report rule conflicts, unreachable states and unhandled tape symbols.
    Check {
        file: PathBuf,
    },
    /// Ask an external command for a preset and run it.
    Generate {
        /// Program that reads the prompt on stdin and answers on stdout.
        #[arg(short, long)]
        command: String,
        /// Arguments passed to the command.
        #[arg(short, long = "arg", allow_hyphen_values = true)]
        args: Vec<String>,
        prompt: String,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Print every logged step.
    #[arg(short = 'd', long)]
    trace: bool,
    /// Print a JSON summary instead of text.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::List { search, dir } => match dir {
            Some(dir) => Ok(list_directory(&dir)),
            None => {
                list_presets(search.as_deref())?;
                Ok(ExitCode::SUCCESS)
            }
        },
        Commands::Run {
            preset,
            file,
            input,
            output,
        } => {
            let mut preset = resolve_preset(preset.as_deref(), file.as_deref())?;
            if let Some(tape) = input {
                preset = preset.with_tape(tape);
            }
            let mut controller = RunController::new(preset, config);
            execute(&mut controller, &output)
        }
        Commands::Math { expression, output } => {
            let expr: Expression = expression
                .parse()
                .with_context(|| format!("failed to parse expression {expression:?}"))?;
            let mut controller = RunController::new(PresetManager::get_by_index(0)?, config);
            controller.load_arithmetic(expr.left, expr.operator, expr.right)?;
            let code = execute(&mut controller, &output)?;
            check_arithmetic(&controller, &expr)?;
            Ok(code)
        }
        Commands::Check { file } => check(&file),
        Commands::Generate {
            command,
            args,
            prompt,
            output,
        } => {
            let generator = CommandGenerator::new(command, args);
            let preset = generator
                .generate(&prompt)
                .context("rule generation failed")?;
            let mut controller = RunController::new(preset, config);
            execute(&mut controller, &output)
        }
    }
}

fn load_config(cli: &Cli) -> Result<ControllerConfig> {
    let mut config = match &cli.config {
        Some(path) => ControllerConfig::load(path)?,
        None => ControllerConfig::default(),
    };
    config.max_steps = (cli.max_steps > 0).then_some(cli.max_steps);
    debug!(?config, "controller config");
    Ok(config)
}

/// Picks the preset from --preset, --file, or stdin, in that order.
fn resolve_preset(name: Option<&str>, file: Option<&Path>) -> Result<Preset> {
    if let Some(name) = name {
        return Ok(PresetManager::get_by_name(name)?);
    }
    if let Some(path) = file {
        return PresetLoader::load_preset(path)
            .with_context(|| format!("failed to load preset from {}", path.display()));
    }
    if atty::isnt(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read preset from stdin")?;
        return Ok(PresetLoader::load_preset_from_string(&buffer)?);
    }
    bail!("no preset given: use --preset, --file, or pipe a preset on stdin")
}

fn list_presets(search: Option<&str>) -> Result<()> {
    let indices = match search {
        Some(query) => PresetManager::search(query),
        None => (0..PresetManager::count()).collect(),
    };
    if indices.is_empty() {
        bail!("no preset matches {:?}", search.unwrap_or_default());
    }

    for index in indices {
        let info = PresetManager::get_info(index)?;
        println!(
            "{:>2}. {:<22} {} states, {} rules, tape \"{}\"",
            index + 1,
            info.name,
            info.state_count,
            info.rule_count,
            info.initial_tape
        );
        if !info.description.is_empty() {
            println!("    {}", info.description);
        }
    }
    Ok(())
}

/// Lists the presets in `dir`, reporting files that fail to load.
fn list_directory(dir: &Path) -> ExitCode {
    let mut failed = false;

    for result in PresetLoader::load_presets(dir) {
        match result {
            Ok((path, preset)) => println!(
                "{:<22} {} states, {} rules, tape \"{}\"  ({})",
                preset.name,
                preset.states().len(),
                preset.rules.len(),
                preset.initial_tape,
                path.display()
            ),
            Err(e) => {
                failed = true;
                eprintln!("{e}");
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Compares a halted arithmetic run with the integer answer.
fn check_arithmetic(controller: &RunController, expr: &Expression) -> Result<()> {
    let expected = expr.operator.apply(expr.left, expr.right);

    match controller.outcome() {
        Some(Outcome::Value(value)) if value as u64 == expected => {
            debug!(value, "arithmetic result matches");
            Ok(())
        }
        Some(outcome) => bail!(
            "machine computed {outcome} for {} {} {}, expected {expected}",
            expr.left,
            expr.operator,
            expr.right
        ),
        // Stopped by the step limit, already reported
        None => Ok(()),
    }
}

/// Drives the controller until it halts or the step limit pauses it.
fn execute(controller: &mut RunController, output: &OutputArgs) -> Result<ExitCode> {
    let now = Instant::now();
    controller.set_interval(Duration::ZERO);
    controller.start(now)?;

    let mut trace = Vec::new();
    while controller.tick(now).is_some() {
        if !output.trace {
            continue;
        }
        if let Some(entry) = controller.log().latest() {
            if output.json {
                trace.push(entry.clone());
            } else {
                println!(
                    "Step: {}, State: {}, Head: {}, Tape: {}",
                    entry.step, entry.state, entry.head, entry.tape_snippet
                );
            }
        }
    }

    let machine = controller.machine();
    let halted = controller.status() == Status::Halted;

    if output.json {
        let mut summary = json!({
            "name": controller.preset().name,
            "status": controller.status(),
            "steps": machine.step_count(),
            "state": machine.state(),
            "head": machine.head(),
            "tape": machine.tape().to_string(),
            "outcome": controller.outcome(),
        });
        if output.trace {
            summary["trace"] = json!(trace);
        }
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        if output.trace {
            println!();
        }
        println!("Preset:  {}", controller.preset().name);
        println!("Status:  {}", controller.status());
        println!("Steps:   {}", machine.step_count());
        println!("State:   {}", machine.state());
        println!("Tape:    {}", machine.tape());
        if let Some(outcome) = controller.outcome() {
            println!("Result:  {outcome}");
        }
    }

    if halted {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!(
            "Machine did not halt within {} steps",
            machine.step_count()
        );
        Ok(ExitCode::from(2))
    }
}

fn check(path: &Path) -> Result<ExitCode> {
    let preset = PresetLoader::load_preset(path)
        .with_context(|| format!("failed to load preset from {}", path.display()))?;
    let findings = analyze(&preset);

    if findings.is_empty() {
        println!("{}: no issues found", preset.name);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}: {} issue(s)", preset.name, findings.len());
    for finding in &findings {
        println!("  - {finding}");
    }
    Ok(ExitCode::FAILURE)
}
