//! The `icl` command-line front end.
//!
//! Binds the compiler core's operations to subcommands:
//!
//! | Command | Operation |
//! |---------|-----------|
//! | `icl compile` | emit one or more targets |
//! | `icl check` | diagnostics only |
//! | `icl explain` | JSON payload: ast/ir/lowered/graph/source_map |
//! | `icl compress` | canonical compact serialization |
//! | `icl diff` | structural diff of two graph files |
//! | `icl pack list` / `icl pack validate` | registry introspection |
//! | `icl contract test` | contract corpus per target |
//!
//! Inputs are a path when one exists at that location, otherwise literal
//! source text. Exit codes: `0` success, `1` compiler error, `2` usage
//! error, `3` internal error. `RUST_LOG` controls log verbosity.

use clap::{Args, Parser, Subcommand};
use icl_base::DiagnosticList;
use icl_compile::compile::CompileOptions;
use icl_compile::contract::contract_test;
use icl_compile::diff::diff_graphs;
use icl_compile::manifest::Stability;
use icl_compile::registry::{build_pack, build_plugin, parse_spec};
use icl_compile::Compiler;
use icl_language::alias::{normalize, AliasMode};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "icl")]
#[command(about = "The Intent Compression Language compiler", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by the source-consuming commands.
#[derive(Args, Clone)]
struct SourceOpts {
    /// Enable the alias normalizer (core table unless --alias-mode says
    /// otherwise)
    #[arg(long)]
    natural: bool,

    /// Alias table: core or extended (implies --natural)
    #[arg(long, value_name = "MODE")]
    alias_mode: Option<String>,

    /// Include the alias rewrite trace in the output
    #[arg(long)]
    alias_trace: bool,

    /// Constant folding and dead-assignment removal over the IR
    #[arg(long)]
    optimize: bool,

    /// Debug emission context
    #[arg(long)]
    debug: bool,

    /// Extra macro plug-in, as module[:symbol] (repeatable)
    #[arg(long = "plugin", value_name = "MODULE[:SYMBOL]")]
    plugins: Vec<String>,

    /// Extra language pack, as module[:symbol] (repeatable)
    #[arg(long = "pack", value_name = "MODULE[:SYMBOL]")]
    packs: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile source for one or more targets
    Compile {
        /// Source file path, or literal ICL source
        input: String,

        /// Target id or alias (repeatable via --targets)
        #[arg(long)]
        target: Option<String>,

        /// Comma-separated target ids
        #[arg(long, value_delimiter = ',')]
        targets: Vec<String>,

        /// Write the intent-graph JSON artifact here
        #[arg(long, value_name = "PATH")]
        emit_graph: Option<PathBuf>,

        /// Write the source-map JSON artifact here
        #[arg(long, value_name = "PATH")]
        emit_sourcemap: Option<PathBuf>,

        /// Write bundles under DIR/<target>/ instead of stdout
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        #[command(flatten)]
        opts: SourceOpts,
    },
    /// Check source and report diagnostics
    Check {
        input: String,
        #[command(flatten)]
        opts: SourceOpts,
    },
    /// Print the explain JSON payload
    Explain {
        input: String,
        /// Include the lowered module for this target
        #[arg(long)]
        target: Option<String>,
        #[command(flatten)]
        opts: SourceOpts,
    },
    /// Print the canonical compact serialization
    Compress {
        input: String,
        #[command(flatten)]
        opts: SourceOpts,
    },
    /// Structurally diff two serialized intent graphs
    Diff {
        graph_a: PathBuf,
        graph_b: PathBuf,
    },
    /// Pack registry operations
    Pack {
        #[command(subcommand)]
        command: PackCommands,
    },
    /// Contract-test harness
    Contract {
        #[command(subcommand)]
        command: ContractCommands,
    },
}

#[derive(Subcommand)]
enum PackCommands {
    /// List registered pack manifests
    List {
        /// Filter: experimental, beta, or stable
        #[arg(long)]
        stability: Option<String>,
    },
    /// Validate registered pack manifests
    Validate {
        /// Validate one target only
        #[arg(long)]
        target: Option<String>,
    },
}

#[derive(Subcommand)]
enum ContractCommands {
    /// Run the contract corpus
    Test {
        /// Target to test (repeatable)
        #[arg(long = "target")]
        targets: Vec<String>,

        /// Test every registered target
        #[arg(long)]
        all: bool,
    },
}

/// A command failure carrying its exit code.
enum Failure {
    /// Exit 1: diagnostics, already rendered.
    Compiler(String),
    /// Exit 2: bad invocation.
    Usage(String),
    /// Exit 3: I/O or other internal problem.
    Internal(String),
}

impl Failure {
    fn code(&self) -> u8 {
        match self {
            Failure::Compiler(_) => 1,
            Failure::Usage(_) => 2,
            Failure::Internal(_) => 3,
        }
    }

    fn message(&self) -> &str {
        match self {
            Failure::Compiler(m) | Failure::Usage(m) | Failure::Internal(m) => m,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            if !failure.message().is_empty() {
                eprintln!("{}", failure.message());
            }
            ExitCode::from(failure.code())
        }
    }
}

/// Reads `input` as a file when one exists, else treats it as literal
/// source. Returns `(source, logical name)`.
fn load_input(input: &str) -> Result<(String, String), Failure> {
    let path = Path::new(input);
    if path.is_file() {
        let source = fs::read_to_string(path)
            .map_err(|e| Failure::Internal(format!("cannot read '{}': {}", input, e)))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| input.to_string());
        Ok((source, name))
    } else {
        Ok((input.to_string(), "<input>".to_string()))
    }
}

fn parse_alias_mode(opts: &SourceOpts) -> Result<Option<AliasMode>, Failure> {
    match opts.alias_mode.as_deref() {
        Some("core") => Ok(Some(AliasMode::Core)),
        Some("extended") => Ok(Some(AliasMode::Extended)),
        Some(other) => Err(Failure::Usage(format!(
            "[CLI001] unknown alias mode '{}' (expected core or extended)",
            other
        ))),
        None if opts.natural => Ok(Some(AliasMode::Core)),
        None => Ok(None),
    }
}

fn build_options(opts: &SourceOpts, source_name: String) -> Result<CompileOptions, Failure> {
    Ok(CompileOptions {
        targets: Vec::new(),
        alias_mode: parse_alias_mode(opts)?,
        alias_trace: opts.alias_trace,
        optimize: opts.optimize,
        debug: opts.debug,
        source_name,
    })
}

/// Builds the compiler and applies --pack / --plugin registrations.
fn build_compiler(opts: &SourceOpts) -> Result<Compiler, Failure> {
    let mut compiler = Compiler::new();
    for spec in &opts.packs {
        let spec = parse_spec(spec).map_err(|d| Failure::Usage(d.to_string()))?;
        let pack = build_pack(&spec).map_err(|d| Failure::Usage(d.to_string()))?;
        // Re-registering a builtin is a no-op failure we surface as usage.
        compiler
            .packs
            .register(pack)
            .map_err(|d| Failure::Usage(d.to_string()))?;
    }
    for spec in &opts.plugins {
        let spec = parse_spec(spec).map_err(|d| Failure::Usage(d.to_string()))?;
        let (name, expander) =
            build_plugin(&spec).map_err(|d| Failure::Usage(d.to_string()))?;
        compiler.macros.register(&name, expander);
    }
    Ok(compiler)
}

/// Renders aggregated diagnostics against the text their spans refer to.
fn render_diagnostics(
    diagnostics: &DiagnosticList,
    source: &str,
    alias_mode: Option<AliasMode>,
) -> String {
    // Spans point into the normalized text when the alias pass ran.
    let text = match alias_mode {
        Some(mode) => normalize(source, mode)
            .map(|(text, _)| text)
            .unwrap_or_else(|_| source.to_string()),
        None => source.to_string(),
    };
    diagnostics
        .iter()
        .map(|d| d.render(&text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn run(cli: Cli) -> Result<(), Failure> {
    match cli.command {
        Commands::Compile {
            input,
            target,
            targets,
            emit_graph,
            emit_sourcemap,
            out_dir,
            opts,
        } => {
            let (source, name) = load_input(&input)?;
            let mut all_targets = targets;
            if let Some(target) = target {
                all_targets.insert(0, target);
            }
            if all_targets.is_empty() {
                return Err(Failure::Usage(
                    "[CLI001] at least one --target is required".to_string(),
                ));
            }
            let compiler = build_compiler(&opts)?;
            let mut options = build_options(&opts, name)?;
            options.targets = all_targets;

            let outcome = compiler.compile(&source, &options).map_err(|diags| {
                Failure::Compiler(render_diagnostics(&diags, &source, options.alias_mode))
            })?;

            if let Some(path) = emit_graph {
                write_json(&path, &outcome.graph)?;
            }
            if let Some(path) = emit_sourcemap {
                write_json(&path, &outcome.source_map)?;
            }
            if let Some(trace) = &outcome.alias_trace {
                let value = serde_json::to_value(trace).unwrap_or_default();
                eprintln!("alias trace: {}", value);
            }

            let mut failed = false;
            for target_outcome in &outcome.targets {
                match &target_outcome.result {
                    Ok(artifact) => {
                        for warning in &artifact.warnings {
                            eprintln!("{}", warning);
                        }
                        match &out_dir {
                            Some(dir) => {
                                let target_dir = dir.join(&target_outcome.target);
                                for (path, content) in &artifact.bundle.files {
                                    let file_path = target_dir.join(path);
                                    if let Some(parent) = file_path.parent() {
                                        fs::create_dir_all(parent).map_err(|e| {
                                            Failure::Internal(format!(
                                                "cannot create '{}': {}",
                                                parent.display(),
                                                e
                                            ))
                                        })?;
                                    }
                                    fs::write(&file_path, content).map_err(|e| {
                                        Failure::Internal(format!(
                                            "cannot write '{}': {}",
                                            file_path.display(),
                                            e
                                        ))
                                    })?;
                                }
                                println!(
                                    "{}: wrote {} file(s) to {}",
                                    target_outcome.target,
                                    artifact.bundle.files.len(),
                                    target_dir.display()
                                );
                            }
                            None if outcome.targets.len() == 1 => {
                                print!("{}", artifact.bundle.primary_text());
                            }
                            None => {
                                println!(
                                    "== {} ({}) ==",
                                    target_outcome.target, artifact.bundle.primary_path
                                );
                                print!("{}", artifact.bundle.primary_text());
                            }
                        }
                    }
                    Err(diags) => {
                        failed = true;
                        eprintln!(
                            "target '{}' failed:\n{}",
                            target_outcome.target,
                            render_diagnostics(diags, &source, options.alias_mode)
                        );
                    }
                }
            }
            if failed {
                return Err(Failure::Compiler(String::new()));
            }
            Ok(())
        }

        Commands::Check { input, opts } => {
            let (source, name) = load_input(&input)?;
            let compiler = build_compiler(&opts)?;
            let options = build_options(&opts, name)?;
            compiler.check(&source, &options).map_err(|diags| {
                Failure::Compiler(render_diagnostics(&diags, &source, options.alias_mode))
            })?;
            println!("OK");
            Ok(())
        }

        Commands::Explain {
            input,
            target,
            opts,
        } => {
            let (source, name) = load_input(&input)?;
            let compiler = build_compiler(&opts)?;
            let options = build_options(&opts, name)?;
            let payload = compiler
                .explain(&source, target.as_deref(), &options)
                .map_err(|diags| {
                    Failure::Compiler(render_diagnostics(&diags, &source, options.alias_mode))
                })?;
            println!(
                "{}",
                serde_json::to_string_pretty(&payload)
                    .map_err(|e| Failure::Internal(e.to_string()))?
            );
            Ok(())
        }

        Commands::Compress { input, opts } => {
            let (source, name) = load_input(&input)?;
            let compiler = build_compiler(&opts)?;
            let options = build_options(&opts, name)?;
            let compact = compiler.compress(&source, &options).map_err(|diags| {
                Failure::Compiler(render_diagnostics(&diags, &source, options.alias_mode))
            })?;
            println!("{}", compact);
            Ok(())
        }

        Commands::Diff { graph_a, graph_b } => {
            let a = read_json(&graph_a)?;
            let b = read_json(&graph_b)?;
            let diff = diff_graphs(&a, &b).map_err(|d| Failure::Usage(d.to_string()))?;
            println!(
                "{}",
                serde_json::to_string_pretty(&diff)
                    .map_err(|e| Failure::Internal(e.to_string()))?
            );
            Ok(())
        }

        Commands::Pack { command } => {
            let compiler = Compiler::new();
            match command {
                PackCommands::List { stability } => {
                    let filter = match stability.as_deref() {
                        Some(name) => Some(Stability::parse(name).ok_or_else(|| {
                            Failure::Usage(format!("[CLI001] unknown stability '{}'", name))
                        })?),
                        None => None,
                    };
                    let manifests = compiler.packs.list(filter);
                    let value = serde_json::to_value(&manifests)
                        .map_err(|e| Failure::Internal(e.to_string()))?;
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&value)
                            .map_err(|e| Failure::Internal(e.to_string()))?
                    );
                    Ok(())
                }
                PackCommands::Validate { target } => {
                    let reports = match target {
                        Some(target) => {
                            let pack = compiler
                                .packs
                                .get(&target)
                                .map_err(|d| Failure::Usage(d.to_string()))?;
                            vec![(
                                pack.manifest().target.clone(),
                                pack.manifest().validate(),
                            )]
                        }
                        None => compiler.packs.validate_all(),
                    };
                    let mut failed = false;
                    for (target, result) in reports {
                        match result {
                            Ok(()) => println!("{}: ok", target),
                            Err(diags) => {
                                failed = true;
                                println!("{}: INVALID\n{}", target, diags);
                            }
                        }
                    }
                    if failed {
                        Err(Failure::Compiler(String::new()))
                    } else {
                        Ok(())
                    }
                }
            }
        }

        Commands::Contract { command } => match command {
            ContractCommands::Test { targets, all } => {
                let compiler = Compiler::new();
                let filter = if all || targets.is_empty() {
                    None
                } else {
                    Some(targets)
                };
                let report = contract_test(&compiler, filter.as_deref())
                    .map_err(|d| Failure::Usage(d.to_string()))?;
                let value = serde_json::to_value(&report)
                    .map_err(|e| Failure::Internal(e.to_string()))?;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&value)
                        .map_err(|e| Failure::Internal(e.to_string()))?
                );
                if report.passed() {
                    Ok(())
                } else {
                    Err(Failure::Compiler(
                        "contract corpus reported failures".to_string(),
                    ))
                }
            }
        },
    }
}

fn write_json(path: &Path, value: &serde_json::Value) -> Result<(), Failure> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| Failure::Internal(e.to_string()))?;
    fs::write(path, text)
        .map_err(|e| Failure::Internal(format!("cannot write '{}': {}", path.display(), e)))
}

fn read_json(path: &Path) -> Result<serde_json::Value, Failure> {
    let text = fs::read_to_string(path)
        .map_err(|e| Failure::Internal(format!("cannot read '{}': {}", path.display(), e)))?;
    serde_json::from_str(&text)
        .map_err(|e| Failure::Usage(format!("[CLI001] '{}' is not JSON: {}", path.display(), e)))
}
