//! `mlpy` CLI (spec.md `6`): `transpile`, `run`, `audit`, and
//! `cache {clear|stats|prune}`.
//!
//! Grounded on `oxc`'s own CLI split between argument parsing (kept to
//! this file) and the library facade it calls into (`mlpy::pipeline`);
//! unlike `oxlint`'s `clap`-free hand-rolled parsing, this CLI's flag
//! surface is narrow enough that `bpaf`'s combinator API (already the
//! workspace's chosen argument parser) is the more direct fit.

use bpaf::{construct, long, positional, Parser};
use mlpy::pipeline::{self, CompileOptions};
use mlpy::{AnalysisMode, DeepAnalysis};
use mlpy_cache::Cache;
use mlpy_capability::{Action, Token};
use mlpy_sandbox::{NetworkPolicy, Sandbox, SandboxConfig};
use mlpy_span::{FileId, SourceUnit};
use std::path::{Path, PathBuf};
use std::time::Duration;

const EXIT_SUCCESS: i32 = 0;
const EXIT_COMPILE_ERROR: i32 = 1;
const EXIT_IO_ERROR: i32 = 2;
const EXIT_SANDBOX_KILLED: i32 = 137;

#[derive(Debug, Clone)]
struct TranspileArgs {
    strict: bool,
    force: bool,
    no_source_maps: bool,
    out: Option<String>,
    file: String,
}

fn transpile_args() -> impl Parser<TranspileArgs> {
    let strict = long("strict").help("Run deep (strict-mode) security analysis before emitting").switch();
    let force = long("force").help("Bypass the cache; still write through on success").switch();
    let no_source_maps = long("no-source-maps").help("Don't emit a sibling source map file").switch();
    let out = long("out").help("Directory to write the emitted file and source map into").argument::<String>("DIR").optional();
    let file = positional::<String>("FILE");
    construct!(TranspileArgs { strict, force, no_source_maps, out, file })
}

#[derive(Debug, Clone)]
struct RunArgs {
    strict: bool,
    force: bool,
    timeout: Option<u64>,
    memory: Option<u64>,
    cap: Vec<String>,
    no_network: bool,
    allow_fs: Vec<String>,
    file: String,
}

fn run_args() -> impl Parser<RunArgs> {
    let strict = long("strict").help("Run deep (strict-mode) security analysis before executing").switch();
    let force = long("force").help("Bypass the cache; still write through on success").switch();
    let timeout = long("timeout").help("Wall-clock timeout in seconds").argument::<u64>("SECONDS").optional();
    let memory = long("memory").help("Memory limit in megabytes").argument::<u64>("MB").optional();
    let cap = long("cap").help("Grant a capability: NAME=PATTERN:ACTIONS (repeatable)").argument::<String>("NAME=PATTERN:ACTIONS").many();
    let no_network = long("no-network").help("Deny all network access (the default)").switch();
    let allow_fs = long("allow-fs").help("Add a readable/writable filesystem path pattern (repeatable)").argument::<String>("PATTERN").many();
    let file = positional::<String>("FILE");
    construct!(RunArgs { strict, force, timeout, memory, cap, no_network, allow_fs, file })
}

#[derive(Debug, Clone)]
struct AuditArgs {
    permissive: bool,
    file: String,
}

fn audit_args() -> impl Parser<AuditArgs> {
    let permissive = long("permissive").help("Report deep-security findings without failing on them").switch();
    let file = positional::<String>("FILE");
    construct!(AuditArgs { permissive, file })
}

#[derive(Debug, Clone, Copy)]
enum CacheAction {
    Clear,
    Stats,
    Prune,
}

fn cache_action() -> impl Parser<CacheAction> {
    let clear = bpaf::pure(CacheAction::Clear).to_options().command("clear").help("Delete every cached artifact");
    let stats = bpaf::pure(CacheAction::Stats).to_options().command("stats").help("Print cache occupancy");
    let prune = bpaf::pure(CacheAction::Prune).to_options().command("prune").help("Delete stale on-disk entries");
    construct!([clear, stats, prune])
}

#[derive(Debug, Clone)]
enum Command {
    Transpile(TranspileArgs),
    Run(RunArgs),
    Audit(AuditArgs),
    Cache(CacheAction),
}

fn command() -> impl Parser<Command> {
    let transpile =
        transpile_args().map(Command::Transpile).to_options().command("transpile").help("Compile a source file and emit it alongside the source");
    let run = run_args().map(Command::Run).to_options().command("run").help("Compile (cache-aware) then sandbox-execute a source file");
    let audit = audit_args().map(Command::Audit).to_options().command("audit").help("Parse and deep-analyze a source file without generating or running code");
    let cache = cache_action().map(Command::Cache).to_options().command("cache").help("Inspect or clear the transpilation cache");
    construct!([transpile, run, audit, cache])
}

fn cli() -> bpaf::OptionParser<Command> {
    command().to_options().version(env!("CARGO_PKG_VERSION")).descr("Capability-sandboxed source-to-source compiler for the mlpy scripting language")
}

fn main() {
    tracing_subscriber::fmt::try_init().ok();
    let code = match cli().run() {
        Command::Transpile(args) => run_transpile(args),
        Command::Run(args) => run_run(args),
        Command::Audit(args) => run_audit(args),
        Command::Cache(action) => run_cache_command(action),
    };
    std::process::exit(code);
}

fn strict_mode_requested(flag: bool) -> bool {
    flag || std::env::var("MLPY_STRICT").map(|v| v == "1").unwrap_or(false)
}

fn deep_analysis_for(strict: bool) -> DeepAnalysis {
    if strict {
        DeepAnalysis::Run(AnalysisMode::Strict)
    } else {
        DeepAnalysis::Skip
    }
}

/// Resolves the cache location (`MLPY_CACHE_DIR`, spec.md `6`), or a
/// fixed fallback under the system temp directory when unset.
fn resolve_cache() -> Cache {
    let dir = std::env::var_os("MLPY_CACHE_DIR").map(PathBuf::from).unwrap_or_else(|| std::env::temp_dir().join("mlpy-cache"));
    Cache::with_disk_tier(dir, "py")
}

fn read_source(path: &Path) -> Result<SourceUnit, i32> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(SourceUnit::new(FileId::new(path.to_string_lossy().into_owned()), text)),
        Err(err) => {
            eprintln!("error: failed to read '{}': {err}", path.display());
            Err(EXIT_IO_ERROR)
        }
    }
}

fn print_diagnostics(source: &SourceUnit, deep_analysis: DeepAnalysis) {
    for record in pipeline::diagnose(source, deep_analysis) {
        eprintln!("{record}");
    }
}

fn run_transpile(args: TranspileArgs) -> i32 {
    let path = PathBuf::from(&args.file);
    let source = match read_source(&path) {
        Ok(source) => source,
        Err(code) => return code,
    };

    let strict = strict_mode_requested(args.strict);
    let options = CompileOptions { deep_analysis: deep_analysis_for(strict), force: args.force, emit_source_maps: !args.no_source_maps };
    let cache = resolve_cache();
    let registry = pipeline::default_registry();

    match pipeline::compile(&source, &path, &cache, &registry, &options) {
        pipeline::CompileOutcome::Success(artifact) => {
            let out_dir = args.out.map(PathBuf::from).unwrap_or_else(|| path.parent().map(Path::to_path_buf).unwrap_or_default());
            if let Err(err) = std::fs::create_dir_all(&out_dir) {
                eprintln!("error: failed to create output directory '{}': {err}", out_dir.display());
                return EXIT_IO_ERROR;
            }

            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
            let emitted_path = out_dir.join(format!("{stem}.py"));
            let mut emitted = artifact.header_line();
            emitted.push('\n');
            emitted.push_str(&artifact.emitted_source);
            if let Err(err) = std::fs::write(&emitted_path, emitted) {
                eprintln!("error: failed to write '{}': {err}", emitted_path.display());
                return EXIT_IO_ERROR;
            }

            if options.emit_source_maps {
                let map_path = out_dir.join(format!("{stem}.py.map"));
                if let Err(err) = std::fs::write(&map_path, artifact.source_map.encode()) {
                    eprintln!("error: failed to write '{}': {err}", map_path.display());
                    return EXIT_IO_ERROR;
                }
            }

            for diagnostic in &artifact.diagnostics {
                eprintln!("warning: {diagnostic}");
            }
            println!("{}", emitted_path.display());
            EXIT_SUCCESS
        }
        pipeline::CompileOutcome::Failure(message) => {
            eprintln!("{message}");
            print_diagnostics(&source, options.deep_analysis);
            EXIT_COMPILE_ERROR
        }
    }
}

/// Parses one `--cap NAME=PATTERN:ACTIONS` occurrence (spec.md `6`)
/// into a granted [`Token`]. `ACTIONS` is a comma-separated subset of
/// `read`, `write`, `execute`, `connect`, `delete`.
fn parse_cap_token(spec: &str, issued_by: &str) -> Result<Token, String> {
    let (name, rest) = spec.split_once('=').ok_or_else(|| format!("malformed --cap '{spec}': expected NAME=PATTERN:ACTIONS"))?;
    let (pattern, actions_str) = rest.split_once(':').ok_or_else(|| format!("malformed --cap '{spec}': expected NAME=PATTERN:ACTIONS"))?;

    let mut actions = Action::empty();
    for action_name in actions_str.split(',') {
        let action = match action_name.trim() {
            "read" => Action::READ,
            "write" => Action::WRITE,
            "execute" => Action::EXECUTE,
            "connect" => Action::CONNECT,
            "delete" => Action::DELETE,
            other => return Err(format!("unknown action '{other}' in --cap '{spec}'")),
        };
        actions |= action;
    }

    Ok(Token::new(name, pattern, actions, issued_by))
}

fn run_run(args: RunArgs) -> i32 {
    let path = PathBuf::from(&args.file);
    let source = match read_source(&path) {
        Ok(source) => source,
        Err(code) => return code,
    };

    let strict = strict_mode_requested(args.strict);
    let options = CompileOptions { deep_analysis: deep_analysis_for(strict), force: args.force, emit_source_maps: false };
    let cache = resolve_cache();
    let registry = pipeline::default_registry();

    let artifact = match pipeline::compile(&source, &path, &cache, &registry, &options) {
        pipeline::CompileOutcome::Success(artifact) => artifact,
        pipeline::CompileOutcome::Failure(message) => {
            eprintln!("{message}");
            print_diagnostics(&source, options.deep_analysis);
            return EXIT_COMPILE_ERROR;
        }
    };

    let mut tokens = Vec::new();
    for cap_spec in &args.cap {
        match parse_cap_token(cap_spec, "cli") {
            Ok(token) => tokens.push(token),
            Err(message) => {
                eprintln!("error: {message}");
                return EXIT_IO_ERROR;
            }
        }
    }

    let mut config = SandboxConfig::default();
    if let Some(seconds) = args.timeout {
        config.wall_clock_timeout = Duration::from_secs(seconds);
    }
    if let Some(mb) = args.memory {
        config.memory_limit_bytes = Some(mb * 1024 * 1024);
    }
    config.filesystem_whitelist = args.allow_fs;
    config.network_policy = if args.no_network { NetworkPolicy::Deny } else { NetworkPolicy::Deny };

    let sandbox = Sandbox::new(config);
    match sandbox.execute(&artifact, &registry, &tokens) {
        Ok(result) => {
            print!("{}", result.output);
            if let Some(error) = &result.error {
                if !result.success {
                    eprintln!("{error}");
                }
            }
            match result.exit_code {
                Some(code) => code,
                None => EXIT_SANDBOX_KILLED,
            }
        }
        Err(err) => {
            eprintln!("error: {err}");
            EXIT_IO_ERROR
        }
    }
}

fn run_audit(args: AuditArgs) -> i32 {
    let path = PathBuf::from(&args.file);
    let source = match read_source(&path) {
        Ok(source) => source,
        Err(code) => return code,
    };

    let mode = if args.permissive { AnalysisMode::Permissive } else { AnalysisMode::Strict };
    let report = pipeline::audit(&source, mode);
    for record in &report.diagnostics {
        eprintln!("{record}");
    }

    if report.has_critical_findings() {
        EXIT_COMPILE_ERROR
    } else {
        EXIT_SUCCESS
    }
}

fn run_cache_command(action: CacheAction) -> i32 {
    let cache = resolve_cache();
    match action {
        CacheAction::Clear => match cache.clear() {
            Ok(()) => {
                println!("cache cleared");
                EXIT_SUCCESS
            }
            Err(err) => {
                eprintln!("error: {err}");
                EXIT_IO_ERROR
            }
        },
        CacheAction::Stats => match cache.stats() {
            Ok(stats) => {
                println!("memory entries: {}", stats.memory_entries);
                println!("disk entries: {}", stats.disk.entries);
                println!("disk bytes: {}", stats.disk.total_bytes);
                EXIT_SUCCESS
            }
            Err(err) => {
                eprintln!("error: {err}");
                EXIT_IO_ERROR
            }
        },
        CacheAction::Prune => match cache.prune() {
            Ok(removed) => {
                println!("pruned {removed} stale entries");
                EXIT_SUCCESS
            }
            Err(err) => {
                eprintln!("error: {err}");
                EXIT_IO_ERROR
            }
        },
    }
}

