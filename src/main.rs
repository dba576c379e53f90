// Main CLI entry point for authorder
// Uses clap for argument parsing

use anyhow::Context;
use authorder::actions::{schedule, select_actions, ACTIONS};
use authorder::arn::UuidIdentityGenerator;
use authorder::auth::SigV4Signer;
use authorder::config::Config;
use authorder::engine::{ConsoleSink, Prober};
use authorder::mutator::{is_no_op_safe, MUTATIONS};
use authorder::reporting::{export_csv, export_json, export_markdown, RunReport};
use authorder::response_analysis::ErrorEnvelopeParser;
use authorder::transport::HttpTransport;
use authorder::verdict::AbsentCodePolicy;
use chrono::Utc;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("authorder")
        .version(clap::crate_version!())
        .author("Jake Abendroth")
        .about("Infers whether SNS checks authorization before or after validating parameters")
        .after_help("EXAMPLES:\n  authorder --config probe.toml\n  authorder -c probe.toml --action UntagResource --action RemovePermission\n  authorder -c probe.toml --include-unsafe --concurrency 4 --absent-codes inconclusive\n  authorder --list-mutations")
        .arg(Arg::new("config")
            .short('c')
            .long("config")
            .num_args(1)
            .required_unless_present_any(["list_actions", "list_mutations"])
            .help("TOML file describing the allowed and denied targets"))
        .arg(Arg::new("action")
            .short('a')
            .long("action")
            .num_args(1)
            .action(ArgAction::Append)
            .help("Probe only this action (repeatable, default: whole catalog)"))
        .arg(Arg::new("include_unsafe")
            .long("include-unsafe")
            .action(ArgAction::SetTrue)
            .help("Also probe actions whose baseline changes state"))
        .arg(Arg::new("concurrency")
            .long("concurrency")
            .num_args(1)
            .value_parser(clap::value_parser!(usize))
            .help("Actions probed at once (default: 1)"))
        .arg(Arg::new("timeout_ms")
            .long("timeout-ms")
            .num_args(1)
            .value_parser(clap::value_parser!(u64))
            .help("Per-request timeout in milliseconds (default: 10000)"))
        .arg(Arg::new("absent_codes")
            .long("absent-codes")
            .num_args(1)
            .value_parser(["match", "inconclusive"])
            .help("How two missing error codes compare (default: match)"))
        .arg(Arg::new("output_dir")
            .short('o')
            .long("output-dir")
            .num_args(1)
            .help("Directory for report files (default: current directory)"))
        .arg(Arg::new("no_csv")
            .long("no-csv")
            .action(ArgAction::SetTrue)
            .help("Do not write the CSV report"))
        .arg(Arg::new("no_markdown")
            .long("no-markdown")
            .action(ArgAction::SetTrue)
            .help("Do not write the Markdown report"))
        .arg(Arg::new("no_json")
            .long("no-json")
            .action(ArgAction::SetTrue)
            .help("Do not write the JSON report"))
        .arg(Arg::new("list_actions")
            .long("list-actions")
            .action(ArgAction::SetTrue)
            .help("Print the action catalog and exit"))
        .arg(Arg::new("list_mutations")
            .long("list-mutations")
            .action(ArgAction::SetTrue)
            .help("Print the mutation catalog and exit"))
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .action(ArgAction::Count)
            .help("More log output (-v debug, -vv trace)"))
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "authorder=warn",
        1 => "authorder=debug",
        _ => "authorder=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_actions() {
    println!("{:<26} {:<6} {:<5} {:<12} {}", "ACTION", "KIND", "SAFE", "RESOURCE", "ORDER");
    for action in ACTIONS {
        println!(
            "{:<26} {:<6} {:<5} {:<12} {:?}",
            action.name,
            action.category.to_string(),
            if action.safe { "yes" } else { "no" },
            action.resource_param,
            action.order
        );
    }
}

fn print_mutations() {
    println!("{:<30} {:<13} {}", "MUTATION", "KIND", "DESCRIPTION");
    for mutation in MUTATIONS {
        let no_op = ACTIONS.iter().any(|a| is_no_op_safe(a.name, mutation.id));
        println!(
            "{:<30} {:<13} {}{}",
            mutation.id,
            mutation.kind.to_string(),
            mutation.description,
            if no_op { " (no-op safe)" } else { "" }
        );
    }
}

/// Fold command-line overrides into the file's [run] table.
fn apply_overrides(config: &mut Config, matches: &ArgMatches) -> anyhow::Result<()> {
    let run = &mut config.run;
    if let Some(actions) = matches.get_many::<String>("action") {
        run.actions = actions.cloned().collect();
    }
    if matches.get_flag("include_unsafe") {
        run.include_unsafe = true;
    }
    if let Some(n) = matches.get_one::<usize>("concurrency") {
        run.concurrency = *n;
    }
    if let Some(ms) = matches.get_one::<u64>("timeout_ms") {
        run.timeout_ms = *ms;
    }
    if let Some(policy) = matches.get_one::<String>("absent_codes") {
        run.absent_codes = policy
            .parse::<AbsentCodePolicy>()
            .map_err(anyhow::Error::msg)?;
    }
    if let Some(dir) = matches.get_one::<String>("output_dir") {
        run.output_dir = PathBuf::from(dir);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_logging(matches.get_count("verbose"));

    if matches.get_flag("list_actions") {
        print_actions();
        return Ok(());
    }
    if matches.get_flag("list_mutations") {
        print_mutations();
        return Ok(());
    }

    let config_path = matches
        .get_one::<String>("config")
        .context("--config is required")?;
    let mut config = Config::load(Path::new(config_path))?;
    apply_overrides(&mut config, &matches)?;

    // Everything that can be wrong with the setup fails here, before any request.
    let triple = config
        .build_triple(&UuidIdentityGenerator)
        .context("invalid probe targets")?;
    let selected = select_actions(&config.run.actions, config.run.include_unsafe)?;
    let units = schedule(&selected);

    println!("Allowed:     {}", triple.allowed.id());
    println!("Denied:      {}", triple.denied.id());
    println!("Nonexistent: {}", triple.nonexistent.id());
    println!("Probing {} actions against {} mutations.", selected.len(), MUTATIONS.len());

    let options = config.run.probe_options();
    let transport = HttpTransport::new(options.timeout)?;
    let prober = Prober::new(
        Arc::new(SigV4Signer),
        Arc::new(transport),
        Arc::new(ErrorEnvelopeParser),
        Arc::new(ConsoleSink),
        options,
    );

    let started = Utc::now();
    let reports = prober.run(&units, &triple).await;
    let report = RunReport::new(&triple, started, Utc::now(), reports);
    info!(useful = report.summary.useful, probed = report.summary.probed, "run finished");

    let s = &report.summary;
    println!(
        "\n{} pairs probed, {} useful, {} skipped, {} transport failures.",
        s.probed, s.useful, s.skipped, s.transport_failures
    );
    for (action, mutation) in report.useful_pairs() {
        println!("  useful: {} / {}", action, mutation);
    }

    // Export results
    let dir = &config.run.output_dir;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create output directory {}", dir.display()))?;
    if !matches.get_flag("no_csv") {
        println!("CSV report: {}", export_csv(&report, dir)?.display());
    }
    if !matches.get_flag("no_markdown") {
        println!("Markdown report: {}", export_markdown(&report, dir)?.display());
    }
    if !matches.get_flag("no_json") {
        println!("JSON report: {}", export_json(&report, dir)?.display());
    }

    Ok(())
}
