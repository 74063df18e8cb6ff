use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::output;
use crate::prober::{ProbeProgress, ScanLogger, MAX_FAILED_COUNT};
use crate::runner::{DictionarySource, Options, Runner};
use crate::utils::{self, LengthBounds};

fn print_banner(no_color: bool) {
    let _ = no_color;
    const BANNER: &str = r#"
                 __  __                     __
    ____  ____ _/ /_/ /_  ____  _________  / /_  ___
   / __ \/ __ `/ __/ __ \/ __ \/ ___/ __ \/ __ \/ _ \
  / /_/ / /_/ / /_/ / / / /_/ / /  / /_/ / /_/ /  __/
 / .___/\__,_/\__/_/ /_/ .___/_/   \____/_.___/\___/
/_/                   /_/
       v0.3.2 - sensitive path detection tool
    "#;
    print!("{}", BANNER);
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[derive(Clone, Debug)]
struct RunConfig {
    urls: Vec<String>,
    input_file_path: Option<String>,
    dictionary_path: Option<String>,
    proxy: String,
    timeout: u64,
    max_failures: u32,
    length_filter: Option<LengthBounds>,
    output: Option<String>,
    output_format: Option<String>,
    no_color: bool,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);
    let timeout = args.timeout.or(cfg.timeout).unwrap_or(10);
    let max_failures = args
        .max_failures
        .or(cfg.max_failures)
        .unwrap_or(MAX_FAILED_COUNT);
    let proxy = args.proxy.or(cfg.proxy).unwrap_or_default();

    let length_filter = match args.length_filter.or(cfg.length_filter) {
        Some(raw) => Some(
            utils::parse_length_bounds_range(&raw)
                .map_err(|e| format!("invalid --length-filter '{raw}': {e}"))?,
        ),
        None => None,
    };

    let dictionary_path = args
        .dictionary
        .or(cfg.dictionary)
        .map(|p| config::expand_tilde_string(&p));

    let output = args
        .output
        .or(cfg.output)
        .map(|p| config::expand_tilde_string(&p));
    let output_format = args.output_format.or(cfg.output_format);

    let mut urls: Vec<String> = vec![];
    for u in args.url.into_iter() {
        urls.push(utils::trim_url(&u));
    }
    if let Some(extra_urls) = cfg.urls {
        for u in extra_urls {
            urls.push(utils::trim_url(&u));
        }
    }
    let input_file_path = args
        .input_file
        .or(cfg.input_file)
        .map(|p| config::expand_tilde_string(&p));

    Ok(RunConfig {
        urls,
        input_file_path,
        dictionary_path,
        proxy,
        timeout,
        max_failures,
        length_filter,
        output,
        output_format,
        no_color,
    })
}

struct BarProgress {
    pb: ProgressBar,
}

impl ProbeProgress for BarProgress {
    fn on_probe(&self, url: &str) {
        self.pb.inc(1);
        self.pb.set_message(format!(
            "{} {}",
            "probing ::".bold().white(),
            url.bold().blue(),
        ));
    }
}

struct BarLogger {
    pb: ProgressBar,
}

impl ScanLogger for BarLogger {
    fn log_error(&self, url: &str, detail: &str) {
        self.pb.println(format!(
            "{} {} {}",
            "request failed ::".bold().red(),
            url.bold().blue(),
            detail.bold().white(),
        ));
    }
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    print_banner(run.no_color);

    let options = Options {
        urls: run.urls.clone(),
        input_file: run.input_file_path.clone(),
        dictionary: match run.dictionary_path.clone() {
            Some(path) => DictionarySource::FilePath(path),
            None => DictionarySource::Builtin,
        },
        proxy: if run.proxy.trim().is_empty() {
            None
        } else {
            Some(run.proxy.clone())
        },
        timeout_seconds: run.timeout,
        max_failed_count: run.max_failures,
        length_filter: run.length_filter,
    };
    let runner = Runner::new(options).map_err(|e| e.to_string())?;
    let paths = runner.load_dictionary().map_err(|e| e.to_string())?;
    let targets = runner.load_targets().await.map_err(|e| e.to_string())?;

    if let Some(target) = targets.first() {
        format_kv_line("Target", &target.original);
    }
    format_kv_line(
        "Scan",
        &format!(
            "targets={} paths={} dictionary={} max_failures={} length_filter={}",
            targets.len(),
            paths.len(),
            run.dictionary_path.as_deref().unwrap_or("builtin"),
            run.max_failures,
            match run.length_filter {
                Some(bounds) => format!("{}-{}", bounds.min, bounds.max),
                None => "off".to_string(),
            },
        ),
    );
    format_kv_line(
        "HTTP",
        &format!(
            "timeout={}s proxy={} verify_tls={}",
            run.timeout,
            if run.proxy.trim().is_empty() {
                "off"
            } else {
                "on"
            },
            format_bool(false),
        ),
    );
    println!();

    let bar_length = (paths.len() * targets.len()).max(1) as u64;
    let pb = ProgressBar::new(bar_length);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(200));
    pb.set_style(
        ProgressStyle::with_template(
            ":: Progress: [{pos}/{len}] :: {per_sec} :: Duration: [{elapsed_precise}] :: {msg}",
        )
        .map_err(|e| format!("failed to build progress bar style: {e}"))?
        .progress_chars(r#"#>-"#),
    );

    let progress = Arc::new(BarProgress { pb: pb.clone() });
    let logger = Arc::new(BarLogger { pb: pb.clone() });
    let report = runner
        .run_with(progress, logger)
        .await
        .map_err(|e| e.to_string())?;
    pb.finish_and_clear();

    let mut total_matches = 0usize;
    for target in report.targets.iter() {
        for url in target.detected.iter() {
            total_matches += 1;
            println!(
                "{} {}",
                "found sensitive path ::".bold().green(),
                url.bold().blue(),
            );
        }
        if target.aborted {
            println!(
                "{} {} {}",
                "abandoned scan for ::".bold().yellow(),
                target.base_url.bold().blue(),
                format!("after {} failed requests", target.failed_count)
                    .bold()
                    .white(),
            );
        }
    }

    if let Some(outfile_path) = run.output.as_ref() {
        let output_format = run
            .output_format
            .as_deref()
            .and_then(output::OutputFormat::parse)
            .or_else(|| output::infer_format_from_path(outfile_path))
            .unwrap_or(output::OutputFormat::Text);

        let records = output::build_records(&report.targets);
        let rendered = match output_format {
            output::OutputFormat::Text => output::render_text(&records),
            output::OutputFormat::Json => output::render_json(&records),
        };

        let mut outfile = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(outfile_path)
            .await
            .map_err(|e| format!("failed to open output file: {e}"))?;
        outfile
            .write_all(&rendered)
            .await
            .map_err(|_| "failed to write output file".to_string())?;
    }

    println!();
    println!(
        ":: Completed :: {} matches :: scan took {}s ::",
        total_matches,
        report.elapsed.as_secs()
    );

    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = CliArgs::parse();

    let user_config_path = args.config.clone().map(|p| config::expand_tilde(&p));
    let cfg = match user_config_path.as_ref() {
        Some(path) => config::load_config(path, false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))?;
    Ok(())
}
