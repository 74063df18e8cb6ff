use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pathprobe",
    version,
    about = "sensitive path detection tool",
    long_about = "Pathprobe probes a dictionary of sensitive paths against target base URLs and reports the ones whose response body matches the expected signature.\n\nExamples:\n  pathprobe -u https://target.tld\n  pathprobe -u https://target.tld -d ./dictionaries/spring.json --timeout 10\n  pathprobe -i ./targets.txt -p http://127.0.0.1:8080 -o found.json\n\nTip: Use --config to persist scan settings and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'u',
        long = "url",
        value_name = "URL",
        action = ArgAction::Append,
        help_heading = "Input",
        help = "Target base URL (repeatable)."
    )]
    pub url: Vec<String>,

    #[arg(
        short = 'i',
        long = "input-file",
        value_name = "FILE",
        help_heading = "Input",
        help = "Load target base URLs from a file (one per line)."
    )]
    pub input_file: Option<String>,

    #[arg(
        short = 'd',
        long = "dictionary",
        value_name = "FILE",
        help_heading = "Input",
        help = "Dictionary file mapping paths to signatures (.json/.yml); built-in set when omitted."
    )]
    pub dictionary: Option<String>,

    #[arg(
        short = 'C',
        long = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.pathprobe/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        short = 'p',
        long = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "Route requests through this proxy."
    )]
    pub proxy: Option<String>,

    #[arg(
        long = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Total request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        long = "max-failures",
        value_name = "N",
        help_heading = "Scan",
        help = "Abandon a target after more than N failed requests."
    )]
    pub max_failures: Option<u32>,

    #[arg(
        long = "length-filter",
        value_name = "MIN-MAX",
        num_args = 0..=1,
        default_missing_value = "100-10000",
        help_heading = "Scan",
        help = "Only match bodies whose length falls strictly inside MIN-MAX."
    )]
    pub length_filter: Option<String>,

    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write matched URLs to a file."
    )]
    pub output: Option<String>,

    #[arg(
        long = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output format: text or json (inferred from the file extension when omitted)."
    )]
    pub output_format: Option<String>,

    #[arg(
        long = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,
}
