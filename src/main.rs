use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use blog_feed::api::Tab;
use blog_feed::RunOptions;
use tracing_subscriber::{fmt, EnvFilter};

const HELP: &str = "Blog Feed - Browse the community blog aggregation feed from the terminal.

  --tab <name>         trending (default), curated, recent or feed
  --pages <n>          Number of pages to load (default 1)
  --config <path>      Read configuration from this file
  --login              Open the Discord sign-in page in your browser
  --redirect <url>     Finish signing in with the address you landed on
  --register <url>     Register your blog (Velog, Medium, DEV.to, Tistory, GitHub Pages)
  --logout             Forget the stored session
  --version, -V        Show version and exit
  --help,    -h        Show this help message";

enum Command {
    Run(RunOptions),
    Exit,
}

fn main() {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let command = match parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("error: {err}\n\n{HELP}");
            std::process::exit(2);
        }
    };
    let Command::Run(opts) = command else {
        return;
    };

    if let Err(err) = blog_feed::run(opts) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Command> {
    let mut opts = RunOptions::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Blog Feed {}", blog_feed::VERSION);
                return Ok(Command::Exit);
            }
            "--help" | "-h" => {
                println!("{HELP}");
                return Ok(Command::Exit);
            }
            "--tab" => {
                let value = args.next().context("--tab needs a value")?;
                opts.tab = value.parse::<Tab>()?;
            }
            "--pages" => {
                let value = args.next().context("--pages needs a value")?;
                opts.pages = value
                    .parse()
                    .with_context(|| format!("invalid page count {value}"))?;
            }
            "--config" => {
                let value = args.next().context("--config needs a value")?;
                opts.config_file = Some(PathBuf::from(value));
            }
            "--redirect" => {
                opts.redirect = Some(args.next().context("--redirect needs a value")?);
            }
            "--register" => {
                opts.register = Some(args.next().context("--register needs a value")?);
            }
            "--login" => opts.login = true,
            "--logout" => opts.logout = true,
            other => bail!("unknown argument {other}"),
        }
    }
    Ok(Command::Run(opts))
}
