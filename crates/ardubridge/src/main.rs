mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{Command, Connection};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "ardubridge", version, about = "ArduBridge board control CLI")]
struct Cli {
    /// Serial port the board is attached to.
    #[arg(long, short = 'p', env = "ARDUBRIDGE_PORT", global = true)]
    port: Option<String>,

    /// Serial baud rate.
    #[arg(
        long,
        short = 'b',
        env = "ARDUBRIDGE_BAUD",
        default_value_t = 115_200,
        global = true
    )]
    baud: u32,

    /// Identification retries after the first attempt.
    #[arg(long, default_value_t = 6, global = true)]
    retries: u32,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            std::process::exit(exit::USAGE);
        }
        Err(err) => err.exit(),
    };
    init_logging(cli.log_format, cli.log_level);

    let conn = Connection {
        port: cli.port,
        baud: cli.baud,
        retries: cli.retries,
    };
    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, &conn, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
