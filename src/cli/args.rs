use crate::types::ServerError;
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Serve the CNP banking protocol over TCP
#[derive(Parser, Debug)]
#[command(name = "cnp-server")]
#[command(about = "CNP banking protocol server", long_about = None)]
pub struct CliArgs {
    /// TCP port to listen on
    #[arg(
        long = "port",
        value_name = "PORT",
        help = "Listening port (prompted on stdin when omitted)"
    )]
    pub port: Option<u16>,

    /// Directory holding the persisted account and transaction tables
    #[arg(
        long = "data-dir",
        value_name = "DIR",
        default_value = "./Data",
        help = "Directory for the persisted tables"
    )]
    pub data_dir: PathBuf,

    /// Socket receive timeout in milliseconds
    #[arg(
        long = "recv-timeout-ms",
        value_name = "MS",
        default_value_t = 500,
        help = "Receive timeout; bounds shutdown latency (default: 500)"
    )]
    pub recv_timeout_ms: u64,
}

/// Parse command-line arguments, exiting on --help or bad input
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

impl CliArgs {
    /// The port to listen on, prompting on stdin when none was given
    pub fn resolve_port(&self) -> Result<u16, ServerError> {
        match self.port {
            Some(port) => Ok(port),
            None => {
                let stdin = std::io::stdin();
                let stdout = std::io::stdout();
                prompt_port(&mut stdin.lock(), &mut stdout.lock())
            }
        }
    }
}

/// Prompt for a listening port until a valid one is entered
///
/// End of input before a valid port is a startup failure.
fn prompt_port(input: &mut impl BufRead, output: &mut impl Write) -> Result<u16, ServerError> {
    loop {
        write!(output, "Enter listening port: ")
            .and_then(|_| output.flush())
            .map_err(ServerError::startup)?;

        let mut line = String::new();
        let read = input.read_line(&mut line).map_err(ServerError::startup)?;
        if read == 0 {
            return Err(ServerError::startup("no port supplied"));
        }

        match line.trim().parse::<u16>() {
            Ok(port) if port != 0 => return Ok(port),
            _ => writeln!(output, "invalid port '{}'", line.trim())
                .map_err(ServerError::startup)?,
        }
    }
}
