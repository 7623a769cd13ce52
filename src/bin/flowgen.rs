use clap::Parser;
use flowgen::{setup_tracing, AppResult, Generator, ServerConfig};

#[derive(Parser)]
#[command(version, about = "Dynamic traffic generator application server")]
pub struct CommandLine {
    /// port number (default 5000)
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
    /// path to config file
    #[arg(short, long)]
    pub conf: Option<String>,
    /// log level (v: info, vv: debug, vvv: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn main() -> AppResult<()> {
    let commandline: CommandLine = CommandLine::parse();

    let default_directive = match commandline.verbose {
        0 | 1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _worker_guard = setup_tracing(default_directive);

    // file (if any) first, then CLI flags on top
    let mut config = match &commandline.conf {
        Some(path) => ServerConfig::set_up_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = commandline.port {
        config.network.port = port;
    }

    let generator = Generator::new(config);
    generator.start()
}
