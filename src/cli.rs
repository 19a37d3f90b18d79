use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

pub struct Cli {
    pub config: PathBuf,
    pub port: Option<u16>,
}

impl From<ArgMatches> for Cli {
    fn from(matches: ArgMatches) -> Self {
        Cli {
            config: matches
                .get_one::<PathBuf>("config")
                .cloned()
                .unwrap_or_else(|| PathBuf::from("dashboard.toml")),
            port: matches.get_one::<u16>("port").copied(),
        }
    }
}

pub fn command() -> Command {
    Command::new("service-dashboard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("watch and control the containers of a compose stack")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Configuration file, ignored when missing")
                .value_name("PATH")
                .default_value("dashboard.toml")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Listen port, overrides the configuration")
                .value_name("PORT")
                .value_parser(clap::value_parser!(u16)),
        )
}

pub fn configure_cli() -> Cli {
    command().get_matches().into()
}
