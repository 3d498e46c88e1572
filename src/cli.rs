use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind, overrides config and HOST
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on, overrides config and PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write the default configuration to a file
    InitConfig {
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },

    /// Delete expired uploads
    Cleanup,

    /// Verify that ffmpeg can be launched
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let args = Args::try_parse_from(["alime", "-v", "serve", "--port", "9000"]).unwrap();
        assert!(args.verbose);
        match args.command {
            Commands::Serve { host, port } => {
                assert_eq!(host, None);
                assert_eq!(port, Some(9000));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_init_config_default_output() {
        let args = Args::try_parse_from(["alime", "init-config"]).unwrap();
        match args.command {
            Commands::InitConfig { output } => assert_eq!(output, PathBuf::from("config.toml")),
            _ => panic!("expected init-config"),
        }
    }
}
