use clap::{CommandFactory, Parser};
use log::{error, info};
use remoteshark::configuration::Args;
use remoteshark::controller::Controller;
use remoteshark::error_handling::types::{ConfigError, ControllerError, EXIT_FAILURE, EXIT_USAGE};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version are not errors
            let code = if e.use_stderr() { EXIT_USAGE } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    // https://docs.rs/env_logger/latest/env_logger/
    env_logger::Builder::from_default_env()
        .filter_level(args.log_level())
        .format_target(false)
        .init();

    info!("remoteshark v{}", env!("CARGO_PKG_VERSION"));

    let controller = match Controller::from_args(args) {
        Ok(controller) => controller,
        Err(ControllerError::ConfigurationError(ConfigError::MissingHost)) => {
            error!("No remote host given");
            let _ = Args::command().print_help();
            std::process::exit(EXIT_FAILURE);
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(e.exit_code());
        }
    };

    let code = match controller.run().await {
        Ok(code) => code,
        Err(e) => {
            if e.exit_code() != 0 {
                error!("{}", e);
            }
            e.exit_code()
        }
    };

    // spawned legs are never killed on exit; a bounded session leaves them running
    std::process::exit(code);
}
