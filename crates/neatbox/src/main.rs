mod app;
mod cli;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use log::{error, info};
use neatbox_core::kernel::constants::ROUTES_SERVICE;
use neatbox_core::{Kernel, KernelError, Request, RouteCollection};

use crate::app::ExampleApp;
use crate::cli::OutputFormat;

/// Directory of the bundled example application.
const DEFAULT_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/app");

/// Neatbox: runs the example application against a single request
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Simple liveness check
    #[arg(long)]
    ping: bool,

    /// Application root holding resources/config/{config,routes}.yml
    #[arg(long, default_value = DEFAULT_ROOT)]
    root: PathBuf,

    /// Environment name handed to the kernel
    #[arg(long, default_value = "dev")]
    env: String,

    /// Honour X-Forwarded-* headers
    #[arg(long)]
    trust_proxy: bool,

    /// Print the request log to stderr after handling
    #[arg(long)]
    show_log: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Handle one synthetic request and print the HTTP response
    Request {
        /// Request method, e.g. GET or POST
        method: String,
        /// Path or absolute URL
        uri: String,
        /// Request parameter as name=value (query for GET, body for POST/PUT/DELETE)
        #[arg(short = 'p', long = "param", value_parser = cli::parse_param)]
        params: Vec<(String, String)>,
    },
    /// Handle the request described by the CGI environment
    Cgi,
    /// List the routes of the application in match order
    Routes,
}

fn main() -> ExitCode {
    if let Err(e) = env_logger::try_init() {
        eprintln!("Failed to initialize env_logger: {}", e);
    }

    let mut args = CliArgs::parse();
    if args.ping {
        println!("pong");
        return ExitCode::SUCCESS;
    }

    let Some(command) = args.command.take() else {
        if let Err(e) = CliArgs::command().print_help() {
            error!("Failed to print help: {}", e);
        }
        return ExitCode::SUCCESS;
    };

    let mut kernel = Kernel::new(ExampleApp::new(&args.root), &args.env);
    info!("Serving application at '{}' ({})", args.root.display(), args.env);

    let code = match command {
        Commands::Request { method, uri, params } => {
            let params: Vec<(&str, &str)> = params.iter().map(|(n, v)| (n.as_str(), v.as_str())).collect();
            match Request::try_create(&uri, &method, &params) {
                Ok(request) => serve(&mut kernel, request, &args, OutputFormat::Http),
                Err(e) => {
                    eprintln!("Invalid request: {}", e);
                    ExitCode::from(2)
                }
            }
        }
        Commands::Cgi => match Request::from_cgi() {
            Ok(request) => serve(&mut kernel, request, &args, OutputFormat::Cgi),
            Err(e) => {
                eprintln!("Could not read CGI request: {}", e);
                ExitCode::from(2)
            }
        },
        Commands::Routes => match list_routes(&mut kernel) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Could not load routes: {}", e);
                ExitCode::FAILURE
            }
        },
    };

    if args.show_log {
        eprintln!("{}", kernel.logger().dump());
    }
    code
}

fn serve(kernel: &mut Kernel, mut request: Request, args: &CliArgs, format: OutputFormat) -> ExitCode {
    request.set_trust_proxy(args.trust_proxy);
    let (response, code) = match kernel.handle(request) {
        Ok(response) => (response, ExitCode::SUCCESS),
        Err(e) => {
            error!("Request failed: {}", e);
            // A CGI gateway only looks at the status header
            let code = if format == OutputFormat::Cgi { ExitCode::SUCCESS } else { ExitCode::FAILURE };
            (cli::error_response(&e, &args.env), code)
        }
    };
    print!("{}", cli::render(&response, format));
    code
}

fn list_routes(kernel: &mut Kernel) -> Result<(), KernelError> {
    kernel.boot()?;
    let routes = kernel.container().require::<RouteCollection>(ROUTES_SERVICE)?;
    routes.load()?;

    for route in routes.all() {
        println!(
            "{:<12} {:<24} {:<22} {}",
            route.name(),
            route.method(),
            route.url(),
            route.option_str("controller").unwrap_or_default()
        );
    }
    Ok(())
}
