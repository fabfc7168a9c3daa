use std::process::ExitCode;

use web_validate::cli::{self, CliError};
use web_validate::report::Summary;
use web_validate::runner::{self, EXIT_FAILURE, EXIT_OK, RunOutcome};
use web_validate::{config, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let opts = match cli::parse_from(std::env::args_os()) {
        Ok(opts) => opts,
        Err(e) if e.is_informational() => {
            if let CliError::Clap(help) = &e {
                let _ = help.print();
            }
            return ExitCode::from(EXIT_OK);
        }
        Err(CliError::Clap(e)) => {
            let _ = e.print();
            return ExitCode::from(EXIT_FAILURE);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    logging::init(opts.verbose, config::get().output.json_logs);

    let outcome = runner::run(&opts).await;
    let code = runner::exit_code(&outcome);

    match &outcome {
        Ok(run) => {
            if opts.dump_json {
                print_json(&Summary::from_result(&run.result, run.run_dir.clone()));
            } else {
                print_human(run);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if opts.dump_json {
                print_json(&Summary::failure(e.to_string()));
            }
        }
    }

    ExitCode::from(code)
}

fn print_json(summary: &Summary) {
    match serde_json::to_string_pretty(summary) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: failed to serialize summary: {}", e),
    }
}

fn print_human(run: &RunOutcome) {
    let result = &run.result;
    let status = result
        .http_status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("{} {}", if run.success() { "PASS" } else { "FAIL" }, result.final_url);
    println!("  Title:  {}", result.title);
    println!("  Status: {}", status);
    println!("  Load:   {} ms", result.load_time_ms);
    println!("  Requests: {}", result.network_requests.len());
    for assertion in &result.assertions {
        let mark = if assertion.passed { "ok" } else { "FAILED" };
        println!("  [{}] {}: {}", mark, assertion.kind, assertion.message);
    }
    if let Some(dir) = &run.run_dir {
        println!("\nRun: {}", dir.display());
    }
}
