//! Config validation CLI tool
//!
//! Validates an attendd configuration file and reports any errors.

use attend_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates an attendd configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            eprintln!("  validate-config config.example.toml");
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match attend_config::load_config(&config_path) {
        Ok(policy) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", attend_config::CURRENT_CONFIG_VERSION);
            println!(
                "  Auto-logout: {} (limit {}s, every {}s)",
                if policy.auto_logout.enabled { "enabled" } else { "disabled" },
                policy.auto_logout.session_limit.as_secs(),
                policy.auto_logout.interval.as_secs()
            );
            println!("  Offices: {}", policy.offices.len());
            println!("  Home addresses: {}", policy.home_addresses.len());

            if !policy.offices.is_empty() {
                println!();
                println!("Offices:");
                for office in &policy.offices {
                    println!(
                        "  - {} [{}]: {} within {}m",
                        office.id, office.name, office.center, office.radius_meters
                    );
                }
            }

            if !policy.home_addresses.is_empty() {
                println!();
                println!("Home addresses:");
                for home in &policy.home_addresses {
                    let location = home
                        .center
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "not geocoded".into());
                    println!(
                        "  - {} [{} for {}]: {}",
                        home.id, home.address_type, home.user_id, location
                    );
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                attend_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                attend_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                attend_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                attend_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        attend_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
