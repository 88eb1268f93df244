use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use clinic_records_lib::auth::{self, AuthError, Registration};
use clinic_records_lib::config::{self, DB_FILE_NAME, ENV_DB_PATH, ENV_PBKDF2_ITERATIONS};
use clinic_records_lib::crypto::{PasswordHasher, PBKDF2_ITERATIONS};
use clinic_records_lib::db;

#[derive(Parser)]
#[command(name = "clinic-admin")]
#[command(about = "Provision and inspect clinic accounts")]
struct Cli {
    /// Database file (defaults to $CLINIC_DB_PATH, then ~/ClinicRecords/clinic.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a clinic account. Missing values are prompted for.
    AddClinic {
        /// Clinic or hospital display name
        #[arg(long)]
        name: Option<String>,
        /// Login username
        #[arg(long)]
        username: Option<String>,
        /// Login password
        #[arg(long)]
        password: Option<String>,
    },
    /// List clinic accounts
    ListClinics,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    clinic_records_lib::init_tracing();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db)?;
    let conn = db::open_database(&db_path)
        .with_context(|| format!("cannot open database at {}", db_path.display()))?;

    match cli.command {
        Commands::AddClinic {
            name,
            username,
            password,
        } => {
            let registration = Registration {
                clinic_name: value_or_prompt(name, "Enter clinic/hospital name: ")?,
                username: value_or_prompt(username, "Enter username: ")?,
                password: value_or_prompt(password, "Enter password: ")?,
            };
            match auth::register(&conn, &hasher()?, &registration) {
                Ok(account) => println!(
                    "Clinic added: {} (username: {}, id: {})",
                    account.clinic_name, account.username, account.id
                ),
                Err(AuthError::UsernameTaken) => {
                    bail!("username {:?} is already taken", registration.username.trim())
                }
                Err(e) => return Err(e).context("cannot add clinic"),
            }
        }
        Commands::ListClinics => {
            let clinics = db::list_clinics(&conn)?;
            if clinics.is_empty() {
                println!("No clinics found.");
            }
            for clinic in clinics {
                println!(
                    "ID: {}, Username: {}, Clinic: {}, Created: {}",
                    clinic.id,
                    clinic.username,
                    clinic.clinic_name,
                    clinic.created_at.to_rfc3339()
                );
            }
        }
    }

    Ok(())
}

fn resolve_db_path(flag: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Some(path) = std::env::var_os(ENV_DB_PATH).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    config::app_data_dir()
        .map(|dir| dir.join(DB_FILE_NAME))
        .with_context(|| format!("cannot determine home directory; pass --db or set {ENV_DB_PATH}"))
}

fn hasher() -> anyhow::Result<PasswordHasher> {
    let iterations = match std::env::var(ENV_PBKDF2_ITERATIONS) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {ENV_PBKDF2_ITERATIONS}: {raw:?}"))?,
        _ => PBKDF2_ITERATIONS,
    };
    Ok(PasswordHasher::new(iterations))
}

fn value_or_prompt(value: Option<String>, prompt: &str) -> anyhow::Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
