use std::{env, error::Error, io, path::Path, process::exit};

use clap::Parser;
use jsonwebtoken::EncodingKey;
use rusqlite::Connection;

use budget_tracker_api::{
    DEFAULT_TOKEN_DURATION, PasswordHash, ValidatedPassword, create_user, encode_token,
    initialize_db,
};

/// A utility for registering a user of the budget tracker API.
///
/// Prints the new user's ID and, if `JWT_SECRET` is set, a bearer token for them.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database. Created if it does not exist.
    #[arg(long)]
    db_path: String,

    /// The user's display name.
    #[arg(long)]
    name: String,

    /// The user's email address.
    #[arg(long)]
    email: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let db_path = Path::new(&args.db_path);
    validate_db_path(db_path);

    let Some(password_hash) = get_password_hash() else {
        return Ok(());
    };

    let conn = Connection::open(db_path)?;
    initialize_db(&conn)?;

    let user = match create_user(&args.name, &args.email, password_hash, &conn) {
        Ok(user) => user,
        Err(error) => {
            print_error(error);
            exit(1);
        }
    };

    println!("Created user {} with ID {}", user.email, user.id);

    match env::var("JWT_SECRET") {
        Ok(secret) => {
            let token = encode_token(
                user.id,
                DEFAULT_TOKEN_DURATION,
                &EncodingKey::from_secret(secret.as_bytes()),
            )?;
            println!("Bearer token (valid for 1 day):\n{token}");
        }
        Err(_) => println!("Set JWT_SECRET to also print a bearer token for this user."),
    }

    Ok(())
}

fn validate_db_path(db_path: &Path) {
    match db_path.extension() {
        Some(extension) if !extension.is_empty() => {}
        _ => {
            print_error("Database path must include a file extension (e.g., 'budget.db').");
            exit(1);
        }
    }
}

fn get_password_hash() -> Option<PasswordHash> {
    loop {
        println!();

        let first_password = prompt_password("Enter a password: ")?;

        let validated_password = match ValidatedPassword::new(&first_password) {
            Ok(password) => password,
            Err(error) => {
                print_error(error);
                continue;
            }
        };

        let second_password = prompt_password("Enter the same password again: ")?;

        if first_password != second_password {
            print_error("Passwords must match, try again.");
            continue;
        }

        match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
            Ok(password_hash) => return Some(password_hash),
            Err(error) => {
                print_error(format!("Could not hash password: {error}. Try again."));
            }
        }
    }
}

/// Read a password without echoing it. Returns `None` on end of input or a read error.
fn prompt_password(prompt: &str) -> Option<String> {
    match rpassword::prompt_password(prompt) {
        Ok(password) => Some(password),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => None,
        Err(error) => {
            print_error(format!("Could not read password from stdin: {error}"));
            None
        }
    }
}

fn print_error(error: impl ToString) {
    let message = error.to_string();
    let mut chars = message.chars();
    let message: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };

    eprintln!("\x1b[31;1m{message}\x1b[0m")
}
