#[cfg(feature = "ssr")]
use ctf_board::{config::Config, establish_connection, reset_database, run_migrations};

/// Removes every challenge, solve, submission, and session, and zeroes all scores. Accounts
/// are kept.
#[cfg(feature = "ssr")]
fn main() {
    let config = Config::from_env().unwrap_or_else(|e| panic!("Invalid configuration: {}", e));
    let mut conn =
        establish_connection(&config.database_url).expect("Failed to connect to the database");
    run_migrations(&mut conn).expect("Failed to run migrations");
    reset_database(&mut conn).expect("Failed to reset database");
    println!("Database has been reset.");
}

#[cfg(not(feature = "ssr"))]
fn main() {
    println!("This binary requires the 'ssr' feature to be enabled.");
}
