#[cfg(feature = "ssr")]
use ctf_board::{config::Config, establish_connection, run_migrations, set_admin};

#[cfg(feature = "ssr")]
fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (email, grant) = match args.as_slice() {
        [email] => (email.as_str(), true),
        [email, flag] if flag == "--revoke" => (email.as_str(), false),
        _ => {
            eprintln!("usage: set_admin <email> [--revoke]");
            std::process::exit(2);
        }
    };

    let config = Config::from_env().unwrap_or_else(|e| panic!("Invalid configuration: {}", e));
    let mut conn =
        establish_connection(&config.database_url).expect("Failed to connect to the database");
    run_migrations(&mut conn).expect("Failed to run migrations");

    match set_admin(&mut conn, email, grant).expect("Failed to update user") {
        0 => {
            eprintln!("No account with email {}", email);
            std::process::exit(1);
        }
        _ if grant => println!("{} is now an admin.", email),
        _ => println!("{} is no longer an admin.", email),
    }
}

#[cfg(not(feature = "ssr"))]
fn main() {
    println!("This binary requires the 'ssr' feature to be enabled.");
}
