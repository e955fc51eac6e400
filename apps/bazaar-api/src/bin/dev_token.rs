//! # Development Token Minter
//!
//! Prints a bearer token signed with the configured `BAZAAR_JWT_SECRET`,
//! for poking at a local server. Defaults match the accounts created by
//! the `seed` binary.
//!
//! ## Usage
//! ```bash
//! # Customer token
//! cargo run -p bazaar-api --bin dev_token
//!
//! # Admin token
//! cargo run -p bazaar-api --bin dev_token -- --admin
//!
//! curl -H "Authorization: Bearer $(cargo run -q -p bazaar-api --bin dev_token)" \
//!     http://localhost:8080/api/cart
//! ```

use std::env;

use bazaar_api::{ApiConfig, JwtManager};
use bazaar_core::{UserRole, DEFAULT_TENANT_ID};

const SEED_ADMIN_ID: &str = "00000000-0000-4000-8000-00000000a001";
const SEED_CUSTOMER_ID: &str = "00000000-0000-4000-8000-00000000c001";

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut role = UserRole::Customer;
    let mut sub: Option<String> = None;
    let mut email: Option<String> = None;
    let mut tenant = String::from(DEFAULT_TENANT_ID);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--admin" => role = UserRole::Admin,
            "--role" | "-r" => {
                if i + 1 < args.len() {
                    role = args[i + 1].parse()?;
                    i += 1;
                }
            }
            "--sub" | "-s" => {
                if i + 1 < args.len() {
                    sub = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--email" | "-e" => {
                if i + 1 < args.len() {
                    email = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--tenant" | "-t" => {
                if i + 1 < args.len() {
                    tenant = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bazaar Development Token Minter");
                println!();
                println!("Usage: dev_token [OPTIONS]");
                println!();
                println!("Options:");
                println!("      --admin          Shorthand for --role admin");
                println!("  -r, --role <ROLE>    admin | customer (default: customer)");
                println!("  -s, --sub <ID>       Subject (default: the seeded account for the role)");
                println!("  -e, --email <EMAIL>  Email claim");
                println!("  -t, --tenant <ID>    Tenant claim (default: {DEFAULT_TENANT_ID})");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => anyhow::bail!("unknown argument: {other} (try --help)"),
        }
        i += 1;
    }

    let (default_sub, default_email) = match role {
        UserRole::Admin => (SEED_ADMIN_ID, "admin@bazaar.test"),
        UserRole::Customer => (SEED_CUSTOMER_ID, "customer@bazaar.test"),
    };
    let sub = sub.unwrap_or_else(|| default_sub.to_string());
    let email = email.unwrap_or_else(|| default_email.to_string());

    let config = ApiConfig::load()?;
    let jwt = JwtManager::new(&config.jwt_secret, config.jwt_lifetime_secs);
    let token = jwt.issue(&sub, &tenant, &email, role)?;

    eprintln!(
        "role={role} sub={sub} tenant={tenant} expires_in={}s",
        config.jwt_lifetime_secs
    );
    println!("{token}");
    Ok(())
}
