// Demo login endpoint as a filter program
//
// Usage: bankgrid-login < body.json
// Where: body.json = {"login": "...", "password": "..."}
//
// Exit codes:
//   0 = login accepted (200)
//   1 = login rejected (401)
//   2 = error

use bankgrid::auth;
use eyre::{Context, Result};
use std::io::{self, Read};
use std::process;

fn main() {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(2);
        }
    }
}

fn run() -> Result<bool> {
    let mut body = String::new();
    io::stdin()
        .read_to_string(&mut body)
        .context("Failed to read request body from stdin")?;

    let outcome = auth::login(&body);

    println!("HTTP {}", outcome.status);
    if let Some(cookie) = &outcome.set_cookie {
        println!("Set-Cookie: {}", cookie);
    }
    println!();
    println!("{}", serde_json::to_string(&outcome.body)?);

    Ok(outcome.is_ok())
}
