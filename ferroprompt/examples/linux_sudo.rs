//! Run a few commands on a Linux host, including one behind `sudo`.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example linux_sudo -- --host localhost --user admin --password secret
//! ```
//!
//! Set `RUST_LOG=debug` (or `trace`) to watch the session work.

use std::env;
use std::path::PathBuf;

use ferroprompt::{CommandOptions, DeviceProfile, Session};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut builder = DeviceProfile::builder(&args.host)
        .port(args.port)
        .username(&args.user)
        .device_type("linux");
    builder = match (&args.password, &args.key) {
        (Some(password), _) => builder.password(password),
        (None, Some(key)) => builder.private_key(key),
        (None, None) => {
            eprintln!("Error: Must provide either --password or --key");
            std::process::exit(1);
        }
    };

    let mut session = Session::new(builder.build()?)?;
    session.connect().await?;
    println!("Connected, prompt is {:?}", session.base_prompt().unwrap_or_default());

    for command in ["whoami", "uname -a", "ls -la"] {
        let response = session.send_command(command, &CommandOptions::default()).await?;
        println!("\n$ {}  ({:?})\n{}", command, response.elapsed, response.result);
    }

    // sudo asks for a password instead of returning to the prompt
    if let Some(password) = &args.password {
        let options = CommandOptions::new().expect_string(r"(?i)password.*:\s*$");
        let asked = session.send_command("sudo -k id", &options).await?;
        println!("\nsudo prompted with {:?}", asked.prompt);

        let response = session.send_command(password, &CommandOptions::default()).await?;
        println!("{}", response.result);
    }

    session.disconnect().await?;
    Ok(())
}

struct Args {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    key: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let mut parsed = Self {
            host: "localhost".to_string(),
            port: 22,
            user: env::var("USER").unwrap_or_else(|_| "root".to_string()),
            password: None,
            key: None,
        };

        let mut args = env::args().skip(1);
        while let Some(flag) = args.next() {
            let value = args.next();
            match (flag.as_str(), value) {
                ("--host", Some(v)) => parsed.host = v,
                ("--port", Some(v)) => parsed.port = v.parse().unwrap_or(22),
                ("--user", Some(v)) => parsed.user = v,
                ("--password", Some(v)) => parsed.password = Some(v),
                ("--key", Some(v)) => parsed.key = Some(PathBuf::from(v)),
                (other, _) => eprintln!("Ignoring argument: {}", other),
            }
        }
        parsed
    }
}
