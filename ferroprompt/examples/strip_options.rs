//! Show what each stripping option leaves in the output.
//!
//! ```bash
//! cargo run --example strip_options -- localhost admin secret
//! ```

use std::env;

use ferroprompt::{CommandOptions, DeviceProfile, Session};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let [host, user, password] = args.as_slice() else {
        eprintln!("usage: strip_options <host> <user> <password>");
        std::process::exit(2);
    };

    let profile = DeviceProfile::builder(host)
        .username(user)
        .password(password)
        .device_type("linux")
        .build()?;
    let mut session = Session::new(profile)?;
    session.connect().await?;

    let variants = [
        ("default", CommandOptions::new()),
        ("keep echo", CommandOptions::new().strip_command(false)),
        ("keep prompt", CommandOptions::new().strip_prompt(false)),
        (
            "raw",
            CommandOptions::new().strip_command(false).strip_prompt(false),
        ),
    ];
    for (label, options) in &variants {
        let response = session.send_command("hostname", options).await?;
        println!("--- {} ---\n{:?}", label, response.result);
    }

    session.disconnect().await?;
    Ok(())
}
