//! Commands that take a while, or that never hand back a clean prompt.
//!
//! ```bash
//! cargo run --example long_running -- 10.0.0.1 admin cisco
//! ```

use std::env;
use std::time::Duration;

use ferroprompt::{CommandOptions, DeviceProfile, with_session};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let [host, user, password] = args.as_slice() else {
        eprintln!("usage: long_running <host> <user> <password>");
        std::process::exit(2);
    };

    let profile = DeviceProfile::builder(host)
        .username(user)
        .password(password)
        .device_type("cisco_ios")
        .read_timeout(Duration::from_secs(20))
        .build()?;

    let (tech, ping) = with_session(profile, async |session| {
        // A slow show command: scale the read timeout instead of raising it globally
        let tech = session
            .send_command("show tech-support", &CommandOptions::new().delay_factor(6.0))
            .await?;

        // ping prints progress as it goes; collect for a fixed window
        let ping = session
            .send_command_timing("ping 192.0.2.1 repeat 5", &CommandOptions::new().delay_factor(3.0))
            .await?;
        Ok((tech, ping))
    })
    .await?;

    println!("show tech-support: {} lines in {:?}", tech.lines().count(), tech.elapsed);
    println!("\n{}", ping.result);
    Ok(())
}
