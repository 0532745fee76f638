//! Enter enable mode on a Cisco IOS device and push a small config batch.
//!
//! # Usage
//!
//! ```bash
//! FERROPROMPT_HOST=10.0.0.1 FERROPROMPT_USER=admin FERROPROMPT_PASSWORD=cisco \
//!     FERROPROMPT_SECRET=cisco cargo run --example cisco_config
//! ```
//!
//! `FERROPROMPT_DEVICE_TYPE` picks another dialect (`cisco_nxos`,
//! `cisco_xr`, `juniper_junos`); commit-based dialects commit the batch.

use std::env;

use ferroprompt::error::DeviceError;
use ferroprompt::{CommandOptions, DeviceProfile, Error, connect_handler};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let var = |name: &str| env::var(name).map_err(|_| format!("{} is not set", name));
    let mut builder = DeviceProfile::builder(var("FERROPROMPT_HOST")?)
        .username(var("FERROPROMPT_USER")?)
        .password(var("FERROPROMPT_PASSWORD")?)
        .device_type(env::var("FERROPROMPT_DEVICE_TYPE").unwrap_or_else(|_| "cisco_ios".into()));
    if let Ok(secret) = env::var("FERROPROMPT_SECRET") {
        builder = builder.secret(secret);
    }

    let mut session = connect_handler(builder.build()?).await?;
    println!("{} in {} mode", session.vendor().name, session.mode());

    let batch = [
        "interface Loopback100",
        "description managed by ferroprompt",
        "no shutdown",
    ];
    match session.send_config(batch).await {
        Ok(responses) => {
            for response in responses {
                println!("{}: {}", response.command, response.result);
            }
        }
        Err(Error::Device(DeviceError::CommandRejected { command, output, .. })) => {
            eprintln!("device rejected '{}':\n{}", command, output);
        }
        Err(e) => return Err(e.into()),
    }

    let check = session
        .send_command("show running-config interface Loopback100", &CommandOptions::default())
        .await?;
    println!("\n{}", check.result);

    session.disconnect().await?;
    Ok(())
}
