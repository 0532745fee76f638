//! Copy a file to a device over SCP and read it back.
//!
//! ```bash
//! cargo run --example scp_put -- 10.0.0.1 admin secret ./router.cfg flash:/router.cfg
//! ```

use std::env;
use std::path::Path;

use ferroprompt::{DeviceProfile, FileTransfer, ScpTransfer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let [host, user, password, local, remote] = args.as_slice() else {
        eprintln!("usage: scp_put <host> <user> <password> <local> <remote>");
        std::process::exit(2);
    };

    let profile = DeviceProfile::builder(host)
        .username(user)
        .password(password)
        .device_type("cisco_ios")
        .build()?;
    let scp = ScpTransfer::new(&profile)?;

    let sent = scp.put(Path::new(local), remote).await?;
    println!("sent {} bytes in {:?}", sent.bytes, sent.elapsed);

    let copy = format!("{}.readback", local);
    let received = scp.get(remote, Path::new(&copy)).await?;
    println!("read back {} bytes into {}", received.bytes, copy);
    Ok(())
}
