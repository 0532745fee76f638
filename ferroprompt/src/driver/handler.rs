//! One-call session setup and scoped sessions.

use log::warn;

use super::profile::DeviceProfile;
use super::session::Session;
use crate::error::Result;
use crate::transport::{Connector, SshConnector};

/// Connect to a device over SSH, entering enable mode if a secret is set.
///
/// ```rust,no_run
/// use ferroprompt::{CommandOptions, DeviceProfile, connect_handler};
///
/// # async fn example() -> Result<(), ferroprompt::Error> {
/// let profile = DeviceProfile::builder("10.0.0.1")
///     .username("admin")
///     .password("cisco")
///     .secret("cisco")
///     .device_type("cisco_ios")
///     .build()?;
///
/// let mut session = connect_handler(profile).await?;
/// let response = session
///     .send_command("show ip interface brief", &CommandOptions::default())
///     .await?;
/// println!("{}", response);
/// session.disconnect().await?;
/// # Ok(())
/// # }
/// ```
pub async fn connect_handler(profile: DeviceProfile) -> Result<Session> {
    connect_with(profile, SshConnector).await
}

/// [`connect_handler`] over a custom connector.
pub async fn connect_with<C: Connector>(profile: DeviceProfile, connector: C) -> Result<Session<C>> {
    let mut session = Session::with_connector(profile, connector)?;
    session.connect().await?;

    if session.profile().secret.is_some() {
        if let Err(e) = session.enable().await {
            if let Err(close) = session.disconnect().await {
                warn!("disconnect after failed enable also failed: {}", close);
            }
            return Err(e);
        }
    }
    Ok(session)
}

/// Run `task` against a fresh SSH session, disconnecting afterwards.
///
/// The session is disconnected whether `task` succeeds or fails. The task's
/// error wins over a disconnect error.
pub async fn with_session<T, F>(profile: DeviceProfile, task: F) -> Result<T>
where
    F: AsyncFnOnce(&mut Session) -> Result<T>,
{
    with_session_using(profile, SshConnector, task).await
}

/// [`with_session`] over a custom connector.
pub async fn with_session_using<C, T, F>(profile: DeviceProfile, connector: C, task: F) -> Result<T>
where
    C: Connector,
    F: AsyncFnOnce(&mut Session<C>) -> Result<T>,
{
    let mut session = connect_with(profile, connector).await?;
    let result = task(&mut session).await;
    let closed = session.disconnect().await;

    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close)) => {
            warn!("disconnect after failed task also failed: {}", close);
            Err(e)
        }
    }
}
