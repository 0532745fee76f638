//! Session fixtures shared by the driver tests.

use super::{DeviceProfile, Session};
use crate::transport::mock::{MockConnector, MockDevice};

pub(crate) fn profile(device_type: &str) -> DeviceProfile {
    DeviceProfile::builder("10.0.0.1")
        .username("admin")
        .password("pw")
        .device_type(device_type)
        .build()
        .unwrap()
}

pub(crate) fn profile_with_secret(device_type: &str, secret: &str) -> DeviceProfile {
    DeviceProfile::builder("10.0.0.1")
        .username("admin")
        .password("pw")
        .secret(secret)
        .device_type(device_type)
        .build()
        .unwrap()
}

pub(crate) fn new_session(device: &MockDevice, device_type: &str) -> Session<MockConnector> {
    Session::with_connector(profile(device_type), device.connector()).unwrap()
}

/// A session that has already connected.
pub(crate) async fn connected(device: &MockDevice, device_type: &str) -> Session<MockConnector> {
    connect_profile(device, profile(device_type)).await
}

pub(crate) async fn connect_profile(
    device: &MockDevice,
    profile: DeviceProfile,
) -> Session<MockConnector> {
    let mut session = Session::with_connector(profile, device.connector()).unwrap();
    session.connect().await.unwrap();
    session
}
