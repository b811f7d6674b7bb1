//! Shared test constants

pub const VERSION_1_2_0: &str = "1.2.0";
pub const VERSION_1_3_0: &str = "1.3.0";
pub const TAG_V1_2_0: &str = "v1.2.0";
pub const TAG_V1_3_0: &str = "v1.3.0";

pub const TEST_OWNER: &str = "acme";
pub const TEST_REPO: &str = "cli";

/// Asset suffix used by tests regardless of the host platform
pub const TEST_SUFFIX: &str = "linux_amd64.tar.gz";

/// Minimum binary size used with small fixtures
pub const SMALL_MIN_SIZE: u64 = 64;

pub fn asset_name(version: &str) -> String {
    format!("cli_{}_{}", version, TEST_SUFFIX)
}

pub fn checksums_name(version: &str) -> String {
    format!("cli_{}_checksums.txt", version)
}

/// Deterministic binary payload of `len` bytes
pub fn fake_binary(len: usize) -> Vec<u8> {
    let mut payload = b"#!/bin/sh\nexit 0\n".to_vec();
    payload.resize(len, b'#');
    payload
}
