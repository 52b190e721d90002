//! Handshake branch coverage: agreed version, no supported version, and
//! the plain-HTTP-endpoint case.

mod support;

use pretty_assertions::assert_eq;

use bolt_core::constant::{BOLT_V1, MAGIC_PREAMBLE, PROPOSED_VERSIONS};
use bolt_core::error::Error;
use bolt_core::handshake;

#[test]
fn agrees_on_bolt_v1() {
    let (mut channel, written) = support::scripted_channel(1u32.to_be_bytes().to_vec());
    let version = handshake::perform(&mut channel).expect("handshake");
    assert_eq!(version, BOLT_V1);

    let mut expected = MAGIC_PREAMBLE.to_vec();
    for proposed in PROPOSED_VERSIONS {
        expected.extend_from_slice(&proposed.to_be_bytes());
    }
    assert_eq!(support::written(&written), expected);
}

#[test]
fn no_agreed_version_is_a_stable_error() {
    let (mut channel, _written) = support::scripted_channel(0u32.to_be_bytes().to_vec());
    let err = handshake::perform(&mut channel).expect_err("should fail");
    assert!(matches!(err, Error::NoSupportedProtocolVersion));
}

#[test]
fn http_endpoint_is_a_targeted_error() {
    let (mut channel, _written) = support::scripted_channel(0x4854_5450u32.to_be_bytes().to_vec());
    let err = handshake::perform(&mut channel).expect_err("should fail");
    assert!(matches!(err, Error::HttpEndpoint));
}

#[test]
fn unexpected_version_is_reported() {
    let (mut channel, _written) = support::scripted_channel(42u32.to_be_bytes().to_vec());
    let err = handshake::perform(&mut channel).expect_err("should fail");
    assert!(matches!(err, Error::UnexpectedProtocolVersion(42)));
}
