extern crate ibmi;
use ibmi::client::Client;
use ibmi::codec;
use ibmi::crypto;
use ibmi::error::Error;
use ibmi::message::CallMessages;
use ibmi::param::{ProgramCallParameter, ProgramCallParameters};
use ibmi::transport::Options;
use std::time::Duration;

#[test]
fn test_calls_require_a_connection() {
    let mut opts = Options::new("127.0.0.1", false);
    opts.read_timeout = Some(Duration::from_secs(2));
    opts.write_timeout = Some(Duration::from_secs(2));
    let mut cl = Client::new(opts, "QUSER", "secret");

    assert!(!cl.is_connected());
    assert_eq!(cl.job_name(), "");

    let mut messages = CallMessages::new();
    match cl.call_command("DSPJOB", &mut messages) {
        Err(Error::NotConnected) => {}
        other => panic!("expected not connected, got {:?}", other),
    }

    let mut parameters = ProgramCallParameters::new(vec![
        ProgramCallParameter::output(100),
        ProgramCallParameter::input(100u32.to_be_bytes().to_vec()),
    ]);
    match cl.call_program("QWCRSVAL", "QSYS", &mut parameters, &mut messages) {
        Err(Error::NotConnected) => {}
        other => panic!("expected not connected, got {:?}", other),
    }

    // disconnect without a connection is a no-op, twice as well
    cl.disconnect();
    cl.disconnect();
    assert!(!cl.is_connected());
}

#[test]
fn test_defaults_before_negotiation() {
    let opts = Options::new("127.0.0.1", false);
    assert_eq!(opts.signon_port, 8476);
    assert_eq!(opts.command_port, 8475);
    let secure = Options::new("127.0.0.1", true);
    assert_eq!(secure.signon_port, 9476);
    assert_eq!(secure.command_port, 9475);

    let cl = Client::new(opts, "QUSER", "secret").with_temporary_library("MYTEMP");
    assert_eq!(cl.server_ccsid(), 37);
    assert_eq!(cl.server_nlv(), "2924");
    assert_eq!(cl.temporary_library(), "MYTEMP");
    assert_eq!(cl.datastream_level(), 0);
}

#[test]
fn test_codec_surface() {
    // translation vectors every conforming build has to hit
    assert_eq!(
        codec::ascii_to_ebcdic("QSECOFR"),
        vec![0xD8, 0xE2, 0xC5, 0xC3, 0xD6, 0xC6, 0xD9]
    );
    assert_eq!(codec::ascii_to_ebcdic("  "), vec![0x40, 0x40]);
    let round = codec::ebcdic_to_ascii(&codec::ascii_to_ebcdic("CALL PGM(QSYS/QWCRSVAL)"));
    assert_eq!(round, "CALL PGM(QSYS/QWCRSVAL)");
}

#[test]
fn test_proof_scheme_selection_by_password_level() {
    assert_eq!(
        crypto::ProofScheme::for_password_level(2),
        crypto::ProofScheme::Des
    );
    assert_eq!(
        crypto::ProofScheme::for_password_level(3),
        crypto::ProofScheme::Sha1
    );
}
