// Well known host server ports. Only the sign-on verify and remote command
// servers are dialed by this crate, the rest are declared for callers.
pub const PORT_SIGNON: u16 = 8476;
pub const PORT_SIGNON_TLS: u16 = 9476;
pub const PORT_COMMAND: u16 = 8475;
pub const PORT_COMMAND_TLS: u16 = 9475;
#[allow(dead_code)]
pub const PORT_LICENSE: u16 = 8470;
#[allow(dead_code)]
pub const PORT_LICENSE_TLS: u16 = 9470;
#[allow(dead_code)]
pub const PORT_DATABASE: u16 = 8471;
#[allow(dead_code)]
pub const PORT_DATABASE_TLS: u16 = 9471;
#[allow(dead_code)]
pub const PORT_DATA_QUEUE: u16 = 8472;
#[allow(dead_code)]
pub const PORT_DATA_QUEUE_TLS: u16 = 9472;
#[allow(dead_code)]
pub const PORT_FILE: u16 = 8473;
#[allow(dead_code)]
pub const PORT_FILE_TLS: u16 = 9473;
#[allow(dead_code)]
pub const PORT_PRINT: u16 = 8474;
#[allow(dead_code)]
pub const PORT_PRINT_TLS: u16 = 9474;
#[allow(dead_code)]
pub const PORT_TELNET: u16 = 23;
#[allow(dead_code)]
pub const PORT_TELNET_TLS: u16 = 992;
#[allow(dead_code)]
pub const PORT_SERVICE_TOOLS: u16 = 3000;
#[allow(dead_code)]
pub const PORT_SERVER_MAPPER: u16 = 449;

// Server IDs carried in every frame header
pub const SERVER_SIGNON: u16 = 0xE009;
pub const SERVER_COMMAND: u16 = 0xE008;

// ReqRep IDs, sign-on verify server
pub const REQ_SIGNON_SEED_EXCHANGE: u16 = 0x7003;
pub const REQ_SIGNON_AUTHENTICATE: u16 = 0x7004;

// ReqRep IDs, remote command server
pub const REQ_COMMAND_SEED_EXCHANGE: u16 = 0x7001;
pub const REQ_COMMAND_AUTHENTICATE: u16 = 0x7002;
pub const REQ_EXCHANGE_ATTRIBUTES: u16 = 0x1001;
pub const REQ_RUN_COMMAND: u16 = 0x1002;
pub const REQ_CALL_PROGRAM: u16 = 0x1003;

// Dynamic field code points, sign-on exchange
pub const CP_SIGNON_VERSION: u16 = 0x1101;
pub const CP_SIGNON_LEVEL: u16 = 0x1102;
pub const CP_SIGNON_SEED: u16 = 0x1103;
pub const CP_USER_ID: u16 = 0x1104;
pub const CP_PASSWORD: u16 = 0x1105;
pub const CP_CLIENT_CCSID: u16 = 0x1113;
pub const CP_SERVER_CCSID: u16 = 0x1114;
pub const CP_PASSWORD_LEVEL: u16 = 0x1119;
pub const CP_JOB_NAME: u16 = 0x111F;
pub const CP_RETURN_MESSAGES: u16 = 0x1128;

// Dynamic field code points, call engine. The values overlap with the
// sign-on set, the meaning is fixed by the ReqRep ID of the frame.
pub const CP_COMMAND_TEXT: u16 = 0x1101;
pub const CP_COMMAND_TEXT_UTF16: u16 = 0x1104;
pub const CP_PROGRAM_PARAMETER: u16 = 0x1103;
pub const CP_MESSAGE_LEGACY: u16 = 0x1102;
pub const CP_MESSAGE_EXTENDED: u16 = 0x1106;

// Password proof schemes as carried in the authenticate template
pub const PWD_ENC_DES: u8 = 1;
pub const PWD_ENC_SHA1: u8 = 3;

// Values this client reports about itself
pub const CLIENT_VERSION: u32 = 1;
pub const CLIENT_DATASTREAM_LEVEL: u16 = 2;
pub const CLIENT_CCSID: u32 = 1200;

// Negotiation defaults before the server has spoken
pub const DEFAULT_CCSID: u32 = 37;
pub const DEFAULT_NLV: &str = "2924";

// Four EBCDIC blanks in the length field mark an idle frame
pub const IDLE_FRAME_BLANKS: u32 = 0x4040_4040;

// A run-command reply with this code is a warning, not a failure
#[allow(dead_code)]
pub const COMMAND_WARNING: u16 = 0x0400;

// Protocol limits
pub const MAX_NAME_LENGTH: usize = 10;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const MAX_SERVICE_PARAMETERS: usize = 7;

// The remote command server is called through this system API when a
// service program function has to be invoked.
pub const SERVICE_PROGRAM_API: &str = "QZRUCLSP";
pub const SYSTEM_LIBRARY: &str = "QSYS";

//messageOption byte by negotiated datastream level
pub fn message_option(datastream_level: u16) -> u8 {
    if datastream_level < 7 {
        0
    } else if datastream_level < 10 {
        2
    } else {
        4
    }
}

// attribute exchange replies outside this set are fatal
pub fn attribute_code_ok(code: u16) -> bool {
    matches!(code, 0 | 0x0100 | 0x0104..=0x0108)
}

#[test]
fn test_message_option() {
    assert_eq!(message_option(0), 0);
    assert_eq!(message_option(6), 0);
    assert_eq!(message_option(7), 2);
    assert_eq!(message_option(9), 2);
    assert_eq!(message_option(10), 4);
    assert_eq!(message_option(12), 4);
}

#[test]
fn test_attribute_code_ok() {
    assert!(attribute_code_ok(0));
    assert!(attribute_code_ok(0x0100));
    assert!(attribute_code_ok(0x0104));
    assert!(attribute_code_ok(0x0108));
    assert!(!attribute_code_ok(0x0101));
    assert!(!attribute_code_ok(0x0109));
    assert!(!attribute_code_ok(0x0200));
}
