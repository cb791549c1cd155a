// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Transport definition for the host servers

use std::io::{Read, Write};
use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};

use crate::constant;
use crate::error::Error;

/// A set of options for reaching the host.
///
/// The port fields are filled from the well known defaults when the
/// options are created; override them for a host behind a port mapper.
#[derive(Debug, Clone)]
pub struct Options {
    pub host: String,
    /// wrap each channel in TLS
    pub secure: bool,
    /// accept any certificate the server presents; every policy error is
    /// logged and ignored
    pub accept_all_certificates: bool,
    pub signon_port: u16,
    pub command_port: u16,
    pub connection_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
}

impl Options {
    pub fn new(host: &str, secure: bool) -> Options {
        Options {
            host: host.to_string(),
            secure,
            accept_all_certificates: false,
            signon_port: if secure {
                constant::PORT_SIGNON_TLS
            } else {
                constant::PORT_SIGNON
            },
            command_port: if secure {
                constant::PORT_COMMAND_TLS
            } else {
                constant::PORT_COMMAND
            },
            connection_timeout: None,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// One channel to one host server.
///
/// The session opens a channel per server and drives a strict
/// request/response exchange over it; the protocol has no request
/// correlation, so a channel must never be shared.
///
/// ## How can I implement `Transport`?
///
/// `open` dials `options.host` on `port` and keeps the stream;
/// `send` must apply the outer length frame in both directions
/// (see [`write_frame`] and [`read_frame`]).
pub trait Transport: Sized {
    /// establish the channel
    fn open(options: &Options, port: u16) -> Result<Self, Error>;
    /// write one framed request, read one framed response
    fn send(&mut self, payload: &[u8]) -> Result<Vec<u8>, Error>;
    /// close the channel; must be idempotent
    fn disconnect(&mut self);
}

/// Writes `payload` with the outer length frame: a 4 byte big endian
/// total that counts the length field itself.
pub(crate) fn write_frame<W: Write>(w: &mut W, payload: &[u8]) -> Result<(), Error> {
    let mut head = [0u8; 4];
    BigEndian::write_u32(&mut head, (payload.len() + 4) as u32);
    w.write_all(&head)?;
    w.write_all(payload)?;
    w.flush()?;
    Ok(())
}

/// Reads one framed datagram. A declared length of zero or of four
/// EBCDIC blanks is an idle marker and comes back as an empty buffer.
/// Otherwise the returned buffer starts with the 4 byte length prefix,
/// response parsers index relative to offset 0 with the prefix present.
pub(crate) fn read_frame<R: Read>(r: &mut R) -> Result<Vec<u8>, Error> {
    let mut head = [0u8; 4];
    r.read_exact(&mut head)?;
    let length = BigEndian::read_u32(&head);
    if length == 0 || length == constant::IDLE_FRAME_BLANKS {
        return Ok(Vec::new());
    }
    if length < 4 {
        return Err(Error::frame(format!(
            "declared frame length {} below minimum",
            length
        )));
    }
    let mut data = vec![0u8; length as usize];
    data[..4].copy_from_slice(&head);
    r.read_exact(&mut data[4..])?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn write_frame_prefixes_total_length() {
        let mut out = Vec::new();
        write_frame(&mut out, &[0xAA, 0xBB, 0xCC]).unwrap();
        assert_eq!(out, vec![0, 0, 0, 7, 0xAA, 0xBB, 0xCC]);

        let mut empty = Vec::new();
        write_frame(&mut empty, &[]).unwrap();
        assert_eq!(empty, vec![0, 0, 0, 4]);
    }

    #[test]
    fn read_frame_returns_prefix_and_body() {
        let wire = vec![0, 0, 0, 7, 0xAA, 0xBB, 0xCC];
        let got = read_frame(&mut Cursor::new(wire.clone())).unwrap();
        assert_eq!(got, wire);
    }

    #[test]
    fn read_frame_idle_markers_are_empty() {
        let got = read_frame(&mut Cursor::new(vec![0, 0, 0, 0])).unwrap();
        assert!(got.is_empty());
        let got = read_frame(&mut Cursor::new(vec![0x40, 0x40, 0x40, 0x40])).unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn read_frame_rejects_short_declared_length() {
        match read_frame(&mut Cursor::new(vec![0, 0, 0, 2])) {
            Err(Error::Frame { .. }) => {}
            other => panic!("expected frame error, got {:?}", other),
        }
    }

    #[test]
    fn read_frame_truncated_body_is_io_error() {
        match read_frame(&mut Cursor::new(vec![0, 0, 0, 10, 0xAA])) {
            Err(Error::Io(_)) => {}
            other => panic!("expected IO error, got {:?}", other),
        }
    }

    #[test]
    fn frames_round_trip() {
        let payload = vec![7u8; 300];
        let mut wire = Vec::new();
        write_frame(&mut wire, &payload).unwrap();
        let got = read_frame(&mut Cursor::new(wire)).unwrap();
        assert_eq!(&got[4..], payload.as_slice());
        assert_eq!(got.len(), payload.len() + 4);
    }
}
