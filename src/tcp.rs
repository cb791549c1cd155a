// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! TCP transport implementation, optionally wrapped in TLS

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use log::{trace, warn};
use native_tls::{HandshakeError, TlsConnector, TlsStream};

use crate::error::Error;
use crate::transport::{self, Options, Transport as Channel};

enum Stream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Stream::Plain(s) => s.read(buf),
            Stream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Stream::Plain(s) => s.write(buf),
            Stream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Stream::Plain(s) => s.flush(),
            Stream::Tls(s) => s.flush(),
        }
    }
}

/// One TCP connection to one host server port.
pub struct Transport {
    stream: Stream,
}

impl Transport {
    fn connect_tcp(options: &Options, port: u16) -> Result<TcpStream, Error> {
        let address = format!("{}:{}", options.host, port);
        let stream = match options.connection_timeout {
            Some(timeout) => {
                // connect_timeout wants a resolved address
                let resolved = address
                    .to_socket_addrs()?
                    .next()
                    .ok_or_else(|| Error::Connect(format!("no address for {}", address)))?;
                TcpStream::connect_timeout(&resolved, timeout)?
            }
            None => TcpStream::connect(&address)?,
        };
        stream.set_read_timeout(options.read_timeout)?;
        stream.set_write_timeout(options.write_timeout)?;
        Ok(stream)
    }

    fn wrap_tls(options: &Options, tcp: TcpStream) -> Result<Stream, Error> {
        let mut builder = TlsConnector::builder();
        if options.accept_all_certificates {
            warn!(
                "certificate validation disabled for {}, accepting any certificate",
                options.host
            );
            builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
        let connector = builder.build()?;
        match connector.connect(&options.host, tcp) {
            Ok(tls) => Ok(Stream::Tls(Box::new(tls))),
            Err(HandshakeError::Failure(e)) => Err(Error::Tls(e)),
            Err(HandshakeError::WouldBlock(_)) => {
                Err(Error::Connect("TLS handshake interrupted".to_string()))
            }
        }
    }
}

impl Channel for Transport {
    fn open(options: &Options, port: u16) -> Result<Transport, Error> {
        let tcp = Transport::connect_tcp(options, port)?;
        let stream = if options.secure {
            Transport::wrap_tls(options, tcp)?
        } else {
            Stream::Plain(tcp)
        };
        Ok(Transport { stream })
    }

    fn send(&mut self, payload: &[u8]) -> Result<Vec<u8>, Error> {
        trace!("send {} bytes", payload.len() + 4);
        transport::write_frame(&mut self.stream, payload)?;
        let reply = transport::read_frame(&mut self.stream)?;
        trace!("recv {} bytes", reply.len());
        Ok(reply)
    }

    fn disconnect(&mut self) {
        // shutdown errors on an already closed socket are uninteresting
        match &mut self.stream {
            Stream::Plain(s) => {
                let _ = s.shutdown(Shutdown::Both);
            }
            Stream::Tls(s) => {
                let _ = s.shutdown();
                let _ = s.get_ref().shutdown(Shutdown::Both);
            }
        }
    }
}
