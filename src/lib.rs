// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! This crate provides a client for the IBM i (AS/400) host servers:
//! CL commands, program calls and service program calls over the
//! platform's binary TCP protocol, with the sign-on handshake and the
//! seeded password proofs it requires.
//! # Examples
//! ```no_run
//! # use ibmi::client::Client;
//! # use ibmi::message::CallMessages;
//! # use ibmi::transport::Options;
//!
//! # fn main() {
//!     let opts = Options::new("as400.example.com", false);
//!     let mut cl = Client::new(opts, "QSECOFR", "secret");
//!
//!     if let Err(e) = cl.connect() {
//!         println!("{}", e.to_string());
//!         return;
//!     }
//!
//!     let mut messages = CallMessages::new();
//!
//!     match cl.call_command("CRTLIB LIB(SANDBOX)", &mut messages) {
//!         Ok(code) => {
//!             println!("finished with code {}", code);
//!             for m in &messages {
//!                 println!("{}: {}", m.id(), m.text());
//!             }
//!         }
//!         Err(e) => println!("{}", e.to_string()),
//!     }
//! # }
//! ```
pub mod client;
pub mod codec;
mod constant;
pub mod crypto;
pub mod datastream;
pub mod error;
pub mod message;
pub mod param;
pub mod tcp;
pub mod transport;
