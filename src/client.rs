// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Session management and the call engine

use log::debug;

use crate::codec;
use crate::constant;
use crate::crypto::{des_password_proof, sha_password_proof, ProofScheme};
use crate::datastream::DataStream;
use crate::error::Error;
use crate::message::{self, CallMessages};
use crate::param::{
    ParameterType, ProgramCallParameter, ProgramCallParameters, ReturnFormat,
    ServiceProgramCallParameters,
};
use crate::tcp;
use crate::transport::{Options, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    SignonConnected,
    SignonAuthed,
    RcConnected,
    RcAuthed,
    Ready,
}

///! Client allows for running commands and calling programs on the host
///
/// A `Client` owns one channel to the sign-on verify server and one to
/// the remote command server. [`Client::connect`] walks both handshakes
/// in a fixed order: seed exchange and authentication on the sign-on
/// channel, then seed exchange, authentication and attribute exchange on
/// the command channel. Only a fully connected client accepts calls, and
/// any transport, framing or authentication failure tears both channels
/// down again.
///
/// The protocol carries no request correlation, so a client must never
/// be shared between threads; create one client per concurrent caller.
pub struct Client<T: Transport> {
    options: Options,
    user: String,
    password: String,
    temporary_library: String,
    state: State,
    signon: Option<T>,
    command: Option<T>,
    server_version: u32,
    server_level: u16,
    server_ccsid: u32,
    server_nlv: String,
    datastream_level: u16,
    password_level: u8,
    job_name: String,
    client_seed: u64,
    server_seed: u64,
}

impl Client<tcp::Transport> {
    /// Creates a client that dials the configured host over TCP, with
    /// TLS when the options ask for it. Nothing is sent until
    /// [`Client::connect`].
    pub fn new(options: Options, user: &str, password: &str) -> Client<tcp::Transport> {
        Client::with_transport(options, user, password)
    }
}

impl<T: Transport> Client<T> {
    /// Creates a client over a custom [`Transport`] implementation.
    pub fn with_transport(options: Options, user: &str, password: &str) -> Client<T> {
        Client {
            options,
            user: user.to_string(),
            password: password.to_string(),
            temporary_library: "QTEMP".to_string(),
            state: State::Closed,
            signon: None,
            command: None,
            server_version: 0,
            server_level: 0,
            server_ccsid: constant::DEFAULT_CCSID,
            server_nlv: constant::DEFAULT_NLV.to_string(),
            datastream_level: 0,
            password_level: 0,
            job_name: String::new(),
            client_seed: 0,
            server_seed: 0,
        }
    }

    /// Overrides the temporary library advertised to callers, `QTEMP`
    /// unless set before connecting.
    pub fn with_temporary_library(mut self, library: &str) -> Client<T> {
        self.temporary_library = library.to_string();
        self
    }

    pub fn temporary_library(&self) -> &str {
        &self.temporary_library
    }

    pub fn is_connected(&self) -> bool {
        self.state == State::Ready
    }

    pub fn server_version(&self) -> u32 {
        self.server_version
    }

    pub fn server_level(&self) -> u16 {
        self.server_level
    }

    pub fn server_ccsid(&self) -> u32 {
        self.server_ccsid
    }

    pub fn server_nlv(&self) -> &str {
        &self.server_nlv
    }

    pub fn datastream_level(&self) -> u16 {
        self.datastream_level
    }

    pub fn password_level(&self) -> u8 {
        self.password_level
    }

    /// Fully qualified server job serving the command channel, empty
    /// until connected.
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Walks both handshakes. A no-op when the client is already
    /// connected; on any failure both channels are closed again.
    pub fn connect(&mut self) -> Result<(), Error> {
        if self.state == State::Ready {
            return Ok(());
        }
        self.validate_credentials()?;
        let result = self.connect_steps();
        self.seal(result)
    }

    /// Closes both channels and forgets the job name. Idempotent.
    pub fn disconnect(&mut self) {
        if let Some(mut channel) = self.signon.take() {
            channel.disconnect();
        }
        if let Some(mut channel) = self.command.take() {
            channel.disconnect();
        }
        self.job_name.clear();
        self.state = State::Closed;
    }

    /// Runs one CL command, for example `DSPJOB` or
    /// `CRTLIB LIB(SANDBOX)`.
    ///
    /// The server's result code comes back as the return value together
    /// with its messages; `0` is success and `0x0400` marks a warning
    /// level outcome. Result codes are data, not errors.
    pub fn call_command(
        &mut self,
        command: &str,
        messages: &mut CallMessages,
    ) -> Result<u16, Error> {
        let result = self.run_command(command, messages);
        self.seal(result)
    }

    /// Calls `library/program` with the given parameter list. Output
    /// and input/output buffers are replaced in place when the call
    /// returns code zero.
    pub fn call_program(
        &mut self,
        program: &str,
        library: &str,
        parameters: &mut ProgramCallParameters,
        messages: &mut CallMessages,
    ) -> Result<u16, Error> {
        let result = self.run_program(program, library, parameters, messages);
        self.seal(result)
    }

    /// Calls an exported function of `library/service_program` through
    /// the QZRUCLSP system API.
    pub fn call_service_program(
        &mut self,
        service_program: &str,
        library: &str,
        function: &str,
        parameters: &mut ServiceProgramCallParameters,
        messages: &mut CallMessages,
    ) -> Result<u16, Error> {
        let result = self.run_service_program(service_program, library, function, parameters, messages);
        self.seal(result)
    }

    fn connect_steps(&mut self) -> Result<(), Error> {
        self.connect_signon()?;
        self.authenticate_signon()?;
        self.connect_command()?;
        self.authenticate_command()?;
        self.exchange_attributes()
    }

    fn connect_signon(&mut self) -> Result<(), Error> {
        let mut channel = T::open(&self.options, self.options.signon_port)?;
        self.exchange_signon_seeds(&mut channel)?;
        self.signon = Some(channel);
        self.state = State::SignonConnected;
        debug!(
            "sign-on seed exchange done, server version {} level {} password level {}",
            self.server_version, self.server_level, self.password_level
        );
        Ok(())
    }

    fn exchange_signon_seeds(&mut self, channel: &mut T) -> Result<(), Error> {
        self.client_seed = rand::random();
        self.server_seed = 0;

        let mut request = DataStream::new();
        write_header(
            &mut request,
            constant::SERVER_SIGNON,
            0,
            constant::REQ_SIGNON_SEED_EXCHANGE,
        );
        write_field_u32(&mut request, constant::CP_SIGNON_VERSION, constant::CLIENT_VERSION);
        write_field_u16(
            &mut request,
            constant::CP_SIGNON_LEVEL,
            constant::CLIENT_DATASTREAM_LEVEL,
        );
        write_field_u64(&mut request, constant::CP_SIGNON_SEED, self.client_seed);

        let reply = channel.send(request.as_slice())?;
        expect_reply(&reply)?;
        let code = codec::read_u32(&reply, 20);
        if code != 0 {
            return Err(Error::Authentication { code });
        }
        for (cp, data) in dynamic_fields(&reply, 24)? {
            match cp {
                constant::CP_SIGNON_VERSION => self.server_version = field_uint(data, 4) as u32,
                constant::CP_SIGNON_LEVEL => self.server_level = field_uint(data, 2) as u16,
                constant::CP_SIGNON_SEED => self.server_seed = field_uint(data, 8),
                constant::CP_PASSWORD_LEVEL => self.password_level = field_uint(data, 1) as u8,
                constant::CP_JOB_NAME => self.job_name = job_name_text(data),
                _ => {}
            }
        }
        Ok(())
    }

    fn authenticate_signon(&mut self) -> Result<(), Error> {
        let scheme = ProofScheme::for_password_level(self.password_level);
        let proof = self.password_proof(scheme);
        let user_field = codec::ascii_to_ebcdic(&codec::upper_pad(&self.user, 10));

        let mut request = DataStream::new();
        write_header(
            &mut request,
            constant::SERVER_SIGNON,
            1,
            constant::REQ_SIGNON_AUTHENTICATE,
        );
        request.write_u8(scheme.encryption_id());
        write_field_u32(&mut request, constant::CP_CLIENT_CCSID, constant::CLIENT_CCSID);
        write_field_bytes(&mut request, constant::CP_PASSWORD, &proof);
        write_field_bytes(&mut request, constant::CP_USER_ID, &user_field);
        if self.server_level >= 5 {
            write_field_u8(&mut request, constant::CP_RETURN_MESSAGES, 1);
        }

        let channel = self.signon.as_mut().ok_or(Error::NotConnected)?;
        let reply = channel.send(request.as_slice())?;
        expect_reply(&reply)?;
        let code = codec::read_u32(&reply, 20);
        if code != 0 {
            return Err(Error::Authentication { code });
        }
        for (cp, data) in dynamic_fields(&reply, 24)? {
            if cp == constant::CP_SERVER_CCSID {
                let ccsid = field_uint(data, 4) as u32;
                if ccsid != 0 {
                    self.server_ccsid = ccsid;
                }
            }
        }
        self.state = State::SignonAuthed;
        Ok(())
    }

    fn connect_command(&mut self) -> Result<(), Error> {
        let mut channel = T::open(&self.options, self.options.command_port)?;
        self.exchange_command_seeds(&mut channel)?;
        self.command = Some(channel);
        self.state = State::RcConnected;
        Ok(())
    }

    fn exchange_command_seeds(&mut self, channel: &mut T) -> Result<(), Error> {
        self.client_seed = rand::random();
        self.server_seed = 0;

        let mut request = DataStream::new();
        // client attribute 1 announces SHA-1 capability
        write_initial_header(&mut request, 1, 8, constant::REQ_COMMAND_SEED_EXCHANGE);
        request.write_u64(self.client_seed);

        let reply = channel.send(request.as_slice())?;
        expect_reply(&reply)?;
        let code = codec::read_u32(&reply, 20);
        if code != 0 {
            return Err(Error::Authentication { code });
        }
        if reply.len() < 32 {
            return Err(Error::frame("seed exchange reply without a server seed"));
        }
        self.server_seed = codec::read_u64(&reply, 24);
        Ok(())
    }

    fn authenticate_command(&mut self) -> Result<(), Error> {
        let scheme = ProofScheme::for_password_level(self.password_level);
        let proof = self.password_proof(scheme);
        let user_field = codec::ascii_to_ebcdic(&codec::upper_pad(&self.user, 10));

        let mut request = DataStream::new();
        // client attribute 2 asks for the serving job's identity
        write_initial_header(&mut request, 2, 2, constant::REQ_COMMAND_AUTHENTICATE);
        request.write_u8(scheme.encryption_id());
        request.write_u8(1); // send a reply
        write_field_bytes(&mut request, constant::CP_PASSWORD, &proof);
        write_field_bytes(&mut request, constant::CP_USER_ID, &user_field);

        let channel = self.command.as_mut().ok_or(Error::NotConnected)?;
        let reply = channel.send(request.as_slice())?;
        expect_reply(&reply)?;
        let code = codec::read_u32(&reply, 20);
        if code != 0 {
            return Err(Error::Authentication { code });
        }
        for (cp, data) in dynamic_fields(&reply, 24)? {
            if cp == constant::CP_JOB_NAME {
                self.job_name = job_name_text(data);
            }
        }
        self.state = State::RcAuthed;
        debug!("remote command authentication done, job {}", self.job_name);
        Ok(())
    }

    fn exchange_attributes(&mut self) -> Result<(), Error> {
        let mut request = DataStream::new();
        write_header(
            &mut request,
            constant::SERVER_COMMAND,
            14,
            constant::REQ_EXCHANGE_ATTRIBUTES,
        );
        request.write_u32(constant::CLIENT_CCSID);
        request.write_bytes(&codec::ascii_to_ebcdic(constant::DEFAULT_NLV));
        request.write_u32(constant::CLIENT_VERSION);
        request.write_u16(0); // client datastream level

        let channel = self.command.as_mut().ok_or(Error::NotConnected)?;
        let reply = channel.send(request.as_slice())?;
        expect_reply(&reply)?;
        let code = codec::read_u16(&reply, 20);
        if !constant::attribute_code_ok(code) {
            return Err(Error::ServerInfo { code });
        }
        if reply.len() < 36 {
            return Err(Error::frame("attribute exchange reply shorter than its template"));
        }
        self.server_ccsid = codec::read_u32(&reply, 22);
        self.server_nlv = codec::ebcdic_to_ascii(&reply[26..30]);
        // reserved u32 at 30
        self.datastream_level = codec::read_u16(&reply, 34);
        self.state = State::Ready;
        debug!(
            "attributes exchanged, CCSID {} NLV {} datastream level {}",
            self.server_ccsid, self.server_nlv, self.datastream_level
        );
        Ok(())
    }

    fn run_command(&mut self, command: &str, messages: &mut CallMessages) -> Result<u16, Error> {
        self.require_ready()?;

        let mut request = DataStream::new();
        write_header(&mut request, constant::SERVER_COMMAND, 1, constant::REQ_RUN_COMMAND);
        request.write_u8(constant::message_option(self.datastream_level));
        if self.datastream_level > 10 {
            let text = codec::utf16be(command);
            request.write_u32((10 + text.len()) as u32);
            request.write_u16(constant::CP_COMMAND_TEXT_UTF16);
            request.write_u32(constant::CLIENT_CCSID);
            request.write_bytes(&text);
        } else {
            let text = codec::ascii_to_ebcdic(command);
            request.write_u32((6 + text.len()) as u32);
            request.write_u16(constant::CP_COMMAND_TEXT);
            request.write_bytes(&text);
        }

        let channel = self.command.as_mut().ok_or(Error::NotConnected)?;
        let reply = channel.send(request.as_slice())?;
        expect_reply(&reply)?;
        let code = codec::read_u16(&reply, 20);
        let count = codec::read_u16(&reply, 22) as usize;
        *messages = message::parse_messages(&reply, 24, count)?;
        Ok(code)
    }

    fn run_program(
        &mut self,
        program: &str,
        library: &str,
        parameters: &mut ProgramCallParameters,
        messages: &mut CallMessages,
    ) -> Result<u16, Error> {
        self.require_ready()?;
        validate_name("program", program)?;
        validate_name("library", library)?;

        let mut request = DataStream::new();
        write_header(&mut request, constant::SERVER_COMMAND, 23, constant::REQ_CALL_PROGRAM);
        request.write_bytes(&codec::ascii_to_ebcdic(&codec::upper_pad(program, 10)));
        request.write_bytes(&codec::ascii_to_ebcdic(&codec::upper_pad(library, 10)));
        request.write_u8(constant::message_option(self.datastream_level));
        request.write_u16(parameters.len() as u16);
        for parameter in parameters.iter() {
            let mut type_code = parameter.parameter_type().code();
            let mut payload = parameter.data();
            if parameter.parameter_type() == ParameterType::Null && self.datastream_level < 6 {
                // servers below level 6 have no NULL parameter support
                type_code = 1;
                payload = &[];
            }
            request.write_u32((12 + payload.len()) as u32);
            request.write_u16(constant::CP_PROGRAM_PARAMETER);
            request.write_u32(parameter.max_length() as u32);
            request.write_u16(type_code);
            request.write_bytes(payload);
        }

        let channel = self.command.as_mut().ok_or(Error::NotConnected)?;
        let reply = channel.send(request.as_slice())?;
        expect_reply(&reply)?;
        let code = codec::read_u16(&reply, 20);
        let count = codec::read_u16(&reply, 22) as usize;
        if code != 0 {
            *messages = if count > 0 {
                message::parse_messages(&reply, 24, count)?
            } else {
                CallMessages::new()
            };
            return Ok(code);
        }
        *messages = CallMessages::new();
        read_output_parameters(&reply, parameters);
        Ok(0)
    }

    fn run_service_program(
        &mut self,
        service_program: &str,
        library: &str,
        function: &str,
        parameters: &mut ServiceProgramCallParameters,
        messages: &mut CallMessages,
    ) -> Result<u16, Error> {
        self.require_ready()?;
        validate_name("service program", service_program)?;
        validate_name("library", library)?;

        let mut call = build_service_program_call(service_program, library, function, parameters)?;
        let code = self.run_program(
            constant::SERVICE_PROGRAM_API,
            constant::SYSTEM_LIBRARY,
            &mut call,
            messages,
        )?;
        if code != 0 {
            return Ok(code);
        }
        for (index, parameter) in parameters.iter_mut().enumerate() {
            if let Some(updated) = call.get(7 + index) {
                parameter.set_data(updated.data().to_vec());
            }
        }
        if let Some(receiver) = call.get(6) {
            store_return_value(parameters, receiver.data());
        }
        Ok(0)
    }

    fn password_proof(&self, scheme: ProofScheme) -> Vec<u8> {
        match scheme {
            ProofScheme::Des => {
                des_password_proof(&self.user, &self.password, self.server_seed, self.client_seed)
                    .to_vec()
            }
            ProofScheme::Sha1 => {
                sha_password_proof(&self.user, &self.password, self.server_seed, self.client_seed)
                    .to_vec()
            }
        }
    }

    fn validate_credentials(&self) -> Result<(), Error> {
        if self.user.is_empty()
            || self.user.len() > constant::MAX_NAME_LENGTH
            || !self.user.is_ascii()
        {
            return Err(Error::InvalidInput(format!(
                "user name must be 1 to {} ASCII characters",
                constant::MAX_NAME_LENGTH
            )));
        }
        if self.password.len() > constant::MAX_PASSWORD_LENGTH || !self.password.is_ascii() {
            return Err(Error::InvalidInput(format!(
                "password must be at most {} ASCII characters",
                constant::MAX_PASSWORD_LENGTH
            )));
        }
        Ok(())
    }

    fn require_ready(&self) -> Result<(), Error> {
        if self.state != State::Ready {
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    // Configuration mistakes leave the session alone, everything else
    // tears it down.
    fn seal<V>(&mut self, result: Result<V, Error>) -> Result<V, Error> {
        if let Err(e) = &result {
            match e {
                Error::InvalidInput(_) | Error::NotConnected => {}
                _ => self.disconnect(),
            }
        }
        result
    }
}

impl<T: Transport> Drop for Client<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// 16 byte header behind the outer length frame
fn write_header(out: &mut DataStream, server_id: u16, template_length: u16, reqrep: u16) {
    out.write_u16(0); // header id
    out.write_u16(server_id);
    out.write_u32(0); // CS instance
    out.write_u32(0); // correlation id
    out.write_u16(template_length);
    out.write_u16(reqrep);
}

// initial remote command frames carry attribute bytes in place of the
// header id
fn write_initial_header(out: &mut DataStream, client_attributes: u8, template_length: u16, reqrep: u16) {
    out.write_u8(client_attributes);
    out.write_u8(0); // server attributes
    out.write_u16(constant::SERVER_COMMAND);
    out.write_u32(0);
    out.write_u32(0);
    out.write_u16(template_length);
    out.write_u16(reqrep);
}

fn write_field_u8(out: &mut DataStream, cp: u16, value: u8) {
    out.write_u32(7);
    out.write_u16(cp);
    out.write_u8(value);
}

fn write_field_u16(out: &mut DataStream, cp: u16, value: u16) {
    out.write_u32(8);
    out.write_u16(cp);
    out.write_u16(value);
}

fn write_field_u32(out: &mut DataStream, cp: u16, value: u32) {
    out.write_u32(10);
    out.write_u16(cp);
    out.write_u32(value);
}

fn write_field_u64(out: &mut DataStream, cp: u16, value: u64) {
    out.write_u32(14);
    out.write_u16(cp);
    out.write_u64(value);
}

fn write_field_bytes(out: &mut DataStream, cp: u16, value: &[u8]) {
    out.write_u32((6 + value.len()) as u32);
    out.write_u16(cp);
    out.write_bytes(value);
}

fn expect_reply(reply: &[u8]) -> Result<(), Error> {
    if reply.len() < 20 {
        return Err(Error::frame(format!(
            "response of {} bytes is shorter than the fixed header",
            reply.len()
        )));
    }
    Ok(())
}

// walks `{u32 LL, u16 CP, data}` records to the end of the reply
fn dynamic_fields(reply: &[u8], mut offset: usize) -> Result<Vec<(u16, &[u8])>, Error> {
    let mut fields = Vec::new();
    while offset + 6 <= reply.len() {
        let ll = codec::read_u32(reply, offset) as usize;
        let cp = codec::read_u16(reply, offset + 4);
        if ll < 6 || offset + ll > reply.len() {
            return Err(Error::frame("malformed dynamic field"));
        }
        fields.push((cp, &reply[offset + 6..offset + ll]));
        offset += ll;
    }
    Ok(fields)
}

// a field value, right justified when the server sent fewer bytes
fn field_uint(data: &[u8], width: usize) -> u64 {
    codec::read_uint(data, 0, width.min(data.len()))
}

// the job name field carries four bytes of job metadata first
fn job_name_text(data: &[u8]) -> String {
    if data.len() > 4 {
        codec::ebcdic_to_ascii(&data[4..])
    } else {
        String::new()
    }
}

fn validate_name(kind: &str, name: &str) -> Result<(), Error> {
    if name.is_empty() || name.len() > constant::MAX_NAME_LENGTH || !name.is_ascii() {
        return Err(Error::InvalidInput(format!(
            "{} name must be 1 to {} ASCII characters, got {:?}",
            kind,
            constant::MAX_NAME_LENGTH,
            name
        )));
    }
    Ok(())
}

fn read_output_parameters(reply: &[u8], parameters: &mut ProgramCallParameters) {
    let mut offset = 24usize;
    for parameter in parameters.iter_mut() {
        if !parameter.parameter_type().is_returned() {
            continue;
        }
        if offset + 12 > reply.len() {
            break;
        }
        let ll = codec::read_u32(reply, offset);
        if ll == 0 || ll == constant::IDLE_FRAME_BLANKS {
            break;
        }
        let data_length = (ll as usize).saturating_sub(12);
        let end = offset + 12 + data_length;
        if end > reply.len() {
            break;
        }
        parameter.set_data(reply[offset + 12..end].to_vec());
        offset = end;
    }
}

// Parameter list for the QZRUCLSP trampoline: seven fixed slots in
// front of the caller's own parameters.
fn build_service_program_call(
    service_program: &str,
    library: &str,
    function: &str,
    parameters: &ServiceProgramCallParameters,
) -> Result<ProgramCallParameters, Error> {
    if parameters.len() > constant::MAX_SERVICE_PARAMETERS {
        return Err(Error::InvalidInput(format!(
            "a service program call carries at most {} parameters",
            constant::MAX_SERVICE_PARAMETERS
        )));
    }

    let mut names = codec::upper_pad(service_program, 10);
    names.push_str(&codec::upper_pad(library, 10));

    let mut function_name = codec::ascii_to_ebcdic(function);
    function_name.push(0); // the API wants a NUL terminated name

    let mut pass_by = Vec::new();
    if parameters.is_empty() {
        pass_by.extend_from_slice(&0u32.to_be_bytes());
    } else {
        for parameter in parameters.iter() {
            pass_by.extend_from_slice(&parameter.pass_by().code().to_be_bytes());
        }
    }

    let receiver_length = parameters.return_format().receiver_length();

    // the receiver variable sits behind the fixed argument block; the
    // pad stretches it onto a 16 byte boundary when asked to
    let alignment = if parameters.align_receiver_16() && !parameters.is_empty() {
        let header = function_name.len() + pass_by.len() + receiver_length + 28;
        vec![0u8; 64 - (header % 16)]
    } else {
        vec![0u8; 4]
    };

    let mut items = Vec::with_capacity(7 + parameters.len());
    items.push(ProgramCallParameter::input(codec::ascii_to_ebcdic(&names)));
    items.push(ProgramCallParameter::input(function_name));
    items.push(ProgramCallParameter::input(
        parameters.return_format().code().to_be_bytes().to_vec(),
    ));
    items.push(ProgramCallParameter::input(pass_by));
    items.push(ProgramCallParameter::input(
        (parameters.len() as u32).to_be_bytes().to_vec(),
    ));
    items.push(ProgramCallParameter::input_output(alignment, 0));
    items.push(ProgramCallParameter::output(receiver_length));
    for parameter in parameters.iter() {
        items.push(ProgramCallParameter::input_output(
            parameter.data().to_vec(),
            parameter.max_length(),
        ));
    }
    Ok(ProgramCallParameters::new(items))
}

fn store_return_value(parameters: &mut ServiceProgramCallParameters, receiver: &[u8]) {
    match parameters.return_format() {
        ReturnFormat::None => parameters.set_results(0, 0, [0u8; 16]),
        ReturnFormat::Integer => {
            parameters.set_results(codec::read_u32(receiver, 0), 0, [0u8; 16])
        }
        ReturnFormat::IntegerErrno => parameters.set_results(
            codec::read_u32(receiver, 0),
            codec::read_u32(receiver, 4),
            [0u8; 16],
        ),
        ReturnFormat::Pointer => {
            let mut pointer = [0u8; 16];
            let length = receiver.len().min(16);
            pointer[..length].copy_from_slice(&receiver[..length]);
            parameters.set_results(0, 0, pointer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ServiceProgramCallParameter;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Replay {
        sent: Vec<Vec<u8>>,
        replies: VecDeque<Vec<u8>>,
    }

    impl Replay {
        fn with_replies(replies: Vec<Vec<u8>>) -> Replay {
            Replay {
                sent: Vec::new(),
                replies: replies.into(),
            }
        }
    }

    impl Transport for Replay {
        fn open(_: &Options, _: u16) -> Result<Replay, Error> {
            Ok(Replay::default())
        }

        fn send(&mut self, payload: &[u8]) -> Result<Vec<u8>, Error> {
            self.sent.push(payload.to_vec());
            self.replies
                .pop_front()
                .ok_or_else(|| Error::frame("replay transport out of replies"))
        }

        fn disconnect(&mut self) {}
    }

    fn client() -> Client<Replay> {
        Client::with_transport(Options::new("testhost", false), "QSECOFR", "QSECOFR")
    }

    // a reply as the transport returns it: length prefix plus body
    fn frame(body: &[u8]) -> Vec<u8> {
        let mut wire = ((body.len() + 4) as u32).to_be_bytes().to_vec();
        wire.extend_from_slice(body);
        wire
    }

    fn field(cp: u16, data: &[u8]) -> Vec<u8> {
        let mut out = ((6 + data.len()) as u32).to_be_bytes().to_vec();
        out.extend_from_slice(&cp.to_be_bytes());
        out.extend_from_slice(data);
        out
    }

    // handshake style reply: 16 header bytes, u32 result code, fields
    fn handshake_reply(code: u32, fields: &[Vec<u8>]) -> Vec<u8> {
        let mut body = vec![0u8; 16];
        body.extend_from_slice(&code.to_be_bytes());
        for f in fields {
            body.extend_from_slice(f);
        }
        frame(&body)
    }

    // call style reply: 16 header bytes, u16 result code, u16 count, rest
    fn call_reply(code: u16, count: u16, rest: &[u8]) -> Vec<u8> {
        let mut body = vec![0u8; 16];
        body.extend_from_slice(&code.to_be_bytes());
        body.extend_from_slice(&count.to_be_bytes());
        body.extend_from_slice(rest);
        frame(&body)
    }

    #[test]
    fn signon_seed_exchange_round_trip() {
        let mut job_data = vec![0u8; 4];
        job_data.extend_from_slice(&codec::ascii_to_ebcdic("QUSER QPADEV0001 123456"));
        let reply = handshake_reply(
            0,
            &[
                field(0x1101, &1u32.to_be_bytes()),
                field(0x1102, &2u16.to_be_bytes()),
                field(0x1103, &0xAAAA_AAAA_AAAA_AAAAu64.to_be_bytes()),
                field(0x1119, &[2]),
                field(0x111F, &job_data),
            ],
        );

        let mut c = client();
        let mut channel = Replay::with_replies(vec![reply]);
        c.exchange_signon_seeds(&mut channel).unwrap();

        assert_eq!(c.server_version, 1);
        assert_eq!(c.server_level, 2);
        assert_eq!(c.server_seed, 0xAAAA_AAAA_AAAA_AAAA);
        assert_eq!(c.password_level, 2);
        assert_eq!(c.job_name, "QUSER QPADEV0001 123456");

        // the request carries our version, level and seed fields behind
        // the fixed header
        let sent = &channel.sent[0];
        assert_eq!(codec::read_u16(sent, 0), 0); // header id
        assert_eq!(codec::read_u16(sent, 2), 0xE009);
        assert_eq!(codec::read_u16(sent, 12), 0); // template length
        assert_eq!(codec::read_u16(sent, 14), 0x7003);
        assert_eq!(codec::read_u32(sent, 16), 10);
        assert_eq!(codec::read_u16(sent, 20), 0x1101);
        assert_eq!(codec::read_u32(sent, 22), 1);
        assert_eq!(codec::read_u32(sent, 26), 8);
        assert_eq!(codec::read_u16(sent, 30), 0x1102);
        assert_eq!(codec::read_u16(sent, 32), 2);
        assert_eq!(codec::read_u32(sent, 34), 14);
        assert_eq!(codec::read_u16(sent, 38), 0x1103);
        assert_eq!(codec::read_u64(sent, 40), c.client_seed);
    }

    #[test]
    fn signon_authenticate_emits_des_proof_fields() {
        let mut c = client();
        c.password_level = 2;
        c.server_level = 5;
        c.server_seed = 0x1122_3344_5566_7788;
        c.client_seed = 0x0102_0304_0506_0708;
        c.signon = Some(Replay::with_replies(vec![handshake_reply(0, &[])]));

        c.authenticate_signon().unwrap();
        assert_eq!(c.state, State::SignonAuthed);

        let sent = c.signon.as_ref().unwrap().sent[0].clone();
        assert_eq!(codec::read_u16(sent.as_slice(), 14), 0x7004);
        // template byte selects DES
        assert_eq!(sent[16], 1);
        // client CCSID field
        assert_eq!(codec::read_u32(sent.as_slice(), 17), 10);
        assert_eq!(codec::read_u16(sent.as_slice(), 21), 0x1113);
        assert_eq!(codec::read_u32(sent.as_slice(), 23), 1200);
        // password proof field carries the pinned 8 byte DES vector
        assert_eq!(codec::read_u32(sent.as_slice(), 27), 14);
        assert_eq!(codec::read_u16(sent.as_slice(), 31), 0x1105);
        assert_eq!(
            &sent[33..41],
            &des_password_proof("QSECOFR", "QSECOFR", c.server_seed, c.client_seed)
        );
        // user id field, 10 blank padded EBCDIC bytes
        assert_eq!(codec::read_u32(sent.as_slice(), 41), 16);
        assert_eq!(codec::read_u16(sent.as_slice(), 45), 0x1104);
        assert_eq!(&sent[47..57], codec::ascii_to_ebcdic("QSECOFR   ").as_slice());
        // server level 5 asks for error messages
        assert_eq!(codec::read_u32(sent.as_slice(), 57), 7);
        assert_eq!(codec::read_u16(sent.as_slice(), 61), 0x1128);
        assert_eq!(sent[63], 1);
        assert_eq!(sent.len(), 64);
    }

    #[test]
    fn signon_authenticate_sha1_above_level_two() {
        let mut c = client();
        c.password_level = 3;
        c.server_level = 4;
        c.signon = Some(Replay::with_replies(vec![handshake_reply(0, &[])]));

        c.authenticate_signon().unwrap();

        let sent = c.signon.as_ref().unwrap().sent[0].clone();
        // template byte selects SHA-1 and the proof is 20 bytes
        assert_eq!(sent[16], 3);
        assert_eq!(codec::read_u32(sent.as_slice(), 27), 26);
        assert_eq!(codec::read_u16(sent.as_slice(), 31), 0x1105);
        // no error message field below server level 5
        assert_eq!(sent.len(), 17 + 10 + 26 + 16);
    }

    #[test]
    fn signon_authenticate_maps_failure_codes() {
        let mut c = client();
        c.signon = Some(Replay::with_replies(vec![handshake_reply(0x0003_000B, &[])]));
        match c.authenticate_signon() {
            Err(Error::Authentication { code: 0x0003_000B }) => {}
            other => panic!("expected authentication error, got {:?}", other),
        }
    }

    #[test]
    fn command_seed_exchange_round_trip() {
        let mut body = vec![0u8; 16];
        body.extend_from_slice(&0u32.to_be_bytes());
        body.extend_from_slice(&0xBBBB_CCCC_DDDD_EEEEu64.to_be_bytes());
        let reply = frame(&body);

        let mut c = client();
        let mut channel = Replay::with_replies(vec![reply]);
        c.exchange_command_seeds(&mut channel).unwrap();
        assert_eq!(c.server_seed, 0xBBBB_CCCC_DDDD_EEEE);

        let sent = &channel.sent[0];
        assert_eq!(sent[0], 1); // client attributes: SHA-1 capable
        assert_eq!(sent[1], 0);
        assert_eq!(codec::read_u16(sent, 2), 0xE008);
        assert_eq!(codec::read_u16(sent, 12), 8);
        assert_eq!(codec::read_u16(sent, 14), 0x7001);
        assert_eq!(codec::read_u64(sent, 16), c.client_seed);
        assert_eq!(sent.len(), 24);
    }

    #[test]
    fn command_seed_reply_without_seed_is_framing_error() {
        let mut c = client();
        let mut channel = Replay::with_replies(vec![handshake_reply(0, &[])]);
        match c.exchange_command_seeds(&mut channel) {
            Err(Error::Frame { .. }) => {}
            other => panic!("expected frame error, got {:?}", other),
        }
    }

    #[test]
    fn command_authenticate_parses_job_name() {
        let mut job_data = vec![0u8; 4];
        job_data.extend_from_slice(&codec::ascii_to_ebcdic("QZRCSRVS QUSER 345678"));
        let mut c = client();
        c.command = Some(Replay::with_replies(vec![handshake_reply(
            0,
            &[field(0x111F, &job_data)],
        )]));

        c.authenticate_command().unwrap();
        assert_eq!(c.state, State::RcAuthed);
        assert_eq!(c.job_name, "QZRCSRVS QUSER 345678");

        let sent = c.command.as_ref().unwrap().sent[0].clone();
        assert_eq!(sent[0], 2); // client attributes: return job info
        assert_eq!(codec::read_u16(sent.as_slice(), 12), 2);
        assert_eq!(codec::read_u16(sent.as_slice(), 14), 0x7002);
        assert_eq!(sent[16], 1); // DES at the default password level
        assert_eq!(sent[17], 1); // send a reply
    }

    #[test]
    fn attribute_exchange_parses_template() {
        let mut body = vec![0u8; 16];
        body.extend_from_slice(&0x0100u16.to_be_bytes()); // tolerated code
        body.extend_from_slice(&37u32.to_be_bytes());
        body.extend_from_slice(&codec::ascii_to_ebcdic("2924"));
        body.extend_from_slice(&0u32.to_be_bytes()); // reserved
        body.extend_from_slice(&12u16.to_be_bytes());
        let mut c = client();
        c.command = Some(Replay::with_replies(vec![frame(&body)]));

        c.exchange_attributes().unwrap();
        assert_eq!(c.state, State::Ready);
        assert!(c.is_connected());
        assert_eq!(c.server_ccsid(), 37);
        assert_eq!(c.server_nlv(), "2924");
        assert_eq!(c.datastream_level(), 12);

        let sent = c.command.as_ref().unwrap().sent[0].clone();
        assert_eq!(codec::read_u16(sent.as_slice(), 12), 14); // template length
        assert_eq!(codec::read_u16(sent.as_slice(), 14), 0x1001);
        assert_eq!(codec::read_u32(sent.as_slice(), 16), 1200);
        assert_eq!(&sent[20..24], codec::ascii_to_ebcdic("2924").as_slice());
        assert_eq!(codec::read_u32(sent.as_slice(), 24), 1);
        assert_eq!(codec::read_u16(sent.as_slice(), 28), 0);
    }

    #[test]
    fn attribute_exchange_rejects_unknown_code() {
        let mut body = vec![0u8; 16];
        body.extend_from_slice(&0x0200u16.to_be_bytes());
        let mut c = client();
        c.command = Some(Replay::with_replies(vec![frame(&body)]));
        match c.exchange_attributes() {
            Err(Error::ServerInfo { code: 0x0200 }) => {}
            other => panic!("expected server info error, got {:?}", other),
        }
    }

    fn ready_client(replies: Vec<Vec<u8>>) -> Client<Replay> {
        let mut c = client();
        c.state = State::Ready;
        c.datastream_level = 8;
        c.command = Some(Replay::with_replies(replies));
        c
    }

    fn sent_command_frames(c: &Client<Replay>) -> Vec<Vec<u8>> {
        c.command.as_ref().unwrap().sent.clone()
    }

    #[test]
    fn call_command_ebcdic_below_level_ten() {
        let mut c = ready_client(vec![call_reply(0, 0, &[])]);
        let mut messages = CallMessages::new();
        let code = c.call_command("DSPJOB", &mut messages).unwrap();
        assert_eq!(code, 0);
        assert!(messages.is_empty());

        let frames = sent_command_frames(&c);
        let sent = &frames[0];
        assert_eq!(codec::read_u16(sent, 2), 0xE008);
        assert_eq!(codec::read_u16(sent, 12), 1);
        assert_eq!(codec::read_u16(sent, 14), 0x1002);
        assert_eq!(sent[16], 2); // message option at level 8
        assert_eq!(codec::read_u32(sent, 17), 6 + 6);
        assert_eq!(codec::read_u16(sent, 21), 0x1101);
        assert_eq!(&sent[23..29], codec::ascii_to_ebcdic("DSPJOB").as_slice());
    }

    #[test]
    fn call_command_utf16_above_level_ten() {
        let mut c = ready_client(vec![call_reply(0, 0, &[])]);
        c.datastream_level = 12;
        let mut messages = CallMessages::new();
        c.call_command("DSPJOB", &mut messages).unwrap();

        let frames = sent_command_frames(&c);
        let sent = &frames[0];
        assert_eq!(sent[16], 4); // message option at level 12
        assert_eq!(codec::read_u32(sent, 17), 10 + 12);
        assert_eq!(codec::read_u16(sent, 21), 0x1104);
        assert_eq!(codec::read_u32(sent, 23), 1200);
        assert_eq!(&sent[27..39], codec::utf16be("DSPJOB").as_slice());
    }

    #[test]
    fn call_command_returns_warning_code_with_messages() {
        // one legacy message entry behind the count
        let mut entry_data = Vec::new();
        entry_data.extend_from_slice(&codec::ascii_to_ebcdic("CPF1234"));
        entry_data.extend_from_slice(&2u16.to_be_bytes());
        entry_data.extend_from_slice(&20u16.to_be_bytes());
        entry_data.extend_from_slice(&codec::ascii_to_ebcdic(&codec::upper_pad("QCPFMSG", 10)));
        entry_data.extend_from_slice(&codec::ascii_to_ebcdic(&codec::upper_pad("QSYS", 10)));
        entry_data.extend_from_slice(&0u16.to_be_bytes());
        entry_data.extend_from_slice(&5u16.to_be_bytes());
        entry_data.extend_from_slice(&codec::ascii_to_ebcdic("HELLO"));
        let entry = field(0x1102, &entry_data);

        let mut c = ready_client(vec![call_reply(0x0400, 1, &entry)]);
        let mut messages = CallMessages::new();
        let code = c.call_command("CHKOBJ OBJ(NOPE) OBJTYPE(*LIB)", &mut messages).unwrap();
        assert_eq!(code, 0x0400);
        assert!(c.is_connected()); // warnings do not cost the session
        assert_eq!(messages.len(), 1);
        assert_eq!(messages.get(0).unwrap().id(), "CPF1234");
        assert_eq!(messages.get(0).unwrap().text(), "HELLO");
    }

    #[test]
    fn call_program_round_trip_updates_output_parameter() {
        // one returned block: 100 payload bytes for the first parameter
        let payload = vec![0x5Au8; 100];
        let mut rest = Vec::new();
        rest.extend_from_slice(&112u32.to_be_bytes());
        rest.extend_from_slice(&0x1103u16.to_be_bytes());
        rest.extend_from_slice(&100u32.to_be_bytes());
        rest.extend_from_slice(&12u16.to_be_bytes());
        rest.extend_from_slice(&payload);

        let mut c = ready_client(vec![call_reply(0, 0, &rest)]);
        let mut parameters = ProgramCallParameters::new(vec![
            ProgramCallParameter::output(100),
            ProgramCallParameter::input(100u32.to_be_bytes().to_vec()),
            ProgramCallParameter::input(codec::ascii_to_ebcdic("QCENTURY  ")),
        ]);
        let mut messages = CallMessages::new();
        let code = c
            .call_program("QWCRSVAL", "QSYS", &mut parameters, &mut messages)
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(parameters.get(0).unwrap().data(), payload.as_slice());
        // input parameters keep their buffers
        assert_eq!(parameters.get(1).unwrap().data(), &100u32.to_be_bytes());

        let frames = sent_command_frames(&c);
        let sent = &frames[0];
        assert_eq!(codec::read_u16(sent, 12), 23);
        assert_eq!(codec::read_u16(sent, 14), 0x1003);
        assert_eq!(&sent[16..26], codec::ascii_to_ebcdic("QWCRSVAL  ").as_slice());
        assert_eq!(&sent[26..36], codec::ascii_to_ebcdic("QSYS      ").as_slice());
        assert_eq!(sent[36], 2); // message option
        assert_eq!(codec::read_u16(sent, 37), 3); // parameter count
        // first parameter record: empty output payload, declared size 100
        assert_eq!(codec::read_u32(sent, 39), 12);
        assert_eq!(codec::read_u16(sent, 43), 0x1103);
        assert_eq!(codec::read_u32(sent, 45), 100);
        assert_eq!(codec::read_u16(sent, 49), 12);
    }

    #[test]
    fn call_program_stops_output_scan_at_sentinel() {
        let mut rest = Vec::new();
        rest.extend_from_slice(&0x4040_4040u32.to_be_bytes());
        rest.extend_from_slice(&[0u8; 8]);

        let mut c = ready_client(vec![call_reply(0, 0, &rest)]);
        let mut parameters =
            ProgramCallParameters::new(vec![ProgramCallParameter::output(16)]);
        let mut messages = CallMessages::new();
        let code = c
            .call_program("QUSRTVUI", "QSYS", &mut parameters, &mut messages)
            .unwrap();
        assert_eq!(code, 0);
        assert!(parameters.get(0).unwrap().data().is_empty());
    }

    #[test]
    fn call_program_returns_code_and_messages_on_failure() {
        let mut entry_data = Vec::new();
        entry_data.extend_from_slice(&codec::ascii_to_ebcdic("CPF9810"));
        entry_data.extend_from_slice(&2u16.to_be_bytes());
        entry_data.extend_from_slice(&40u16.to_be_bytes());
        entry_data.extend_from_slice(&[0x40u8; 20]);
        entry_data.extend_from_slice(&0u16.to_be_bytes());
        entry_data.extend_from_slice(&0u16.to_be_bytes());
        let entry = field(0x1102, &entry_data);

        let mut c = ready_client(vec![call_reply(0x0003, 1, &entry)]);
        let mut parameters = ProgramCallParameters::new(vec![]);
        let mut messages = CallMessages::new();
        let code = c
            .call_program("NOPGM", "NOLIB", &mut parameters, &mut messages)
            .unwrap();
        assert_eq!(code, 0x0003);
        assert!(c.is_connected());
        assert_eq!(messages.len(), 1);
        assert_eq!(messages.get(0).unwrap().id(), "CPF9810");
    }

    #[test]
    fn call_requires_ready_session() {
        let mut c = client();
        let mut messages = CallMessages::new();
        match c.call_command("DSPJOB", &mut messages) {
            Err(Error::NotConnected) => {}
            other => panic!("expected not connected, got {:?}", other),
        }

        let mut c = ready_client(vec![]);
        c.disconnect();
        match c.call_command("DSPJOB", &mut messages) {
            Err(Error::NotConnected) => {}
            other => panic!("expected not connected, got {:?}", other),
        }
        // a second disconnect stays a no-op
        c.disconnect();
        assert!(!c.is_connected());
    }

    #[test]
    fn call_program_rejects_long_names_before_io() {
        let mut c = ready_client(vec![]);
        let mut parameters = ProgramCallParameters::new(vec![]);
        let mut messages = CallMessages::new();
        match c.call_program("TOOLONGNAME1", "QSYS", &mut parameters, &mut messages) {
            Err(Error::InvalidInput(_)) => {}
            other => panic!("expected invalid input, got {:?}", other),
        }
        // configuration mistakes do not cost the session
        assert!(c.is_connected());
        assert!(sent_command_frames(&c).is_empty());
    }

    #[test]
    fn connect_validates_credentials_first() {
        let mut c: Client<Replay> =
            Client::with_transport(Options::new("testhost", false), "TOOLONGUSER1", "PW");
        match c.connect() {
            Err(Error::InvalidInput(_)) => {}
            other => panic!("expected invalid input, got {:?}", other),
        }
    }

    #[test]
    fn service_program_trampoline_layout() {
        let parameters = ServiceProgramCallParameters::new(
            vec![
                ServiceProgramCallParameter::by_value(42u32.to_be_bytes().to_vec()),
                ServiceProgramCallParameter::by_reference(b"XYZ".to_vec(), 0),
            ],
            ReturnFormat::Integer,
        );
        let call =
            build_service_program_call("MYSRVPGM", "MYLIB", "myfunc", &parameters).unwrap();

        assert_eq!(call.len(), 9);
        assert_eq!(
            call.get(0).unwrap().data(),
            codec::ascii_to_ebcdic("MYSRVPGM  MYLIB     ").as_slice()
        );
        let mut function = codec::ascii_to_ebcdic("myfunc");
        function.push(0);
        assert_eq!(call.get(1).unwrap().data(), function.as_slice());
        assert_eq!(call.get(2).unwrap().data(), &1u32.to_be_bytes());
        assert_eq!(
            call.get(3).unwrap().data(),
            &[0, 0, 0, 1, 0, 0, 0, 2][..]
        );
        assert_eq!(call.get(4).unwrap().data(), &2u32.to_be_bytes());
        // no alignment requested: a four byte zero placeholder
        assert_eq!(call.get(5).unwrap().data(), &[0u8; 4][..]);
        assert_eq!(call.get(6).unwrap().parameter_type(), ParameterType::Output);
        assert_eq!(call.get(6).unwrap().max_length(), 4);
        assert_eq!(call.get(7).unwrap().data(), &42u32.to_be_bytes());
        assert_eq!(call.get(8).unwrap().data(), b"XYZ");
    }

    #[test]
    fn service_program_trampoline_without_parameters() {
        let parameters = ServiceProgramCallParameters::new(vec![], ReturnFormat::None);
        let call = build_service_program_call("SRV", "LIB", "f", &parameters).unwrap();
        assert_eq!(call.len(), 7);
        // a single zero pass-by word and a zero count
        assert_eq!(call.get(3).unwrap().data(), &[0u8; 4][..]);
        assert_eq!(call.get(4).unwrap().data(), &[0u8; 4][..]);
    }

    #[test]
    fn service_program_receiver_alignment_pad() {
        // function of 7 chars + NUL = 8, two pass-by words = 8,
        // integer receiver = 4: 8 + 8 + 4 + 28 = 48, pad = 64
        let parameters = ServiceProgramCallParameters::new(
            vec![
                ServiceProgramCallParameter::by_value(vec![0; 4]),
                ServiceProgramCallParameter::by_reference(vec![0; 4], 0),
            ],
            ReturnFormat::Integer,
        )
        .align_receiver(true);
        let call = build_service_program_call("SRV", "LIB", "MYFUNC1", &parameters).unwrap();
        assert_eq!(call.get(5).unwrap().data().len(), 64);

        // 13 + 8 + 4 + 28 = 53, 53 % 16 = 5, pad = 59
        let call =
            build_service_program_call("SRV", "LIB", "ABCDEFGHIJKL", &parameters).unwrap();
        assert_eq!(call.get(5).unwrap().data().len(), 59);
    }

    #[test]
    fn service_program_rejects_too_many_parameters() {
        let parameters = ServiceProgramCallParameters::new(
            vec![ServiceProgramCallParameter::by_value(vec![0]); 8],
            ReturnFormat::None,
        );
        match build_service_program_call("SRV", "LIB", "f", &parameters) {
            Err(Error::InvalidInput(_)) => {}
            other => panic!("expected invalid input, got {:?}", other),
        }
    }

    #[test]
    fn service_program_call_decodes_return_value() {
        // QZRUCLSP reply: four returned blocks for parameters 5..=8
        let mut rest = Vec::new();
        for data in &[
            vec![0u8; 4],                      // alignment placeholder
            42u32.to_be_bytes().to_vec(),      // receiver: integer 42
            b"AB".to_vec(),                    // caller parameter 0
            b"CDE".to_vec(),                   // caller parameter 1
        ] {
            rest.extend_from_slice(&((12 + data.len()) as u32).to_be_bytes());
            rest.extend_from_slice(&0x1103u16.to_be_bytes());
            rest.extend_from_slice(&(data.len() as u32).to_be_bytes());
            rest.extend_from_slice(&13u16.to_be_bytes());
            rest.extend_from_slice(data);
        }

        let mut c = ready_client(vec![call_reply(0, 0, &rest)]);
        let mut parameters = ServiceProgramCallParameters::new(
            vec![
                ServiceProgramCallParameter::by_value(vec![9, 9]),
                ServiceProgramCallParameter::by_reference(vec![8, 8, 8], 0),
            ],
            ReturnFormat::Integer,
        );
        let mut messages = CallMessages::new();
        let code = c
            .call_service_program("MYSRVPGM", "MYLIB", "myfunc", &mut parameters, &mut messages)
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(parameters.returned_value(), 42);
        assert_eq!(parameters.returned_errno(), 0);
        assert_eq!(parameters.get(0).unwrap().data(), b"AB");
        assert_eq!(parameters.get(1).unwrap().data(), b"CDE");

        // the program call targeted the trampoline API
        let frames = sent_command_frames(&c);
        let sent = &frames[0];
        assert_eq!(&sent[16..26], codec::ascii_to_ebcdic("QZRUCLSP  ").as_slice());
        assert_eq!(&sent[26..36], codec::ascii_to_ebcdic("QSYS      ").as_slice());
    }

    #[test]
    fn transport_failure_closes_the_session() {
        // replay transport with no canned reply fails the send
        let mut c = ready_client(vec![]);
        let mut messages = CallMessages::new();
        assert!(c.call_command("DSPJOB", &mut messages).is_err());
        assert!(!c.is_connected());
    }

    #[test]
    fn short_reply_is_framing_error() {
        let mut c = ready_client(vec![frame(&[0u8; 8])]);
        let mut messages = CallMessages::new();
        match c.call_command("DSPJOB", &mut messages) {
            Err(Error::Frame { .. }) => {}
            other => panic!("expected frame error, got {:?}", other),
        }
        assert!(!c.is_connected());
    }
}
