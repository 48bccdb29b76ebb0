#![no_main]

use std::io::{self, Cursor, Read, Write};
use std::time::Duration;

use libfuzzer_sys::fuzz_target;
use nrpe::{run, Command, Error, Packet, PacketType, Transport};

struct FuzzStream {
    input: Cursor<Vec<u8>>,
    output: Vec<u8>,
}

impl Read for FuzzStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for FuzzStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for FuzzStream {
    fn set_timeout(&mut self, _timeout: Option<Duration>) -> io::Result<()> {
        Ok(())
    }
}

// Starts from a well-formed response packet, then applies fuzz-chosen
// corruption before handing it to the client driver.
fuzz_target!(|data: &[u8]| {
    let mut raw = Packet::build(PacketType::Response, 0, b"OK - fuzzed")
        .as_bytes()
        .to_vec();

    for chunk in data.chunks(3) {
        if let [a, b, c] = *chunk {
            let index = usize::from(u16::from_be_bytes([a, b])) % raw.len();
            raw[index] ^= c;
        }
    }

    let mut stream = FuzzStream {
        input: Cursor::new(raw),
        output: Vec::new(),
    };

    match run(&mut stream, &Command::new("check_fuzz", ["1"]), false, None) {
        // Accepted responses always carry a status code the result type can
        // represent.
        Ok(result) => assert!(result.status().code() <= 3),
        Err(
            Error::BadCrc
            | Error::WrongType { .. }
            | Error::UnknownStatus { .. }
            | Error::Read(_, _),
        ) => {}
        Err(e) => panic!("unexpected error from corrupt response: {e}"),
    }
});
