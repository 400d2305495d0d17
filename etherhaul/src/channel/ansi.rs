//! ANSI escape stripping on top of the `vte` state machine.

use vte::{Parser, Perform};

/// Collects printable characters and line control bytes, dropping every
/// escape, CSI, OSC and DCS sequence.
struct Printable {
    out: Vec<u8>,
}

impl Perform for Printable {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        // Keep line structure; drop bells, backspaces and friends.
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.push(byte);
        }
    }
}

/// Strip ANSI escape sequences from a chunk of terminal output.
pub fn strip_ansi(data: &[u8]) -> Vec<u8> {
    if !data.contains(&0x1b) {
        return data.to_vec();
    }

    let mut parser = Parser::new();
    let mut performer = Printable {
        out: Vec::with_capacity(data.len()),
    };
    parser.advance(&mut performer, data);
    performer.out
}
