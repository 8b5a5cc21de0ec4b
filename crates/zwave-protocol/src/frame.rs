//! SOF data-frame encoding
//!
//! Wire format:
//! ```text
//! [SOF: 1 byte]
//! [Length: 1 byte] (body size plus the trailing checksum)
//! [Body: variable] (type, function, function-specific data)
//! [Checksum: 1 byte] (XOR over length and body, seeded with 0xFF)
//! ```

use crate::consts::SOF;

/// XOR checksum over the length byte and body, seeded with `0xFF`
#[must_use]
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0xFF, |acc, b| acc ^ b)
}

/// Wrap a Serial API request body into a wire frame
#[must_use]
#[allow(clippy::missing_panics_doc)] // Panic only on protocol-violating body size
pub fn encode(body: &[u8]) -> Vec<u8> {
    let length = u8::try_from(body.len() + 1).expect("body exceeds protocol maximum");

    let mut data = Vec::with_capacity(body.len() + 3);
    data.push(SOF);
    data.push(length);
    data.extend_from_slice(body);
    data.push(checksum(&data[1..]));
    data
}
