#![no_main]

//! Fuzz target for the EBML codec and element writers.
//!
//! Decoding must never panic on arbitrary bytes, and anything the writers
//! emit must decode back to what was written.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

use webm_muxer::ebml;
use webm_muxer::serialize;
use webm_muxer::{MkvWriter, StreamWriter};

#[derive(Arbitrary, Debug)]
struct EbmlInput {
    data: Vec<u8>,
    operation: EbmlOperation,
}

#[derive(Arbitrary, Debug)]
enum EbmlOperation {
    /// Parse a VINT
    ReadVint,
    /// Parse an element ID
    ReadElementId,
    /// Parse an element size
    ReadElementSize,
    /// Encode with the minimal width, then decode
    VintRoundtrip { value: u64 },
    /// Encode with an explicit width, then decode
    FixedWidth { value: u64, width: u8 },
    /// Write a SimpleBlock, then walk its header
    SimpleBlock { track: u8, timecode: i16, key: bool },
    /// Fill an exact span with a Void element
    Void { total: u16 },
}

fuzz_target!(|input: EbmlInput| {
    if input.data.len() > 64 * 1024 {
        return;
    }

    match input.operation {
        EbmlOperation::ReadVint => {
            let mut cursor = Cursor::new(&input.data);
            let _ = ebml::read_vint(&mut cursor);
        }

        EbmlOperation::ReadElementId => {
            let mut cursor = Cursor::new(&input.data);
            let _ = ebml::read_element_id(&mut cursor);
        }

        EbmlOperation::ReadElementSize => {
            let mut cursor = Cursor::new(&input.data);
            let _ = ebml::read_element_size(&mut cursor);
        }

        EbmlOperation::VintRoundtrip { value } => {
            if let Ok((encoded, len)) = ebml::encode_vint_min(value) {
                assert_eq!(len, ebml::coded_size(value));
                let mut cursor = Cursor::new(&encoded[..len]);
                let (decoded, decoded_len) =
                    ebml::read_vint(&mut cursor).expect("encoded VINT must decode");
                assert_eq!(value, decoded, "VINT round-trip mismatch");
                assert_eq!(len, decoded_len);
            } else {
                assert!(value > ebml::max_coded_value(8));
            }
        }

        EbmlOperation::FixedWidth { value, width } => {
            let width = width as usize;
            if let Ok(encoded) = ebml::encode_vint(value, width) {
                let mut cursor = Cursor::new(&encoded[..width]);
                let (decoded, decoded_len) =
                    ebml::read_vint(&mut cursor).expect("encoded VINT must decode");
                assert_eq!(value, decoded);
                assert_eq!(width, decoded_len);
            }
        }

        EbmlOperation::SimpleBlock { track, timecode, key } => {
            let mut writer = StreamWriter::new(Vec::new());
            let track = track as u64;
            match serialize::write_simple_block(&mut writer, &input.data, track, timecode, key) {
                Ok(written) => {
                    assert_eq!(written, writer.position());
                    let bytes = writer.into_inner();
                    let mut cursor = Cursor::new(&bytes);
                    let (id, _) = ebml::read_element_id(&mut cursor).expect("SimpleBlock ID");
                    assert_eq!(id, 0xA3);
                    let (size, _) = ebml::read_element_size(&mut cursor).expect("SimpleBlock size");
                    assert_eq!(
                        size.map(|s| s + cursor.position()),
                        Some(bytes.len() as u64)
                    );
                    let (decoded_track, _) = ebml::read_vint(&mut cursor).expect("track number");
                    assert_eq!(decoded_track, track);
                }
                Err(_) => assert!(track == 0 || track >= 128 || input.data.is_empty()),
            }
        }

        EbmlOperation::Void { total } => {
            let mut writer = StreamWriter::new(Vec::new());
            let total = total as u64;
            if serialize::write_void_element(&mut writer, total).is_ok() {
                assert_eq!(writer.position(), total);
            } else {
                assert!(total < 2);
            }
        }
    }
});
