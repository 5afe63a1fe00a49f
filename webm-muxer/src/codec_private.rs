//! Codec private data builders.

/// Vorbis codec private data builder.
///
/// Matroska stores the three Vorbis headers in one blob: a packet count
/// minus one (always 2), the Xiph-laced lengths of the identification and
/// comment headers, then the three headers back to back. The setup header
/// length is implied by the blob length.
#[derive(Debug, Clone, Default)]
pub struct VorbisCodecPrivate {
    /// Vorbis identification header.
    pub identification_header: Vec<u8>,
    /// Vorbis comment header.
    pub comment_header: Vec<u8>,
    /// Vorbis setup header.
    pub setup_header: Vec<u8>,
}

impl VorbisCodecPrivate {
    /// Create from raw Vorbis headers.
    pub fn from_headers(identification: Vec<u8>, comment: Vec<u8>, setup: Vec<u8>) -> Self {
        Self {
            identification_header: identification,
            comment_header: comment,
            setup_header: setup,
        }
    }

    /// Build the CodecPrivate blob.
    pub fn build(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(
            3 + self.identification_header.len() / 255
                + self.comment_header.len() / 255
                + self.identification_header.len()
                + self.comment_header.len()
                + self.setup_header.len(),
        );

        data.push(2);
        push_xiph_length(&mut data, self.identification_header.len());
        push_xiph_length(&mut data, self.comment_header.len());

        data.extend_from_slice(&self.identification_header);
        data.extend_from_slice(&self.comment_header);
        data.extend_from_slice(&self.setup_header);
        data
    }
}

/// Xiph lacing: runs of 255 followed by the remainder.
fn push_xiph_length(data: &mut Vec<u8>, mut length: usize) {
    while length >= 255 {
        data.push(255);
        length -= 255;
    }
    data.push(length as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vorbis_codec_private_layout() {
        let vorbis = VorbisCodecPrivate::from_headers(
            vec![0x01, b'v', b'o', b'r', b'b', b'i', b's'],
            vec![0x03, b'v'],
            vec![0x05, 0xAA, 0xBB],
        );
        let data = vorbis.build();

        assert_eq!(data[0], 2);
        assert_eq!(data[1], 7);
        assert_eq!(data[2], 2);
        assert_eq!(&data[3..10], &[0x01, b'v', b'o', b'r', b'b', b'i', b's']);
        assert_eq!(&data[10..12], &[0x03, b'v']);
        assert_eq!(&data[12..], &[0x05, 0xAA, 0xBB]);
    }

    #[test]
    fn test_xiph_lacing_long_headers() {
        let vorbis = VorbisCodecPrivate::from_headers(vec![0; 255], vec![0; 600], vec![1]);
        let data = vorbis.build();

        // 255 -> [255, 0]; 600 -> [255, 255, 90]
        assert_eq!(&data[..6], &[2, 255, 0, 255, 255, 90]);
        assert_eq!(data.len(), 6 + 255 + 600 + 1);
    }
}
