//! WebM element IDs written by the muxer.
//!
//! IDs include their VINT marker bits, so they are written verbatim in
//! big-endian order using the fewest bytes that hold them. Each entry of the
//! table below also records the element's display name and payload kind.

/// How an element's payload is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Holds child elements.
    Master,
    /// Big-endian unsigned integer.
    Uint,
    /// IEEE-754 float.
    Float,
    /// ASCII/UTF-8 text.
    String,
    /// Opaque bytes.
    Binary,
}

macro_rules! element_table {
    ($($(#[$doc:meta])* $name:ident = $id:literal, $label:literal, $kind:ident;)*) => {
        $(
            $(#[$doc])*
            pub const $name: u32 = $id;
        )*

        /// Human-readable name for an element ID.
        pub fn element_name(id: u32) -> &'static str {
            match id {
                $($name => $label,)*
                _ => "Unknown",
            }
        }

        /// Payload kind of a known element ID.
        pub fn element_kind(id: u32) -> Option<ElementKind> {
            match id {
                $($name => Some(ElementKind::$kind),)*
                _ => None,
            }
        }
    };
}

element_table! {
    /// Root of the EBML header.
    EBML = 0x1A45DFA3, "EBML", Master;
    EBML_VERSION = 0x4286, "EBMLVersion", Uint;
    EBML_READ_VERSION = 0x42F7, "EBMLReadVersion", Uint;
    EBML_MAX_ID_LENGTH = 0x42F2, "EBMLMaxIDLength", Uint;
    EBML_MAX_SIZE_LENGTH = 0x42F3, "EBMLMaxSizeLength", Uint;
    /// "webm".
    DOC_TYPE = 0x4282, "DocType", String;
    DOC_TYPE_VERSION = 0x4287, "DocTypeVersion", Uint;
    DOC_TYPE_READ_VERSION = 0x4285, "DocTypeReadVersion", Uint;

    /// Top-level container for everything after the EBML header.
    SEGMENT = 0x18538067, "Segment", Master;

    /// Index of top-level element positions.
    SEEK_HEAD = 0x114D9B74, "SeekHead", Master;
    SEEK = 0x4DBB, "Seek", Master;
    /// ID bytes of the indexed element.
    SEEK_ID = 0x53AB, "SeekID", Binary;
    /// Offset relative to the segment payload start.
    SEEK_POSITION = 0x53AC, "SeekPosition", Uint;

    INFO = 0x1549A966, "Info", Master;
    /// Nanoseconds per timecode unit.
    TIMECODE_SCALE = 0x2AD7B1, "TimecodeScale", Uint;
    /// Segment duration in timecode units.
    DURATION = 0x4489, "Duration", Float;
    MUXING_APP = 0x4D80, "MuxingApp", String;
    WRITING_APP = 0x5741, "WritingApp", String;

    TRACKS = 0x1654AE6B, "Tracks", Master;
    TRACK_ENTRY = 0xAE, "TrackEntry", Master;
    TRACK_NUMBER = 0xD7, "TrackNumber", Uint;
    TRACK_UID = 0x73C5, "TrackUID", Uint;
    /// 1 for video, 2 for audio.
    TRACK_TYPE = 0x83, "TrackType", Uint;
    NAME = 0x536E, "Name", String;
    /// ISO 639-2 language code.
    LANGUAGE = 0x22B59C, "Language", String;
    CODEC_ID = 0x86, "CodecID", String;
    CODEC_PRIVATE = 0x63A2, "CodecPrivate", Binary;

    VIDEO = 0xE0, "Video", Master;
    PIXEL_WIDTH = 0xB0, "PixelWidth", Uint;
    PIXEL_HEIGHT = 0xBA, "PixelHeight", Uint;
    DISPLAY_WIDTH = 0x54B0, "DisplayWidth", Uint;
    DISPLAY_HEIGHT = 0x54BA, "DisplayHeight", Uint;
    FRAME_RATE = 0x2383E3, "FrameRate", Float;
    STEREO_MODE = 0x53B8, "StereoMode", Uint;

    AUDIO = 0xE1, "Audio", Master;
    SAMPLING_FREQUENCY = 0xB5, "SamplingFrequency", Float;
    CHANNELS = 0x9F, "Channels", Uint;
    BIT_DEPTH = 0x6264, "BitDepth", Uint;

    CLUSTER = 0x1F43B675, "Cluster", Master;
    /// Cluster timecode in timecode units.
    TIMECODE = 0xE7, "Timecode", Uint;
    SIMPLE_BLOCK = 0xA3, "SimpleBlock", Binary;

    CUES = 0x1C53BB6B, "Cues", Master;
    CUE_POINT = 0xBB, "CuePoint", Master;
    CUE_TIME = 0xB3, "CueTime", Uint;
    CUE_TRACK_POSITIONS = 0xB7, "CueTrackPositions", Master;
    CUE_TRACK = 0xF7, "CueTrack", Uint;
    CUE_CLUSTER_POSITION = 0xF1, "CueClusterPosition", Uint;
    CUE_BLOCK_NUMBER = 0x5378, "CueBlockNumber", Uint;

    /// Padding; readers skip it.
    VOID = 0xEC, "Void", Binary;
}

/// Codec ID strings written by the muxer.
pub mod codec_ids {
    /// VP8 video.
    pub const V_VP8: &str = "V_VP8";
    /// Vorbis audio.
    pub const A_VORBIS: &str = "A_VORBIS";
}
