// src/edid.rs

//! Decoder for the 128-byte EDID base block a monitor exposes.
//!
//! Decoding is pure bit-field extraction over a borrowed slice. The only
//! failures are a blob that is too short or one whose fixed header signature
//! does not match; callers treat both as "no monitor identity available".

use serde::Serialize;
use thiserror::Error;

/// Fixed signature every EDID base block starts with.
pub const EDID_HEADER: [u8; 8] = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];

/// Length of the EDID base block. Extension blocks past it are ignored.
pub const EDID_BLOCK_LEN: usize = 128;

const DESCRIPTOR_OFFSETS: [usize; 4] = [0x36, 0x48, 0x5A, 0x6C];
const DESCRIPTOR_LEN: usize = 18;
const DESCRIPTOR_TEXT_LEN: usize = 13;

const DESCRIPTOR_SERIAL: u8 = 0xFF;
const DESCRIPTOR_STRING: u8 = 0xFE;
const DESCRIPTOR_PRODUCT_NAME: u8 = 0xFC;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EdidError {
    #[error("EDID blob is {0} bytes long, at least 128 are required")]
    TooShort(usize),
    #[error("EDID header signature mismatch")]
    BadHeader,
}

/// Digital interface standard reported by a digital input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DigitalInterface {
    Undefined,
    Dvi,
    HdmiA,
    HdmiB,
    Mddi,
    DisplayPort,
}

/// Video input definition (byte 0x14).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum VideoInput {
    Digital {
        /// Bits per primary color channel, `None` when undefined.
        bits_per_primary: Option<u8>,
        interface: DigitalInterface,
    },
    Analog {
        /// Video white level in volts, relative to blank.
        white_level: f64,
        /// Sync level in volts, relative to blank.
        sync_level: f64,
        blank_to_black: bool,
        separate_hv_sync: bool,
        composite_sync_on_h: bool,
        composite_sync_on_green: bool,
        serration_on_vsync: bool,
    },
}

/// Physical screen size as encoded in bytes 0x15/0x16.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ScreenSize {
    Physical { width_mm: u32, height_mm: u32 },
    /// Only the width/height ratio is known.
    AspectRatio(f64),
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColorSupport {
    // Analog displays
    Monochrome,
    Rgb,
    NonRgb,
    Undefined,
    // Digital displays
    Rgb444,
    Rgb444YCrCb444,
    Rgb444YCrCb422,
    Rgb444YCrCb444YCrCb422,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Chromaticity {
    pub red_x: f64,
    pub red_y: f64,
    pub green_x: f64,
    pub green_y: f64,
    pub blue_x: f64,
    pub blue_y: f64,
    pub white_x: f64,
    pub white_y: f64,
}

/// One of the eight standard timing slots (bytes 0x26..0x35).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StandardTiming {
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
}

/// A detailed timing block, typically the preferred mode in the first slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetailedTiming {
    pub pixel_clock_khz: u32,
    pub h_active: u32,
    pub h_blank: u32,
    pub v_active: u32,
    pub v_blank: u32,
    pub width_mm: u32,
    pub height_mm: u32,
}

/// Decoded EDID base block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdidInfo {
    /// Three-letter PNP manufacturer id, e.g. "DEL".
    pub manufacturer_code: String,
    pub product_code: u16,
    pub serial_number: u32,

    /// `None` when the week byte is 0x00 (unspecified) or 0xFF (model year).
    pub production_week: Option<u8>,
    pub production_year: Option<u16>,
    pub model_year: Option<u16>,

    pub major_version: u8,
    pub minor_version: u8,

    pub input: VideoInput,
    pub screen_size: ScreenSize,

    /// Display gamma; `None` means the sRGB default applies.
    pub gamma: Option<f64>,

    pub standby: bool,
    pub suspend: bool,
    pub active_off: bool,
    pub color_support: ColorSupport,
    pub srgb_is_standard: bool,
    pub preferred_timing_includes_native: bool,
    pub continuous_frequency: bool,

    pub chromaticity: Chromaticity,

    /// Raw established-timings bitmap from bytes 0x23..0x25, MSB first.
    pub established_timings: u32,
    pub standard_timings: Vec<StandardTiming>,
    pub detailed_timings: Vec<DetailedTiming>,

    /// Sum of the 128 bytes modulo 256. Zero when the block is intact.
    pub checksum: u8,

    pub product_name: Option<String>,
    pub text: Option<String>,
    pub serial_string: Option<String>,

    pub extension_blocks: u8,
}

impl EdidInfo {
    /// Returns `true` when the block checksum is correct.
    pub fn checksum_ok(&self) -> bool {
        self.checksum == 0
    }
}

#[inline]
fn bit(byte: u8, n: u8) -> bool {
    (byte >> n) & 1 == 1
}

/// Extracts bits `lo..=hi` of `byte`.
#[inline]
fn bits(byte: u8, lo: u8, hi: u8) -> u8 {
    (byte >> lo) & ((1u16 << (hi - lo + 1)) - 1) as u8
}

/// 10-bit fixed point: eight high bits in their own byte, two low bits packed
/// together with other channels.
fn fraction(high: u8, low: u8) -> f64 {
    let value = ((high as u32) << 2) | (low as u32 & 0x3);
    value as f64 / 1024.0
}

/// Decodes an EDID blob. Only the first 128 bytes are examined.
pub fn decode(blob: &[u8]) -> Result<EdidInfo, EdidError> {
    if blob.len() < EDID_BLOCK_LEN {
        return Err(EdidError::TooShort(blob.len()));
    }
    let edid = &blob[..EDID_BLOCK_LEN];
    if edid[..8] != EDID_HEADER {
        return Err(EdidError::BadHeader);
    }

    let manufacturer_code = decode_manufacturer(edid[0x08], edid[0x09]);
    let product_code = u16::from_le_bytes([edid[0x0A], edid[0x0B]]);
    let serial_number = u32::from_le_bytes([edid[0x0C], edid[0x0D], edid[0x0E], edid[0x0F]]);

    let year = 1990 + edid[0x11] as u16;
    let (production_week, production_year, model_year) = match edid[0x10] {
        0x00 => (None, Some(year), None),
        0xFF => (None, None, Some(year)),
        week => (Some(week), Some(year), None),
    };

    let input = decode_input(edid[0x14]);
    let digital = matches!(input, VideoInput::Digital { .. });

    let gamma = match edid[0x17] {
        0xFF => None,
        g => Some((g as f64 + 100.0) / 100.0),
    };

    let features = edid[0x18];
    let color_support = match (digital, bits(features, 3, 4)) {
        (true, 0) => ColorSupport::Rgb444,
        (true, 1) => ColorSupport::Rgb444YCrCb444,
        (true, 2) => ColorSupport::Rgb444YCrCb422,
        (true, _) => ColorSupport::Rgb444YCrCb444YCrCb422,
        (false, 0) => ColorSupport::Monochrome,
        (false, 1) => ColorSupport::Rgb,
        (false, 2) => ColorSupport::NonRgb,
        (false, _) => ColorSupport::Undefined,
    };

    let lo_rg = edid[0x19];
    let lo_bw = edid[0x1A];
    let chromaticity = Chromaticity {
        red_x: fraction(edid[0x1B], bits(lo_rg, 6, 7)),
        red_y: fraction(edid[0x1C], bits(lo_rg, 4, 5)),
        green_x: fraction(edid[0x1D], bits(lo_rg, 2, 3)),
        green_y: fraction(edid[0x1E], bits(lo_rg, 0, 1)),
        blue_x: fraction(edid[0x1F], bits(lo_bw, 6, 7)),
        blue_y: fraction(edid[0x20], bits(lo_bw, 4, 5)),
        white_x: fraction(edid[0x21], bits(lo_bw, 2, 3)),
        white_y: fraction(edid[0x22], bits(lo_bw, 0, 1)),
    };

    let established_timings =
        ((edid[0x23] as u32) << 16) | ((edid[0x24] as u32) << 8) | edid[0x25] as u32;

    let standard_timings = (0..8)
        .filter_map(|i| decode_standard_timing(edid[0x26 + i * 2], edid[0x27 + i * 2], edid[0x13]))
        .collect();

    let checksum = edid.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));

    let mut info = EdidInfo {
        manufacturer_code,
        product_code,
        serial_number,
        production_week,
        production_year,
        model_year,
        major_version: edid[0x12],
        minor_version: edid[0x13],
        input,
        screen_size: decode_screen_size(edid[0x15], edid[0x16]),
        gamma,
        standby: bit(features, 7),
        suspend: bit(features, 6),
        active_off: bit(features, 5),
        color_support,
        srgb_is_standard: bit(features, 2),
        preferred_timing_includes_native: bit(features, 1),
        continuous_frequency: bit(features, 0),
        chromaticity,
        established_timings,
        standard_timings,
        detailed_timings: Vec::new(),
        checksum,
        product_name: None,
        text: None,
        serial_string: None,
        extension_blocks: edid[0x7E],
    };

    for offset in DESCRIPTOR_OFFSETS {
        decode_block(&edid[offset..offset + DESCRIPTOR_LEN], &mut info);
    }

    Ok(info)
}

fn decode_manufacturer(hi: u8, lo: u8) -> String {
    let first = bits(hi, 2, 6);
    let second = (bits(hi, 0, 1) << 3) | bits(lo, 5, 7);
    let third = bits(lo, 0, 4);
    [first, second, third]
        .iter()
        .map(|&v| b'A'.wrapping_add(v).wrapping_sub(1) as char)
        .collect()
}

fn decode_input(byte: u8) -> VideoInput {
    if bit(byte, 7) {
        let bits_per_primary = match bits(byte, 4, 6) {
            1 => Some(6),
            2 => Some(8),
            3 => Some(10),
            4 => Some(12),
            5 => Some(14),
            6 => Some(16),
            _ => None,
        };
        let interface = match bits(byte, 0, 3) {
            1 => DigitalInterface::Dvi,
            2 => DigitalInterface::HdmiA,
            3 => DigitalInterface::HdmiB,
            4 => DigitalInterface::Mddi,
            5 => DigitalInterface::DisplayPort,
            _ => DigitalInterface::Undefined,
        };
        VideoInput::Digital {
            bits_per_primary,
            interface,
        }
    } else {
        let (white_level, sync_level) = match bits(byte, 5, 6) {
            0 => (0.7, 0.3),
            1 => (0.714, 0.286),
            2 => (1.0, 0.4),
            _ => (0.7, 0.0),
        };
        VideoInput::Analog {
            white_level,
            sync_level,
            blank_to_black: bit(byte, 4),
            separate_hv_sync: bit(byte, 3),
            composite_sync_on_h: bit(byte, 2),
            composite_sync_on_green: bit(byte, 1),
            serration_on_vsync: bit(byte, 0),
        }
    }
}

fn decode_screen_size(horizontal_cm: u8, vertical_cm: u8) -> ScreenSize {
    match (horizontal_cm, vertical_cm) {
        (0, 0) => ScreenSize::Unknown,
        (h, 0) => ScreenSize::AspectRatio(100.0 / (h as f64 + 99.0)),
        (0, v) => ScreenSize::AspectRatio((v as f64 + 99.0) / 100.0),
        (h, v) => ScreenSize::Physical {
            width_mm: 10 * h as u32,
            height_mm: 10 * v as u32,
        },
    }
}

fn decode_standard_timing(first: u8, second: u8, revision: u8) -> Option<StandardTiming> {
    // 0x01 0x01 marks an unused slot; 0x00 is invalid.
    if (first == 0x01 && second == 0x01) || first == 0x00 {
        return None;
    }
    let width = (first as u32 + 31) * 8;
    let height = match bits(second, 6, 7) {
        // 1:1 before EDID 1.3, 16:10 afterwards.
        0 if revision < 3 => width,
        0 => width * 10 / 16,
        1 => width * 3 / 4,
        2 => width * 4 / 5,
        _ => width * 9 / 16,
    };
    Some(StandardTiming {
        width,
        height,
        refresh_rate: bits(second, 0, 5) as u32 + 60,
    })
}

fn decode_block(block: &[u8], info: &mut EdidInfo) {
    let pixel_clock = u16::from_le_bytes([block[0], block[1]]);
    if pixel_clock != 0 {
        info.detailed_timings.push(DetailedTiming {
            pixel_clock_khz: pixel_clock as u32 * 10,
            h_active: block[2] as u32 | ((bits(block[4], 4, 7) as u32) << 8),
            h_blank: block[3] as u32 | ((bits(block[4], 0, 3) as u32) << 8),
            v_active: block[5] as u32 | ((bits(block[7], 4, 7) as u32) << 8),
            v_blank: block[6] as u32 | ((bits(block[7], 0, 3) as u32) << 8),
            width_mm: block[12] as u32 | ((bits(block[14], 4, 7) as u32) << 8),
            height_mm: block[13] as u32 | ((bits(block[14], 0, 3) as u32) << 8),
        });
        return;
    }

    let text = || descriptor_text(&block[5..5 + DESCRIPTOR_TEXT_LEN]);
    match block[3] {
        DESCRIPTOR_PRODUCT_NAME => info.product_name = Some(text()),
        DESCRIPTOR_STRING => info.text = Some(text()),
        DESCRIPTOR_SERIAL => info.serial_string = Some(text()),
        _ => {}
    }
}

/// Descriptor text ends at the first line feed. Embedded NULs become spaces.
fn descriptor_text(bytes: &[u8]) -> String {
    let text: String = bytes
        .iter()
        .take_while(|&&b| b != 0x0A)
        .map(|&b| if b == 0x00 { ' ' } else { b as char })
        .collect();
    text.trim_end().to_string()
}
