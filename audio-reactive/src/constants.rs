/// Sample rate of the reference hardware in Hz (16 MIPS, 4× oversampled ADC).
pub const DEFAULT_SAMPLE_RATE: f32 = 16_129.032;

/// Number of block fluxes kept for onset peak-picking.
pub const ONSET_WINDOW_SIZE: usize = 5;

/// Resolution of the reference ADC in bits.
pub const DEFAULT_ADC_BITS: u8 = 12;

/// Cutoff of the adaptive DC-bias tracker in Hz.
pub const DEFAULT_DC_CUTOFF_HZ: f32 = 7.32;

/// Gain envelope attack time in milliseconds.
pub const GAIN_ATTACK_MS: f32 = 100.0;

/// Gain envelope release time in milliseconds.
pub const GAIN_RELEASE_MS: f32 = 1000.0;

/// Below this envelope level the preamp gain is raised. Raw Q16 bits of the
/// normalised input, where full scale is `1 << 16`: 1/64 of full scale.
pub const GAIN_LOW_THRESHOLD: i32 = 1024;

/// Above this envelope level the preamp gain is lowered: 1/8 of full scale.
pub const GAIN_HIGH_THRESHOLD: i32 = 8192;

/// Minimum time between two preamp gain changes, in milliseconds.
pub const GAIN_HOLD_OFF_MS: f32 = 1000.0;

/// Software gain right-shift applied at each preamp step (×1 … ×1024).
pub const DEFAULT_SW_GAIN_SHIFTS: [u8; 8] = [0, 2, 4, 5, 6, 7, 8, 10];

/// Goertzel block length used by every band of the reference firmware.
pub const DEFAULT_BLOCK_LEN: u16 = 200;
