#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Firmware family that wrote the log. Anything that does not announce
/// itself as Cleanflight is decoded with Baseflight conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FirmwareType {
    #[default]
    Baseflight,
    Cleanflight,
}

/// Per-frame-type field tables, kept as the parallel arrays the header
/// declares them in. The arrays are only guaranteed consistent after the
/// orchestrator validates them on the header/data transition.
#[derive(Debug, Clone, Default)]
pub struct FrameDefinition {
    pub field_names: Vec<String>,
    pub predictors: Vec<u16>,
    pub encodings: Vec<u8>,
    pub signed: Vec<bool>,
}

impl FrameDefinition {
    pub fn count(&self) -> usize {
        self.field_names.len()
    }

    pub fn is_signed(&self, index: usize) -> bool {
        self.signed.get(index).copied().unwrap_or(false)
    }

    /// True when the predictor and encoding arrays cover every named field.
    pub fn is_consistent(&self) -> bool {
        self.predictors.len() == self.field_names.len()
            && self.encodings.len() == self.field_names.len()
    }

    /// A frame type can only be decoded once names, predictors and encodings
    /// have all been declared for it.
    pub fn is_usable(&self) -> bool {
        !self.field_names.is_empty() && self.is_consistent()
    }
}

/// Everything the textual header section declares: field tables for each
/// frame type, tuning constants baked into the predictors, and the frame
/// interval settings that drive skipped-iteration accounting.
#[derive(Debug, Clone)]
pub struct LogHeader {
    pub firmware_type: FirmwareType,
    pub firmware_revision: String,
    pub board_info: String,
    pub craft_name: String,
    pub data_version: u8,
    pub frame_interval_i: u32,
    pub frame_interval_p_num: u32,
    pub frame_interval_p_denom: u32,
    pub min_throttle: u16,
    pub max_throttle: u16,
    pub rc_rate: u16,
    pub vbat_scale: u16,
    pub vbat_ref: u16,
    pub vbat_min_cell_voltage: u16,
    pub vbat_warning_cell_voltage: u16,
    pub vbat_max_cell_voltage: u16,
    pub gyro_scale: f32,
    pub acc_1g: u16,
    pub i_frame_def: FrameDefinition,
    pub p_frame_def: FrameDefinition,
    pub g_frame_def: FrameDefinition,
    pub h_frame_def: FrameDefinition,
    /// Index of `motor[0]` among the main fields, once seen
    pub motor0_index: Option<usize>,
    /// Index of `GPS_home[0]` among the home fields, once seen
    pub home0_index: Option<usize>,
    /// Index of `GPS_home[1]` among the home fields, once seen
    pub home1_index: Option<usize>,
    /// Raw header lines in file order, for header export
    pub all_headers: Vec<String>,
}

impl Default for LogHeader {
    fn default() -> Self {
        Self {
            firmware_type: FirmwareType::default(),
            firmware_revision: String::new(),
            board_info: String::new(),
            craft_name: String::new(),
            data_version: 1,
            frame_interval_i: 32,
            frame_interval_p_num: 1,
            frame_interval_p_denom: 1,
            min_throttle: 1150,
            max_throttle: 1850,
            rc_rate: 90,
            vbat_scale: 110,
            vbat_ref: 4095,
            vbat_min_cell_voltage: 33,
            vbat_warning_cell_voltage: 35,
            vbat_max_cell_voltage: 43,
            gyro_scale: 1.0,
            acc_1g: 1,
            i_frame_def: FrameDefinition::default(),
            p_frame_def: FrameDefinition::default(),
            g_frame_def: FrameDefinition::default(),
            h_frame_def: FrameDefinition::default(),
            motor0_index: None,
            home0_index: None,
            home1_index: None,
            all_headers: Vec::new(),
        }
    }
}

impl LogHeader {
    /// Install the main frame field names, noting where `motor[0]` sits for
    /// the motor prediction rule.
    pub fn set_main_field_names(&mut self, names: Vec<String>) {
        self.motor0_index = names.iter().position(|name| name == "motor[0]");
        self.i_frame_def.field_names = names;
    }

    /// Install the GPS home field names, noting where the two home
    /// coordinates sit for the home-coordinate prediction rules.
    pub fn set_home_field_names(&mut self, names: Vec<String>) {
        self.home0_index = names.iter().position(|name| name == "GPS_home[0]");
        self.home1_index = names.iter().position(|name| name == "GPS_home[1]");
        self.h_frame_def.field_names = names;
    }

    /// Battery voltage in millivolts for a raw ADC reading.
    pub fn vbat_to_millivolts(&self, vbat: u32) -> u32 {
        // ADC is 12 bit (i.e. max 0xFFF), voltage reference is 3.3V,
        // vbatscale is premultiplied by 100
        (vbat * 330 * self.vbat_scale as u32) / 0xfff
    }

    /// Estimate the battery cell count from the reference voltage.
    pub fn estimate_num_cells(&self) -> u32 {
        let ref_voltage = self.vbat_to_millivolts(self.vbat_ref as u32) / 100;

        for i in 1..8 {
            if ref_voltage < i * self.vbat_max_cell_voltage as u32 {
                return i;
            }
        }

        8
    }
}
