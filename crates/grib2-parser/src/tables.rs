//! GRIB2 parameter and level lookup tables.
//!
//! Translates numeric (discipline, category, number) codes into the short
//! names data providers use in their request filters, e.g. NOMADS `var_HTSGW`.

use std::collections::HashMap;

/// Lookup key for parameter: (discipline, category, number)
pub type ParamKey = (u8, u8, u8);

/// Level description - either static text or a template with {value} placeholder
#[derive(Debug, Clone)]
pub enum LevelDescription {
    /// Static description (e.g., "surface")
    Static(String),
    /// Template with {value} placeholder (e.g., "{value} m above ground")
    Template(String),
}

impl LevelDescription {
    pub fn format(&self, value: u32) -> String {
        match self {
            LevelDescription::Static(s) => s.clone(),
            LevelDescription::Template(t) => t.replace("{value}", &value.to_string()),
        }
    }
}

/// GRIB2 parameter and level lookup tables.
#[derive(Debug, Clone, Default)]
pub struct Grib2Tables {
    parameters: HashMap<ParamKey, String>,
    levels: HashMap<u8, LevelDescription>,
}

impl Grib2Tables {
    /// Create empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables covering the fields published in NCEP wave model output
    /// (GRIB2 code table 4.2-10-0 plus the surface wind fields).
    pub fn wave() -> Self {
        let mut tables = Self::new();

        // Discipline 10 (oceanographic), category 0 (waves)
        for (number, name) in [
            (3, "HTSGW"),
            (4, "WVDIR"),
            (5, "WVHGT"),
            (6, "WVPER"),
            (7, "SWDIR"),
            (8, "SWELL"),
            (9, "SWPER"),
            (10, "DIRPW"),
            (11, "PERPW"),
            (12, "DIRSW"),
            (13, "PERSW"),
        ] {
            tables.add_parameter(10, 0, number, name.to_string());
        }

        // Discipline 0, category 2 (momentum)
        tables.add_parameter(0, 2, 0, "WDIR".to_string());
        tables.add_parameter(0, 2, 1, "WIND".to_string());
        tables.add_parameter(0, 2, 2, "UGRD".to_string());
        tables.add_parameter(0, 2, 3, "VGRD".to_string());

        tables.add_level(1, LevelDescription::Static("surface".to_string()));
        tables.add_level(
            103,
            LevelDescription::Template("{value} m above ground".to_string()),
        );
        tables.add_level(
            241,
            LevelDescription::Template("{value} in sequence".to_string()),
        );

        tables
    }

    /// Add a parameter mapping
    pub fn add_parameter(&mut self, discipline: u8, category: u8, number: u8, name: String) {
        self.parameters.insert((discipline, category, number), name);
    }

    /// Add a level description mapping
    pub fn add_level(&mut self, level_type: u8, description: LevelDescription) {
        self.levels.insert(level_type, description);
    }

    /// Look up parameter short name by GRIB2 codes.
    ///
    /// Returns "P{discipline}_{category}_{number}" if not found.
    pub fn parameter_name(&self, discipline: u8, category: u8, number: u8) -> String {
        self.parameters
            .get(&(discipline, category, number))
            .cloned()
            .unwrap_or_else(|| format!("P{}_{}_{}", discipline, category, number))
    }

    /// Look up level description by type code and value.
    pub fn level_description(&self, level_type: u8, level_value: u32) -> String {
        match self.levels.get(&level_type) {
            Some(desc) => desc.format(level_value),
            None => format!("Level type {} value {}", level_type, level_value),
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.levels.is_empty()
    }
}
