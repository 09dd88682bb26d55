//! The built-in PV testing reference corpus.
//!
//! A fixed, versioned catalogue of standards, test procedures, equipment
//! notes and best practices. Loaded once, never mutated at runtime.

use heliolab_core::knowledge::{Category, KnowledgeEntry};

/// The static knowledge corpus. Declaration order is stable and is used
/// as the retrieval tie-break, so entries must not be reordered casually.
pub struct Corpus {
    entries: Vec<KnowledgeEntry>,
}

impl Corpus {
    /// Build the corpus from an already-parsed entry list.
    pub fn new(entries: Vec<KnowledgeEntry>) -> Self {
        Self { entries }
    }

    /// The built-in PV lab catalogue.
    pub fn builtin() -> Self {
        Self::new(vec![
            // --- Standards ---
            entry(
                "iec_61215",
                Category::Standard,
                &["iec", "61215", "design", "qualification", "crystalline", "module", "approval"],
                "IEC 61215 covers design qualification and type approval for crystalline \
                 silicon PV modules. The sequence includes visual inspection, performance at \
                 STC, insulation test, temperature coefficients, NOCT, low irradiance, \
                 outdoor exposure, hot-spot endurance, UV preconditioning, thermal cycling, \
                 humidity freeze, damp heat, robustness of terminations, wet leakage current, \
                 mechanical load, hail and bypass diode tests.",
            ),
            entry(
                "iec_61730",
                Category::Standard,
                &["iec", "61730", "safety", "qualification", "module"],
                "IEC 61730 covers PV module safety qualification: construction, accessible \
                 parts, insulation, fire resistance, mechanical stress and environmental \
                 stress requirements.",
            ),
            entry(
                "ul_1703",
                Category::Standard,
                &["ul", "1703", "flat-plate", "panel", "module"],
                "UL 1703 applies to flat-plate photovoltaic modules and panels, with \
                 electrical, fire, mechanical and environmental test groups.",
            ),
            // --- Test procedures ---
            entry(
                "iv_curve",
                Category::Procedure,
                &["iv", "curve", "measurement", "sweep", "stc", "performance"],
                "I-V curve measurement procedure: set up test conditions, connect the \
                 module, stabilize temperature, perform the sweep, validate the data and \
                 calculate the characteristic parameters.",
            ),
            entry(
                "insulation_test",
                Category::Procedure,
                &["insulation", "resistance", "dielectric", "leakage"],
                "Insulation resistance test: apply 1000 V DC for 60 seconds; pass criterion \
                 is above 40 megohm for modules below 50 kW.",
            ),
            entry(
                "thermal_cycling",
                Category::Procedure,
                &["thermal", "cycling", "tc200", "cycles", "degradation"],
                "Thermal cycling test TC200: 200 cycles between -40 C and +85 C; pass \
                 criterion is Pmax degradation below 5 percent.",
            ),
            // --- Equipment ---
            entry(
                "solar_simulator",
                Category::Equipment,
                &["solar", "simulator", "flash", "irradiance", "spectrum", "stc"],
                "Class AAA solar simulator for STC testing: 1000 W/m2 irradiance, AM1.5G \
                 spectrum, 25 C cell temperature.",
            ),
            entry(
                "thermal_chamber",
                Category::Equipment,
                &["thermal", "chamber", "environmental", "humidity", "temperature"],
                "Environmental chamber for thermal testing: -40 C to +85 C range, humidity \
                 control and programmable cycle profiles.",
            ),
            // --- Best practices ---
            entry(
                "data_quality",
                Category::Practice,
                &["data", "quality", "calibration", "uncertainty", "measurement"],
                "Data quality practices: regular calibration, duplicate measurements, \
                 statistical analysis, documented uncertainties and validation of anomalies \
                 before reporting.",
            ),
            entry(
                "lab_safety",
                Category::Practice,
                &["safety", "ppe", "electrical", "chemical", "emergency"],
                "Laboratory safety guidelines: PPE requirements, electrical safety, \
                 chemical handling and emergency procedures.",
            ),
        ])
    }

    /// All entries, in declaration order.
    pub fn all(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    /// Entries in the given category, in declaration order. Empty when
    /// the category has no entries.
    pub fn by_category(&self, category: Category) -> Vec<&KnowledgeEntry> {
        self.entries
            .iter()
            .filter(|e| e.category == category)
            .collect()
    }

    /// Look up a single entry by topic id.
    pub fn get(&self, topic: &str) -> Option<&KnowledgeEntry> {
        self.entries.iter().find(|e| e.topic == topic)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn entry(topic: &str, category: Category, keywords: &[&str], body: &str) -> KnowledgeEntry {
    KnowledgeEntry {
        topic: topic.into(),
        category,
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        body: body.into(),
    }
}
