//! Static component lexicon
//!
//! Curated component names and aliases mapped directly to object-part
//! codes. Exact matches are case- and whitespace-insensitive.

use crate::utils::fuzzy::{normalize, rank};

/// One lexicon row: code, canonical name, aliases
#[derive(Debug, Clone, Copy)]
pub struct LexiconEntry {
    pub code: &'static str,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

/// A lexicon hit
#[derive(Debug, Clone, PartialEq)]
pub struct LexiconMatch {
    pub code: String,
    pub name: String,
    /// 1.0 for exact matches, 1 - distance for fuzzy ones
    pub confidence: f64,
}

const ENTRIES: &[LexiconEntry] = &[
    LexiconEntry { code: "ACTR", name: "Actuator", aliases: &["Valve Actuator", "Act"] },
    LexiconEntry { code: "AGTR", name: "Agitator", aliases: &["Mixer"] },
    LexiconEntry { code: "BELT", name: "Belt", aliases: &["Drive Belt", "V-Belt", "Vee Belt"] },
    LexiconEntry { code: "BRNG", name: "Bearing", aliases: &["Bearings", "Roller Bearing", "Ball Bearing"] },
    LexiconEntry { code: "BRKR", name: "Breaker", aliases: &["Circuit Breaker", "CB"] },
    LexiconEntry { code: "BRSH", name: "Bushing", aliases: &["Bush"] },
    LexiconEntry { code: "CABL", name: "Cable", aliases: &["Power Cable", "Wiring"] },
    LexiconEntry { code: "CASG", name: "Casing", aliases: &["Housing", "Pump Casing"] },
    LexiconEntry { code: "CHAN", name: "Chain", aliases: &["Drive Chain"] },
    LexiconEntry { code: "CLTC", name: "Clutch", aliases: &[] },
    LexiconEntry { code: "CNTR", name: "Contactor", aliases: &[] },
    LexiconEntry { code: "CNVR", name: "Conveyor", aliases: &["Belt Conveyor"] },
    LexiconEntry { code: "CPLG", name: "Coupling", aliases: &["Shaft Coupling", "Flexible Coupling"] },
    LexiconEntry { code: "CTRL", name: "Controller", aliases: &["PLC", "Control Unit"] },
    LexiconEntry { code: "DIAP", name: "Diaphragm", aliases: &["Membrane"] },
    LexiconEntry { code: "FAN0", name: "Fan", aliases: &["Cooling Fan"] },
    LexiconEntry { code: "FILT", name: "Filter", aliases: &["Strainer", "Filter Element"] },
    LexiconEntry { code: "FUSE", name: "Fuse", aliases: &[] },
    LexiconEntry { code: "GRBX", name: "Gearbox", aliases: &["Gear Box", "Reducer", "Gear Reducer"] },
    LexiconEntry { code: "GSKT", name: "Gasket", aliases: &["Joint Gasket"] },
    LexiconEntry { code: "HOSE", name: "Hose", aliases: &["Flexible Hose"] },
    LexiconEntry { code: "HTEX", name: "Heat Exchanger", aliases: &["Exchanger", "Cooler"] },
    LexiconEntry { code: "IMPL", name: "Impeller", aliases: &["Rotor Impeller"] },
    LexiconEntry { code: "INST", name: "Instrument", aliases: &["Gauge", "Indicator"] },
    LexiconEntry { code: "LUBR", name: "Lubrication System", aliases: &["Lube System", "Lubricator"] },
    LexiconEntry { code: "MOTR", name: "Motor", aliases: &["Electric Motor", "Drive Motor"] },
    LexiconEntry { code: "NOZL", name: "Nozzle", aliases: &["Spray Nozzle"] },
    LexiconEntry { code: "PIPE", name: "Pipe", aliases: &["Piping", "Pipework"] },
    LexiconEntry { code: "PSTN", name: "Piston", aliases: &[] },
    LexiconEntry { code: "PULY", name: "Pulley", aliases: &["Sheave"] },
    LexiconEntry { code: "PUMP", name: "Pump", aliases: &["Centrifugal Pump"] },
    LexiconEntry { code: "RLAY", name: "Relay", aliases: &[] },
    LexiconEntry { code: "ROTR", name: "Rotor", aliases: &[] },
    LexiconEntry { code: "SEAL", name: "Seal", aliases: &["Mechanical Seal", "Shaft Seal", "Oil Seal"] },
    LexiconEntry { code: "SNSR", name: "Sensor", aliases: &["Transmitter", "Probe"] },
    LexiconEntry { code: "SHFT", name: "Shaft", aliases: &["Drive Shaft"] },
    LexiconEntry { code: "SPRG", name: "Spring", aliases: &[] },
    LexiconEntry { code: "STTR", name: "Stator", aliases: &["Stator Winding"] },
    LexiconEntry { code: "SWCH", name: "Switch", aliases: &["Limit Switch", "Pressure Switch"] },
    LexiconEntry { code: "TANK", name: "Tank", aliases: &["Vessel", "Reservoir"] },
    LexiconEntry { code: "TRNS", name: "Transformer", aliases: &[] },
    LexiconEntry { code: "VALV", name: "Valve", aliases: &["Control Valve", "Gate Valve", "Ball Valve"] },
    LexiconEntry { code: "WNDG", name: "Winding", aliases: &["Motor Winding", "Coil"] },
];

/// Component lexicon lookup
#[derive(Debug, Clone)]
pub struct Lexicon {
    entries: &'static [LexiconEntry],
}

impl Default for Lexicon {
    fn default() -> Self {
        Self { entries: ENTRIES }
    }
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lexicon over a caller-supplied table
    pub fn with_entries(entries: &'static [LexiconEntry]) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact match on name or alias
    pub fn exact(&self, component: &str) -> Option<LexiconMatch> {
        let wanted = normalize(component);
        self.entries
            .iter()
            .find(|entry| {
                normalize(entry.name) == wanted
                    || entry.aliases.iter().any(|alias| normalize(alias) == wanted)
            })
            .map(|entry| LexiconMatch {
                code: entry.code.to_string(),
                name: entry.name.to_string(),
                confidence: 1.0,
            })
    }

    /// Best fuzzy matches closer than `threshold`, best first
    pub fn fuzzy(&self, component: &str, threshold: f64) -> Vec<LexiconMatch> {
        let keys = self.entries.iter().enumerate().flat_map(|(i, entry)| {
            std::iter::once((i, entry.name)).chain(entry.aliases.iter().map(move |alias| (i, *alias)))
        });

        rank(component, keys)
            .into_iter()
            .filter(|hit| hit.score < threshold)
            .map(|hit| {
                let entry = &self.entries[hit.owner];
                LexiconMatch {
                    code: entry.code.to_string(),
                    name: entry.name.to_string(),
                    confidence: hit.similarity(),
                }
            })
            .collect()
    }
}
